//! PostgreSQL history store.
//!
//! Check-and-insert runs in one transaction holding
//! `pg_advisory_xact_lock(hashtext(user_id))`, so submissions from the same
//! user are serialized while other users proceed. The table's
//! `UNIQUE (user_id, bundle_signature)` constraint backs this up.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use super::{find_conflict, HistoryError, HistoryStore, InsertOutcome};
use crate::bundle::BundleRecord;
use crate::dedupe::{DuplicateDetector, DuplicateMatch};

/// PostgreSQL-backed submission history.
#[derive(Clone)]
pub struct PostgresHistoryStore {
    pool: PgPool,
}

impl PostgresHistoryStore {
    pub async fn new(database_url: &str) -> Result<Self, HistoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| HistoryError::Connection(e.to_string()))?;

        tracing::info!("Connected to PostgreSQL history store");
        Ok(Self { pool })
    }

    /// Create from an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), HistoryError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("History store migrations applied");
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for PostgresHistoryStore {
    async fn prior_hashes(&self, user_id: &str) -> Result<Vec<String>, HistoryError> {
        let hashes: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT h
            FROM screenshot_bundles, unnest(perceptual_hashes) AS h
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(hashes)
    }

    async fn insert_unless_duplicate(
        &self,
        record: &BundleRecord,
        detector: &DuplicateDetector,
    ) -> Result<InsertOutcome, HistoryError> {
        let files = serde_json::to_value(&record.files)
            .map_err(|e| HistoryError::Serialization(e.to_string()))?;
        let analysis = serde_json::to_value(&record.analysis)
            .map_err(|e| HistoryError::Serialization(e.to_string()))?;

        let mut tx = self.pool.begin().await?;

        // Released automatically at commit or rollback
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(&record.user_id)
            .execute(&mut *tx)
            .await?;

        let prior: Vec<(String, Vec<String>)> = sqlx::query_as(
            r#"
            SELECT bundle_signature, perceptual_hashes
            FROM screenshot_bundles
            WHERE user_id = $1
            "#,
        )
        .bind(&record.user_id)
        .fetch_all(&mut *tx)
        .await?;

        let conflict = find_conflict(
            record,
            prior
                .iter()
                .map(|(sig, hashes)| (sig.as_str(), hashes.as_slice())),
            detector,
        );
        if let Some(found) = conflict {
            tx.rollback().await?;
            return Ok(InsertOutcome::Duplicate(found));
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO screenshot_bundles
                (bundle_id, user_id, link_id, verified, bundle_signature,
                 perceptual_hashes, files, analysis, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(record.bundle_id)
        .bind(&record.user_id)
        .bind(&record.link_id)
        .bind(record.verified)
        .bind(record.signature.as_str())
        .bind(record.perceptual_hashes())
        .bind(&files)
        .bind(&analysis)
        .bind(record.created_at)
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {}
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                tx.rollback().await?;
                return Ok(InsertOutcome::Duplicate(DuplicateMatch::SameSignature {
                    signature: record.signature.clone(),
                }));
            }
            Err(e) => return Err(e.into()),
        }

        tx.commit().await?;
        tracing::debug!(
            user_id = %record.user_id,
            bundle_id = %record.bundle_id,
            signature = %record.signature.short(),
            "Stored bundle"
        );
        Ok(InsertOutcome::Inserted)
    }

    async fn bundle_count(&self, user_id: &str) -> Result<usize, HistoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM screenshot_bundles WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
