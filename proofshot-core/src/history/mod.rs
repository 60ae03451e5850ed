//! Per-user submission history.
//!
//! The history answers one question for the duplicate check: which
//! perceptual hashes has this user already had accepted? Writes go through
//! [`HistoryStore::insert_unless_duplicate`], which repeats the duplicate check
//! and the insert as one step per user, so two concurrent submissions of the
//! same bundle cannot both be stored.
//!
//! Backends:
//! - **Memory** - per-user async mutex over a `DashMap` (tests, development)
//! - **PostgreSQL** - advisory lock plus `UNIQUE(user_id, bundle_signature)`,
//!   behind the `postgres` feature

mod memory;
#[cfg(feature = "postgres")]
mod postgres;

pub use memory::MemoryHistoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresHistoryStore;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::bundle::BundleRecord;
use crate::dedupe::{DuplicateDetector, DuplicateMatch};

/// History store errors.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Database migration error: {0}")]
    Migration(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for HistoryError {
    fn from(e: sqlx::Error) -> Self {
        Self::Query(e.to_string())
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::migrate::MigrateError> for HistoryError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        Self::Migration(e.to_string())
    }
}

/// Result of an atomic check-and-insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// Nothing was written.
    Duplicate(DuplicateMatch),
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Every perceptual hash from the user's accepted bundles.
    async fn prior_hashes(&self, user_id: &str) -> Result<Vec<String>, HistoryError>;

    /// Insert `record` unless it duplicates the user's history.
    ///
    /// The check and the insert are serialized per user.
    async fn insert_unless_duplicate(
        &self,
        record: &BundleRecord,
        detector: &DuplicateDetector,
    ) -> Result<InsertOutcome, HistoryError>;

    /// Number of accepted bundles for the user.
    async fn bundle_count(&self, user_id: &str) -> Result<usize, HistoryError>;

    fn backend_name(&self) -> &'static str;
}

/// Compare `record` against stored `(signature, hashes)` pairs.
///
/// An identical signature wins over a near hash so the caller reports the
/// more specific reason.
pub(crate) fn find_conflict<'a, I>(
    record: &BundleRecord,
    prior: I,
    detector: &DuplicateDetector,
) -> Option<DuplicateMatch>
where
    I: IntoIterator<Item = (&'a str, &'a [String])>,
{
    let mut previous: Vec<&str> = Vec::new();
    for (signature, hashes) in prior {
        if signature == record.signature.as_str() {
            return Some(DuplicateMatch::SameSignature {
                signature: record.signature.clone(),
            });
        }
        previous.extend(hashes.iter().map(String::as_str));
    }
    detector.find_match(&record.perceptual_hashes(), &previous)
}

/// Pick a backend from the environment.
///
/// With the `postgres` feature and `DATABASE_URL` set, connects and runs
/// migrations. Otherwise falls back to memory with a warning.
pub async fn connect_from_env() -> Result<Arc<dyn HistoryStore>, HistoryError> {
    #[cfg(feature = "postgres")]
    {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            let store = PostgresHistoryStore::new(&url).await?;
            store.migrate().await?;
            return Ok(Arc::new(store));
        }
    }

    tracing::warn!("Using in-memory submission history - accepted bundles are lost on exit");
    Ok(Arc::new(MemoryHistoryStore::new()))
}
