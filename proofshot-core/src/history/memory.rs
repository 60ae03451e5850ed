//! In-memory history store.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;

use super::{find_conflict, HistoryError, HistoryStore, InsertOutcome};
use crate::bundle::BundleRecord;
use crate::dedupe::DuplicateDetector;

type UserHistory = Arc<Mutex<Vec<BundleRecord>>>;

/// History kept in process memory, one async mutex per user.
#[derive(Default)]
pub struct MemoryHistoryStore {
    users: DashMap<String, UserHistory>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The user's slot, created on first use. The map guard is released
    /// before the caller awaits the mutex.
    fn user(&self, user_id: &str) -> UserHistory {
        self.users
            .entry(user_id.to_string())
            .or_default()
            .value()
            .clone()
    }

    /// Snapshot of the user's accepted bundles, oldest first.
    pub async fn records(&self, user_id: &str) -> Vec<BundleRecord> {
        let Some(slot) = self.users.get(user_id).map(|s| s.value().clone()) else {
            return Vec::new();
        };
        let records = slot.lock().await;
        records.clone()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn prior_hashes(&self, user_id: &str) -> Result<Vec<String>, HistoryError> {
        let Some(slot) = self.users.get(user_id).map(|s| s.value().clone()) else {
            return Ok(Vec::new());
        };
        let records = slot.lock().await;
        Ok(records
            .iter()
            .flat_map(|record| record.files.iter().map(|f| f.perceptual_hash.clone()))
            .collect())
    }

    async fn insert_unless_duplicate(
        &self,
        record: &BundleRecord,
        detector: &DuplicateDetector,
    ) -> Result<InsertOutcome, HistoryError> {
        let slot = self.user(&record.user_id);
        let mut records = slot.lock().await;

        let prior: Vec<(&str, Vec<String>)> = records
            .iter()
            .map(|r| (r.signature.as_str(), r.perceptual_hashes()))
            .collect();
        let conflict = find_conflict(
            record,
            prior.iter().map(|(sig, hashes)| (*sig, hashes.as_slice())),
            detector,
        );
        if let Some(found) = conflict {
            return Ok(InsertOutcome::Duplicate(found));
        }

        drop(prior);
        records.push(record.clone());
        tracing::debug!(
            user_id = %record.user_id,
            signature = %record.signature.short(),
            total = records.len(),
            "Stored bundle in memory history"
        );
        Ok(InsertOutcome::Inserted)
    }

    async fn bundle_count(&self, user_id: &str) -> Result<usize, HistoryError> {
        let Some(slot) = self.users.get(user_id).map(|s| s.value().clone()) else {
            return Ok(0);
        };
        let records = slot.lock().await;
        Ok(records.len())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
