//! In-memory similarity index

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use crate::domain::embedding::EmbeddingVector;
use crate::domain::similarity::{select_best, SimilarityIndex, SimilarityMatch, SimilarityRecord};
use crate::domain::DomainError;

/// Exhaustive-scan index held in process memory.
///
/// A bounded index makes room for a new key by dropping expired records
/// first, then the record with the lowest sequence. An unbounded index only
/// loses records to `remove`, `clear` and `purge_expired`.
#[derive(Debug)]
pub struct InMemorySimilarityIndex {
    records: RwLock<HashMap<String, SimilarityRecord>>,
    max_entries: Option<usize>,
    sequence: AtomicU64,
    evictions: AtomicU64,
}

impl InMemorySimilarityIndex {
    pub fn new(max_entries: usize) -> Self {
        Self::build(Some(max_entries.max(1)))
    }

    pub fn unbounded() -> Self {
        Self::build(None)
    }

    fn build(max_entries: Option<usize>) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            max_entries,
            sequence: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn max_entries(&self) -> Option<usize> {
        self.max_entries
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    fn evict_if_needed(&self, records: &mut HashMap<String, SimilarityRecord>) {
        let Some(max_entries) = self.max_entries else {
            return;
        };

        if records.len() >= max_entries {
            let now = Utc::now();
            records.retain(|_, r| !r.is_expired_at(now));
        }

        while records.len() >= max_entries {
            let Some(oldest) = records
                .values()
                .min_by_key(|r| r.sequence())
                .map(|r| r.id().to_string())
            else {
                return;
            };

            debug!(key = %oldest, "Evicting oldest similarity record");
            records.remove(&oldest);
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl Default for InMemorySimilarityIndex {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl SimilarityIndex for InMemorySimilarityIndex {
    async fn upsert(&self, record: SimilarityRecord) -> Result<u64, DomainError> {
        let mut records = self
            .records
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))?;

        if !records.contains_key(record.id()) {
            self.evict_if_needed(&mut records);
        }

        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let record = record.with_sequence(sequence);
        records.insert(record.id().to_string(), record);

        Ok(sequence)
    }

    async fn query(
        &self,
        vector: &EmbeddingVector,
        threshold: f32,
        scope: Option<&str>,
    ) -> Result<Option<SimilarityMatch>, DomainError> {
        let records = self
            .records
            .read()
            .map_err(|e| DomainError::internal(format!("Failed to acquire read lock: {}", e)))?;

        Ok(select_best(records.values(), vector, threshold, scope))
    }

    async fn get(&self, key: &str) -> Result<Option<SimilarityRecord>, DomainError> {
        let records = self
            .records
            .read()
            .map_err(|e| DomainError::internal(format!("Failed to acquire read lock: {}", e)))?;

        Ok(records.get(key).filter(|r| !r.is_expired()).cloned())
    }

    async fn remove(&self, key: &str) -> Result<bool, DomainError> {
        let mut records = self
            .records
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))?;

        Ok(records.remove(key).is_some())
    }

    async fn len(&self) -> Result<usize, DomainError> {
        let records = self
            .records
            .read()
            .map_err(|e| DomainError::internal(format!("Failed to acquire read lock: {}", e)))?;

        Ok(records.len())
    }

    async fn clear(&self) -> Result<(), DomainError> {
        let mut records = self
            .records
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))?;

        records.clear();
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize, DomainError> {
        let mut records = self
            .records
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))?;

        let now = Utc::now();
        let before = records.len();
        records.retain(|_, r| !r.is_expired_at(now));

        Ok(before - records.len())
    }
}
