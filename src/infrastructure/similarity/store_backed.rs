//! Similarity index persisted through the key-value store

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::warn;

use crate::domain::embedding::EmbeddingVector;
use crate::domain::similarity::{select_best, SimilarityIndex, SimilarityMatch, SimilarityRecord};
use crate::domain::store::{KeyValueStore, KeyValueStoreExt};
use crate::domain::DomainError;

/// Index whose records live in the shared store as JSON, so several
/// processes see the same vectors.
///
/// Layout: `{namespace}:rec:{id}` per record and `{namespace}:seq` for the
/// sequence counter. Queries load every record under the namespace.
#[derive(Debug)]
pub struct StoreSimilarityIndex {
    store: Arc<dyn KeyValueStore>,
    namespace: String,
}

impl StoreSimilarityIndex {
    pub fn new(store: Arc<dyn KeyValueStore>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn record_key(&self, id: &str) -> String {
        format!("{}:rec:{}", self.namespace, id)
    }

    fn record_pattern(&self) -> String {
        format!("{}:rec:*", self.namespace)
    }

    fn sequence_key(&self) -> String {
        format!("{}:seq", self.namespace)
    }

    /// Store TTL matching the record's expiry; `None` keeps it until removed
    fn store_ttl(record: &SimilarityRecord) -> Option<Duration> {
        record.expires_at().map(|at| {
            (at - Utc::now())
                .to_std()
                .unwrap_or_default()
                .max(Duration::from_secs(1))
        })
    }

    async fn load_all(&self) -> Result<Vec<SimilarityRecord>, DomainError> {
        let keys = self.store.keys(&self.record_pattern()).await?;
        let mut records = Vec::with_capacity(keys.len());

        for key in keys {
            match self.store.get::<SimilarityRecord>(&key).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) if e.is_unavailable() => return Err(e),
                Err(e) => warn!(key = %key, error = %e, "Skipping unreadable similarity record"),
            }
        }

        Ok(records)
    }
}

#[async_trait]
impl SimilarityIndex for StoreSimilarityIndex {
    async fn upsert(&self, record: SimilarityRecord) -> Result<u64, DomainError> {
        let sequence = self.store.increment(&self.sequence_key(), 1).await?;
        let sequence = u64::try_from(sequence).map_err(|_| {
            DomainError::store(format!("Sequence counter went negative: {}", sequence))
        })?;

        let record = record.with_sequence(sequence);
        let key = self.record_key(record.id());

        match Self::store_ttl(&record) {
            Some(ttl) => self.store.set(&key, &record, ttl).await?,
            None => self.store.set_persistent(&key, &record).await?,
        }

        Ok(sequence)
    }

    async fn query(
        &self,
        vector: &EmbeddingVector,
        threshold: f32,
        scope: Option<&str>,
    ) -> Result<Option<SimilarityMatch>, DomainError> {
        let records = self.load_all().await?;

        Ok(select_best(&records, vector, threshold, scope))
    }

    async fn get(&self, key: &str) -> Result<Option<SimilarityRecord>, DomainError> {
        let record: Option<SimilarityRecord> = self.store.get(&self.record_key(key)).await?;

        Ok(record.filter(|r| !r.is_expired()))
    }

    async fn remove(&self, key: &str) -> Result<bool, DomainError> {
        self.store.delete(&self.record_key(key)).await
    }

    async fn len(&self) -> Result<usize, DomainError> {
        Ok(self.store.keys(&self.record_pattern()).await?.len())
    }

    async fn clear(&self) -> Result<(), DomainError> {
        self.store.delete_pattern(&self.record_pattern()).await?;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize, DomainError> {
        let now = Utc::now();
        let mut purged = 0;

        for record in self.load_all().await? {
            if record.is_expired_at(now) && self.store.delete(&self.record_key(record.id())).await? {
                purged += 1;
            }
        }

        Ok(purged)
    }
}
