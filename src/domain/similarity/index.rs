//! Similarity index trait definition

use std::fmt::Debug;

use async_trait::async_trait;

use super::{SimilarityMatch, SimilarityRecord};
use crate::domain::embedding::EmbeddingVector;
use crate::domain::DomainError;

/// Stores vectors and answers best-match queries under a threshold
#[async_trait]
pub trait SimilarityIndex: Send + Sync + Debug {
    /// Inserts or replaces a record by id and returns its new sequence number
    async fn upsert(&self, record: SimilarityRecord) -> Result<u64, DomainError>;

    /// Single best match with score `>= threshold`, restricted to `scope` when given
    async fn query(
        &self,
        vector: &EmbeddingVector,
        threshold: f32,
        scope: Option<&str>,
    ) -> Result<Option<SimilarityMatch>, DomainError>;

    async fn get(&self, key: &str) -> Result<Option<SimilarityRecord>, DomainError>;

    async fn remove(&self, key: &str) -> Result<bool, DomainError>;

    async fn len(&self) -> Result<usize, DomainError>;

    async fn clear(&self) -> Result<(), DomainError>;

    /// Drops expired records, returning how many were removed
    async fn purge_expired(&self) -> Result<usize, DomainError>;
}
