//! Embedding provider trait definition

use async_trait::async_trait;
use std::fmt::Debug;

use super::{EmbeddingRequest, EmbeddingResponse};
use crate::domain::DomainError;

/// An external embedding model (OpenAI-compatible API, local hashing, ...)
#[async_trait]
pub trait EmbeddingProvider: Send + Sync + Debug {
    /// Generate embeddings for the given input
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, DomainError>;

    fn provider_name(&self) -> &'static str;

    /// Model used when the caller does not configure one
    fn default_model(&self) -> &'static str;

    /// Output dimensions for a model, if known
    fn dimensions(&self, model: &str) -> Option<usize>;
}
