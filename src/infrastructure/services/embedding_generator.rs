//! Text to unit-vector encoding over an embedding provider

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::domain::embedding::{EmbeddingProvider, EmbeddingRequest, EmbeddingVector};
use crate::domain::DomainError;

/// Wraps an [`EmbeddingProvider`] and turns its output into normalized
/// vectors. Every failure, including a timeout, is an `Encoding` error.
#[derive(Debug, Clone)]
pub struct EmbeddingGenerator {
    provider: Arc<dyn EmbeddingProvider>,
    model: String,
    dimensions: Option<usize>,
    timeout: Duration,
}

impl EmbeddingGenerator {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            provider,
            model: model.into(),
            dimensions: None,
            timeout,
        }
    }

    /// Uses the provider's default model
    pub fn with_default_model(provider: Arc<dyn EmbeddingProvider>, timeout: Duration) -> Self {
        let model = provider.default_model().to_string();
        Self::new(provider, model, timeout)
    }

    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    pub async fn encode(&self, text: &str) -> Result<EmbeddingVector, DomainError> {
        if text.trim().is_empty() {
            return Err(DomainError::encoding("cannot embed empty text"));
        }

        let mut request = EmbeddingRequest::single(&self.model, text);
        if let Some(dimensions) = self.dimensions {
            request = request.with_dimensions(dimensions);
        }

        let response = tokio::time::timeout(self.timeout, self.provider.embed(request))
            .await
            .map_err(|_| {
                DomainError::encoding(format!(
                    "{} embedding timed out after {:?}",
                    self.provider.provider_name(),
                    self.timeout
                ))
            })?
            .map_err(|e| DomainError::encoding(format!("embedding provider failed: {}", e)))?;

        let embedding = response
            .into_first()
            .ok_or_else(|| DomainError::encoding("embedding provider returned no vector"))?;

        debug!(
            provider = self.provider.provider_name(),
            dimensions = embedding.dimensions(),
            "Encoded text"
        );

        EmbeddingVector::from_raw(embedding.into_vector())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::embedding::{EmbeddingResponse, MockEmbeddingProvider};
    use async_trait::async_trait;

    fn generator(provider: MockEmbeddingProvider) -> EmbeddingGenerator {
        EmbeddingGenerator::new(Arc::new(provider), "mock-embedding", Duration::from_millis(200))
    }

    #[derive(Debug)]
    struct EmptyProvider;

    #[async_trait]
    impl EmbeddingProvider for EmptyProvider {
        async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, DomainError> {
            Ok(EmbeddingResponse::new(request.model(), vec![], 0))
        }

        fn provider_name(&self) -> &'static str {
            "empty"
        }

        fn default_model(&self) -> &'static str {
            "empty-model"
        }

        fn dimensions(&self, _model: &str) -> Option<usize> {
            None
        }
    }

    #[tokio::test]
    async fn test_encode_normalizes() {
        let generator = generator(MockEmbeddingProvider::new(2).with_vector("hello", vec![3.0, 4.0]));

        let vector = generator.encode("hello").await.unwrap();

        assert!((vector.as_slice()[0] - 0.6).abs() < 1e-6);
        assert!((vector.as_slice()[1] - 0.8).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_encode_is_deterministic() {
        let generator = generator(MockEmbeddingProvider::new(32));

        let a = generator.encode("same text").await.unwrap();
        let b = generator.encode("same text").await.unwrap();

        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_empty_text_is_rejected_without_calling_provider() {
        let provider = Arc::new(MockEmbeddingProvider::new(4));
        let generator = EmbeddingGenerator::new(provider.clone(), "m", Duration::from_secs(1));

        let result = generator.encode("   \n").await;

        assert!(matches!(result, Err(DomainError::Encoding { .. })));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_provider_error_becomes_encoding_error() {
        let generator = generator(MockEmbeddingProvider::new(4).with_error("quota exceeded"));

        let result = generator.encode("hello").await;
        assert!(matches!(result, Err(DomainError::Encoding { .. })));
    }

    #[tokio::test]
    async fn test_timeout_becomes_encoding_error() {
        let generator =
            generator(MockEmbeddingProvider::new(4).with_delay(Duration::from_secs(5)));

        let result = generator.encode("hello").await;
        assert!(matches!(result, Err(DomainError::Encoding { .. })));
    }

    #[tokio::test]
    async fn test_zero_vector_rejected() {
        let generator = generator(MockEmbeddingProvider::new(2).with_vector("zero", vec![0.0, 0.0]));

        let result = generator.encode("zero").await;
        assert!(matches!(result, Err(DomainError::Encoding { .. })));
    }

    #[tokio::test]
    async fn test_missing_vector() {
        let generator = EmbeddingGenerator::with_default_model(Arc::new(EmptyProvider), Duration::from_secs(1));

        assert_eq!(generator.model(), "empty-model");
        let result = generator.encode("hello").await;
        assert!(matches!(result, Err(DomainError::Encoding { .. })));
    }
}
