//! Embedding request types

use serde::{Deserialize, Serialize};

/// Request to generate embeddings for one or more texts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    model: String,
    input: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

impl EmbeddingRequest {
    /// Create a request for a single text
    pub fn single(model: impl Into<String>, text: impl Into<String>) -> Self {
        Self::batch(model, vec![text.into()])
    }

    /// Create a request for multiple texts
    pub fn batch(model: impl Into<String>, texts: Vec<String>) -> Self {
        Self {
            model: model.into(),
            input: texts,
            dimensions: None,
        }
    }

    /// Ask the provider for a reduced output size (models that support it)
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn inputs(&self) -> &[String] {
        &self.input
    }

    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_request() {
        let request = EmbeddingRequest::single("text-embedding-3-small", "test");

        assert_eq!(request.model(), "text-embedding-3-small");
        assert_eq!(request.inputs(), &["test".to_string()]);
        assert_eq!(request.dimensions(), None);
    }

    #[test]
    fn test_batch_request_with_dimensions() {
        let request = EmbeddingRequest::batch("m", vec!["a".into(), "b".into()]).with_dimensions(256);

        assert_eq!(request.inputs().len(), 2);
        assert_eq!(request.dimensions(), Some(256));
    }
}
