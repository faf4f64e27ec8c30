//! Local feature-hashing embedder

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::domain::embedding::{Embedding, EmbeddingProvider, EmbeddingRequest, EmbeddingResponse};
use crate::domain::DomainError;

pub const HASHING_MODEL: &str = "feature-hashing-v1";
pub const DEFAULT_HASHING_DIMENSIONS: usize = 256;

/// Bag-of-words embedder that needs no network.
///
/// Each lowercase alphanumeric token (and each adjacent token pair) is hashed
/// with SHA-256 into a signed bucket. Texts sharing vocabulary land close
/// together; it is deterministic across processes and platforms.
#[derive(Debug, Clone)]
pub struct HashingEmbeddingProvider {
    dimensions: usize,
}

impl HashingEmbeddingProvider {
    pub fn new(dimensions: usize) -> Result<Self, DomainError> {
        if dimensions == 0 {
            return Err(DomainError::configuration(
                "hashing embedder needs at least one dimension",
            ));
        }

        Ok(Self { dimensions })
    }

    fn tokens(text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
            .collect()
    }

    fn bucket(&self, feature: &str) -> (usize, f32) {
        let digest = Sha256::digest(feature.as_bytes());

        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        let slot = (u64::from_le_bytes(bytes) % self.dimensions as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };

        (slot, sign)
    }

    /// Raw (unnormalized) vector for a text; all zeros when it has no tokens
    pub fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let tokens = Self::tokens(text);

        for token in &tokens {
            let (slot, sign) = self.bucket(token);
            vector[slot] += sign;
        }

        for pair in tokens.windows(2) {
            let (slot, sign) = self.bucket(&format!("{} {}", pair[0], pair[1]));
            vector[slot] += 0.5 * sign;
        }

        vector
    }
}

impl Default for HashingEmbeddingProvider {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_HASHING_DIMENSIONS,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbeddingProvider {
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, DomainError> {
        if let Some(requested) = request.dimensions() {
            if requested != self.dimensions {
                return Err(DomainError::provider(
                    "hashing",
                    format!(
                        "configured for {} dimensions, {} requested",
                        self.dimensions, requested
                    ),
                ));
            }
        }

        let data = request
            .inputs()
            .iter()
            .enumerate()
            .map(|(idx, text)| Embedding::new(idx, self.vectorize(text)))
            .collect();

        Ok(EmbeddingResponse::new(request.model(), data, 0))
    }

    fn provider_name(&self) -> &'static str {
        "hashing"
    }

    fn default_model(&self) -> &'static str {
        HASHING_MODEL
    }

    fn dimensions(&self, _model: &str) -> Option<usize> {
        Some(self.dimensions)
    }
}
