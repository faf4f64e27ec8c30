//! Embedding provider domain models and traits

mod provider;
mod request;
mod response;
mod vector;

pub use provider::EmbeddingProvider;
pub use request::EmbeddingRequest;
pub use response::{Embedding, EmbeddingResponse};
pub use vector::{cosine_similarity, EmbeddingVector, NORMALIZATION_TOLERANCE};

#[cfg(test)]
pub use provider::mock::MockEmbeddingProvider;
