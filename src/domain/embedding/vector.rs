//! Unit-length embedding vectors and similarity scoring

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Vectors whose norm is already this close to 1.0 are kept as-is
pub const NORMALIZATION_TOLERANCE: f32 = 1e-4;

/// An L2-normalized embedding.
///
/// Construction always goes through [`EmbeddingVector::from_raw`], so every
/// instance has unit length and finite components. Cosine similarity between
/// two instances reduces to a dot product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct EmbeddingVector(Vec<f32>);

impl EmbeddingVector {
    /// Validate and normalize a raw provider vector
    pub fn from_raw(values: Vec<f32>) -> Result<Self, DomainError> {
        if values.is_empty() {
            return Err(DomainError::encoding("Embedding vector is empty"));
        }

        if values.iter().any(|v| !v.is_finite()) {
            return Err(DomainError::encoding(
                "Embedding vector contains non-finite components",
            ));
        }

        let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();

        if norm == 0.0 {
            return Err(DomainError::encoding("Embedding vector has zero norm"));
        }

        if (norm - 1.0).abs() <= NORMALIZATION_TOLERANCE {
            return Ok(Self(values));
        }

        Ok(Self(values.into_iter().map(|v| v / norm).collect()))
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn dimensions(&self) -> usize {
        self.0.len()
    }

    /// Cosine similarity with another vector, `None` when dimensions differ
    pub fn similarity(&self, other: &EmbeddingVector) -> Option<f32> {
        cosine_similarity(self, other)
    }
}

impl TryFrom<Vec<f32>> for EmbeddingVector {
    type Error = DomainError;

    fn try_from(values: Vec<f32>) -> Result<Self, Self::Error> {
        Self::from_raw(values)
    }
}

impl From<EmbeddingVector> for Vec<f32> {
    fn from(vector: EmbeddingVector) -> Self {
        vector.0
    }
}

/// Dot product of two unit vectors
pub fn cosine_similarity(a: &EmbeddingVector, b: &EmbeddingVector) -> Option<f32> {
    if a.dimensions() != b.dimensions() {
        return None;
    }

    Some(a.0.iter().zip(b.0.iter()).map(|(x, y)| x * y).sum())
}
