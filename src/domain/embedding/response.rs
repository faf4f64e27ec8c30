//! Embedding response types

use serde::{Deserialize, Serialize};

/// A raw (not yet normalized) embedding returned by a provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    index: usize,
    embedding: Vec<f32>,
}

impl Embedding {
    pub fn new(index: usize, embedding: Vec<f32>) -> Self {
        Self { index, embedding }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn vector(&self) -> &[f32] {
        &self.embedding
    }

    pub fn dimensions(&self) -> usize {
        self.embedding.len()
    }

    pub fn into_vector(self) -> Vec<f32> {
        self.embedding
    }
}

/// Response from an embedding request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    model: String,
    data: Vec<Embedding>,
    /// Prompt tokens consumed, when the provider reports them
    #[serde(default)]
    prompt_tokens: u32,
}

impl EmbeddingResponse {
    pub fn new(model: impl Into<String>, data: Vec<Embedding>, prompt_tokens: u32) -> Self {
        Self {
            model: model.into(),
            data,
            prompt_tokens,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn embeddings(&self) -> &[Embedding] {
        &self.data
    }

    pub fn prompt_tokens(&self) -> u32 {
        self.prompt_tokens
    }

    /// Take the first embedding (single input requests)
    pub fn into_first(self) -> Option<Embedding> {
        self.data.into_iter().min_by_key(|e| e.index)
    }
}
