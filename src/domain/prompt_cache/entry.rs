//! Cache entries, tiers and lookup results

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::embedding::EmbeddingVector;
use crate::domain::llm::Response;
use crate::domain::DomainError;

/// Cache tier, in lookup order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheLevel {
    Exact,
    Semantic,
    Template,
}

impl CacheLevel {
    pub const ALL: [CacheLevel; 3] = [CacheLevel::Exact, CacheLevel::Semantic, CacheLevel::Template];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Semantic => "semantic",
            Self::Template => "template",
        }
    }
}

impl fmt::Display for CacheLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cached response at one tier.
///
/// `embedding` is present exactly when `level` is semantic; the
/// constructors are the only way to build an entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    key: String,
    level: CacheLevel,
    payload: Response,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    embedding: Option<EmbeddingVector>,
    ttl_seconds: u64,
    created_at: DateTime<Utc>,
    /// Kept in a companion counter key, filled in when the entry is read
    #[serde(skip)]
    hit_count: u64,
}

impl CacheEntry {
    pub fn exact(key: impl Into<String>, payload: Response, ttl: Duration) -> Self {
        Self::build(key.into(), CacheLevel::Exact, payload, None, ttl)
    }

    pub fn template(key: impl Into<String>, payload: Response, ttl: Duration) -> Self {
        Self::build(key.into(), CacheLevel::Template, payload, None, ttl)
    }

    pub fn semantic(
        key: impl Into<String>,
        payload: Response,
        embedding: EmbeddingVector,
        ttl: Duration,
    ) -> Self {
        Self::build(key.into(), CacheLevel::Semantic, payload, Some(embedding), ttl)
    }

    fn build(
        key: String,
        level: CacheLevel,
        payload: Response,
        embedding: Option<EmbeddingVector>,
        ttl: Duration,
    ) -> Self {
        Self {
            key,
            level,
            payload,
            embedding,
            ttl_seconds: ttl.as_secs(),
            created_at: Utc::now(),
            hit_count: 0,
        }
    }

    /// Entries read back from a store are checked before use
    pub fn check_invariants(&self) -> Result<(), DomainError> {
        let is_semantic = self.level == CacheLevel::Semantic;

        if self.embedding.is_some() != is_semantic {
            return Err(DomainError::store(format!(
                "Cache entry '{}' at level {} has inconsistent embedding",
                self.key, self.level
            )));
        }

        Ok(())
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn level(&self) -> CacheLevel {
        self.level
    }

    pub fn payload(&self) -> &Response {
        &self.payload
    }

    pub fn embedding(&self) -> Option<&EmbeddingVector> {
        self.embedding.as_ref()
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn hit_count(&self) -> u64 {
        self.hit_count
    }

    pub fn with_hit_count(mut self, hit_count: u64) -> Self {
        self.hit_count = hit_count;
        self
    }

    pub fn into_payload(self) -> Response {
        self.payload
    }
}

/// Outcome of a cache lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheLookupResult {
    pub hit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<CacheLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Response>,
    /// Similarity score for semantic hits
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,
}

impl CacheLookupResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            level: None,
            payload: None,
            similarity: None,
        }
    }

    pub fn hit(level: CacheLevel, payload: Response) -> Self {
        Self {
            hit: true,
            level: Some(level),
            payload: Some(payload),
            similarity: None,
        }
    }

    pub fn with_similarity(mut self, similarity: f32) -> Self {
        self.similarity = Some(similarity);
        self
    }
}
