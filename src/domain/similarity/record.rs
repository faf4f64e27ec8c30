//! Similarity index records and query results

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::embedding::EmbeddingVector;

/// Scores closer than this are treated as equal; recency decides
pub const TIE_EPSILON: f32 = 1e-6;

/// Filterable metadata attached to a record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    /// Partition key: model name for the cache, backlog id for detection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

/// A vector stored in a similarity index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityRecord {
    id: String,
    vector: EmbeddingVector,
    payload_ref: String,
    #[serde(default)]
    metadata: RecordMetadata,
    /// Assigned by the index on every upsert
    #[serde(default)]
    sequence: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
}

impl SimilarityRecord {
    pub fn new(id: impl Into<String>, vector: EmbeddingVector, payload_ref: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            vector,
            payload_ref: payload_ref.into(),
            metadata: RecordMetadata::default(),
            sequence: 0,
            expires_at: None,
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.metadata.scope = Some(scope.into());
        self
    }

    pub fn with_extra(mut self, extra: serde_json::Value) -> Self {
        self.metadata.extra = Some(extra);
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.expires_at = chrono::Duration::from_std(ttl).ok().map(|d| Utc::now() + d);
        self
    }

    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub(crate) fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn vector(&self) -> &EmbeddingVector {
        &self.vector
    }

    pub fn payload_ref(&self) -> &str {
        &self.payload_ref
    }

    pub fn metadata(&self) -> &RecordMetadata {
        &self.metadata
    }

    pub fn scope(&self) -> Option<&str> {
        self.metadata.scope.as_deref()
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Best match returned by a similarity query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMatch {
    pub key: String,
    pub score: f32,
    pub payload_ref: String,
    pub metadata: RecordMetadata,
}

/// Exhaustive best-match selection over a set of records.
///
/// Keeps records in `scope` (when given) that are not expired, have the
/// query's dimensions and score at least `threshold`. Among those the highest
/// score wins; scores within [`TIE_EPSILON`] go to the higher sequence.
pub fn select_best<'a, I>(
    records: I,
    vector: &EmbeddingVector,
    threshold: f32,
    scope: Option<&str>,
) -> Option<SimilarityMatch>
where
    I: IntoIterator<Item = &'a SimilarityRecord>,
{
    let now = Utc::now();
    let mut best: Option<(f32, &SimilarityRecord)> = None;

    for record in records {
        if record.is_expired_at(now) {
            continue;
        }

        if scope.is_some() && record.scope() != scope {
            continue;
        }

        let Some(score) = record.vector.similarity(vector) else {
            continue;
        };

        if score < threshold {
            continue;
        }

        best = match best {
            None => Some((score, record)),
            Some((best_score, current)) => {
                let replace = if (score - best_score).abs() <= TIE_EPSILON {
                    record.sequence > current.sequence
                } else {
                    score > best_score
                };

                if replace {
                    Some((score, record))
                } else {
                    Some((best_score, current))
                }
            }
        };
    }

    best.map(|(score, record)| SimilarityMatch {
        key: record.id.clone(),
        score,
        payload_ref: record.payload_ref.clone(),
        metadata: record.metadata.clone(),
    })
}
