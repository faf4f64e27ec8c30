//! Modification detection results and settings

use serde::{Deserialize, Serialize};

use super::WorkItem;
use crate::domain::DomainError;

/// Settings for duplicate/modification detection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModificationConfig {
    /// Minimum similarity for a candidate to count as a modification (inclusive)
    #[serde(default = "default_threshold")]
    pub threshold: f32,

    /// Key prefix for the detection index when it is store-backed
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_threshold() -> f32 {
    0.90
}

fn default_namespace() -> String {
    "workitems".to_string()
}

impl Default for ModificationConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            namespace: default_namespace(),
        }
    }
}

impl ModificationConfig {
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(DomainError::configuration(format!(
                "modification.threshold must be within [0, 1], got {}",
                self.threshold
            )));
        }

        if self.namespace.trim().is_empty() {
            return Err(DomainError::configuration("modification.namespace cannot be empty"));
        }

        Ok(())
    }
}

/// Outcome of checking a candidate against the backlog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModificationCheckResult {
    pub blocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched: Option<WorkItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl ModificationCheckResult {
    pub fn not_blocked() -> Self {
        Self {
            blocked: false,
            matched: None,
            score: None,
        }
    }

    pub fn blocked(matched: WorkItem, score: f32) -> Self {
        Self {
            blocked: true,
            matched: Some(matched),
            score: Some(score),
        }
    }
}

/// What happened to a proposed work item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProposalOutcome {
    /// No near-duplicate; the item was created
    Created { item: WorkItem },
    /// An existing item was blocked pending a decision
    Blocked {
        item: WorkItem,
        check: ModificationCheckResult,
    },
}
