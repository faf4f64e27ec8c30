//! Prompt cache configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::CacheLevel;
use crate::domain::DomainError;

/// Configuration for the three-tier prompt cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptCacheConfig {
    /// Whether caching is enabled at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Minimum cosine similarity for a semantic hit (inclusive)
    #[serde(default = "default_semantic_threshold")]
    pub semantic_threshold: f32,

    #[serde(default = "default_exact_ttl_secs")]
    pub exact_ttl_secs: u64,

    #[serde(default = "default_semantic_ttl_secs")]
    pub semantic_ttl_secs: u64,

    #[serde(default = "default_template_ttl_secs")]
    pub template_ttl_secs: u64,

    /// Key prefix for every entry written by the cache
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// How often expired index records are purged
    #[serde(default = "default_maintenance_interval_secs")]
    pub maintenance_interval_secs: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_semantic_threshold() -> f32 {
    0.95
}

fn default_exact_ttl_secs() -> u64 {
    7 * 24 * 3600
}

fn default_semantic_ttl_secs() -> u64 {
    24 * 3600
}

fn default_template_ttl_secs() -> u64 {
    30 * 24 * 3600
}

fn default_namespace() -> String {
    "prompt".to_string()
}

fn default_maintenance_interval_secs() -> u64 {
    300
}

impl Default for PromptCacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            semantic_threshold: default_semantic_threshold(),
            exact_ttl_secs: default_exact_ttl_secs(),
            semantic_ttl_secs: default_semantic_ttl_secs(),
            template_ttl_secs: default_template_ttl_secs(),
            namespace: default_namespace(),
            maintenance_interval_secs: default_maintenance_interval_secs(),
        }
    }
}

impl PromptCacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_semantic_threshold(mut self, threshold: f32) -> Self {
        self.semantic_threshold = threshold;
        self
    }

    pub fn with_ttl(mut self, level: CacheLevel, ttl: Duration) -> Self {
        match level {
            CacheLevel::Exact => self.exact_ttl_secs = ttl.as_secs(),
            CacheLevel::Semantic => self.semantic_ttl_secs = ttl.as_secs(),
            CacheLevel::Template => self.template_ttl_secs = ttl.as_secs(),
        }
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// TTL for entries stored at `level`
    pub fn ttl(&self, level: CacheLevel) -> Duration {
        Duration::from_secs(match level {
            CacheLevel::Exact => self.exact_ttl_secs,
            CacheLevel::Semantic => self.semantic_ttl_secs,
            CacheLevel::Template => self.template_ttl_secs,
        })
    }

    pub fn maintenance_interval(&self) -> Duration {
        Duration::from_secs(self.maintenance_interval_secs)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if !(0.0..=1.0).contains(&self.semantic_threshold) {
            return Err(DomainError::configuration(format!(
                "prompt_cache.semantic_threshold must be within [0, 1], got {}",
                self.semantic_threshold
            )));
        }

        for level in CacheLevel::ALL {
            if self.ttl(level).is_zero() {
                return Err(DomainError::configuration(format!(
                    "prompt_cache TTL for level {} must be positive",
                    level
                )));
            }
        }

        if self.namespace.trim().is_empty() {
            return Err(DomainError::configuration("prompt_cache.namespace cannot be empty"));
        }

        if self.maintenance_interval_secs == 0 {
            return Err(DomainError::configuration(
                "prompt_cache.maintenance_interval_secs must be positive",
            ));
        }

        Ok(())
    }
}
