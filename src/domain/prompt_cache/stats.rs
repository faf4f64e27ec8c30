//! In-process cache statistics

use serde::{Deserialize, Serialize};

use super::CacheLevel;

/// One counter per cache tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelCounts {
    pub exact: u64,
    pub semantic: u64,
    pub template: u64,
}

impl LevelCounts {
    pub fn get(&self, level: CacheLevel) -> u64 {
        match level {
            CacheLevel::Exact => self.exact,
            CacheLevel::Semantic => self.semantic,
            CacheLevel::Template => self.template,
        }
    }

    pub fn total(&self) -> u64 {
        self.exact + self.semantic + self.template
    }
}

/// Snapshot of cache counters since process start (not authoritative)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_requests: u64,
    pub hits_by_level: LevelCounts,
    pub misses_by_level: LevelCounts,
    pub hit_rate: f64,
}

impl CacheStats {
    pub fn new(total_requests: u64, hits_by_level: LevelCounts, misses_by_level: LevelCounts) -> Self {
        let hit_rate = if total_requests == 0 {
            0.0
        } else {
            hits_by_level.total() as f64 / total_requests as f64
        };

        Self {
            total_requests,
            hits_by_level,
            misses_by_level,
            hit_rate,
        }
    }
}
