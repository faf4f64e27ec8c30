use serde::{Deserialize, Serialize};

use crate::domain::prompt_cache::{CacheLevel, CacheRequest, CacheStats};
use crate::domain::Response;

/// Body of `POST /v1/cache/entries`
#[derive(Debug, Clone, Deserialize)]
pub struct PutCacheEntryRequest {
    #[serde(flatten)]
    pub request: CacheRequest,
    pub response: Response,
    #[serde(default = "default_level")]
    pub level: CacheLevel,
}

fn default_level() -> CacheLevel {
    CacheLevel::Exact
}

#[derive(Debug, Clone, Serialize)]
pub struct RemovedResponse {
    pub removed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStatsResponse {
    pub enabled: bool,
    #[serde(flatten)]
    pub stats: CacheStats,
}
