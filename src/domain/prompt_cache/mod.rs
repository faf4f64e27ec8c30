//! Prompt cache domain - requests, tiers, entries and statistics

mod config;
mod entry;
mod request;
mod stats;

pub use config::PromptCacheConfig;
pub use entry::{CacheEntry, CacheLevel, CacheLookupResult};
pub use request::CacheRequest;
pub use stats::{CacheStats, LevelCounts};
