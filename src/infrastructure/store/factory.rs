//! Store factory for runtime selection

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::domain::store::KeyValueStore;
use crate::domain::DomainError;

use super::fallback::FallbackStore;
use super::in_memory::{InMemoryStore, InMemoryStoreConfig};
use super::redis::{RedisStore, RedisStoreConfig};

/// Supported store backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    /// Process-local moka store
    #[default]
    Memory,
    /// Redis, wrapped in a sticky in-memory fallback
    Redis,
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreBackend::Memory => write!(f, "memory"),
            StoreBackend::Redis => write!(f, "redis"),
        }
    }
}

impl std::str::FromStr for StoreBackend {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" | "in_memory" | "inmemory" => Ok(StoreBackend::Memory),
            "redis" => Ok(StoreBackend::Redis),
            _ => Err(DomainError::configuration(format!(
                "Unknown store backend: {}. Valid backends: memory, redis",
                s
            ))),
        }
    }
}

/// Configuration for the store factory
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Required for the Redis backend
    pub redis_url: Option<String>,
    pub key_prefix: Option<String>,
    /// Per-operation timeout against the primary store
    pub operation_timeout: Duration,
    /// Capacity of the in-memory store (or of the fallback when using Redis)
    pub capacity: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            redis_url: None,
            key_prefix: None,
            operation_timeout: Duration::from_millis(500),
            capacity: 10_000,
        }
    }
}

impl StoreConfig {
    pub fn memory() -> Self {
        Self::default()
    }

    pub fn redis(url: impl Into<String>) -> Self {
        Self {
            backend: StoreBackend::Redis,
            redis_url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    pub fn with_capacity(mut self, capacity: u64) -> Self {
        self.capacity = capacity;
        self
    }
}

/// Factory for creating store instances
#[derive(Debug, Default)]
pub struct StoreFactory;

impl StoreFactory {
    pub fn new() -> Self {
        Self
    }

    /// Creates a store for the configured backend.
    ///
    /// An unreachable Redis does not fail startup: the returned store begins
    /// in degraded mode. A missing URL does.
    pub async fn create(&self, config: &StoreConfig) -> Result<Arc<dyn KeyValueStore>, DomainError> {
        let local = || {
            InMemoryStore::with_config(
                InMemoryStoreConfig::default().with_max_capacity(config.capacity),
            )
        };

        match config.backend {
            StoreBackend::Memory => {
                info!(capacity = config.capacity, "Using in-memory store");
                Ok(Arc::new(local()))
            }
            StoreBackend::Redis => {
                let url = config.redis_url.clone().ok_or_else(|| {
                    DomainError::configuration("store.redis_url is required for the redis backend")
                })?;

                let mut redis_config =
                    RedisStoreConfig::new(url).with_connection_timeout(config.operation_timeout * 10);

                if let Some(prefix) = &config.key_prefix {
                    redis_config = redis_config.with_key_prefix(prefix.clone());
                }

                match RedisStore::new(redis_config).await {
                    Ok(redis) => {
                        info!("Connected to Redis store");
                        Ok(Arc::new(FallbackStore::new(
                            Arc::new(redis),
                            local(),
                            config.operation_timeout,
                        )))
                    }
                    Err(e) if e.is_unavailable() => {
                        Ok(Arc::new(FallbackStore::degraded(local(), &e.to_string())))
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }

    pub fn create_in_memory(&self) -> Arc<dyn KeyValueStore> {
        Arc::new(InMemoryStore::new())
    }
}
