use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::prompt_cache::PromptCacheConfig;
use crate::domain::work_item::ModificationConfig;
use crate::domain::DomainError;
use crate::infrastructure::embedding::DEFAULT_HASHING_DIMENSIONS;
use crate::infrastructure::store::{StoreBackend, StoreConfig};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub embedding: EmbeddingSettings,
    #[serde(default)]
    pub similarity: SimilaritySettings,
    #[serde(default)]
    pub prompt_cache: PromptCacheConfig,
    #[serde(default)]
    pub modification: ModificationConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Backing key-value store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// `memory` or `redis`
    #[serde(default = "default_store_backend")]
    pub backend: String,
    #[serde(default)]
    pub redis_url: Option<String>,
    #[serde(default)]
    pub key_prefix: Option<String>,
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,
    /// Capacity of the in-process store, also used as the Redis fallback
    #[serde(default = "default_fallback_capacity")]
    pub fallback_capacity: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Local feature-hashing embedder, no network
    #[default]
    Hashing,
    OpenAi,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    #[serde(default)]
    pub provider: EmbeddingBackend,
    /// Defaults to the provider's own model
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub dimensions: Option<usize>,
    #[serde(default = "default_embedding_timeout_ms")]
    pub timeout_ms: u64,
}

/// Where similarity records live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    #[default]
    Memory,
    /// Persisted through the backing store, shared across processes
    Store,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilaritySettings {
    #[serde(default)]
    pub backend: IndexBackend,
    /// Per-index bound for the in-memory backend
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_store_backend() -> String {
    "memory".to_string()
}

fn default_operation_timeout_ms() -> u64 {
    500
}

fn default_fallback_capacity() -> u64 {
    10_000
}

fn default_embedding_timeout_ms() -> u64 {
    5_000
}

fn default_max_entries() -> usize {
    10_000
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            redis_url: None,
            key_prefix: None,
            operation_timeout_ms: default_operation_timeout_ms(),
            fallback_capacity: default_fallback_capacity(),
        }
    }
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingBackend::default(),
            model: None,
            api_key: None,
            base_url: None,
            dimensions: None,
            timeout_ms: default_embedding_timeout_ms(),
        }
    }
}

impl Default for SimilaritySettings {
    fn default() -> Self {
        Self {
            backend: IndexBackend::default(),
            max_entries: default_max_entries(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl StoreSettings {
    /// Resolves the factory configuration, rejecting unknown backends
    pub fn to_store_config(&self) -> Result<StoreConfig, DomainError> {
        let backend: StoreBackend = self.backend.parse()?;

        Ok(StoreConfig {
            backend,
            redis_url: self.redis_url.clone(),
            key_prefix: self.key_prefix.clone(),
            operation_timeout: Duration::from_millis(self.operation_timeout_ms),
            capacity: self.fallback_capacity,
        })
    }
}

impl EmbeddingSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn hashing_dimensions(&self) -> usize {
        self.dimensions.unwrap_or(DEFAULT_HASHING_DIMENSIONS)
    }
}

impl AppConfig {
    /// Layers `config/default`, `config/local` and `APP__*` environment variables
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        let store = self.store.to_store_config()?;

        if store.backend == StoreBackend::Redis && store.redis_url.is_none() {
            return Err(DomainError::configuration(
                "store.redis_url is required for the redis backend",
            ));
        }

        if self.store.operation_timeout_ms == 0 {
            return Err(DomainError::configuration("store.operation_timeout_ms must be positive"));
        }

        if self.store.fallback_capacity == 0 {
            return Err(DomainError::configuration("store.fallback_capacity must be positive"));
        }

        if self.embedding.timeout_ms == 0 {
            return Err(DomainError::configuration("embedding.timeout_ms must be positive"));
        }

        if self.embedding.dimensions == Some(0) {
            return Err(DomainError::configuration("embedding.dimensions must be positive"));
        }

        if self.embedding.provider == EmbeddingBackend::OpenAi
            && self.embedding.api_key.as_deref().is_none_or(|k| k.trim().is_empty())
        {
            return Err(DomainError::configuration(
                "embedding.api_key is required for the openai provider",
            ));
        }

        if self.similarity.max_entries == 0 {
            return Err(DomainError::configuration("similarity.max_entries must be positive"));
        }

        self.prompt_cache.validate()?;
        self.modification.validate()?;

        Ok(())
    }
}
