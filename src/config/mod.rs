//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, EmbeddingBackend, EmbeddingSettings, IndexBackend, LogFormat, LoggingConfig,
    MetricsConfig, ServerConfig, SimilaritySettings, StoreSettings,
};
