//! Infrastructure services

mod embedding_generator;
mod modification_detector;
mod modification_manager;
mod prompt_cache;

pub use embedding_generator::EmbeddingGenerator;
pub use modification_detector::ModificationDetector;
pub use modification_manager::ModificationManager;
pub use prompt_cache::{CachedExecution, PromptCacheService};
