//! Semantic Similarity Engine
//!
//! Text is embedded into unit vectors and compared by cosine similarity.
//! Two consumers share that primitive:
//! - a three-tier prompt cache (exact, semantic, template)
//! - near-duplicate detection for work items, with a block/approve/reject
//!   review workflow

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod engine;
pub mod infrastructure;

pub use config::AppConfig;
pub use engine::Engine;
