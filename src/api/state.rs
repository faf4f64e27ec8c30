//! Application state for shared services

use std::sync::Arc;

use crate::domain::store::KeyValueStore;
use crate::engine::Engine;
use crate::infrastructure::services::{ModificationManager, PromptCacheService};

#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Arc<dyn KeyValueStore>,
    pub prompt_cache: Arc<PromptCacheService>,
    pub modifications: Arc<ModificationManager>,
}

impl AppState {
    pub fn from_engine(engine: &Engine) -> Self {
        Self {
            store: engine.store.clone(),
            prompt_cache: engine.prompt_cache.clone(),
            modifications: engine.modifications.clone(),
        }
    }
}
