//! Composition root: builds every component from configuration

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

use crate::config::{AppConfig, EmbeddingBackend, IndexBackend};
use crate::domain::embedding::EmbeddingProvider;
use crate::domain::similarity::SimilarityIndex;
use crate::domain::store::KeyValueStore;
use crate::domain::work_item::WorkItemRepository;
use crate::domain::DomainError;
use crate::infrastructure::embedding::{
    HashingEmbeddingProvider, HttpClient, OpenAiEmbeddingProvider, DEFAULT_OPENAI_BASE_URL,
};
use crate::infrastructure::services::{
    EmbeddingGenerator, ModificationDetector, ModificationManager, PromptCacheService,
};
use crate::infrastructure::similarity::{InMemorySimilarityIndex, StoreSimilarityIndex};
use crate::infrastructure::store::StoreFactory;
use crate::infrastructure::work_item::InMemoryWorkItemRepository;

/// Every long-lived component of the engine.
///
/// Nothing is global: two engines built from the same configuration share no
/// state unless they point at the same external store.
#[derive(Debug)]
pub struct Engine {
    pub store: Arc<dyn KeyValueStore>,
    pub prompt_cache: Arc<PromptCacheService>,
    pub modifications: Arc<ModificationManager>,
    tasks: Vec<JoinHandle<()>>,
}

impl Engine {
    /// Validates `config` and wires the engine. Must run inside a tokio runtime.
    pub async fn init(config: &AppConfig) -> Result<Self, DomainError> {
        config.validate()?;

        let store = StoreFactory::new()
            .create(&config.store.to_store_config()?)
            .await?;

        let encoder = build_encoder(config)?;
        info!(
            provider = encoder.provider_name(),
            model = encoder.model(),
            "Embedding generator ready"
        );

        let cache_index = build_index(
            config,
            &store,
            format!("{}:index", config.prompt_cache.namespace),
            Some(config.similarity.max_entries),
        );
        let prompt_cache = Arc::new(PromptCacheService::with_config(
            store.clone(),
            cache_index,
            encoder.clone(),
            config.prompt_cache.clone(),
        ));

        let repository: Arc<dyn WorkItemRepository> = Arc::new(InMemoryWorkItemRepository::new());
        // Detection must see every indexed item, so this index never evicts
        let work_item_index =
            build_index(config, &store, config.modification.namespace.clone(), None);
        let detector = Arc::new(ModificationDetector::with_config(
            encoder,
            work_item_index,
            repository.clone(),
            config.modification.clone(),
        ));
        let modifications = Arc::new(ModificationManager::new(repository, detector));

        let mut tasks = Vec::new();
        if prompt_cache.is_enabled() {
            tasks.push(prompt_cache.spawn_maintenance(config.prompt_cache.maintenance_interval()));
        }

        info!(
            store = %config.store.backend,
            index = ?config.similarity.backend,
            cache_enabled = prompt_cache.is_enabled(),
            "Engine initialized"
        );

        Ok(Self {
            store,
            prompt_cache,
            modifications,
            tasks,
        })
    }

    /// Stops background maintenance
    pub fn shutdown(&self) {
        for task in &self.tasks {
            task.abort();
        }

        info!("Engine shut down");
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

fn build_encoder(config: &AppConfig) -> Result<EmbeddingGenerator, DomainError> {
    let settings = &config.embedding;

    let provider: Arc<dyn EmbeddingProvider> = match settings.provider {
        EmbeddingBackend::Hashing => Arc::new(HashingEmbeddingProvider::new(
            settings.hashing_dimensions(),
        )?),
        EmbeddingBackend::OpenAi => {
            let api_key = settings.api_key.clone().ok_or_else(|| {
                DomainError::configuration("embedding.api_key is required for the openai provider")
            })?;
            let base_url = settings
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string());

            Arc::new(OpenAiEmbeddingProvider::with_base_url(
                HttpClient::with_timeout(settings.timeout())?,
                api_key,
                base_url,
            ))
        }
    };

    let generator = match &settings.model {
        Some(model) => EmbeddingGenerator::new(provider, model.clone(), settings.timeout()),
        None => EmbeddingGenerator::with_default_model(provider, settings.timeout()),
    };

    Ok(match (settings.provider, settings.dimensions) {
        (EmbeddingBackend::OpenAi, Some(dimensions)) => generator.with_dimensions(dimensions),
        _ => generator,
    })
}

fn build_index(
    config: &AppConfig,
    store: &Arc<dyn KeyValueStore>,
    namespace: String,
    max_entries: Option<usize>,
) -> Arc<dyn SimilarityIndex> {
    match (config.similarity.backend, max_entries) {
        (IndexBackend::Memory, Some(max)) => Arc::new(InMemorySimilarityIndex::new(max)),
        (IndexBackend::Memory, None) => Arc::new(InMemorySimilarityIndex::unbounded()),
        (IndexBackend::Store, _) => Arc::new(StoreSimilarityIndex::new(store.clone(), namespace)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::prompt_cache::{CacheLevel, CacheRequest};
    use crate::domain::work_item::{ProposalOutcome, WorkItemDraft};
    use crate::domain::Response;

    #[tokio::test]
    async fn test_init_with_defaults() {
        let engine = Engine::init(&AppConfig::default()).await.unwrap();

        assert!(engine.prompt_cache.is_enabled());
        assert_eq!(engine.modifications.detector().threshold(), 0.90);
        assert_eq!(engine.tasks.len(), 1);

        engine.shutdown();
    }

    #[tokio::test]
    async fn test_init_rejects_invalid_config() {
        let mut config = AppConfig::default();
        config.prompt_cache.semantic_threshold = -0.1;

        let result = Engine::init(&config).await;
        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_engines_share_no_state() {
        let first = Engine::init(&AppConfig::default()).await.unwrap();
        let second = Engine::init(&AppConfig::default()).await.unwrap();

        let request = CacheRequest::new("2+2=?", "m1").with_temperature(0.0);
        first
            .prompt_cache
            .put(&request, &Response::new("4", 47, 0.0), CacheLevel::Exact)
            .await
            .unwrap();

        assert!(first.prompt_cache.get(&request).await.hit);
        assert!(!second.prompt_cache.get(&request).await.hit);
    }

    #[tokio::test]
    async fn test_cache_bound_does_not_evict_indexed_work_items() {
        let mut config = AppConfig::default();
        config.similarity.max_entries = 1;
        let engine = Engine::init(&config).await.unwrap();

        engine
            .modifications
            .create(WorkItemDraft::new("backlog-1", "Add user login"))
            .await
            .unwrap();
        engine
            .modifications
            .create(WorkItemDraft::new("backlog-2", "Export monthly invoices"))
            .await
            .unwrap();

        for prompt in ["first prompt", "second prompt"] {
            engine
                .prompt_cache
                .put(
                    &CacheRequest::new(prompt, "m1"),
                    &Response::new("ok", 1, 0.0),
                    CacheLevel::Semantic,
                )
                .await
                .unwrap();
        }

        let outcome = engine
            .modifications
            .propose(WorkItemDraft::new("backlog-1", "Add user login"))
            .await
            .unwrap();

        assert!(matches!(outcome, ProposalOutcome::Blocked { .. }));
    }

    #[tokio::test]
    async fn test_store_backed_indexes_end_to_end() {
        let mut config = AppConfig::default();
        config.similarity.backend = IndexBackend::Store;
        let engine = Engine::init(&config).await.unwrap();

        engine
            .modifications
            .create(WorkItemDraft::new("backlog-1", "Add user login"))
            .await
            .unwrap();

        let outcome = engine
            .modifications
            .propose(WorkItemDraft::new("backlog-1", "Add user login"))
            .await
            .unwrap();

        assert!(matches!(outcome, ProposalOutcome::Blocked { .. }));
    }
}
