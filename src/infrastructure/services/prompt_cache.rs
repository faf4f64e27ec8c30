//! Three-tier prompt cache
//!
//! Lookups walk exact, then semantic, then template entries. Failures of the
//! store, the index or the embedder never surface from a lookup: they are
//! logged and the tier counts as a miss.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::EmbeddingGenerator;
use crate::domain::embedding::EmbeddingVector;
use crate::domain::llm::Response;
use crate::domain::prompt_cache::{
    CacheEntry, CacheLevel, CacheLookupResult, CacheRequest, CacheStats, LevelCounts,
    PromptCacheConfig,
};
use crate::domain::similarity::{SimilarityIndex, SimilarityRecord};
use crate::domain::store::{KeyValueStore, KeyValueStoreExt};
use crate::domain::DomainError;

/// Result of [`PromptCacheService::execute`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CachedExecution {
    pub response: Response,
    /// Tier that served the response; `None` when it was generated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_level: Option<CacheLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,
}

#[derive(Debug, Default)]
struct LevelCounters([AtomicU64; 3]);

impl LevelCounters {
    fn slot(level: CacheLevel) -> usize {
        match level {
            CacheLevel::Exact => 0,
            CacheLevel::Semantic => 1,
            CacheLevel::Template => 2,
        }
    }

    fn increment(&self, level: CacheLevel) {
        self.0[Self::slot(level)].fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> LevelCounts {
        let get = |level| self.0[Self::slot(level)].load(Ordering::Relaxed);

        LevelCounts {
            exact: get(CacheLevel::Exact),
            semantic: get(CacheLevel::Semantic),
            template: get(CacheLevel::Template),
        }
    }
}

/// In-process counters; not shared between processes
#[derive(Debug, Default)]
struct CacheCounters {
    total_requests: AtomicU64,
    hits: LevelCounters,
    misses: LevelCounters,
}

impl CacheCounters {
    fn request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("prompt_cache_requests_total").increment(1);
    }

    fn hit(&self, level: CacheLevel) {
        self.hits.increment(level);
        metrics::counter!("prompt_cache_hits_total", "level" => level.as_str()).increment(1);
    }

    fn miss(&self, level: CacheLevel) {
        self.misses.increment(level);
        metrics::counter!("prompt_cache_misses_total", "level" => level.as_str()).increment(1);
    }
}

/// Multi-level response cache over a key-value store and a similarity index
#[derive(Debug)]
pub struct PromptCacheService {
    store: Arc<dyn KeyValueStore>,
    index: Arc<dyn SimilarityIndex>,
    encoder: EmbeddingGenerator,
    config: PromptCacheConfig,
    counters: CacheCounters,
}

impl PromptCacheService {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        index: Arc<dyn SimilarityIndex>,
        encoder: EmbeddingGenerator,
    ) -> Self {
        Self::with_config(store, index, encoder, PromptCacheConfig::default())
    }

    pub fn with_config(
        store: Arc<dyn KeyValueStore>,
        index: Arc<dyn SimilarityIndex>,
        encoder: EmbeddingGenerator,
        config: PromptCacheConfig,
    ) -> Self {
        Self {
            store,
            index,
            encoder,
            config,
            counters: CacheCounters::default(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn config(&self) -> &PromptCacheConfig {
        &self.config
    }

    fn hashed_key(&self, level: CacheLevel, hash: &str) -> String {
        format!("{}:{}:{}", self.config.namespace, level, hash)
    }

    fn hits_key(key: &str) -> String {
        format!("{}:hits", key)
    }

    async fn stored_hits(&self, key: &str) -> Result<u64, DomainError> {
        match self.store.get_raw(&Self::hits_key(key)).await? {
            Some(raw) => raw.parse().map_err(|e| {
                DomainError::store(format!("Hit counter for '{}' is not an integer: {}", key, e))
            }),
            None => Ok(0),
        }
    }

    /// Reads an entry, dropping it when it no longer holds its invariants
    async fn read_entry(&self, key: &str) -> Option<CacheEntry> {
        let entry = match self.store.get::<CacheEntry>(key).await {
            Ok(entry) => entry?,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };

        if let Err(e) = entry.check_invariants() {
            warn!(key = %key, error = %e, "Dropping malformed cache entry");
            if let Err(e) = self.store.delete(key).await {
                warn!(key = %key, error = %e, "Failed to delete malformed cache entry");
            }
            return None;
        }

        Some(entry)
    }

    /// Counts a hit in the entry's counter key. The entry itself is never
    /// rewritten; the counter is given the entry's remaining TTL when created.
    async fn record_hit(&self, key: &str, entry: &CacheEntry) {
        let hits_key = Self::hits_key(key);

        let hits = match self.store.increment(&hits_key, 1).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to record cache hit");
                return;
            }
        };

        if hits == 1 {
            let ttl = match self.store.ttl(key).await {
                Ok(Some(remaining)) if !remaining.is_zero() => remaining,
                _ => entry.ttl(),
            };

            if let Err(e) = self.store.expire(&hits_key, ttl).await {
                warn!(key = %hits_key, error = %e, "Failed to set hit counter TTL");
            }
        }
    }

    async fn lookup_hashed(&self, level: CacheLevel, hash: &str) -> Option<Response> {
        let key = self.hashed_key(level, hash);
        let entry = self.read_entry(&key).await?;
        self.record_hit(&key, &entry).await;

        Some(entry.into_payload())
    }

    async fn lookup_semantic(
        &self,
        request: &CacheRequest,
        vector: &EmbeddingVector,
    ) -> Option<(Response, f32)> {
        let found = self
            .index
            .query(vector, self.config.semantic_threshold, Some(&request.model_name))
            .await;

        let matched = match found {
            Ok(matched) => matched?,
            Err(e) => {
                warn!(error = %e, "Semantic index query failed, treating as miss");
                return None;
            }
        };

        match self.read_entry(&matched.payload_ref).await {
            Some(entry) => {
                self.record_hit(&matched.payload_ref, &entry).await;
                Some((entry.into_payload(), matched.score))
            }
            None => {
                debug!(key = %matched.key, "Semantic match points at an evicted entry");
                if let Err(e) = self.index.remove(&matched.key).await {
                    warn!(key = %matched.key, error = %e, "Failed to remove stale index record");
                }
                None
            }
        }
    }

    /// Walks the tiers. The embedding computed for the semantic tier is
    /// returned so a following `put` can reuse it.
    async fn lookup(&self, request: &CacheRequest) -> (CacheLookupResult, Option<EmbeddingVector>) {
        if !self.config.enabled {
            return (CacheLookupResult::miss(), None);
        }

        if let Err(e) = request.validate() {
            debug!(error = %e, "Request is not cacheable");
            return (CacheLookupResult::miss(), None);
        }

        self.counters.request();
        let hash = request.canonical_hash();

        if let Some(payload) = self.lookup_hashed(CacheLevel::Exact, &hash).await {
            debug!(model = %request.model_name, "Exact cache hit");
            self.counters.hit(CacheLevel::Exact);
            return (CacheLookupResult::hit(CacheLevel::Exact, payload), None);
        }
        self.counters.miss(CacheLevel::Exact);

        let vector = match self.encoder.encode(&request.semantic_text()).await {
            Ok(vector) => Some(vector),
            Err(e) => {
                warn!(error = %e, "Failed to embed request, skipping semantic tier");
                None
            }
        };

        if let Some(ref vector) = vector {
            if let Some((payload, score)) = self.lookup_semantic(request, vector).await {
                debug!(model = %request.model_name, similarity = score, "Semantic cache hit");
                self.counters.hit(CacheLevel::Semantic);
                let result = CacheLookupResult::hit(CacheLevel::Semantic, payload).with_similarity(score);
                return (result, None);
            }
        }
        self.counters.miss(CacheLevel::Semantic);

        if request.is_deterministic() {
            if let Some(payload) = self.lookup_hashed(CacheLevel::Template, &hash).await {
                debug!(model = %request.model_name, "Template cache hit");
                self.counters.hit(CacheLevel::Template);
                return (CacheLookupResult::hit(CacheLevel::Template, payload), vector);
            }
            self.counters.miss(CacheLevel::Template);
        }

        debug!(model = %request.model_name, "Cache miss");
        (CacheLookupResult::miss(), vector)
    }

    /// Looks the request up in every applicable tier. Never fails.
    pub async fn get(&self, request: &CacheRequest) -> CacheLookupResult {
        self.lookup(request).await.0
    }

    /// Reads the request's exact or template entry with its current hit
    /// count, without counting a hit
    pub async fn entry(
        &self,
        request: &CacheRequest,
        level: CacheLevel,
    ) -> Result<Option<CacheEntry>, DomainError> {
        if level == CacheLevel::Semantic {
            return Err(DomainError::validation(
                "semantic entries are not addressable by request",
            ));
        }

        let key = self.hashed_key(level, &request.canonical_hash());
        let Some(entry) = self.store.get::<CacheEntry>(&key).await? else {
            return Ok(None);
        };
        let hits = self.stored_hits(&key).await?;

        Ok(Some(entry.with_hit_count(hits)))
    }

    /// Stores a response at one tier.
    ///
    /// Invalid requests and template puts with a non-zero temperature are
    /// rejected; store and encoding failures are logged and swallowed.
    pub async fn put(
        &self,
        request: &CacheRequest,
        response: &Response,
        level: CacheLevel,
    ) -> Result<(), DomainError> {
        self.put_with_vector(request, response, level, None).await
    }

    async fn put_with_vector(
        &self,
        request: &CacheRequest,
        response: &Response,
        level: CacheLevel,
        vector: Option<EmbeddingVector>,
    ) -> Result<(), DomainError> {
        request.validate()?;

        if level == CacheLevel::Template && !request.is_deterministic() {
            return Err(DomainError::validation(format!(
                "template tier only accepts temperature 0, got {}",
                request.temperature
            )));
        }

        if !self.config.enabled {
            return Ok(());
        }

        let ttl = self.config.ttl(level);

        let stored = match level {
            CacheLevel::Exact | CacheLevel::Template => {
                let key = self.hashed_key(level, &request.canonical_hash());
                let entry = match level {
                    CacheLevel::Exact => CacheEntry::exact(&key, response.clone(), ttl),
                    _ => CacheEntry::template(&key, response.clone(), ttl),
                };
                // A replaced entry starts counting from zero
                match self.store.set(&key, &entry, ttl).await {
                    Ok(()) => self.store.delete(&Self::hits_key(&key)).await.map(|_| ()),
                    Err(e) => Err(e),
                }
            }
            CacheLevel::Semantic => {
                let vector = match vector {
                    Some(vector) => vector,
                    None => match self.encoder.encode(&request.semantic_text()).await {
                        Ok(vector) => vector,
                        Err(e) => {
                            warn!(error = %e, "Failed to embed request, not caching semantically");
                            return Ok(());
                        }
                    },
                };
                self.store_semantic(request, response, vector, ttl).await
            }
        };

        if let Err(e) = stored {
            warn!(level = %level, error = %e, "Failed to store cache entry");
        }

        Ok(())
    }

    async fn store_semantic(
        &self,
        request: &CacheRequest,
        response: &Response,
        vector: EmbeddingVector,
        ttl: Duration,
    ) -> Result<(), DomainError> {
        let id = Uuid::new_v4().to_string();
        let key = self.hashed_key(CacheLevel::Semantic, &id);

        let entry = CacheEntry::semantic(&key, response.clone(), vector.clone(), ttl);
        self.store.set(&key, &entry, ttl).await?;

        let record = SimilarityRecord::new(id, vector, key)
            .with_scope(request.model_name.clone())
            .with_ttl(ttl);
        self.index.upsert(record).await?;

        Ok(())
    }

    /// Serves from cache or runs `generate` and caches its result.
    ///
    /// Cached responses come back with zero tokens and cost. Fresh responses
    /// are stored at the exact and semantic tiers, and at the template tier
    /// for temperature-zero requests.
    pub async fn execute<F, Fut>(
        &self,
        request: &CacheRequest,
        generate: F,
    ) -> Result<CachedExecution, DomainError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Response, DomainError>>,
    {
        let (lookup, vector) = self.lookup(request).await;

        if let (true, Some(payload)) = (lookup.hit, lookup.payload) {
            return Ok(CachedExecution {
                response: payload.served_from_cache(),
                cache_level: lookup.level,
                similarity: lookup.similarity,
            });
        }

        let response = generate().await?;

        if self.config.enabled && request.validate().is_ok() {
            self.put(request, &response, CacheLevel::Exact).await?;
            self.put_with_vector(request, &response, CacheLevel::Semantic, vector)
                .await?;

            if request.is_deterministic() {
                self.put(request, &response, CacheLevel::Template).await?;
            }
        }

        Ok(CachedExecution {
            response,
            cache_level: None,
            similarity: None,
        })
    }

    /// Removes the request's exact and template entries
    pub async fn invalidate(&self, request: &CacheRequest) -> Result<usize, DomainError> {
        let hash = request.canonical_hash();
        let mut removed = 0;

        for level in [CacheLevel::Exact, CacheLevel::Template] {
            let key = self.hashed_key(level, &hash);

            if self.store.delete(&key).await? {
                removed += 1;
            }
            self.store.delete(&Self::hits_key(&key)).await?;
        }

        Ok(removed)
    }

    /// Removes every cache entry and index record, returning the number of
    /// entries removed
    pub async fn clear(&self) -> Result<usize, DomainError> {
        let namespace = &self.config.namespace;

        self.store.delete_pattern(&format!("{}:*:hits", namespace)).await?;
        let removed = self.store.delete_pattern(&format!("{}:*", namespace)).await?;
        self.index.clear().await?;

        info!(removed, "Prompt cache cleared");
        Ok(removed)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats::new(
            self.counters.total_requests.load(Ordering::Relaxed),
            self.counters.hits.snapshot(),
            self.counters.misses.snapshot(),
        )
    }

    pub async fn purge_expired(&self) -> Result<usize, DomainError> {
        self.index.purge_expired().await
    }

    /// Periodically purges expired index records until the handle is aborted
    pub fn spawn_maintenance(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let cache = Arc::clone(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;

                match cache.purge_expired().await {
                    Ok(0) => {}
                    Ok(purged) => debug!(purged, "Purged expired semantic records"),
                    Err(e) => warn!(error = %e, "Semantic index maintenance failed"),
                }
            }
        })
    }
}
