//! Domain layer - Core business logic and entities

pub mod embedding;
pub mod error;
pub mod llm;
pub mod prompt_cache;
pub mod similarity;
pub mod store;
pub mod work_item;

pub use embedding::{cosine_similarity, EmbeddingProvider, EmbeddingRequest, EmbeddingVector};
pub use error::DomainError;
pub use llm::{Message, MessageRole, Response, TokenPricing};
pub use prompt_cache::{
    CacheEntry, CacheLevel, CacheLookupResult, CacheRequest, CacheStats, PromptCacheConfig,
};
pub use similarity::{SimilarityIndex, SimilarityMatch, SimilarityRecord};
pub use store::{KeyValueStore, KeyValueStoreExt};
pub use work_item::{
    ModificationCheckResult, ModificationConfig, ProposalOutcome, WorkItem, WorkItemDraft,
    WorkItemId, WorkItemRepository, WorkItemStatus,
};
