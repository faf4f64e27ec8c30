//! Key-value store implementations

mod factory;
mod fallback;
mod in_memory;
mod redis;

pub use factory::{StoreBackend, StoreConfig, StoreFactory};
pub use fallback::FallbackStore;
pub use in_memory::{InMemoryStore, InMemoryStoreConfig};
pub use redis::{RedisStore, RedisStoreConfig};
