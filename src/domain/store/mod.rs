//! Key-value store abstraction shared by the cache and the similarity index

mod repository;

pub use repository::{glob_to_regex, KeyValueStore, KeyValueStoreExt};

#[cfg(test)]
pub use repository::mock::MockStore;
