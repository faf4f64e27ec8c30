//! Similarity index implementations

mod in_memory;
mod store_backed;

pub use in_memory::InMemorySimilarityIndex;
pub use store_backed::StoreSimilarityIndex;
