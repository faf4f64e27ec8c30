//! Similarity search domain - records, matches and the index abstraction

mod index;
mod record;

pub use index::SimilarityIndex;
pub use record::{select_best, RecordMetadata, SimilarityMatch, SimilarityRecord, TIE_EPSILON};

#[cfg(test)]
pub use index::tests as index_suite;
