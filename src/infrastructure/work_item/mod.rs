//! Work item repository implementations

mod in_memory;

pub use in_memory::InMemoryWorkItemRepository;
