//! Work item repository trait

use std::fmt::Debug;

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use super::{WorkItem, WorkItemId};
use crate::domain::DomainError;

/// Versioned persistence for work items
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WorkItemRepository: Send + Sync + Debug {
    async fn get(&self, id: &WorkItemId) -> Result<Option<WorkItem>, DomainError>;

    /// Items in a backlog scope, oldest first
    async fn list(&self, scope: &str) -> Result<Vec<WorkItem>, DomainError>;

    /// Persists a new item at version 1
    async fn create(&self, item: WorkItem) -> Result<WorkItem, DomainError>;

    /// Compare-and-commit.
    ///
    /// Stores `updated` only if the persisted version still equals
    /// `expected_version`, bumping the version by one; `created` (if any) is
    /// inserted in the same atomic step. A version mismatch is a `Conflict`
    /// and leaves the repository untouched.
    async fn commit(
        &self,
        updated: WorkItem,
        expected_version: u64,
        created: Option<WorkItem>,
    ) -> Result<WorkItem, DomainError>;
}
