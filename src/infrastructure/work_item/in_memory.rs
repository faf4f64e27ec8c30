//! In-memory work item repository

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::work_item::{WorkItem, WorkItemId, WorkItemRepository};
use crate::domain::DomainError;

/// In-memory implementation of WorkItemRepository.
///
/// Commits hold the write lock for the whole compare-and-set, so a version
/// check and the optional insert of a created item land together.
#[derive(Debug, Default)]
pub struct InMemoryWorkItemRepository {
    items: Arc<RwLock<HashMap<String, WorkItem>>>,
}

impl InMemoryWorkItemRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkItemRepository for InMemoryWorkItemRepository {
    async fn get(&self, id: &WorkItemId) -> Result<Option<WorkItem>, DomainError> {
        let items = self.items.read().await;
        Ok(items.get(id.as_str()).cloned())
    }

    async fn list(&self, scope: &str) -> Result<Vec<WorkItem>, DomainError> {
        let items = self.items.read().await;

        let mut filtered: Vec<WorkItem> = items
            .values()
            .filter(|item| item.scope() == scope)
            .cloned()
            .collect();

        filtered.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().as_str().cmp(b.id().as_str()))
        });

        Ok(filtered)
    }

    async fn create(&self, mut item: WorkItem) -> Result<WorkItem, DomainError> {
        let mut items = self.items.write().await;
        let id = item.id().as_str().to_string();

        if items.contains_key(&id) {
            return Err(DomainError::conflict(format!("Work item '{}' already exists", id)));
        }

        item.set_version(1);
        items.insert(id, item.clone());
        Ok(item)
    }

    async fn commit(
        &self,
        mut updated: WorkItem,
        expected_version: u64,
        created: Option<WorkItem>,
    ) -> Result<WorkItem, DomainError> {
        let mut items = self.items.write().await;
        let id = updated.id().as_str().to_string();

        let current = items
            .get(&id)
            .ok_or_else(|| DomainError::not_found(format!("Work item '{}' not found", id)))?;

        if current.version() != expected_version {
            return Err(DomainError::conflict(format!(
                "Work item '{}' is at version {}, expected {}",
                id,
                current.version(),
                expected_version
            )));
        }

        if let Some(ref new_item) = created {
            if items.contains_key(new_item.id().as_str()) {
                return Err(DomainError::conflict(format!(
                    "Work item '{}' already exists",
                    new_item.id()
                )));
            }
        }

        updated.set_version(expected_version + 1);
        items.insert(id, updated.clone());

        if let Some(mut new_item) = created {
            new_item.set_version(1);
            items.insert(new_item.id().as_str().to_string(), new_item);
        }

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::work_item::repository_suite::{
        create_test_item, test_repository_commit_bumps_version,
        test_repository_commit_inserts_created_atomically, test_repository_commit_unknown_item,
        test_repository_create_and_get, test_repository_list_by_scope,
    };

    #[tokio::test]
    async fn test_create_and_get() {
        test_repository_create_and_get(&InMemoryWorkItemRepository::new()).await;
    }

    #[tokio::test]
    async fn test_list_by_scope() {
        test_repository_list_by_scope(&InMemoryWorkItemRepository::new()).await;
    }

    #[tokio::test]
    async fn test_commit_bumps_version() {
        test_repository_commit_bumps_version(&InMemoryWorkItemRepository::new()).await;
    }

    #[tokio::test]
    async fn test_commit_inserts_created_atomically() {
        test_repository_commit_inserts_created_atomically(&InMemoryWorkItemRepository::new()).await;
    }

    #[tokio::test]
    async fn test_commit_unknown_item() {
        test_repository_commit_unknown_item(&InMemoryWorkItemRepository::new()).await;
    }

    #[tokio::test]
    async fn test_list_is_oldest_first() {
        let repo = InMemoryWorkItemRepository::new();

        let first = repo.create(create_test_item("first")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        repo.create(create_test_item("second")).await.unwrap();

        let items = repo.list("backlog-1").await.unwrap();
        assert_eq!(items[0].id(), first.id());
    }
}
