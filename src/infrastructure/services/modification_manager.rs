//! Human-in-the-loop workflow for near-duplicate work items

use std::sync::Arc;

use tracing::{info, warn};

use super::ModificationDetector;
use crate::domain::work_item::{
    ModificationCheckResult, ProposalOutcome, WorkItem, WorkItemDraft, WorkItemId,
    WorkItemRepository,
};
use crate::domain::DomainError;

/// Drives the block, approve and reject transitions.
///
/// Every transition re-reads the item and commits against the version it
/// read, so concurrent callers on the same item see either `InvalidState` or
/// `Conflict` and never a half-applied change.
#[derive(Debug)]
pub struct ModificationManager {
    repository: Arc<dyn WorkItemRepository>,
    detector: Arc<ModificationDetector>,
}

impl ModificationManager {
    pub fn new(repository: Arc<dyn WorkItemRepository>, detector: Arc<ModificationDetector>) -> Self {
        Self {
            repository,
            detector,
        }
    }

    pub fn detector(&self) -> &ModificationDetector {
        &self.detector
    }

    async fn load(&self, id: &WorkItemId) -> Result<WorkItem, DomainError> {
        self.repository
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Work item '{}' not found", id)))
    }

    /// Index failures leave the item undetectable but do not undo the commit
    async fn reindex(&self, forget: Option<&WorkItemId>, add: Option<&WorkItem>) {
        if let Some(id) = forget {
            if let Err(e) = self.detector.forget_item(id).await {
                warn!(item = %id, error = %e, "Failed to remove work item from detection index");
            }
        }

        if let Some(item) = add {
            if let Err(e) = self.detector.index_item(item).await {
                warn!(item = %item.id(), error = %e, "Failed to index work item");
            }
        }
    }

    fn record_transition(transition: &'static str) {
        metrics::counter!("modification_transitions_total", "transition" => transition).increment(1);
    }

    /// Persists a new open item and makes it detectable
    pub async fn create(&self, draft: WorkItemDraft) -> Result<WorkItem, DomainError> {
        draft.validate()?;

        let item = self.repository.create(WorkItem::new(draft)).await?;
        self.reindex(None, Some(&item)).await;

        info!(item = %item.id(), scope = %item.scope(), "Work item created");
        Self::record_transition("created");

        Ok(item)
    }

    pub async fn check(&self, draft: &WorkItemDraft) -> Result<ModificationCheckResult, DomainError> {
        draft.validate()?;
        Ok(self.detector.detect(&draft.embedding_text(), &draft.scope).await)
    }

    /// Creates the item, or blocks the existing one it duplicates
    pub async fn propose(&self, draft: WorkItemDraft) -> Result<ProposalOutcome, DomainError> {
        let check = self.check(&draft).await?;

        if check.blocked {
            let item = self.block(&check, &draft).await?;
            return Ok(ProposalOutcome::Blocked { item, check });
        }

        let item = self.create(draft).await?;
        Ok(ProposalOutcome::Created { item })
    }

    /// Open -> Blocked on the item matched by `check`, holding `draft` as the pending change
    pub async fn block(
        &self,
        check: &ModificationCheckResult,
        draft: &WorkItemDraft,
    ) -> Result<WorkItem, DomainError> {
        let (matched, score) = match (check.blocked, &check.matched, check.score) {
            (true, Some(matched), Some(score)) => (matched, score),
            _ => {
                return Err(DomainError::validation(
                    "block requires a positive modification check with a matched item",
                ));
            }
        };

        let mut item = self.load(matched.id()).await?;
        let read_version = item.version();

        item.block(draft, score)?;
        let item = self.repository.commit(item, read_version, None).await?;

        info!(item = %item.id(), score, "Work item blocked pending modification review");
        Self::record_transition("blocked");

        Ok(item)
    }

    /// Blocked -> Done; returns the replacement item created from the pending change
    pub async fn approve(&self, id: &WorkItemId) -> Result<WorkItem, DomainError> {
        let mut item = self.load(id).await?;
        let read_version = item.version();

        let replacement = item.approve()?;
        let replacement_id = replacement.id().clone();

        self.repository
            .commit(item, read_version, Some(replacement))
            .await?;

        let replacement = self.load(&replacement_id).await?;
        self.reindex(Some(id), Some(&replacement)).await;

        info!(item = %id, replacement = %replacement_id, "Modification approved");
        Self::record_transition("approved");

        Ok(replacement)
    }

    /// Blocked -> previous status, discarding the pending change
    pub async fn reject(&self, id: &WorkItemId, reason: impl Into<String>) -> Result<WorkItem, DomainError> {
        let mut item = self.load(id).await?;
        let read_version = item.version();

        item.reject(reason)?;
        let item = self.repository.commit(item, read_version, None).await?;

        info!(item = %id, "Modification rejected");
        Self::record_transition("rejected");

        Ok(item)
    }

    pub async fn get(&self, id: &WorkItemId) -> Result<WorkItem, DomainError> {
        self.load(id).await
    }

    pub async fn list(&self, scope: &str) -> Result<Vec<WorkItem>, DomainError> {
        self.repository.list(scope).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::embedding::MockEmbeddingProvider;
    use crate::domain::work_item::{AuditEvent, MockWorkItemRepository, WorkItemStatus};
    use crate::infrastructure::services::EmbeddingGenerator;
    use crate::infrastructure::similarity::InMemorySimilarityIndex;
    use crate::infrastructure::work_item::InMemoryWorkItemRepository;
    use std::time::Duration;
    use tokio_test::assert_ok;

    const SCOPE: &str = "backlog-1";

    fn raw_at_score(score: f32) -> Vec<f32> {
        vec![score, (1.0 - score * score).sqrt()]
    }

    fn provider() -> MockEmbeddingProvider {
        MockEmbeddingProvider::new(2)
            .with_vector("Add user login", vec![1.0, 0.0])
            .with_vector("Create user authentication with JWT", raw_at_score(0.92))
            .with_vector("Create email notifications", raw_at_score(0.15))
    }

    fn manager_with(repository: Arc<dyn WorkItemRepository>) -> ModificationManager {
        let encoder = EmbeddingGenerator::new(Arc::new(provider()), "mock", Duration::from_millis(200));
        let index = Arc::new(InMemorySimilarityIndex::unbounded());
        let detector = Arc::new(ModificationDetector::new(encoder, index, repository.clone()));

        ModificationManager::new(repository, detector)
    }

    fn manager() -> ModificationManager {
        manager_with(Arc::new(InMemoryWorkItemRepository::new()))
    }

    fn draft(title: &str) -> WorkItemDraft {
        WorkItemDraft::new(SCOPE, title)
    }

    async fn blocked_item(manager: &ModificationManager) -> WorkItem {
        manager.create(draft("Add user login")).await.unwrap();

        match manager.propose(draft("Create user authentication with JWT")).await.unwrap() {
            ProposalOutcome::Blocked { item, .. } => item,
            other => panic!("expected blocked outcome, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_scenario_block_then_approve() {
        let manager = manager();
        let original = manager.create(draft("Add user login")).await.unwrap();

        let outcome = manager
            .propose(draft("Create user authentication with JWT"))
            .await
            .unwrap();

        let ProposalOutcome::Blocked { item, check } = outcome else {
            panic!("expected blocked outcome");
        };
        assert_eq!(item.id(), original.id());
        assert_eq!(item.status(), WorkItemStatus::Blocked);
        assert_eq!(item.blocked_reason(), Some("similarity 0.92"));
        assert!(check.blocked);

        let replacement = manager.approve(original.id()).await.unwrap();
        assert_eq!(replacement.title(), "Create user authentication with JWT");
        assert_eq!(replacement.status(), WorkItemStatus::Open);

        let archived = manager.get(original.id()).await.unwrap();
        assert_eq!(archived.status(), WorkItemStatus::Done);
        assert!(archived.pending_modification().is_none());
        assert!(archived.blocked_reason().is_none());
        assert!(matches!(
            archived.history().last().map(|e| &e.event),
            Some(AuditEvent::Approved { replacement_id }) if replacement_id == replacement.id()
        ));

        assert_eq!(manager.list(SCOPE).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_items_in_other_scopes_do_not_push_out_indexed_items() {
        let manager = manager();
        manager.create(draft("Add user login")).await.unwrap();

        for i in 0..25 {
            manager
                .create(WorkItemDraft::new("backlog-2", format!("Unrelated task {}", i)))
                .await
                .unwrap();
        }

        let outcome = manager
            .propose(draft("Create user authentication with JWT"))
            .await
            .unwrap();

        assert!(matches!(outcome, ProposalOutcome::Blocked { .. }));
    }

    #[tokio::test]
    async fn test_scenario_unrelated_is_created() {
        let manager = manager();
        manager.create(draft("Add user login")).await.unwrap();

        let outcome = manager.propose(draft("Create email notifications")).await.unwrap();

        let ProposalOutcome::Created { item } = outcome else {
            panic!("expected created outcome");
        };
        assert_eq!(item.title(), "Create email notifications");
        assert_eq!(item.status(), WorkItemStatus::Open);
        assert_eq!(manager.list(SCOPE).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_approved_replacement_is_indexed_and_original_forgotten() {
        let manager = manager();
        let blocked = blocked_item(&manager).await;

        let replacement = manager.approve(blocked.id()).await.unwrap();

        let check = manager
            .check(&draft("Create user authentication with JWT"))
            .await
            .unwrap();
        assert!(check.blocked);
        assert_eq!(check.matched.unwrap().id(), replacement.id());
    }

    #[tokio::test]
    async fn test_reject_restores_open() {
        let manager = manager();
        let blocked = blocked_item(&manager).await;

        let rejected = manager.reject(blocked.id(), "not a duplicate").await.unwrap();

        assert_eq!(rejected.status(), WorkItemStatus::Open);
        assert!(rejected.pending_modification().is_none());
        assert!(rejected.blocked_reason().is_none());
        assert!(matches!(
            rejected.history().last().map(|e| &e.event),
            Some(AuditEvent::Rejected { reason }) if reason == "not a duplicate"
        ));
        assert_eq!(manager.list(SCOPE).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_transitions_on_non_blocked_are_invalid_state() {
        let manager = manager();
        let item = manager.create(draft("Add user login")).await.unwrap();

        let approve = manager.approve(item.id()).await;
        assert!(matches!(approve, Err(DomainError::InvalidState { .. })));

        let reject = manager.reject(item.id(), "nope").await;
        assert!(matches!(reject, Err(DomainError::InvalidState { .. })));

        let unchanged = manager.get(item.id()).await.unwrap();
        assert_eq!(unchanged.version(), item.version());
    }

    #[tokio::test]
    async fn test_second_approve_is_invalid_state() {
        let manager = manager();
        let blocked = blocked_item(&manager).await;

        assert_ok!(manager.approve(blocked.id()).await);

        let again = manager.approve(blocked.id()).await;
        assert!(matches!(again, Err(DomainError::InvalidState { .. })));
        assert_eq!(manager.list(SCOPE).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_block_requires_positive_check() {
        let manager = manager();

        let result = manager
            .block(&ModificationCheckResult::not_blocked(), &draft("anything"))
            .await;

        assert!(matches!(result, Err(DomainError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_block_already_blocked_is_invalid_state() {
        let manager = manager();
        let blocked = blocked_item(&manager).await;

        let check = ModificationCheckResult::blocked(blocked, 0.95);
        let result = manager.block(&check, &draft("Another variant")).await;

        assert!(matches!(result, Err(DomainError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn test_concurrent_approves_have_one_winner() {
        let manager = Arc::new(manager());
        let blocked = blocked_item(&manager).await;

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let manager = manager.clone();
                let id = blocked.id().clone();
                tokio::spawn(async move { manager.approve(&id).await })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(DomainError::InvalidState { .. }) | Err(DomainError::Conflict { .. }) => {}
                Err(e) => panic!("unexpected error: {}", e),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(manager.list(SCOPE).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_lost_commit_surfaces_conflict() {
        let stored = WorkItem::new(draft("Add user login"));
        let mut blocked = stored.clone();
        blocked.block(&draft("Login with JWT"), 0.93).unwrap();

        let mut repository = MockWorkItemRepository::new();
        let returned = blocked.clone();
        repository
            .expect_get()
            .returning(move |_| Ok(Some(returned.clone())));
        repository
            .expect_commit()
            .times(1)
            .returning(|_, _, _| Err(DomainError::conflict("version moved")));

        let manager = manager_with(Arc::new(repository));
        let result = manager.approve(blocked.id()).await;

        assert!(matches!(result, Err(DomainError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_unknown_item_is_not_found() {
        let manager = manager();

        let result = manager.approve(&WorkItemId::generate()).await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_invalid_draft_rejected() {
        let manager = manager();

        let result = manager.propose(draft("   ")).await;
        assert!(matches!(result, Err(DomainError::Validation { .. })));
    }
}
