//! Near-duplicate detection for proposed work items

use std::sync::Arc;

use tracing::{debug, warn};

use super::EmbeddingGenerator;
use crate::domain::similarity::{SimilarityIndex, SimilarityRecord};
use crate::domain::work_item::{
    ModificationCheckResult, ModificationConfig, WorkItem, WorkItemId, WorkItemRepository,
};
use crate::domain::DomainError;

/// Compares candidate text against the indexed backlog of one scope.
///
/// Detection fails open: any encoding, index or repository error yields a
/// not-blocked result.
#[derive(Debug)]
pub struct ModificationDetector {
    encoder: EmbeddingGenerator,
    index: Arc<dyn SimilarityIndex>,
    repository: Arc<dyn WorkItemRepository>,
    config: ModificationConfig,
}

impl ModificationDetector {
    pub fn new(
        encoder: EmbeddingGenerator,
        index: Arc<dyn SimilarityIndex>,
        repository: Arc<dyn WorkItemRepository>,
    ) -> Self {
        Self::with_config(encoder, index, repository, ModificationConfig::default())
    }

    pub fn with_config(
        encoder: EmbeddingGenerator,
        index: Arc<dyn SimilarityIndex>,
        repository: Arc<dyn WorkItemRepository>,
        config: ModificationConfig,
    ) -> Self {
        Self {
            encoder,
            index,
            repository,
            config,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.config.threshold
    }

    pub async fn detect(&self, candidate_text: &str, scope: &str) -> ModificationCheckResult {
        match self.try_detect(candidate_text, scope).await {
            Ok(result) => {
                let outcome = if result.blocked { "blocked" } else { "clear" };
                metrics::counter!("modification_checks_total", "outcome" => outcome).increment(1);
                result
            }
            Err(e) => {
                warn!(scope = %scope, error = %e, "Modification check failed, not blocking");
                metrics::counter!("modification_checks_total", "outcome" => "error").increment(1);
                ModificationCheckResult::not_blocked()
            }
        }
    }

    async fn try_detect(
        &self,
        candidate_text: &str,
        scope: &str,
    ) -> Result<ModificationCheckResult, DomainError> {
        let vector = self.encoder.encode(candidate_text).await?;

        let Some(matched) = self
            .index
            .query(&vector, self.config.threshold, Some(scope))
            .await?
        else {
            return Ok(ModificationCheckResult::not_blocked());
        };

        let id = WorkItemId::new(matched.key.clone())?;

        match self.repository.get(&id).await? {
            Some(item) => {
                debug!(item = %id, score = matched.score, "Candidate matches existing work item");
                Ok(ModificationCheckResult::blocked(item, matched.score))
            }
            None => {
                debug!(item = %id, "Matched work item no longer exists, dropping index record");
                self.index.remove(&matched.key).await?;
                Ok(ModificationCheckResult::not_blocked())
            }
        }
    }

    /// Adds or refreshes an item in the detection index
    pub async fn index_item(&self, item: &WorkItem) -> Result<(), DomainError> {
        let vector = self.encoder.encode(&item.embedding_text()).await?;

        let record = SimilarityRecord::new(item.id().as_str(), vector, item.id().as_str())
            .with_scope(item.scope());
        self.index.upsert(record).await?;

        Ok(())
    }

    pub async fn forget_item(&self, id: &WorkItemId) -> Result<bool, DomainError> {
        self.index.remove(id.as_str()).await
    }
}
