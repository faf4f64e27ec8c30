//! Work item domain - backlog items and the block/approve/reject state machine

mod entity;
mod modification;
mod repository;

pub use entity::{
    AuditEntry, AuditEvent, PendingModification, WorkItem, WorkItemDraft, WorkItemId,
    WorkItemStatus,
};
pub use modification::{ModificationCheckResult, ModificationConfig, ProposalOutcome};
pub use repository::WorkItemRepository;

#[cfg(test)]
pub use repository::MockWorkItemRepository;

#[cfg(test)]
pub use repository::tests as repository_suite;
