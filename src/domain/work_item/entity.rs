//! Work item domain entities

use std::fmt;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Valid work item ids: wi-{uuid}
static ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^wi-[a-f0-9]{8}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{12}$")
        .expect("work item id pattern is valid")
});

/// Validated work item identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WorkItemId(String);

impl WorkItemId {
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();

        if !ID_PATTERN.is_match(&id) {
            return Err(DomainError::invalid_id(format!(
                "Invalid work item ID '{}': must be in format wi-{{uuid}}",
                id
            )));
        }

        Ok(Self(id))
    }

    pub fn generate() -> Self {
        Self(format!("wi-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for WorkItemId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<WorkItemId> for String {
    fn from(id: WorkItemId) -> Self {
        id.0
    }
}

impl fmt::Display for WorkItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle status of a work item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkItemStatus {
    #[default]
    Open,
    /// Waiting on a human decision about a proposed modification
    Blocked,
    Done,
}

impl WorkItemStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    pub fn can_transition_to(&self, target: WorkItemStatus) -> bool {
        matches!(
            (self, target),
            (Self::Open, Self::Blocked) | (Self::Blocked, Self::Open) | (Self::Blocked, Self::Done)
        )
    }
}

impl fmt::Display for WorkItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Blocked => write!(f, "blocked"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// Content for a new work item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItemDraft {
    pub scope: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl WorkItemDraft {
    pub fn new(scope: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            title: title.into(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.scope.trim().is_empty() {
            return Err(DomainError::validation("Work item scope cannot be empty"));
        }

        if self.title.trim().is_empty() {
            return Err(DomainError::validation("Work item title cannot be empty"));
        }

        Ok(())
    }

    /// Text compared by the modification detector
    pub fn embedding_text(&self) -> String {
        embedding_text(&self.title, &self.description)
    }
}

fn embedding_text(title: &str, description: &str) -> String {
    if description.trim().is_empty() {
        title.to_string()
    } else {
        format!("{}\n{}", title, description)
    }
}

/// A proposed change awaiting approval on a blocked item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingModification {
    pub proposed_title: String,
    pub proposed_description: String,
    pub similarity_score: f32,
    pub detected_at: DateTime<Utc>,
    pub previous_status: WorkItemStatus,
}

/// Typed audit events kept in a work item's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    Created,
    Blocked {
        similarity_score: f32,
        proposed_title: String,
    },
    /// The pending modification became `replacement_id`
    Approved { replacement_id: WorkItemId },
    /// This item was created by approving a modification of `original_id`
    Replaces { original_id: WorkItemId },
    Rejected { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: AuditEvent,
}

impl AuditEntry {
    fn now(event: AuditEvent) -> Self {
        Self {
            at: Utc::now(),
            event,
        }
    }
}

/// A backlog work item with an optimistic-concurrency version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    id: WorkItemId,
    scope: String,
    title: String,
    description: String,
    status: WorkItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pending_modification: Option<PendingModification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    blocked_reason: Option<String>,
    history: Vec<AuditEntry>,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl WorkItem {
    /// A new open item at version 0 (not yet persisted)
    pub fn new(draft: WorkItemDraft) -> Self {
        let now = Utc::now();

        Self {
            id: WorkItemId::generate(),
            scope: draft.scope,
            title: draft.title,
            description: draft.description,
            status: WorkItemStatus::Open,
            pending_modification: None,
            blocked_reason: None,
            history: vec![AuditEntry::now(AuditEvent::Created)],
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> &WorkItemId {
        &self.id
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn status(&self) -> WorkItemStatus {
        self.status
    }

    pub fn pending_modification(&self) -> Option<&PendingModification> {
        self.pending_modification.as_ref()
    }

    pub fn blocked_reason(&self) -> Option<&str> {
        self.blocked_reason.as_deref()
    }

    pub fn history(&self) -> &[AuditEntry] {
        &self.history
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn embedding_text(&self) -> String {
        embedding_text(&self.title, &self.description)
    }

    /// Set by repositories when a change is committed
    pub(crate) fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    fn transition(&mut self, target: WorkItemStatus, action: &str) -> Result<(), DomainError> {
        if !self.status.can_transition_to(target) {
            return Err(DomainError::invalid_state(format!(
                "Cannot {} work item '{}' in status {}",
                action, self.id, self.status
            )));
        }

        self.status = target;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Open -> Blocked, holding `draft` as the pending modification
    pub fn block(&mut self, draft: &WorkItemDraft, similarity_score: f32) -> Result<(), DomainError> {
        if self.status != WorkItemStatus::Open {
            return Err(DomainError::invalid_state(format!(
                "Cannot block work item '{}' in status {}",
                self.id, self.status
            )));
        }

        let previous_status = self.status;
        self.transition(WorkItemStatus::Blocked, "block")?;

        self.pending_modification = Some(PendingModification {
            proposed_title: draft.title.clone(),
            proposed_description: draft.description.clone(),
            similarity_score,
            detected_at: Utc::now(),
            previous_status,
        });
        self.blocked_reason = Some(format!("similarity {:.2}", similarity_score));
        self.history.push(AuditEntry::now(AuditEvent::Blocked {
            similarity_score,
            proposed_title: draft.title.clone(),
        }));

        Ok(())
    }

    /// Blocked -> Done. Returns the replacement item built from the pending modification.
    pub fn approve(&mut self) -> Result<WorkItem, DomainError> {
        let pending = self.take_pending("approve")?;
        self.transition(WorkItemStatus::Done, "approve")?;

        let mut replacement = WorkItem::new(
            WorkItemDraft::new(self.scope.clone(), pending.proposed_title)
                .with_description(pending.proposed_description),
        );
        replacement.history.push(AuditEntry::now(AuditEvent::Replaces {
            original_id: self.id.clone(),
        }));

        self.history.push(AuditEntry::now(AuditEvent::Approved {
            replacement_id: replacement.id.clone(),
        }));

        Ok(replacement)
    }

    /// Blocked -> previous status, discarding the pending modification
    pub fn reject(&mut self, reason: impl Into<String>) -> Result<(), DomainError> {
        let pending = self.take_pending("reject")?;
        self.transition(pending.previous_status, "reject")?;

        self.history.push(AuditEntry::now(AuditEvent::Rejected {
            reason: reason.into(),
        }));

        Ok(())
    }

    fn take_pending(&mut self, action: &str) -> Result<PendingModification, DomainError> {
        if self.status != WorkItemStatus::Blocked {
            return Err(DomainError::invalid_state(format!(
                "Cannot {} work item '{}' in status {}",
                action, self.id, self.status
            )));
        }

        let pending = self.pending_modification.take().ok_or_else(|| {
            DomainError::internal(format!(
                "Blocked work item '{}' has no pending modification",
                self.id
            ))
        })?;
        self.blocked_reason = None;

        Ok(pending)
    }

    /// `pending_modification` is set exactly when the item is blocked
    pub fn check_invariants(&self) -> Result<(), DomainError> {
        let blocked = self.status == WorkItemStatus::Blocked;

        if self.pending_modification.is_some() != blocked {
            return Err(DomainError::internal(format!(
                "Work item '{}' in status {} has inconsistent pending modification",
                self.id, self.status
            )));
        }

        Ok(())
    }
}
