use serde::{Deserialize, Serialize};

use crate::domain::work_item::WorkItem;

/// Query of `GET /v1/work-items`
#[derive(Debug, Clone, Deserialize)]
pub struct ListWorkItemsQuery {
    pub scope: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RejectRequest {
    #[serde(default = "default_reject_reason")]
    pub reason: String,
}

fn default_reject_reason() -> String {
    "rejected by reviewer".to_string()
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkItemsResponse {
    pub items: Vec<WorkItem>,
    pub total: usize,
}

impl WorkItemsResponse {
    pub fn new(items: Vec<WorkItem>) -> Self {
        let total = items.len();
        Self { items, total }
    }
}
