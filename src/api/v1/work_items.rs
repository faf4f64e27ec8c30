//! Work item endpoint handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json, ListWorkItemsQuery, RejectRequest, WorkItemsResponse};
use crate::domain::work_item::{
    ModificationCheckResult, ProposalOutcome, WorkItem, WorkItemDraft, WorkItemId,
};

fn parse_id(item_id: String) -> Result<WorkItemId, ApiError> {
    WorkItemId::new(item_id).map_err(ApiError::from)
}

/// POST /v1/work-items/check
pub async fn check_work_item(
    State(state): State<AppState>,
    Json(draft): Json<WorkItemDraft>,
) -> Result<Json<ModificationCheckResult>, ApiError> {
    let result = state.modifications.check(&draft).await?;

    Ok(Json(result))
}

/// POST /v1/work-items
///
/// 201 when the item was created, 202 when an existing item was blocked
/// pending review.
pub async fn propose_work_item(
    State(state): State<AppState>,
    Json(draft): Json<WorkItemDraft>,
) -> Result<(StatusCode, Json<ProposalOutcome>), ApiError> {
    debug!(scope = %draft.scope, "Proposing work item");

    let outcome = state.modifications.propose(draft).await?;
    let status = match outcome {
        ProposalOutcome::Created { .. } => StatusCode::CREATED,
        ProposalOutcome::Blocked { .. } => StatusCode::ACCEPTED,
    };

    Ok((status, Json(outcome)))
}

/// GET /v1/work-items?scope=...
pub async fn list_work_items(
    State(state): State<AppState>,
    Query(query): Query<ListWorkItemsQuery>,
) -> Result<Json<WorkItemsResponse>, ApiError> {
    let items = state.modifications.list(&query.scope).await?;

    Ok(Json(WorkItemsResponse::new(items)))
}

/// GET /v1/work-items/{item_id}
pub async fn get_work_item(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> Result<Json<WorkItem>, ApiError> {
    let id = parse_id(item_id)?;

    Ok(Json(state.modifications.get(&id).await?))
}

/// POST /v1/work-items/{item_id}/approve
///
/// Returns the replacement item.
pub async fn approve_work_item(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> Result<(StatusCode, Json<WorkItem>), ApiError> {
    let id = parse_id(item_id)?;
    let replacement = state.modifications.approve(&id).await?;

    Ok((StatusCode::CREATED, Json(replacement)))
}

/// POST /v1/work-items/{item_id}/reject
pub async fn reject_work_item(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
    Json(body): Json<RejectRequest>,
) -> Result<Json<WorkItem>, ApiError> {
    let id = parse_id(item_id)?;

    Ok(Json(state.modifications.reject(&id, body.reason).await?))
}
