//! Prompt cache endpoint handlers

use axum::{extract::State, http::StatusCode};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{ApiError, CacheStatsResponse, Json, PutCacheEntryRequest, RemovedResponse};
use crate::domain::prompt_cache::{CacheLookupResult, CacheRequest};

/// POST /v1/cache/lookup
pub async fn lookup(
    State(state): State<AppState>,
    Json(request): Json<CacheRequest>,
) -> Result<Json<CacheLookupResult>, ApiError> {
    request.validate()?;
    debug!(model = %request.model_name, "Cache lookup");

    Ok(Json(state.prompt_cache.get(&request).await))
}

/// POST /v1/cache/entries
pub async fn put_entry(
    State(state): State<AppState>,
    Json(body): Json<PutCacheEntryRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .prompt_cache
        .put(&body.request, &body.response, body.level)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /v1/cache/entries
pub async fn invalidate_entry(
    State(state): State<AppState>,
    Json(request): Json<CacheRequest>,
) -> Result<Json<RemovedResponse>, ApiError> {
    let removed = state.prompt_cache.invalidate(&request).await?;

    Ok(Json(RemovedResponse { removed }))
}

/// DELETE /v1/cache
pub async fn clear_cache(State(state): State<AppState>) -> Result<Json<RemovedResponse>, ApiError> {
    let removed = state.prompt_cache.clear().await?;

    Ok(Json(RemovedResponse { removed }))
}

/// GET /v1/cache/stats
pub async fn cache_stats(State(state): State<AppState>) -> Json<CacheStatsResponse> {
    Json(CacheStatsResponse {
        enabled: state.prompt_cache.is_enabled(),
        stats: state.prompt_cache.stats(),
    })
}
