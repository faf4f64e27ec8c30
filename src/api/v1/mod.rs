//! v1 API endpoints

pub mod cache;
pub mod work_items;

use axum::{
    routing::{delete, get, post},
    Router,
};

use super::state::AppState;

pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route("/cache", delete(cache::clear_cache))
        .route("/cache/lookup", post(cache::lookup))
        .route(
            "/cache/entries",
            post(cache::put_entry).delete(cache::invalidate_entry),
        )
        .route("/cache/stats", get(cache::cache_stats))
        .route(
            "/work-items",
            get(work_items::list_work_items).post(work_items::propose_work_item),
        )
        .route("/work-items/check", post(work_items::check_work_item))
        .route("/work-items/{item_id}", get(work_items::get_work_item))
        .route(
            "/work-items/{item_id}/approve",
            post(work_items::approve_work_item),
        )
        .route(
            "/work-items/{item_id}/reject",
            post(work_items::reject_work_item),
        )
}
