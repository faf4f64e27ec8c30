use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use super::health;
use super::state::AppState;
use super::v1;
use crate::infrastructure::observability::{create_metrics_router, PrometheusMetrics};

/// Routes without state, for probes only
pub fn create_router() -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/live", get(health::live_check))
        .layer(TraceLayer::new_for_http())
}

/// Full router; `/metrics` is mounted only when a recorder is installed
pub fn create_router_with_state(state: AppState, metrics: Option<PrometheusMetrics>) -> Router {
    let router = Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/live", get(health::live_check))
        .nest("/v1", v1::create_v1_router())
        .with_state(state);

    let router = match metrics {
        Some(metrics) => router.merge(create_metrics_router(metrics)),
        None => router,
    };

    router.layer(TraceLayer::new_for_http())
}
