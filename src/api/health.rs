//! Health check endpoints for Kubernetes probes

use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use super::state::AppState;
use crate::api::types::Json;

const READINESS_PROBE_KEY: &str = "health:probe";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<Vec<HealthCheck>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

/// Returns 200 while the process is up
pub async fn health_check() -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: None,
        latency_ms: None,
    };

    (StatusCode::OK, Json(response))
}

/// Probes the backing store. A failing store is reported but the engine
/// still serves requests from its fallback, so the status is `degraded`.
pub async fn ready_check(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();

    let store_check = check_store(&state).await;
    let overall_status = match store_check.status {
        HealthStatus::Healthy => HealthStatus::Healthy,
        _ => HealthStatus::Degraded,
    };

    let response = HealthResponse {
        status: overall_status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: Some(vec![store_check]),
        latency_ms: Some(start.elapsed().as_millis() as u64),
    };

    (StatusCode::OK, Json(response))
}

pub async fn live_check() -> impl IntoResponse {
    StatusCode::OK
}

async fn check_store(state: &AppState) -> HealthCheck {
    let start = Instant::now();

    match state.store.exists(READINESS_PROBE_KEY).await {
        Ok(_) => HealthCheck {
            name: "store".to_string(),
            status: HealthStatus::Healthy,
            message: None,
            latency_ms: Some(start.elapsed().as_millis() as u64),
        },
        Err(e) => HealthCheck {
            name: "store".to_string(),
            status: HealthStatus::Unhealthy,
            message: Some(e.to_string()),
            latency_ms: Some(start.elapsed().as_millis() as u64),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::domain::store::MockStore;
    use crate::engine::Engine;
    use axum::response::IntoResponse;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_health_check() {
        let response = health_check().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_store_probe_healthy() {
        let engine = Engine::init(&AppConfig::default()).await.unwrap();
        let state = AppState::from_engine(&engine);

        let check = check_store(&state).await;
        assert_eq!(check.status, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn test_store_probe_reports_failure() {
        let engine = Engine::init(&AppConfig::default()).await.unwrap();
        let mut state = AppState::from_engine(&engine);

        state.store = Arc::new(MockStore::new().with_unavailable("redis down"));

        let check = check_store(&state).await;
        assert_eq!(check.status, HealthStatus::Unhealthy);
        assert!(check.message.is_some());

        let response = ready_check(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
