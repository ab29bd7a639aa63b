//! Health check endpoints
//!
//! - /health - Basic health check
//! - /health/ready - Readiness probe (credential store reachable)
//! - /health/live - Liveness probe

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracing::warn;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_store: Option<ComponentStatus>,
}

/// Status of a dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    Unhealthy,
}

impl HealthResponse {
    fn new(status: &'static str) -> Self {
        Self {
            status,
            version: env!("CARGO_PKG_VERSION"),
            credential_store: None,
        }
    }
}

/// Basic health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::new("healthy"))
}

/// Readiness probe, 503 while the credential store is unreachable
///
/// The failure reason is logged, not returned.
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    match state.store().health_check().await {
        Ok(()) => {
            let mut response = HealthResponse::new("ready");
            response.credential_store = Some(ComponentStatus::Healthy);
            (StatusCode::OK, Json(response))
        }
        Err(e) => {
            warn!("Credential store not ready: {:#}", e);
            let mut response = HealthResponse::new("not_ready");
            response.credential_store = Some(ComponentStatus::Unhealthy);
            (StatusCode::SERVICE_UNAVAILABLE, Json(response))
        }
    }
}

/// Liveness probe, OK whenever the process is serving
pub async fn liveness_check() -> Json<HealthResponse> {
    Json(HealthResponse::new("alive"))
}
