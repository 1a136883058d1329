use std::sync::Arc;
use axum::{extract::State, http::StatusCode, Json};
use crate::{models::HealthResponse, AppState};
use tracing::{debug, warn};

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    debug!("Health check requested");
    Json(HealthResponse::new("ok", "Server is running"))
}

/// Readiness check endpoint: ready while the session dispatcher is running.
pub async fn ready_check(State(app_state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    debug!("Readiness check requested");
    if app_state.dispatcher.is_alive() {
        (StatusCode::OK, Json(HealthResponse::new("ok", "Service is ready")))
    } else {
        warn!("Readiness check failed: session dispatcher stopped");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse::new("unavailable", "Session dispatcher stopped")),
        )
    }
}
