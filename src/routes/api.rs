use crate::{handlers::{diagnostics, health_check, ready_check, suggest}, AppState};
use axum::{routing::{get, post}, Router};
use std::sync::Arc;

/// Create API routes
pub fn create_api_routes(app_state: Arc<AppState>) -> Router {
    Router::<Arc<AppState>>::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .route("/v1/diagnostics", get(diagnostics))
        .route("/v1/suggest", post(suggest))
        .with_state(app_state)
}
