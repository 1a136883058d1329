use utoipa::OpenApi;
use crate::models::*;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Readiness check endpoint
#[utoipa::path(
    get,
    path = "/api/ready",
    responses(
        (status = 200, description = "Session dispatcher is running", body = HealthResponse),
        (status = 503, description = "Session dispatcher stopped", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn ready_check_doc() {}

/// Session and system diagnostics
#[utoipa::path(
    get,
    path = "/api/v1/diagnostics",
    responses(
        (status = 200, description = "Current counters", body = DiagnosticsResponse),
        (status = 503, description = "Session dispatcher stopped", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn diagnostics_doc() {}

/// Request a code suggestion
#[utoipa::path(
    post,
    path = "/api/v1/suggest",
    request_body = SuggestionRequest,
    responses(
        (status = 200, description = "Suggestion produced", body = SuggestionResponse),
        (status = 400, description = "Missing or malformed fields", body = ErrorResponse),
        (status = 500, description = "Suggestion service not configured", body = ErrorResponse),
        (status = 502, description = "Suggestion service failed", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn suggest_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        ready_check_doc,
        diagnostics_doc,
        suggest_doc,
    ),
    components(
        schemas(
            HealthResponse,
            DiagnosticsResponse,
            ErrorResponse,
            SuggestionAction,
            SelectionRange,
            SuggestionRequest,
            SuggestionResponse,
            TokenUsage,
        )
    ),
    tags(
        (name = "api", description = "API endpoints")
    )
)]
pub struct ApiDoc;
