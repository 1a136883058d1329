use crate::{
    clients::suggestion_client::SuggestionError,
    models::{ApiError, ErrorResponse, SuggestionRequest, SuggestionResponse},
    services::suggestion_service::request_suggestion,
    AppState,
};
use axum::{extract::{rejection::JsonRejection, State}, http::StatusCode, Json};
use std::sync::Arc;
use tracing::{error, warn};

/// Proxy one code suggestion request. Never touches session state.
pub async fn suggest(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<SuggestionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SuggestionResponse>), ApiError> {

    let Json(request) = match payload {
        Ok(request) => request,
        Err(rejection) => {
            warn!("Rejected suggestion request: {}", rejection.body_text());
            return Err(ErrorResponse::reply(StatusCode::BAD_REQUEST, rejection.body_text()));
        }
    };

    if request.code.trim().is_empty() {
        return Err(ErrorResponse::reply(StatusCode::BAD_REQUEST, "Missing required fields: action and code"));
    }

    match request_suggestion(app_state.suggestions.as_ref(), &request).await {
        Ok(response) => Ok((StatusCode::OK, Json(response))),
        Err(SuggestionError::NotConfigured) => {
            error!("Suggestion requested but no API key is configured");
            Err(ErrorResponse::reply(StatusCode::INTERNAL_SERVER_ERROR, SuggestionError::NotConfigured.to_string()))
        }
        Err(e) => {
            error!("Suggestion request failed: {}", e);
            Err(ErrorResponse::reply(StatusCode::BAD_GATEWAY, format!("Failed to process suggestion request: {}", e)))
        }
    }
}
