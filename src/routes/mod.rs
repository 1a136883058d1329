pub mod api;

use crate::{config::Config, docs::ApiDoc, websocket::websocket_handler, AppState};
use api::create_api_routes;
use axum::{http::{header, HeaderValue, Method}, routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::{AllowOrigin, CorsLayer}, trace::TraceLayer};
use tracing::{info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Full application router: WebSocket transport, JSON API and Swagger UI
pub fn create_app(app_state: Arc<AppState>) -> Router {
    let cors = build_cors(&app_state.config);

    Router::new()
        .route("/ws", get(websocket_handler))
        .with_state(app_state.clone())
        .nest("/api", create_api_routes(app_state))
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn build_cors(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origin_list()
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    if !origins.is_empty() {
        info!("CORS restricted to {} configured origins", origins.len());
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE])
    } else if config.is_development() {
        CorsLayer::permissive()
    } else {
        if config.is_production() {
            warn!("No CORS origins configured in production - cross-origin requests are refused");
        }
        CorsLayer::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        routing::post,
        Json,
    };
    use serde_json::{json, Value};
    use tokio::net::TcpListener;
    use tower::ServiceExt;

    async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    /// Stand-in for the completion API answering every call with `body`.
    async fn fake_upstream(status: StatusCode, body: Value) -> String {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(move || {
                let body = body.clone();
                async move { (status, Json(body)) }
            }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/v1")
    }

    fn app_with(config: Config) -> Router {
        create_app(Arc::new(AppState::new(config)))
    }

    #[tokio::test]
    async fn test_health_and_ready() {
        let app = app_with(Config::default());

        let (status, body) = call(app.clone(), get_request("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));

        let (status, body) = call(app, get_request("/api/ready")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Service is ready");
    }

    #[tokio::test]
    async fn test_diagnostics_reports_empty_registry() {
        let (status, body) = call(app_with(Config::default()), get_request("/api/v1/diagnostics")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["nSessions"], 0);
        assert_eq!(body["nParticipants"], 0);
        assert_eq!(body["nConnections"], 0);
    }

    #[tokio::test]
    async fn test_openapi_document_is_served() {
        let (status, body) = call(app_with(Config::default()), get_request("/api-docs/openapi.json")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"].get("/api/v1/suggest").is_some());
    }

    #[tokio::test]
    async fn test_suggest_rejects_missing_code() {
        let app = app_with(Config::default());

        let (status, body) = call(app.clone(), post_json("/api/v1/suggest", r#"{"action":"fix"}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 400);
        assert_eq!(body["error"], "Missing required fields: action and code");

        let (status, _) = call(app.clone(), post_json("/api/v1/suggest", r#"{"code":"x"}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(app, post_json("/api/v1/suggest", "not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_suggest_without_api_key() {
        let app = app_with(Config::default());
        let (status, body) = call(app, post_json("/api/v1/suggest", r#"{"action":"fix","code":"x"}"#)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Suggestion service API key not configured");
    }

    #[tokio::test]
    async fn test_suggest_round_trip() {
        let url = fake_upstream(
            StatusCode::OK,
            json!({
                "choices": [{ "message": { "role": "assistant", "content": "Use `a + b`." } }],
                "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
            }),
        )
        .await;
        let app = app_with(Config {
            suggestion_api_url: url,
            suggestion_api_key: Some("sk-test".to_string()),
            ..Config::default()
        });

        let (status, body) = call(
            app,
            post_json("/api/v1/suggest", r#"{"action":"fix","code":"a + b + 1","language":"javascript"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["suggestion"], "Use `a + b`.");
        assert_eq!(body["action"], "fix");
        assert_eq!(body["language"], "javascript");
        assert_eq!(body["usage"]["total_tokens"], 15);
    }

    #[tokio::test]
    async fn test_suggest_upstream_failure_is_bad_gateway() {
        let url = fake_upstream(StatusCode::TOO_MANY_REQUESTS, json!({"error": "rate limited"})).await;
        let app = app_with(Config {
            suggestion_api_url: url,
            suggestion_api_key: Some("sk-test".to_string()),
            ..Config::default()
        });

        let (status, body) = call(app, post_json("/api/v1/suggest", r#"{"action":"test","code":"x"}"#)).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["code"], 502);
    }

    #[tokio::test]
    async fn test_suggest_empty_answer_is_bad_gateway() {
        let url = fake_upstream(StatusCode::OK, json!({"choices": []})).await;
        let app = app_with(Config {
            suggestion_api_url: url,
            suggestion_api_key: Some("sk-test".to_string()),
            ..Config::default()
        });

        let (status, _) = call(app, post_json("/api/v1/suggest", r#"{"action":"explain","code":"x"}"#)).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }
}
