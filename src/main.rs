mod models;
mod handlers;
mod routes;
mod docs;
mod websocket;
mod config;
mod clients;
mod services;
mod ws;

use clients::suggestion_client::SuggestionClient;
use config::Config;
use routes::create_app;
use tracing::{info, error, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use std::panic;
use std::sync::Arc;
use ws::{spawn_dispatcher, ConnectionLifecycleHandler, DispatcherHandle, MembershipManager, SessionRegistry};

/// Shared state handed to every handler
pub struct AppState {
    pub config: Config,
    pub dispatcher: DispatcherHandle,
    pub suggestions: Option<SuggestionClient>,
}

impl AppState {
    /// Build the state and start the session dispatcher. Needs a running tokio runtime.
    pub fn new(config: Config) -> Self {
        let handler = ConnectionLifecycleHandler::new(
            SessionRegistry::new(config.default_language.clone()),
            MembershipManager::from_entropy(),
        );
        let dispatcher = spawn_dispatcher(handler);
        let suggestions = SuggestionClient::from_config(&config);
        Self { config, dispatcher, suggestions }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {

    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Configuration first so `log_level` can seed the tracing filter
    let loaded = Config::load();
    let log_filter = match &loaded {
        Ok(config) => config.log_filter(),
        Err(_) => Config::default().log_filter(),
    };

    // Initialize tracing, RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::try_new(&log_filter).unwrap_or_else(|_| EnvFilter::new("info"))
        }))
        .init();

    info!("Starting server...");

    let config = match loaded {
        Ok(config) => {
            info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            warn!("Using default configuration");
            Config::default()
        }
    };

    match config.idle_timeout() {
        Some(limit) => info!("Idle connections reclaimed after {:?}", limit),
        None => warn!("Idle connection sweep disabled - stale participants are kept until disconnect"),
    }
    match (config.heartbeat_interval(), config.idle_timeout()) {
        (Some(period), Some(limit)) if period >= limit => {
            warn!("Heartbeat every {:?} is not shorter than the idle limit {:?} - quiet clients will be reclaimed", period, limit)
        }
        (None, Some(_)) => warn!("Heartbeat disabled - clients that only listen will be reclaimed when idle"),
        _ => {}
    }

    let address = config.server_address();
    let app_state = Arc::new(AppState::new(config));
    let app = create_app(app_state);

    let listener = match tokio::net::TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", address, e);
            return;
        }
    };

    info!("🚀 Server running on http://{}", address);
    info!("📡 WebSocket available at ws://{}/ws", address);
    info!("📚 Swagger UI available at http://{}/swagger", address);

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
    }
}
