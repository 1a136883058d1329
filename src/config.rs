use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Environment (dev, staging, prod)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// CORS allowed origins, comma separated
    pub cors_origins: Option<String>,

    /// Log level for this crate and the HTTP layer, or a full `EnvFilter` directive list.
    /// `RUST_LOG` takes precedence when set.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Seconds without any inbound frame before a connection is reclaimed (0 disables)
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// Seconds between server WebSocket pings; a live client answers with a pong (0 disables)
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,

    /// Outbound events buffered per connection before it is dropped as too slow
    #[serde(default = "default_outbox_capacity")]
    pub outbox_capacity: usize,

    /// Language tag given to freshly created sessions
    #[serde(default = "default_language")]
    pub default_language: String,

    /// Base URL of the OpenAI-compatible completion API
    #[serde(default = "default_suggestion_api_url")]
    pub suggestion_api_url: String,

    /// API key for the completion API; suggestions are disabled without it
    pub suggestion_api_key: Option<String>,

    /// Model name sent with every completion request
    #[serde(default = "default_suggestion_model")]
    pub suggestion_model: String,
}

impl Config {
    /// Load configuration from environment variables or app.env file
    pub fn load() -> Result<Self, ConfigError> {
        // Try to load from app.env file first
        if std::path::Path::new("app.env").exists() {
            dotenvy::from_filename("app.env").ok();
        } else {
            // Fallback to .env file
            dotenvy::dotenv().ok();
        }

        // Runs before tracing is initialised, so the caller reports the outcome
        envy::from_env::<Config>().map_err(ConfigError::EnvError)
    }

    /// Tracing directives built from `log_level`.
    pub fn log_filter(&self) -> String {
        let level = self.log_level.trim();
        if level.contains('=') || level.contains(',') {
            level.to_string()
        } else {
            format!("codepad_sync={level},tower_http={level},axum::rejection=trace,{level}")
        }
    }

    /// Get the full server address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if running in development mode
    pub fn is_development(&self) -> bool {
        self.environment.to_lowercase() == "dev" || self.environment.to_lowercase() == "development"
    }

    /// Check if running in production mode
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "prod" || self.environment.to_lowercase() == "production"
    }

    /// Idle limit for a single connection, `None` when the sweep is disabled.
    pub fn idle_timeout(&self) -> Option<Duration> {
        match self.idle_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Period of the server-side ping, `None` when heartbeats are disabled.
    pub fn heartbeat_interval(&self) -> Option<Duration> {
        match self.heartbeat_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Configured CORS origins, trimmed and without empty entries.
    pub fn cors_origin_list(&self) -> Vec<String> {
        self.cors_origins
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            log_level: default_log_level(),
            cors_origins: None,
            idle_timeout_secs: default_idle_timeout_secs(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            outbox_capacity: default_outbox_capacity(),
            default_language: default_language(),
            suggestion_api_url: default_suggestion_api_url(),
            suggestion_api_key: None,
            suggestion_model: default_suggestion_model(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    EnvError(envy::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::EnvError(e) => write!(f, "Environment variable error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_idle_timeout_secs() -> u64 {
    120
}

fn default_heartbeat_interval_secs() -> u64 {
    30
}

fn default_outbox_capacity() -> usize {
    256
}

fn default_language() -> String {
    "javascript".to_string()
}

fn default_suggestion_api_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_suggestion_model() -> String {
    "gpt-4".to_string()
}
