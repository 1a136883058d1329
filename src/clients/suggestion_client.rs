use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{error, info};

use crate::config::Config;
use crate::models::TokenUsage;

const MAX_TOKENS: u32 = 2000;
const TEMPERATURE: f64 = 0.1;

/// Client for an OpenAI-compatible chat completion endpoint.
#[derive(Debug, Clone)]
pub struct SuggestionClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessage>,
}

/// A completed suggestion as returned upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

#[derive(Debug)]
pub enum SuggestionError {
    NotConfigured,
    Http(reqwest::Error),
    Upstream { status: u16, body: String },
    EmptyResponse,
}

impl fmt::Display for SuggestionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuggestionError::NotConfigured => write!(f, "Suggestion service API key not configured"),
            SuggestionError::Http(e) => write!(f, "Suggestion service request failed: {}", e),
            SuggestionError::Upstream { status, body } => {
                write!(f, "Suggestion service responded with {}: {}", status, body)
            }
            SuggestionError::EmptyResponse => write!(f, "No response from suggestion service"),
        }
    }
}

impl std::error::Error for SuggestionError {}

impl From<reqwest::Error> for SuggestionError {
    fn from(e: reqwest::Error) -> Self {
        SuggestionError::Http(e)
    }
}

impl SuggestionClient {
    pub fn new(base_url: String, api_key: String, model: String) -> Result<Self, SuggestionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        })
    }

    /// Build the client when an API key is configured.
    pub fn from_config(config: &Config) -> Option<Self> {
        let api_key = match &config.suggestion_api_key {
            Some(key) if !key.is_empty() => key.clone(),
            _ => {
                info!("No suggestion API key configured - suggestions are disabled");
                return None;
            }
        };

        match Self::new(config.suggestion_api_url.clone(), api_key, config.suggestion_model.clone()) {
            Ok(client) => {
                info!("Suggestions enabled using model {}", client.model());
                Some(client)
            }
            Err(e) => {
                error!("Failed to build suggestion client: {}", e);
                None
            }
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one system + user prompt pair and return the first choice.
    pub async fn complete(&self, system: &str, user: &str) -> Result<Completion, SuggestionError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system".to_string(), content: system.to_string() },
                ChatMessage { role: "user".to_string(), content: user.to_string() },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let response = self.client.post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SuggestionError::Upstream { status: status.as_u16(), body });
        }

        let parsed: ChatCompletionResponse = response.json().await?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .map(|message| message.content)
            .filter(|content| !content.is_empty())
            .ok_or(SuggestionError::EmptyResponse)?;

        Ok(Completion { text, usage: parsed.usage })
    }
}
