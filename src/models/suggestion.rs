use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionAction {
    Fix,
    Refactor,
    Explain,
    Test,
}

impl fmt::Display for SuggestionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuggestionAction::Fix => write!(f, "fix"),
            SuggestionAction::Refactor => write!(f, "refactor"),
            SuggestionAction::Explain => write!(f, "explain"),
            SuggestionAction::Test => write!(f, "test"),
        }
    }
}

/// Character offsets into the submitted code.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionRange {
    pub start: usize,
    pub end: usize,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct SuggestionRequest {
    pub action: SuggestionAction,
    #[serde(default)]
    pub code: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub selection: Option<SelectionRange>,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Default, PartialEq)]
pub struct TokenUsage {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct SuggestionResponse {
    pub suggestion: String,
    pub action: SuggestionAction,
    pub language: String,
    pub timestamp: String,
    pub usage: Option<TokenUsage>,
}

fn default_language() -> String {
    "javascript".to_string()
}
