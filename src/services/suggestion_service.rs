use chrono::Utc;
use tracing::info;

use crate::clients::suggestion_client::{SuggestionClient, SuggestionError};
use crate::models::{SelectionRange, SuggestionAction, SuggestionRequest, SuggestionResponse};

/// System and user prompt for one suggestion round trip.
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestionPrompt {
    pub system: String,
    pub user: String,
}

/// Substring covered by `selection`, in characters, clamped to the text.
pub fn selected_code(code: &str, selection: Option<SelectionRange>) -> String {
    let Some(SelectionRange { start, end }) = selection else {
        return code.to_string();
    };
    let len = code.chars().count();
    let (start, end) = (start.min(len), end.min(len));
    let (start, end) = if start > end { (end, start) } else { (start, end) };
    code.chars().skip(start).take(end - start).collect()
}

pub fn build_prompt(request: &SuggestionRequest) -> SuggestionPrompt {
    let language = &request.language;
    let selected = selected_code(&request.code, request.selection);

    let mut context_info = String::new();
    if selected != request.code {
        context_info.push_str(&format!("\n\nFull context:\n```{language}\n{}\n```", request.code));
    }
    if let Some(extra) = request.context.as_deref().filter(|c| !c.trim().is_empty()) {
        context_info.push_str(&format!("\n\nAdditional context:\n{extra}"));
    }

    let code_block = format!("```{language}\n{selected}\n```{context_info}");
    let user = match request.action {
        SuggestionAction::Fix => format!(
            "You are an expert {language} developer. Analyze the following code and fix any bugs, errors, or issues you find. Provide the corrected code and explain what was wrong.\n\n\
             Code to fix:\n{code_block}\n\n\
             Please respond with:\n\
             1. The fixed code (in a code block)\n\
             2. A clear explanation of what was wrong and how you fixed it\n\
             3. Any additional suggestions for improvement\n\n\
             Focus on:\n- Syntax errors\n- Logic errors\n- Runtime errors\n- Best practices violations\n- Performance issues"
        ),
        SuggestionAction::Refactor => format!(
            "You are an expert {language} developer. Refactor the following code to improve its quality, readability, and maintainability while preserving its functionality.\n\n\
             Code to refactor:\n{code_block}\n\n\
             Please respond with:\n\
             1. The refactored code (in a code block)\n\
             2. A clear explanation of the improvements made\n\
             3. Why these changes make the code better\n\n\
             Focus on:\n- Code readability and clarity\n- Removing code duplication\n- Improving naming conventions\n- Better error handling\n- Performance optimizations\n- Following best practices"
        ),
        SuggestionAction::Explain => format!(
            "You are an expert {language} developer and teacher. Explain the following code in detail, helping someone understand what it does and how it works.\n\n\
             Code to explain:\n{code_block}\n\n\
             Please provide:\n\
             1. A high-level overview of what the code does\n\
             2. Line-by-line or section-by-section explanation\n\
             3. Key concepts or patterns used\n\
             4. Potential use cases or applications\n\
             5. Any notable implementation details\n\n\
             Make your explanation clear and educational, suitable for developers learning {language}."
        ),
        SuggestionAction::Test => format!(
            "You are an expert {language} developer. Generate comprehensive unit tests for the following code. Create tests that verify the functionality and handle edge cases.\n\n\
             Code to test:\n{code_block}\n\n\
             Please respond with:\n\
             1. Complete unit tests (in a code block)\n\
             2. Explanation of what each test verifies\n\
             3. Coverage of edge cases and error conditions\n\
             4. Setup/teardown if needed\n\n\
             Use appropriate testing frameworks for {language}."
        ),
    };

    let system = format!(
        "You are an expert software developer and code reviewer with deep knowledge of {language} and software engineering best practices. \
         You provide helpful, accurate, and actionable code assistance. Always format code properly and explain your reasoning clearly."
    );

    SuggestionPrompt { system, user }
}

/// One stateless suggestion round trip.
pub async fn request_suggestion(
    client: Option<&SuggestionClient>,
    request: &SuggestionRequest,
) -> Result<SuggestionResponse, SuggestionError> {
    let client = client.ok_or(SuggestionError::NotConfigured)?;

    info!("Suggestion: {} request for {} code", request.action, request.language);
    let prompt = build_prompt(request);
    let completion = client.complete(&prompt.system, &prompt.user).await?;

    Ok(SuggestionResponse {
        suggestion: completion.text,
        action: request.action,
        language: request.language.clone(),
        timestamp: Utc::now().to_rfc3339(),
        usage: completion.usage,
    })
}
