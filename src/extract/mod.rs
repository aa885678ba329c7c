//! Natural-language to structured-task extraction
//!
//! Sends one sentence plus today's date to a language model and expects a
//! bare JSON object `{"title": ..., "date": ...}` back. The extractor does no
//! date arithmetic of its own; relative phrases like "tomorrow" are resolved
//! by the model from the date embedded in the prompt.
//!
//! # Backends
//!
//! - **OpenAI-compatible**: chat completions endpoint (OpenAI, Ollama, vLLM, ...)

pub mod openai;

use crate::config::ExtractorConfig;
use crate::error::ExtractionError;
use crate::task::StructuredTask;
use chrono::NaiveDate;

/// Trait for extraction backends
pub trait TaskExtractor: Send + Sync {
    /// Turn free text into a structured task. Exactly one remote request per call.
    fn extract(&self, input: &str) -> Result<StructuredTask, ExtractionError>;

    /// Get the backend name
    fn name(&self) -> &'static str;
}

/// Create the extractor for the given configuration
pub fn create_extractor(config: &ExtractorConfig) -> Box<dyn TaskExtractor> {
    Box::new(openai::OpenAiExtractor::new(config))
}

/// Build the instruction prompt for one sentence
pub fn build_prompt(input: &str, today: NaiveDate) -> String {
    format!(
        r#"You are a task parsing assistant. You turn natural-language task descriptions into structured data.
Today's date is {today}.
Extract the task title and date from this sentence: "{input}".
Return only a JSON object in exactly this format: {{ "title": ..., "date": ... }}.
If no date is mentioned, set the "date" value to null.
When a date is present it must be an ISO 8601 calendar date (YYYY-MM-DD)."#,
        today = today.format("%Y-%m-%d"),
        input = input,
    )
}

/// Parse the model's message content into a task
///
/// The content must be a JSON object with a string `title` and a string or
/// null `date`. A surrounding markdown code fence is tolerated; anything else
/// is a hard error rather than a defaulted task.
pub fn parse_task_response(content: &str) -> Result<StructuredTask, ExtractionError> {
    let json_str = strip_code_fence(content.trim());

    let value: serde_json::Value = serde_json::from_str(json_str).map_err(|e| {
        ExtractionError::Parse(format!("not JSON ({}): {}", e, preview(content)))
    })?;

    if !value.is_object() {
        return Err(ExtractionError::Parse(format!(
            "expected a JSON object, got: {}",
            preview(content)
        )));
    }

    serde_json::from_value(value).map_err(|e| ExtractionError::Parse(e.to_string()))
}

/// Strip a ```json ... ``` fence if the model wrapped its answer in one
fn strip_code_fence(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return s;
    };
    // Drop the info string ("json") on the opening line
    match body.find('\n') {
        Some(newline) => body[newline + 1..].trim(),
        None => body.trim(),
    }
}

fn preview(s: &str) -> String {
    if s.chars().count() > 80 {
        format!("{}...", s.chars().take(80).collect::<String>())
    } else {
        s.to_string()
    }
}
