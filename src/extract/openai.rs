//! Task extraction via an OpenAI-compatible chat completions API
//!
//! Works with api.openai.com as well as local servers exposing the same
//! `/v1/chat/completions` route (Ollama, llama.cpp server, vLLM).

use super::{build_prompt, parse_task_response, TaskExtractor};
use crate::config::ExtractorConfig;
use crate::error::ExtractionError;
use crate::task::StructuredTask;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Extractor backed by a chat completions endpoint
#[derive(Debug)]
pub struct OpenAiExtractor {
    /// Base endpoint URL (e.g., "https://api.openai.com")
    endpoint: String,
    /// Chat model name
    model: String,
    /// API key sent as a bearer token
    api_key: Option<String>,
    /// Request timeout
    timeout: Duration,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl OpenAiExtractor {
    /// Create a new extractor from config
    pub fn new(config: &ExtractorConfig) -> Self {
        if config.endpoint.starts_with("http://")
            && !config.endpoint.contains("localhost")
            && !config.endpoint.contains("127.0.0.1")
        {
            tracing::warn!(
                "Extraction endpoint uses HTTP without TLS. Task text and API key will be sent unencrypted!"
            );
        }

        Self {
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.endpoint.trim_end_matches('/'))
    }

    /// Send the prompt and return the first choice's message content
    fn call_api(&self, prompt: &str) -> Result<String, ExtractionError> {
        let client = ureq::AgentBuilder::new().timeout(self.timeout).build();
        let url = self.completions_url();

        let mut request = client.post(&url);
        if let Some(ref key) = self.api_key {
            request = request.set("Authorization", &format!("Bearer {}", key));
        }

        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        tracing::debug!("Calling extraction API: {} (model {})", url, self.model);

        let response = request.send_json(&body).map_err(|e| match e {
            ureq::Error::Status(status, resp) => ExtractionError::Remote {
                status,
                body: resp.into_string().unwrap_or_default(),
            },
            ureq::Error::Transport(t) => ExtractionError::Network(t.to_string()),
        })?;

        let chat: ChatResponse = response
            .into_json()
            .map_err(|e| ExtractionError::Parse(format!("invalid completion response: {}", e)))?;

        chat.choices
            .into_iter()
            .next()
            .ok_or_else(|| ExtractionError::Parse("completion contained no choices".into()))?
            .message
            .content
            .ok_or_else(|| ExtractionError::Parse("completion message has no content".into()))
    }
}

impl TaskExtractor for OpenAiExtractor {
    fn extract(&self, input: &str) -> Result<StructuredTask, ExtractionError> {
        let start = std::time::Instant::now();
        let today = chrono::Local::now().date_naive();
        let prompt = build_prompt(input, today);

        let content = self.call_api(&prompt)?;
        tracing::debug!("Extraction response ({} chars): {}", content.len(), content);

        let task = parse_task_response(&content)?;

        if task.title.trim().is_empty() {
            tracing::warn!("Extraction returned an empty title for {:?}", input);
        }
        if task.date.is_some() && !task.has_valid_date() {
            tracing::warn!("Extraction returned a non-ISO date: {:?}", task.date);
        }

        tracing::info!(
            "Extracted {} in {:.2}s",
            task,
            start.elapsed().as_secs_f32()
        );

        Ok(task)
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_from_config() {
        let config = ExtractorConfig {
            endpoint: "http://localhost:11434/".to_string(),
            model: "llama3.2".to_string(),
            api_key: Some("sk-test-key-123".to_string()),
            timeout_secs: 90,
        };

        let extractor = OpenAiExtractor::new(&config);
        assert_eq!(extractor.model, "llama3.2");
        assert_eq!(extractor.api_key.as_deref(), Some("sk-test-key-123"));
        assert_eq!(extractor.timeout, Duration::from_secs(90));
        assert_eq!(
            extractor.completions_url(),
            "http://localhost:11434/v1/chat/completions"
        );
    }

    #[test]
    fn test_request_shape() {
        let body = ChatRequest {
            model: "gpt-4o-mini",
            messages: [ChatMessage {
                role: "user",
                content: "hello",
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"].as_array().unwrap().len(), 1);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hello");
    }

    #[test]
    fn test_name() {
        let extractor = OpenAiExtractor::new(&ExtractorConfig::default());
        assert_eq!(extractor.name(), "openai");
    }
}
