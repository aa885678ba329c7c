//! Notion page-creation backend
//!
//! POSTs a [`PageRequest`] to `/v1/pages` with bearer authorization and a
//! pinned `Notion-Version` header.

use super::page::PageRequest;
use super::{SubmissionResult, TaskSubmitter};
use crate::config::NotionConfig;
use crate::error::SubmissionError;
use crate::task::StructuredTask;
use std::time::Duration;

/// Submitter that creates one Notion page per task
#[derive(Debug)]
pub struct NotionSubmitter {
    /// Base endpoint URL (e.g., "https://api.notion.com")
    endpoint: String,
    /// `Notion-Version` header value
    version: String,
    /// Target database
    database_id: String,
    /// Integration secret
    secret: String,
    /// Request timeout
    timeout: Duration,
}

impl NotionSubmitter {
    /// Create a new submitter from config
    ///
    /// Missing credentials are sent as empty strings; the API then answers
    /// with an authorization or validation status that reaches the user.
    pub fn new(config: &NotionConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            version: config.version.clone(),
            database_id: config.database_id.clone().unwrap_or_default(),
            secret: config.secret.clone().unwrap_or_default(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    fn pages_url(&self) -> String {
        format!("{}/v1/pages", self.endpoint.trim_end_matches('/'))
    }
}

impl TaskSubmitter for NotionSubmitter {
    fn submit(&self, task: StructuredTask) -> Result<SubmissionResult, SubmissionError> {
        let page = PageRequest::new(&self.database_id, &task);
        let body =
            serde_json::to_string(&page).map_err(|e| SubmissionError::Encode(e.to_string()))?;

        let url = self.pages_url();
        let client = ureq::AgentBuilder::new().timeout(self.timeout).build();

        tracing::debug!(
            "Creating page in database {} (due date: {})",
            self.database_id,
            page.has_due_date()
        );

        let response = client
            .post(&url)
            .set("Authorization", &format!("Bearer {}", self.secret))
            .set("Content-Type", "application/json; charset=utf-8")
            .set("Notion-Version", &self.version)
            .send_string(&body);

        let response = match response {
            Ok(resp) => resp,
            Err(ureq::Error::Status(_, resp)) => resp,
            Err(ureq::Error::Transport(t)) => {
                return Err(SubmissionError::Transport(t.to_string()));
            }
        };

        let status_code = response.status();
        let reason = response.status_text().to_string();
        let body = response
            .into_string()
            .map_err(|e| SubmissionError::Transport(format!("reading response body: {}", e)))?;

        let result = SubmissionResult::new(status_code, &reason, body);
        tracing::debug!("Notion responded {}: {}", result.status, result.body);

        Ok(result)
    }

    fn name(&self) -> &'static str {
        "notion"
    }
}
