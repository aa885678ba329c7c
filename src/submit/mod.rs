//! Structured-task submission to the remote task database
//!
//! A submission either fails on the wire (`SubmissionError`) or produces a
//! [`SubmissionResult`] carrying the HTTP status line. Non-2xx responses are
//! results, not errors, so the caller decides what a rejection means.
//!
//! There is no retry and no idempotency key: if the network drops after the
//! server accepted the request, a repeated submission creates a second page.

pub mod notion;
pub mod page;

use crate::config::NotionConfig;
use crate::error::SubmissionError;
use crate::task::StructuredTask;

/// The only status line treated as success
pub const SUCCESS_STATUS: &str = "200 OK";

/// Outcome of one page-creation request that reached the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionResult {
    /// Numeric HTTP status
    pub status_code: u16,
    /// Status line as reported to the user, e.g. "401 Unauthorized"
    pub status: String,
    /// Raw response body, kept for diagnostics only
    pub body: String,
}

impl SubmissionResult {
    pub fn new(status_code: u16, reason: &str, body: String) -> Self {
        let status = if reason.is_empty() {
            status_code.to_string()
        } else {
            format!("{} {}", status_code, reason)
        };
        Self {
            status_code,
            status,
            body,
        }
    }

    /// True only for the exact success status line
    pub fn is_success(&self) -> bool {
        self.status == SUCCESS_STATUS
    }
}

/// Trait for submission backends
pub trait TaskSubmitter: Send + Sync {
    /// Persist the task as a new page. Exactly one request per call.
    fn submit(&self, task: StructuredTask) -> Result<SubmissionResult, SubmissionError>;

    /// Get the backend name
    fn name(&self) -> &'static str;
}

/// Create the submitter for the given configuration
pub fn create_submitter(config: &NotionConfig) -> Box<dyn TaskSubmitter> {
    Box::new(notion::NotionSubmitter::new(config))
}
