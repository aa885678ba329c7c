//! Capture-process-dispatch pipeline
//!
//! One submitted sentence goes through, strictly in order:
//!
//! ```text
//! text ──▶ TaskExtractor ──▶ TaskSubmitter ──▶ "200 OK"?  ──yes──▶ toggle visibility (hide)
//!               │                  │                │
//!               │ error            │ transport      └──no───▶ ErrorEvent(status line)
//!               ▼                  ▼ error
//!          ErrorEvent          ErrorEvent
//! ```
//!
//! Failures never escape this module: every error is reported to the
//! presentation layer and returned as a [`PipelineOutcome`]. A failed
//! extraction never reaches the submitter.

use crate::config::Config;
use crate::extract::{self, TaskExtractor};
use crate::presenter::{Presenter, UiEvent};
use crate::submit::{self, TaskSubmitter};
use crate::visibility::VisibilityController;
use std::sync::Arc;

/// What happened to one submitted sentence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// The page was created and the input surface toggled
    Created { title: String },
    /// The API answered with something other than "200 OK"
    Rejected { status: String },
    /// Extraction or transport failed before a status was available
    Failed { error: String },
}

impl PipelineOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, PipelineOutcome::Created { .. })
    }
}

impl std::fmt::Display for PipelineOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineOutcome::Created { title } => write!(f, "Created task {:?}", title),
            PipelineOutcome::Rejected { status } => write!(f, "Rejected: {}", status),
            PipelineOutcome::Failed { error } => write!(f, "Failed: {}", error),
        }
    }
}

/// Orchestrates extraction, submission and outcome reporting
pub struct Pipeline {
    extractor: Box<dyn TaskExtractor>,
    submitter: Box<dyn TaskSubmitter>,
    visibility: Arc<VisibilityController>,
    presenter: Arc<dyn Presenter>,
}

impl Pipeline {
    pub fn new(
        extractor: Box<dyn TaskExtractor>,
        submitter: Box<dyn TaskSubmitter>,
        visibility: Arc<VisibilityController>,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        tracing::debug!(
            "Pipeline: {} -> {}",
            extractor.name(),
            submitter.name()
        );
        Self {
            extractor,
            submitter,
            visibility,
            presenter,
        }
    }

    /// Build the configured backends
    pub fn from_config(
        config: &Config,
        visibility: Arc<VisibilityController>,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        Self::new(
            extract::create_extractor(&config.extractor),
            submit::create_submitter(&config.notion),
            visibility,
            presenter,
        )
    }

    /// Run one sentence through the pipeline. Blocks on both network calls.
    pub fn process_message(&self, text: &str) -> PipelineOutcome {
        tracing::info!("Processing {:?}", text);

        let task = match self.extractor.extract(text) {
            Ok(task) => task,
            Err(e) => return self.fail(e.to_string()),
        };

        let title = task.title.clone();

        let result = match self.submitter.submit(task) {
            Ok(result) => result,
            Err(e) => return self.fail(e.to_string()),
        };

        if result.is_success() {
            tracing::info!("Created task {:?}", title);
            self.visibility.toggle();
            PipelineOutcome::Created { title }
        } else {
            tracing::warn!("Task {:?} rejected: {}", title, result.status);
            self.presenter.emit(UiEvent::Error(result.status.clone()));
            PipelineOutcome::Rejected {
                status: result.status,
            }
        }
    }

    fn fail(&self, error: String) -> PipelineOutcome {
        tracing::error!("{}", error);
        self.presenter.emit(UiEvent::Error(error.clone()));
        PipelineOutcome::Failed { error }
    }
}
