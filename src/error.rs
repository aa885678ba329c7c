//! Error types for tasklight
//!
//! Uses thiserror for ergonomic error definitions with clear messages
//! that guide users toward fixing common issues.

use thiserror::Error;

/// Top-level error type for the tasklight application
#[derive(Error, Debug)]
pub enum TasklightError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Hotkey error: {0}")]
    Hotkey(#[from] HotkeyError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Submission error: {0}")]
    Submission(#[from] SubmissionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to loading and validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required setting(s): {}.\n  Set them in the environment, a .env file, or config.toml.", .0.join(", "))]
    Missing(Vec<String>),

    #[error("Failed to read {0}")]
    Read(String),

    #[error("Invalid config: {0}")]
    Parse(String),
}

/// Errors related to global hotkey registration
#[derive(Error, Debug)]
pub enum HotkeyError {
    #[error("Cannot open input device '{0}'. Is the user in the 'input' group?\n  Run: sudo usermod -aG input $USER\n  Then log out and back in.")]
    DeviceAccess(String),

    #[error("Unknown key name: '{0}'. Use evtest or wev to find valid key names.")]
    UnknownKey(String),

    #[error("No keyboard device found in /dev/input/")]
    NoKeyboard,

    #[error("Hotkey registration rejected: {0}")]
    Registration(String),
}

/// Errors from turning free text into a structured task
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Extraction service unreachable: {0}")]
    Network(String),

    #[error("Extraction service returned {status}: {body}")]
    Remote { status: u16, body: String },

    #[error("Could not parse extraction response: {0}")]
    Parse(String),
}

/// Errors from calling the page-creation API
///
/// Only transport failures land here. A non-2xx response is reported
/// through `SubmissionResult` instead.
#[derive(Error, Debug)]
pub enum SubmissionError {
    #[error("Notion API unreachable: {0}")]
    Transport(String),

    #[error("Failed to encode page request: {0}")]
    Encode(String),
}

/// Result type alias using TasklightError
pub type Result<T> = std::result::Result<T, TasklightError>;
