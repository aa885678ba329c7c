//! Tasklight: turn one sentence into a Notion task
//!
//! This library provides the core functionality for:
//! - Toggling an input surface with a global hotkey (evdev on Linux, rdev elsewhere)
//! - Extracting a title and due date from free text with a chat-completion model
//! - Creating the task as a page in a Notion database
//! - Reporting failures to the presentation layer
//!
//! # Architecture
//!
//! ```text
//!                            ┌─────────────────────────────────────┐
//!                            │              Daemon                 │
//!                            └─────────────────────────────────────┘
//!                                            │
//!                   ┌────────────────────────┼────────────────────────┐
//!                   │                        │                        │
//!                   ▼                        ▼                        ▼
//!          ┌──────────────┐         ┌──────────────┐         ┌──────────────┐
//!          │    Hotkey    │         │    Input     │         │  Visibility  │
//!          │ (evdev/rdev) │         │   (stdin)    │         │  Controller  │
//!          └──────────────┘         └──────────────┘         └──────────────┘
//!                   │                        │                        ▲
//!                   │  chord pressed         │ sentence               │ toggle
//!                   └──────── toggle ────────┼────────────────────────┤
//!                                            ▼                        │
//!                                   ┌──────────────┐                  │
//!                                   │  Extractor   │                  │
//!                                   │   (OpenAI)   │                  │
//!                                   └──────────────┘                  │
//!                                            │                        │
//!                                            ▼ {title, date?}         │
//!                                   ┌──────────────┐                  │
//!                                   │  Submitter   │── "200 OK" ──────┘
//!                                   │   (Notion)   │
//!                                   └──────────────┘
//!                                            │ anything else
//!                                            ▼
//!                                   ┌──────────────┐
//!                                   │  Presenter   │ Backend:ErrorEvent
//!                                   └──────────────┘
//! ```

pub mod cli;
pub mod config;
pub mod daemon;
pub mod error;
pub mod extract;
pub mod hotkey;
pub mod notification;
pub mod pipeline;
pub mod presenter;
pub mod submit;
pub mod task;
pub mod visibility;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use daemon::Daemon;
pub use error::{Result, TasklightError};
pub use pipeline::{Pipeline, PipelineOutcome};
pub use task::StructuredTask;
