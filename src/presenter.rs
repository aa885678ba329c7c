//! Presentation layer boundary
//!
//! The core never draws anything. It emits [`UiEvent`]s and issues
//! [`WindowCommand`]s to a [`Presenter`], which a GUI shell implements.
//! [`DesktopPresenter`] is the headless implementation used by the daemon:
//! the terminal is the input surface, desktop notifications carry errors, and
//! a state file mirrors visibility for bars and scripts.

use crate::config::Config;
use crate::notification;
use std::path::{Path, PathBuf};

/// Wire name of the error event
pub const ERROR_EVENT: &str = "Backend:ErrorEvent";
/// Wire name of the hotkey event
pub const GLOBAL_HOTKEY_EVENT: &str = "Backend:GlobalHotkeyEvent";

/// Events sent from the core to the UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// A submission failed; payload is a human-readable status string
    Error(String),
    /// The global hotkey fired; payload is the activation timestamp
    GlobalHotkey(String),
}

impl UiEvent {
    /// Event name as seen by a frontend
    pub fn name(&self) -> &'static str {
        match self {
            UiEvent::Error(_) => ERROR_EVENT,
            UiEvent::GlobalHotkey(_) => GLOBAL_HOTKEY_EVENT,
        }
    }

    pub fn payload(&self) -> &str {
        match self {
            UiEvent::Error(payload) | UiEvent::GlobalHotkey(payload) => payload,
        }
    }
}

/// Commands sent from the core to the window manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowCommand {
    Show,
    Hide,
    SetAlwaysOnTop(bool),
}

/// Receiver of core-to-UI traffic
pub trait Presenter: Send + Sync {
    /// Deliver an event to the UI
    fn emit(&self, event: UiEvent);

    /// Apply a window command
    fn command(&self, command: WindowCommand);
}

/// Headless presenter: terminal prompt, desktop notifications, state file
pub struct DesktopPresenter {
    state_file: Option<PathBuf>,
    notify_on_error: bool,
}

impl DesktopPresenter {
    pub fn new(config: &Config) -> Self {
        Self {
            state_file: config.resolve_state_file(),
            notify_on_error: config.notification.on_error,
        }
    }

    /// Remove the state file on shutdown
    pub fn cleanup(&self) {
        if let Some(ref path) = self.state_file {
            cleanup_state_file(path);
        }
    }

    fn update_state(&self, state: &str) {
        if let Some(ref path) = self.state_file {
            write_state_file(path, state);
        }
    }
}

impl Presenter for DesktopPresenter {
    fn emit(&self, event: UiEvent) {
        match event {
            UiEvent::Error(ref status) => {
                tracing::error!("{}: {}", ERROR_EVENT, status);
                if self.notify_on_error {
                    notification::send_sync("Task not created", status);
                }
            }
            UiEvent::GlobalHotkey(ref at) => {
                tracing::debug!("{}: {}", GLOBAL_HOTKEY_EVENT, at);
            }
        }
    }

    fn command(&self, command: WindowCommand) {
        match command {
            WindowCommand::Show => {
                self.update_state("visible");
                eprintln!("Type a task and press Enter:");
            }
            WindowCommand::Hide => {
                self.update_state("hidden");
                tracing::info!("Input hidden, press the hotkey to add another task");
            }
            WindowCommand::SetAlwaysOnTop(on_top) => {
                tracing::trace!("Always on top: {}", on_top);
            }
        }
    }
}

/// Write state to file for external integrations (e.g., Waybar)
fn write_state_file(path: &Path, state: &str) {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!("Failed to create state file directory: {}", e);
            return;
        }
    }

    if let Err(e) = std::fs::write(path, state) {
        tracing::warn!("Failed to write state file: {}", e);
    } else {
        tracing::trace!("State file updated: {}", state);
    }
}

fn cleanup_state_file(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            tracing::warn!("Failed to remove state file: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn presenter_with_state_file(path: &Path) -> DesktopPresenter {
        let mut config = Config::default();
        config.state_file = Some(path.display().to_string());
        config.notification.on_error = false;
        DesktopPresenter::new(&config)
    }

    #[test]
    fn test_event_names() {
        assert_eq!(UiEvent::Error("401 Unauthorized".into()).name(), "Backend:ErrorEvent");
        assert_eq!(
            UiEvent::GlobalHotkey("now".into()).name(),
            "Backend:GlobalHotkeyEvent"
        );
        assert_eq!(UiEvent::Error("401 Unauthorized".into()).payload(), "401 Unauthorized");
    }

    #[test]
    fn test_window_commands_update_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state");
        let presenter = presenter_with_state_file(&path);

        presenter.command(WindowCommand::Hide);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hidden");

        presenter.command(WindowCommand::Show);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "visible");

        presenter.command(WindowCommand::SetAlwaysOnTop(true));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "visible");

        presenter.cleanup();
        assert!(!path.exists());
    }

    #[test]
    fn test_disabled_state_file() {
        let mut config = Config::default();
        config.state_file = Some("disabled".to_string());
        let presenter = DesktopPresenter::new(&config);
        assert!(presenter.state_file.is_none());
        presenter.command(WindowCommand::Hide);
        presenter.cleanup();
    }
}
