//! Visibility state for the input surface
//!
//! Two states, no terminal state:
//! Visible ⇄ Hidden, starting Visible
//!
//! The flag is flipped from two places (hotkey events and pipeline outcomes)
//! running on different threads. Every flip happens under one mutex, and the
//! matching window commands are issued while it is held, so interleaved
//! toggles are applied one after the other and never lose an update.

use crate::presenter::{Presenter, WindowCommand};
use std::sync::{Arc, Mutex};

/// Whether the input surface is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

impl Visibility {
    pub fn toggled(self) -> Self {
        match self {
            Visibility::Visible => Visibility::Hidden,
            Visibility::Hidden => Visibility::Visible,
        }
    }

    pub fn is_visible(self) -> bool {
        matches!(self, Visibility::Visible)
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Visibility::Visible => write!(f, "visible"),
            Visibility::Hidden => write!(f, "hidden"),
        }
    }
}

/// Owner of the process-wide visibility flag
pub struct VisibilityController {
    state: Mutex<Visibility>,
    presenter: Arc<dyn Presenter>,
}

impl VisibilityController {
    /// Create a controller in the initial Visible state
    pub fn new(presenter: Arc<dyn Presenter>) -> Self {
        Self::with_state(Visibility::Visible, presenter)
    }

    pub fn with_state(initial: Visibility, presenter: Arc<dyn Presenter>) -> Self {
        Self {
            state: Mutex::new(initial),
            presenter,
        }
    }

    /// Flip the flag and tell the presentation layer. Returns the new state.
    ///
    /// Showing also requests always-on-top placement.
    pub fn toggle(&self) -> Visibility {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let next = state.toggled();
        self.apply(next);
        *state = next;
        tracing::debug!("Visibility: {}", next);
        next
    }

    /// Re-issue window commands for the current state (used once at startup)
    pub fn announce(&self) {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        self.apply(*state);
    }

    pub fn current(&self) -> Visibility {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_visible(&self) -> bool {
        self.current().is_visible()
    }

    fn apply(&self, state: Visibility) {
        match state {
            Visibility::Hidden => self.presenter.command(WindowCommand::Hide),
            Visibility::Visible => {
                self.presenter.command(WindowCommand::Show);
                self.presenter.command(WindowCommand::SetAlwaysOnTop(true));
            }
        }
    }
}
