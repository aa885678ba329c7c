//! Global hotkey detection
//!
//! On Linux, provides kernel-level key event detection using evdev.
//! This approach works on all Wayland compositors because it
//! operates at the Linux input subsystem level.
//!
//! On macOS, uses rdev's global event tap, which requires Accessibility
//! permission and delivers events on the listening thread only. Other
//! platforms have no built-in hotkey; use `tasklight toggle` instead.
//!
//! Each listener owns one dedicated OS thread for its whole lifetime and
//! forwards key events over a channel; it never touches visibility itself.
//!
//! Linux: Requires the user to be in the 'input' group.

#[cfg(target_os = "linux")]
pub mod evdev_listener;
#[cfg(target_os = "macos")]
pub mod rdev_listener;

use crate::config::HotkeyConfig;
use crate::error::HotkeyError;
use tokio::sync::mpsc;

/// Events emitted by the hotkey listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyEvent {
    /// The chord was pressed (key-down of the main key with modifiers held)
    Pressed,
    /// The main key was released after a press
    Released,
}

/// Trait for hotkey detection implementations
#[async_trait::async_trait]
pub trait HotkeyListener: Send + Sync {
    /// Start listening for hotkey events
    /// Returns a channel receiver for events
    async fn start(&mut self) -> Result<mpsc::Receiver<HotkeyEvent>, HotkeyError>;

    /// Stop listening and clean up
    async fn stop(&mut self) -> Result<(), HotkeyError>;
}

/// Factory function to create the appropriate hotkey listener
#[cfg(target_os = "linux")]
pub fn create_listener(config: &HotkeyConfig) -> Result<Box<dyn HotkeyListener>, HotkeyError> {
    Ok(Box::new(evdev_listener::EvdevListener::new(config)?))
}

/// Factory function to create the appropriate hotkey listener
#[cfg(target_os = "macos")]
pub fn create_listener(config: &HotkeyConfig) -> Result<Box<dyn HotkeyListener>, HotkeyError> {
    Ok(Box::new(rdev_listener::RdevListener::new(config)?))
}

/// Factory function to create the appropriate hotkey listener
#[cfg(not(any(target_os = "linux", target_os = "macos")))]
pub fn create_listener(_config: &HotkeyConfig) -> Result<Box<dyn HotkeyListener>, HotkeyError> {
    Err(HotkeyError::Registration(
        "no global hotkey backend on this platform, bind 'tasklight toggle' instead".to_string(),
    ))
}

/// Normalize a key name: uppercase, no `KEY_` prefix, no `-`, `_` or spaces
///
/// "left-ctrl", "KEY_LEFTCTRL" and "LeftCtrl" all become "LEFTCTRL".
pub(crate) fn normalize_key_name(name: &str) -> String {
    let upper = name.trim().to_ascii_uppercase();
    let bare = upper.strip_prefix("KEY_").unwrap_or(&upper);
    bare.chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .collect()
}
