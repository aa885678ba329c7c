//! Global hotkey support on macOS using rdev
//!
//! rdev installs a global event tap and calls back on the thread that
//! called `listen`, so the listener owns that thread for the whole process.
//! On macOS the tap only fires once Accessibility permission is granted.

use super::{normalize_key_name, HotkeyEvent, HotkeyListener};
use crate::config::HotkeyConfig;
use crate::error::HotkeyError;
use rdev::{listen, Event, EventType, Key};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// A modifier slot: satisfied when any of its keys is held
type ModifierSlot = Vec<Key>;

/// rdev-based hotkey listener
pub struct RdevListener {
    target_key: Key,
    modifiers: Vec<ModifierSlot>,
    running: Arc<AtomicBool>,
}

impl RdevListener {
    pub fn new(config: &HotkeyConfig) -> Result<Self, HotkeyError> {
        let target_key = parse_key_name(&config.key)
            .ok_or_else(|| HotkeyError::UnknownKey(config.key.clone()))?;

        let modifiers = config
            .modifiers
            .iter()
            .map(|m| parse_modifier(m).ok_or_else(|| HotkeyError::UnknownKey(m.clone())))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            target_key,
            modifiers,
            running: Arc::new(AtomicBool::new(false)),
        })
    }
}

#[async_trait::async_trait]
impl HotkeyListener for RdevListener {
    async fn start(&mut self) -> Result<mpsc::Receiver<HotkeyEvent>, HotkeyError> {
        if !check_accessibility_permission() {
            tracing::warn!(
                "Accessibility permission not granted. \
                 Grant access in: System Settings > Privacy & Security > Accessibility"
            );
        }

        let (tx, rx) = mpsc::channel(32);
        let running = self.running.clone();
        running.store(true, Ordering::SeqCst);

        let mut state = ChordState {
            target_key: self.target_key,
            modifiers: self.modifiers.clone(),
            held: Vec::new(),
            is_pressed: false,
        };

        std::thread::Builder::new()
            .name("tasklight-hotkey".into())
            .spawn(move || {
                let callback = move |event: Event| {
                    if !running.load(Ordering::SeqCst) {
                        return;
                    }
                    if let Some(hotkey_event) = state.handle(event.event_type) {
                        let _ = tx.blocking_send(hotkey_event);
                    }
                };

                // Blocks for the rest of the process unless the tap is refused
                if let Err(e) = listen(callback) {
                    tracing::error!("Hotkey registration rejected: {:?}", e);
                    tracing::warn!(
                        "Global hotkey disabled. Use `tasklight toggle` from a system shortcut instead."
                    );
                }
            })
            .map_err(|e| HotkeyError::Registration(format!("cannot spawn listener thread: {}", e)))?;

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), HotkeyError> {
        // rdev cannot unhook from another thread; the callback goes inert instead
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }
}

struct ChordState {
    target_key: Key,
    modifiers: Vec<ModifierSlot>,
    held: Vec<Key>,
    is_pressed: bool,
}

impl ChordState {
    fn handle(&mut self, event: EventType) -> Option<HotkeyEvent> {
        match event {
            EventType::KeyPress(key) => {
                if self.is_modifier(key) && !self.held.contains(&key) {
                    self.held.push(key);
                }
                // The OS delivers auto-repeat as further presses
                if key == self.target_key && !self.is_pressed && self.modifiers_held() {
                    self.is_pressed = true;
                    return Some(HotkeyEvent::Pressed);
                }
                None
            }
            EventType::KeyRelease(key) => {
                self.held.retain(|k| *k != key);
                if key == self.target_key && self.is_pressed {
                    self.is_pressed = false;
                    return Some(HotkeyEvent::Released);
                }
                None
            }
            _ => None,
        }
    }

    fn is_modifier(&self, key: Key) -> bool {
        self.modifiers.iter().any(|slot| slot.contains(&key))
    }

    fn modifiers_held(&self) -> bool {
        self.modifiers
            .iter()
            .all(|slot| slot.iter().any(|k| self.held.contains(k)))
    }
}

fn parse_modifier(name: &str) -> Option<ModifierSlot> {
    let slot = match normalize_key_name(name).as_str() {
        "CTRL" | "CONTROL" => vec![Key::ControlLeft, Key::ControlRight],
        "ALT" | "OPTION" | "OPT" => vec![Key::Alt, Key::AltGr],
        "SHIFT" => vec![Key::ShiftLeft, Key::ShiftRight],
        "META" | "SUPER" | "CMD" | "COMMAND" => vec![Key::MetaLeft, Key::MetaRight],
        _ => vec![parse_key_name(name)?],
    };
    Some(slot)
}

/// Parse a key name string to rdev Key
fn parse_key_name(name: &str) -> Option<Key> {
    let key = match normalize_key_name(name).as_str() {
        // Modifier keys
        "LEFTALT" | "LEFTOPT" | "LEFTOPTION" | "LALT" => Key::Alt,
        "RIGHTALT" | "RIGHTOPT" | "RIGHTOPTION" | "RALT" => Key::AltGr,
        "LEFTCTRL" | "LEFTCONTROL" | "LCTRL" => Key::ControlLeft,
        "RIGHTCTRL" | "RIGHTCONTROL" | "RCTRL" => Key::ControlRight,
        "LEFTSHIFT" | "LSHIFT" => Key::ShiftLeft,
        "RIGHTSHIFT" | "RSHIFT" => Key::ShiftRight,
        "LEFTMETA" | "LEFTCMD" | "LEFTCOMMAND" | "LMETA" => Key::MetaLeft,
        "RIGHTMETA" | "RIGHTCMD" | "RIGHTCOMMAND" | "RMETA" => Key::MetaRight,

        // Special keys
        "SPACE" => Key::Space,
        "ESCAPE" | "ESC" => Key::Escape,
        "TAB" => Key::Tab,
        "ENTER" | "RETURN" => Key::Return,
        "CAPSLOCK" => Key::CapsLock,
        "BACKTICK" | "GRAVE" => Key::BackQuote,
        "SLASH" => Key::Slash,
        "DOT" | "PERIOD" => Key::Dot,
        "INSERT" => Key::Insert,
        "PAUSE" => Key::Pause,
        "SCROLLLOCK" => Key::ScrollLock,

        // Function keys
        "F1" => Key::F1,
        "F2" => Key::F2,
        "F3" => Key::F3,
        "F4" => Key::F4,
        "F5" => Key::F5,
        "F6" => Key::F6,
        "F7" => Key::F7,
        "F8" => Key::F8,
        "F9" => Key::F9,
        "F10" => Key::F10,
        "F11" => Key::F11,
        "F12" => Key::F12,

        // Letters
        "A" => Key::KeyA,
        "B" => Key::KeyB,
        "C" => Key::KeyC,
        "D" => Key::KeyD,
        "E" => Key::KeyE,
        "F" => Key::KeyF,
        "G" => Key::KeyG,
        "H" => Key::KeyH,
        "I" => Key::KeyI,
        "J" => Key::KeyJ,
        "K" => Key::KeyK,
        "L" => Key::KeyL,
        "M" => Key::KeyM,
        "N" => Key::KeyN,
        "O" => Key::KeyO,
        "P" => Key::KeyP,
        "Q" => Key::KeyQ,
        "R" => Key::KeyR,
        "S" => Key::KeyS,
        "T" => Key::KeyT,
        "U" => Key::KeyU,
        "V" => Key::KeyV,
        "W" => Key::KeyW,
        "X" => Key::KeyX,
        "Y" => Key::KeyY,
        "Z" => Key::KeyZ,

        _ => return None,
    };
    Some(key)
}

/// Check if Accessibility permission is granted, prompting the user if not.
///
/// Calls AXIsProcessTrustedWithOptions with kAXTrustedCheckOptionPrompt=true,
/// which makes macOS show the permission dialog the first time.
fn check_accessibility_permission() -> bool {
    #[link(name = "ApplicationServices", kind = "framework")]
    extern "C" {
        fn AXIsProcessTrustedWithOptions(options: core_foundation::base::CFTypeRef) -> bool;
    }

    use core_foundation::base::TCFType;
    use core_foundation::boolean::CFBoolean;
    use core_foundation::dictionary::CFDictionary;
    use core_foundation::string::CFString;

    let key = CFString::new("AXTrustedCheckOptionPrompt");
    let value = CFBoolean::true_value();
    let options = CFDictionary::from_CFType_pairs(&[(key.as_CFType(), value.as_CFType())]);

    unsafe { AXIsProcessTrustedWithOptions(options.as_concrete_TypeRef() as _) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctrl_space() -> ChordState {
        ChordState {
            target_key: Key::Space,
            modifiers: vec![parse_modifier("CTRL").unwrap()],
            held: Vec::new(),
            is_pressed: false,
        }
    }

    #[test]
    fn test_parse_key_name() {
        assert_eq!(parse_key_name("SPACE"), Some(Key::Space));
        assert_eq!(parse_key_name("f1"), Some(Key::F1));
        assert_eq!(parse_key_name("rightoption"), Some(Key::AltGr));
        assert_eq!(parse_key_name("KEY_LEFTCTRL"), Some(Key::ControlLeft));
        assert_eq!(parse_key_name("UNKNOWN"), None);
    }

    #[test]
    fn test_chord_press_and_release() {
        let mut state = ctrl_space();

        assert_eq!(state.handle(EventType::KeyPress(Key::Space)), None);
        assert_eq!(state.handle(EventType::KeyRelease(Key::Space)), None);

        state.handle(EventType::KeyPress(Key::ControlRight));
        assert_eq!(
            state.handle(EventType::KeyPress(Key::Space)),
            Some(HotkeyEvent::Pressed)
        );
        // Auto-repeat
        assert_eq!(state.handle(EventType::KeyPress(Key::Space)), None);
        assert_eq!(
            state.handle(EventType::KeyRelease(Key::Space)),
            Some(HotkeyEvent::Released)
        );
    }
}
