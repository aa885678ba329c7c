//! evdev-based hotkey listener
//!
//! Uses the Linux evdev interface to detect key presses at the kernel level.
//! This works on all Wayland compositors because it bypasses the display server.
//!
//! The user must be in the 'input' group to access /dev/input/* devices.

use super::{normalize_key_name, HotkeyEvent, HotkeyListener};
use crate::config::HotkeyConfig;
use crate::error::HotkeyError;
use evdev::{Device, InputEventKind, Key};
use std::collections::HashSet;
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// A modifier slot: satisfied when any of its keys is held (e.g. either Ctrl)
type ModifierSlot = Vec<Key>;

/// evdev-based hotkey listener
pub struct EvdevListener {
    /// The key that fires the chord
    target_key: Key,
    /// Modifier slots that must all be held
    modifiers: Vec<ModifierSlot>,
    /// Paths to keyboard devices
    device_paths: Vec<PathBuf>,
    /// Signal to stop the listener thread
    stop_signal: Option<oneshot::Sender<()>>,
}

impl EvdevListener {
    /// Create a new evdev listener for the configured chord
    pub fn new(config: &HotkeyConfig) -> Result<Self, HotkeyError> {
        let target_key = parse_key_name(&config.key)?;

        let modifiers = config
            .modifiers
            .iter()
            .map(|m| parse_modifier(m))
            .collect::<Result<Vec<_>, _>>()?;

        let device_paths = find_keyboard_devices()?;

        if device_paths.is_empty() {
            return Err(HotkeyError::NoKeyboard);
        }

        tracing::debug!(
            "Found {} keyboard device(s): {:?}",
            device_paths.len(),
            device_paths
        );

        Ok(Self {
            target_key,
            modifiers,
            device_paths,
            stop_signal: None,
        })
    }
}

#[async_trait::async_trait]
impl HotkeyListener for EvdevListener {
    async fn start(&mut self) -> Result<mpsc::Receiver<HotkeyEvent>, HotkeyError> {
        let (tx, rx) = mpsc::channel(32);
        let (stop_tx, stop_rx) = oneshot::channel();

        let chord = Chord {
            target_key: self.target_key,
            modifiers: self.modifiers.clone(),
        };
        let device_paths = self.device_paths.clone();

        std::thread::Builder::new()
            .name("tasklight-hotkey".into())
            .spawn(move || listener_loop(device_paths, chord, tx, stop_rx))
            .map_err(|e| HotkeyError::Registration(format!("cannot spawn listener thread: {}", e)))?;

        self.stop_signal = Some(stop_tx);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), HotkeyError> {
        if let Some(stop) = self.stop_signal.take() {
            let _ = stop.send(());
        }
        Ok(())
    }
}

/// The key combination being watched, plus the live modifier state
struct Chord {
    target_key: Key,
    modifiers: Vec<ModifierSlot>,
}

impl Chord {
    fn is_modifier(&self, key: Key) -> bool {
        self.modifiers.iter().any(|slot| slot.contains(&key))
    }

    fn modifiers_held(&self, held: &HashSet<Key>) -> bool {
        self.modifiers
            .iter()
            .all(|slot| slot.iter().any(|k| held.contains(k)))
    }
}

/// Tracks key state across devices and decides which events to emit
#[derive(Default)]
struct ChordState {
    held_modifiers: HashSet<Key>,
    is_pressed: bool,
}

impl ChordState {
    /// Feed one key event (value: 1 = down, 0 = up, 2 = repeat)
    fn handle(&mut self, chord: &Chord, key: Key, value: i32) -> Option<HotkeyEvent> {
        if chord.is_modifier(key) {
            match value {
                1 => {
                    self.held_modifiers.insert(key);
                }
                0 => {
                    self.held_modifiers.remove(&key);
                }
                _ => {}
            }
        }

        if key != chord.target_key {
            return None;
        }

        match value {
            1 if !self.is_pressed && chord.modifiers_held(&self.held_modifiers) => {
                self.is_pressed = true;
                Some(HotkeyEvent::Pressed)
            }
            0 if self.is_pressed => {
                self.is_pressed = false;
                Some(HotkeyEvent::Released)
            }
            // Key repeat, or a press without the modifiers
            _ => None,
        }
    }
}

/// Listener loop, runs on its own thread until stopped or the receiver goes away
fn listener_loop(
    device_paths: Vec<PathBuf>,
    chord: Chord,
    tx: mpsc::Sender<HotkeyEvent>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let mut devices: Vec<Device> = device_paths
        .iter()
        .filter_map(|path| match Device::open(path) {
            Ok(device) => {
                set_nonblocking(&device);
                Some(device)
            }
            Err(e) => {
                tracing::warn!("Failed to open {:?}: {}", path, e);
                None
            }
        })
        .collect();

    if devices.is_empty() {
        tracing::error!("No keyboard devices could be opened, hotkey disabled");
        return;
    }

    let mut state = ChordState::default();

    tracing::info!(
        "Listening for {:?} (with modifiers: {:?})",
        chord.target_key,
        chord.modifiers
    );

    loop {
        match stop_rx.try_recv() {
            Ok(_) | Err(oneshot::error::TryRecvError::Closed) => {
                tracing::debug!("Hotkey listener stopping");
                return;
            }
            Err(oneshot::error::TryRecvError::Empty) => {}
        }

        for device in &mut devices {
            let Ok(events) = device.fetch_events() else {
                continue;
            };
            for event in events {
                let InputEventKind::Key(key) = event.kind() else {
                    continue;
                };
                if let Some(hotkey_event) = state.handle(&chord, key, event.value()) {
                    tracing::debug!("Hotkey {:?}", hotkey_event);
                    if tx.blocking_send(hotkey_event).is_err() {
                        return; // Channel closed
                    }
                }
            }
        }

        // Small sleep to avoid busy-waiting
        std::thread::sleep(Duration::from_millis(5));
    }
}

/// Put the device fd in non-blocking mode so fetch_events returns immediately
fn set_nonblocking(device: &Device) {
    let fd = device.as_raw_fd();
    // SAFETY: fd is a valid descriptor owned by `device` for the duration of the call
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL);
        if flags != -1 {
            libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
        }
    }
}

/// Find all keyboard input devices
fn find_keyboard_devices() -> Result<Vec<PathBuf>, HotkeyError> {
    let mut keyboards = Vec::new();

    let input_dir = std::fs::read_dir("/dev/input")
        .map_err(|e| HotkeyError::DeviceAccess(format!("/dev/input: {}", e)))?;

    for entry in input_dir {
        let entry = entry.map_err(|e| HotkeyError::DeviceAccess(e.to_string()))?;
        let path = entry.path();

        let is_event_device = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("event"));

        if !is_event_device {
            continue;
        }

        match Device::open(&path) {
            Ok(device) => {
                // A keyboard should have at least some letter keys
                let is_keyboard = device.supported_keys().is_some_and(|keys| {
                    keys.contains(Key::KEY_A)
                        && keys.contains(Key::KEY_Z)
                        && keys.contains(Key::KEY_ENTER)
                });

                if is_keyboard {
                    tracing::debug!(
                        "Found keyboard: {:?} ({:?})",
                        path,
                        device.name().unwrap_or("unknown")
                    );
                    keyboards.push(path);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                return Err(HotkeyError::DeviceAccess(path.display().to_string()));
            }
            Err(e) => {
                tracing::trace!("Skipping {:?}: {}", path, e);
            }
        }
    }

    Ok(keyboards)
}

/// Parse a modifier name; generic names cover both sides of the keyboard
fn parse_modifier(name: &str) -> Result<ModifierSlot, HotkeyError> {
    let slot = match normalize_key_name(name).as_str() {
        "CTRL" | "CONTROL" => vec![Key::KEY_LEFTCTRL, Key::KEY_RIGHTCTRL],
        "ALT" => vec![Key::KEY_LEFTALT, Key::KEY_RIGHTALT],
        "SHIFT" => vec![Key::KEY_LEFTSHIFT, Key::KEY_RIGHTSHIFT],
        "META" | "SUPER" | "CMD" => vec![Key::KEY_LEFTMETA, Key::KEY_RIGHTMETA],
        _ => vec![parse_key_name(name)?],
    };
    Ok(slot)
}

/// Parse a key name string to evdev Key
fn parse_key_name(name: &str) -> Result<Key, HotkeyError> {
    let key = match normalize_key_name(name).as_str() {
        // Modifier keys
        "LEFTCTRL" | "LCTRL" => Key::KEY_LEFTCTRL,
        "RIGHTCTRL" | "RCTRL" => Key::KEY_RIGHTCTRL,
        "LEFTALT" | "LALT" => Key::KEY_LEFTALT,
        "RIGHTALT" | "RALT" => Key::KEY_RIGHTALT,
        "LEFTSHIFT" | "LSHIFT" => Key::KEY_LEFTSHIFT,
        "RIGHTSHIFT" | "RSHIFT" => Key::KEY_RIGHTSHIFT,
        "LEFTMETA" | "LMETA" | "SUPER" => Key::KEY_LEFTMETA,
        "RIGHTMETA" | "RMETA" => Key::KEY_RIGHTMETA,

        // Common chord keys
        "SPACE" => Key::KEY_SPACE,
        "ENTER" | "RETURN" => Key::KEY_ENTER,
        "TAB" => Key::KEY_TAB,
        "ESC" | "ESCAPE" => Key::KEY_ESC,
        "GRAVE" | "BACKTICK" => Key::KEY_GRAVE,
        "SLASH" => Key::KEY_SLASH,
        "DOT" | "PERIOD" => Key::KEY_DOT,

        // Lock keys
        "SCROLLLOCK" => Key::KEY_SCROLLLOCK,
        "PAUSE" => Key::KEY_PAUSE,
        "CAPSLOCK" => Key::KEY_CAPSLOCK,
        "INSERT" => Key::KEY_INSERT,

        // Function keys (F13-F24 are often unused and make good hotkeys)
        "F1" => Key::KEY_F1,
        "F2" => Key::KEY_F2,
        "F3" => Key::KEY_F3,
        "F4" => Key::KEY_F4,
        "F5" => Key::KEY_F5,
        "F6" => Key::KEY_F6,
        "F7" => Key::KEY_F7,
        "F8" => Key::KEY_F8,
        "F9" => Key::KEY_F9,
        "F10" => Key::KEY_F10,
        "F11" => Key::KEY_F11,
        "F12" => Key::KEY_F12,
        "F13" => Key::KEY_F13,
        "F14" => Key::KEY_F14,
        "F15" => Key::KEY_F15,
        "F16" => Key::KEY_F16,
        "F17" => Key::KEY_F17,
        "F18" => Key::KEY_F18,
        "F19" => Key::KEY_F19,
        "F20" => Key::KEY_F20,
        "F21" => Key::KEY_F21,
        "F22" => Key::KEY_F22,
        "F23" => Key::KEY_F23,
        "F24" => Key::KEY_F24,

        // Letters
        "A" => Key::KEY_A,
        "B" => Key::KEY_B,
        "C" => Key::KEY_C,
        "D" => Key::KEY_D,
        "E" => Key::KEY_E,
        "F" => Key::KEY_F,
        "G" => Key::KEY_G,
        "H" => Key::KEY_H,
        "I" => Key::KEY_I,
        "J" => Key::KEY_J,
        "K" => Key::KEY_K,
        "L" => Key::KEY_L,
        "M" => Key::KEY_M,
        "N" => Key::KEY_N,
        "O" => Key::KEY_O,
        "P" => Key::KEY_P,
        "Q" => Key::KEY_Q,
        "R" => Key::KEY_R,
        "S" => Key::KEY_S,
        "T" => Key::KEY_T,
        "U" => Key::KEY_U,
        "V" => Key::KEY_V,
        "W" => Key::KEY_W,
        "X" => Key::KEY_X,
        "Y" => Key::KEY_Y,
        "Z" => Key::KEY_Z,

        _ => {
            return Err(HotkeyError::UnknownKey(format!(
                "{}. Try: SPACE, F13-F24, a letter, or run 'evtest' to find key names",
                name
            )));
        }
    };

    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctrl_space() -> Chord {
        Chord {
            target_key: Key::KEY_SPACE,
            modifiers: vec![parse_modifier("CTRL").unwrap()],
        }
    }

    #[test]
    fn test_parse_key_name() {
        assert_eq!(parse_key_name("SPACE").unwrap(), Key::KEY_SPACE);
        assert_eq!(parse_key_name("space").unwrap(), Key::KEY_SPACE);
        assert_eq!(parse_key_name("KEY_SPACE").unwrap(), Key::KEY_SPACE);
        assert_eq!(parse_key_name("F13").unwrap(), Key::KEY_F13);
        assert_eq!(parse_key_name("LCTRL").unwrap(), Key::KEY_LEFTCTRL);
        assert_eq!(parse_key_name("t").unwrap(), Key::KEY_T);
    }

    #[test]
    fn test_parse_key_name_error() {
        assert!(parse_key_name("INVALID_KEY_NAME").is_err());
    }

    #[test]
    fn test_parse_modifier_generic_and_specific() {
        assert_eq!(
            parse_modifier("ctrl").unwrap(),
            vec![Key::KEY_LEFTCTRL, Key::KEY_RIGHTCTRL]
        );
        assert_eq!(parse_modifier("LEFTCTRL").unwrap(), vec![Key::KEY_LEFTCTRL]);
        assert!(parse_modifier("HYPERSPACE").is_err());
    }

    #[test]
    fn test_chord_requires_modifier() {
        let chord = ctrl_space();
        let mut state = ChordState::default();

        assert_eq!(state.handle(&chord, Key::KEY_SPACE, 1), None);
        assert_eq!(state.handle(&chord, Key::KEY_SPACE, 0), None);

        assert_eq!(state.handle(&chord, Key::KEY_RIGHTCTRL, 1), None);
        assert_eq!(
            state.handle(&chord, Key::KEY_SPACE, 1),
            Some(HotkeyEvent::Pressed)
        );
    }

    #[test]
    fn test_repeat_is_ignored_and_release_reported() {
        let chord = ctrl_space();
        let mut state = ChordState::default();

        state.handle(&chord, Key::KEY_LEFTCTRL, 1);
        assert_eq!(
            state.handle(&chord, Key::KEY_SPACE, 1),
            Some(HotkeyEvent::Pressed)
        );
        assert_eq!(state.handle(&chord, Key::KEY_SPACE, 2), None);
        assert_eq!(state.handle(&chord, Key::KEY_SPACE, 1), None);

        // Release counts even if the modifier was let go first
        state.handle(&chord, Key::KEY_LEFTCTRL, 0);
        assert_eq!(
            state.handle(&chord, Key::KEY_SPACE, 0),
            Some(HotkeyEvent::Released)
        );
    }

    #[test]
    fn test_default_chord_accepts_either_ctrl() {
        let config = HotkeyConfig::default();
        let chord = Chord {
            target_key: parse_key_name(&config.key).unwrap(),
            modifiers: config
                .modifiers
                .iter()
                .map(|m| parse_modifier(m).unwrap())
                .collect(),
        };

        for ctrl in [Key::KEY_LEFTCTRL, Key::KEY_RIGHTCTRL] {
            let mut state = ChordState::default();
            state.handle(&chord, ctrl, 1);
            assert_eq!(
                state.handle(&chord, Key::KEY_SPACE, 1),
                Some(HotkeyEvent::Pressed),
                "{:?}+SPACE",
                ctrl
            );
        }
    }

    #[test]
    fn test_chord_without_modifiers() {
        let chord = Chord {
            target_key: Key::KEY_F13,
            modifiers: vec![],
        };
        let mut state = ChordState::default();
        assert_eq!(state.handle(&chord, Key::KEY_F13, 1), Some(HotkeyEvent::Pressed));
        assert_eq!(state.handle(&chord, Key::KEY_F13, 0), Some(HotkeyEvent::Released));
    }
}
