//! Desktop notifications
//!
//! - Linux: notify-send (libnotify)
//! - macOS: osascript (AppleScript)
//!
//! Best-effort: failures are logged at debug and never propagate.

use std::process::{Command, Stdio};

const APP_NAME: &str = "Tasklight";

/// Send a desktop notification and wait for the notifier to exit
///
/// Blocks for as long as the notifier runs, so call it from the blocking
/// pool rather than the event loop.
pub fn send_sync(title: &str, body: &str) {
    #[cfg(target_os = "linux")]
    send_linux(title, body);

    #[cfg(target_os = "macos")]
    send_macos(title, body);

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        tracing::debug!("Notifications not supported on this platform");
        let _ = (title, body);
    }
}

#[cfg(target_os = "linux")]
fn send_linux(title: &str, body: &str) {
    let app_name = format!("--app-name={}", APP_NAME);
    run_notifier(
        "notify-send",
        &[app_name.as_str(), "--expire-time=5000", title, body],
    );
}

#[cfg(target_os = "macos")]
fn send_macos(title: &str, body: &str) {
    let script = format!(
        r#"display notification "{}" with title "{}" subtitle "{}""#,
        applescript_escape(body),
        APP_NAME,
        applescript_escape(title)
    );

    run_notifier("osascript", &["-e", &script]);
}

/// Run a notifier to completion so the child is always reaped
#[cfg_attr(not(any(target_os = "linux", target_os = "macos")), allow(dead_code))]
fn run_notifier(program: &str, args: &[&str]) {
    let result = Command::new(program)
        .args(args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match result {
        Ok(status) if !status.success() => {
            tracing::debug!("{} exited with {}", program, status);
        }
        Ok(_) => {}
        Err(e) => tracing::debug!("Failed to send notification: {}", e),
    }
}

/// Escape a string for use inside an AppleScript string literal
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
fn applescript_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_applescript_escape() {
        assert_eq!(applescript_escape(r#"401 "Unauthorized""#), r#"401 \"Unauthorized\""#);
        assert_eq!(applescript_escape(r"C:\tasks"), r"C:\\tasks");
    }

    /// Children of this process that have exited but were never waited on
    #[cfg(target_os = "linux")]
    fn zombie_children(comm: &str) -> usize {
        let me = std::process::id().to_string();
        let Ok(entries) = std::fs::read_dir("/proc") else {
            return 0;
        };
        entries
            .flatten()
            .filter_map(|entry| std::fs::read_to_string(entry.path().join("stat")).ok())
            .filter(|stat| {
                // "pid (comm) state ppid ..."
                let (Some(open), Some(close)) = (stat.find('('), stat.rfind(')')) else {
                    return false;
                };
                let mut fields = stat[close + 1..].split_whitespace();
                &stat[open + 1..close] == comm
                    && fields.next() == Some("Z")
                    && fields.next() == Some(me.as_str())
            })
            .count()
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_notifier_is_reaped() {
        for _ in 0..5 {
            run_notifier("true", &[]);
        }
        assert_eq!(zombie_children("true"), 0);
    }

    #[test]
    fn test_missing_notifier_is_ignored() {
        run_notifier("tasklight-no-such-notifier", &["title", "body"]);
    }
}
