//! Daemon module - main event loop orchestration
//!
//! Coordinates the hotkey listener, the input surface, and the
//! extraction/submission pipeline.

use crate::config::Config;
use crate::error::Result;
use crate::hotkey::{self, HotkeyEvent, HotkeyListener};
use crate::pipeline::{Pipeline, PipelineOutcome};
use crate::presenter::{DesktopPresenter, Presenter, UiEvent};
use crate::visibility::VisibilityController;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;

/// Write PID file for external control via signals
fn write_pid_file() -> Option<PathBuf> {
    let pid_path = Config::pid_path();

    // Ensure parent directory exists
    if let Some(parent) = pid_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!("Failed to create PID file directory: {}", e);
            return None;
        }
    }

    let pid = std::process::id();
    if let Err(e) = std::fs::write(&pid_path, pid.to_string()) {
        tracing::warn!("Failed to write PID file: {}", e);
        return None;
    }

    tracing::debug!("PID file written: {:?} (pid={})", pid_path, pid);
    Some(pid_path)
}

fn cleanup_pid_file(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            tracing::warn!("Failed to remove PID file: {}", e);
        }
    }
}

/// Run submissions one at a time, in arrival order, off the event loop
///
/// Each sentence is processed on the blocking pool; the next one is not
/// started until the previous outcome has been delivered.
pub fn spawn_pipeline_worker(
    pipeline: Arc<Pipeline>,
) -> (
    mpsc::UnboundedSender<String>,
    mpsc::UnboundedReceiver<PipelineOutcome>,
) {
    let (text_tx, mut text_rx) = mpsc::unbounded_channel::<String>();
    let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Some(text) = text_rx.recv().await {
            let pipeline = pipeline.clone();
            let outcome =
                match tokio::task::spawn_blocking(move || pipeline.process_message(&text)).await {
                    Ok(outcome) => outcome,
                    Err(e) => PipelineOutcome::Failed {
                        error: format!("Pipeline task panicked: {}", e),
                    },
                };
            if outcome_tx.send(outcome).is_err() {
                break;
            }
        }
        tracing::debug!("Pipeline worker stopped");
    });

    (text_tx, outcome_rx)
}

/// React to the global hotkey
///
/// Key-down reports the press to the surface and flips visibility.
/// Key-up changes nothing.
fn handle_hotkey(event: HotkeyEvent, presenter: &dyn Presenter, visibility: &VisibilityController) {
    match event {
        HotkeyEvent::Pressed => {
            let at = chrono::Local::now().to_rfc3339();
            presenter.emit(UiEvent::GlobalHotkey(at));
            visibility.toggle();
        }
        HotkeyEvent::Released => {
            tracing::trace!("Hotkey released");
        }
    }
}

/// Start the global hotkey, or explain why there is none
///
/// Registration failure is not fatal: the daemon keeps running and can
/// still be toggled with `tasklight toggle`.
async fn start_hotkey(
    config: &Config,
) -> Option<(Box<dyn HotkeyListener>, mpsc::Receiver<HotkeyEvent>)> {
    if !config.hotkey.enabled {
        tracing::info!("Built-in hotkey disabled, use 'tasklight toggle' or a compositor keybinding");
        return None;
    }

    let mut listener = match hotkey::create_listener(&config.hotkey) {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to register hotkey {}: {}", config.hotkey.chord(), e);
            return None;
        }
    };

    match listener.start().await {
        Ok(rx) => {
            tracing::info!("Listening for hotkey: {}", config.hotkey.chord());
            Some((listener, rx))
        }
        Err(e) => {
            tracing::error!("Failed to start hotkey listener: {}", e);
            None
        }
    }
}

/// Main daemon that owns the input surface for the life of the process
pub struct Daemon {
    config: Config,
    pid_file_path: Option<PathBuf>,
}

impl Daemon {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            pid_file_path: None,
        }
    }

    /// Run the daemon main loop
    pub async fn run(&mut self) -> Result<()> {
        tracing::info!("Starting tasklight daemon");

        // Refuse to start without credentials rather than fail on first use
        self.config.validate()?;

        self.pid_file_path = write_pid_file();

        // Set up signal handlers for external control
        let mut sigusr1 = signal(SignalKind::user_defined1())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        let presenter = Arc::new(DesktopPresenter::new(&self.config));
        let visibility = Arc::new(VisibilityController::new(presenter.clone()));
        let pipeline = Arc::new(Pipeline::from_config(
            &self.config,
            visibility.clone(),
            presenter.clone(),
        ));

        if let Some(path) = self.config.resolve_state_file() {
            tracing::info!("State file: {:?}", path);
        }
        tracing::info!(
            "Extraction model: {} ({})",
            self.config.extractor.model,
            self.config.extractor.endpoint
        );

        let (submit_tx, mut outcome_rx) = spawn_pipeline_worker(pipeline);

        let (mut hotkey_listener, mut hotkey_rx) = match start_hotkey(&self.config).await {
            Some((listener, rx)) => (Some(listener), Some(rx)),
            None => (None, None),
        };

        let mut stdin_lines = Some(BufReader::new(tokio::io::stdin()).lines());

        // Show the input surface
        visibility.announce();

        loop {
            tokio::select! {
                // Handle hotkey events (only if a listener is running)
                Some(hotkey_event) = async {
                    match &mut hotkey_rx {
                        Some(rx) => rx.recv().await,
                        None => std::future::pending().await,
                    }
                } => {
                    handle_hotkey(hotkey_event, presenter.as_ref(), &visibility);
                }

                // Typed sentences from the input surface
                line = async {
                    match &mut stdin_lines {
                        Some(lines) => lines.next_line().await,
                        None => std::future::pending().await,
                    }
                } => {
                    match line {
                        Ok(Some(text)) => {
                            let text = text.trim();
                            if text.is_empty() {
                                continue;
                            }
                            if !visibility.is_visible() {
                                tracing::debug!("Input hidden, ignoring typed line");
                                continue;
                            }
                            if submit_tx.send(text.to_string()).is_err() {
                                tracing::error!("Pipeline worker is gone");
                                break;
                            }
                        }
                        Ok(None) => {
                            tracing::debug!("stdin closed, typed input disabled");
                            stdin_lines = None;
                        }
                        Err(e) => {
                            tracing::warn!("Failed to read stdin: {}", e);
                            stdin_lines = None;
                        }
                    }
                }

                Some(outcome) = outcome_rx.recv() => {
                    tracing::debug!("{}", outcome);
                }

                // Handle SIGUSR1 - toggle the input surface (for compositor keybindings)
                _ = sigusr1.recv() => {
                    tracing::debug!("Received SIGUSR1 (toggle)");
                    visibility.toggle();
                }

                // Handle graceful shutdown (SIGINT from Ctrl+C)
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received SIGINT, shutting down...");
                    break;
                }

                // Handle graceful shutdown (SIGTERM from systemctl stop)
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, shutting down...");
                    break;
                }
            }
        }

        // Cleanup
        if let Some(ref mut listener) = hotkey_listener {
            if let Err(e) = listener.stop().await {
                tracing::warn!("Failed to stop hotkey listener: {}", e);
            }
        }

        presenter.cleanup();

        if let Some(ref path) = self.pid_file_path {
            cleanup_pid_file(path);
        }

        tracing::info!("Daemon stopped");

        Ok(())
    }
}
