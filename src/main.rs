//! Tasklight - capture a task with a hotkey and file it in Notion
//!
//! Run with `tasklight` or `tasklight daemon` to start the daemon.
//! Use `tasklight add "call mom on sunday"` to file a single task.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tasklight::cli::{Cli, Commands};
use tasklight::config::{self, Config, DEFAULT_CONFIG};
use tasklight::error::ConfigError;
use tasklight::presenter::{Presenter, UiEvent, WindowCommand};
use tasklight::visibility::VisibilityController;
use tasklight::{daemon, extract, Pipeline};
use tracing_subscriber::EnvFilter;

/// Presenter for one-shot commands: errors go to stderr, there is no window
struct CliPresenter;

impl Presenter for CliPresenter {
    fn emit(&self, event: UiEvent) {
        if let UiEvent::Error(status) = event {
            eprintln!("Task not created: {}", status);
        }
    }

    fn command(&self, command: WindowCommand) {
        tracing::trace!("Ignoring window command {:?}", command);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("tasklight={},warn", log_level))),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load configuration
    let mut config = config::load_config(cli.config.as_deref())?;

    // Apply CLI overrides
    if let Some(model) = cli.model {
        config.extractor.model = model;
    }
    if let Some(hotkey) = cli.hotkey {
        config.hotkey.key = hotkey;
    }
    if cli.no_hotkey {
        config.hotkey.enabled = false;
    }

    // Run the appropriate command
    match cli.command.unwrap_or(Commands::Daemon) {
        Commands::Daemon => {
            let mut daemon = daemon::Daemon::new(config);
            daemon.run().await?;
        }

        Commands::Add { text } => {
            add_task(config, text.join(" ")).await?;
        }

        Commands::Parse { text } => {
            parse_task(config, text.join(" ")).await?;
        }

        Commands::Toggle => {
            send_toggle()?;
        }

        Commands::Config => {
            show_config(&config)?;
        }

        Commands::Setup => {
            run_setup(&config)?;
        }
    }

    Ok(())
}

/// Run one sentence through the full pipeline without the daemon
async fn add_task(config: Config, text: String) -> anyhow::Result<()> {
    config.validate()?;

    let presenter: Arc<dyn Presenter> = Arc::new(CliPresenter);
    let visibility = Arc::new(VisibilityController::new(presenter.clone()));
    let pipeline = Pipeline::from_config(&config, visibility, presenter);

    let outcome = tokio::task::spawn_blocking(move || pipeline.process_message(&text))
        .await
        .context("pipeline task panicked")?;

    if !outcome.is_created() {
        anyhow::bail!("{}", outcome);
    }

    println!("{}", outcome);
    Ok(())
}

/// Show the extracted task as JSON, without creating a page
async fn parse_task(config: Config, text: String) -> anyhow::Result<()> {
    let has_key = config
        .extractor
        .api_key
        .as_deref()
        .is_some_and(|k| !k.trim().is_empty());
    if !has_key {
        return Err(ConfigError::Missing(vec![config::ENV_OPENAI_API_KEY.to_string()]).into());
    }

    let extractor = extract::create_extractor(&config.extractor);
    let task = tokio::task::spawn_blocking(move || extractor.extract(&text))
        .await
        .context("extraction task panicked")??;

    println!("{}", serde_json::to_string_pretty(&task)?);
    Ok(())
}

/// Ask a running daemon to show or hide its input
fn send_toggle() -> anyhow::Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let pid_path = Config::pid_path();
    let contents = std::fs::read_to_string(&pid_path)
        .with_context(|| format!("Daemon not running (no PID file at {:?})", pid_path))?;
    let pid: i32 = contents
        .trim()
        .parse()
        .with_context(|| format!("Invalid PID file {:?}", pid_path))?;

    kill(Pid::from_raw(pid), Signal::SIGUSR1)
        .with_context(|| format!("Failed to signal daemon (pid {})", pid))?;

    tracing::debug!("Sent SIGUSR1 to {}", pid);
    Ok(())
}

fn show_config(config: &Config) -> anyhow::Result<()> {
    println!("Current Configuration\n");
    println!("=====================\n");

    print!("{}", toml::to_string_pretty(&config.redacted())?);

    if let Some(resolved) = config.resolve_state_file() {
        println!("# state_file resolves to: {:?}", resolved);
    }

    println!("\n---");
    println!(
        "Config file: {:?}",
        Config::default_path().unwrap_or_else(|| PathBuf::from("(not found)"))
    );
    println!("Chord: {}", config.hotkey.chord());

    Ok(())
}

fn run_setup(config: &Config) -> anyhow::Result<()> {
    println!("Tasklight Setup\n");
    println!("===============\n");

    // Create default config file if it doesn't exist
    if let Some(config_path) = Config::default_path() {
        if !config_path.exists() {
            println!("Creating default config file...");
            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&config_path, DEFAULT_CONFIG)?;
            println!("  ✓ Created: {:?}", config_path);
        } else {
            println!("  Config file exists: {:?}", config_path);
        }
    }

    let mut all_ok = true;

    println!("\nChecking credentials...");
    match config.validate() {
        Ok(()) => println!(
            "  ✓ {}, {} and {} are set",
            config::ENV_DATABASE_ID,
            config::ENV_NOTION_SECRET,
            config::ENV_OPENAI_API_KEY
        ),
        Err(ConfigError::Missing(names)) => {
            for name in names {
                println!("  ✗ {} is not set", name);
            }
            all_ok = false;
        }
        Err(e) => {
            println!("  ✗ {}", e);
            all_ok = false;
        }
    }

    #[cfg(target_os = "linux")]
    {
        if config.hotkey.enabled && !check_input_group()? {
            all_ok = false;
        }
    }

    println!();
    if all_ok {
        println!("All checks passed. Run 'tasklight' to start.");
    } else {
        println!("Some checks failed. Fix the issues above and run 'tasklight setup' again.");
    }

    Ok(())
}

#[cfg(target_os = "linux")]
fn check_input_group() -> anyhow::Result<bool> {
    println!("\nChecking input group membership...");
    let groups_output = std::process::Command::new("groups").output()?;
    let groups_str = String::from_utf8_lossy(&groups_output.stdout);
    if groups_str.split_whitespace().any(|g| g == "input") {
        println!("  ✓ User is in 'input' group");
        Ok(true)
    } else {
        println!("  ✗ User is NOT in 'input' group");
        println!("    Run: sudo usermod -aG input $USER");
        println!("    Then log out and back in");
        Ok(false)
    }
}
