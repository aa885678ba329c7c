// Command-line interface definitions for tasklight
//
// This module is separate so it can be used by both the binary (main.rs)
// and build.rs for generating man pages.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tasklight")]
#[command(author, version, about = "Capture a task with a hotkey and file it in Notion")]
#[command(long_about = "
Tasklight turns a sentence like \"call the dentist next friday\" into a
Notion database page with a title and due date.

Press the hotkey to show the input, type a sentence, press Enter.
A language model extracts the title and date, the task is created in
Notion, and the input hides again. Failures are reported as desktop
notifications and the input stays open.

SETUP:
  1. Set NOTION_DB_ID, NOTION_SECRET and OPENAI_API_KEY
     (environment, ~/.config/tasklight/.env, or config.toml)
  2. Linux: add yourself to the input group: sudo usermod -aG input $USER
  3. Run: tasklight setup (to check the above)
  4. Run: tasklight (to start the daemon)

USAGE:
  Ctrl+Space (default) shows or hides the input.
  `tasklight add <sentence>` files a task without the daemon.
")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<std::path::PathBuf>,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Override hotkey key (e.g., SPACE, F13, T)
    #[arg(long, value_name = "KEY")]
    pub hotkey: Option<String>,

    /// Override the extraction model (e.g., gpt-4o-mini)
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Don't register the global hotkey
    #[arg(long)]
    pub no_hotkey: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run as daemon (default if no command specified)
    Daemon,

    /// Extract and create a single task, then exit
    Add {
        /// The sentence describing the task
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Show what would be extracted from a sentence, without creating anything
    Parse {
        /// The sentence describing the task
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Show or hide the input of a running daemon (sends SIGUSR1)
    Toggle,

    /// Show current configuration (secrets masked)
    Config,

    /// Check credentials and permissions, write a default config if none exists
    Setup,
}
