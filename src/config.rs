//! Configuration loading and types for tasklight
//!
//! Configuration is loaded in layers:
//! 1. Built-in defaults
//! 2. Config file (~/.config/tasklight/config.toml)
//! 3. A `.env` file (./.env, then ~/.config/tasklight/.env)
//! 4. Environment variables (NOTION_DB_ID, NOTION_SECRET, OPENAI_API_KEY, TASKLIGHT_*)
//! 5. CLI arguments (highest priority, applied in main)
//!
//! The resulting [`Config`] is built once at startup and handed by reference
//! to every component constructor. Nothing reads it through a global.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Environment variable holding the target Notion database id
pub const ENV_DATABASE_ID: &str = "NOTION_DB_ID";
/// Environment variable holding the Notion integration secret
pub const ENV_NOTION_SECRET: &str = "NOTION_SECRET";
/// Environment variable holding the extraction service key
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";

/// Default configuration file content
pub const DEFAULT_CONFIG: &str = r#"# Tasklight Configuration
#
# Location: ~/.config/tasklight/config.toml
# Credentials are usually easier to keep in the environment or a .env file:
#   NOTION_DB_ID, NOTION_SECRET, OPENAI_API_KEY

# State file for external integrations (Waybar, scripts, etc.)
# Use "auto" for default location ($XDG_RUNTIME_DIR/tasklight/state),
# a custom path, or "disabled" to turn off. The daemon writes
# "visible" or "hidden" to this file whenever the input surface changes.
state_file = "auto"

[hotkey]
# Key that shows/hides the input surface
# Use `evtest` to find key names for your keyboard
key = "SPACE"

# Modifier keys that must also be held
# CTRL, ALT, SHIFT and META match either side; LEFTCTRL etc. pick one
modifiers = ["CTRL"]

# Enable built-in hotkey detection (default: true)
# Set to false when using compositor keybindings with `tasklight toggle`
# enabled = true

[extractor]
# OpenAI-compatible chat completions endpoint (base URL)
endpoint = "https://api.openai.com"
model = "gpt-4o-mini"
timeout_secs = 30
# api_key = "sk-..."

[notion]
endpoint = "https://api.notion.com"
version = "2022-06-28"
timeout_secs = 30
# database_id = "..."
# secret = "secret_..."

[notification]
# Desktop notification when a task could not be created
on_error = true
"#;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Optional path to state file for external integrations (e.g., Waybar)
    /// When set, the daemon writes current visibility ("visible", "hidden")
    /// to this file whenever it changes.
    #[serde(default = "default_state_file")]
    pub state_file: Option<String>,

    #[serde(default)]
    pub hotkey: HotkeyConfig,

    #[serde(default)]
    pub extractor: ExtractorConfig,

    #[serde(default)]
    pub notion: NotionConfig,

    #[serde(default)]
    pub notification: NotificationConfig,
}

/// Hotkey detection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HotkeyConfig {
    /// Key name (evdev KEY_* constant name, without the KEY_ prefix)
    #[serde(default = "default_hotkey_key")]
    pub key: String,

    /// Modifier keys that must also be held
    #[serde(default = "default_hotkey_modifiers")]
    pub modifiers: Vec<String>,

    /// Enable built-in hotkey detection (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Extraction service (LLM) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtractorConfig {
    /// Base URL of an OpenAI-compatible API
    #[serde(default = "default_extractor_endpoint")]
    pub endpoint: String,

    /// Chat model name
    #[serde(default = "default_extractor_model")]
    pub model: String,

    /// Credential for the extraction service
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Notion page-creation configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotionConfig {
    /// Base URL of the Notion API
    #[serde(default = "default_notion_endpoint")]
    pub endpoint: String,

    /// Value sent in the `Notion-Version` header
    #[serde(default = "default_notion_version")]
    pub version: String,

    /// Target database identifier
    #[serde(default)]
    pub database_id: Option<String>,

    /// Bearer credential for the integration
    #[serde(default)]
    pub secret: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Desktop notification configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationConfig {
    /// Notify when a task could not be created
    #[serde(default = "default_true")]
    pub on_error: bool,
}

fn default_hotkey_key() -> String {
    "SPACE".to_string()
}

fn default_hotkey_modifiers() -> Vec<String> {
    vec!["CTRL".to_string()]
}

fn default_extractor_endpoint() -> String {
    "https://api.openai.com".to_string()
}

fn default_extractor_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_notion_endpoint() -> String {
    "https://api.notion.com".to_string()
}

fn default_notion_version() -> String {
    "2022-06-28".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_state_file() -> Option<String> {
    Some("auto".to_string())
}

fn default_true() -> bool {
    true
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            key: default_hotkey_key(),
            modifiers: default_hotkey_modifiers(),
            enabled: true,
        }
    }
}

impl HotkeyConfig {
    /// Human-readable chord, e.g. "CTRL+SPACE"
    pub fn chord(&self) -> String {
        self.modifiers
            .iter()
            .chain(std::iter::once(&self.key))
            .map(|k| k.to_uppercase())
            .collect::<Vec<_>>()
            .join("+")
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            endpoint: default_extractor_endpoint(),
            model: default_extractor_model(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for NotionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_notion_endpoint(),
            version: default_notion_version(),
            database_id: None,
            secret: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { on_error: true }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hotkey: HotkeyConfig::default(),
            extractor: ExtractorConfig::default(),
            notion: NotionConfig::default(),
            notification: NotificationConfig::default(),
            state_file: default_state_file(),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Get the config directory path
    pub fn config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "tasklight")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the runtime directory for ephemeral files (state, pid)
    pub fn runtime_dir() -> PathBuf {
        // Use XDG_RUNTIME_DIR if available, otherwise fall back to /tmp
        std::env::var("XDG_RUNTIME_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
            .join("tasklight")
    }

    /// Path of the PID file used by `tasklight toggle`
    pub fn pid_path() -> PathBuf {
        Self::runtime_dir().join("pid")
    }

    /// Resolve the state file path from config
    /// Returns None if state_file is not configured or explicitly disabled
    pub fn resolve_state_file(&self) -> Option<PathBuf> {
        self.state_file
            .as_ref()
            .and_then(|path| match path.to_lowercase().as_str() {
                "disabled" | "none" | "off" | "false" => None,
                "auto" => Some(Self::runtime_dir().join("state")),
                _ => Some(PathBuf::from(path)),
            })
    }

    /// Check that every credential the pipeline needs is present
    ///
    /// All missing settings are reported together, named by the environment
    /// variable that would supply them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();

        if is_blank(&self.notion.database_id) {
            missing.push(ENV_DATABASE_ID.to_string());
        }
        if is_blank(&self.notion.secret) {
            missing.push(ENV_NOTION_SECRET.to_string());
        }
        if is_blank(&self.extractor.api_key) {
            missing.push(ENV_OPENAI_API_KEY.to_string());
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Missing(missing))
        }
    }

    /// Copy of the config with credentials masked, for display
    pub fn redacted(&self) -> Config {
        let mut copy = self.clone();
        copy.extractor.api_key = copy.extractor.api_key.as_deref().map(mask_secret);
        copy.notion.secret = copy.notion.secret.as_deref().map(mask_secret);
        copy
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).unwrap_or("").is_empty()
}

/// Keep a short prefix so the user can tell which key is loaded
pub fn mask_secret(secret: &str) -> String {
    if secret.chars().count() <= 8 {
        return "****".to_string();
    }
    let prefix: String = secret.chars().take(4).collect();
    format!("{}****", prefix)
}

/// Load configuration from file, `.env` and environment, with defaults for missing values
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut config = read_config_file(path)?;

    let mut dotenv_paths = vec![PathBuf::from(".env")];
    if let Some(dir) = Config::config_dir() {
        dotenv_paths.push(dir.join(".env"));
    }
    let dotenv = read_dotenv(&dotenv_paths);

    apply_env(&mut config, |name| {
        std::env::var(name)
            .ok()
            .or_else(|| dotenv.get(name).cloned())
    });

    Ok(config)
}

/// Defaults overlaid with the TOML file, if there is one
fn read_config_file(path: Option<&Path>) -> Result<Config, ConfigError> {
    // Start with defaults
    let mut config = Config::default();

    // Determine config file path
    let config_path = path.map(PathBuf::from).or_else(Config::default_path);

    // Load from file if it exists
    if let Some(ref path) = config_path {
        if path.exists() {
            tracing::debug!("Loading config from {:?}", path);
            let contents = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::Read(format!("{}: {}", path.display(), e)))?;

            config = toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        } else {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
        }
    }

    Ok(config)
}

/// Read the first `.env` file found into a map without touching the process environment
fn read_dotenv(paths: &[PathBuf]) -> HashMap<String, String> {
    let mut values = HashMap::new();

    let Some(path) = paths.iter().find(|p| p.is_file()) else {
        return values;
    };

    match dotenvy::from_path_iter(path) {
        Ok(iter) => {
            for item in iter {
                match item {
                    Ok((key, value)) => {
                        values.insert(key, value);
                    }
                    Err(e) => tracing::warn!("Skipping malformed line in {:?}: {}", path, e),
                }
            }
            tracing::debug!("Loaded {} value(s) from {:?}", values.len(), path);
        }
        Err(e) => tracing::warn!("Failed to read {:?}: {}", path, e),
    }

    values
}

/// Override config values from a variable lookup (process env, then `.env`)
fn apply_env(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(id) = lookup(ENV_DATABASE_ID) {
        config.notion.database_id = Some(id);
    }
    if let Some(secret) = lookup(ENV_NOTION_SECRET) {
        config.notion.secret = Some(secret);
    }
    if let Some(key) = lookup(ENV_OPENAI_API_KEY) {
        config.extractor.api_key = Some(key);
    }
    if let Some(key) = lookup("TASKLIGHT_HOTKEY") {
        config.hotkey.key = key;
    }
    if let Some(model) = lookup("TASKLIGHT_MODEL") {
        config.extractor.model = model;
    }
}
