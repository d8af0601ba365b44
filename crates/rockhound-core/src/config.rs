//! Configuration loading and typed config structures for RockHound.
//!
//! The canonical configuration lives in `rockhound-config.yaml` at the
//! project root. Every field has a default, so a partial file (or no file
//! at all) yields a working setup.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration. Mirrors `rockhound-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GameConfig {
    /// Gameplay settings.
    #[serde(default)]
    pub game: GameSettings,

    /// Assistant backend settings.
    #[serde(default)]
    pub assistant: AssistantConfig,

    /// Where game state is kept.
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// HTTP listener.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GameConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values for secrets and
    /// deployment settings:
    /// - `ROCKHOUND_API_KEY` overrides `assistant.api_key`
    /// - `ROCKHOUND_API_URL` overrides `assistant.api_url`
    /// - `ROCKHOUND_MODEL` overrides `assistant.model`
    /// - `ROCKHOUND_STATE_PATH` overrides `persistence.state_path`
    /// - `ROCKHOUND_HOST` overrides `server.host`
    /// - `ROCKHOUND_PORT` overrides `server.port`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Like [`from_file`](Self::from_file), but a missing file yields the
    /// defaults (with environment overrides applied).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for unreadable or invalid files.
    pub fn from_file_or_default(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let mut config = Self::default();
                config.apply_env_overrides();
                Ok(config)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `ROCKHOUND_*` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("ROCKHOUND_API_KEY") {
            self.assistant.api_key = Some(val);
        }
        if let Some(val) = lookup("ROCKHOUND_API_URL") {
            self.assistant.api_url = val;
        }
        if let Some(val) = lookup("ROCKHOUND_MODEL") {
            self.assistant.model = val;
        }
        if let Some(val) = lookup("ROCKHOUND_STATE_PATH") {
            self.persistence.state_path = PathBuf::from(val);
        }
        if let Some(val) = lookup("ROCKHOUND_HOST") {
            self.server.host = val;
        }
        if let Some(port) = lookup("ROCKHOUND_PORT").and_then(|val| val.parse().ok()) {
            self.server.port = port;
        }
    }
}

// ---------------------------------------------------------------------------
// Game
// ---------------------------------------------------------------------------

/// Gameplay settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GameSettings {
    /// Chat and challenge turns fail without a location fix.
    #[serde(default = "default_true")]
    pub require_location: bool,

    /// First assistant message of every session.
    #[serde(default = "default_welcome_message")]
    pub welcome_message: String,

    /// Seed the counterpart inventory and listings on a fresh state.
    #[serde(default = "default_true")]
    pub seed_catalog: bool,

    /// Capacity of the outbound event channel.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            require_location: true,
            welcome_message: default_welcome_message(),
            seed_catalog: true,
            event_capacity: default_event_capacity(),
        }
    }
}

const fn default_true() -> bool {
    true
}

fn default_welcome_message() -> String {
    "Welcome to RockHound-GO! I'm your Personal AI Rockhound Assistant. Use the camera \
     button on the 'Identify' screen to take or upload a photo of a specimen. Let's see \
     what you've got!"
        .to_owned()
}

const fn default_event_capacity() -> usize {
    256
}

// ---------------------------------------------------------------------------
// Assistant
// ---------------------------------------------------------------------------

/// Which wire dialect the assistant backend speaks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// OpenAI-compatible chat completions.
    #[default]
    #[serde(rename = "openai", alias = "open_ai")]
    OpenAi,
    /// Anthropic Messages API.
    Anthropic,
}

/// Assistant backend settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AssistantConfig {
    /// Wire dialect.
    #[serde(default)]
    pub backend: BackendKind,

    /// Endpoint URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// API key. Usually supplied through `ROCKHOUND_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model name.
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Reply length cap.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Directory holding the prompt templates.
    #[serde(default = "default_templates_dir")]
    pub templates_dir: PathBuf,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            api_url: default_api_url(),
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            templates_dir: default_templates_dir(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".to_owned()
}

fn default_model() -> String {
    "gpt-4o-mini".to_owned()
}

const fn default_temperature() -> f32 {
    0.7
}

const fn default_max_tokens() -> u32 {
    1024
}

fn default_templates_dir() -> PathBuf {
    PathBuf::from("templates")
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// Storage backend selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistenceBackend {
    /// JSON file at `state_path`.
    #[default]
    Json,
    /// Nothing survives a restart.
    Memory,
}

/// Where game state is kept.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PersistenceConfig {
    /// Storage backend.
    #[serde(default)]
    pub backend: PersistenceBackend,

    /// State file for the JSON backend.
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backend: PersistenceBackend::default(),
            state_path: default_state_path(),
        }
    }
}

fn default_state_path() -> PathBuf {
    PathBuf::from("data/rockhound-state.json")
}

// ---------------------------------------------------------------------------
// Server and logging
// ---------------------------------------------------------------------------

/// HTTP listener.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_owned()
}

const fn default_port() -> u16 {
    8080
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_owned()
}
