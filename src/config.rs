//! Service configuration.

use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_setters::Setters;
use gridguess_rules::{Difficulty, PlayMode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Environment variable naming the config file when `--config` is not given.
pub const CONFIG_ENV: &str = "GRIDGUESS_CONFIG";

/// Configuration for the game service.
#[derive(Debug, Clone, PartialEq, Getters, Setters, Serialize, Deserialize)]
#[setters(prefix = "with_")]
pub struct ServiceConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    db_path: String,

    /// Language used for new games when none is requested.
    #[serde(default = "default_language")]
    default_language: String,

    /// Play mode for new games.
    #[serde(default)]
    play_mode: PlayMode,

    /// Maximum number of languages the entity catalog keeps loaded.
    #[serde(default = "default_catalog_capacity")]
    catalog_capacity: usize,

    /// Restrict setup selection to this difficulty.
    #[serde(default)]
    #[setters(strip_option)]
    difficulty: Option<Difficulty>,
}

#[instrument]
fn default_db_path() -> String {
    "gridguess.db".to_string()
}

#[instrument]
fn default_language() -> String {
    "en".to_string()
}

#[instrument]
fn default_catalog_capacity() -> usize {
    4
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            default_language: default_language(),
            play_mode: PlayMode::default(),
            catalog_capacity: default_catalog_capacity(),
            difficulty: None,
        }
    }
}

impl ServiceConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or if
    /// a value is out of range.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config = Self::from_toml(&content)?;
        info!(db_path = %config.db_path, play_mode = %config.play_mode, "Config loaded successfully");
        Ok(config)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on malformed TOML or out-of-range values.
    #[instrument(skip(content))]
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;
        config.validate()
    }

    /// Resolves the configuration: an explicit path wins, then the
    /// `GRIDGUESS_CONFIG` variable, then defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a named file cannot be loaded.
    #[instrument]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        match path {
            Some(path) => Self::from_file(path),
            None => {
                debug!("No config file given, using defaults");
                Ok(Self::default())
            }
        }
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.catalog_capacity == 0 {
            return Err(ConfigError::new("catalog_capacity must be at least 1"));
        }
        if self.db_path.trim().is_empty() {
            return Err(ConfigError::new("db_path must not be empty"));
        }
        Ok(self)
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self { message: message.into(), line: loc.line(), file: loc.file() }
    }
}
