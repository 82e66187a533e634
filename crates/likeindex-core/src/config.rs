//! Index configuration.
//!
//! Provides configuration file support via `likeindex.toml`, environment
//! variables and programmatic overrides.
//!
//! # Priority (highest to lowest)
//!
//! 1. Environment variables (`LIKEINDEX_*`, `__` between section and key,
//!    e.g. `LIKEINDEX_INDEX__COMPACTION_THRESHOLD=500`)
//! 2. Configuration file (`likeindex.toml`)
//! 3. Default values

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::bitmap::BitmapKind;

/// Default maximum number of leading bytes indexed per value.
pub const DEFAULT_MAX_INDEXED_LENGTH: usize = 256;
/// Default number of pending tombstones that triggers compaction.
pub const DEFAULT_COMPACTION_THRESHOLD: usize = 1000;
/// Upper bound accepted for `index.max_indexed_length`.
pub const MAX_INDEXED_LENGTH_LIMIT: usize = 65_535;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to parse configuration.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue {
        /// Configuration key that failed validation.
        key: String,
        /// Validation error message.
        message: String,
    },

    /// Configuration file not found.
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Index behaviour section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Values longer than this are truncated before indexing.
    pub max_indexed_length: usize,
    /// Pending tombstones that trigger compaction.
    pub compaction_threshold: usize,
    /// Run compaction inside `delete_where` once the threshold is reached.
    pub auto_compact: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_indexed_length: DEFAULT_MAX_INDEXED_LENGTH,
            compaction_threshold: DEFAULT_COMPACTION_THRESHOLD,
            auto_compact: true,
        }
    }
}

/// Bitmap backend section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BitmapConfig {
    /// Bitmap implementation for every index bitmap.
    pub backend: BitmapKind,
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LikeIndexConfig {
    /// Index behaviour.
    pub index: IndexConfig,
    /// Bitmap backend.
    pub bitmap: BitmapConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

impl LikeIndexConfig {
    /// Loads configuration from default sources.
    ///
    /// Priority: defaults < `likeindex.toml` < environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration parsing fails.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("likeindex.toml")
    }

    /// Loads configuration from a specific file path. A missing file is
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration parsing fails.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("LIKEINDEX_").split("__"));

        figment
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Loads configuration from a file that must exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FileNotFound`] if `path` does not exist, or a
    /// parse error.
    pub fn load_required<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.try_exists()? {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        Self::load_from_path(path)
    }

    /// Creates a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::string(toml_str));

        figment
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let max_len = self.index.max_indexed_length;
        if !(1..=MAX_INDEXED_LENGTH_LIMIT).contains(&max_len) {
            return Err(ConfigError::InvalidValue {
                key: "index.max_indexed_length".to_string(),
                message: format!("value {max_len} is out of range [1, {MAX_INDEXED_LENGTH_LIMIT}]"),
            });
        }

        if self.index.compaction_threshold == 0 {
            return Err(ConfigError::InvalidValue {
                key: "index.compaction_threshold".to_string(),
                message: "value must be >= 1".to_string(),
            });
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "logging.level".to_string(),
                message: format!(
                    "value '{}' is invalid, expected one of: {:?}",
                    self.logging.level, valid_levels
                ),
            });
        }

        Ok(())
    }

    /// Serializes the configuration to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}
