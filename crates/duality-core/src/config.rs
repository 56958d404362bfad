//! Configuration loading and typed config structures for the playback engine.
//!
//! The canonical configuration lives in `duality-config.yaml` at the
//! project root. This module defines strongly-typed structs that mirror
//! the YAML structure, and provides a loader that reads the file. Every
//! field has a default matching the original demo timings, so a missing
//! file or a partial file is never an error at the call site.

use std::path::Path;

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

/// Top-level configuration for the playback engine.
///
/// Mirrors the structure of `duality-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DualityConfig {
    /// Playback timing and retention settings.
    #[serde(default)]
    pub playback: PlaybackConfig,

    /// Demo selection.
    #[serde(default)]
    pub demos: DemosConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl DualityConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_yml::from_str(&contents)?;
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config)
    }
}

/// Playback timing and retention settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlaybackConfig {
    /// Delay in milliseconds between an update's retract and apply
    /// halves.
    #[serde(default = "default_intra_update_delay_ms")]
    pub intra_update_delay_ms: u64,

    /// Maximum number of changelog records retained for display.
    #[serde(default = "default_changelog_capacity")]
    pub changelog_capacity: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            intra_update_delay_ms: default_intra_update_delay_ms(),
            changelog_capacity: default_changelog_capacity(),
        }
    }
}

const fn default_intra_update_delay_ms() -> u64 {
    300
}

const fn default_changelog_capacity() -> usize {
    25
}

/// Demo selection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DemosConfig {
    /// Names of the demos to run, in order.
    #[serde(default = "default_demo_names")]
    pub run: Vec<String>,

    /// Whether to replay the scripted terminal sessions after the demos.
    #[serde(default = "default_true")]
    pub include_terminal: bool,
}

impl Default for DemosConfig {
    fn default() -> Self {
        Self {
            run: default_demo_names(),
            include_terminal: default_true(),
        }
    }
}

fn default_demo_names() -> Vec<String> {
    vec![
        "order-stream".to_owned(),
        "aggregation-changelog".to_owned(),
        "live-aggregation".to_owned(),
    ]
}

const fn default_true() -> bool {
    true
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default tracing filter when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_owned()
}
