//! Application settings

use crate::core::pipeline::{ConsumerOptions, PipelineOptions, ProducerOptions, ReconnectPolicy};
use crate::core::protocol::checksum::DEFAULT_BINARY_THRESHOLD;
use crate::core::transport::SerialSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read or written
    #[error("{}: {source}", path.display())]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// File is not valid TOML for [`AppConfig`]
    #[error("{}: {source}", path.display())]
    Parse {
        /// File involved
        path: PathBuf,
        /// Underlying error
        source: toml::de::Error,
    },

    /// Settings could not be rendered as TOML
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// No platform configuration directory
    #[error("could not determine config directory")]
    NoConfigDir,

    /// A value is outside what the pipeline accepts
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Serial port
    pub serial: SerialSettings,
    /// Reconnect behaviour
    pub reconnect: ReconnectConfig,
    /// Queue and classification
    pub pipeline: PipelineConfig,
    /// Diagnostics
    pub logging: LoggingConfig,
    /// Record output
    pub output: OutputConfig,
}

impl AppConfig {
    /// Load from the platform config directory, falling back to defaults
    /// when no file exists there
    pub fn load() -> Result<Self, ConfigError> {
        let path = super::default_config_path().ok_or(ConfigError::NoConfigDir)?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load from an explicit file. A missing file is an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Explicit file when given, platform default otherwise
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from(path),
            None => Self::load(),
        }
    }

    /// Save to the platform config directory
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = super::default_config_path().ok_or(ConfigError::NoConfigDir)?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        self.save_to(&path)
    }

    /// Save to an explicit file
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(5..=8).contains(&self.serial.data_bits) {
            return Err(ConfigError::Invalid(format!(
                "serial.data_bits must be 5-8, got {}",
                self.serial.data_bits
            )));
        }
        if !matches!(self.serial.stop_bits, 1 | 2) {
            return Err(ConfigError::Invalid(format!(
                "serial.stop_bits must be 1 or 2, got {}",
                self.serial.stop_bits
            )));
        }
        if self.serial.timeout_ms == 0 {
            return Err(ConfigError::Invalid("serial.timeout_ms must be positive".into()));
        }
        if !(self.reconnect.backoff_base >= 1.0 && self.reconnect.backoff_base.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "reconnect.backoff_base must be at least 1, got {}",
                self.reconnect.backoff_base
            )));
        }
        if self.pipeline.queue_capacity == 0 {
            return Err(ConfigError::Invalid("pipeline.queue_capacity must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.pipeline.binary_threshold) {
            return Err(ConfigError::Invalid(format!(
                "pipeline.binary_threshold must be in [0, 1], got {}",
                self.pipeline.binary_threshold
            )));
        }
        if self.pipeline.max_line_length == 0 {
            return Err(ConfigError::Invalid("pipeline.max_line_length must be positive".into()));
        }
        Ok(())
    }

    /// Worker options derived from these settings
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            queue_capacity: self.pipeline.queue_capacity,
            producer: ProducerOptions {
                reconnect: self.reconnect.policy(),
                binary_threshold: self.pipeline.binary_threshold,
                read_timeout: None,
            },
            consumer: ConsumerOptions {
                drain_grace: Duration::from_millis(self.pipeline.drain_grace_ms),
                ..ConsumerOptions::default()
            },
        }
    }
}

/// Reconnect settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Open attempts per reconnect cycle
    pub max_retries: u32,
    /// Delay after attempt n is `backoff_base^n` seconds
    pub backoff_base: f64,
    /// Cap on a single delay
    pub max_backoff_secs: u64,
    /// Pause between exhausted cycles
    pub retry_pause_secs: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff_base: 2.0,
            max_backoff_secs: 60,
            retry_pause_secs: 5,
        }
    }
}

impl ReconnectConfig {
    pub fn policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            max_retries: self.max_retries,
            backoff_base: self.backoff_base,
            retry_pause: Duration::from_secs(self.retry_pause_secs),
        }
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }
}

/// Queue and classification settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Bounded queue size
    pub queue_capacity: usize,
    /// Share of non-text bytes above which an undecodable read is binary noise
    pub binary_threshold: f64,
    /// Time the consumer gets to drain the queue on shutdown
    pub drain_grace_ms: u64,
    /// Longest unterminated line before it is handed on as-is
    pub max_line_length: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1000,
            binary_threshold: DEFAULT_BINARY_THRESHOLD,
            drain_grace_ms: 2000,
            max_line_length: 4096,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
    /// Emit JSON instead of plain text
    pub json: bool,
    /// Also write a daily rolling file here
    pub directory: Option<PathBuf>,
    /// Rolling file name prefix
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            directory: None,
            file_prefix: "adcplink".to_string(),
        }
    }
}

/// Record output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// JSON lines file; stdout when unset
    pub path: Option<PathBuf>,
    /// Flush after this many lines
    pub flush_every: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: None,
            flush_every: 100,
        }
    }
}
