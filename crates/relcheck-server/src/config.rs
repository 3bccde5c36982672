//! Configuration management for the check pipeline.
//!
//! This module provides configuration loading with multiple sources:
//! 1. Default values (hardcoded)
//! 2. Configuration file (YAML)
//! 3. Environment variables (override)
//!
//! # Configuration Hierarchy
//!
//! Environment variables take precedence over config file values,
//! which take precedence over defaults.
//!
//! # Example
//!
//! ```ignore
//! use relcheck_server::config::PipelineConfig;
//!
//! // Load from file with env overrides
//! let config = PipelineConfig::load("relcheck.yaml")?;
//!
//! // Or load from environment only
//! let config = PipelineConfig::from_env()?;
//! ```

use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use relcheck_domain::resolver::{
    ResolverConfig, TrackerConfig, DEFAULT_LOG_BURST, DEFAULT_LOG_RATE, DEFAULT_MAX_DEPTH,
    DEFAULT_TRACKER_INTERVAL,
};

use crate::logging::{LogFormat, LoggingConfig};

const ENV_PREFIX: &str = "RELCHECK";

/// Pipeline configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct PipelineConfig {
    /// Check resolution settings
    #[serde(default)]
    pub resolver: ResolverSettings,

    /// Path tracking settings
    #[serde(default)]
    pub tracker: TrackerSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Check resolution settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ResolverSettings {
    /// Depth budget of a top-level check
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Deadline of a top-level check in milliseconds. Zero disables it.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

fn default_max_depth() -> u32 {
    DEFAULT_MAX_DEPTH
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

/// Path tracking settings.
///
/// Overridable via `RELCHECK_TRACKER__*`:
///
/// - `RELCHECK_TRACKER__ENABLED=false` - Leave the tracking stage out of the ring
/// - `RELCHECK_TRACKER__INTERVAL_SECS=60` - Age after which a path is flushed
/// - `RELCHECK_TRACKER__LOG_BURST=10` - Diagnostics allowed in a burst
///
/// # Example YAML Configuration
///
/// ```yaml
/// tracker:
///   enabled: true
///   interval_secs: 300
///   flush_interval_ms: 300000
///   log_rate_per_sec: 1.0
///   log_burst: 100
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TrackerSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// A tracked path older than this many seconds is evicted.
    #[serde(default = "default_tracker_interval_secs")]
    pub interval_secs: u64,

    /// Period of the background flush. Defaults to the tracker interval.
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,

    #[serde(default = "default_log_rate")]
    pub log_rate_per_sec: f64,

    #[serde(default = "default_log_burst")]
    pub log_burst: u32,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_tracker_interval_secs(),
            flush_interval_ms: default_flush_interval_ms(),
            log_rate_per_sec: default_log_rate(),
            log_burst: default_log_burst(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_tracker_interval_secs() -> u64 {
    DEFAULT_TRACKER_INTERVAL.as_secs()
}

fn default_flush_interval_ms() -> u64 {
    DEFAULT_TRACKER_INTERVAL.as_millis() as u64
}

fn default_log_rate() -> f64 {
    DEFAULT_LOG_RATE
}

fn default_log_burst() -> u32 {
    DEFAULT_LOG_BURST
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Use JSON format (true for production, false for development)
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl PipelineConfig {
    /// Load configuration from a YAML file with environment variable overrides.
    ///
    /// Environment variables are prefixed with `RELCHECK_` and use `__` as
    /// separator, e.g. `RELCHECK_RESOLVER__MAX_DEPTH=50` overrides
    /// `resolver.max_depth`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigLoadError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let config = Config::builder()
            .add_source(Config::try_from(&PipelineConfig::default())?)
            .add_source(File::from(path).format(FileFormat::Yaml))
            .add_source(environment())
            .build()?;

        let pipeline_config: PipelineConfig = config.try_deserialize()?;
        pipeline_config.validate()?;

        Ok(pipeline_config)
    }

    /// Load configuration from environment variables only.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        let config = Config::builder()
            .add_source(Config::try_from(&PipelineConfig::default())?)
            .add_source(environment())
            .build()?;

        let pipeline_config: PipelineConfig = config.try_deserialize()?;
        pipeline_config.validate()?;

        Ok(pipeline_config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.resolver.max_depth == 0 {
            return Err(ConfigLoadError::Invalid {
                message: "resolver.max_depth must be greater than 0".to_string(),
            });
        }

        if self.tracker.enabled {
            if self.tracker.interval_secs == 0 {
                return Err(ConfigLoadError::Invalid {
                    message: "tracker.interval_secs must be greater than 0".to_string(),
                });
            }
            if self.tracker.flush_interval_ms == 0 {
                return Err(ConfigLoadError::Invalid {
                    message: "tracker.flush_interval_ms must be greater than 0".to_string(),
                });
            }
            if !self.tracker.log_rate_per_sec.is_finite() || self.tracker.log_rate_per_sec < 0.0 {
                return Err(ConfigLoadError::Invalid {
                    message: format!(
                        "tracker.log_rate_per_sec must be a non-negative number, got: {}",
                        self.tracker.log_rate_per_sec
                    ),
                });
            }
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigLoadError::Invalid {
                message: format!(
                    "logging.level must be one of: {:?}, got: {}",
                    valid_levels, self.logging.level
                ),
            });
        }

        Ok(())
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig::default()
            .with_max_depth(self.resolver.max_depth)
            .with_timeout(Duration::from_millis(self.resolver.request_timeout_ms))
    }

    /// Tracker configuration, or `None` when tracking is disabled.
    pub fn tracker_config(&self) -> Option<TrackerConfig> {
        if !self.tracker.enabled {
            return None;
        }
        Some(
            TrackerConfig::default()
                .with_tracker_interval(Duration::from_secs(self.tracker.interval_secs))
                .with_flush_interval(Duration::from_millis(self.tracker.flush_interval_ms))
                .with_log_limit(self.tracker.log_rate_per_sec, self.tracker.log_burst),
        )
    }

    pub fn logging_config(&self) -> Result<LoggingConfig, ConfigLoadError> {
        let level = self
            .logging
            .level
            .parse()
            .map_err(|_| ConfigLoadError::Invalid {
                message: format!("logging.level is not a level: {}", self.logging.level),
            })?;
        let format = if self.logging.json {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        };
        Ok(LoggingConfig::new(format, level))
    }
}

// RELCHECK_TRACKER__LOG_BURST -> tracker.log_burst
fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}
