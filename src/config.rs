//! Configuration loading from environment variables and TOML files.
//!
//! Environment values are read from `RATE_GATE_*` variables with sensible
//! defaults. Invalid values fall back to defaults without crashing.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |---|---|---|
//! | `RATE_GATE_MAX_TOKENS` | 1200 | Token bucket capacity |
//! | `RATE_GATE_REFILL_RATE` | 20 | Tokens added per refill interval |
//! | `RATE_GATE_REFILL_INTERVAL_MS` | 1000 | Refill period (ms) |
//! | `RATE_GATE_MAX_QUEUE_SIZE` | 1000 | Max queued requests |
//! | `RATE_GATE_REQUEST_TIMEOUT_MS` | unset | Default queued deadline (ms) |
//! | `RATE_GATE_LOG_LEVEL` | info | Tracing filter directive |
//! | `RATE_GATE_LOG_FORMAT` | json | `json` or `pretty` |
//! | `RATE_GATE_LOG_FILE` | unset | Write logs to this file instead of stderr |
//!
//! # File format
//!
//! ```toml
//! [bucket]
//! max_tokens = 1200
//! refill_rate = 20
//! refill_interval_ms = 1000
//!
//! [queue]
//! max_pending = 1000
//! default_timeout_ms = 30000
//! ```

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::scheduler::{RequestQueueConfig, SchedulerConfig, TokenBucketConfig};
use crate::telemetry::{LogConfig, LogFormat};

/// Errors from loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Effective configuration summary (serializable).
#[derive(Debug, Clone, Serialize)]
pub struct EffectiveConfig {
    pub max_tokens: u64,
    pub refill_rate: u64,
    pub refill_interval_ms: u64,
    pub max_queue_size: usize,
    pub request_timeout_ms: Option<u64>,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

/// All configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub scheduler: SchedulerConfig,
    pub log: LogConfig,
}

/// Parse a `usize` env var, returning `default` on missing or invalid.
fn parse_usize(key: &str, default: usize) -> usize {
    match std::env::var(key) {
        Ok(val) => val.parse::<usize>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Parse a `u64` env var, returning `default` on missing or invalid.
fn parse_u64(key: &str, default: u64) -> u64 {
    match std::env::var(key) {
        Ok(val) => val.parse::<u64>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Parse an optional `u64` env var. Missing, invalid or zero means unset.
fn parse_opt_u64(key: &str) -> Option<u64> {
    std::env::var(key)
        .ok()
        .and_then(|val| val.parse::<u64>().ok())
        .filter(|v| *v > 0)
}

/// Load token bucket configuration from environment.
fn load_bucket_config() -> TokenBucketConfig {
    let defaults = TokenBucketConfig::default();
    let max_tokens = parse_u64("RATE_GATE_MAX_TOKENS", defaults.max_tokens);
    let refill_rate = parse_u64("RATE_GATE_REFILL_RATE", defaults.refill_rate);
    let interval = parse_u64("RATE_GATE_REFILL_INTERVAL_MS", defaults.refill_interval_ms);
    TokenBucketConfig {
        max_tokens: max_tokens.max(1),
        refill_rate,
        refill_interval_ms: interval.max(1), // floor: 1ms
    }
}

/// Load queue configuration from environment.
fn load_queue_config() -> RequestQueueConfig {
    let max_pending = parse_usize("RATE_GATE_MAX_QUEUE_SIZE", RequestQueueConfig::default().max_pending);
    RequestQueueConfig {
        max_pending: max_pending.max(1),
        default_timeout_ms: parse_opt_u64("RATE_GATE_REQUEST_TIMEOUT_MS"),
    }
}

/// Load logging configuration from environment.
fn load_log_config() -> LogConfig {
    let level = std::env::var("RATE_GATE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let format = std::env::var("RATE_GATE_LOG_FORMAT")
        .ok()
        .and_then(|v| v.parse::<LogFormat>().ok())
        .unwrap_or_default();
    let output_path = std::env::var_os("RATE_GATE_LOG_FILE")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from);
    LogConfig { format, level, output_path }
}

/// Load all configuration from environment variables.
///
/// Missing or invalid values fall back to safe defaults without panicking.
pub fn load() -> EnvConfig {
    EnvConfig {
        scheduler: SchedulerConfig {
            bucket: load_bucket_config(),
            queue: load_queue_config(),
        },
        log: load_log_config(),
    }
}

/// Parse and validate scheduler configuration from TOML text.
pub fn from_toml_str(text: &str) -> Result<SchedulerConfig, ConfigError> {
    let config: SchedulerConfig = toml::from_str(text)?;
    config.validate().map_err(ConfigError::Invalid)?;
    Ok(config)
}

/// Load and validate scheduler configuration from a TOML file.
pub fn load_file(path: impl AsRef<Path>) -> Result<SchedulerConfig, ConfigError> {
    let text = std::fs::read_to_string(path)?;
    from_toml_str(&text)
}

impl EnvConfig {
    /// Return a serializable summary of all effective values.
    pub fn effective_config(&self) -> EffectiveConfig {
        let s = &self.scheduler;
        EffectiveConfig {
            max_tokens: s.bucket.max_tokens,
            refill_rate: s.bucket.refill_rate,
            refill_interval_ms: s.bucket.refill_interval_ms,
            max_queue_size: s.queue.max_pending,
            request_timeout_ms: s.queue.default_timeout_ms,
            log_level: self.log.level.clone(),
            log_file: self.log.output_path.clone(),
        }
    }
}
