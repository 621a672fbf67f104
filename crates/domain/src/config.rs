//! Configuration structures
//!
//! Every field has a default so partial config files and env overrides work.
//! Secrets are deliberately absent: credentials are read at first use by the
//! infrastructure layer.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_LOG_FILTER, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_PARALLEL, DEFAULT_MIN_INTERVAL_MS,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_RETRY_BASE_BACKOFF_MS, DEFAULT_TIMEZONE,
    DEFAULT_TOKEN_URL,
};
use crate::errors::{Result, StorefrontError};

/// Top-level application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub accurate: AccurateConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.accurate.validate()
    }
}

/// Settings for the upstream ERP integration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccurateConfig {
    /// Token verification endpoint used for host discovery
    pub token_url: String,
    /// IANA zone used to render request timestamps
    pub timezone: String,
    /// Maximum number of in-flight upstream calls
    pub max_parallel: usize,
    /// Minimum spacing between two dispatches, in milliseconds
    pub min_interval_ms: u64,
    pub request_timeout_secs: u64,
    /// Total attempts per facade call (1 disables retries)
    pub max_attempts: u32,
    pub retry_base_backoff_ms: u64,
}

impl Default for AccurateConfig {
    fn default() -> Self {
        Self {
            token_url: DEFAULT_TOKEN_URL.to_string(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            max_parallel: DEFAULT_MAX_PARALLEL,
            min_interval_ms: DEFAULT_MIN_INTERVAL_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_base_backoff_ms: DEFAULT_RETRY_BASE_BACKOFF_MS,
        }
    }
}

impl AccurateConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_base_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_base_backoff_ms)
    }

    /// Validate the configuration
    ///
    /// # Errors
    /// Returns `StorefrontError::Config` when a limit is zero or the token URL
    /// or timezone is empty.
    pub fn validate(&self) -> Result<()> {
        if self.token_url.trim().is_empty() {
            return Err(StorefrontError::Config("token_url must not be empty".into()));
        }
        if self.timezone.trim().is_empty() {
            return Err(StorefrontError::Config("timezone must not be empty".into()));
        }
        if self.max_parallel == 0 {
            return Err(StorefrontError::Config("max_parallel must be greater than 0".into()));
        }
        if self.max_attempts == 0 {
            return Err(StorefrontError::Config("max_attempts must be greater than 0".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(StorefrontError::Config(
                "request_timeout_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Logging output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
    /// Emit JSON lines instead of the human-readable format
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: DEFAULT_LOG_FILTER.to_string(), json: false }
    }
}
