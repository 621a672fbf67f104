//! Global `tracing` subscriber installation.
//!
//! `RUST_LOG` takes precedence over the configured filter so operators can
//! raise verbosity without touching config files.

use storefront_domain::{LoggingConfig, Result, StorefrontError};
use tracing_subscriber::EnvFilter;

/// Build the filter: `RUST_LOG` if set and valid, else `config.filter`.
///
/// # Errors
/// Returns `StorefrontError::Config` when `config.filter` is not a valid
/// directive and `RUST_LOG` does not override it.
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.filter).map_err(|e| {
        StorefrontError::Config(format!("Invalid log filter '{}': {e}", config.filter))
    })
}

/// Install the global `fmt` subscriber.
///
/// Returns `Ok(true)` when installed and `Ok(false)` when a global subscriber
/// already exists (for example a second call, or a test harness subscriber).
///
/// # Errors
/// Returns `StorefrontError::Config` for an invalid filter directive.
pub fn init_tracing(config: &LoggingConfig) -> Result<bool> {
    let filter = build_filter(config)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let installed = if config.json {
        builder.json().with_current_span(true).try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    };

    if installed {
        tracing::debug!(filter = %config.filter, json = config.json, "tracing initialised");
    }
    Ok(installed)
}
