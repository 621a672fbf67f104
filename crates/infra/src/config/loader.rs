//! Configuration loader
//!
//! ## Loading Strategy
//! 1. Read `.env` from the working directory if present (existing process
//!    variables win)
//! 2. Start from the first config file found by [`probe_config_paths`], or
//!    from defaults when there is none
//! 3. Apply `STOREFRONT_*` environment overrides
//! 4. Validate
//!
//! ## Environment Variables
//! - `STOREFRONT_ACCURATE_TOKEN_URL`: token verification endpoint
//! - `STOREFRONT_ACCURATE_TIMEZONE`: IANA zone for request timestamps
//! - `STOREFRONT_MAX_PARALLEL`: concurrent upstream calls
//! - `STOREFRONT_MIN_INTERVAL_MS`: minimum gap between dispatches
//! - `STOREFRONT_REQUEST_TIMEOUT_SECS`: per-request HTTP timeout
//! - `STOREFRONT_MAX_ATTEMPTS`: attempts per call (1 disables retries)
//! - `STOREFRONT_LOG_FILTER`: default tracing filter
//! - `STOREFRONT_LOG_JSON`: JSON log output (true/false)
//!
//! API secrets are not configuration; see
//! [`EnvCredentials`](crate::integrations::accurate::EnvCredentials).
//!
//! ## File Locations
//! `storefront.{toml,json}` then `config.{toml,json}`, first in the current
//! working directory and then next to the executable.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use storefront_domain::{Config, Result, StorefrontError};

const ENV_TOKEN_URL: &str = "STOREFRONT_ACCURATE_TOKEN_URL";
const ENV_TIMEZONE: &str = "STOREFRONT_ACCURATE_TIMEZONE";
const ENV_MAX_PARALLEL: &str = "STOREFRONT_MAX_PARALLEL";
const ENV_MIN_INTERVAL_MS: &str = "STOREFRONT_MIN_INTERVAL_MS";
const ENV_REQUEST_TIMEOUT_SECS: &str = "STOREFRONT_REQUEST_TIMEOUT_SECS";
const ENV_MAX_ATTEMPTS: &str = "STOREFRONT_MAX_ATTEMPTS";
const ENV_LOG_FILTER: &str = "STOREFRONT_LOG_FILTER";
const ENV_LOG_JSON: &str = "STOREFRONT_LOG_JSON";

const CONFIG_FILE_NAMES: [&str; 4] =
    ["storefront.toml", "storefront.json", "config.toml", "config.json"];

/// Load configuration using the full strategy described in the module docs.
///
/// # Errors
/// Returns `StorefrontError::Config` if a found file cannot be parsed, an
/// override has an invalid value, or the result fails validation.
pub fn load() -> Result<Config> {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
        Err(err) if err.not_found() => {}
        Err(err) => {
            return Err(StorefrontError::Config(format!("Failed to read .env file: {err}")));
        }
    }

    let base = match probe_config_paths() {
        Some(path) => load_from_file(Some(path))?,
        None => {
            tracing::debug!("No config file found, using defaults");
            Config::default()
        }
    };

    let config = apply_env_overrides(base, |key| std::env::var(key).ok())?;
    config.validate()?;
    tracing::info!(
        max_parallel = config.accurate.max_parallel,
        min_interval_ms = config.accurate.min_interval_ms,
        timezone = %config.accurate.timezone,
        "Configuration loaded"
    );
    Ok(config)
}

/// Defaults with environment overrides applied.
///
/// # Errors
/// Returns `StorefrontError::Config` if a variable has an invalid value.
pub fn load_from_env() -> Result<Config> {
    let config = apply_env_overrides(Config::default(), |key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations. Format is detected by
/// extension (`.toml` or `.json`); missing fields take their defaults.
///
/// # Errors
/// Returns `StorefrontError::Config` if the file is missing, unreadable,
/// malformed, or fails validation.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(StorefrontError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            StorefrontError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| StorefrontError::Config(format!("Failed to read config file: {}", e)))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Overlay `STOREFRONT_*` values obtained from `lookup` onto `config`.
///
/// `lookup` abstracts the environment so callers (and tests) can supply
/// values from any source. Blank values are ignored.
///
/// # Errors
/// Returns `StorefrontError::Config` if a numeric or boolean value does not
/// parse.
pub fn apply_env_overrides<F>(mut config: Config, lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(url) = get(ENV_TOKEN_URL) {
        config.accurate.token_url = url;
    }
    if let Some(tz) = get(ENV_TIMEZONE) {
        config.accurate.timezone = tz;
    }
    if let Some(raw) = get(ENV_MAX_PARALLEL) {
        config.accurate.max_parallel = parse_number(ENV_MAX_PARALLEL, &raw)?;
    }
    if let Some(raw) = get(ENV_MIN_INTERVAL_MS) {
        config.accurate.min_interval_ms = parse_number(ENV_MIN_INTERVAL_MS, &raw)?;
    }
    if let Some(raw) = get(ENV_REQUEST_TIMEOUT_SECS) {
        config.accurate.request_timeout_secs = parse_number(ENV_REQUEST_TIMEOUT_SECS, &raw)?;
    }
    if let Some(raw) = get(ENV_MAX_ATTEMPTS) {
        config.accurate.max_attempts = parse_number(ENV_MAX_ATTEMPTS, &raw)?;
    }
    if let Some(filter) = get(ENV_LOG_FILTER) {
        config.logging.filter = filter;
    }
    if let Some(raw) = get(ENV_LOG_JSON) {
        config.logging.json = parse_bool(ENV_LOG_JSON, &raw)?;
    }

    Ok(config)
}

fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| StorefrontError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| StorefrontError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(StorefrontError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe the standard locations for a configuration file
///
/// Returns the first existing candidate, or `None`.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.push(exe_dir.to_path_buf());
        }
    }

    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.is_file())
}

fn parse_number<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| StorefrontError::Config(format!("Invalid value for {key}: '{raw}' ({e})")))
}

/// Accepts `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(StorefrontError::Config(format!("Invalid boolean for {key}: '{raw}'"))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn overrides_apply_on_top_of_defaults() {
        let config = apply_env_overrides(
            Config::default(),
            env(&[
                (ENV_MAX_PARALLEL, "2"),
                (ENV_MIN_INTERVAL_MS, " 300 "),
                (ENV_TIMEZONE, "Asia/Makassar"),
                (ENV_LOG_JSON, "YES"),
            ]),
        )
        .unwrap();

        assert_eq!(config.accurate.max_parallel, 2);
        assert_eq!(config.accurate.min_interval_ms, 300);
        assert_eq!(config.accurate.timezone, "Asia/Makassar");
        assert_eq!(config.accurate.max_attempts, 3);
        assert!(config.logging.json);
    }

    #[test]
    fn blank_values_are_ignored() {
        let config =
            apply_env_overrides(Config::default(), env(&[(ENV_TOKEN_URL, "   ")])).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn invalid_number_is_config_error() {
        let err = apply_env_overrides(Config::default(), env(&[(ENV_MAX_ATTEMPTS, "three")]))
            .unwrap_err();
        match err {
            StorefrontError::Config(msg) => assert!(msg.contains(ENV_MAX_ATTEMPTS)),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn invalid_bool_is_config_error() {
        let result = apply_env_overrides(Config::default(), env(&[(ENV_LOG_JSON, "maybe")]));
        assert!(matches!(result, Err(StorefrontError::Config(_))));
    }

    #[test]
    fn parse_config_by_extension() {
        let toml = "[accurate]\nmax_parallel = 4\n";
        let json = r#"{"logging": {"filter": "debug"}}"#;

        let from_toml = parse_config(toml, Path::new("storefront.toml")).unwrap();
        let from_json = parse_config(json, Path::new("storefront.json")).unwrap();

        assert_eq!(from_toml.accurate.max_parallel, 4);
        assert_eq!(from_json.logging.filter, "debug");
        assert!(parse_config("x: 1", Path::new("storefront.yaml")).is_err());
    }

    #[test]
    fn load_from_file_not_found() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/storefront.toml")));
        assert!(matches!(result, Err(StorefrontError::Config(_))));
    }
}
