//! Configuration loading and management
//!
//! This module provides utilities for loading application configuration
//! from `.env` files, environment variables and config files.

pub mod loader;

// Re-export commonly used items
pub use loader::{apply_env_overrides, load, load_from_env, load_from_file, probe_config_paths};
