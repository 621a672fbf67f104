//! # Storefront Infrastructure
//!
//! Everything that performs I/O on behalf of the storefront:
//! - HTTP client built on `reqwest`
//! - Configuration loading (`.env`, environment, TOML/JSON files)
//! - Tracing subscriber setup
//! - The Accurate ERP integration: signed, host-resolved, rate-limited calls
//!
//! ## Architecture
//! - Data types and configuration live in `storefront-domain`
//! - Scheduling, retry, signing and time primitives come from
//!   `storefront-common`
//! - This crate wires them together against the network

pub mod config;
pub mod errors;
pub mod http;
pub mod integrations;
pub mod observability;

// Re-export commonly used items
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
pub use integrations::accurate::{
    AccurateClient, AccurateCommands, AccurateError, AccurateResponse, CallOptions,
};
pub use observability::init_tracing;
