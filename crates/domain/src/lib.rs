//! # Storefront Domain
//!
//! Business domain types for the storefront ERP gateway.
//!
//! This crate contains:
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Constants for the upstream ERP protocol
//! - ERP wire types (response envelope, token verification payload, DTOs)
//!
//! ## Architecture
//! - No dependencies on other storefront crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
