//! Modular common utilities shared across storefront crates.
//!
//! Nothing in this crate knows about the ERP: it provides the generic
//! pieces (signing primitive, timestamp formatting, request scheduling,
//! retry) that the infrastructure layer composes.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: errors, time, crypto, security
//! - `runtime`: async infrastructure (request scheduler, retry)

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod crypto;
#[cfg(feature = "foundation")]
pub mod error;
#[cfg(feature = "foundation")]
pub mod security;
#[cfg(feature = "foundation")]
pub mod time;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod resilience;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "foundation")]
pub use error::{ErrorClassification, ErrorSeverity};
#[cfg(feature = "runtime")]
pub use resilience::{
    retry_with_policy, ClassifiedRetry, RequestScheduler, RetryConfig, RetryDecision, RetryPolicy,
    SchedulerConfig, SchedulerError, SchedulerStats,
};
#[cfg(feature = "foundation")]
pub use security::SecureString;
#[cfg(feature = "foundation")]
pub use time::{Clock, MockClock, SystemClock};
