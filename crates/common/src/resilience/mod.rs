//! Resilience patterns for calls to a shared, rate-limited upstream
//!
//! - **Request scheduler**: FIFO queue with bounded concurrency and a global
//!   minimum spacing between dispatches
//! - **Retry**: bounded exponential backoff driven by
//!   [`ErrorClassification`](crate::error::ErrorClassification)
//!
//! Both are generic over the task's output and error types and know nothing
//! about HTTP; the infrastructure layer composes them per request.

pub mod retry;
pub mod scheduler;

pub use retry::{retry_with_policy, ClassifiedRetry, RetryConfig, RetryDecision, RetryPolicy};
pub use scheduler::{RequestScheduler, SchedulerConfig, SchedulerError, SchedulerStats};
