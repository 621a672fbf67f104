//! Bounded retry with exponential backoff
//!
//! The operation closure is invoked once per attempt, so anything that must
//! be fresh per attempt (timestamps, signatures, queue position) is rebuilt
//! by the caller inside it.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::ErrorClassification;

/// Decision for whether to retry an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the operation with the default backoff delay
    Retry,
    /// Retry the operation with a custom delay
    RetryAfter(Duration),
    /// Don't retry the operation
    Stop,
}

/// Trait for determining whether an error should be retried
pub trait RetryPolicy<E> {
    /// Decide what to do after `error` on the zero-based `attempt`
    fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision;
}

/// Retries whatever the error itself reports as retryable, honouring its
/// `retry_after` hint.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassifiedRetry;

impl<E: ErrorClassification> RetryPolicy<E> for ClassifiedRetry {
    fn should_retry(&self, error: &E, _attempt: u32) -> RetryDecision {
        if !error.is_retryable() {
            return RetryDecision::Stop;
        }
        error.retry_after().map_or(RetryDecision::Retry, RetryDecision::RetryAfter)
    }
}

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts including the first one; `1` disables retrying
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each later attempt
    pub initial_delay: Duration,
    /// Upper bound for a single delay
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryConfig {
    /// A configuration that runs the operation exactly once
    pub fn no_retry() -> Self {
        Self { max_attempts: 1, ..Self::default() }
    }

    /// Backoff before retrying after the zero-based `attempt` failed
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Run `operation` until it succeeds, the policy says stop, or attempts run
/// out. The last error is returned as-is.
pub async fn retry_with_policy<F, Fut, T, E, P>(
    config: &RetryConfig,
    policy: &P,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: RetryPolicy<E>,
    E: fmt::Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0u32;

    loop {
        match operation(attempt).await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(attempts = attempt + 1, "operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) => {
                if attempt + 1 >= max_attempts {
                    if max_attempts > 1 {
                        warn!(attempts = attempt + 1, error = %error, "retry attempts exhausted");
                    }
                    return Err(error);
                }

                let delay = match policy.should_retry(&error, attempt) {
                    RetryDecision::Stop => return Err(error),
                    RetryDecision::Retry => config.delay_for(attempt),
                    RetryDecision::RetryAfter(custom) => custom,
                };

                warn!(
                    attempt = attempt + 1,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "operation failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::error::ErrorSeverity;

    #[derive(Debug, Clone, PartialEq)]
    enum Failure {
        Transient,
        Fatal,
    }

    impl fmt::Display for Failure {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{self:?}")
        }
    }

    impl ErrorClassification for Failure {
        fn is_retryable(&self) -> bool {
            matches!(self, Self::Transient)
        }

        fn severity(&self) -> ErrorSeverity {
            ErrorSeverity::Warning
        }
    }

    #[test]
    fn delay_doubles_and_caps() {
        let config = RetryConfig {
            max_attempts: 5,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_millis(700),
        };
        assert_eq!(config.delay_for(0), Duration::from_millis(200));
        assert_eq!(config.delay_for(1), Duration::from_millis(400));
        assert_eq!(config.delay_for(2), Duration::from_millis(700));
        assert_eq!(config.delay_for(40), Duration::from_millis(700));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_until_success() {
        let calls = AtomicU32::new(0);
        let result = retry_with_policy(&RetryConfig::default(), &ClassifiedRetry, |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(Failure::Transient)
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_error_stops_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> =
            retry_with_policy(&RetryConfig::default(), &ClassifiedRetry, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(Failure::Fatal) }
            })
            .await;

        assert_eq!(result, Err(Failure::Fatal));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn no_retry_config_runs_once() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_with_policy(&RetryConfig::no_retry(), &ClassifiedRetry, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Failure::Transient) }
        })
        .await;

        assert_eq!(result, Err(Failure::Transient));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
