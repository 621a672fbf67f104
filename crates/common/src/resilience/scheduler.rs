//! Rate-limited request scheduler
//!
//! Every task submitted through [`RequestScheduler::enqueue`] goes into a
//! single FIFO queue owned by a dispatcher task. The dispatcher starts the
//! head of the queue once
//!
//! 1. fewer than `max_parallel` tasks are running, and
//! 2. at least `min_interval` has passed since the previous dispatch.
//!
//! The spacing is global to the scheduler, not per caller, because the
//! upstream's rate limit is global.
//!
//! Tasks are spawned onto the runtime, so a task runs to completion even if
//! the future returned by `enqueue` is dropped. A task's failure is handed
//! back to its own caller unchanged and has no effect on other tasks.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, Semaphore};
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::error::{ErrorClassification, ErrorSeverity};

type Job = Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send>;

/// Errors raised by the scheduler itself (never by the tasks it runs)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// The configuration cannot be used
    #[error("invalid scheduler configuration: {0}")]
    InvalidConfiguration(String),

    /// The task was lost before producing a result (dispatcher stopped or
    /// the task panicked)
    #[error("scheduler closed before the task completed")]
    Closed,

    /// `enqueue` was called outside of a Tokio runtime
    #[error("no Tokio runtime available to run the scheduler")]
    NoRuntime,
}

impl ErrorClassification for SchedulerError {
    fn is_retryable(&self) -> bool {
        false
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::InvalidConfiguration(_) | Self::NoRuntime => ErrorSeverity::Critical,
            Self::Closed => ErrorSeverity::Error,
        }
    }
}

/// Scheduler limits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Maximum number of tasks running at once
    pub max_parallel: usize,
    /// Minimum gap between two consecutive dispatches
    pub min_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { max_parallel: 6, min_interval: Duration::from_millis(150) }
    }
}

impl SchedulerConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), SchedulerError> {
        if self.max_parallel == 0 {
            return Err(SchedulerError::InvalidConfiguration(
                "max_parallel must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Point-in-time view of the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedulerStats {
    /// Tasks waiting in the queue
    pub queued: usize,
    /// Tasks currently running
    pub active: usize,
    /// Tasks dispatched since creation
    pub dispatched: u64,
}

#[derive(Debug, Default)]
struct Counters {
    queued: AtomicUsize,
    active: AtomicUsize,
    dispatched: AtomicU64,
}

struct ActiveGuard(Arc<Counters>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// FIFO scheduler with bounded concurrency and minimum dispatch spacing.
///
/// The dispatcher is started lazily on the runtime of the first `enqueue`
/// call, so a scheduler can be constructed outside of async context.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
///
/// use storefront_common::resilience::{RequestScheduler, SchedulerConfig, SchedulerError};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), SchedulerError> {
/// let scheduler = RequestScheduler::new(SchedulerConfig {
///     max_parallel: 2,
///     min_interval: Duration::from_millis(10),
/// })?;
///
/// let value = scheduler.enqueue(|| async { Ok::<_, SchedulerError>(42) }).await?;
/// assert_eq!(value, 42);
/// # Ok(())
/// # }
/// ```
pub struct RequestScheduler {
    config: SchedulerConfig,
    semaphore: Arc<Semaphore>,
    counters: Arc<Counters>,
    sender: Mutex<Option<mpsc::UnboundedSender<Job>>>,
}

impl std::fmt::Debug for RequestScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestScheduler")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}

impl RequestScheduler {
    /// Create a scheduler with the given limits
    pub fn new(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        config.validate()?;
        Ok(Self {
            semaphore: Arc::new(Semaphore::new(config.max_parallel)),
            counters: Arc::new(Counters::default()),
            sender: Mutex::new(None),
            config,
        })
    }

    /// Scheduler limits
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Snapshot of queue depth and activity
    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            queued: self.counters.queued.load(Ordering::SeqCst),
            active: self.counters.active.load(Ordering::SeqCst),
            dispatched: self.counters.dispatched.load(Ordering::SeqCst),
        }
    }

    /// Append `task` to the queue and wait for its result.
    ///
    /// The task is queued when `enqueue` is called, not when the returned
    /// future is first polled, so queue order is call order. Scheduler
    /// failures are converted into the task's error type.
    pub fn enqueue<F, Fut, T, E>(&self, task: F) -> impl Future<Output = Result<T, E>> + Send
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: From<SchedulerError> + Send + 'static,
    {
        let submitted = self.submit(task);
        async move {
            match submitted {
                Ok(receiver) => {
                    receiver.await.unwrap_or_else(|_| Err(E::from(SchedulerError::Closed)))
                }
                Err(err) => Err(E::from(err)),
            }
        }
    }

    fn submit<F, Fut, T, E>(
        &self,
        task: F,
    ) -> Result<oneshot::Receiver<Result<T, E>>, SchedulerError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel();
        let job: Job = Box::new(move || {
            Box::pin(async move {
                // Receiver may be gone; the task still ran.
                let _ = result_tx.send(task().await);
            })
        });

        let sender = self.sender()?;
        self.counters.queued.fetch_add(1, Ordering::SeqCst);
        if sender.send(job).is_err() {
            self.counters.queued.fetch_sub(1, Ordering::SeqCst);
            return Err(SchedulerError::Closed);
        }
        Ok(result_rx)
    }

    /// Sender to the live dispatcher, spawning one if none is running.
    fn sender(&self) -> Result<mpsc::UnboundedSender<Job>, SchedulerError> {
        let mut slot = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(sender) = slot.as_ref().filter(|s| !s.is_closed()) {
            return Ok(sender.clone());
        }

        let handle = Handle::try_current().map_err(|_| SchedulerError::NoRuntime)?;
        let (sender, receiver) = mpsc::unbounded_channel();
        handle.spawn(dispatch_loop(
            receiver,
            Arc::clone(&self.semaphore),
            Arc::clone(&self.counters),
            self.config.min_interval,
        ));
        debug!(
            max_parallel = self.config.max_parallel,
            min_interval_ms = self.config.min_interval.as_millis() as u64,
            "request scheduler started"
        );
        *slot = Some(sender.clone());
        Ok(sender)
    }
}

async fn dispatch_loop(
    mut receiver: mpsc::UnboundedReceiver<Job>,
    semaphore: Arc<Semaphore>,
    counters: Arc<Counters>,
    min_interval: Duration,
) {
    let mut last_dispatch: Option<Instant> = None;

    while let Some(job) = receiver.recv().await {
        let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
            break;
        };

        if let Some(last) = last_dispatch {
            let elapsed = last.elapsed();
            if elapsed < min_interval {
                let wait = min_interval - elapsed;
                trace!(wait_ms = wait.as_millis() as u64, "spacing dispatch");
                tokio::time::sleep(wait).await;
            }
        }
        last_dispatch = Some(Instant::now());

        counters.queued.fetch_sub(1, Ordering::SeqCst);
        counters.active.fetch_add(1, Ordering::SeqCst);
        let sequence = counters.dispatched.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(
            sequence,
            active = counters.active.load(Ordering::SeqCst),
            queued = counters.queued.load(Ordering::SeqCst),
            "dispatching task"
        );

        let guard = ActiveGuard(Arc::clone(&counters));
        tokio::spawn(async move {
            let _permit = permit;
            let _guard = guard;
            job().await;
        });
    }

    trace!("request scheduler stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler(max_parallel: usize, min_interval_ms: u64) -> RequestScheduler {
        RequestScheduler::new(SchedulerConfig {
            max_parallel,
            min_interval: Duration::from_millis(min_interval_ms),
        })
        .unwrap()
    }

    #[test]
    fn zero_parallelism_is_rejected() {
        let err = RequestScheduler::new(SchedulerConfig {
            max_parallel: 0,
            min_interval: Duration::ZERO,
        })
        .unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidConfiguration(_)));
    }

    #[test]
    fn default_limits() {
        let config = SchedulerConfig::default();
        assert_eq!(config.max_parallel, 6);
        assert_eq!(config.min_interval, Duration::from_millis(150));
    }

    #[test]
    fn enqueue_outside_runtime_fails() {
        let scheduler = scheduler(1, 0);
        let result = futures::executor::block_on(
            scheduler.enqueue(|| async { Ok::<_, SchedulerError>(()) }),
        );
        assert_eq!(result, Err(SchedulerError::NoRuntime));
        assert_eq!(scheduler.stats(), SchedulerStats::default());
    }

    #[tokio::test(start_paused = true)]
    async fn task_error_is_forwarded_unchanged() {
        #[derive(Debug, PartialEq)]
        enum TaskError {
            Boom(&'static str),
            Scheduler(SchedulerError),
        }

        impl From<SchedulerError> for TaskError {
            fn from(err: SchedulerError) -> Self {
                Self::Scheduler(err)
            }
        }

        let scheduler = scheduler(2, 0);
        let failed = scheduler.enqueue(|| async { Err::<(), _>(TaskError::Boom("upstream")) });
        let ok = scheduler.enqueue(|| async { Ok::<_, TaskError>(7) });

        assert_eq!(failed.await, Err(TaskError::Boom("upstream")));
        assert_eq!(ok.await, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn stats_track_dispatches() {
        let scheduler = scheduler(1, 0);
        for i in 0..3u8 {
            let value = scheduler.enqueue(move || async move { Ok::<_, SchedulerError>(i) }).await;
            assert_eq!(value, Ok(i));
        }

        tokio::task::yield_now().await;
        let stats = scheduler.stats();
        assert_eq!(stats.dispatched, 3);
        assert_eq!(stats.queued, 0);
    }
}
