//! Progress reporting and cancellation support.
//!
//! The worker pool owns a single thread-safe completion counter and publishes
//! snapshots of it through [`ProgressCallback`]; which thread happens to
//! finish a job never matters to the observer. [`CancellationToken`] offers
//! cooperative cancellation: the pool stops launching queued jobs once the
//! token trips, and jobs already in flight run to their terminal state.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;

/// A snapshot of batch progress, delivered after each job reaches a terminal
/// state.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Jobs that have reached a terminal state so far (success or failure).
    pub completed: u64,
    /// Total jobs in the batch.
    pub total: u64,
    /// How many of the completed jobs failed.
    pub failed: u64,
    /// Label of the job that just finished, when known.
    pub video: Option<String>,
    /// Wall-clock time since the pool started draining the queue.
    pub elapsed: Duration,
}

/// Trait for receiving progress updates while a batch is processed.
///
/// Implementations must be [`Send`] and [`Sync`]: callbacks are invoked from
/// the pool's scheduling loop while worker threads are running.
///
/// Progress callbacks are infallible; they observe but cannot halt the batch.
/// Use [`CancellationToken`] for cooperative cancellation.
pub trait ProgressCallback: Send + Sync {
    /// Called once per job after it reaches a terminal state.
    fn on_progress(&self, info: &ProgressInfo);
}

/// A no-op implementation that discards all progress notifications.
///
/// This is the default when no callback is configured.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// Clones share state; call [`cancel`](CancellationToken::cancel) from any
/// thread (or a signal handler) and every holder of a clone observes it.
///
/// # Example
///
/// ```
/// use framepack::CancellationToken;
///
/// let token = CancellationToken::new();
/// let observer = token.clone();
/// assert!(!observer.is_cancelled());
///
/// token.cancel();
/// assert!(observer.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, non-cancelled token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
