//! Dynamic bounded worker pool for whole-video jobs.
//!
//! [`WorkerPool`] drains a job queue across a fixed number of concurrent
//! slots with sliding-window scheduling: the moment any running job reaches
//! a terminal state, the next queued job launches, keeping the running set
//! at its cap until the queue is empty. Batches never wait on a barrier.
//!
//! Failures — including panics — inside one job are caught at the job
//! boundary, recorded, and never affect sibling jobs.

use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    path::PathBuf,
    sync::Arc,
    time::Instant,
};

use crate::{
    error::FramepackError,
    progress::{CancellationToken, NoOpProgress, ProgressCallback, ProgressInfo},
};

/// One unit of pool work: extract one whole video into one output target.
///
/// Immutable once enqueued; consumed by exactly one worker slot.
#[derive(Debug, Clone)]
pub struct Job {
    /// Path of the source video.
    pub video: PathBuf,
    /// Path of the frame store this job writes.
    pub output: PathBuf,
    /// Identifier used in progress updates and the final report.
    pub label: String,
}

impl Job {
    /// Create a job, deriving the label from the video's file stem.
    pub fn new(video: PathBuf, output: PathBuf) -> Self {
        let label = video
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| video.to_string_lossy().into_owned());
        Self {
            video,
            output,
            label,
        }
    }

    /// Create a job with an explicit label (e.g. a manifest clip id).
    pub fn with_label(video: PathBuf, output: PathBuf, label: impl Into<String>) -> Self {
        Self {
            video,
            output,
            label: label.into(),
        }
    }
}

/// Terminal summary of one pool run. Every enqueued job appears in exactly
/// one of the three lists.
#[derive(Debug, Default)]
#[must_use]
pub struct PoolReport {
    /// Labels of jobs that completed successfully, with their frame counts.
    pub succeeded: Vec<(String, u64)>,
    /// Labels of jobs that failed, with the error that stopped them.
    pub failed: Vec<(String, FramepackError)>,
    /// Labels of jobs that were never launched because the batch was
    /// cancelled first.
    pub skipped: Vec<String>,
}

impl PoolReport {
    /// Total number of jobs that entered the pool.
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len() + self.skipped.len()
    }

    /// Whether every job completed successfully.
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }

    /// Total frames written across all successful jobs.
    pub fn frames_written(&self) -> u64 {
        self.succeeded.iter().map(|(_, frames)| frames).sum()
    }
}

/// Fixed-capacity job scheduler with sliding-window replenishment.
pub struct WorkerPool {
    max_workers: usize,
    progress: Arc<dyn ProgressCallback>,
    cancel: Option<CancellationToken>,
}

impl WorkerPool {
    /// Create a pool with an explicit concurrency bound.
    ///
    /// The bound is a configuration value, never read from the environment
    /// here; callers resolve defaults (see
    /// [`ExtractOptions::resolved_workers`](crate::ExtractOptions::resolved_workers)).
    /// A bound of zero is clamped to one.
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
            progress: Arc::new(NoOpProgress),
            cancel: None,
        }
    }

    /// Attach a progress observer, called once per terminal job.
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Attach a cancellation token. Once cancelled, no further queued jobs
    /// launch; in-flight jobs run to their terminal state and unlaunched
    /// jobs are reported as skipped.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Configured concurrency bound.
    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Drain `jobs`, running `worker` on each with at most
    /// [`max_workers`](WorkerPool::max_workers) jobs in flight at any
    /// instant.
    ///
    /// `worker` returns the number of frames the job wrote. An `Err` — or a
    /// panic — marks that job failed and leaves every other job untouched.
    /// Blocks until all jobs reach a terminal state and returns the report.
    pub fn run<W>(&self, jobs: Vec<Job>, worker: W) -> PoolReport
    where
        W: Fn(&Job) -> Result<u64, FramepackError> + Send + Sync,
    {
        let total = jobs.len() as u64;
        let started = Instant::now();
        let mut report = PoolReport::default();

        log::debug!(
            "Draining {} job(s) across {} worker slot(s)",
            jobs.len(),
            self.max_workers,
        );

        let (done_tx, done_rx) =
            crossbeam_channel::unbounded::<(usize, Result<u64, FramepackError>)>();

        std::thread::scope(|scope| {
            let worker = &worker;
            let mut queue = jobs.iter().enumerate();
            let mut in_flight = 0usize;

            // Fill the window.
            while in_flight < self.max_workers && !self.is_cancelled() {
                let Some((slot, job)) = queue.next() else {
                    break;
                };
                let done = done_tx.clone();
                scope.spawn(move || {
                    let outcome = run_isolated(worker, job);
                    let _ = done.send((slot, outcome));
                });
                in_flight += 1;
            }

            // Replenish as jobs finish, keeping the window full.
            let mut completed = 0u64;
            while in_flight > 0 {
                let Ok((slot, outcome)) = done_rx.recv() else {
                    break;
                };
                in_flight -= 1;
                completed += 1;

                let label = jobs[slot].label.clone();
                match outcome {
                    Ok(frames) => report.succeeded.push((label.clone(), frames)),
                    Err(error) => {
                        log::warn!("Job {label} failed: {error}");
                        report.failed.push((label.clone(), error));
                    }
                }

                self.progress.on_progress(&ProgressInfo {
                    completed,
                    total,
                    failed: report.failed.len() as u64,
                    video: Some(label),
                    elapsed: started.elapsed(),
                });

                if !self.is_cancelled() {
                    if let Some((slot, job)) = queue.next() {
                        let done = done_tx.clone();
                        scope.spawn(move || {
                            let outcome = run_isolated(worker, job);
                            let _ = done.send((slot, outcome));
                        });
                        in_flight += 1;
                    }
                }
            }

            // Anything still queued was never launched.
            report
                .skipped
                .extend(queue.map(|(_, job)| job.label.clone()));
        });

        report
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}

/// Run one job, converting a panic into a recorded failure so it cannot
/// take down the scheduling loop or sibling jobs.
fn run_isolated<W>(worker: &W, job: &Job) -> Result<u64, FramepackError>
where
    W: Fn(&Job) -> Result<u64, FramepackError>,
{
    catch_unwind(AssertUnwindSafe(|| worker(job))).unwrap_or_else(|panic| {
        let message = panic
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "worker panicked".to_string());
        Err(FramepackError::ThreadPool(format!(
            "job {} panicked: {message}",
            job.label,
        )))
    })
}
