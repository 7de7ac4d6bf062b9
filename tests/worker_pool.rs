//! Worker-pool scheduling tests: concurrency cap, sliding-window
//! replenishment, failure isolation, and terminal accounting.

use std::{
    path::PathBuf,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    thread::sleep,
    time::Duration,
};

use framepack::{
    CancellationToken, FramepackError, Job, ProgressCallback, ProgressInfo, WorkerPool,
};

fn fake_jobs(count: usize) -> Vec<Job> {
    (0..count)
        .map(|i| {
            Job::with_label(
                PathBuf::from(format!("video-{i}.mp4")),
                PathBuf::from(format!("out-{i}.zip")),
                format!("video-{i}"),
            )
        })
        .collect()
}

#[test]
fn concurrency_never_exceeds_cap() {
    let max_workers = 3;
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let pool = WorkerPool::new(max_workers);
    let report = pool.run(fake_jobs(10), |_job| {
        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        sleep(Duration::from_millis(20));
        running.fetch_sub(1, Ordering::SeqCst);
        Ok(1)
    });

    assert!(peak.load(Ordering::SeqCst) <= max_workers);
    assert_eq!(report.succeeded.len(), 10);
    assert!(report.all_succeeded());
}

#[test]
fn every_job_reaches_a_terminal_state_exactly_once() {
    let pool = WorkerPool::new(4);
    let report = pool.run(fake_jobs(9), |job| {
        if job.label.ends_with('4') {
            Err(FramepackError::FrameDecode("poisoned stream".to_string()))
        } else {
            Ok(10)
        }
    });

    assert_eq!(report.total(), 9);
    assert_eq!(report.succeeded.len(), 8);
    assert_eq!(report.failed.len(), 1);
    assert!(report.skipped.is_empty());

    let mut labels: Vec<String> = report
        .succeeded
        .iter()
        .map(|(label, _)| label.clone())
        .chain(report.failed.iter().map(|(label, _)| label.clone()))
        .collect();
    labels.sort();
    labels.dedup();
    assert_eq!(labels.len(), 9, "a job was reported more than once");
}

#[test]
fn one_corrupt_video_does_not_affect_the_rest() {
    let pool = WorkerPool::new(2);
    let report = pool.run(fake_jobs(5), |job| {
        if job.label == "video-2" {
            Err(FramepackError::FileOpen {
                path: job.video.clone(),
                reason: "moov atom not found".to_string(),
            })
        } else {
            Ok(100)
        }
    });

    assert_eq!(report.succeeded.len(), 4);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "video-2");
    assert_eq!(report.frames_written(), 400);
    assert!(!report.all_succeeded());
}

#[test]
fn panicking_job_is_recorded_as_failed() {
    let pool = WorkerPool::new(2);
    let report = pool.run(fake_jobs(4), |job| {
        if job.label == "video-1" {
            panic!("chunk math went sideways");
        }
        Ok(1)
    });

    assert_eq!(report.succeeded.len(), 3);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "video-1");
    assert!(matches!(
        report.failed[0].1,
        FramepackError::ThreadPool(_),
    ));
}

#[test]
fn zero_worker_bound_is_clamped() {
    let pool = WorkerPool::new(0);
    assert_eq!(pool.max_workers(), 1);

    let report = pool.run(fake_jobs(2), |_job| Ok(1));
    assert_eq!(report.succeeded.len(), 2);
}

#[test]
fn empty_queue_completes_immediately() {
    let pool = WorkerPool::new(4);
    let report = pool.run(Vec::new(), |_job| Ok(1));
    assert_eq!(report.total(), 0);
    assert!(report.all_succeeded());
}

struct RecordingProgress {
    seen: Mutex<Vec<ProgressInfo>>,
}

impl ProgressCallback for RecordingProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.seen.lock().unwrap().push(info.clone());
    }
}

#[test]
fn progress_counter_is_monotonic_and_complete() {
    let recorder = Arc::new(RecordingProgress {
        seen: Mutex::new(Vec::new()),
    });

    let pool = WorkerPool::new(3).with_progress(recorder.clone());
    let report = pool.run(fake_jobs(7), |_job| Ok(1));
    assert_eq!(report.succeeded.len(), 7);

    let seen = recorder.seen.lock().unwrap();
    assert_eq!(seen.len(), 7);
    for (i, info) in seen.iter().enumerate() {
        assert_eq!(info.completed, i as u64 + 1);
        assert_eq!(info.total, 7);
        assert!(info.video.is_some());
    }
}

#[test]
fn cancelled_pool_skips_unlaunched_jobs() {
    let token = CancellationToken::new();
    token.cancel();

    let launched = Arc::new(AtomicUsize::new(0));
    let pool = WorkerPool::new(2).with_cancellation(token);
    let report = pool.run(fake_jobs(6), |_job| {
        launched.fetch_add(1, Ordering::SeqCst);
        Ok(1)
    });

    assert_eq!(launched.load(Ordering::SeqCst), 0, "no job should launch");
    assert_eq!(report.skipped.len(), 6);
    assert_eq!(report.total(), 6);
}
