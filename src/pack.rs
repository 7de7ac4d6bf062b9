//! Top-level packing pipeline.
//!
//! Ties the pieces together: [`pack_video`] converts one video into one
//! frame store, [`pack_all`] drains a whole job list through the
//! [`WorkerPool`](crate::WorkerPool). The concurrency strategy decides where
//! the parallelism lives; the two modes are alternatives, never combined.

use std::path::Path;

use crate::{
    chunk::FrameChunk,
    error::FramepackError,
    extract::extract_range,
    options::ExtractOptions,
    pool::{Job, PoolReport, WorkerPool},
    source::VideoSource,
    split::{split_and_extract, split_and_extract_funneled},
    store::{DirectoryStore, FrameStore, StorageLayout},
};

/// Where the worker threads are spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PackStrategy {
    /// One worker slot per video; each video is decoded sequentially,
    /// start to end. The default: it pairs with any storage layout and
    /// keeps exactly one writer per store.
    #[default]
    InterVideo,
    /// Videos are processed one at a time; each video's frame range is
    /// split across all workers.
    IntraVideo,
}

/// Extract every frame of `video_path` into a store at `store_path`.
///
/// The store is created (overwriting any previous one) after the video has
/// been probed, stays open for the duration of the extraction, and is
/// finalized exactly once — also when extraction ends early. A video with
/// zero frames yields a valid, empty store and reports success.
///
/// Returns the number of frames written.
///
/// # Errors
///
/// Setup errors (unopenable video, unwritable store path), storage errors,
/// and duplicate-index violations are fatal to this video. Individual frame
/// failures are skipped and logged, not returned.
pub fn pack_video(
    video_path: &Path,
    store_path: &Path,
    options: &ExtractOptions,
) -> Result<u64, FramepackError> {
    match options.strategy {
        PackStrategy::InterVideo => pack_video_sequential(video_path, store_path, options),
        PackStrategy::IntraVideo => pack_video_split(video_path, store_path, options),
    }
}

/// Whole-video sequential extraction: one decode handle, one store writer.
fn pack_video_sequential(
    video_path: &Path,
    store_path: &Path,
    options: &ExtractOptions,
) -> Result<u64, FramepackError> {
    let total_frames = VideoSource::probe(video_path)?.frame_count;
    let codec = options.codec();

    let mut store = options.layout.create_store(store_path)?;
    let written = extract_range(
        video_path,
        FrameChunk::new(0, total_frames),
        &codec,
        &mut |index, payload| store.write_frame(index, &payload),
    )?;
    store.finish()?;

    log::info!(
        "Packed {written}/{total_frames} frame(s) of {} into {}",
        video_path.display(),
        store_path.display(),
    );

    ensure_not_all_failed(video_path, total_frames, written)?;
    Ok(written)
}

/// A job that skipped some frames is still a success; a job where every
/// frame failed is not.
fn ensure_not_all_failed(
    video_path: &Path,
    total_frames: u64,
    written: u64,
) -> Result<(), FramepackError> {
    if total_frames > 0 && written == 0 {
        return Err(FramepackError::FrameDecode(format!(
            "no frame of {} could be decoded",
            video_path.display(),
        )));
    }
    Ok(())
}

/// Intra-video extraction: the frame range is split across chunk workers.
fn pack_video_split(
    video_path: &Path,
    store_path: &Path,
    options: &ExtractOptions,
) -> Result<u64, FramepackError> {
    let workers = options.resolved_workers();
    let codec = options.codec();
    let total_frames = VideoSource::probe(video_path)?.frame_count;

    let written = match options.layout {
        // Disjoint chunks write disjoint filenames; every worker holds its
        // own handle on the shared directory.
        StorageLayout::ImageDirectory => {
            DirectoryStore::create(store_path)?;
            split_and_extract(
                video_path,
                workers,
                &codec,
                || {
                    let handle = DirectoryStore::attach(store_path)?;
                    Ok(Box::new(handle) as Box<dyn FrameStore>)
                },
                options.cancel.as_ref(),
            )?
        }
        // A container tolerates only one writer; chunk workers funnel
        // frames through the thread that owns it.
        StorageLayout::Container => {
            let store = options.layout.create_store(store_path)?;
            split_and_extract_funneled(
                video_path,
                workers,
                &codec,
                store,
                options.cancel.as_ref(),
            )?
        }
    };

    log::info!(
        "Packed {written}/{total_frames} frame(s) of {} into {} across {workers} worker(s)",
        video_path.display(),
        store_path.display(),
    );

    ensure_not_all_failed(video_path, total_frames, written)?;
    Ok(written)
}

/// Drain a job list through the worker pool using the configured strategy.
///
/// Inter-video mode runs up to the configured worker count of videos
/// concurrently, each sequential inside. Intra-video mode runs one video at
/// a time, split across the workers. Every job reaches a terminal state;
/// per-job failures are isolated and listed in the report.
pub fn pack_all(jobs: Vec<Job>, options: &ExtractOptions) -> PoolReport {
    let pool_slots = match options.strategy {
        PackStrategy::InterVideo => options.resolved_workers(),
        PackStrategy::IntraVideo => 1,
    };

    let mut pool = WorkerPool::new(pool_slots).with_progress(options.progress.clone());
    if let Some(token) = &options.cancel {
        pool = pool.with_cancellation(token.clone());
    }

    pool.run(jobs, |job| pack_video(&job.video, &job.output, options))
}
