//! Single-video parallel extraction.
//!
//! The splitter divides one video's frame count into disjoint chunks and
//! runs one [`extract_range`](crate::extract_range) invocation per chunk on
//! a dedicated thread pool. Every chunk worker opens its own demuxer and
//! decoder, so there is no shared decode state.
//!
//! Two variants cover the two sink disciplines:
//!
//! - [`split_and_extract`] for sinks that tolerate concurrent writers on
//!   disjoint indices (the directory layout) — each chunk gets its own store
//!   handle from a factory.
//! - [`split_and_extract_funneled`] for single-writer sinks (the container
//!   layout) — chunk workers decode and compress in parallel and funnel
//!   `(index, payload)` pairs through a bounded channel to one thread that
//!   owns the store for its whole lifetime.

use std::path::Path;

use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::{
    chunk::plan_chunks,
    codec::FrameCodec,
    error::FramepackError,
    extract::extract_range,
    progress::CancellationToken,
    source::VideoSource,
    store::FrameStore,
};

/// Capacity of the funnel channel between chunk workers and the writer
/// thread; bounds memory to a handful of in-flight compressed frames.
const FUNNEL_CAPACITY: usize = 32;

/// Split `video_path` into `workers` chunks and extract them concurrently,
/// each chunk writing through its own store handle from `sink_factory`.
///
/// The factory is called once per non-empty chunk; every handle must target
/// the same store and the store must be safe for concurrent disjoint-index
/// writers (see [`DirectoryStore::attach`](crate::DirectoryStore::attach)).
///
/// Blocks until every chunk reaches a terminal state. Returns the total
/// number of frames written.
///
/// # Errors
///
/// Setup errors (video unopenable, store handle creation, thread-pool
/// construction) abort the call. Mid-stream decode failures inside a chunk
/// do not: that chunk just ends early.
pub fn split_and_extract<F>(
    video_path: &Path,
    workers: usize,
    codec: &FrameCodec,
    sink_factory: F,
    cancel: Option<&CancellationToken>,
) -> Result<u64, FramepackError>
where
    F: Fn() -> Result<Box<dyn FrameStore>, FramepackError> + Sync,
{
    let workers = workers.max(1);
    // Probe the frame count, then release the handle; chunk workers open
    // their own.
    let total_frames = VideoSource::probe(video_path)?.frame_count;
    let chunks = plan_chunks(total_frames, workers);

    let pool = build_pool(workers)?;

    let written: Result<Vec<u64>, FramepackError> = pool.install(|| {
        chunks
            .into_par_iter()
            .filter(|chunk| !chunk.is_empty())
            .map(|chunk| {
                if cancel.is_some_and(CancellationToken::is_cancelled) {
                    return Err(FramepackError::Cancelled);
                }
                let mut store = sink_factory()?;
                let count = extract_range(video_path, chunk, codec, &mut |index, payload| {
                    store.write_frame(index, &payload)
                })?;
                store.finish()?;
                Ok(count)
            })
            .collect()
    });

    Ok(written?.into_iter().sum())
}

/// Split `video_path` into `workers` chunks, decode and compress them
/// concurrently, and funnel every frame through a single writer thread that
/// owns `store` for its whole lifetime.
///
/// This is the discipline single-writer sinks require: chunk workers never
/// touch the store handle; they send `(index, payload)` over a bounded
/// channel and the owning thread performs every write and the final
/// [`finish`](FrameStore::finish).
///
/// Returns the total number of frames written.
///
/// # Errors
///
/// Setup errors abort the call. Storage and duplicate-index errors from the
/// writer thread take precedence over the secondary send failures they cause
/// in chunk workers.
pub fn split_and_extract_funneled(
    video_path: &Path,
    workers: usize,
    codec: &FrameCodec,
    store: Box<dyn FrameStore>,
    cancel: Option<&CancellationToken>,
) -> Result<u64, FramepackError> {
    let workers = workers.max(1);
    let total_frames = VideoSource::probe(video_path)?.frame_count;
    let chunks = plan_chunks(total_frames, workers);
    let store_path = store.path().to_path_buf();

    let pool = build_pool(workers)?;

    let (frame_tx, frame_rx) = crossbeam_channel::bounded::<(u64, Vec<u8>)>(FUNNEL_CAPACITY);

    let writer = std::thread::spawn(move || -> Result<u64, FramepackError> {
        let mut store = store;
        let mut written = 0u64;
        for (index, payload) in frame_rx {
            store.write_frame(index, &payload)?;
            written += 1;
        }
        store.finish()?;
        Ok(written)
    });

    let decode_result: Result<Vec<u64>, FramepackError> = pool.install(|| {
        chunks
            .into_par_iter()
            .filter(|chunk| !chunk.is_empty())
            .map(|chunk| {
                if cancel.is_some_and(CancellationToken::is_cancelled) {
                    return Err(FramepackError::Cancelled);
                }
                let sender = frame_tx.clone();
                extract_range(video_path, chunk, codec, &mut |index, payload| {
                    sender
                        .send((index, payload))
                        .map_err(|_| FramepackError::Storage {
                            path: store_path.clone(),
                            reason: "frame writer terminated early".to_string(),
                        })
                })
            })
            .collect()
    });

    // Close the channel so the writer drains and finalizes.
    drop(frame_tx);

    let writer_result = writer
        .join()
        .map_err(|_| FramepackError::ThreadPool("frame writer thread panicked".to_string()))?;

    // A writer-side failure is the root cause of any send failures the
    // chunk workers saw; report it first.
    let written = writer_result?;
    decode_result?;

    Ok(written)
}

fn build_pool(workers: usize) -> Result<rayon::ThreadPool, FramepackError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|error| FramepackError::ThreadPool(error.to_string()))
}
