//! # framepack
//!
//! Turn long-form videos into frame-indexed, randomly accessible,
//! JPEG-compressed datasets.
//!
//! `framepack` decodes every frame of a video in presentation order,
//! normalizes it to a fixed resolution, compresses it independently, and
//! persists it into a per-video frame store that supports O(1) retrieval by
//! frame index — without ever holding the decoded video in memory. Decoding
//! is powered by FFmpeg via the
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate.
//!
//! ## Quick Start
//!
//! ### Pack one video
//!
//! ```no_run
//! use std::path::Path;
//!
//! use framepack::{ExtractOptions, pack_video};
//!
//! let options = ExtractOptions::new().with_resolution(224, 224);
//! let frames = pack_video(
//!     Path::new("input.mp4"),
//!     Path::new("dataset/input.zip"),
//!     &options,
//! )?;
//! println!("stored {frames} frames");
//! # Ok::<(), framepack::FramepackError>(())
//! ```
//!
//! ### Pack a manifest of videos
//!
//! ```no_run
//! use std::path::Path;
//!
//! use framepack::{ExtractOptions, build_jobs, load_manifest, pack_all};
//!
//! let options = ExtractOptions::new().with_workers(8);
//! let entries = load_manifest(Path::new("clips.json"))?;
//! let jobs = build_jobs(&entries, Path::new("videos"), Path::new("dataset"), options.layout())?;
//!
//! let report = pack_all(jobs, &options);
//! println!("{} ok, {} failed", report.succeeded.len(), report.failed.len());
//! # Ok::<(), framepack::FramepackError>(())
//! ```
//!
//! ### Read a frame back
//!
//! ```no_run
//! use std::path::Path;
//!
//! use framepack::{FrameCodec, StorageLayout};
//!
//! let payload = StorageLayout::Container.read_frame(Path::new("dataset/input.zip"), 1234)?;
//! let image = FrameCodec::decode(&payload)?;
//! image.save("frame_1234.png")?;
//! # Ok::<(), framepack::FramepackError>(())
//! ```
//!
//! ## Concurrency
//!
//! Two strategies, selected by [`PackStrategy`], never combined:
//!
//! - **Inter-video** (default): a sliding-window worker pool keeps up to N
//!   whole-video jobs in flight, replenishing the moment one finishes. Each
//!   video decodes sequentially with a single store writer.
//! - **Intra-video**: one video at a time, its frame range split into N
//!   disjoint chunks decoded concurrently. Chunk workers share a directory
//!   store through per-chunk handles, or funnel through a single owning
//!   writer thread for container stores.
//!
//! A failed video never aborts its siblings; the final [`PoolReport`] names
//! every job that succeeded, failed, or was skipped.
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod chunk;
pub mod codec;
pub mod error;
pub mod extract;
pub mod manifest;
pub mod options;
pub mod pack;
pub mod pool;
pub mod progress;
pub mod source;
pub mod split;
pub mod store;

pub use chunk::{FrameChunk, plan_chunks};
pub use codec::{DEFAULT_JPEG_QUALITY, DEFAULT_RESOLUTION, FrameCodec};
pub use error::FramepackError;
pub use extract::extract_range;
pub use manifest::{ClipEntry, build_jobs, load_manifest};
pub use options::ExtractOptions;
pub use pack::{PackStrategy, pack_all, pack_video};
pub use pool::{Job, PoolReport, WorkerPool};
pub use progress::{CancellationToken, ProgressCallback, ProgressInfo};
pub use source::{VideoInfo, VideoSource};
pub use split::{split_and_extract, split_and_extract_funneled};
pub use store::{ContainerStore, DirectoryStore, FRAME_EXTENSION, FrameStore, StorageLayout};
