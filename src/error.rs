//! Error types for the `framepack` crate.
//!
//! This module defines [`FramepackError`], the unified error type returned by
//! all fallible operations in the crate. Variants carry enough context (file
//! paths, frame indices, upstream messages) to diagnose a failed video job
//! from the pool's final report alone.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

/// The unified error type for all `framepack` operations.
///
/// Every public method that can fail returns `Result<T, FramepackError>`.
///
/// The variants fall into the failure classes the pipeline distinguishes:
/// setup errors ([`FileOpen`](FramepackError::FileOpen),
/// [`NoVideoStream`](FramepackError::NoVideoStream)) and storage errors
/// ([`Storage`](FramepackError::Storage)) are fatal to the video job they
/// occur in but never to sibling jobs; per-frame errors
/// ([`FrameDecode`](FramepackError::FrameDecode),
/// [`FrameEncode`](FramepackError::FrameEncode)) are recovered internally by
/// skipping the frame and only surface in logs;
/// [`DuplicateIndex`](FramepackError::DuplicateIndex) signals a chunk
/// assignment bug and is always fatal to the job.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FramepackError {
    /// The video file could not be opened for decoding.
    #[error("Failed to open video at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to [`crate::VideoSource::open`].
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The file does not contain a video stream.
    #[error("No video stream found in {path}")]
    NoVideoStream {
        /// Path of the offending file.
        path: PathBuf,
    },

    /// A single frame failed to decode. Recovered by the extractor; callers
    /// only see this through logs.
    #[error("Failed to decode frame: {0}")]
    FrameDecode(String),

    /// A single frame failed to resize or compress. Recovered by the
    /// extractor; callers only see this through logs.
    #[error("Failed to encode frame {index}: {reason}")]
    FrameEncode {
        /// Absolute frame index of the dropped frame.
        index: u64,
        /// Underlying reason the encode failed.
        reason: String,
    },

    /// A frame index was written twice to the same store handle. This can
    /// only happen if chunk assignment is broken, so it is fatal to the job.
    #[error("Frame {index} was already written to store {store}")]
    DuplicateIndex {
        /// The frame index that collided.
        index: u64,
        /// Path of the store the write targeted.
        store: PathBuf,
    },

    /// A read-back request named a frame index the store does not contain.
    #[error("Store {store} has no entry for frame {index}")]
    MissingFrame {
        /// The requested frame index.
        index: u64,
        /// Path of the store that was queried.
        store: PathBuf,
    },

    /// Creating, writing, or finalizing a frame store failed. Fatal to the
    /// job; partially written output is left as-is.
    #[error("Frame store error at {path}: {reason}")]
    Storage {
        /// Path of the store.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },

    /// The clip manifest could not be read or parsed.
    #[error("Failed to load manifest {path}: {reason}")]
    Manifest {
        /// Path of the manifest file.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },

    /// A manifest entry references a video that does not exist on disk.
    /// Raised before any job is enqueued.
    #[error("Manifest references missing video: {path}")]
    MissingVideo {
        /// The path that was expected to exist.
        path: PathBuf,
    },

    /// Spawning or joining worker threads failed, or a worker panicked.
    #[error("Worker error: {0}")]
    ThreadPool(String),

    /// The operation was cancelled via a [`CancellationToken`](crate::CancellationToken).
    #[error("Operation cancelled")]
    Cancelled,

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    Ffmpeg(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// An error from the `image` crate during frame encoding or decoding.
    #[error("Image processing error: {0}")]
    Image(#[from] ImageError),
}

impl From<FfmpegError> for FramepackError {
    fn from(error: FfmpegError) -> Self {
        FramepackError::Ffmpeg(error.to_string())
    }
}
