//! Extraction configuration.
//!
//! [`ExtractOptions`] is a builder that threads the target resolution,
//! compression quality, concurrency settings, and progress/cancellation
//! hooks through the pipeline without polluting every function signature.
//!
//! # Example
//!
//! ```
//! use framepack::{ExtractOptions, PackStrategy, StorageLayout};
//!
//! let options = ExtractOptions::new()
//!     .with_resolution(224, 224)
//!     .with_jpeg_quality(90)
//!     .with_workers(8)
//!     .with_layout(StorageLayout::Container)
//!     .with_strategy(PackStrategy::InterVideo);
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;
use std::thread::available_parallelism;

use crate::{
    codec::{DEFAULT_JPEG_QUALITY, DEFAULT_RESOLUTION, FrameCodec},
    pack::PackStrategy,
    progress::{CancellationToken, NoOpProgress, ProgressCallback},
    store::StorageLayout,
};

/// Configuration for a packing run.
///
/// All settings have working defaults: 224×224 frames, JPEG quality 90,
/// container storage, inter-video parallelism, worker count = available
/// CPU parallelism.
#[derive(Clone)]
#[must_use]
pub struct ExtractOptions {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) jpeg_quality: u8,
    pub(crate) workers: Option<usize>,
    pub(crate) layout: StorageLayout,
    pub(crate) strategy: PackStrategy,
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) cancel: Option<CancellationToken>,
}

impl ExtractOptions {
    /// Create options with all defaults.
    pub fn new() -> Self {
        let (width, height) = DEFAULT_RESOLUTION;
        Self {
            width,
            height,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            workers: None,
            layout: StorageLayout::default(),
            strategy: PackStrategy::default(),
            progress: Arc::new(NoOpProgress),
            cancel: None,
        }
    }

    /// Set the fixed target resolution frames are normalized to before
    /// compression. Zero dimensions are clamped to 1.
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width.max(1);
        self.height = height.max(1);
        self
    }

    /// Set the JPEG quality (1–100, clamped).
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Set an explicit worker count. Without this, the available CPU
    /// parallelism is used.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers.max(1));
        self
    }

    /// Choose the on-disk store representation.
    pub fn with_layout(mut self, layout: StorageLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Choose the concurrency strategy.
    pub fn with_strategy(mut self, strategy: PackStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Attach a progress observer for the job batch.
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Attach a cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Configured storage layout.
    pub fn layout(&self) -> StorageLayout {
        self.layout
    }

    /// Configured concurrency strategy.
    pub fn strategy(&self) -> PackStrategy {
        self.strategy
    }

    /// The worker count this run will use: the explicit setting, or the
    /// available CPU parallelism. Resolved here once so the pipeline never
    /// consults ambient state.
    pub fn resolved_workers(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            available_parallelism().map(|count| count.get()).unwrap_or(1)
        })
    }

    /// Frame codec configured by these options.
    pub fn codec(&self) -> FrameCodec {
        FrameCodec::new(self.width, self.height, self.jpeg_quality)
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for ExtractOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ExtractOptions")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("workers", &self.workers)
            .field("layout", &self.layout)
            .field("strategy", &self.strategy)
            .field("has_cancellation", &self.cancel.is_some())
            .finish_non_exhaustive()
    }
}
