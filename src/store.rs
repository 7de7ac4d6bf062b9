//! Frame stores: per-video persisted collections of compressed frames,
//! addressable by frame index.
//!
//! Two representations back the same [`FrameStore`] abstraction:
//!
//! - [`DirectoryStore`] — one image file per frame, named by zero-padded
//!   index. Filenames never collide across disjoint frame ranges, so any
//!   number of writer handles may target the same directory concurrently.
//! - [`ContainerStore`] — a single zip file per video with one entry per
//!   frame, entry name = decimal frame index. The central directory gives
//!   O(1) retrieval by index. A container handle must have at most one
//!   writer for its entire open/write/finish lifetime.
//!
//! Both stores detect duplicate indices within a handle's lifetime and both
//! finalize idempotently.

use std::{
    collections::HashSet,
    fs::{self, File},
    io::{Read, Write},
    path::{Path, PathBuf},
};

use zip::{
    CompressionMethod, ZipArchive, ZipWriter, write::SimpleFileOptions,
};

use crate::error::FramepackError;

/// File extension used for directory-store frames and read-back output.
pub const FRAME_EXTENSION: &str = "jpg";

/// Which on-disk representation a frame store uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageLayout {
    /// One zip container file per video (`<clip>.zip`). The canonical
    /// layout.
    #[default]
    Container,
    /// One subdirectory per video with one image file per frame.
    ImageDirectory,
}

impl StorageLayout {
    /// Path of the store for `clip_id` under `output_root`.
    pub fn store_path(&self, output_root: &Path, clip_id: &str) -> PathBuf {
        match self {
            StorageLayout::Container => output_root.join(format!("{clip_id}.zip")),
            StorageLayout::ImageDirectory => output_root.join(clip_id),
        }
    }

    /// Create (overwriting) the store at `path` and return a writer handle.
    pub fn create_store(&self, path: &Path) -> Result<Box<dyn FrameStore>, FramepackError> {
        match self {
            StorageLayout::Container => Ok(Box::new(ContainerStore::create(path)?)),
            StorageLayout::ImageDirectory => Ok(Box::new(DirectoryStore::create(path)?)),
        }
    }

    /// Read one frame's compressed payload back from the store at `path`.
    pub fn read_frame(&self, path: &Path, index: u64) -> Result<Vec<u8>, FramepackError> {
        match self {
            StorageLayout::Container => ContainerStore::read_frame(path, index),
            StorageLayout::ImageDirectory => DirectoryStore::read_frame(path, index),
        }
    }
}

/// Append-capable, index-keyed writer over one video's frame store.
///
/// One handle is owned by one writer for its whole lifetime. Writers for
/// disjoint frame ranges may share a *directory* store by each holding their
/// own handle ([`DirectoryStore::attach`]); a *container* store never has
/// more than one handle.
pub trait FrameStore: Send {
    /// Append one compressed frame keyed by its absolute index.
    ///
    /// # Errors
    ///
    /// [`FramepackError::DuplicateIndex`] if `index` was already written
    /// through this handle — a chunk-assignment bug, fatal to the job.
    /// [`FramepackError::Storage`] if the underlying write fails.
    fn write_frame(&mut self, index: u64, payload: &[u8]) -> Result<(), FramepackError>;

    /// Finalize the store and release its resources. Safe to call more than
    /// once; calls after the first are no-ops.
    fn finish(&mut self) -> Result<(), FramepackError>;

    /// Path of the backing store.
    fn path(&self) -> &Path;

    /// Number of frames written through this handle.
    fn frames_written(&self) -> u64;
}

/// Directory-of-files frame store: `<root>/<index zero-padded>.jpg`.
pub struct DirectoryStore {
    root: PathBuf,
    written: HashSet<u64>,
}

impl DirectoryStore {
    /// Create a fresh store at `root`, replacing any previous contents.
    ///
    /// # Errors
    ///
    /// Returns [`FramepackError::Storage`] if the directory cannot be
    /// created or an existing one cannot be removed.
    pub fn create<P: AsRef<Path>>(root: P) -> Result<Self, FramepackError> {
        let root = root.as_ref().to_path_buf();
        if root.exists() {
            fs::remove_dir_all(&root).map_err(|error| storage_error(&root, &error))?;
        }
        fs::create_dir_all(&root).map_err(|error| storage_error(&root, &error))?;
        Ok(Self {
            root,
            written: HashSet::new(),
        })
    }

    /// Open an additional writer handle on an existing store.
    ///
    /// Used by chunk workers writing disjoint ranges into a directory that
    /// [`create`](DirectoryStore::create) already set up. Duplicate
    /// detection is per handle; disjoint chunk assignment keeps handles from
    /// colliding on disk.
    pub fn attach<P: AsRef<Path>>(root: P) -> Result<Self, FramepackError> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(FramepackError::Storage {
                path: root,
                reason: "store directory does not exist".to_string(),
            });
        }
        Ok(Self {
            root,
            written: HashSet::new(),
        })
    }

    /// Read one frame's payload back by index.
    pub fn read_frame(root: &Path, index: u64) -> Result<Vec<u8>, FramepackError> {
        let path = frame_file(root, index);
        if !path.is_file() {
            return Err(FramepackError::MissingFrame {
                index,
                store: root.to_path_buf(),
            });
        }
        fs::read(&path).map_err(|error| storage_error(root, &error))
    }
}

impl FrameStore for DirectoryStore {
    fn write_frame(&mut self, index: u64, payload: &[u8]) -> Result<(), FramepackError> {
        if !self.written.insert(index) {
            return Err(FramepackError::DuplicateIndex {
                index,
                store: self.root.clone(),
            });
        }
        fs::write(frame_file(&self.root, index), payload)
            .map_err(|error| storage_error(&self.root, &error))
    }

    fn finish(&mut self) -> Result<(), FramepackError> {
        Ok(())
    }

    fn path(&self) -> &Path {
        &self.root
    }

    fn frames_written(&self) -> u64 {
        self.written.len() as u64
    }
}

/// Single-container frame store backed by a zip archive.
///
/// Entries are `Stored` rather than deflated: payloads are already
/// JPEG-compressed. The archive is finalized exactly once; dropping an
/// unfinished handle finalizes it best-effort so a failed job still leaves a
/// readable (if incomplete) container behind.
pub struct ContainerStore {
    writer: Option<ZipWriter<File>>,
    container: PathBuf,
    written: HashSet<u64>,
}

impl ContainerStore {
    /// Create (overwriting) the container file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`FramepackError::Storage`] if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, FramepackError> {
        let container = path.as_ref().to_path_buf();
        let file = File::create(&container).map_err(|error| storage_error(&container, &error))?;
        Ok(Self {
            writer: Some(ZipWriter::new(file)),
            container,
            written: HashSet::new(),
        })
    }

    /// Read one frame's payload back by index.
    pub fn read_frame(path: &Path, index: u64) -> Result<Vec<u8>, FramepackError> {
        let file = File::open(path).map_err(|error| storage_error(path, &error))?;
        let mut archive = ZipArchive::new(file).map_err(|error| storage_error(path, &error))?;

        let mut entry = match archive.by_name(&index.to_string()) {
            Ok(entry) => entry,
            Err(zip::result::ZipError::FileNotFound) => {
                return Err(FramepackError::MissingFrame {
                    index,
                    store: path.to_path_buf(),
                });
            }
            Err(error) => return Err(storage_error(path, &error)),
        };

        let mut payload = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut payload)
            .map_err(|error| storage_error(path, &error))?;
        Ok(payload)
    }
}

impl FrameStore for ContainerStore {
    fn write_frame(&mut self, index: u64, payload: &[u8]) -> Result<(), FramepackError> {
        if !self.written.insert(index) {
            return Err(FramepackError::DuplicateIndex {
                index,
                store: self.container.clone(),
            });
        }

        let writer = self.writer.as_mut().ok_or_else(|| FramepackError::Storage {
            path: self.container.clone(),
            reason: "store already finalized".to_string(),
        })?;

        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        writer
            .start_file(index.to_string(), options)
            .map_err(|error| storage_error(&self.container, &error))?;
        writer
            .write_all(payload)
            .map_err(|error| storage_error(&self.container, &error))
    }

    fn finish(&mut self) -> Result<(), FramepackError> {
        match self.writer.take() {
            Some(writer) => {
                writer
                    .finish()
                    .map_err(|error| storage_error(&self.container, &error))?;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn path(&self) -> &Path {
        &self.container
    }

    fn frames_written(&self) -> u64 {
        self.written.len() as u64
    }
}

impl Drop for ContainerStore {
    fn drop(&mut self) {
        if self.writer.is_some() {
            if let Err(error) = self.finish() {
                log::warn!(
                    "Failed to finalize container {}: {error}",
                    self.container.display(),
                );
            }
        }
    }
}

fn frame_file(root: &Path, index: u64) -> PathBuf {
    root.join(format!("{index:06}.{FRAME_EXTENSION}"))
}

fn storage_error(path: &Path, error: &dyn std::fmt::Display) -> FramepackError {
    FramepackError::Storage {
        path: path.to_path_buf(),
        reason: error.to_string(),
    }
}
