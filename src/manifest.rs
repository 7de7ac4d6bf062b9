//! Clip manifest loading and job expansion.
//!
//! A manifest names the clips to process: either a JSON array of clip
//! identifiers (resolved to `<input_dir>/<id>.mp4`) or a JSON object
//! mapping identifier to a path relative to the input directory. Every
//! referenced video is existence-checked before a single job is enqueued,
//! so a typo in the manifest aborts the batch up front instead of surfacing
//! as a mid-run failure.

use std::{fs, path::Path};

use serde_json::Value;

use crate::{error::FramepackError, pool::Job, store::StorageLayout};

/// Default extension appended to bare clip identifiers.
const DEFAULT_VIDEO_EXTENSION: &str = "mp4";

/// One manifest entry: a clip identifier and the video file it names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipEntry {
    /// Logical clip identifier; becomes the store name and the job label.
    pub clip_id: String,
    /// Video filename relative to the input directory.
    pub relative_path: String,
}

/// Load and parse a clip manifest.
///
/// Accepts a JSON array of identifiers (`["clip-a", "clip-b"]`, each
/// resolved to `<id>.mp4`) or a JSON object mapping identifier to relative
/// path (`{"clip-a": "raw/a.mp4"}`).
///
/// # Errors
///
/// Returns [`FramepackError::Manifest`] when the file cannot be read or is
/// not one of the accepted shapes.
pub fn load_manifest(path: &Path) -> Result<Vec<ClipEntry>, FramepackError> {
    let manifest_error = |reason: String| FramepackError::Manifest {
        path: path.to_path_buf(),
        reason,
    };

    let text = fs::read_to_string(path).map_err(|error| manifest_error(error.to_string()))?;
    let value: Value =
        serde_json::from_str(&text).map_err(|error| manifest_error(error.to_string()))?;

    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(clip_id) => Ok(ClipEntry {
                    relative_path: format!("{clip_id}.{DEFAULT_VIDEO_EXTENSION}"),
                    clip_id,
                }),
                other => Err(manifest_error(format!(
                    "expected a clip identifier string, found: {other}"
                ))),
            })
            .collect(),
        Value::Object(entries) => entries
            .into_iter()
            .map(|(clip_id, target)| match target {
                Value::String(relative_path) => Ok(ClipEntry {
                    clip_id,
                    relative_path,
                }),
                other => Err(manifest_error(format!(
                    "expected a path string for clip {clip_id}, found: {other}"
                ))),
            })
            .collect(),
        _ => Err(manifest_error(
            "manifest must be a JSON array of clip ids or an object mapping id to path"
                .to_string(),
        )),
    }
}

/// Expand manifest entries into pool jobs, validating that every source
/// video exists.
///
/// The check runs over the complete manifest before any job is returned:
/// one missing file aborts the whole batch.
///
/// # Errors
///
/// Returns [`FramepackError::MissingVideo`] naming the first absent file.
pub fn build_jobs(
    entries: &[ClipEntry],
    input_dir: &Path,
    output_dir: &Path,
    layout: StorageLayout,
) -> Result<Vec<Job>, FramepackError> {
    for entry in entries {
        let video = input_dir.join(&entry.relative_path);
        if !video.is_file() {
            return Err(FramepackError::MissingVideo { path: video });
        }
    }

    Ok(entries
        .iter()
        .map(|entry| {
            Job::with_label(
                input_dir.join(&entry.relative_path),
                layout.store_path(output_dir, &entry.clip_id),
                entry.clip_id.clone(),
            )
        })
        .collect())
}
