//! Seekable video decode handles.
//!
//! [`VideoSource`] wraps an FFmpeg demuxer context opened on one video file.
//! Stream properties are probed once at open time and cached as
//! [`VideoInfo`]. A source is owned exclusively by the extraction call that
//! opened it and is released when dropped, on every exit path.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use ffmpeg_next::{
    Rational, codec::context::Context as CodecContext, decoder::Video as VideoDecoder,
    format::context::Input, media::Type,
};

use crate::error::FramepackError;

/// Stream properties of an opened video, probed once at open time.
#[derive(Debug, Clone)]
#[must_use]
pub struct VideoInfo {
    /// Source frame width in pixels.
    pub width: u32,
    /// Source frame height in pixels.
    pub height: u32,
    /// Frames per second. Informational; never used for scheduling.
    pub frames_per_second: f64,
    /// Total number of frames. Taken from the container when it declares a
    /// count, otherwise estimated from duration and frame rate.
    pub frame_count: u64,
}

/// An opened, seekable decode handle on one video file.
///
/// Decode handles are never shared across concurrent workers; each chunk or
/// job opens its own.
pub struct VideoSource {
    pub(crate) input: Input,
    pub(crate) stream_index: usize,
    pub(crate) time_base: Rational,
    info: VideoInfo,
    path: PathBuf,
}

impl VideoSource {
    /// Open a video file and probe its stream properties.
    ///
    /// # Errors
    ///
    /// Returns [`FramepackError::FileOpen`] if the file cannot be opened and
    /// [`FramepackError::NoVideoStream`] if it contains no video stream.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, FramepackError> {
        let path = path.as_ref().to_path_buf();

        // Initialise ffmpeg (safe to call multiple times).
        ffmpeg_next::init().map_err(|error| FramepackError::FileOpen {
            path: path.clone(),
            reason: format!("FFmpeg initialisation failed: {error}"),
        })?;

        log::debug!("Opening video source: {}", path.display());

        let input = ffmpeg_next::format::input(&path).map_err(|error| {
            FramepackError::FileOpen {
                path: path.clone(),
                reason: error.to_string(),
            }
        })?;

        let stream = input
            .streams()
            .best(Type::Video)
            .ok_or_else(|| FramepackError::NoVideoStream { path: path.clone() })?;
        let stream_index = stream.index();
        let time_base = stream.time_base();

        let decoder = CodecContext::from_parameters(stream.parameters())
            .and_then(|context| context.decoder().video())
            .map_err(|error| FramepackError::FileOpen {
                path: path.clone(),
                reason: format!("Failed to create video decoder: {error}"),
            })?;

        let frames_per_second = stream_frame_rate(&stream);

        let duration_microseconds = input.duration();
        let duration = if duration_microseconds > 0 {
            Duration::from_micros(duration_microseconds as u64)
        } else {
            Duration::ZERO
        };

        // Prefer the container's declared frame count; fall back to the
        // duration-based estimate.
        let declared = stream.frames();
        let frame_count = if declared > 0 {
            declared as u64
        } else if frames_per_second > 0.0 {
            (duration.as_secs_f64() * frames_per_second) as u64
        } else {
            0
        };

        let info = VideoInfo {
            width: decoder.width(),
            height: decoder.height(),
            frames_per_second,
            frame_count,
        };

        Ok(Self {
            input,
            stream_index,
            time_base,
            info,
            path,
        })
    }

    /// Open, read [`VideoInfo`], and immediately release the handle.
    ///
    /// Used by the splitter to learn the total frame count before chunk
    /// workers open their own independent handles.
    pub fn probe<P: AsRef<Path>>(path: P) -> Result<VideoInfo, FramepackError> {
        Ok(Self::open(path)?.info)
    }

    /// Cached stream properties.
    pub fn info(&self) -> &VideoInfo {
        &self.info
    }

    /// Path this source was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Seek to the nearest keyframe at or before `frame`. Decoding then
    /// proceeds forward and discards frames preceding the target.
    pub(crate) fn seek_to_frame(&mut self, frame: u64) -> Result<(), FramepackError> {
        let timestamp = self.frame_to_timestamp(frame);
        self.input.seek(timestamp, ..timestamp)?;
        Ok(())
    }

    /// Build a fresh decoder from the video stream's parameters.
    pub(crate) fn decoder(&self) -> Result<VideoDecoder, FramepackError> {
        let stream = self
            .input
            .stream(self.stream_index)
            .ok_or_else(|| FramepackError::NoVideoStream {
                path: self.path.clone(),
            })?;
        let context = CodecContext::from_parameters(stream.parameters())?;
        Ok(context.decoder().video()?)
    }

    /// Convert a frame index to a timestamp in the stream's time base.
    fn frame_to_timestamp(&self, frame: u64) -> i64 {
        if self.info.frames_per_second <= 0.0 {
            return 0;
        }
        let seconds = frame as f64 / self.info.frames_per_second;
        let numerator = self.time_base.numerator() as f64;
        let denominator = self.time_base.denominator() as f64;
        (seconds * denominator / numerator) as i64
    }
}

/// Map a decoded frame's PTS back to a frame index.
pub(crate) fn frame_index_of_pts(pts: i64, time_base: Rational, frames_per_second: f64) -> u64 {
    let numerator = time_base.numerator() as f64;
    let denominator = time_base.denominator() as f64;
    let seconds = pts as f64 * numerator / denominator;
    (seconds * frames_per_second).round().max(0.0) as u64
}

/// Frames per second from the stream's average frame rate, falling back to
/// the raw rate field for streams that do not report an average.
fn stream_frame_rate(stream: &ffmpeg_next::format::stream::Stream<'_>) -> f64 {
    let average = stream.avg_frame_rate();
    if average.denominator() != 0 && average.numerator() > 0 {
        return average.numerator() as f64 / average.denominator() as f64;
    }
    let rate = stream.rate();
    if rate.denominator() != 0 && rate.numerator() > 0 {
        rate.numerator() as f64 / rate.denominator() as f64
    } else {
        0.0
    }
}
