//! Chunked range extraction.
//!
//! [`extract_range`] decodes one contiguous frame range from a video, passes
//! every frame through the [`FrameCodec`](crate::FrameCodec), and hands the
//! compressed payloads to a sink keyed by absolute frame index. Each call
//! opens its own decode handle and releases it on every exit path.

use std::path::Path;

use ffmpeg_next::{
    format::Pixel,
    frame::Video as VideoFrame,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::{DynamicImage, RgbImage};

use crate::{
    chunk::FrameChunk,
    codec::FrameCodec,
    error::FramepackError,
    source::{VideoSource, frame_index_of_pts},
};

/// Decode the frames of `chunk` from `video_path`, compress each one, and
/// emit `(index, payload)` pairs to `sink` in strictly increasing index
/// order.
///
/// Behavior at the boundaries:
///
/// - An empty chunk (or one starting at or beyond the stream's end) produces
///   no output and no error.
/// - A frame that fails to decode, scale, or compress is skipped; extraction
///   continues with the next frame.
/// - A decode failure that poisons the stream terminates this chunk's
///   iteration early. Frames already emitted remain valid, so early
///   termination is not an error.
/// - Errors returned by `sink` (storage failures, duplicate indices)
///   propagate immediately and are fatal to the surrounding job.
///
/// Returns the number of frames emitted: exactly the subset of
/// `[chunk.start, chunk.end)` that decoded and compressed successfully.
///
/// # Errors
///
/// Returns [`FramepackError::FileOpen`] or
/// [`FramepackError::NoVideoStream`] when the video cannot be set up for
/// decoding, [`FramepackError::Ffmpeg`] when the initial seek fails, or any
/// error produced by `sink`.
pub fn extract_range<S>(
    video_path: &Path,
    chunk: FrameChunk,
    codec: &FrameCodec,
    sink: &mut S,
) -> Result<u64, FramepackError>
where
    S: FnMut(u64, Vec<u8>) -> Result<(), FramepackError>,
{
    if chunk.is_empty() {
        return Ok(0);
    }

    let mut source = VideoSource::open(video_path)?;

    // Seeking at or past the end of the stream yields an empty iteration.
    if source.info().frame_count > 0 && chunk.start >= source.info().frame_count {
        return Ok(0);
    }

    let mut decoder = source.decoder()?;
    let mut scaler = ScalingContext::get(
        decoder.format(),
        decoder.width(),
        decoder.height(),
        Pixel::RGB24,
        codec.width(),
        codec.height(),
        ScalingFlags::BILINEAR,
    )?;

    source.seek_to_frame(chunk.start)?;

    log::debug!(
        "Extracting frames [{}, {}) from {}",
        chunk.start,
        chunk.end,
        video_path.display(),
    );

    let stream_index = source.stream_index;
    let time_base = source.time_base;
    let frames_per_second = source.info().frames_per_second;

    let mut progress = ChunkProgress {
        chunk,
        emitted: 0,
        last_index: None,
    };

    let mut decoded = VideoFrame::empty();
    let mut scaled = VideoFrame::empty();

    'demux: for (stream, packet) in source.input.packets() {
        if stream.index() != stream_index {
            continue;
        }

        if let Err(error) = decoder.send_packet(&packet) {
            // The decoder rejected the stream mid-way; stop this chunk and
            // keep what was already written.
            log::warn!(
                "Decode aborted after {} frame(s) of {}: {error}",
                progress.emitted,
                video_path.display(),
            );
            break 'demux;
        }

        while decoder.receive_frame(&mut decoded).is_ok() {
            let index =
                frame_index_of_pts(decoded.pts().unwrap_or(0), time_base, frames_per_second);
            if index >= chunk.end {
                break 'demux;
            }
            progress.emit(index, &decoded, &mut scaler, &mut scaled, codec, sink)?;
        }
    }

    // Drain frames still buffered in the decoder.
    if progress.last_index.is_none_or(|last| last + 1 < chunk.end) && decoder.send_eof().is_ok() {
        while decoder.receive_frame(&mut decoded).is_ok() {
            let index =
                frame_index_of_pts(decoded.pts().unwrap_or(0), time_base, frames_per_second);
            if index >= chunk.end {
                break;
            }
            progress.emit(index, &decoded, &mut scaler, &mut scaled, codec, sink)?;
        }
    }

    Ok(progress.emitted)
}

/// Per-chunk emission state: enforces the strictly-increasing-index
/// guarantee and separates per-frame failures from sink failures.
struct ChunkProgress {
    chunk: FrameChunk,
    emitted: u64,
    last_index: Option<u64>,
}

impl ChunkProgress {
    fn emit<S>(
        &mut self,
        index: u64,
        decoded: &VideoFrame,
        scaler: &mut ScalingContext,
        scaled: &mut VideoFrame,
        codec: &FrameCodec,
        sink: &mut S,
    ) -> Result<(), FramepackError>
    where
        S: FnMut(u64, Vec<u8>) -> Result<(), FramepackError>,
    {
        // Frames decoded on the way up from the preceding keyframe, and PTS
        // collisions in variable-rate streams, are discarded here.
        if index < self.chunk.start || self.last_index.is_some_and(|last| index <= last) {
            return Ok(());
        }

        match compress_frame(index, decoded, scaler, scaled, codec) {
            Ok(payload) => {
                sink(index, payload)?;
                self.last_index = Some(index);
                self.emitted += 1;
                Ok(())
            }
            Err(error) => {
                log::warn!("Skipping frame {index}: {error}");
                Ok(())
            }
        }
    }
}

/// Scale one decoded frame to the target resolution and compress it.
fn compress_frame(
    index: u64,
    decoded: &VideoFrame,
    scaler: &mut ScalingContext,
    scaled: &mut VideoFrame,
    codec: &FrameCodec,
) -> Result<Vec<u8>, FramepackError> {
    scaler
        .run(decoded, scaled)
        .map_err(|error| FramepackError::FrameDecode(error.to_string()))?;

    let image = frame_to_image(scaled, codec.width(), codec.height())?;
    codec.encode(index, &image)
}

/// Convert a scaled RGB24 frame into an [`image::DynamicImage`], stripping
/// FFmpeg's per-row stride padding.
fn frame_to_image(
    frame: &VideoFrame,
    width: u32,
    height: u32,
) -> Result<DynamicImage, FramepackError> {
    let stride = frame.stride(0);
    let row_bytes = (width as usize) * 3;
    let data = frame.data(0);

    let buffer = if stride == row_bytes {
        data[..row_bytes * (height as usize)].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(row_bytes * (height as usize));
        for row in 0..(height as usize) {
            let offset = row * stride;
            buffer.extend_from_slice(&data[offset..offset + row_bytes]);
        }
        buffer
    };

    let rgb = RgbImage::from_raw(width, height, buffer).ok_or_else(|| {
        FramepackError::FrameDecode(
            "Failed to construct RGB image from decoded frame data".to_string(),
        )
    })?;
    Ok(DynamicImage::ImageRgb8(rgb))
}
