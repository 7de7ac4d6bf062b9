//! Frame normalization and compression.
//!
//! [`FrameCodec`] turns a decoded frame into the opaque byte payload that
//! frame stores persist: resize to the fixed target resolution (bilinear),
//! then JPEG-compress at a fixed quality. Resizing always happens before
//! compression. The codec also decodes stored payloads back into images for
//! read-back and verification.

use std::borrow::Cow;

use image::{
    DynamicImage, ExtendedColorType, ImageFormat, codecs::jpeg::JpegEncoder,
    imageops::FilterType,
};

use crate::error::FramepackError;

/// Default JPEG quality: high quality, moderate compression.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Default target resolution, chosen for ML-pipeline consumption.
pub const DEFAULT_RESOLUTION: (u32, u32) = (224, 224);

/// Resize-then-compress codec applied to every extracted frame.
///
/// The codec is cheap to construct and [`Clone`]; each extraction worker
/// carries its own copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct FrameCodec {
    width: u32,
    height: u32,
    quality: u8,
}

impl FrameCodec {
    /// Create a codec targeting `width` × `height` at the given JPEG quality.
    ///
    /// Zero dimensions are clamped to 1; quality is clamped to `1..=100`.
    pub fn new(width: u32, height: u32, quality: u8) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            quality: quality.clamp(1, 100),
        }
    }

    /// Target width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Target height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Configured JPEG quality (1–100).
    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Resize `image` to the target resolution (when needed) and compress it
    /// to JPEG bytes.
    ///
    /// # Errors
    ///
    /// Returns [`FramepackError::FrameEncode`] if compression fails. Callers
    /// in the extraction path treat this as a per-frame error: the frame is
    /// dropped and extraction continues.
    pub fn encode(&self, index: u64, image: &DynamicImage) -> Result<Vec<u8>, FramepackError> {
        let sized: Cow<'_, DynamicImage> =
            if image.width() == self.width && image.height() == self.height {
                Cow::Borrowed(image)
            } else {
                Cow::Owned(image.resize_exact(self.width, self.height, FilterType::Triangle))
            };

        let mut payload = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut payload, self.quality);

        // JPEG has no alpha channel; flatten to RGB8 before encoding.
        let result = match sized.as_ref() {
            DynamicImage::ImageRgb8(rgb) => encoder.encode(
                rgb.as_raw(),
                self.width,
                self.height,
                ExtendedColorType::Rgb8,
            ),
            other => {
                let rgb = other.to_rgb8();
                encoder.encode(rgb.as_raw(), self.width, self.height, ExtendedColorType::Rgb8)
            }
        };

        result.map_err(|error| FramepackError::FrameEncode {
            index,
            reason: error.to_string(),
        })?;

        Ok(payload)
    }

    /// Decode a stored JPEG payload back into an image.
    ///
    /// # Errors
    ///
    /// Returns [`FramepackError::Image`] if the payload is not valid JPEG.
    pub fn decode(payload: &[u8]) -> Result<DynamicImage, FramepackError> {
        Ok(image::load_from_memory_with_format(
            payload,
            ImageFormat::Jpeg,
        )?)
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        let (width, height) = DEFAULT_RESOLUTION;
        Self::new(width, height, DEFAULT_JPEG_QUALITY)
    }
}
