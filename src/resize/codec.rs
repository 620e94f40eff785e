//! Pixel codec used by the resize pipeline.
//!
//! The pipeline only needs three operations: decode bytes into an image,
//! fill-resize an image to an exact box, and encode an image in an output
//! format. They sit behind the [`Codec`] trait so the orchestration can be
//! exercised with any implementation.
//!
//! # Design Decisions
//!
//! - **Fill, centered**: the resize scales the source to cover the target
//!   box and crops the overflow evenly from both sides.
//! - **WebP**: encoded lossy through libwebp (`webp` crate); the `image`
//!   crate's own WebP encoder is lossless only.

use std::io::Cursor;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};

use crate::error::CodecError;

use super::key::{OutputFormat, JPEG_QUALITY, WEBP_QUALITY};

/// Resampling filter used for every resize.
pub const RESIZE_FILTER: FilterType = FilterType::Lanczos3;

/// Decode / resize / encode operations over decoded images.
pub trait Codec: Send + Sync {
    /// Decode raw bytes, guessing the container format from its signature.
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, CodecError>;

    /// Scale and center-crop `image` to exactly `width` x `height`.
    fn resize(&self, image: &DynamicImage, width: u32, height: u32, filter: FilterType)
        -> DynamicImage;

    /// Encode `image` as `format`, using `quality` for lossy formats.
    fn encode(
        &self,
        image: &DynamicImage,
        format: OutputFormat,
        quality: Option<u8>,
    ) -> Result<Bytes, CodecError>;
}

/// [`Codec`] backed by the `image` crate.
#[derive(Debug, Clone, Default)]
pub struct ImageCodec;

impl ImageCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Codec for ImageCodec {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, CodecError> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| CodecError::Decode(e.to_string()))?;

        reader
            .decode()
            .map_err(|e| CodecError::Decode(e.to_string()))
    }

    fn resize(
        &self,
        image: &DynamicImage,
        width: u32,
        height: u32,
        filter: FilterType,
    ) -> DynamicImage {
        image.resize_to_fill(width, height, filter)
    }

    fn encode(
        &self,
        image: &DynamicImage,
        format: OutputFormat,
        quality: Option<u8>,
    ) -> Result<Bytes, CodecError> {
        let mut output = Vec::new();

        let result = match format {
            OutputFormat::Jpeg => {
                // JPEG has no alpha channel
                let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
                let quality = quality.unwrap_or(JPEG_QUALITY).clamp(1, 100);
                rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut output, quality))
            }
            OutputFormat::Png => image.write_with_encoder(PngEncoder::new(&mut output)),
            OutputFormat::Webp => {
                let quality = quality.unwrap_or(WEBP_QUALITY).clamp(1, 100);
                return encode_webp(image, quality);
            }
        };

        result.map_err(|e| CodecError::Encode(e.to_string()))?;
        Ok(Bytes::from(output))
    }
}

/// Lossy WebP at `quality` (1-100).
fn encode_webp(image: &DynamicImage, quality: u8) -> Result<Bytes, CodecError> {
    let rgba = DynamicImage::ImageRgba8(image.to_rgba8());
    let encoder = webp::Encoder::from_image(&rgba)
        .map_err(|e| CodecError::Encode(e.to_string()))?;

    let memory = encoder
        .encode_simple(false, f32::from(quality))
        .map_err(|e| CodecError::Encode(format!("{:?}", e)))?;

    Ok(Bytes::copy_from_slice(&memory))
}

// =============================================================================
// Tests
// =============================================================================
