//! Pure Rust codec — everything statically linked.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, GIF, WebP) | `image::ImageReader` with content sniffing |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Encode → WebP | `image::codecs::webp::WebPEncoder` (lossless) |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e, speed 6) |

use super::backend::{CodecError, Dimensions, ImageCodec};
use super::params::{EncodeParams, OutputFormat, ResizeParams};
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::io::Cursor;

/// Largest pixel count a resize may allocate, for the target and for the
/// intermediate `source_width × target_height` buffer of the vertical pass.
///
/// Lanczos works in f32 RGBA (16 bytes per pixel), so this caps one buffer at
/// 512 MiB, the same as the decoder's default allocation limit. Tall slivers
/// otherwise turn a few kilobytes of PNG into a multi-gigabyte allocation.
pub const MAX_RESIZE_PIXELS: u64 = 1 << 25;

/// Codec backed by the `image` crate.
pub struct RustCodec;

impl RustCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize to 8-bit RGB(A); both encoders reject 16-bit and float buffers.
fn to_8bit(img: &DynamicImage) -> DynamicImage {
    if img.color().has_alpha() {
        DynamicImage::ImageRgba8(img.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(img.to_rgb8())
    }
}

fn encode_webp(img: &DynamicImage) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    let encoder = image::codecs::webp::WebPEncoder::new_lossless(&mut buf);
    to_8bit(img)
        .write_with_encoder(encoder)
        .map_err(|e| CodecError::Encode(format!("WebP encode failed: {e}")))?;
    Ok(buf)
}

/// AVIF through ravif/rav1e (speed=6 for reasonable throughput).
fn encode_avif(img: &DynamicImage, quality: u32) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    let encoder =
        image::codecs::avif::AvifEncoder::new_with_speed_quality(&mut buf, 6, quality as u8);
    to_8bit(img)
        .write_with_encoder(encoder)
        .map_err(|e| CodecError::Encode(format!("AVIF encode failed: {e}")))?;
    Ok(buf)
}

impl ImageCodec for RustCodec {
    type Image = DynamicImage;

    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, CodecError> {
        ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| CodecError::Decode(format!("failed to sniff format: {e}")))?
            .decode()
            .map_err(|e| CodecError::Decode(e.to_string()))
    }

    fn dimensions(&self, image: &DynamicImage) -> Dimensions {
        Dimensions {
            width: image.width(),
            height: image.height(),
        }
    }

    fn resize(&self, image: &DynamicImage, params: &ResizeParams) -> Result<DynamicImage, CodecError> {
        if params.width == 0 || params.height == 0 {
            return Err(CodecError::Resize(format!(
                "invalid target {}x{}",
                params.width, params.height
            )));
        }
        let target = u64::from(params.width) * u64::from(params.height);
        let intermediate = u64::from(image.width()) * u64::from(params.height);
        if target.max(intermediate) > MAX_RESIZE_PIXELS {
            return Err(CodecError::Resize(format!(
                "target {}x{} from {}x{} exceeds the {MAX_RESIZE_PIXELS} pixel budget",
                params.width,
                params.height,
                image.width(),
                image.height()
            )));
        }
        Ok(image.resize_exact(params.width, params.height, FilterType::Lanczos3))
    }

    fn encode(&self, image: &DynamicImage, params: &EncodeParams) -> Result<Vec<u8>, CodecError> {
        match params.format {
            OutputFormat::WebP => encode_webp(image),
            OutputFormat::Avif => encode_avif(image, params.quality.value()),
        }
    }
}
