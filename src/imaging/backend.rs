//! Image codec trait and shared types.
//!
//! The [`ImageCodec`] trait is the pipeline's only view of pixel work:
//! decode, resize, encode. Everything above it (variant planning, file
//! naming, the worker pool) is codec-agnostic.
//!
//! The production implementation is
//! [`RustCodec`](super::rust_backend::RustCodec), backed by the `image` crate.

use super::params::{EncodeParams, ResizeParams};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("resize failed: {0}")]
    Resize(String),
    #[error("encode failed: {0}")]
    Encode(String),
}

/// Pixel dimensions of a decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Decode/resize/encode capability consumed by the pipeline.
///
/// Implementations must be `Sync`: one codec instance is shared by every
/// worker thread. The decoded image type is opaque to callers.
pub trait ImageCodec: Sync {
    type Image;

    /// Decode raw fetched bytes. The format is sniffed from content.
    fn decode(&self, bytes: &[u8]) -> Result<Self::Image, CodecError>;

    fn dimensions(&self, image: &Self::Image) -> Dimensions;

    /// Resize to exactly the given dimensions.
    fn resize(&self, image: &Self::Image, params: &ResizeParams) -> Result<Self::Image, CodecError>;

    /// Encode to the batch output format, returning the file contents.
    fn encode(&self, image: &Self::Image, params: &EncodeParams) -> Result<Vec<u8>, CodecError>;
}
