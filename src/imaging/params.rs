//! Parameter types for image operations.
//!
//! These structs describe *what* to produce, not *how*. They sit between the
//! [`operations`](super::operations) module (which decides the variant
//! geometry) and the [`backend`](super::backend) codec (which does the pixel
//! work), so the codec can be swapped for a mock in tests.
//!
//! - [`Quality`] — lossy encoding quality (1–100, default 80). Clamped on construction.
//! - [`OutputFormat`] — the single container every variant is written in.
//! - [`EncodeParams`] — format + quality, fixed for a whole batch.
//! - [`ResizeParams`] — exact target dimensions for one variant.

use serde::{Deserialize, Serialize};

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(80)
    }
}

/// Output container for generated variants.
///
/// WebP is written lossless by the `image` crate encoder, so `quality` only
/// affects AVIF output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    WebP,
    Avif,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::WebP => "webp",
            OutputFormat::Avif => "avif",
        }
    }
}

/// Encoding settings shared by every variant of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncodeParams {
    pub format: OutputFormat,
    pub quality: Quality,
}

/// Exact dimensions of one resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeParams {
    pub width: u32,
    pub height: u32,
}
