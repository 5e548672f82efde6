//! Image processing — pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` (format sniffed from bytes) |
//! | **Resize** | `resize_exact` + Lanczos3 |
//! | **Encode** | WebP (lossless) or AVIF (rav1e) |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageCodec`] trait + [`RustCodec`]
//! - **Operations**: Variant generation combining calculations + codec

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{CodecError, Dimensions, ImageCodec};
pub use calculations::scaled_height;
pub use operations::{EncodedVariant, VariantError, generate_variant, generate_variants};
pub use params::{EncodeParams, OutputFormat, Quality, ResizeParams};
pub use rust_backend::RustCodec;
