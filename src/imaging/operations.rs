//! Variant generation.
//!
//! These functions combine calculations with codec execution: they take the
//! decoded source and the variant table, compute target geometry and call the
//! codec. Nothing here touches the filesystem; callers decide where the
//! encoded bytes go.

use super::backend::{CodecError, ImageCodec};
use super::calculations::scaled_height;
use super::params::{EncodeParams, ResizeParams};
use crate::naming::variant_file_name;
use crate::types::{ImageVariant, VariantSpec};
use thiserror::Error;

/// A codec failure attributed to one variant.
#[derive(Error, Debug)]
#[error("variant '{variant}': {source}")]
pub struct VariantError {
    pub variant: String,
    #[source]
    pub source: CodecError,
}

/// One resized and encoded variant, not yet written.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedVariant {
    pub name: String,
    pub variant: ImageVariant,
    pub bytes: Vec<u8>,
}

/// Resize `image` to `spec.width` (height derived from the aspect ratio) and
/// encode it.
///
/// The reported height is read back from the resized image, so it reflects
/// what the codec actually produced.
pub fn generate_variant<C: ImageCodec>(
    codec: &C,
    image: &C::Image,
    media_id: &str,
    spec: &VariantSpec,
    encode: &EncodeParams,
) -> Result<EncodedVariant, CodecError> {
    let source = codec.dimensions(image);
    let params = ResizeParams {
        width: spec.width,
        height: scaled_height((source.width, source.height), spec.width),
    };

    let resized = codec.resize(image, &params)?;
    let produced = codec.dimensions(&resized);
    let bytes = codec.encode(&resized, encode)?;

    Ok(EncodedVariant {
        name: spec.name.clone(),
        variant: ImageVariant {
            file_name: variant_file_name(
                media_id,
                spec.width,
                &spec.name,
                encode.format.extension(),
            ),
            width: produced.width,
            height: produced.height,
        },
        bytes,
    })
}

/// Generate every configured variant, in order.
///
/// Stops at the first failure: a partially generated set is never returned.
pub fn generate_variants<C: ImageCodec>(
    codec: &C,
    image: &C::Image,
    media_id: &str,
    specs: &[VariantSpec],
    encode: &EncodeParams,
) -> Result<Vec<EncodedVariant>, VariantError> {
    specs
        .iter()
        .map(|spec| {
            generate_variant(codec, image, media_id, spec, encode).map_err(|source| VariantError {
                variant: spec.name.clone(),
                source,
            })
        })
        .collect()
}
