//! Item processor: one media item in, a set of variant files out.
//!
//! ## Steps
//!
//! ```text
//! MediaItem
//!   ├─ validate id         → InvalidMediaId
//!   ├─ pick URL            → NoUrl            (thumbnail_url, then media_url)
//!   ├─ classify extension  → Skipped          (video containers)
//!   ├─ fetch               → Download
//!   ├─ decode once         → Decode
//!   ├─ resize + encode ×N  → Encode           (all in memory, nothing written yet)
//!   └─ write N files       → Write            (written files removed on failure)
//! ```
//!
//! ## Failure granularity
//!
//! A failure in any single variant fails the whole item. A manifest entry
//! with silently missing variants would misrepresent what was produced, so
//! the item is reported as failed and left out of the manifest instead.
//! Because every variant is encoded before the first write, encode failures
//! leave no files behind.
//!
//! ## Output Structure
//!
//! ```text
//! media/
//! ├── 17900_1024w_large.webp
//! ├── 17900_768w_medium.webp
//! ├── 17900_384w_small.webp
//! └── 17900_256w_thumb.webp
//! ```

use crate::fetch::{FetchError, Fetcher};
use crate::imaging::{
    CodecError, EncodeParams, EncodedVariant, ImageCodec, VariantError, generate_variants,
};
use crate::naming::{is_safe_component, non_image_extension};
use crate::types::{ImageVariant, MediaItem, VariantSpec};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("no URL available for media {media_id}")]
    NoUrl { media_id: String },
    #[error("media id {media_id:?} cannot be used in a file name")]
    InvalidMediaId { media_id: String },
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: FetchError,
    },
    #[error("failed to decode image: {0}")]
    Decode(#[source] CodecError),
    #[error("failed to generate {0}")]
    Encode(#[from] VariantError),
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no variants produced for media {media_id}")]
    NoVariants { media_id: String },
    #[error("processing panicked: {message}")]
    Panicked { message: String },
}

/// Coarse classification of a [`ProcessError`], for counting and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    NoUrl,
    InvalidMediaId,
    Download,
    Decode,
    Encode,
    Write,
    NoVariants,
    Panic,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::NoUrl => "no url",
            FailureKind::InvalidMediaId => "invalid id",
            FailureKind::Download => "download",
            FailureKind::Decode => "decode",
            FailureKind::Encode => "encode",
            FailureKind::Write => "write",
            FailureKind::NoVariants => "no variants",
            FailureKind::Panic => "panic",
        };
        f.write_str(label)
    }
}

impl ProcessError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ProcessError::NoUrl { .. } => FailureKind::NoUrl,
            ProcessError::InvalidMediaId { .. } => FailureKind::InvalidMediaId,
            ProcessError::Download { .. } => FailureKind::Download,
            ProcessError::Decode(_) => FailureKind::Decode,
            ProcessError::Encode(_) => FailureKind::Encode,
            ProcessError::Write { .. } => FailureKind::Write,
            ProcessError::NoVariants { .. } => FailureKind::NoVariants,
            ProcessError::Panicked { .. } => FailureKind::Panic,
        }
    }
}

/// Why an item was deliberately left out. Not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NonImage { extension: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NonImage { extension } => write!(f, "non-image media (.{extension})"),
        }
    }
}

/// A written variant together with its configured name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedVariant {
    pub name: String,
    pub variant: ImageVariant,
}

/// Successful result of [`process_item`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemResult {
    /// Variants in configured order.
    Converted(Vec<GeneratedVariant>),
    Skipped(SkipReason),
}

/// The URL to download: the thumbnail when present and non-empty, else the media URL.
pub fn select_url(item: &MediaItem) -> Option<&str> {
    item.thumbnail_url
        .as_deref()
        .filter(|url| !url.trim().is_empty())
        .or_else(|| Some(item.source_url.as_str()).filter(|url| !url.trim().is_empty()))
}

/// Fetch, transcode and store every configured variant of one item.
pub fn process_item<C: ImageCodec>(
    codec: &C,
    fetcher: &impl Fetcher,
    item: &MediaItem,
    variants: &[VariantSpec],
    storage_root: &Path,
    encode: &EncodeParams,
) -> Result<ItemResult, ProcessError> {
    if !is_safe_component(&item.id) {
        return Err(ProcessError::InvalidMediaId {
            media_id: item.id.clone(),
        });
    }

    let url = select_url(item).ok_or_else(|| ProcessError::NoUrl {
        media_id: item.id.clone(),
    })?;

    if let Some(extension) = non_image_extension(url) {
        return Ok(ItemResult::Skipped(SkipReason::NonImage { extension }));
    }

    let bytes = fetcher.fetch(url).map_err(|source| ProcessError::Download {
        url: url.to_string(),
        source,
    })?;
    debug!(bytes = bytes.len(), "downloaded");

    let image = codec.decode(&bytes).map_err(ProcessError::Decode)?;
    drop(bytes);

    let encoded = generate_variants(codec, &image, &item.id, variants, encode)?;
    let written = write_variants(storage_root, encoded)?;
    Ok(ItemResult::Converted(written))
}

/// Write encoded variants to `storage_root`.
///
/// On the first failure, files already written for this item are removed
/// (best effort) and the error is returned.
fn write_variants(
    storage_root: &Path,
    encoded: Vec<EncodedVariant>,
) -> Result<Vec<GeneratedVariant>, ProcessError> {
    let mut written: Vec<GeneratedVariant> = Vec::with_capacity(encoded.len());

    for EncodedVariant {
        name,
        variant,
        bytes,
    } in encoded
    {
        let path = storage_root.join(&variant.file_name);
        if let Err(source) = std::fs::write(&path, &bytes) {
            for done in &written {
                let _ = std::fs::remove_file(storage_root.join(&done.variant.file_name));
            }
            return Err(ProcessError::Write { path, source });
        }
        debug!(
            file = %variant.file_name,
            width = variant.width,
            height = variant.height,
            "wrote variant"
        );
        written.push(GeneratedVariant { name, variant });
    }

    Ok(written)
}
