//! Manifest writer: the durable record of what a batch produced.
//!
//! The manifest is a pretty-printed JSON array at
//! `<output_dir>/converted_media.json`, one object per processed item, in the
//! order the coordinator settled on (newest first):
//!
//! ```json
//! [
//!   {
//!     "media_id": "17900",
//!     "timestamp": "2025-04-16T15:58:54+0000",
//!     "versions": {
//!       "large": { "file_name": "17900_1024w_large.webp", "width": 1024, "height": 768 },
//!       "thumb": { "file_name": "17900_256w_thumb.webp", "width": 256, "height": 192 }
//!     }
//!   }
//! ]
//! ```
//!
//! The file is replaced atomically: contents go to a sibling `.tmp` file
//! which is then renamed over the target, so readers never observe a
//! truncated manifest.

use crate::pipeline::BatchOutcome;
use crate::types::MediaManifestEntry;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the manifest file within the output directory.
pub const MANIFEST_FILENAME: &str = "converted_media.json";

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("manifest I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("manifest JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ManifestError + '_ {
    move |source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Write the outcome's entries to `<output_dir>/converted_media.json`.
///
/// Creates `output_dir` if needed. Returns the manifest path.
pub fn write_manifest(outcome: &BatchOutcome, output_dir: &Path) -> Result<PathBuf, ManifestError> {
    write_entries(&outcome.entries, output_dir)
}

/// Write an ordered entry list as the manifest.
pub fn write_entries(
    entries: &[MediaManifestEntry],
    output_dir: &Path,
) -> Result<PathBuf, ManifestError> {
    std::fs::create_dir_all(output_dir).map_err(io_error(output_dir))?;

    let json = serde_json::to_string_pretty(entries)?;
    let path = output_dir.join(MANIFEST_FILENAME);
    let tmp_path = output_dir.join(format!("{MANIFEST_FILENAME}.tmp"));

    if let Err(source) = std::fs::write(&tmp_path, json) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(ManifestError::Io {
            path: tmp_path,
            source,
        });
    }
    if let Err(source) = std::fs::rename(&tmp_path, &path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(ManifestError::Io { path, source });
    }

    Ok(path)
}

/// Read a previously written manifest from `output_dir`.
pub fn read_manifest(output_dir: &Path) -> Result<Vec<MediaManifestEntry>, ManifestError> {
    let path = output_dir.join(MANIFEST_FILENAME);
    let content = std::fs::read_to_string(&path).map_err(io_error(&path))?;
    Ok(serde_json::from_str(&content)?)
}
