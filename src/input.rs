//! Loading media item lists from JSON.
//!
//! Two shapes are accepted:
//!
//! ```json
//! [{ "id": "1", "media_url": "https://...", "timestamp": "..." }]
//! ```
//!
//! or the envelope returned by paginated media APIs:
//!
//! ```json
//! { "data": [{ "id": "1", "media_url": "https://...", "timestamp": "..." }] }
//! ```
//!
//! Extra fields on items (captions, permalinks, paging cursors) are ignored.

use crate::types::MediaItem;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid media list: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MediaList {
    Bare(Vec<MediaItem>),
    Envelope { data: Vec<MediaItem> },
}

/// Parse a media item list from a JSON string.
pub fn parse_media_items(json: &str) -> Result<Vec<MediaItem>, InputError> {
    let items = match serde_json::from_str(json)? {
        MediaList::Bare(items) => items,
        MediaList::Envelope { data } => data,
    };
    Ok(items)
}

/// Read and parse a media item list from a file.
pub fn load_media_items(path: &Path) -> Result<Vec<MediaItem>, InputError> {
    let content = std::fs::read_to_string(path)?;
    parse_media_items(&content)
}
