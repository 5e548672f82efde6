//! Shared types used across the pipeline.
//!
//! [`MediaItem`] is the input record handed over by the feed client,
//! [`MediaManifestEntry`] and [`ImageVariant`] are what ends up in
//! `converted_media.json`. Field names follow the upstream JSON so the
//! manifest stays compatible with existing consumers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One remote media reference to be transcoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: String,
    /// Full-size media URL. For videos this points at the video container.
    #[serde(rename = "media_url", default)]
    pub source_url: String,
    /// Still image for video posts; preferred over `source_url` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    /// Capture time as reported upstream, e.g. `2025-04-16T15:58:54+0000`.
    #[serde(default)]
    pub timestamp: String,
    /// Upstream media type (`IMAGE`, `VIDEO`, `CAROUSEL_ALBUM`). Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

impl MediaItem {
    pub fn new(id: impl Into<String>, source_url: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source_url: source_url.into(),
            thumbnail_url: None,
            timestamp: timestamp.into(),
            media_type: None,
        }
    }

    pub fn with_thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(url.into());
        self
    }
}

/// A named target width. Height is always derived from the source aspect ratio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariantSpec {
    pub name: String,
    pub width: u32,
}

impl VariantSpec {
    pub fn new(name: impl Into<String>, width: u32) -> Self {
        Self {
            name: name.into(),
            width,
        }
    }
}

/// The stock variant table: large/1024, medium/768, small/384, thumb/256.
pub fn default_variants() -> Vec<VariantSpec> {
    vec![
        VariantSpec::new("large", 1024),
        VariantSpec::new("medium", 768),
        VariantSpec::new("small", 384),
        VariantSpec::new("thumb", 256),
    ]
}

/// One encoded file produced for a (media item, variant) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageVariant {
    pub file_name: String,
    pub width: u32,
    pub height: u32,
}

/// Manifest record for one successfully processed media item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaManifestEntry {
    pub media_id: String,
    pub timestamp: String,
    /// Variant name → produced file.
    pub versions: BTreeMap<String, ImageVariant>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_item_reads_upstream_shape() {
        let json = r#"{
            "id": "17900",
            "media_type": "VIDEO",
            "media_url": "https://cdn.example.com/v/clip.mp4?sig=abc",
            "permalink": "https://example.com/p/xyz",
            "timestamp": "2025-04-16T15:58:54+0000",
            "thumbnail_url": "https://cdn.example.com/t/clip.jpg",
            "is_shared_to_feed": true
        }"#;

        let item: MediaItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.id, "17900");
        assert_eq!(item.source_url, "https://cdn.example.com/v/clip.mp4?sig=abc");
        assert_eq!(
            item.thumbnail_url.as_deref(),
            Some("https://cdn.example.com/t/clip.jpg")
        );
        assert_eq!(item.media_type.as_deref(), Some("VIDEO"));
    }

    #[test]
    fn media_item_without_thumbnail() {
        let json = r#"{"id": "1", "media_url": "https://x/a.jpg", "timestamp": "2025-01-01T00:00:00Z"}"#;
        let item: MediaItem = serde_json::from_str(json).unwrap();
        assert!(item.thumbnail_url.is_none());
    }

    #[test]
    fn default_variants_are_ordered_largest_first() {
        let widths: Vec<u32> = default_variants().iter().map(|v| v.width).collect();
        assert_eq!(widths, vec![1024, 768, 384, 256]);
    }

    #[test]
    fn manifest_entry_serializes_with_snake_case_keys() {
        let mut versions = BTreeMap::new();
        versions.insert(
            "thumb".to_string(),
            ImageVariant {
                file_name: "1_256w_thumb.webp".to_string(),
                width: 256,
                height: 192,
            },
        );
        let entry = MediaManifestEntry {
            media_id: "1".to_string(),
            timestamp: "2025-01-01T00:00:00Z".to_string(),
            versions,
        };

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["media_id"], "1");
        assert_eq!(value["versions"]["thumb"]["file_name"], "1_256w_thumb.webp");
        assert_eq!(value["versions"]["thumb"]["height"], 192);
    }
}
