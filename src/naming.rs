//! Filename conventions shared by the processor and config validation.
//!
//! Every encoded file is named `<media_id>_<width>w_<variant>.<ext>`:
//!
//! ```text
//! 17900_1024w_large.webp
//! 17900_768w_medium.webp
//! 17900_256w_thumb.webp
//! ```
//!
//! The name depends only on its inputs, so re-running a batch produces the
//! same file names. Media IDs and variant names are restricted to a safe
//! character set, which keeps names inside the storage root. Variant names
//! additionally exclude `_`: the name is then everything after the last `_`,
//! the width sits right before it, and the ID is whatever remains, so two
//! different `(id, width, name)` triples never share a file name even when
//! IDs contain underscores.

/// Extensions of container formats that are never decoded as images.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "m4v", "webm", "avi", "mkv", "3gp"];

/// Build the file name for one variant of one media item.
pub fn variant_file_name(media_id: &str, width: u32, variant: &str, extension: &str) -> String {
    format!("{media_id}_{width}w_{variant}.{extension}")
}

/// Whether `name` can be embedded in a file name as-is.
///
/// Allows ASCII alphanumerics, `-`, `_` and `.`, rejects empty names and a
/// leading dot (hidden files, `..`).
pub fn is_safe_component(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Whether `name` can be used as a variant name: a safe component without `_`.
pub fn is_safe_variant_name(name: &str) -> bool {
    is_safe_component(name) && !name.contains('_')
}

/// Lowercased extension of the last path segment of a URL.
///
/// Query string and fragment are ignored. Inputs that don't parse as absolute
/// URLs are treated as plain paths.
pub fn url_extension(raw: &str) -> Option<String> {
    let path = match url::Url::parse(raw) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => raw
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };
    let segment = path.rsplit('/').next()?;
    let (stem, ext) = segment.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Returns the offending extension when the URL points at a video container.
pub fn non_image_extension(raw: &str) -> Option<String> {
    url_extension(raw).filter(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
}
