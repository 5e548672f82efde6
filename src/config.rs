//! Pipeline configuration module.
//!
//! Handles loading, validating, and merging the TOML config file. User values
//! are layered over stock defaults, so a config file only needs the keys it
//! changes. A missing file means "all defaults".
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [storage]
//! media_dir = "output/media"   # Where variant files are written
//! output_dir = "output"        # Where converted_media.json is written
//!
//! [images]
//! format = "webp"              # "webp" (lossless) or "avif"
//! quality = 80                 # AVIF quality (1-100)
//!
//! [[variants]]                 # Replaces the whole default table when given
//! name = "large"
//! width = 1024
//!
//! [processing]
//! max_concurrency = 4          # Items in flight at once (omit for CPU cores)
//!
//! [fetch]
//! timeout_secs = 30            # Whole-request deadline per download
//! user_agent = "media-variants/<version>"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::fetch::FetchOptions;
use crate::imaging::{EncodeParams, OutputFormat, Quality};
use crate::naming::is_safe_variant_name;
use crate::types::{VariantSpec, default_variants};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Pipeline configuration loaded from a TOML file.
///
/// All fields have sensible defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Output locations.
    pub storage: StorageConfig,
    /// Encoding settings shared by every variant.
    pub images: ImagesConfig,
    /// The variant table, in output order.
    pub variants: Vec<VariantSpec>,
    /// Concurrency settings.
    pub processing: ProcessingConfig,
    /// HTTP client settings.
    pub fetch: FetchConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            images: ImagesConfig::default(),
            variants: default_variants(),
            processing: ProcessingConfig::default(),
            fetch: FetchConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.images.quality) {
            return Err(ConfigError::Validation(
                "images.quality must be 1-100".into(),
            ));
        }
        if self.variants.is_empty() {
            return Err(ConfigError::Validation(
                "at least one [[variants]] entry is required".into(),
            ));
        }
        let mut seen = HashSet::new();
        for variant in &self.variants {
            if !is_safe_variant_name(&variant.name) {
                return Err(ConfigError::Validation(format!(
                    "variant name {:?} must be non-empty and use only letters, digits, '-' or '.'",
                    variant.name
                )));
            }
            if variant.width == 0 {
                return Err(ConfigError::Validation(format!(
                    "variant '{}' width must be greater than 0",
                    variant.name
                )));
            }
            if !seen.insert(variant.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate variant name '{}'",
                    variant.name
                )));
            }
        }
        if self.processing.max_concurrency == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_concurrency must be at least 1".into(),
            ));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "fetch.timeout_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Resolved worker count; see [`effective_concurrency`].
    pub fn effective_concurrency(&self) -> usize {
        effective_concurrency(&self.processing)
    }
}

/// Output locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory for variant files. Created if missing.
    pub media_dir: PathBuf,
    /// Directory for the manifest. Created if missing.
    pub output_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            media_dir: PathBuf::from("output/media"),
            output_dir: PathBuf::from("output"),
        }
    }
}

/// Encoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    pub format: OutputFormat,
    /// AVIF quality (1 = worst, 100 = best). WebP output is lossless.
    pub quality: u32,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            quality: Quality::default().value(),
        }
    }
}

impl ImagesConfig {
    pub fn encode_params(&self) -> EncodeParams {
        EncodeParams {
            format: self.format,
            quality: Quality::new(self.quality),
        }
    }
}

/// Concurrency settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of items processed at once.
    /// When absent, defaults to the number of CPU cores.
    pub max_concurrency: Option<usize>,
}

/// Resolve the effective worker count from config.
///
/// - `None` → number of available cores
/// - `Some(n)` → `n`, even above the core count, since most of an item's time
///   is spent waiting on the network
///
/// Never less than 1.
pub fn effective_concurrency(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_concurrency.unwrap_or(cores).max(1)
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        let options = FetchOptions::default();
        Self {
            timeout_secs: options.timeout.as_secs(),
            user_agent: options.user_agent,
        }
    }
}

impl FetchConfig {
    pub fn to_options(&self) -> FetchOptions {
        FetchOptions {
            timeout: Duration::from_secs(self.timeout_secs),
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Serialize stock defaults to a TOML value tree.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(PipelineConfig::default()).expect("default config must serialize")
}

/// Deep-merge two TOML values. Tables merge recursively; everything else
/// (including arrays such as `variants`) is replaced by the overlay.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value. `Ok(None)` if it doesn't exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<PipelineConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: PipelineConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the TOML file at `path`.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<PipelineConfig, ConfigError> {
    resolve_config(stock_defaults_value(), load_raw_config(path)?)
}

/// Returns a fully-commented stock config with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# media-variants configuration
# ============================
# All options are optional. Remove or comment out anything you don't need;
# missing values fall back to the defaults shown here.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Storage
# ---------------------------------------------------------------------------
[storage]
# Directory that receives one file per (media id, variant).
media_dir = "output/media"
# Directory that receives converted_media.json.
output_dir = "output"

# ---------------------------------------------------------------------------
# Encoding
# ---------------------------------------------------------------------------
[images]
# Output format: "webp" (lossless) or "avif".
format = "webp"
# AVIF encoding quality, 1-100. Ignored for lossless WebP.
quality = 80

# ---------------------------------------------------------------------------
# Variants
# ---------------------------------------------------------------------------
# Each variant is resized to `width` with height following the source aspect
# ratio. Files are named <media_id>_<width>w_<name>.<ext>. Names must be
# unique and use only letters, digits, '-' or '.' (no '_', which separates
# the parts of the file name).
# Giving any [[variants]] replaces this whole table.

[[variants]]
name = "large"
width = 1024

[[variants]]
name = "medium"
width = 768

[[variants]]
name = "small"
width = 384

[[variants]]
name = "thumb"
width = 256

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum number of items fetched and converted at the same time.
# Omit to use the number of CPU cores.
# max_concurrency = 4

# ---------------------------------------------------------------------------
# Fetching
# ---------------------------------------------------------------------------
[fetch]
# Whole-request deadline for one download, in seconds.
timeout_secs = 30
# User-Agent header sent with every request.
# user_agent = "media-variants/0.3.0"
"##
}
