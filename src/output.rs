//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Every item leads with its 1-based position in the input list and its media
//! ID. What happened to it (variants written, skip reason, failure) follows as
//! indented context lines, so the output reads as an inventory of the batch.
//!
//! # Output Format
//!
//! ## Process
//!
//! ```text
//! Processing 6 items (3 at a time)
//! 002 17901 skipped: non-image media (.mp4)
//! 001 17900
//!     large: 17900_1024w_large.webp (1024x768)
//!     thumb: 17900_256w_thumb.webp (256x192)
//! 004 17903 failed (download): download failed for https://...: bad status 404 ...
//!
//! Processed 3, skipped 1, failed 2 (6 items)
//! Manifest → output/converted_media.json
//! ```
//!
//! Item lines appear in completion order; the index ties them back to the
//! input list.
//!
//! ## Show
//!
//! ```text
//! 001 17900 (2025-04-16T15:58:54+0000)
//!     large: 17900_1024w_large.webp (1024x768)
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure —
//! no I/O, no side effects.

use crate::pipeline::{BatchOutcome, ItemStatus, ProcessEvent};
use crate::types::{ImageVariant, MediaManifestEntry};
use std::path::Path;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// ```text
///     large: 17900_1024w_large.webp (1024x768)
/// ```
fn variant_line(name: &str, variant: &ImageVariant) -> String {
    format!(
        "{}{}: {} ({}x{})",
        indent(1),
        name,
        variant.file_name,
        variant.width,
        variant.height
    )
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

// ============================================================================
// Process output
// ============================================================================

/// Format a single progress event as display lines.
pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::BatchStarted {
            total,
            max_concurrency,
        } => vec![format!(
            "Processing {} ({} at a time)",
            plural(*total, "item"),
            max_concurrency
        )],
        ProcessEvent::ItemFinished {
            index,
            media_id,
            status,
            ..
        } => {
            let header = format!("{} {}", format_index(index + 1), media_id);
            match status {
                ItemStatus::Processed { variants } => {
                    let mut lines = vec![header];
                    lines.extend(
                        variants
                            .iter()
                            .map(|generated| variant_line(&generated.name, &generated.variant)),
                    );
                    lines
                }
                ItemStatus::Skipped { reason } => vec![format!("{header} skipped: {reason}")],
                ItemStatus::Failed { kind, message } => {
                    vec![format!("{header} failed ({kind}): {message}")]
                }
            }
        }
    }
}

pub fn print_process_event(event: &ProcessEvent) {
    for line in format_process_event(event) {
        println!("{}", line);
    }
}

/// Format the end-of-batch summary.
///
/// Failures are listed again (in input order) so they are visible without
/// scrolling back through progress output.
pub fn format_summary(outcome: &BatchOutcome, manifest_path: Option<&Path>) -> Vec<String> {
    let mut lines = vec![format!(
        "Processed {}, skipped {}, failed {} ({})",
        outcome.processed_count,
        outcome.skipped_count,
        outcome.failed_count,
        plural(outcome.total(), "item")
    )];

    if !outcome.failures.is_empty() {
        lines.push("Failures".to_string());
        for failure in &outcome.failures {
            lines.push(format!(
                "{}{} ({}): {}",
                indent(1),
                failure.media_id,
                failure.error.kind(),
                failure.error
            ));
        }
    }

    if let Some(path) = manifest_path {
        lines.push(format!("Manifest → {}", path.display()));
    }
    lines
}

pub fn print_summary(outcome: &BatchOutcome, manifest_path: Option<&Path>) {
    for line in format_summary(outcome, manifest_path) {
        println!("{}", line);
    }
}

// ============================================================================
// Show output
// ============================================================================

/// Format manifest entries, in manifest order.
pub fn format_manifest(entries: &[MediaManifestEntry]) -> Vec<String> {
    if entries.is_empty() {
        return vec!["No converted media".to_string()];
    }

    let mut lines = Vec::new();
    for (i, entry) in entries.iter().enumerate() {
        let timestamp = if entry.timestamp.is_empty() {
            "no timestamp"
        } else {
            &entry.timestamp
        };
        lines.push(format!(
            "{} {} ({})",
            format_index(i + 1),
            entry.media_id,
            timestamp
        ));
        for (name, variant) in &entry.versions {
            lines.push(variant_line(name, variant));
        }
    }
    lines
}

pub fn print_manifest(entries: &[MediaManifestEntry]) {
    for line in format_manifest(entries) {
        println!("{}", line);
    }
}
