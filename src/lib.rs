//! # Media Variants
//!
//! Batch transcoder for remote media: takes a list of media items (ID, image
//! URL, timestamp), downloads each image, writes resized variants at a fixed
//! set of widths, and records the result in a JSON manifest.
//!
//! # Architecture: Fan-Out, Fan-In
//!
//! ```text
//!                      ┌─ process_item ─┐
//! MediaItem[] ─ run ───┼─ process_item ─┼─ mpsc ─ aggregate ─ sort ─ converted_media.json
//!   (input)  (≤ N at   └─ process_item ─┘         (counts)   (newest
//!             a time)   fetch → decode →                       first)
//!                       resize/encode → write
//! ```
//!
//! - **Item isolation**: one broken URL, undecodable file or full disk fails
//!   that item only. Failures are counted and reported, never propagated.
//! - **Bounded concurrency**: a dedicated rayon pool sized to
//!   `max_concurrency` caps open downloads and decoded images in memory.
//! - **Deterministic output**: file names depend only on `(id, width, name)`,
//!   and manifest order only on the input list, never on completion order.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pipeline`] | Coordinator: worker pool, result aggregation, timestamp ordering |
//! | [`process`] | One item: URL choice, skip rules, fetch, variants, file writes |
//! | [`fetch`] | [`fetch::Fetcher`] trait and the blocking HTTP implementation |
//! | [`imaging`] | Decode, resize and encode behind the [`imaging::ImageCodec`] trait |
//! | [`manifest`] | Atomic read/write of `converted_media.json` |
//! | [`input`] | Media item lists from JSON |
//! | [`config`] | TOML config: defaults, merging, validation |
//! | [`naming`] | Variant file names, URL extension sniffing, ID safety |
//! | [`types`] | Shared types: `MediaItem`, `VariantSpec`, manifest entries |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## All-or-Nothing Items
//!
//! Every variant is encoded in memory before any file is written. If one
//! variant fails the item fails as a whole, files already written for it are
//! removed, and it gets no manifest entry. Consumers can rely on every entry
//! having the full variant set.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, Lanczos3 resampling and encoding all go through the `image` crate
//! (WebP via its lossless encoder, AVIF via rav1e). No system libraries are
//! needed, so the binary runs anywhere.
//!
//! ## Traits at the I/O Seams
//!
//! Network and codec access sit behind [`fetch::Fetcher`] and
//! [`imaging::ImageCodec`]. The coordinator and item processor are generic
//! over both, so their logic is tested with in-memory mocks, while the real
//! implementations are exercised against a loopback HTTP server.

pub mod config;
pub mod fetch;
pub mod imaging;
pub mod input;
pub mod manifest;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod types;
