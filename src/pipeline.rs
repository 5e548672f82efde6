//! Pipeline coordinator: bounded fan-out over a batch, fan-in of results.
//!
//! ## Scheduling
//!
//! Items run on a dedicated rayon pool with exactly `max_concurrency`
//! threads, one spawned task per item. The item code never calls back into
//! rayon, so at most `max_concurrency` items are mid-flight at any moment
//! regardless of batch size. That caps open sockets and decoded-image memory.
//!
//! ## Aggregation
//!
//! Workers own nothing shared. Each sends `(index, ItemOutcome)` over an
//! `mpsc` channel; the coordinator is the single consumer and drains it only
//! after `pool.scope` returns, which is the barrier for the whole batch.
//! Counting and ordering happen there, on one thread.
//!
//! A panic inside an item (a codec bug, an allocation failure) is caught in
//! its worker and reported as that item's failure; the batch carries on.
//!
//! ## Ordering
//!
//! Entries are restored to input order first, then stable-sorted by
//! timestamp, newest first. Unparsable timestamps sort after every valid one.
//! Ties (equal or both unparsable) keep input order, so the same input list
//! always yields the same manifest.

use crate::config::PipelineConfig;
use crate::fetch::{FetchError, Fetcher, HttpFetcher};
use crate::imaging::{EncodeParams, ImageCodec, RustCodec};
use crate::manifest::{ManifestError, write_manifest};
use crate::process::{FailureKind, GeneratedVariant, ItemResult, ProcessError, SkipReason, process_item};
use crate::types::{MediaItem, MediaManifestEntry, VariantSpec};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::any::Any;
use std::cmp::Ordering;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};
use thiserror::Error;
use tracing::{debug, info, info_span, warn};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("invalid pipeline options: {0}")]
    InvalidOptions(String),
    #[error("cannot prepare storage directory {}: {source}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("failed to write manifest: {0}")]
    Manifest(#[from] ManifestError),
    #[error("failed to build HTTP client: {0}")]
    Fetcher(#[from] FetchError),
}

/// Everything the coordinator needs for one batch, passed explicitly.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub variants: Vec<VariantSpec>,
    pub storage_root: PathBuf,
    pub max_concurrency: usize,
    pub encode: EncodeParams,
}

impl PipelineOptions {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            variants: config.variants.clone(),
            storage_root: config.storage.media_dir.clone(),
            max_concurrency: config.effective_concurrency(),
            encode: config.images.encode_params(),
        }
    }
}

/// Final state of one item.
#[derive(Debug)]
pub enum ItemOutcome {
    Processed(MediaManifestEntry),
    Skipped(SkipReason),
    Failed(ProcessError),
}

/// A failed item, kept for reporting. Never part of the manifest.
#[derive(Debug)]
pub struct ItemFailure {
    pub media_id: String,
    pub error: ProcessError,
}

/// Aggregate result of a batch.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub processed_count: usize,
    pub skipped_count: usize,
    pub failed_count: usize,
    /// Manifest entries, newest first.
    pub entries: Vec<MediaManifestEntry>,
    /// Failed items in input order.
    pub failures: Vec<ItemFailure>,
}

impl BatchOutcome {
    pub fn total(&self) -> usize {
        self.processed_count + self.skipped_count + self.failed_count
    }
}

/// Progress notifications for the CLI.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessEvent {
    BatchStarted {
        total: usize,
        max_concurrency: usize,
    },
    /// Sent from the worker thread as soon as an item settles, so events
    /// arrive in completion order, not input order.
    ItemFinished {
        index: usize,
        total: usize,
        media_id: String,
        status: ItemStatus,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemStatus {
    /// Variants in configured order.
    Processed { variants: Vec<GeneratedVariant> },
    Skipped { reason: SkipReason },
    Failed { kind: FailureKind, message: String },
}

impl ItemStatus {
    fn from_outcome(outcome: &ItemOutcome, specs: &[VariantSpec]) -> Self {
        match outcome {
            ItemOutcome::Processed(entry) => ItemStatus::Processed {
                variants: specs
                    .iter()
                    .filter_map(|spec| {
                        entry.versions.get(&spec.name).map(|v| GeneratedVariant {
                            name: spec.name.clone(),
                            variant: v.clone(),
                        })
                    })
                    .collect(),
            },
            ItemOutcome::Skipped(reason) => ItemStatus::Skipped {
                reason: reason.clone(),
            },
            ItemOutcome::Failed(error) => ItemStatus::Failed {
                kind: error.kind(),
                message: error.to_string(),
            },
        }
    }
}

/// Result of [`transcode`]: the batch outcome plus where the manifest went.
#[derive(Debug)]
pub struct TranscodeReport {
    pub outcome: BatchOutcome,
    pub manifest_path: PathBuf,
}

/// Run the full pipeline with the production codec and HTTP fetcher, then
/// write the manifest into `config.storage.output_dir`.
pub fn transcode(
    items: &[MediaItem],
    config: &PipelineConfig,
    events: Option<Sender<ProcessEvent>>,
) -> Result<TranscodeReport, PipelineError> {
    let fetcher = HttpFetcher::new(&config.fetch.to_options())?;
    let codec = RustCodec::new();
    let options = PipelineOptions::from_config(config);

    let outcome = run(items, &options, &codec, &fetcher, events)?;
    let manifest_path = write_manifest(&outcome, &config.storage.output_dir)?;
    info!(path = %manifest_path.display(), "manifest written");

    Ok(TranscodeReport {
        outcome,
        manifest_path,
    })
}

/// Process a batch with the given codec and fetcher (allows testing with mocks).
///
/// Per-item problems never fail the batch; they are counted and reported in
/// the returned [`BatchOutcome`]. Only setup errors are returned as `Err`.
pub fn run<C, F>(
    items: &[MediaItem],
    options: &PipelineOptions,
    codec: &C,
    fetcher: &F,
    events: Option<Sender<ProcessEvent>>,
) -> Result<BatchOutcome, PipelineError>
where
    C: ImageCodec,
    F: Fetcher,
{
    if options.max_concurrency == 0 {
        return Err(PipelineError::InvalidOptions(
            "max_concurrency must be at least 1".into(),
        ));
    }

    std::fs::create_dir_all(&options.storage_root).map_err(|source| PipelineError::Storage {
        path: options.storage_root.clone(),
        source,
    })?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.max_concurrency)
        .thread_name(|i| format!("media-worker-{i}"))
        .build()?;

    let total = items.len();
    info!(
        items = total,
        max_concurrency = options.max_concurrency,
        "starting batch"
    );
    if let Some(events) = &events {
        let _ = events.send(ProcessEvent::BatchStarted {
            total,
            max_concurrency: options.max_concurrency,
        });
    }

    let (tx, rx) = mpsc::channel::<(usize, ItemOutcome)>();

    pool.scope(|scope| {
        for (index, item) in items.iter().enumerate() {
            let tx = tx.clone();
            let events = events.clone();
            scope.spawn(move |_| {
                let span = info_span!("item", media_id = %item.id);
                let _enter = span.enter();

                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    settle(codec, fetcher, item, options)
                }))
                .unwrap_or_else(|payload| {
                    ItemOutcome::Failed(ProcessError::Panicked {
                        message: panic_message(&*payload),
                    })
                });
                match &outcome {
                    ItemOutcome::Processed(entry) => {
                        debug!(variants = entry.versions.len(), "processed")
                    }
                    ItemOutcome::Skipped(reason) => debug!(%reason, "skipped"),
                    ItemOutcome::Failed(error) => warn!(kind = %error.kind(), %error, "failed"),
                }

                if let Some(events) = &events {
                    let _ = events.send(ProcessEvent::ItemFinished {
                        index,
                        total,
                        media_id: item.id.clone(),
                        status: ItemStatus::from_outcome(&outcome, &options.variants),
                    });
                }
                // The receiver outlives the scope.
                let _ = tx.send((index, outcome));
            });
        }
    });
    drop(tx);

    let outcome = aggregate(items, rx.into_iter().collect());
    info!(
        processed = outcome.processed_count,
        skipped = outcome.skipped_count,
        failed = outcome.failed_count,
        "batch complete"
    );
    Ok(outcome)
}

/// Run the item processor and fold its result into an [`ItemOutcome`].
fn settle<C: ImageCodec>(
    codec: &C,
    fetcher: &impl Fetcher,
    item: &MediaItem,
    options: &PipelineOptions,
) -> ItemOutcome {
    let result = process_item(
        codec,
        fetcher,
        item,
        &options.variants,
        &options.storage_root,
        &options.encode,
    );
    match result {
        Ok(ItemResult::Converted(variants)) if variants.is_empty() => {
            ItemOutcome::Failed(ProcessError::NoVariants {
                media_id: item.id.clone(),
            })
        }
        Ok(ItemResult::Converted(variants)) => ItemOutcome::Processed(MediaManifestEntry {
            media_id: item.id.clone(),
            timestamp: item.timestamp.clone(),
            versions: variants
                .into_iter()
                .map(|generated| (generated.name, generated.variant))
                .collect(),
        }),
        Ok(ItemResult::Skipped(reason)) => ItemOutcome::Skipped(reason),
        Err(error) => ItemOutcome::Failed(error),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Count outcomes and order entries. `results` arrive in completion order.
fn aggregate(items: &[MediaItem], mut results: Vec<(usize, ItemOutcome)>) -> BatchOutcome {
    results.sort_by_key(|(index, _)| *index);

    let mut outcome = BatchOutcome::default();
    for (index, item_outcome) in results {
        match item_outcome {
            ItemOutcome::Processed(entry) => {
                outcome.processed_count += 1;
                outcome.entries.push(entry);
            }
            ItemOutcome::Skipped(_) => outcome.skipped_count += 1,
            ItemOutcome::Failed(error) => {
                outcome.failed_count += 1;
                outcome.failures.push(ItemFailure {
                    media_id: items[index].id.clone(),
                    error,
                });
            }
        }
    }

    outcome.entries = sort_entries(std::mem::take(&mut outcome.entries));
    outcome
}

/// Parse an upstream timestamp into UTC.
///
/// Accepts RFC 3339 (`2025-04-16T15:58:54Z`, `+00:00`), offsets without a
/// colon (`2025-04-16T15:58:54+0000`), naive date-times (taken as UTC) and
/// bare dates (UTC midnight).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%z", "%Y-%m-%dT%H:%M:%S%.f%z"] {
        if let Ok(t) = DateTime::parse_from_str(raw, format) {
            return Some(t.with_timezone(&Utc));
        }
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(t.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

/// Newest first; unparsable after all valid timestamps; unparsable pairs equal.
///
/// A total order, so a stable sort with it is deterministic.
pub fn compare_timestamps(a: Option<&DateTime<Utc>>, b: Option<&DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable sort of manifest entries by timestamp, newest first.
pub fn sort_entries(entries: Vec<MediaManifestEntry>) -> Vec<MediaManifestEntry> {
    let mut keyed: Vec<(Option<DateTime<Utc>>, MediaManifestEntry)> = entries
        .into_iter()
        .map(|entry| (parse_timestamp(&entry.timestamp), entry))
        .collect();
    keyed.sort_by(|(a, _), (b, _)| compare_timestamps(a.as_ref(), b.as_ref()));
    keyed.into_iter().map(|(_, entry)| entry).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::tests::MockFetcher;
    use crate::imaging::backend::tests::MockCodec;
    use crate::imaging::{CodecError, Dimensions, ResizeParams};
    use crate::types::default_variants;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use std::time::Duration;
    use tempfile::TempDir;

    fn options(storage_root: PathBuf, max_concurrency: usize) -> PipelineOptions {
        PipelineOptions {
            variants: default_variants(),
            storage_root,
            max_concurrency,
            encode: EncodeParams::default(),
        }
    }

    fn entry(id: &str, timestamp: &str) -> MediaManifestEntry {
        MediaManifestEntry {
            media_id: id.to_string(),
            timestamp: timestamp.to_string(),
            versions: BTreeMap::new(),
        }
    }

    fn ids(entries: &[MediaManifestEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.media_id.as_str()).collect()
    }

    // =========================================================================
    // Timestamp parsing and ordering
    // =========================================================================

    #[test]
    fn parses_offset_without_colon() {
        let t = parse_timestamp("2025-04-16T15:58:54+0000").unwrap();
        assert_eq!(t.to_rfc3339(), "2025-04-16T15:58:54+00:00");
    }

    #[test]
    fn parses_rfc3339_and_normalizes_offset() {
        let t = parse_timestamp("2025-04-16T17:58:54+02:00").unwrap();
        assert_eq!(t, parse_timestamp("2025-04-16T15:58:54Z").unwrap());
    }

    #[test]
    fn parses_naive_and_date_only() {
        assert!(parse_timestamp("2025-04-16T15:58:54").is_some());
        assert!(parse_timestamp("2025-04-16T15:58:54.250").is_some());
        assert_eq!(
            parse_timestamp("2025-04-16").unwrap().to_rfc3339(),
            "2025-04-16T00:00:00+00:00"
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("2025-13-45T99:00:00Z").is_none());
    }

    #[test]
    fn newest_first_with_invalid_last() {
        let sorted = sort_entries(vec![
            entry("bad1", "not a date"),
            entry("old", "2024-01-01T00:00:00+0000"),
            entry("new", "2025-06-01T12:00:00+0000"),
            entry("bad2", ""),
            entry("mid", "2024-12-31T23:59:59Z"),
        ]);
        assert_eq!(ids(&sorted), vec!["new", "mid", "old", "bad1", "bad2"]);
    }

    #[test]
    fn ties_keep_input_order() {
        let sorted = sort_entries(vec![
            entry("a", "2025-01-01T00:00:00Z"),
            entry("b", "2025-01-01T00:00:00+0000"),
            entry("c", "2025-01-01T01:00:00+01:00"),
        ]);
        assert_eq!(ids(&sorted), vec!["a", "b", "c"]);
    }

    #[test]
    fn comparator_is_symmetric_for_invalid_pairs() {
        assert_eq!(compare_timestamps(None, None), Ordering::Equal);
        let t = parse_timestamp("2025-01-01").unwrap();
        assert_eq!(compare_timestamps(Some(&t), None), Ordering::Less);
        assert_eq!(compare_timestamps(None, Some(&t)), Ordering::Greater);
    }

    // =========================================================================
    // run with mocks
    // =========================================================================

    fn mixed_batch() -> (Vec<MediaItem>, MockFetcher) {
        let items = vec![
            MediaItem::new("img1", "https://x/1.jpg", "2025-01-01T00:00:00+0000"),
            MediaItem::new("vid", "https://x/clip.mp4", "2025-01-02T00:00:00+0000"),
            MediaItem::new("img2", "https://x/2.jpg", "2025-03-01T00:00:00+0000"),
            MediaItem::new("gone", "https://x/404.jpg", "2025-02-01T00:00:00+0000"),
            MediaItem::new("nourl", "", "2025-02-02T00:00:00+0000"),
            MediaItem::new("img3", "https://x/3.png", "garbage"),
        ];
        let fetcher = MockFetcher::new()
            .with("https://x/1.jpg", MockCodec::image_bytes(1600, 1200))
            .with("https://x/2.jpg", MockCodec::image_bytes(1080, 1350))
            .with("https://x/3.png", MockCodec::image_bytes(500, 500));
        (items, fetcher)
    }

    #[test]
    fn counts_every_item_exactly_once() {
        let tmp = TempDir::new().unwrap();
        let (items, fetcher) = mixed_batch();

        let outcome = run(
            &items,
            &options(tmp.path().join("media"), 3),
            &MockCodec::new(),
            &fetcher,
            None,
        )
        .unwrap();

        assert_eq!(outcome.processed_count, 3);
        assert_eq!(outcome.skipped_count, 1);
        assert_eq!(outcome.failed_count, 2);
        assert_eq!(outcome.total(), items.len());
        assert_eq!(outcome.entries.len(), outcome.processed_count);

        let failed: Vec<(&str, FailureKind)> = outcome
            .failures
            .iter()
            .map(|f| (f.media_id.as_str(), f.error.kind()))
            .collect();
        assert_eq!(
            failed,
            vec![("gone", FailureKind::Download), ("nourl", FailureKind::NoUrl)]
        );
    }

    #[test]
    fn entries_sorted_newest_first_with_invalid_last() {
        let tmp = TempDir::new().unwrap();
        let (items, fetcher) = mixed_batch();

        let outcome = run(
            &items,
            &options(tmp.path().to_path_buf(), 4),
            &MockCodec::new(),
            &fetcher,
            None,
        )
        .unwrap();

        assert_eq!(ids(&outcome.entries), vec!["img2", "img1", "img3"]);
        let img2 = &outcome.entries[0];
        assert_eq!(img2.versions.len(), 4);
        assert_eq!(img2.versions["small"].height, 480);
    }

    #[test]
    fn failed_item_writes_no_files() {
        let tmp = TempDir::new().unwrap();
        let (items, fetcher) = mixed_batch();

        run(
            &items,
            &options(tmp.path().to_path_buf(), 2),
            &MockCodec::new(),
            &fetcher,
            None,
        )
        .unwrap();

        let names: Vec<String> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 12);
        assert!(names.iter().all(|n| !n.starts_with("gone_") && !n.starts_with("vid_")));
    }

    #[test]
    fn concurrency_never_exceeds_cap() {
        let tmp = TempDir::new().unwrap();
        let mut fetcher = MockFetcher::new().with_delay(Duration::from_millis(20));
        let mut items = Vec::new();
        for i in 0..12 {
            let url = format!("https://x/{i}.jpg");
            fetcher = fetcher.with(&url, MockCodec::image_bytes(100, 100));
            items.push(MediaItem::new(format!("m{i}"), url, "2025-01-01T00:00:00Z"));
        }

        let outcome = run(
            &items,
            &options(tmp.path().to_path_buf(), 3),
            &MockCodec::new(),
            &fetcher,
            None,
        )
        .unwrap();

        assert_eq!(outcome.processed_count, 12);
        assert!(fetcher.peak_in_flight() <= 3, "peak {}", fetcher.peak_in_flight());
        assert!(fetcher.peak_in_flight() >= 1);
    }

    /// Counts items between the start of their download and the encode of
    /// their last variant, i.e. across fetch, decode and every resize/encode.
    #[derive(Default)]
    struct ItemGauge {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl ItemGauge {
        fn enter(&self) {
            let now = self.in_flight.fetch_add(1, AtomicOrdering::SeqCst) + 1;
            self.peak.fetch_max(now, AtomicOrdering::SeqCst);
        }

        fn leave(&self) {
            self.in_flight.fetch_sub(1, AtomicOrdering::SeqCst);
        }
    }

    struct GaugedFetcher<'a> {
        inner: MockFetcher,
        gauge: &'a ItemGauge,
    }

    impl Fetcher for GaugedFetcher<'_> {
        fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            self.gauge.enter();
            let result = self.inner.fetch(url);
            if result.is_err() {
                self.gauge.leave();
            }
            result
        }
    }

    /// Slow codec that closes the gauge after encoding `last_width`.
    struct GaugedCodec<'a> {
        inner: MockCodec,
        gauge: &'a ItemGauge,
        last_width: u32,
        delay: Duration,
    }

    impl ImageCodec for GaugedCodec<'_> {
        type Image = Dimensions;

        fn decode(&self, bytes: &[u8]) -> Result<Dimensions, CodecError> {
            std::thread::sleep(self.delay);
            self.inner.decode(bytes)
        }

        fn dimensions(&self, image: &Dimensions) -> Dimensions {
            self.inner.dimensions(image)
        }

        fn resize(&self, image: &Dimensions, params: &ResizeParams) -> Result<Dimensions, CodecError> {
            self.inner.resize(image, params)
        }

        fn encode(&self, image: &Dimensions, params: &EncodeParams) -> Result<Vec<u8>, CodecError> {
            std::thread::sleep(self.delay);
            let result = self.inner.encode(image, params);
            if image.width == self.last_width {
                self.gauge.leave();
            }
            result
        }
    }

    #[test]
    fn items_in_flight_never_exceed_cap() {
        let tmp = TempDir::new().unwrap();
        let gauge = ItemGauge::default();
        let mut inner = MockFetcher::new().with_delay(Duration::from_millis(5));
        let mut items = Vec::new();
        for i in 0..10 {
            let url = format!("https://x/{i}.jpg");
            inner = inner.with(&url, MockCodec::image_bytes(640, 480));
            items.push(MediaItem::new(format!("g{i}"), url, "2025-01-01T00:00:00Z"));
        }
        let fetcher = GaugedFetcher {
            inner,
            gauge: &gauge,
        };
        let codec = GaugedCodec {
            inner: MockCodec::new(),
            gauge: &gauge,
            last_width: 256,
            delay: Duration::from_millis(3),
        };

        let outcome = run(
            &items,
            &options(tmp.path().to_path_buf(), 3),
            &codec,
            &fetcher,
            None,
        )
        .unwrap();

        assert_eq!(outcome.processed_count, 10);
        let peak = gauge.peak.load(AtomicOrdering::SeqCst);
        assert!((1..=3).contains(&peak), "peak {peak}");
        assert_eq!(gauge.in_flight.load(AtomicOrdering::SeqCst), 0);
    }

    #[test]
    fn panicking_item_fails_alone() {
        let tmp = TempDir::new().unwrap();
        let items = vec![
            MediaItem::new("ok1", "https://x/ok1.jpg", "2025-01-01T00:00:00Z"),
            MediaItem::new("boom", "https://x/boom.jpg", "2025-01-02T00:00:00Z"),
            MediaItem::new("ok2", "https://x/ok2.jpg", "2025-01-03T00:00:00Z"),
        ];
        let fetcher = MockFetcher::new()
            .with("https://x/ok1.jpg", MockCodec::image_bytes(400, 300))
            .with("https://x/boom.jpg", MockCodec::PANIC_BYTES.to_vec())
            .with("https://x/ok2.jpg", MockCodec::image_bytes(400, 300));

        let outcome = run(
            &items,
            &options(tmp.path().to_path_buf(), 2),
            &MockCodec::new(),
            &fetcher,
            None,
        )
        .unwrap();

        assert_eq!(outcome.processed_count, 2);
        assert_eq!(outcome.failed_count, 1);
        assert_eq!(ids(&outcome.entries), vec!["ok2", "ok1"]);
        let failure = &outcome.failures[0];
        assert_eq!(failure.media_id, "boom");
        assert_eq!(failure.error.kind(), FailureKind::Panic);
        assert!(failure.error.to_string().contains("mock decoder blew up"));
    }

    #[test]
    fn single_worker_is_sequential() {
        let tmp = TempDir::new().unwrap();
        let (items, fetcher) = mixed_batch();
        let fetcher = fetcher.with_delay(Duration::from_millis(5));

        run(
            &items,
            &options(tmp.path().to_path_buf(), 1),
            &MockCodec::new(),
            &fetcher,
            None,
        )
        .unwrap();

        assert_eq!(fetcher.peak_in_flight(), 1);
    }

    #[test]
    fn identical_timestamps_are_stable_across_runs() {
        let items: Vec<MediaItem> = ["c", "a", "b", "d"]
            .iter()
            .map(|id| MediaItem::new(*id, format!("https://x/{id}.jpg"), "2025-05-05T05:05:05+0000"))
            .collect();
        let mut fetcher = MockFetcher::new();
        for id in ["a", "b", "c", "d"] {
            fetcher = fetcher.with(&format!("https://x/{id}.jpg"), MockCodec::image_bytes(300, 200));
        }

        let mut orders = Vec::new();
        for _ in 0..3 {
            let tmp = TempDir::new().unwrap();
            let outcome = run(
                &items,
                &options(tmp.path().to_path_buf(), 4),
                &MockCodec::new(),
                &fetcher,
                None,
            )
            .unwrap();
            orders.push(
                outcome
                    .entries
                    .iter()
                    .map(|e| e.media_id.clone())
                    .collect::<Vec<_>>(),
            );
        }

        assert_eq!(orders[0], vec!["c", "a", "b", "d"]);
        assert!(orders.iter().all(|o| o == &orders[0]));
    }

    #[test]
    fn rerun_produces_same_file_names() {
        let tmp = TempDir::new().unwrap();
        let (items, fetcher) = mixed_batch();
        let opts = options(tmp.path().to_path_buf(), 2);

        let first = run(&items, &opts, &MockCodec::new(), &fetcher, None).unwrap();
        let second = run(&items, &opts, &MockCodec::new(), &fetcher, None).unwrap();

        assert_eq!(first.entries, second.entries);
    }

    #[test]
    fn encode_failure_isolated_to_item() {
        let tmp = TempDir::new().unwrap();
        let items = vec![
            MediaItem::new("ok", "https://x/ok.jpg", "2025-01-01T00:00:00Z"),
            MediaItem::new("bad", "https://x/bad.jpg", "2025-01-02T00:00:00Z"),
        ];
        let fetcher = MockFetcher::new()
            .with("https://x/ok.jpg", MockCodec::image_bytes(400, 300))
            .with("https://x/bad.jpg", MockCodec::image_bytes(400, 300));
        // Fails every item's 256px encode, so both fail.
        let codec = MockCodec::failing_encode_at(256);

        let outcome = run(
            &items,
            &options(tmp.path().to_path_buf(), 2),
            &codec,
            &fetcher,
            None,
        )
        .unwrap();

        assert_eq!(outcome.failed_count, 2);
        assert!(outcome.entries.is_empty());
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn empty_variant_table_fails_items() {
        let tmp = TempDir::new().unwrap();
        let (items, fetcher) = mixed_batch();
        let opts = PipelineOptions {
            variants: vec![],
            ..options(tmp.path().to_path_buf(), 2)
        };

        let outcome = run(&items, &opts, &MockCodec::new(), &fetcher, None).unwrap();

        assert_eq!(outcome.processed_count, 0);
        assert!(
            outcome
                .failures
                .iter()
                .any(|f| f.error.kind() == FailureKind::NoVariants)
        );
    }

    #[test]
    fn empty_batch() {
        let tmp = TempDir::new().unwrap();
        let outcome = run(
            &[],
            &options(tmp.path().to_path_buf(), 2),
            &MockCodec::new(),
            &MockFetcher::new(),
            None,
        )
        .unwrap();
        assert_eq!(outcome.total(), 0);
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let result = run(
            &[],
            &options(tmp.path().to_path_buf(), 0),
            &MockCodec::new(),
            &MockFetcher::new(),
            None,
        );
        assert!(matches!(result, Err(PipelineError::InvalidOptions(_))));
    }

    #[test]
    fn storage_root_failure_aborts_before_dispatch() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("media");
        std::fs::write(&blocker, "file, not dir").unwrap();
        let (items, fetcher) = mixed_batch();

        let result = run(
            &items,
            &options(blocker.join("nested"), 2),
            &MockCodec::new(),
            &fetcher,
            None,
        );

        assert!(matches!(result, Err(PipelineError::Storage { .. })));
        assert!(fetcher.requested().is_empty());
    }

    #[test]
    fn emits_one_finished_event_per_item() {
        let tmp = TempDir::new().unwrap();
        let (items, fetcher) = mixed_batch();
        let (tx, rx) = mpsc::channel();

        run(
            &items,
            &options(tmp.path().to_path_buf(), 3),
            &MockCodec::new(),
            &fetcher,
            Some(tx),
        )
        .unwrap();

        let events: Vec<ProcessEvent> = rx.into_iter().collect();
        assert!(matches!(
            events[0],
            ProcessEvent::BatchStarted {
                total: 6,
                max_concurrency: 3
            }
        ));
        let finished = events
            .iter()
            .filter(|e| matches!(e, ProcessEvent::ItemFinished { .. }))
            .count();
        assert_eq!(finished, 6);

        let img1 = events.iter().find_map(|e| match e {
            ProcessEvent::ItemFinished {
                media_id, status, ..
            } if media_id == "img1" => Some(status.clone()),
            _ => None,
        });
        let Some(ItemStatus::Processed { variants }) = img1 else {
            panic!("img1 should be processed");
        };
        let names: Vec<&str> = variants.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["large", "medium", "small", "thumb"]);
    }
}
