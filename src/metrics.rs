//! Run metrics: counters shared by all pipeline threads, plus a fetch window tracker.
//!
//! One [`Metrics`] is created per run and passed to every component inside an `Arc`.
//! Nothing here affects pipeline behavior; all counters are advisory.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime};

/// Earliest fetch start and latest fetch finish across all workers, as millis since `origin`.
#[derive(Debug)]
pub struct FetchWindow {
    origin: Instant,
    earliest_start_ms: AtomicU64,
    latest_finish_ms: AtomicU64,
}

impl FetchWindow {
    pub fn new(origin: Instant) -> Self {
        Self {
            origin,
            earliest_start_ms: AtomicU64::new(u64::MAX),
            latest_finish_ms: AtomicU64::new(0),
        }
    }

    fn millis_since_origin(&self, at: Instant) -> u64 {
        at.saturating_duration_since(self.origin).as_millis() as u64
    }

    pub fn record_start(&self, at: Instant) {
        let ms = self.millis_since_origin(at);
        self.earliest_start_ms.fetch_min(ms, Ordering::Relaxed);
    }

    pub fn record_finish(&self, at: Instant) {
        let ms = self.millis_since_origin(at);
        self.latest_finish_ms.fetch_max(ms, Ordering::Relaxed);
    }

    /// Span from the first fetch start to the last fetch finish. None until a fetch has finished.
    pub fn span(&self) -> Option<Duration> {
        let start = self.earliest_start_ms.load(Ordering::Relaxed);
        let finish = self.latest_finish_ms.load(Ordering::Relaxed);
        if start == u64::MAX || finish < start {
            return None;
        }
        Some(Duration::from_millis(finish - start))
    }
}

/// Counters for one run.
#[derive(Debug)]
pub struct Metrics {
    started: Instant,
    started_wall: SystemTime,
    bytes_fetched: AtomicU64,
    fetches: AtomicU64,
    fetch_failures: AtomicU64,
    bytes_written: AtomicU64,
    entries_written: AtomicU64,
    intake_empty_polls: AtomicU64,
    intake_full_retries: AtomicU64,
    buffer_full_retries: AtomicU64,
    fetch_window: FetchWindow,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let started = Instant::now();
        Self {
            started,
            started_wall: SystemTime::now(),
            bytes_fetched: AtomicU64::new(0),
            fetches: AtomicU64::new(0),
            fetch_failures: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            entries_written: AtomicU64::new(0),
            intake_empty_polls: AtomicU64::new(0),
            intake_full_retries: AtomicU64::new(0),
            buffer_full_retries: AtomicU64::new(0),
            fetch_window: FetchWindow::new(started),
        }
    }

    pub fn fetch_window(&self) -> &FetchWindow {
        &self.fetch_window
    }

    /// One successful fetch of `bytes` bytes.
    pub fn observe_fetch(&self, bytes: u64) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        self.bytes_fetched.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn inc_fetch_failures(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// One archive entry of `bytes` attachment bytes written.
    pub fn observe_written(&self, bytes: u64) {
        self.entries_written.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn inc_intake_empty(&self) {
        self.intake_empty_polls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_intake_full(&self) {
        self.intake_full_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_buffer_full(&self) {
        self.buffer_full_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let elapsed = self.started.elapsed();
        let bytes_written = self.bytes_written.load(Ordering::Relaxed);
        let bytes_fetched = self.bytes_fetched.load(Ordering::Relaxed);
        let fetch_span = self.fetch_window.span();
        MetricsSnapshot {
            started_unix_ms: unix_millis(self.started_wall),
            finished_unix_ms: unix_millis(SystemTime::now()),
            elapsed_ms: elapsed.as_millis() as u64,
            bytes_fetched,
            fetches: self.fetches.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            bytes_written,
            entries_written: self.entries_written.load(Ordering::Relaxed),
            intake_empty_polls: self.intake_empty_polls.load(Ordering::Relaxed),
            intake_full_retries: self.intake_full_retries.load(Ordering::Relaxed),
            buffer_full_retries: self.buffer_full_retries.load(Ordering::Relaxed),
            fetch_span_ms: fetch_span.map(|d| d.as_millis() as u64),
            written_bytes_per_sec: per_second(bytes_written, elapsed),
            fetch_bytes_per_sec: fetch_span.map(|d| per_second(bytes_fetched, d)),
        }
    }
}

fn unix_millis(at: SystemTime) -> u64 {
    at.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn per_second(bytes: u64, over: Duration) -> f64 {
    let ms = over.as_millis();
    if ms == 0 {
        return 0.0;
    }
    bytes as f64 / ms as f64 * 1000.0
}

/// Point-in-time copy of [`Metrics`], returned in [`RunSummary`](crate::RunSummary).
#[derive(Clone, Debug, Default, Serialize)]
pub struct MetricsSnapshot {
    pub started_unix_ms: u64,
    /// When the snapshot was taken (end of run).
    pub finished_unix_ms: u64,
    pub elapsed_ms: u64,
    pub bytes_fetched: u64,
    pub fetches: u64,
    pub fetch_failures: u64,
    pub bytes_written: u64,
    pub entries_written: u64,
    pub intake_empty_polls: u64,
    pub intake_full_retries: u64,
    pub buffer_full_retries: u64,
    /// First fetch start to last fetch finish.
    pub fetch_span_ms: Option<u64>,
    pub written_bytes_per_sec: f64,
    /// Aggregate fetch throughput over the fetch span.
    pub fetch_bytes_per_sec: Option<f64>,
}

/// `HH:MM:SS.mmm`
pub fn format_elapsed(elapsed: Duration) -> String {
    let ms = elapsed.as_millis();
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        ms / 3_600_000,
        (ms / 60_000) % 60,
        (ms / 1000) % 60,
        ms % 1000
    )
}

impl MetricsSnapshot {
    /// Log the end-of-run summary at info level.
    pub fn log_summary(&self) {
        log::info!(
            "Start: {} ms since epoch, finish: {} ms since epoch",
            self.started_unix_ms,
            self.finished_unix_ms
        );
        log::info!(
            "Elapsed (HH:MM:SS.mmm): {}",
            format_elapsed(Duration::from_millis(self.elapsed_ms))
        );
        log::info!(
            "Attachment bytes written: {} in {} entries ({:.0} bytes/sec)",
            self.bytes_written,
            self.entries_written,
            self.written_bytes_per_sec
        );
        if let (Some(span), Some(rate)) = (self.fetch_span_ms, self.fetch_bytes_per_sec) {
            log::info!(
                "Fetched {} bytes in {} fetches over {} ({:.0} bytes/sec)",
                self.bytes_fetched,
                self.fetches,
                format_elapsed(Duration::from_millis(span)),
                rate
            );
        }
        log::debug!(
            "intake empty polls: {}, intake full retries: {}, buffer full retries: {}, fetch failures: {}",
            self.intake_empty_polls,
            self.intake_full_retries,
            self.buffer_full_retries,
            self.fetch_failures
        );
    }
}
