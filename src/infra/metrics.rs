//! Lock-free scan metrics and periodic reporting
//!
//! Uses atomics so the kiosk loop and spawned verification tasks can record
//! without locking. `report()` swaps the periodic counters to zero.
//!
//! NOTE: All atomics use Relaxed ordering intentionally. These are
//! statistical counters only and must not drive kiosk decisions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Verification latency bucket boundaries (milliseconds)
/// Buckets: ≤50, ≤100, ≤200, ≤400, ≤800, ≤1600, ≤3200, ≤6400, ≤12800, ≤25600, >25600
const BUCKET_BOUNDS: [u64; 10] = [50, 100, 200, 400, 800, 1600, 3200, 6400, 12800, 25600];
const NUM_BUCKETS: usize = 11;

#[inline]
fn bucket_index(latency_ms: u64) -> usize {
    BUCKET_BOUNDS.partition_point(|&bound| bound < latency_ms)
}

/// Update an atomic max value using compare-and-swap loop
#[inline]
fn update_atomic_max(atomic_max: &AtomicU64, new_value: u64) {
    let mut current_max = atomic_max.load(Ordering::Relaxed);
    while new_value > current_max {
        match atomic_max.compare_exchange_weak(
            current_max,
            new_value,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(actual) => current_max = actual,
        }
    }
}

#[inline]
fn swap_buckets(buckets: &[AtomicU64; NUM_BUCKETS]) -> [u64; NUM_BUCKETS] {
    let mut result = [0u64; NUM_BUCKETS];
    for (i, bucket) in buckets.iter().enumerate() {
        result[i] = bucket.swap(0, Ordering::Relaxed);
    }
    result
}

/// Upper bound of the bucket containing the percentile
fn percentile_from_buckets(buckets: &[u64; NUM_BUCKETS], percentile: f64) -> u64 {
    let total: u64 = buckets.iter().sum();
    if total == 0 {
        return 0;
    }

    let target = ((total as f64 * percentile).ceil() as u64).max(1);
    let mut cumulative = 0u64;

    // Last bucket uses 2x the previous bound
    const BUCKET_UPPER_BOUNDS: [u64; NUM_BUCKETS] =
        [50, 100, 200, 400, 800, 1600, 3200, 6400, 12800, 25600, 51200];

    for (i, &count) in buckets.iter().enumerate() {
        cumulative += count;
        if cumulative >= target {
            return BUCKET_UPPER_BOUNDS[i];
        }
    }
    BUCKET_UPPER_BOUNDS[NUM_BUCKETS - 1]
}

/// How a settled scan was resolved, for counting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanResolution {
    Verified,
    Fallback,
    NotRecognized,
    Failed,
}

/// Lock-free metrics collector
pub struct Metrics {
    /// Scans admitted for verification (monotonic)
    scans_total: AtomicU64,
    /// Decoded inputs discarded while a scan was in flight (monotonic)
    ignored_total: AtomicU64,
    verified_total: AtomicU64,
    fallback_total: AtomicU64,
    not_recognized_total: AtomicU64,
    failed_total: AtomicU64,
    /// Scanner force-closed by the inactivity timer (monotonic)
    inactivity_closes_total: AtomicU64,
    /// Settled since last report (reset on report)
    settled_since_report: AtomicU64,
    latency_sum_ms: AtomicU64,
    latency_max_ms: AtomicU64,
    latency_buckets: [AtomicU64; NUM_BUCKETS],
    last_report_time: parking_lot::Mutex<Instant>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            scans_total: AtomicU64::new(0),
            ignored_total: AtomicU64::new(0),
            verified_total: AtomicU64::new(0),
            fallback_total: AtomicU64::new(0),
            not_recognized_total: AtomicU64::new(0),
            failed_total: AtomicU64::new(0),
            inactivity_closes_total: AtomicU64::new(0),
            settled_since_report: AtomicU64::new(0),
            latency_sum_ms: AtomicU64::new(0),
            latency_max_ms: AtomicU64::new(0),
            latency_buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            last_report_time: parking_lot::Mutex::new(Instant::now()),
        }
    }

    #[inline]
    pub fn record_scan_admitted(&self) {
        self.scans_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_scan_ignored(&self) {
        self.ignored_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_inactivity_close(&self) {
        self.inactivity_closes_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a settled verification round-trip
    #[inline]
    pub fn record_settled(&self, resolution: ScanResolution, latency_ms: u64) {
        let counter = match resolution {
            ScanResolution::Verified => &self.verified_total,
            ScanResolution::Fallback => &self.fallback_total,
            ScanResolution::NotRecognized => &self.not_recognized_total,
            ScanResolution::Failed => &self.failed_total,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        self.settled_since_report.fetch_add(1, Ordering::Relaxed);
        self.latency_sum_ms.fetch_add(latency_ms, Ordering::Relaxed);
        self.latency_buckets[bucket_index(latency_ms)].fetch_add(1, Ordering::Relaxed);
        update_atomic_max(&self.latency_max_ms, latency_ms);
    }

    pub fn scans_total(&self) -> u64 {
        self.scans_total.load(Ordering::Relaxed)
    }

    pub fn ignored_total(&self) -> u64 {
        self.ignored_total.load(Ordering::Relaxed)
    }

    /// Snapshot and reset the periodic counters
    pub fn report(&self) -> MetricsSummary {
        let settled = self.settled_since_report.swap(0, Ordering::Relaxed);
        let latency_sum = self.latency_sum_ms.swap(0, Ordering::Relaxed);
        let latency_max = self.latency_max_ms.swap(0, Ordering::Relaxed);
        let buckets = swap_buckets(&self.latency_buckets);

        let elapsed = {
            let mut last = self.last_report_time.lock();
            let elapsed = last.elapsed();
            *last = Instant::now();
            elapsed
        };

        MetricsSummary {
            interval_secs: elapsed.as_secs(),
            scans_total: self.scans_total.load(Ordering::Relaxed),
            ignored_total: self.ignored_total.load(Ordering::Relaxed),
            verified_total: self.verified_total.load(Ordering::Relaxed),
            fallback_total: self.fallback_total.load(Ordering::Relaxed),
            not_recognized_total: self.not_recognized_total.load(Ordering::Relaxed),
            failed_total: self.failed_total.load(Ordering::Relaxed),
            inactivity_closes_total: self.inactivity_closes_total.load(Ordering::Relaxed),
            settled_in_interval: settled,
            avg_verify_ms: if settled > 0 { latency_sum / settled } else { 0 },
            max_verify_ms: latency_max,
            p95_verify_ms: percentile_from_buckets(&buckets, 0.95),
        }
    }
}

/// Snapshot returned by [`Metrics::report`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSummary {
    pub interval_secs: u64,
    pub scans_total: u64,
    pub ignored_total: u64,
    pub verified_total: u64,
    pub fallback_total: u64,
    pub not_recognized_total: u64,
    pub failed_total: u64,
    pub inactivity_closes_total: u64,
    pub settled_in_interval: u64,
    pub avg_verify_ms: u64,
    pub max_verify_ms: u64,
    pub p95_verify_ms: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            interval_secs = %self.interval_secs,
            scans_total = %self.scans_total,
            ignored_total = %self.ignored_total,
            verified_total = %self.verified_total,
            fallback_total = %self.fallback_total,
            not_recognized_total = %self.not_recognized_total,
            failed_total = %self.failed_total,
            inactivity_closes = %self.inactivity_closes_total,
            settled = %self.settled_in_interval,
            avg_verify_ms = %self.avg_verify_ms,
            max_verify_ms = %self.max_verify_ms,
            p95_verify_ms = %self.p95_verify_ms,
            "metrics_summary"
        );
    }
}
