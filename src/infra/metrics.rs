//! Lock-free metrics collection and periodic reporting
//!
//! Uses atomics for hot-path operations to avoid mutex contention.
//! All counter updates are lock-free; reporting swaps the per-interval
//! counters atomically.
//!
//! NOTE: All atomics use Relaxed ordering intentionally; these are
//! statistical counters only, never used for coordination.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

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

/// Lock-free pipeline metrics
pub struct Metrics {
    /// Total cycles ever processed (monotonic)
    cycles_total: AtomicU64,
    /// Fresh cycles (a scan was available) since last report
    fresh_since_report: AtomicU64,
    /// Stale cycles (no scan) since last report
    stale_since_report: AtomicU64,
    /// Times the retained list was cleared after the grace period (monotonic)
    grace_expirations: AtomicU64,
    /// Sum of fresh-cycle latencies in microseconds (reset on report)
    cycle_latency_sum_us: AtomicU64,
    /// Max fresh-cycle latency in microseconds (reset on report)
    cycle_latency_max_us: AtomicU64,
    /// Valid samples in the most recent scan (gauge)
    last_scan_samples: AtomicU64,
    /// Blobs produced by the most recent fresh cycle (gauge)
    last_blob_count: AtomicU64,
    /// Touch points in the most recent published frame (gauge)
    last_touch_count: AtomicU64,
    /// For rate computation
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
            cycles_total: AtomicU64::new(0),
            fresh_since_report: AtomicU64::new(0),
            stale_since_report: AtomicU64::new(0),
            grace_expirations: AtomicU64::new(0),
            cycle_latency_sum_us: AtomicU64::new(0),
            cycle_latency_max_us: AtomicU64::new(0),
            last_scan_samples: AtomicU64::new(0),
            last_blob_count: AtomicU64::new(0),
            last_touch_count: AtomicU64::new(0),
            last_report_time: parking_lot::Mutex::new(Instant::now()),
        }
    }

    /// Record a fresh cycle: scan consumed, pipeline run end to end
    pub fn record_fresh_cycle(
        &self,
        valid_samples: usize,
        blobs: usize,
        touches: usize,
        latency_us: u64,
    ) {
        self.cycles_total.fetch_add(1, Ordering::Relaxed);
        self.fresh_since_report.fetch_add(1, Ordering::Relaxed);
        self.cycle_latency_sum_us.fetch_add(latency_us, Ordering::Relaxed);
        update_atomic_max(&self.cycle_latency_max_us, latency_us);
        self.last_scan_samples.store(valid_samples as u64, Ordering::Relaxed);
        self.last_blob_count.store(blobs as u64, Ordering::Relaxed);
        self.last_touch_count.store(touches as u64, Ordering::Relaxed);
    }

    /// Record a stale cycle: no scan this tick
    pub fn record_stale_cycle(&self) {
        self.cycles_total.fetch_add(1, Ordering::Relaxed);
        self.stale_since_report.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the retained list being cleared after the grace period
    pub fn record_grace_expired(&self) {
        self.grace_expirations.fetch_add(1, Ordering::Relaxed);
        self.last_touch_count.store(0, Ordering::Relaxed);
    }

    /// Snapshot and reset the per-interval counters
    pub fn report(&self) -> MetricsSummary {
        let mut last_report = self.last_report_time.lock();
        let elapsed_secs = last_report.elapsed().as_secs_f64().max(0.001);
        *last_report = Instant::now();
        drop(last_report);

        let fresh = self.fresh_since_report.swap(0, Ordering::Relaxed);
        let stale = self.stale_since_report.swap(0, Ordering::Relaxed);
        let latency_sum = self.cycle_latency_sum_us.swap(0, Ordering::Relaxed);
        let latency_max = self.cycle_latency_max_us.swap(0, Ordering::Relaxed);

        MetricsSummary {
            cycles_total: self.cycles_total.load(Ordering::Relaxed),
            fresh_cycles: fresh,
            stale_cycles: stale,
            scans_per_sec: fresh as f64 / elapsed_secs,
            avg_cycle_latency_us: if fresh > 0 { latency_sum / fresh } else { 0 },
            max_cycle_latency_us: latency_max,
            grace_expirations: self.grace_expirations.load(Ordering::Relaxed),
            last_scan_samples: self.last_scan_samples.load(Ordering::Relaxed),
            last_blob_count: self.last_blob_count.load(Ordering::Relaxed),
            last_touch_count: self.last_touch_count.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time summary, logged periodically and published to the
/// metrics egress topic
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub cycles_total: u64,
    pub fresh_cycles: u64,
    pub stale_cycles: u64,
    pub scans_per_sec: f64,
    pub avg_cycle_latency_us: u64,
    pub max_cycle_latency_us: u64,
    pub grace_expirations: u64,
    pub last_scan_samples: u64,
    pub last_blob_count: u64,
    pub last_touch_count: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            cycles_total = %self.cycles_total,
            fresh = %self.fresh_cycles,
            stale = %self.stale_cycles,
            scans_per_sec = %format!("{:.1}", self.scans_per_sec),
            avg_latency_us = %self.avg_cycle_latency_us,
            max_latency_us = %self.max_cycle_latency_us,
            grace_expirations = %self.grace_expirations,
            samples = %self.last_scan_samples,
            blobs = %self.last_blob_count,
            touches = %self.last_touch_count,
            "metrics_report"
        );
    }
}
