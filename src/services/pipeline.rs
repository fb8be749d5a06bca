//! Per-cycle orchestration: scan in, touch frame out
//!
//! One `TouchPipeline` owns all per-device state: calibration, the
//! clusterer, the retained touch-point list, and the staleness timer.
//! Multiple devices mean multiple independent pipelines.
//!
//! Staleness policy (grace-period variant): a fresh scan always replaces
//! the retained list, even with an empty result. When no scan arrives, the
//! previous list keeps being served until `grace_ms` has elapsed since the
//! last fresh cycle, then it is cleared once. `grace_ms = 0` clears on the
//! first scanless cycle.

use crate::domain::types::{Scan, TouchPoint};
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::io::egress_channel::{EgressSender, TouchFramePayload};
use crate::services::clustering::Clusterer;
use crate::services::extractor;
use crate::services::transform::Projector;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{debug, info, trace};

pub struct TouchPipeline {
    clusterer: Clusterer,
    projector: Projector,
    angle_offset_deg: f32,
    grace: Duration,
    tick_interval: Duration,
    /// Most recently published touch points, served during the grace period
    retained: Vec<TouchPoint>,
    last_fresh_at: Option<Instant>,
    /// Set once the grace period has expired, until the next fresh scan
    cleared: bool,
    last_scan_ts: u64,
    metrics: Arc<Metrics>,
}

impl TouchPipeline {
    /// Build a pipeline from configuration.
    ///
    /// Fails on a degenerate touch area (zero height span), which would
    /// make the screen projection divide by zero.
    pub fn new(config: &Config, metrics: Arc<Metrics>) -> anyhow::Result<Self> {
        let projector =
            Projector::new(config.touch_area(), config.screen_width(), config.screen_height())?;
        Ok(Self {
            clusterer: Clusterer::new(config.merge_threshold_mm(), config.filter_to_region()),
            projector,
            angle_offset_deg: config.angle_offset_deg(),
            grace: Duration::from_millis(config.grace_ms()),
            tick_interval: Duration::from_millis(config.poll_interval_ms().max(1)),
            retained: Vec::new(),
            last_fresh_at: None,
            cleared: false,
            last_scan_ts: 0,
            metrics,
        })
    }

    /// The currently served touch points
    pub fn touch_points(&self) -> &[TouchPoint] {
        &self.retained
    }

    /// Consume one fresh scan: cluster, extract, and replace the retained
    /// list unconditionally (an empty scan yields an empty list at once).
    pub fn process_fresh(&mut self, scan: &Scan) -> &[TouchPoint] {
        let cycle_start = Instant::now();

        if self.last_scan_ts != 0 && scan.ts > self.last_scan_ts {
            let freq_hz = 1000.0 / (scan.ts - self.last_scan_ts) as f64;
            trace!(freq_hz = %format!("{:.1}", freq_hz), "scan_frequency");
        }
        self.last_scan_ts = scan.ts;

        let blobs =
            self.clusterer.cluster(scan, self.projector.crop(), self.angle_offset_deg);
        self.retained = extractor::extract(&blobs, &self.projector);
        for tp in &self.retained {
            trace!(touch = %tp, "touch_point");
        }
        self.last_fresh_at = Some(cycle_start);
        self.cleared = false;

        let latency_us = cycle_start.elapsed().as_micros() as u64;
        self.metrics.record_fresh_cycle(
            scan.valid_count(),
            blobs.len(),
            self.retained.len(),
            latency_us,
        );
        debug!(
            samples = scan.valid_count(),
            blobs = blobs.len(),
            touches = self.retained.len(),
            latency_us = latency_us,
            "fresh_cycle"
        );

        &self.retained
    }

    /// Handle a cycle with no scan. Returns true when the grace period
    /// expired on this cycle and the retained list was just cleared.
    pub fn process_stale(&mut self) -> bool {
        self.metrics.record_stale_cycle();
        trace!(retained = self.retained.len(), "no scan this cycle");

        if self.cleared {
            return false;
        }
        let expired = match self.last_fresh_at {
            Some(at) => at.elapsed() > self.grace,
            // Never had a scan: nothing to serve, nothing to clear
            None => false,
        };
        if expired {
            self.retained.clear();
            self.cleared = true;
            self.metrics.record_grace_expired();
            info!(grace_ms = %self.grace.as_millis(), "touch_points_cleared");
        }
        expired
    }

    /// Run the pipeline loop: consume scans from the channel, tick for
    /// staleness, and hand every published frame to the egress channel.
    pub async fn run(
        &mut self,
        mut scan_rx: mpsc::Receiver<Scan>,
        egress: Option<EgressSender>,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) {
        let mut tick = interval(self.tick_interval);
        let mut fresh_since_tick = false;

        info!(
            tick_ms = %self.tick_interval.as_millis(),
            grace_ms = %self.grace.as_millis(),
            "pipeline_started"
        );

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("pipeline_shutdown");
                        return;
                    }
                }
                scan = scan_rx.recv() => {
                    match scan {
                        Some(scan) => {
                            self.process_fresh(&scan);
                            fresh_since_tick = true;
                            if let Some(ref sender) = egress {
                                sender.send_touch_frame(TouchFramePayload::from_points(&self.retained));
                            }
                        }
                        None => {
                            info!("scan_channel_closed");
                            return;
                        }
                    }
                }
                _ = tick.tick() => {
                    if fresh_since_tick {
                        fresh_since_tick = false;
                        continue;
                    }
                    if self.process_stale() {
                        // Publish the cleared (empty) frame exactly once
                        if let Some(ref sender) = egress {
                            sender.send_touch_frame(TouchFramePayload::from_points(&self.retained));
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::ScanSample;
    use std::thread::sleep;

    fn pipeline(grace_ms: u64) -> TouchPipeline {
        let config = Config::default().with_grace_ms(grace_ms);
        TouchPipeline::new(&config, Arc::new(Metrics::new())).unwrap()
    }

    fn near_scan() -> Scan {
        Scan::new(vec![ScanSample::new(500.0, 0.0), ScanSample::new(510.0, 1.0)])
    }

    #[test]
    fn test_fresh_scan_replaces_retained_list() {
        let mut p = pipeline(1000);
        let touches = p.process_fresh(&near_scan()).to_vec();
        assert_eq!(touches.len(), 1);

        // A fresh empty scan clears immediately, no grace period
        p.process_fresh(&Scan::new(vec![]));
        assert!(p.touch_points().is_empty());
    }

    #[test]
    fn test_stale_within_grace_retains_list() {
        let mut p = pipeline(10_000);
        p.process_fresh(&near_scan());
        let before = p.touch_points().to_vec();

        assert!(!p.process_stale());
        assert_eq!(p.touch_points(), before.as_slice());
    }

    #[test]
    fn test_stale_past_grace_clears_once() {
        let mut p = pipeline(20);
        p.process_fresh(&near_scan());
        assert!(!p.touch_points().is_empty());

        sleep(Duration::from_millis(40));
        assert!(p.process_stale());
        assert!(p.touch_points().is_empty());

        // Already cleared: subsequent stale cycles report nothing new
        assert!(!p.process_stale());
    }

    #[test]
    fn test_zero_grace_clears_on_first_stale_cycle() {
        let mut p = pipeline(0);
        p.process_fresh(&near_scan());
        sleep(Duration::from_millis(2));
        assert!(p.process_stale());
        assert!(p.touch_points().is_empty());
    }

    #[test]
    fn test_stale_before_any_scan_is_a_noop() {
        let mut p = pipeline(0);
        assert!(!p.process_stale());
        assert!(p.touch_points().is_empty());
    }

    #[test]
    fn test_fresh_scan_after_clear_resumes() {
        let mut p = pipeline(0);
        p.process_fresh(&near_scan());
        sleep(Duration::from_millis(2));
        p.process_stale();
        assert!(p.touch_points().is_empty());

        p.process_fresh(&near_scan());
        assert_eq!(p.touch_points().len(), 1);
    }

    #[test]
    fn test_degenerate_touch_area_fails_construction() {
        let config = Config::default()
            .with_touch_area(crate::domain::geometry::CropArea::new(-750.0, 100.0, 750.0, 100.0));
        assert!(TouchPipeline::new(&config, Arc::new(Metrics::new())).is_err());
    }
}
