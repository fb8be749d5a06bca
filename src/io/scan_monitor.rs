//! Device polling task
//!
//! Polls the configured `LidarSource` on a fixed interval and forwards
//! every completed revolution to the pipeline over a bounded channel.
//! Status transitions are logged and published to the status topic; the
//! pipeline never learns about device failures except through the absence
//! of scans (which feeds the staleness policy).

use crate::domain::types::Scan;
use crate::infra::config::Config;
use crate::io::device::LidarSource;
use crate::io::egress_channel::{EgressSender, StatusPayload};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{debug, info, warn};

pub struct ScanMonitor {
    source: Box<dyn LidarSource>,
    poll_interval: Duration,
    scan_tx: mpsc::Sender<Scan>,
    egress: Option<EgressSender>,
    last_status: String,
    last_error: Option<String>,
}

impl ScanMonitor {
    pub fn new(config: &Config, source: Box<dyn LidarSource>, scan_tx: mpsc::Sender<Scan>) -> Self {
        Self {
            source,
            poll_interval: Duration::from_millis(config.poll_interval_ms().max(1)),
            scan_tx,
            egress: None,
            last_status: String::new(),
            last_error: None,
        }
    }

    /// Attach the egress sender for status publishing
    pub fn with_egress(mut self, egress: EgressSender) -> Self {
        self.egress = Some(egress);
        self
    }

    fn publish_status_if_changed(&mut self) {
        let status = self.source.status();
        if status != self.last_status {
            info!(status = %status, connected = %self.source.connected(), "device_status");
            if let Some(ref egress) = self.egress {
                egress.send_status(StatusPayload::new(self.source.connected(), status));
            }
            self.last_status = status.to_string();
        }
    }

    /// Start the polling loop
    pub async fn run(mut self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        info!(poll_interval_ms = %self.poll_interval.as_millis(), "scan_monitor_started");

        let mut poll_timer = interval(self.poll_interval);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("scan_monitor_shutdown");
                        return;
                    }
                }
                _ = poll_timer.tick() => {}
            }

            match self.source.grab_scan().await {
                Ok(Some(scan)) => {
                    self.last_error = None;
                    debug!(samples = scan.samples.len(), valid = scan.valid_count(), "scan_grabbed");
                    // Non-blocking: a slow pipeline drops revolutions
                    // rather than backing up the device
                    if let Err(e) = self.scan_tx.try_send(scan) {
                        warn!(error = %e, "scan_channel_full");
                    }
                }
                Ok(None) => {
                    self.last_error = None;
                }
                Err(e) => {
                    // Persistent failures repeat every poll; log only the
                    // transition to avoid flooding
                    let msg = e.to_string();
                    if self.last_error.as_deref() != Some(&msg) {
                        warn!(error = %msg, "scan_grab_failed");
                        self.last_error = Some(msg);
                    }
                }
            }

            self.publish_status_if_changed();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::device::ReplayLidar;
    use crate::domain::types::ScanSample;

    #[tokio::test]
    async fn test_monitor_forwards_scans_until_shutdown() {
        let scans = vec![Scan::new(vec![ScanSample::new(500.0, 0.0)])];
        let source = Box::new(ReplayLidar::from_scans(scans));

        let config = Config::default();
        let (scan_tx, mut scan_rx) = mpsc::channel(16);
        let monitor = ScanMonitor::new(&config, source, scan_tx);

        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
        let handle = tokio::spawn(monitor.run(shutdown_rx));

        // The replay source yields a scan on every poll
        let scan = scan_rx.recv().await.expect("scan forwarded");
        assert_eq!(scan.samples.len(), 1);

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
