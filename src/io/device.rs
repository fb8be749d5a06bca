//! Lidar device backends
//!
//! One capability interface (`LidarSource`): produce a scan snapshot when a
//! full revolution is available, report connectivity and a human-readable
//! status string. Two implementations:
//! - `SerialLidar` - RPLIDAR-style serial protocol (5-byte measurement
//!   nodes, start flag marks a new revolution)
//! - `ReplayLidar` - JSONL scan recordings for development and tests

use crate::domain::types::{epoch_ms, Scan, ScanSample};
use crate::infra::config::{Config, DeviceKind};
use anyhow::Context;
use async_trait::async_trait;
use bytes::{Buf, BytesMut};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

// Protocol constants (RPLIDAR serial framing)
const SYNC_BYTE: u8 = 0xA5;
const DESCRIPTOR_BYTE: u8 = 0x5A;
const CMD_STOP: u8 = 0x25;
const CMD_SCAN: u8 = 0x20;
const DESCRIPTOR_LEN: usize = 7;
const NODE_LEN: usize = 5;

/// A revolution should never exceed two samples per degree
const MAX_SAMPLES_PER_REV: usize = 720;

/// Produces scan snapshots and reports connectivity
#[async_trait]
pub trait LidarSource: Send {
    /// Poll the device. `Ok(None)` means no complete revolution yet;
    /// errors are recoverable and the caller keeps polling.
    async fn grab_scan(&mut self) -> anyhow::Result<Option<Scan>>;

    fn connected(&self) -> bool;

    /// Advisory status string, never used for control flow
    fn status(&self) -> &str;
}

/// Build the configured source
pub fn create_source(config: &Config) -> anyhow::Result<Box<dyn LidarSource>> {
    match config.device_kind() {
        DeviceKind::Serial => {
            Ok(Box::new(SerialLidar::new(config.serial_port(), config.baud())))
        }
        DeviceKind::Replay => {
            let path = config
                .replay_file()
                .context("device.kind = \"replay\" requires device.replay_file")?;
            Ok(Box::new(ReplayLidar::from_file(path)?))
        }
    }
}

/// Check the per-node sync bits: byte0 carries the start flag and its
/// inverse in bits 0/1, byte1 always has bit 0 set.
#[inline]
fn node_sync_ok(b0: u8, b1: u8) -> bool {
    ((b0 & 0x01) ^ ((b0 >> 1) & 0x01)) == 1 && (b1 & 0x01) == 1
}

/// Decode one 5-byte measurement node. Returns the sample and whether the
/// node carries the new-revolution start flag.
fn parse_node(frame: &[u8]) -> (ScanSample, bool) {
    let start = frame[0] & 0x01 == 1;
    let quality = frame[0] >> 2;
    let angle_q6 = ((frame[2] as u16) << 7) | ((frame[1] >> 1) as u16);
    let dist_q2 = ((frame[4] as u16) << 8) | frame[3] as u16;

    let angle_deg = angle_q6 as f32 / 64.0;
    let sample = if dist_q2 == 0 || quality == 0 {
        // No return on this bearing
        ScanSample::invalid(angle_deg)
    } else {
        ScanSample::new(dist_q2 as f32 / 4.0, angle_deg)
    };
    (sample, start)
}

/// RPLIDAR-style serial backend.
///
/// Reconnects lazily: every poll with a closed port attempts to open it and
/// restart scanning. Measurement bytes accumulate in a persistent buffer;
/// corrupt bytes are skipped one at a time until the sync bits line up.
pub struct SerialLidar {
    port_path: String,
    baud: u32,
    port: Option<tokio_serial::SerialStream>,
    read_buffer: BytesMut,
    /// Samples of the revolution currently being assembled
    revolution: Vec<ScanSample>,
    status: String,
}

impl SerialLidar {
    pub fn new(port_path: &str, baud: u32) -> Self {
        Self {
            port_path: port_path.to_string(),
            baud,
            port: None,
            read_buffer: BytesMut::with_capacity(4096),
            revolution: Vec::with_capacity(MAX_SAMPLES_PER_REV),
            status: "Not connected".to_string(),
        }
    }

    fn set_status(&mut self, status: &str) {
        if self.status != status {
            info!(device = %self.port_path, status = %status, "lidar_status");
            self.status = status.to_string();
        }
    }

    /// Open the port and kick off a scan
    async fn connect(&mut self) -> anyhow::Result<()> {
        let mut port = tokio_serial::new(&self.port_path, self.baud)
            .timeout(Duration::from_millis(100))
            .open_native_async()
            .with_context(|| format!("Failed to open serial port {}", self.port_path))?;

        // Stop any scan left running, then request a fresh one
        port.write_all(&[SYNC_BYTE, CMD_STOP]).await.context("stop command failed")?;
        tokio::time::sleep(Duration::from_millis(10)).await;
        port.write_all(&[SYNC_BYTE, CMD_SCAN]).await.context("scan command failed")?;

        self.port = Some(port);
        self.read_buffer.clear();
        self.revolution.clear();
        self.set_status("Connected to lidar");
        Ok(())
    }

    /// Drop leading bytes until a plausible node boundary (or the scan
    /// response descriptor, which is consumed whole).
    fn synchronize_buffer(&mut self) {
        let mut discarded = 0;
        loop {
            if self.read_buffer.len() >= 2
                && self.read_buffer[0] == SYNC_BYTE
                && self.read_buffer[1] == DESCRIPTOR_BYTE
            {
                if self.read_buffer.len() < DESCRIPTOR_LEN {
                    break;
                }
                self.read_buffer.advance(DESCRIPTOR_LEN);
                debug!("lidar_descriptor_consumed");
                continue;
            }
            if self.read_buffer.len() < 2 || node_sync_ok(self.read_buffer[0], self.read_buffer[1])
            {
                break;
            }
            self.read_buffer.advance(1);
            discarded += 1;
        }
        if discarded > 0 {
            let preview_len = self.read_buffer.len().min(8);
            warn!(
                discarded = discarded,
                next_bytes = %hex::encode(&self.read_buffer[..preview_len]),
                "lidar_resync_discarded_bytes"
            );
        }
    }

    /// Consume complete nodes from the buffer. Returns the most recently
    /// completed revolution, if any.
    fn drain_nodes(&mut self) -> Option<Scan> {
        let mut completed: Option<Scan> = None;

        loop {
            self.synchronize_buffer();
            if self.read_buffer.len() < NODE_LEN {
                break;
            }
            if !node_sync_ok(self.read_buffer[0], self.read_buffer[1]) {
                // Incomplete descriptor at the head; wait for more bytes
                break;
            }

            let (sample, start) = parse_node(&self.read_buffer[..NODE_LEN]);
            self.read_buffer.advance(NODE_LEN);

            if start && !self.revolution.is_empty() {
                if completed.is_some() {
                    // More than one revolution buffered; keep the newest
                    debug!("lidar_revolution_superseded");
                }
                completed = Some(Scan::new(std::mem::take(&mut self.revolution)));
            }
            self.revolution.push(sample);

            // Runaway revolution means we lost the start flags; resync
            if self.revolution.len() > MAX_SAMPLES_PER_REV {
                warn!(samples = self.revolution.len(), "lidar_revolution_overflow");
                self.revolution.clear();
            }
        }

        completed
    }
}

#[async_trait]
impl LidarSource for SerialLidar {
    async fn grab_scan(&mut self) -> anyhow::Result<Option<Scan>> {
        if self.port.is_none() {
            if let Err(e) = self.connect().await {
                self.set_status("Failed to connect");
                return Err(e);
            }
        }

        let Some(port) = self.port.as_mut() else {
            return Ok(None);
        };

        let mut temp_buf = [0u8; 1024];
        match tokio::time::timeout(Duration::from_millis(50), port.read(&mut temp_buf)).await {
            Ok(Ok(0)) => {}
            Ok(Ok(n)) => self.read_buffer.extend_from_slice(&temp_buf[..n]),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::TimedOut => {}
            Ok(Err(e)) => {
                // Drop the port so the next poll reconnects
                self.port = None;
                self.set_status("Read error, reconnecting");
                return Err(e).context("serial read failed");
            }
            Err(_) => {} // poll timeout, no data this cycle
        }

        Ok(self.drain_nodes())
    }

    fn connected(&self) -> bool {
        self.port.is_some()
    }

    fn status(&self) -> &str {
        &self.status
    }
}

/// Replays recorded scans from a JSONL file (one `Scan` per line),
/// looping forever. Timestamps are rewritten to the poll time so the
/// staleness policy behaves as with a live device.
pub struct ReplayLidar {
    scans: Vec<Scan>,
    next: usize,
    status: String,
}

impl ReplayLidar {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read replay file {}", path))?;

        let mut scans = Vec::new();
        for (i, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let scan: Scan = serde_json::from_str(line)
                .with_context(|| format!("Bad scan at {}:{}", path, i + 1))?;
            scans.push(scan);
        }

        info!(file = %path, scans = scans.len(), "replay_loaded");
        Ok(Self::from_scans(scans))
    }

    pub fn from_scans(scans: Vec<Scan>) -> Self {
        let status =
            if scans.is_empty() { "Replay file empty" } else { "Replaying recorded scans" };
        Self { scans, next: 0, status: status.to_string() }
    }
}

#[async_trait]
impl LidarSource for ReplayLidar {
    async fn grab_scan(&mut self) -> anyhow::Result<Option<Scan>> {
        if self.scans.is_empty() {
            return Ok(None);
        }
        let mut scan = self.scans[self.next].clone();
        self.next = (self.next + 1) % self.scans.len();
        scan.ts = epoch_ms();
        Ok(Some(scan))
    }

    fn connected(&self) -> bool {
        !self.scans.is_empty()
    }

    fn status(&self) -> &str {
        &self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a raw node with the given start flag, quality, angle and
    /// distance, mirroring the wire layout
    fn raw_node(start: bool, quality: u8, angle_deg: f32, dist_mm: f32) -> [u8; NODE_LEN] {
        let angle_q6 = (angle_deg * 64.0) as u16;
        let dist_q2 = (dist_mm * 4.0) as u16;
        let s = start as u8;
        [
            (quality << 2) | ((1 - s) << 1) | s,
            (((angle_q6 & 0x7F) as u8) << 1) | 0x01,
            (angle_q6 >> 7) as u8,
            (dist_q2 & 0xFF) as u8,
            (dist_q2 >> 8) as u8,
        ]
    }

    #[test]
    fn test_node_sync_bits() {
        let node = raw_node(true, 10, 90.0, 500.0);
        assert!(node_sync_ok(node[0], node[1]));
        let node = raw_node(false, 10, 90.0, 500.0);
        assert!(node_sync_ok(node[0], node[1]));
        // Both start bits set is invalid
        assert!(!node_sync_ok(0x03, 0x01));
        // Missing check bit is invalid
        assert!(!node_sync_ok(0x01, 0x00));
    }

    #[test]
    fn test_parse_node_round_trip() {
        let raw = raw_node(true, 20, 90.5, 1234.25);
        let (sample, start) = parse_node(&raw);
        assert!(start);
        assert!(sample.valid);
        assert!((sample.angle_deg - 90.5).abs() < 1.0 / 64.0);
        assert!((sample.distance_mm - 1234.25).abs() < 0.25);
    }

    #[test]
    fn test_parse_node_zero_distance_is_invalid() {
        let raw = raw_node(false, 20, 10.0, 0.0);
        let (sample, _) = parse_node(&raw);
        assert!(!sample.valid);
    }

    #[test]
    fn test_parse_node_zero_quality_is_invalid() {
        let raw = raw_node(false, 0, 10.0, 500.0);
        let (sample, _) = parse_node(&raw);
        assert!(!sample.valid);
    }

    #[test]
    fn test_drain_nodes_assembles_revolutions() {
        let mut lidar = SerialLidar::new("/dev/null", 115200);

        // First revolution: start node + two more; second start closes it
        for (i, &(start, angle)) in
            [(true, 0.0), (false, 120.0), (false, 240.0), (true, 0.5)].iter().enumerate()
        {
            let raw = raw_node(start, 15, angle, 500.0 + i as f32);
            lidar.read_buffer.extend_from_slice(&raw);
        }

        let scan = lidar.drain_nodes().expect("one revolution completed");
        assert_eq!(scan.samples.len(), 3);
        assert!((scan.samples[1].angle_deg - 120.0).abs() < 0.1);
        // The closing start node seeds the next revolution
        assert_eq!(lidar.revolution.len(), 1);
    }

    #[test]
    fn test_drain_nodes_skips_garbage_bytes() {
        let mut lidar = SerialLidar::new("/dev/null", 115200);
        lidar.read_buffer.extend_from_slice(&[0xFF, 0x00, 0x13]);
        lidar.read_buffer.extend_from_slice(&raw_node(true, 15, 10.0, 400.0));
        lidar.read_buffer.extend_from_slice(&raw_node(true, 15, 10.0, 401.0));

        let scan = lidar.drain_nodes().expect("revolution after resync");
        assert_eq!(scan.samples.len(), 1);
    }

    #[test]
    fn test_drain_nodes_consumes_descriptor() {
        let mut lidar = SerialLidar::new("/dev/null", 115200);
        lidar.read_buffer.extend_from_slice(&[SYNC_BYTE, DESCRIPTOR_BYTE, 0x05, 0x00, 0x00, 0x40, 0x81]);
        lidar.read_buffer.extend_from_slice(&raw_node(true, 15, 0.0, 400.0));
        lidar.read_buffer.extend_from_slice(&raw_node(false, 15, 1.0, 400.0));
        lidar.read_buffer.extend_from_slice(&raw_node(true, 15, 0.0, 402.0));

        let scan = lidar.drain_nodes().expect("descriptor skipped, revolution parsed");
        assert_eq!(scan.samples.len(), 2);
    }

    #[tokio::test]
    async fn test_replay_loops_and_refreshes_timestamps() {
        let scans = vec![
            Scan { ts: 1, samples: vec![ScanSample::new(500.0, 0.0)] },
            Scan { ts: 2, samples: vec![ScanSample::new(600.0, 90.0)] },
        ];
        let mut replay = ReplayLidar::from_scans(scans);
        assert!(replay.connected());

        let a = replay.grab_scan().await.unwrap().unwrap();
        let b = replay.grab_scan().await.unwrap().unwrap();
        let c = replay.grab_scan().await.unwrap().unwrap();
        assert_eq!(a.samples[0].distance_mm, 500.0);
        assert_eq!(b.samples[0].distance_mm, 600.0);
        assert_eq!(c.samples[0].distance_mm, 500.0); // wrapped around
        assert!(a.ts > 2); // timestamp rewritten to poll time
    }

    #[tokio::test]
    async fn test_replay_empty_yields_nothing() {
        let mut replay = ReplayLidar::from_scans(vec![]);
        assert!(!replay.connected());
        assert!(replay.grab_scan().await.unwrap().is_none());
    }
}
