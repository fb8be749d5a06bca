//! Shared types for the lidar-touch pipeline

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Get current epoch milliseconds
#[inline]
pub fn epoch_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

/// One range-bearing measurement from the rangefinder.
///
/// `valid == false` marks a sample with no return (no obstacle in range);
/// every downstream stage must skip it regardless of the other fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanSample {
    /// Distance to the target in millimeters
    pub distance_mm: f32,
    /// Bearing in degrees, device-relative
    pub angle_deg: f32,
    /// Whether this sample carries a real return
    pub valid: bool,
}

impl ScanSample {
    #[inline]
    pub fn new(distance_mm: f32, angle_deg: f32) -> Self {
        Self { distance_mm, angle_deg, valid: true }
    }

    /// A no-return placeholder at the given bearing
    #[inline]
    pub fn invalid(angle_deg: f32) -> Self {
        Self { distance_mm: 0.0, angle_deg, valid: false }
    }
}

/// One full revolution worth of samples
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scan {
    /// Capture time (epoch ms), used for scan-frequency logging
    pub ts: u64,
    pub samples: Vec<ScanSample>,
}

impl Scan {
    pub fn new(samples: Vec<ScanSample>) -> Self {
        Self { ts: epoch_ms(), samples }
    }

    /// Number of samples with a real return
    pub fn valid_count(&self) -> usize {
        self.samples.iter().filter(|s| s.valid).count()
    }

    /// Iterate over valid samples only
    pub fn valid_samples(&self) -> impl Iterator<Item = &ScanSample> {
        self.samples.iter().filter(|s| s.valid)
    }
}

/// A screen-space touch candidate derived from one blob.
///
/// Ephemeral: recomputed every cycle. Only the most recently published
/// list is retained, for the staleness fallback.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchPoint {
    /// Horizontal screen position in pixels
    pub x: i32,
    /// Vertical screen position in pixels
    pub y: i32,
    /// Estimated contact radius in pixels
    pub radius: f32,
}

impl std::fmt::Display for TouchPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}) r={:.1}", self.x, self.y, self.radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_count_skips_no_returns() {
        let scan = Scan::new(vec![
            ScanSample::new(500.0, 0.0),
            ScanSample::invalid(1.0),
            ScanSample::new(510.0, 2.0),
        ]);
        assert_eq!(scan.valid_count(), 2);
        assert_eq!(scan.valid_samples().count(), 2);
    }

    #[test]
    fn test_scan_serde_round_trip() {
        let scan = Scan::new(vec![ScanSample::new(1234.5, 90.0)]);
        let json = serde_json::to_string(&scan).unwrap();
        let back: Scan = serde_json::from_str(&json).unwrap();
        assert_eq!(back.samples, scan.samples);
        assert_eq!(back.ts, scan.ts);
    }
}
