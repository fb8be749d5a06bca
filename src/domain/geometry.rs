//! Sensor-plane geometry: planar points and the calibration rectangle

use serde::{Deserialize, Serialize};

/// A point in the sensor plane, millimeters, origin at the sensor,
/// y-axis pointing forward.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlanarPoint {
    pub x: f32,
    pub y: f32,
}

impl PlanarPoint {
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// The active sensing rectangle in sensor-plane millimeters.
///
/// Doubles as the affine basis for screen projection: the crop height span
/// is the common scale for both axes. Set once from configuration at
/// startup, immutable during a processing cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropArea {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl CropArea {
    pub fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Inclusive containment test
    #[inline]
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_is_inclusive() {
        let crop = CropArea::new(-750.0, -600.0, 750.0, 600.0);
        assert!(crop.contains(0.0, 0.0));
        assert!(crop.contains(-750.0, -600.0));
        assert!(crop.contains(750.0, 600.0));
        assert!(!crop.contains(750.1, 0.0));
        assert!(!crop.contains(0.0, -600.1));
    }

    #[test]
    fn test_spans() {
        let crop = CropArea::new(-750.0, -600.0, 750.0, 600.0);
        assert_eq!(crop.width(), 1500.0);
        assert_eq!(crop.height(), 1200.0);
    }
}
