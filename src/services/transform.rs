//! Coordinate transforms: polar sensor samples to planar millimeters, and
//! planar millimeters to screen pixels
//!
//! The screen projection deliberately uses the crop-area HEIGHT span as the
//! common scale for both axes: a non-square crop area then maps without
//! distortion (circles stay circular), with the horizontal extent centered
//! in the viewport.

use crate::domain::geometry::{CropArea, PlanarPoint};
use crate::domain::types::ScanSample;
use anyhow::bail;

/// Convert one sample to a planar point.
///
/// Bearing increases counter-clockwise in the left-handed screen
/// convention; zero bearing points forward (+y). `angle_offset_deg` is the
/// mounting calibration constant.
pub fn polar_to_planar(sample: &ScanSample, angle_offset_deg: f32) -> PlanarPoint {
    let rad = (sample.angle_deg + angle_offset_deg).to_radians();
    PlanarPoint::new(sample.distance_mm * -rad.sin(), sample.distance_mm * rad.cos())
}

/// Planar-to-screen projection over a validated crop area.
///
/// Construction fails on a degenerate crop height (`max_y <= min_y`), which
/// would otherwise divide by zero and emit garbage coordinates.
#[derive(Debug, Clone)]
pub struct Projector {
    crop: CropArea,
    screen_h: f32,
    /// Horizontal centering offset in pixels, precomputed
    x_offset: f32,
}

impl Projector {
    pub fn new(crop: CropArea, screen_w: u32, screen_h: u32) -> anyhow::Result<Self> {
        if crop.height() <= 0.0 {
            bail!(
                "degenerate crop area: height span must be positive (min_y={}, max_y={})",
                crop.min_y,
                crop.max_y
            );
        }
        if crop.width() <= 0.0 {
            bail!(
                "degenerate crop area: width span must be positive (min_x={}, max_x={})",
                crop.min_x,
                crop.max_x
            );
        }
        let screen_w = screen_w as f32;
        let screen_h = screen_h as f32;
        let x_offset = (screen_w - screen_h * crop.width() / crop.height()) / 2.0;
        Ok(Self { crop, screen_h, x_offset })
    }

    pub fn crop(&self) -> &CropArea {
        &self.crop
    }

    #[inline]
    fn px_x(&self, x: f32) -> f32 {
        (x - self.crop.min_x) / self.crop.height() * self.screen_h + self.x_offset
    }

    #[inline]
    fn px_y(&self, y: f32) -> f32 {
        (y - self.crop.min_y) / self.crop.height() * self.screen_h
    }

    /// Project a planar point into screen pixels
    pub fn to_screen(&self, point: PlanarPoint) -> (i32, i32) {
        (self.px_x(point.x) as i32, self.px_y(point.y) as i32)
    }

    /// Pixel span of an x-axis interval under this projection
    pub fn x_span(&self, min_x: f32, max_x: f32) -> f32 {
        self.px_x(max_x) - self.px_x(min_x)
    }

    /// Pixel span of a y-axis interval under this projection
    pub fn y_span(&self, min_y: f32, max_y: f32) -> f32 {
        self.px_y(max_y) - self.px_y(min_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-3;

    #[test]
    fn test_polar_forward_is_positive_y() {
        let p = polar_to_planar(&ScanSample::new(500.0, 0.0), 0.0);
        assert!(p.x.abs() < EPS);
        assert!((p.y - 500.0).abs() < EPS);
    }

    #[test]
    fn test_polar_ninety_is_negative_x() {
        let p = polar_to_planar(&ScanSample::new(500.0, 90.0), 0.0);
        assert!((p.x + 500.0).abs() < EPS);
        assert!(p.y.abs() < EPS);
    }

    #[test]
    fn test_polar_angle_offset_applied() {
        // 45 degrees of sample plus 45 of mounting offset lands at bearing 90
        let p = polar_to_planar(&ScanSample::new(500.0, 45.0), 45.0);
        assert!((p.x + 500.0).abs() < EPS);
        assert!(p.y.abs() < EPS);
    }

    #[test]
    fn test_projection_known_values() {
        let crop = CropArea::new(-750.0, -600.0, 750.0, 600.0);
        let projector = Projector::new(crop, 1920, 1080).unwrap();

        let (x, y) = projector.to_screen(PlanarPoint::new(0.0, 0.0));
        // xp = 750/1200, x = xp*1080 + (1920 - 1080*1500/1200)/2 = 675 + 285 = 960
        assert_eq!(x, 960);
        // yp = 600/1200, y = 540
        assert_eq!(y, 540);

        let (x, y) = projector.to_screen(PlanarPoint::new(-750.0, -600.0));
        assert_eq!(x, 285);
        assert_eq!(y, 0);
    }

    #[test]
    fn test_projection_scales_both_axes_by_height() {
        // A square in mm must stay square in pixels even for a wide crop
        let crop = CropArea::new(-1000.0, -500.0, 1000.0, 500.0);
        let projector = Projector::new(crop, 1920, 1080).unwrap();
        let w = projector.x_span(0.0, 100.0);
        let h = projector.y_span(0.0, 100.0);
        assert!((w - h).abs() < EPS);
    }

    #[test]
    fn test_degenerate_height_rejected() {
        let crop = CropArea::new(-750.0, 100.0, 750.0, 100.0);
        assert!(Projector::new(crop, 1920, 1080).is_err());
    }

    #[test]
    fn test_inverted_height_rejected() {
        let crop = CropArea::new(-750.0, 600.0, 750.0, -600.0);
        assert!(Projector::new(crop, 1920, 1080).is_err());
    }
}
