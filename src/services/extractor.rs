//! Blob to touch-point extraction
//!
//! Anchor: the projected bounding-box center.
//!
//! Radius: the dominant box axis projected to pixels, divided by a fixed
//! constant. Proportional to cluster extent, not a circumscribed radius.

use crate::domain::blob::Blob;
use crate::domain::geometry::PlanarPoint;
use crate::domain::types::TouchPoint;
use crate::services::transform::Projector;

const RADIUS_DIVISOR: f32 = 5.0;

/// Map each final blob to a screen-space touch point
pub fn extract(blobs: &[Blob], projector: &Projector) -> Vec<TouchPoint> {
    blobs.iter().map(|blob| touch_point(blob, projector)).collect()
}

fn touch_point(blob: &Blob, projector: &Projector) -> TouchPoint {
    let anchor = PlanarPoint::new(
        (blob.min_x + blob.max_x) / 2.0,
        (blob.min_y + blob.max_y) / 2.0,
    );
    let (x, y) = projector.to_screen(anchor);

    // Dominant axis drives the radius estimate
    let span_px = if blob.width() > blob.height() {
        projector.x_span(blob.min_x, blob.max_x)
    } else {
        projector.y_span(blob.min_y, blob.max_y)
    };

    TouchPoint { x, y, radius: span_px / RADIUS_DIVISOR }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geometry::CropArea;

    fn projector() -> Projector {
        Projector::new(CropArea::new(-750.0, -600.0, 750.0, 600.0), 1920, 1080).unwrap()
    }

    fn blob_from(corners: &[(f32, f32)]) -> Blob {
        let mut it = corners.iter();
        let &(x, y) = it.next().unwrap();
        let mut blob = Blob::singleton(PlanarPoint::new(x, y));
        for &(x, y) in it {
            blob.expand(&Blob::singleton(PlanarPoint::new(x, y)));
        }
        blob
    }

    #[test]
    fn test_anchor_is_projected_box_center() {
        let projector = projector();
        let blob = blob_from(&[(-100.0, -100.0), (100.0, 100.0)]);

        let points = extract(&[blob], &projector);
        assert_eq!(points.len(), 1);
        // Box center (0, 0) projects to the screen center
        assert_eq!(points[0].x, 960);
        assert_eq!(points[0].y, 540);
    }

    #[test]
    fn test_radius_uses_dominant_width() {
        let projector = projector();
        // 200mm wide, 50mm tall: width dominates
        let blob = blob_from(&[(0.0, 0.0), (200.0, 50.0)]);

        let tp = extract(&[blob], &projector)[0];
        let expected = projector.x_span(0.0, 200.0) / 5.0;
        assert!((tp.radius - expected).abs() < 1e-3);
    }

    #[test]
    fn test_radius_uses_dominant_height() {
        let projector = projector();
        let blob = blob_from(&[(0.0, 0.0), (50.0, 200.0)]);

        let tp = extract(&[blob], &projector)[0];
        let expected = projector.y_span(0.0, 200.0) / 5.0;
        assert!((tp.radius - expected).abs() < 1e-3);
    }

    #[test]
    fn test_singleton_blob_has_zero_radius() {
        let projector = projector();
        let blob = blob_from(&[(100.0, 100.0)]);
        let tp = extract(&[blob], &projector)[0];
        assert_eq!(tp.radius, 0.0);
    }

    #[test]
    fn test_one_touch_point_per_blob() {
        let projector = projector();
        let blobs = vec![
            blob_from(&[(-200.0, 0.0)]),
            blob_from(&[(0.0, 300.0), (30.0, 320.0)]),
            blob_from(&[(400.0, -100.0)]),
        ];
        assert_eq!(extract(&blobs, &projector).len(), 3);
    }
}
