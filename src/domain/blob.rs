//! Blob: an axis-aligned bounding box plus the planar points inside it
//!
//! Blobs start as singletons (one point, degenerate box) and grow by
//! merging. Invariant: `min_x <= max_x`, `min_y <= max_y`, and every member
//! point lies within the box.

use crate::domain::geometry::PlanarPoint;
use smallvec::{smallvec, SmallVec};

/// Most physical contacts produce a handful of returns per revolution
type PointList = SmallVec<[PlanarPoint; 16]>;

#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
    points: PointList,
}

impl Blob {
    /// A one-point blob with a degenerate bounding box
    pub fn singleton(point: PlanarPoint) -> Self {
        Self {
            min_x: point.x,
            min_y: point.y,
            max_x: point.x,
            max_y: point.y,
            points: smallvec![point],
        }
    }

    /// Union the bounding boxes and append `other`'s points, preserving
    /// relative order. No deduplication.
    pub fn expand(&mut self, other: &Blob) {
        self.min_x = self.min_x.min(other.min_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_x = self.max_x.max(other.max_x);
        self.max_y = self.max_y.max(other.max_y);
        self.points.extend_from_slice(&other.points);
    }

    /// Inclusive containment test against the bounding box
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

    pub fn points(&self) -> &[PlanarPoint] {
        &self.points
    }

    /// Mean of the member points. A real blob always has at least one
    /// point; the empty case falls back to the box-diagonal midpoint.
    pub fn centroid(&self) -> PlanarPoint {
        match self.points.len() {
            0 => PlanarPoint::new((self.min_x + self.max_x) / 2.0, (self.min_y + self.max_y) / 2.0),
            1 => self.points[0],
            n => {
                let mut sum_x = 0.0;
                let mut sum_y = 0.0;
                for p in &self.points {
                    sum_x += p.x;
                    sum_y += p.y;
                }
                PlanarPoint::new(sum_x / n as f32, sum_y / n as f32)
            }
        }
    }
}

/// Symmetric axis-aligned gap distance between two bounding boxes.
///
/// Per-axis gap is zero when the intervals overlap, otherwise the positive
/// separation; the result is the Euclidean norm of the two gaps. Boxes that
/// overlap or touch have distance zero.
pub fn gap_distance(a: &Blob, b: &Blob) -> f32 {
    let dx = axis_gap(a.min_x, a.max_x, b.min_x, b.max_x);
    let dy = axis_gap(a.min_y, a.max_y, b.min_y, b.max_y);
    (dx * dx + dy * dy).sqrt()
}

#[inline]
fn axis_gap(a_min: f32, a_max: f32, b_min: f32, b_max: f32) -> f32 {
    if a_max < b_min {
        b_min - a_max
    } else if b_max < a_min {
        a_min - b_max
    } else {
        0.0
    }
}
