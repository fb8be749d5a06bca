//! Domain models - scan data and touch geometry
//!
//! This module contains the canonical data types used throughout the system:
//! - `Scan` / `ScanSample` - one revolution of range-bearing samples
//! - `PlanarPoint` / `CropArea` - sensor-plane geometry and calibration
//! - `Blob` - a spatial cluster approximated by its bounding box
//! - `TouchPoint` - a screen-space contact candidate

pub mod blob;
pub mod geometry;
pub mod types;

// Re-export commonly used types at module level
pub use blob::Blob;
pub use geometry::{CropArea, PlanarPoint};
pub use types::{Scan, ScanSample, TouchPoint};
