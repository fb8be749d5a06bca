//! Services - the scan-to-touch processing pipeline
//!
//! This module contains the core processing stages:
//! - `transform` - polar→planar conversion and screen projection
//! - `clustering` - fixpoint merging of scan points into blobs
//! - `extractor` - blob to touch-point mapping
//! - `pipeline` - per-cycle orchestration and staleness policy

pub mod clustering;
pub mod extractor;
pub mod pipeline;
pub mod transform;

// Re-export commonly used types
pub use clustering::Clusterer;
pub use pipeline::TouchPipeline;
pub use transform::{polar_to_planar, Projector};
