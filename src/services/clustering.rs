//! Fixpoint clustering of scan points into blobs
//!
//! Every accepted point seeds a singleton blob. A merge pass unions all
//! blobs whose bounding-box gap is strictly below the threshold (union-find,
//! one canonical blob per connected group). Merged boxes grow, which can
//! bring formerly distant blobs within the threshold, so passes repeat until
//! one completes with zero unions. Termination holds because every merging
//! pass strictly reduces the blob count.
//!
//! Pairwise distance checks are deliberately O(n^2) per pass; a revolution
//! carries at most a few hundred returns.

use crate::domain::blob::{gap_distance, Blob};
use crate::domain::geometry::CropArea;
use crate::domain::types::Scan;
use crate::services::transform::polar_to_planar;
use tracing::trace;

#[derive(Debug, Clone)]
pub struct Clusterer {
    merge_threshold_mm: f32,
    filter_to_region: bool,
}

impl Clusterer {
    pub fn new(merge_threshold_mm: f32, filter_to_region: bool) -> Self {
        Self { merge_threshold_mm, filter_to_region }
    }

    /// Convert one scan to its fixpoint blob set
    pub fn cluster(&self, scan: &Scan, crop: &CropArea, angle_offset_deg: f32) -> Vec<Blob> {
        let mut seeds = Vec::with_capacity(scan.valid_count());
        for sample in scan.valid_samples() {
            let point = polar_to_planar(sample, angle_offset_deg);
            if self.filter_to_region && !crop.contains(point.x, point.y) {
                continue;
            }
            seeds.push(Blob::singleton(point));
        }

        let seed_count = seeds.len();
        let (blobs, passes) = self.merge_to_fixpoint(seeds);
        trace!(
            seeds = seed_count,
            blobs = blobs.len(),
            passes = passes,
            "clustering_converged"
        );
        blobs
    }

    /// Repeat merge passes until one performs zero unions.
    /// Returns the converged set and the number of passes run.
    pub fn merge_to_fixpoint(&self, mut blobs: Vec<Blob>) -> (Vec<Blob>, usize) {
        let mut passes = 0;
        loop {
            passes += 1;
            let (merged, unions) = self.merge_pass(blobs);
            blobs = merged;
            if unions == 0 {
                return (blobs, passes);
            }
        }
    }

    /// One union-find pass: union every pair closer than the threshold,
    /// then collapse each group into one blob (points keep seed order).
    fn merge_pass(&self, input: Vec<Blob>) -> (Vec<Blob>, usize) {
        let n = input.len();
        let mut uf = UnionFind::new(n);

        for i in 0..n {
            for j in (i + 1)..n {
                if gap_distance(&input[i], &input[j]) < self.merge_threshold_mm {
                    uf.union(i, j);
                }
            }
        }

        // Collapse groups in first-seen order so output order stays stable
        let mut root_to_out: Vec<Option<usize>> = vec![None; n];
        let mut output: Vec<Blob> = Vec::with_capacity(n);
        for (i, blob) in input.into_iter().enumerate() {
            let root = uf.find(i);
            match root_to_out[root] {
                Some(out_idx) => output[out_idx].expand(&blob),
                None => {
                    root_to_out[root] = Some(output.len());
                    output.push(blob);
                }
            }
        }

        let unions = n - output.len();
        (output, unions)
    }
}

/// Union-find with path halving and union by size
struct UnionFind {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self { parent: (0..n).collect(), size: vec![1; n] }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let mut ra = self.find(a);
        let mut rb = self.find(b);
        if ra == rb {
            return;
        }
        if self.size[ra] < self.size[rb] {
            std::mem::swap(&mut ra, &mut rb);
        }
        self.parent[rb] = ra;
        self.size[ra] += self.size[rb];
    }
}
