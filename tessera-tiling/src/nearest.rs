//! Nearest-template lookup for random points in the tiled space
//!
//! Random points are drawn inside the parameter space, then the whole
//! tiling is enumerated once. Successive templates share every coordinate
//! below the changed dimension, so each random point's squared metric
//! distance is kept as a running sum over dimensions and only the rows at
//! or above the changed dimension are recomputed.
//!
//! Workspace rows (for `n` dimensions):
//! - `0..n`: normalized coordinate differences
//! - `n..2n-1`: off-diagonal terms `Σ_{j<=i} 2·g[i+1][j]·d_j`
//! - `2n-1..3n-1`: cumulative distance up to each dimension

use nalgebra::DMatrix;
use rand::Rng;

use crate::bound::MAX_BOUNDS;
use crate::error::{Result, TilingError};
use crate::tiling::Tiling;

/// Caller-owned buffers for [`Tiling::nearest_to_random_points`].
///
/// Buffers are reallocated only when the requested number of points (or the
/// tiling's dimensions) no longer match, so repeated queries of the same
/// size reuse the same storage.
#[derive(Debug, Clone)]
pub struct NearestBuffers {
    /// Random points in physical coordinates, one per column
    pub random_points: DMatrix<f64>,
    /// Enumeration index of the nearest template to each random point
    pub nearest_indices: Vec<u64>,
    /// Squared metric distance to the nearest template
    pub nearest_distances: Vec<f64>,
    workspace: DMatrix<f64>,
}

impl NearestBuffers {
    pub fn new() -> Self {
        Self {
            random_points: DMatrix::zeros(0, 0),
            nearest_indices: Vec::new(),
            nearest_distances: Vec::new(),
            workspace: DMatrix::zeros(0, 0),
        }
    }

    pub fn len(&self) -> usize {
        self.nearest_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nearest_indices.is_empty()
    }

    /// Largest nearest-template distance over all random points.
    pub fn max_distance(&self) -> Option<f64> {
        self.nearest_distances.iter().copied().reduce(f64::max)
    }

    fn reserve(&mut self, dimensions: usize, points: usize) {
        if self.random_points.shape() != (dimensions, points) {
            self.random_points = DMatrix::zeros(dimensions, points);
        }
        if self.nearest_indices.len() != points {
            self.nearest_indices = vec![0; points];
        }
        if self.nearest_distances.len() != points {
            self.nearest_distances = vec![0.0; points];
        }
        let rows = 3 * dimensions - 1;
        if self.workspace.shape() != (rows, points) {
            self.workspace = DMatrix::zeros(rows, points);
        }
    }
}

impl Default for NearestBuffers {
    fn default() -> Self {
        Self::new()
    }
}

impl Tiling {
    /// Draw one random point inside the parameter space into `point`.
    ///
    /// Tiled dimensions pick a position uniformly over the summed width of
    /// their intervals; singular dimensions pick one of their values
    /// uniformly.
    fn random_point<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        curr_bound: &mut [usize],
        point: &mut [f64],
    ) -> Result<()> {
        for i in 0..self.dimensions {
            let out = self.phys_bounds(i, curr_bound, point)?;
            let intervals = out.len().min(MAX_BOUNDS);
            let u: f64 = rng.gen();

            let (bound, p) = if out.is_tiled() {
                let total: f64 = (0..intervals).map(|b| out.upper(b) - out.lower(b)).sum();
                let mut p = u * total;
                let mut bound = 0;
                while bound + 1 < intervals {
                    let width = out.upper(bound) - out.lower(bound);
                    if p <= width {
                        break;
                    }
                    p -= width;
                    bound += 1;
                }
                (bound, p + out.lower(bound))
            } else {
                let bound = ((u * intervals as f64).floor() as usize).min(intervals - 1);
                (bound, out.lower(bound))
            };

            point[i] = p;
            curr_bound[i] = bound;
        }
        Ok(())
    }

    /// For `num_points` random points in the parameter space, find the
    /// nearest template and its squared metric distance.
    ///
    /// The whole tiling is enumerated, leaving it `Finished`.
    pub fn nearest_to_random_points<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        num_points: usize,
        buffers: &mut NearestBuffers,
    ) -> Result<()> {
        self.restart()?;
        if num_points == 0 {
            return Err(TilingError::InvalidArgument(
                "nearest-template query needs at least one random point".into(),
            ));
        }
        let n = self.dimensions;
        buffers.reserve(n, num_points);

        let mut curr_bound = vec![0usize; n];
        let mut point = vec![0.0; n];
        for k in 0..num_points {
            self.random_point(rng, &mut curr_bound, &mut point)?;
            buffers.random_points.set_column(k, &nalgebra::DVector::from_column_slice(&point));
        }

        buffers.nearest_distances.iter_mut().for_each(|d| *d = f64::INFINITY);
        buffers.nearest_indices.iter_mut().for_each(|i| *i = 0);

        let off_row = n;
        let dist_row = 2 * n - 1;

        while let Some(changed) = self.next_point()? {
            let nearest_index = self.count - 1;
            let ws = &mut buffers.workspace;

            for i in changed..n {
                let inv_scale = 1.0 / self.phys_scale[i];
                let lattice_i = self.curr_phys_point[i];
                for k in 0..num_points {
                    ws[(i, k)] = (buffers.random_points[(i, k)] - lattice_i) * inv_scale;
                }
            }

            for i in changed..n.saturating_sub(1) {
                for k in 0..num_points {
                    let mut off = 0.0;
                    for j in 0..=i {
                        off += 2.0 * self.metric[(i + 1, j)] * ws[(j, k)];
                    }
                    ws[(off_row + i, k)] = off;
                }
            }

            for i in changed..n {
                let g_ii = self.metric[(i, i)];
                for k in 0..num_points {
                    let d = ws[(i, k)];
                    let mut term = g_ii * d;
                    if i > 0 {
                        term += ws[(off_row + i - 1, k)];
                    }
                    let mut dist = term * d;
                    if i > 0 {
                        dist += ws[(dist_row + i - 1, k)];
                    }
                    ws[(dist_row + i, k)] = dist;
                }
            }

            for k in 0..num_points {
                let dist = ws[(dist_row + n - 1, k)];
                if dist < buffers.nearest_distances[k] {
                    buffers.nearest_distances[k] = dist;
                    buffers.nearest_indices[k] = nearest_index;
                }
            }
        }

        tracing::debug!(
            random_points = num_points,
            templates = self.count,
            "nearest-template query complete"
        );
        Ok(())
    }
}
