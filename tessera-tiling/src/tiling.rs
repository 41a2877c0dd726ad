// Copyright (c) 2025-2026 brdigetrlol. All rights reserved.
// SPDX-License-Identifier: LicenseRef-Icarus-Proprietary
// See LICENSE in the repository root for full license terms.

//! Flat lattice tiling state machine
//!
//! A `Tiling` covers a bounded parameter space with lattice points
//! ("templates") such that every point of the space is within the maximum
//! mismatch of some template, as measured by a constant metric.
//!
//! Lifecycle:
//! 1. `Tiling::new(n)` → `Incomplete`
//! 2. register one bound per dimension and a lattice generator
//! 3. `set_metric()` computes scaling, increments and bounding box → `Initialised`
//! 4. `next_point()` yields templates → `Started`, until exhausted → `Finished`
//! 5. `restart()` returns to `Initialised` keeping the configuration
//!
//! Internally points are held in normalized coordinates, in which every
//! tiled diagonal element of the metric is 1; physical coordinates are
//! `normalized × phys_scale + phys_offset`.

use std::sync::Arc;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tessera_math::lattice::{LatticeGenerator, LatticeKind};
use tessera_math::metric::{lattice_increments, metric_ellipse_bounding_box};
use tessera_math::LinalgError;

use crate::bound::{
    BoundContext, BoundDescriptor, BoundIntervals, ConstantBound, EllipticalBounds, ParamBound,
    MAX_BOUNDS,
};
use crate::error::{Result, TilingError};

/// Lifecycle status of a tiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TilingStatus {
    /// Bounds, generator or metric still missing
    Incomplete,
    /// Fully configured; enumeration not yet started
    Initialised,
    /// At least one template has been produced
    Started,
    /// Every template has been produced
    Finished,
}

/// Current intervals and padding of one dimension, in normalized coordinates.
#[derive(Debug, Clone)]
pub(crate) struct BoundState {
    pub lower: [f64; MAX_BOUNDS],
    pub upper: [f64; MAX_BOUNDS],
    pub lower_pad: f64,
    pub upper_pad: f64,
}

impl BoundState {
    fn empty() -> Self {
        Self {
            lower: [f64::NAN; MAX_BOUNDS],
            upper: [f64::NAN; MAX_BOUNDS],
            lower_pad: 0.0,
            upper_pad: 0.0,
        }
    }

    fn has_interval(&self, index: usize) -> bool {
        !(self.lower[index].is_nan() && self.upper[index].is_nan())
    }
}

/// Flat lattice tiling of a parameter space.
#[derive(Debug)]
pub struct Tiling {
    pub(crate) dimensions: usize,
    pub(crate) tiled_dimensions: usize,
    pub(crate) status: TilingStatus,
    pub(crate) bounds: Vec<Option<BoundDescriptor>>,
    pub(crate) generator: Option<Arc<dyn LatticeGenerator>>,
    /// Normalized → physical scaling
    pub(crate) phys_scale: Vec<f64>,
    /// Normalized → physical offset
    pub(crate) phys_offset: Vec<f64>,
    /// Physical lattice increment along each axis
    pub(crate) phys_incr: Vec<f64>,
    /// Physical metric-ellipse bounding box
    pub(crate) phys_bbox: Vec<f64>,
    /// Normalized metric
    pub(crate) metric: DMatrix<f64>,
    /// Normalized increment vectors, one per column
    pub(crate) increment: DMatrix<f64>,
    pub(crate) curr_point: Vec<f64>,
    pub(crate) curr_bound: Vec<usize>,
    pub(crate) curr_state: Vec<BoundState>,
    pub(crate) curr_phys_point: Vec<f64>,
    pub(crate) count: u64,
}

impl Tiling {
    /// Create an empty tiling of `dimensions` dimensions.
    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(TilingError::InvalidArgument(
                "tiling requires at least one dimension".into(),
            ));
        }
        let n = dimensions;
        Ok(Self {
            dimensions: n,
            tiled_dimensions: 0,
            status: TilingStatus::Incomplete,
            bounds: vec![None; n],
            generator: None,
            phys_scale: vec![1.0; n],
            phys_offset: vec![0.0; n],
            phys_incr: vec![0.0; n],
            phys_bbox: vec![0.0; n],
            metric: DMatrix::zeros(n, n),
            increment: DMatrix::zeros(n, n),
            curr_point: vec![0.0; n],
            curr_bound: vec![0; n],
            curr_state: vec![BoundState::empty(); n],
            curr_phys_point: vec![0.0; n],
            count: 0,
        })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of non-singular dimensions; valid once the metric is set.
    pub fn tiled_dimensions(&self) -> usize {
        self.tiled_dimensions
    }

    pub fn status(&self) -> TilingStatus {
        self.status
    }

    /// Number of templates produced since the last restart.
    pub fn point_count(&self) -> u64 {
        self.count
    }

    /// Physical coordinates of the current template, while enumeration is running.
    pub fn current_point(&self) -> Option<&[f64]> {
        match self.status {
            TilingStatus::Started => Some(&self.curr_phys_point),
            _ => None,
        }
    }

    fn require_incomplete(&self, action: &str) -> Result<()> {
        if self.status != TilingStatus::Incomplete {
            return Err(TilingError::InvalidState(format!(
                "cannot {} once the metric has been set",
                action
            )));
        }
        Ok(())
    }

    fn require_configured(&self, action: &str) -> Result<()> {
        if self.status == TilingStatus::Incomplete {
            return Err(TilingError::InvalidState(format!(
                "cannot {} before the metric has been set",
                action
            )));
        }
        Ok(())
    }

    fn check_dimension(&self, dimension: usize) -> Result<()> {
        if dimension >= self.dimensions {
            return Err(TilingError::InvalidArgument(format!(
                "dimension {} out of range (tiling has {} dimensions)",
                dimension, self.dimensions
            )));
        }
        Ok(())
    }

    fn is_tiled(&self, dimension: usize) -> bool {
        self.bounds[dimension]
            .as_ref()
            .map_or(false, |b| b.tiled)
    }

    // ─── Configuration ──────────────────────────────

    /// Register the bound on `dimension`.
    ///
    /// A singular dimension is not covered by the lattice: it takes exactly
    /// the lower value(s) the bound produces.
    pub fn set_bound(
        &mut self,
        dimension: usize,
        singular: bool,
        bound: Arc<dyn ParamBound>,
    ) -> Result<()> {
        self.require_incomplete("set a bound")?;
        self.check_dimension(dimension)?;
        self.bounds[dimension] = Some(BoundDescriptor {
            tiled: !singular,
            bound,
        });
        Ok(())
    }

    /// Bound `dimension` to the constant interval between `bound1` and `bound2`.
    pub fn set_constant_bound(&mut self, dimension: usize, bound1: f64, bound2: f64) -> Result<()> {
        let bound = ConstantBound::new(bound1, bound2)?;
        self.set_bound(dimension, bound.is_singular(), Arc::new(bound))
    }

    /// Bound dimensions `x_dimension` and `x_dimension + 1` to an ellipse.
    ///
    /// If either semi-axis is zero the region degenerates to a rectangle and
    /// two constant bounds are registered instead.
    pub fn set_elliptical_bounds(
        &mut self,
        x_dimension: usize,
        x_centre: f64,
        y_centre: f64,
        x_semi: f64,
        y_semi: f64,
    ) -> Result<()> {
        self.require_incomplete("set a bound")?;
        let ellipse = EllipticalBounds::new(x_dimension, x_centre, y_centre, x_semi, y_semi)?;
        let y_dimension = x_dimension.checked_add(1).ok_or_else(|| {
            TilingError::InvalidArgument(format!("x dimension {} has no successor", x_dimension))
        })?;
        self.check_dimension(y_dimension)?;

        if x_semi == 0.0 || y_semi == 0.0 {
            self.set_constant_bound(x_dimension, x_centre - x_semi, x_centre + x_semi)?;
            return self.set_constant_bound(y_dimension, y_centre - y_semi, y_centre + y_semi);
        }

        let shared: Arc<dyn ParamBound> = Arc::new(ellipse);
        self.set_bound(x_dimension, false, Arc::clone(&shared))?;
        self.set_bound(y_dimension, false, shared)
    }

    /// Choose the lattice generator.
    pub fn set_generator(&mut self, generator: Arc<dyn LatticeGenerator>) -> Result<()> {
        self.require_incomplete("set the lattice generator")?;
        self.generator = Some(generator);
        Ok(())
    }

    /// Choose one of the built-in lattice generators.
    pub fn set_lattice(&mut self, kind: LatticeKind) -> Result<()> {
        self.set_generator(kind.generator())
    }

    /// Evaluate the bound on `dimension` at the given lower-dimension state.
    pub(crate) fn phys_bounds(
        &self,
        dimension: usize,
        curr_bound: &[usize],
        phys_point: &[f64],
    ) -> Result<BoundIntervals> {
        let desc = self.bounds[dimension].as_ref().ok_or_else(|| {
            TilingError::InvalidState(format!("dimension {} is unbounded", dimension))
        })?;

        let mut out = BoundIntervals::new(desc.tiled, self.phys_bbox[dimension]);
        let ctx = BoundContext {
            dimension,
            bound_indices: &curr_bound[..dimension],
            point: &phys_point[..dimension],
            increments: &self.phys_incr[..=dimension],
            bounding_box: &self.phys_bbox[..=dimension],
        };
        desc.bound.bounds(&ctx, &mut out);
        out.validate(dimension)?;

        Ok(out)
    }

    /// Set the parameter-space metric and maximum mismatch, completing the
    /// configuration.
    pub fn set_metric(&mut self, metric: &DMatrix<f64>, max_mismatch: f64) -> Result<()> {
        self.require_incomplete("set the metric")?;
        let n = self.dimensions;

        if metric.shape() != (n, n) {
            return Err(TilingError::InvalidArgument(format!(
                "metric has shape {}x{}, expected {}x{}",
                metric.nrows(),
                metric.ncols(),
                n,
                n
            )));
        }
        if !(max_mismatch > 0.0 && max_mismatch.is_finite()) {
            return Err(TilingError::InvalidArgument(format!(
                "maximum mismatch must be positive, got {}",
                max_mismatch
            )));
        }

        let mut tiled_dimensions = 0;
        for (i, bound) in self.bounds.iter().enumerate() {
            match bound {
                Some(b) => tiled_dimensions += usize::from(b.tiled),
                None => {
                    return Err(TilingError::InvalidState(format!(
                        "dimension {} is unbounded",
                        i
                    )))
                }
            }
        }
        let generator = self.generator.clone().ok_or_else(|| {
            TilingError::InvalidState("lattice generator has not been set".into())
        })?;

        // Physical scaling from the metric diagonal
        let mut phys_scale = vec![1.0; n];
        for (i, scale) in phys_scale.iter_mut().enumerate() {
            if self.is_tiled(i) {
                let g_ii = metric[(i, i)];
                if !(g_ii > 0.0) {
                    return Err(TilingError::InvalidArgument(format!(
                        "metric({}, {}) = {} is not positive",
                        i, i, g_ii
                    )));
                }
                *scale = 1.0 / g_ii.sqrt();
            }
        }

        // Symmetric check and rescaled copy
        let mut scaled = DMatrix::<f64>::zeros(n, n);
        for i in 0..n {
            for j in 0..n {
                if metric[(i, j)] != metric[(j, i)] {
                    return Err(LinalgError::NotSymmetric { row: i, col: j }.into());
                }
                scaled[(i, j)] = metric[(i, j)] * phys_scale[i] * phys_scale[j];
            }
        }

        self.tiled_dimensions = tiled_dimensions;
        self.phys_scale = phys_scale;
        self.metric = scaled;
        self.phys_incr.iter_mut().for_each(|v| *v = 0.0);
        self.phys_bbox.iter_mut().for_each(|v| *v = 0.0);
        self.increment.fill(0.0);

        // Physical offset: lower bound of each dimension, with lower
        // dimensions fixed at their own offsets
        self.curr_bound.iter_mut().for_each(|b| *b = 0);
        let zero_bound = vec![0usize; n];
        for i in 0..n {
            let out = self.phys_bounds(i, &zero_bound, &self.phys_offset)?;
            if out.is_tiled() && out.lower(0) > out.upper(0) {
                tracing::warn!(
                    dimension = i,
                    lower = out.lower(0),
                    upper = out.upper(0),
                    "bound interval is inverted"
                );
            }
            self.phys_offset[i] = out.lower(0);
        }

        if self.tiled_dimensions > 0 {
            let tiled: Vec<usize> = (0..n).filter(|&i| self.is_tiled(i)).collect();
            let tn = tiled.len();

            let tmetric = DMatrix::from_fn(tn, tn, |a, b| self.metric[(tiled[a], tiled[b])]);
            let tincrement = lattice_increments(generator.as_ref(), &tmetric, max_mismatch)?;
            let tbbox = metric_ellipse_bounding_box(&tmetric, max_mismatch)?;

            // Scatter back so singular dimensions stay zero
            for (ti, &i) in tiled.iter().enumerate() {
                self.phys_incr[i] = tincrement[(ti, ti)] * self.phys_scale[i];
                self.phys_bbox[i] = tbbox[ti] * self.phys_scale[i];
                for (tj, &j) in tiled.iter().enumerate() {
                    self.increment[(i, j)] = tincrement[(ti, tj)];
                }
            }
        }

        tracing::debug!(
            dimensions = n,
            tiled = self.tiled_dimensions,
            lattice = generator.name(),
            max_mismatch,
            "tiling initialised"
        );

        self.status = TilingStatus::Initialised;
        self.restart()
    }

    /// Physical increment vectors of the lattice, one per column.
    pub fn increments(&self) -> Result<DMatrix<f64>> {
        self.require_configured("get increments")?;
        let mut increment = self.increment.clone();
        for (i, mut row) in increment.row_iter_mut().enumerate() {
            row *= self.phys_scale[i];
        }
        Ok(increment)
    }

    /// Physical lattice increment along each axis.
    pub fn axis_increments(&self) -> &[f64] {
        &self.phys_incr
    }

    /// Physical half-widths of the metric mismatch ellipse bounding box.
    pub fn bounding_box(&self) -> &[f64] {
        &self.phys_bbox
    }

    // ─── Enumeration ────────────────────────────────

    /// Return to the start of the enumeration.
    pub fn restart(&mut self) -> Result<()> {
        self.require_configured("restart")?;
        self.status = TilingStatus::Initialised;
        self.count = 0;
        Ok(())
    }

    /// Re-evaluate the bound on `dimension` and store it normalized.
    fn load_bounds(&mut self, dimension: usize) -> Result<()> {
        let out = self.phys_bounds(dimension, &self.curr_bound, &self.curr_phys_point)?;
        let scale = self.phys_scale[dimension];
        let offset = self.phys_offset[dimension];

        let state = &mut self.curr_state[dimension];
        for k in 0..MAX_BOUNDS {
            state.lower[k] = (out.lowers()[k] - offset) / scale;
            state.upper[k] = (out.uppers()[k] - offset) / scale;
        }
        state.lower_pad = out.lower_padding() / scale;
        state.upper_pad = out.upper_padding() / scale;
        Ok(())
    }

    fn update_phys_point(&mut self) {
        for i in 0..self.dimensions {
            self.curr_phys_point[i] = self.curr_point[i] * self.phys_scale[i] + self.phys_offset[i];
        }
    }

    /// Move the current point by `steps` lattice increments along `dimension`.
    fn step_along(&mut self, dimension: usize, steps: f64) {
        for k in dimension..self.dimensions {
            self.curr_point[k] += steps * self.increment[(k, dimension)];
        }
    }

    fn start(&mut self) -> Result<()> {
        self.curr_bound.iter_mut().for_each(|b| *b = 0);

        for i in 0..self.dimensions {
            self.load_bounds(i)?;
            let state = &self.curr_state[i];
            let point = state.lower[0] - state.lower_pad;
            self.curr_point[i] = point;
            self.curr_phys_point[i] = point * self.phys_scale[i] + self.phys_offset[i];
        }

        self.count = 1;
        self.status = TilingStatus::Started;
        Ok(())
    }

    /// Advance to the next template.
    ///
    /// Returns the lowest dimension whose coordinate changed (0 when every
    /// coordinate changed), or `None` once the tiling is exhausted.
    pub fn next_point(&mut self) -> Result<Option<usize>> {
        match self.status {
            TilingStatus::Incomplete => {
                return Err(TilingError::InvalidState(
                    "cannot enumerate before the metric has been set".into(),
                ))
            }
            TilingStatus::Finished => return Ok(None),
            TilingStatus::Initialised => {
                self.start()?;
                return Ok(Some(0));
            }
            TilingStatus::Started if self.tiled_dimensions == 0 => {
                self.status = TilingStatus::Finished;
                return Ok(None);
            }
            TilingStatus::Started => {}
        }

        let n = self.dimensions;

        // Odometer: advance the highest dimension, carrying downwards
        let mut i = n;
        let reset_from = loop {
            if i == 0 {
                self.status = TilingStatus::Finished;
                return Ok(None);
            }
            i -= 1;

            let bound = self.curr_bound[i];

            if self.is_tiled(i) {
                self.step_along(i, 1.0);
                let state = &self.curr_state[i];
                if self.curr_point[i] <= state.upper[bound] + state.upper_pad {
                    break i + 1;
                }
            }

            let next = bound + 1;
            if next < MAX_BOUNDS && self.curr_state[i].has_interval(next) {
                self.curr_bound[i] = next;
                break i;
            }

            // Exhausted this dimension: carry into the one below
            self.curr_bound[i..].iter_mut().for_each(|b| *b = 0);
        };

        // Return higher dimensions to their lower bounds
        for r in reset_from..n {
            let bound = self.curr_bound[r];
            if bound == 0 {
                self.update_phys_point();
                self.load_bounds(r)?;
            }

            let state = &self.curr_state[r];
            let lower = state.lower[bound];
            if self.is_tiled(r) {
                let target = lower - state.lower_pad;
                let steps = steps_to_reach(target - self.curr_point[r], self.increment[(r, r)]);
                self.step_along(r, steps);
            } else {
                self.curr_point[r] = lower;
            }
        }
        self.update_phys_point();

        self.count += 1;
        Ok(Some(i))
    }

    /// Enumerate every template, returning the total; the tiling is restarted.
    pub fn count_total_points(&mut self) -> Result<u64> {
        self.require_configured("count points")?;
        while self.next_point()?.is_some() {}
        let count = self.count;
        self.restart()?;
        tracing::debug!(count, "counted tiling templates");
        Ok(count)
    }

    /// Iterate over `(changed_dimension, physical_point)` from the start.
    pub fn points(&mut self) -> Result<TemplatePoints<'_>> {
        self.restart()?;
        Ok(TemplatePoints {
            tiling: self,
            error: None,
        })
    }
}

/// Whole increments of size `step` needed to cover `distance`, rounding up.
///
/// Ratios within round-off of a whole number are taken as that number, so a
/// point already on the lattice is not pushed one increment further.
fn steps_to_reach(distance: f64, step: f64) -> f64 {
    let ratio = distance / step;
    let whole = ratio.round();
    if (ratio - whole).abs() < 1e-9 * ratio.abs().max(1.0) {
        whole
    } else {
        ratio.ceil()
    }
}

/// Iterator over the templates of a tiling.
///
/// An enumeration error ends the iteration; it is kept in [`TemplatePoints::error`].
pub struct TemplatePoints<'a> {
    tiling: &'a mut Tiling,
    error: Option<TilingError>,
}

impl TemplatePoints<'_> {
    pub fn error(&self) -> Option<&TilingError> {
        self.error.as_ref()
    }
}

impl Iterator for TemplatePoints<'_> {
    type Item = (usize, Vec<f64>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.error.is_some() {
            return None;
        }
        match self.tiling.next_point() {
            Ok(Some(changed)) => Some((changed, self.tiling.curr_phys_point.clone())),
            Ok(None) => None,
            Err(e) => {
                self.error = Some(e);
                None
            }
        }
    }
}
