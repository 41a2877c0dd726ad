// Copyright (c) 2025-2026 brdigetrlol. All rights reserved.
// SPDX-License-Identifier: LicenseRef-Icarus-Proprietary
// See LICENSE in the repository root for full license terms.

//! Parameter-space bounds
//!
//! A bound describes, for one dimension, the physical interval(s) that the
//! tiling must cover. Bounds are evaluated in dimension order, so a bound on
//! dimension i may depend on the already-fixed coordinates of dimensions
//! 0..i (for example the chord of an ellipse at the current x), but never on
//! its own or higher coordinates.
//!
//! Each evaluation can produce up to [`MAX_BOUNDS`] disjoint intervals and
//! may widen the default padding (the half-width of the metric ellipse
//! bounding box) so that templates on the boundary still cover the space
//! just outside it.

use std::sync::Arc;

use crate::error::{Result, TilingError};

/// Maximum number of disjoint intervals per dimension.
pub const MAX_BOUNDS: usize = 4;

/// Inputs available to a bound when it is evaluated.
#[derive(Debug, Clone, Copy)]
pub struct BoundContext<'a> {
    /// Dimension being bounded
    pub dimension: usize,
    /// Active interval index of each lower dimension (length `dimension`)
    pub bound_indices: &'a [usize],
    /// Physical coordinates of each lower dimension (length `dimension`)
    pub point: &'a [f64],
    /// Physical lattice increments of dimensions `0..=dimension`
    pub increments: &'a [f64],
    /// Physical metric-ellipse bounding box of dimensions `0..=dimension`
    pub bounding_box: &'a [f64],
}

/// Intervals and padding produced by a bound evaluation.
///
/// Unset intervals hold NaN. On singular dimensions upper values and padding
/// requests are ignored: the dimension takes exactly the lower value(s).
#[derive(Debug, Clone, PartialEq)]
pub struct BoundIntervals {
    tiled: bool,
    /// First out-of-range interval index passed to `set`, if any
    bad_index: Option<usize>,
    lower: [f64; MAX_BOUNDS],
    upper: [f64; MAX_BOUNDS],
    lower_pad: f64,
    upper_pad: f64,
}

impl BoundIntervals {
    pub(crate) fn new(tiled: bool, default_pad: f64) -> Self {
        let pad = if tiled { default_pad } else { 0.0 };
        Self {
            tiled,
            bad_index: None,
            lower: [f64::NAN; MAX_BOUNDS],
            upper: [f64::NAN; MAX_BOUNDS],
            lower_pad: pad,
            upper_pad: pad,
        }
    }

    /// Whether the dimension being bounded is covered by the lattice
    pub fn is_tiled(&self) -> bool {
        self.tiled
    }

    /// Set interval `index` to `[lower, upper]`.
    ///
    /// An index of [`MAX_BOUNDS`] or more is recorded and rejected when the
    /// bound is validated.
    pub fn set(&mut self, index: usize, lower: f64, upper: f64) {
        if index >= MAX_BOUNDS {
            self.bad_index.get_or_insert(index);
            return;
        }
        self.lower[index] = lower;
        if self.tiled {
            self.upper[index] = upper;
        }
    }

    /// Set interval `index` to the single value `value`.
    pub fn set_point(&mut self, index: usize, value: f64) {
        self.set(index, value, value);
    }

    /// Request extra padding beyond the default, in physical units.
    pub fn pad(&mut self, lower: f64, upper: f64) {
        if self.tiled {
            self.lower_pad += lower;
            self.upper_pad += upper;
        }
    }

    pub fn lower(&self, index: usize) -> f64 {
        self.lower[index]
    }

    pub fn upper(&self, index: usize) -> f64 {
        self.upper[index]
    }

    pub fn lower_padding(&self) -> f64 {
        self.lower_pad
    }

    pub fn upper_padding(&self) -> f64 {
        self.upper_pad
    }

    /// Number of intervals set, counting up to the first unset one.
    pub fn len(&self) -> usize {
        (0..MAX_BOUNDS)
            .find(|&k| self.lower[k].is_nan() && self.upper[k].is_nan())
            .unwrap_or(MAX_BOUNDS)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn lowers(&self) -> &[f64; MAX_BOUNDS] {
        &self.lower
    }

    pub(crate) fn uppers(&self) -> &[f64; MAX_BOUNDS] {
        &self.upper
    }

    /// The first interval must be present, and every set interval finite.
    pub(crate) fn validate(&self, dimension: usize) -> Result<()> {
        if let Some(index) = self.bad_index {
            return Err(TilingError::InvalidArgument(format!(
                "bound on dimension {} set interval {} (at most {} allowed)",
                dimension, index, MAX_BOUNDS
            )));
        }
        for k in 0..self.len().max(1) {
            if !self.lower[k].is_finite() || (self.tiled && !self.upper[k].is_finite()) {
                return Err(TilingError::InvalidArgument(format!(
                    "bound on dimension {} produced a non-finite interval {} [{}, {}]",
                    dimension, k, self.lower[k], self.upper[k]
                )));
            }
        }
        if !self.lower_pad.is_finite() || !self.upper_pad.is_finite() {
            return Err(TilingError::InvalidArgument(format!(
                "bound on dimension {} produced non-finite padding",
                dimension
            )));
        }
        Ok(())
    }
}

/// A parameter-space bound on one dimension.
pub trait ParamBound: Send + Sync {
    fn bounds(&self, ctx: &BoundContext<'_>, out: &mut BoundIntervals);
}

impl<F> ParamBound for F
where
    F: Fn(&BoundContext<'_>, &mut BoundIntervals) + Send + Sync,
{
    fn bounds(&self, ctx: &BoundContext<'_>, out: &mut BoundIntervals) {
        self(ctx, out)
    }
}

/// Bound registered on a dimension. Several dimensions may share one handle.
#[derive(Clone)]
pub struct BoundDescriptor {
    pub tiled: bool,
    pub bound: Arc<dyn ParamBound>,
}

impl std::fmt::Debug for BoundDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundDescriptor")
            .field("tiled", &self.tiled)
            .field("bound", &Arc::as_ptr(&self.bound))
            .finish()
    }
}

/// Fixed interval `[lower, upper]`; singular when both ends coincide.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantBound {
    pub lower: f64,
    pub upper: f64,
}

impl ConstantBound {
    /// Build from two ends in either order.
    pub fn new(bound1: f64, bound2: f64) -> Result<Self> {
        if !bound1.is_finite() || !bound2.is_finite() {
            return Err(TilingError::InvalidArgument(format!(
                "constant bound [{}, {}] is not finite",
                bound1, bound2
            )));
        }
        Ok(Self {
            lower: bound1.min(bound2),
            upper: bound1.max(bound2),
        })
    }

    pub fn is_singular(&self) -> bool {
        self.lower == self.upper
    }
}

impl ParamBound for ConstantBound {
    fn bounds(&self, _ctx: &BoundContext<'_>, out: &mut BoundIntervals) {
        out.set(0, self.lower, self.upper);
    }
}

/// Elliptical region in the plane of `x_dimension` and `x_dimension + 1`.
///
/// The same handle bounds both dimensions: x by the constant interval
/// `[x_centre − x_semi, x_centre + x_semi]`, y by the ellipse chord at the
/// current x.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EllipticalBounds {
    pub x_dimension: usize,
    pub x_centre: f64,
    pub y_centre: f64,
    pub x_semi: f64,
    pub y_semi: f64,
}

impl EllipticalBounds {
    pub fn new(
        x_dimension: usize,
        x_centre: f64,
        y_centre: f64,
        x_semi: f64,
        y_semi: f64,
    ) -> Result<Self> {
        let finite = [x_centre, y_centre, x_semi, y_semi]
            .iter()
            .all(|v| v.is_finite());
        if !finite || x_semi < 0.0 || y_semi < 0.0 {
            return Err(TilingError::InvalidArgument(format!(
                "ellipse centre ({}, {}) semi-axes ({}, {}) must be finite with non-negative axes",
                x_centre, y_centre, x_semi, y_semi
            )));
        }
        Ok(Self {
            x_dimension,
            x_centre,
            y_centre,
            x_semi,
            y_semi,
        })
    }

    /// Half-width of the ellipse chord at `x`, normalized by `y_semi`, and the
    /// normalized centred x itself.
    fn chord(&self, x: f64) -> (f64, f64) {
        let nx = (x - self.x_centre) / self.x_semi;
        let nxsqr = nx * nx;
        let ny = if nxsqr < 1.0 { (1.0 - nxsqr).sqrt() } else { 0.0 };
        (nx, ny)
    }

    fn y_bounds(&self, ctx: &BoundContext<'_>, out: &mut BoundIntervals) {
        let x = ctx.point[ctx.dimension - 1];
        let (nx, ny) = self.chord(x);
        out.set(
            0,
            self.y_centre - ny * self.y_semi,
            self.y_centre + ny * self.y_semi,
        );

        // Boundary templates sit anywhere within half a bounding box of x;
        // pad y out to the widest chord reachable from there.
        let nhbbx = 0.5 * ctx.bounding_box[ctx.dimension - 1] / self.x_semi;
        let absnx = nx.abs();
        let npy = if absnx <= nhbbx {
            1.0 - ny
        } else if absnx <= 1.0 + nhbbx {
            let dnx = absnx - nhbbx;
            (1.0 - dnx * dnx).sqrt() - ny
        } else {
            0.0
        };
        let pad = npy * self.y_semi;
        out.pad(pad, pad);
    }
}

impl ParamBound for EllipticalBounds {
    fn bounds(&self, ctx: &BoundContext<'_>, out: &mut BoundIntervals) {
        if ctx.dimension == self.x_dimension {
            out.set(
                0,
                self.x_centre - self.x_semi,
                self.x_centre + self.x_semi,
            );
        } else {
            self.y_bounds(ctx, out);
        }
    }
}
