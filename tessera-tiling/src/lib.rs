// Copyright (c) 2025-2026 brdigetrlol. All rights reserved.
// SPDX-License-Identifier: LicenseRef-Icarus-Proprietary
// See LICENSE in the repository root for full license terms.

//! Tessera Tiling: flat lattice template banks over bounded parameter spaces
//!
//! Covers a parameter space with lattice templates so that every point lies
//! within a maximum metric mismatch of some template:
//! - Bounds: per-dimension intervals that may depend on lower dimensions
//! - Tiling: metric-driven lattice setup and odometer-style enumeration
//! - Nearest: incremental nearest-template distances for random points
//! - Config: serde-described tilings and presets

pub mod bound;
pub mod config;
pub mod error;
pub mod nearest;
pub mod tiling;

pub use bound::{
    BoundContext, BoundDescriptor, BoundIntervals, ConstantBound, EllipticalBounds, ParamBound,
    MAX_BOUNDS,
};
pub use config::{BoundConfig, MetricConfig, TilingConfig};
pub use error::{Result, TilingError};
pub use nearest::NearestBuffers;
pub use tiling::{TemplatePoints, Tiling, TilingStatus};
