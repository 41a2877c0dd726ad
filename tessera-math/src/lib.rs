// Copyright (c) 2025-2026 brdigetrlol. All rights reserved.
// SPDX-License-Identifier: LicenseRef-Icarus-Proprietary
// See LICENSE in the repository root for full license terms.

pub mod error;
pub mod lattice;
pub mod metric;

pub use error::{LinalgError, Result};
pub use lattice::{AnstarLattice, CubicLattice, LatticeGenerator, LatticeKind};
pub use metric::{lattice_increments, metric_ellipse_bounding_box};
