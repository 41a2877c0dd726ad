// Copyright (c) 2025-2026 brdigetrlol. All rights reserved.
// SPDX-License-Identifier: LicenseRef-Icarus-Proprietary
// See LICENSE in the repository root for full license terms.

//! Lattice generator library for flat lattice tilings
//!
//! Each lattice family supplies a canonical generator matrix (rows are
//! coordinates, columns are basis vectors) and its normalized thickness,
//! which is later used to scale the lattice to a requested covering radius:
//! - Cubic (Z^n): identity generator, thickness (√n/2)^n
//! - A_n*: densest known covering in low dimension, built in n+1 dimensions

pub mod anstar;
pub mod cubic;

pub use anstar::AnstarLattice;
pub use cubic::CubicLattice;

use std::sync::Arc;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Identifies a built-in lattice family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LatticeKind {
    /// Hypercubic lattice Z^n
    Cubic,
    /// A_n* lattice, optimal covering for n <= 5
    #[default]
    Anstar,
}

impl LatticeKind {
    /// Instantiate the generator for this family.
    pub fn generator(self) -> Arc<dyn LatticeGenerator> {
        match self {
            LatticeKind::Cubic => Arc::new(CubicLattice),
            LatticeKind::Anstar => Arc::new(AnstarLattice),
        }
    }
}

/// Contract shared by all lattice families used for tiling.
pub trait LatticeGenerator: Send + Sync {
    /// Short human-readable family name
    fn name(&self) -> &'static str;

    /// Generator matrix for `dimensions` tiled dimensions.
    ///
    /// The matrix has `dimensions` columns and at least as many rows; families
    /// constructed in a higher-dimensional embedding return extra rows.
    fn generator(&self, dimensions: usize) -> Result<DMatrix<f64>>;

    /// Normalized thickness of the lattice: ratio of the covering-sphere volume
    /// to the fundamental-cell volume, divided by the unit-ball volume.
    fn normalized_thickness(&self, dimensions: usize) -> f64;
}

impl std::fmt::Debug for dyn LatticeGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LatticeGenerator({})", self.name())
    }
}
