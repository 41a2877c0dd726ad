// Copyright (c) 2025-2026 brdigetrlol. All rights reserved.
// SPDX-License-Identifier: LicenseRef-Icarus-Proprietary
// See LICENSE in the repository root for full license terms.

//! A_n* Lattice Generator
//!
//! The A_n* lattice is the dual of the root lattice A_n and gives the
//! thinnest known lattice covering for n <= 5 (for n = 2 it is the hexagonal
//! lattice). It is constructed in the hyperplane Σxᵢ = 0 of R^(n+1), so the
//! generator returned here has n+1 rows and n columns:
//!
//! ```text
//!   [  1   1  ...  1   -n/(n+1) ]
//!   [ -1   0  ...  0    1/(n+1) ]
//!   [  0  -1  ...  0    1/(n+1) ]
//!   [  :            :      :    ]
//!   [  0   0  ... -1    1/(n+1) ]
//! ```
//!
//! The tiling engine reduces it to a square lower-triangular basis via QR.

use nalgebra::DMatrix;

use super::LatticeGenerator;
use crate::error::{LinalgError, Result};

#[derive(Debug, Clone, Copy, Default)]
pub struct AnstarLattice;

impl LatticeGenerator for AnstarLattice {
    fn name(&self) -> &'static str {
        "anstar"
    }

    fn generator(&self, dimensions: usize) -> Result<DMatrix<f64>> {
        if dimensions == 0 {
            return Err(LinalgError::EmptyDimensions);
        }
        let r = dimensions;
        let rf = r as f64;
        let mut g = DMatrix::<f64>::zeros(r + 1, r);

        for j in 0..r {
            g[(0, j)] = 1.0;
            g[(j + 1, j)] = -1.0;
        }

        // Last column overrides the first-row and sub-diagonal entries in it
        for i in 0..=r {
            g[(i, r - 1)] = 1.0 / (rf + 1.0);
        }
        g[(0, r - 1)] = -rf / (rf + 1.0);

        Ok(g)
    }

    fn normalized_thickness(&self, dimensions: usize) -> f64 {
        let r = dimensions as f64;
        (r + 1.0).sqrt() * ((r * (r + 2.0)) / (12.0 * (r + 1.0))).powf(0.5 * r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anstar_shape() {
        for n in 1..=6 {
            let g = AnstarLattice.generator(n).unwrap();
            assert_eq!(g.shape(), (n + 1, n));
        }
    }

    #[test]
    fn test_anstar_columns_in_zero_sum_hyperplane() {
        let g = AnstarLattice.generator(4).unwrap();
        for j in 0..4 {
            let sum: f64 = g.column(j).iter().sum();
            assert!(sum.abs() < 1e-12, "column {} sums to {}", j, sum);
        }
    }

    #[test]
    fn test_anstar_two_dimensional_entries() {
        let g = AnstarLattice.generator(2).unwrap();
        let expected = DMatrix::from_row_slice(
            3,
            2,
            &[1.0, -2.0 / 3.0, -1.0, 1.0 / 3.0, 0.0, 1.0 / 3.0],
        );
        assert!((g - expected).norm() < 1e-12);
    }

    #[test]
    fn test_anstar_thickness() {
        // n = 1: √2 · (3/24)^(1/2) = √2 · √(1/8) = 0.5, same as Z^1
        assert!((AnstarLattice.normalized_thickness(1) - 0.5).abs() < 1e-12);
        // n = 2: hexagonal covering thickness 2π/√27 over the unit-disk area π
        let expected = 2.0 / 27f64.sqrt();
        assert!((AnstarLattice.normalized_thickness(2) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_anstar_thinner_than_cubic() {
        use crate::lattice::CubicLattice;
        for n in 2..=8 {
            assert!(
                AnstarLattice.normalized_thickness(n) < CubicLattice.normalized_thickness(n),
                "A_{}* should cover more thinly than Z^{}",
                n,
                n
            );
        }
    }
}
