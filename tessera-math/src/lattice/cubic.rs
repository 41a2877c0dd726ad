//! Cubic Lattice (Z^n) Generator
//!
//! The simplest lattice: integer coordinates in n dimensions.
//!
//! Properties:
//! - Generator: n×n identity
//! - Covering radius of the unit cell: √n/2
//! - Normalized thickness: (√n/2)^n, which grows quickly with n

use nalgebra::DMatrix;

use super::LatticeGenerator;
use crate::error::{LinalgError, Result};

#[derive(Debug, Clone, Copy, Default)]
pub struct CubicLattice;

impl LatticeGenerator for CubicLattice {
    fn name(&self) -> &'static str {
        "cubic"
    }

    fn generator(&self, dimensions: usize) -> Result<DMatrix<f64>> {
        if dimensions == 0 {
            return Err(LinalgError::EmptyDimensions);
        }
        Ok(DMatrix::identity(dimensions, dimensions))
    }

    fn normalized_thickness(&self, dimensions: usize) -> f64 {
        let r = dimensions as f64;
        (r.sqrt() / 2.0).powf(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cubic_identity() {
        let g = CubicLattice.generator(4).unwrap();
        assert_eq!(g.shape(), (4, 4));
        assert_eq!(g, DMatrix::identity(4, 4));
    }

    #[test]
    fn test_cubic_thickness() {
        assert!((CubicLattice.normalized_thickness(1) - 0.5).abs() < 1e-15);
        assert!((CubicLattice.normalized_thickness(2) - 0.5).abs() < 1e-15);
        // (√4/2)^4 = 1
        assert!((CubicLattice.normalized_thickness(4) - 1.0).abs() < 1e-15);
    }

    #[test]
    fn test_cubic_zero_dimensions() {
        assert_eq!(
            CubicLattice.generator(0),
            Err(LinalgError::EmptyDimensions)
        );
    }
}
