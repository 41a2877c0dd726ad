// Copyright (c) 2025-2026 brdigetrlol. All rights reserved.
// SPDX-License-Identifier: LicenseRef-Icarus-Proprietary
// See LICENSE in the repository root for full license terms.

//! Metric-driven lattice construction
//!
//! Turns a positive-definite parameter-space metric g_ij and a maximum
//! mismatch μ into:
//! - the lattice increment vectors, expressed in the metric's coordinates,
//!   such that the lattice covering radius w.r.t. g is √μ
//! - the bounding box of the mismatch ellipsoid { x : xᵀ g x <= μ }
//!
//! Pipeline for the increments:
//! 1. Cholesky trial to confirm g is positive definite
//! 2. Reverse-order Gram-Schmidt of the identity w.r.t. g (directions)
//! 3. QR reduction of the lattice generator to square lower-triangular form
//! 4. Rescale the generator to covering radius √μ via det and thickness
//! 5. increments = directions · generator

use nalgebra::{DMatrix, DVector};

use crate::error::{LinalgError, Result};
use crate::lattice::LatticeGenerator;

fn check_square(matrix: &DMatrix<f64>) -> Result<usize> {
    if matrix.nrows() != matrix.ncols() {
        return Err(LinalgError::NotSquare {
            rows: matrix.nrows(),
            cols: matrix.ncols(),
        });
    }
    Ok(matrix.nrows())
}

fn check_mismatch(max_mismatch: f64) -> Result<()> {
    if max_mismatch > 0.0 && max_mismatch.is_finite() {
        Ok(())
    } else {
        Err(LinalgError::InvalidMismatch(max_mismatch))
    }
}

/// Extents of the bounding box of the metric mismatch ellipsoid.
///
/// Component i is `√(μ · (g⁻¹)_ii)`, the largest excursion along axis i of
/// any point within mismatch μ of the origin.
pub fn metric_ellipse_bounding_box(
    metric: &DMatrix<f64>,
    max_mismatch: f64,
) -> Result<DVector<f64>> {
    let n = check_square(metric)?;
    check_mismatch(max_mismatch)?;

    let inverse = metric
        .clone()
        .lu()
        .try_inverse()
        .ok_or(LinalgError::SingularMatrix("metric has no inverse"))?;

    Ok(DVector::from_fn(n, |i, _| {
        (max_mismatch * inverse[(i, i)]).sqrt()
    }))
}

/// Orthonormalize the columns of `matrix` with respect to `metric`.
///
/// Gram-Schmidt runs from the last column to the first: each column has the
/// components along the already-processed higher columns removed, then is
/// normalized so that `colᵀ g col = 1`. Applied to the identity this yields a
/// lower-triangular set of directions.
pub fn orthonormalize_wrt_metric(matrix: &mut DMatrix<f64>, metric: &DMatrix<f64>) -> Result<()> {
    let n = check_square(metric)?;
    if matrix.nrows() != n || matrix.ncols() != n {
        return Err(LinalgError::NotSquare {
            rows: matrix.nrows(),
            cols: matrix.ncols(),
        });
    }

    for i in (0..n).rev() {
        for j in ((i + 1)..n).rev() {
            let col_j = matrix.column(j).into_owned();
            let inner = matrix.column(i).dot(&(metric * &col_j));
            matrix.column_mut(i).axpy(-inner, &col_j, 1.0);
        }

        let col_i = matrix.column(i).into_owned();
        let norm_sq = col_i.dot(&(metric * &col_i));
        if !(norm_sq > 0.0) {
            return Err(LinalgError::NotPositiveDefinite);
        }
        matrix.column_mut(i).scale_mut(1.0 / norm_sq.sqrt());
    }

    Ok(())
}

/// Reduce an m×n (m >= n) generator to an equivalent n×n lower-triangular one.
///
/// With `G = QR`, the lattice is rotated by Qᵀ into the upper-triangular R,
/// then both row and column order are reversed (turning upper into lower
/// triangular) and rows are sign-flipped so the diagonal is positive. Column
/// j of the result is the image of column n−1−j of G.
pub fn square_lower_triangular(generator: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    let (m, n) = generator.shape();
    if n == 0 {
        return Err(LinalgError::EmptyDimensions);
    }
    if m < n {
        return Err(LinalgError::GeneratorShape { rows: m, cols: n });
    }

    let r = generator.clone().qr().r();

    let mut result = DMatrix::<f64>::zeros(n, n);
    for i in 0..n {
        let ri = n - 1 - i;
        let diag = r[(ri, ri)];
        if diag == 0.0 {
            return Err(LinalgError::SingularMatrix("generator is rank deficient"));
        }
        let sign = diag.signum();
        for j in 0..=i {
            result[(i, j)] = sign * r[(ri, n - 1 - j)];
        }
    }

    Ok(result)
}

/// Scale a square generator so that its covering radius is `covering_radius`.
///
/// The covering radius of a lattice with generator L and normalized
/// thickness θ is `(θ · |det L|)^(1/n)`.
pub fn normalize_generator(
    generator: &mut DMatrix<f64>,
    norm_thickness: f64,
    covering_radius: f64,
) -> Result<()> {
    let n = check_square(generator)?;
    if n == 0 {
        return Err(LinalgError::EmptyDimensions);
    }

    let determinant = generator.clone().lu().determinant();
    if determinant == 0.0 || !determinant.is_finite() {
        return Err(LinalgError::SingularMatrix("generator determinant is zero"));
    }

    let generator_covering_radius = (norm_thickness * determinant.abs()).powf(1.0 / n as f64);
    *generator *= covering_radius / generator_covering_radius;

    Ok(())
}

/// Lattice increment vectors for a metric and maximum mismatch.
///
/// Column i of the returned n×n lower-triangular matrix is the i-th lattice
/// step in the metric's coordinates; the lattice it generates covers the
/// space with mismatch at most `max_mismatch`.
pub fn lattice_increments(
    generator: &dyn LatticeGenerator,
    metric: &DMatrix<f64>,
    max_mismatch: f64,
) -> Result<DMatrix<f64>> {
    let n = check_square(metric)?;
    check_mismatch(max_mismatch)?;
    if n == 0 {
        return Err(LinalgError::EmptyDimensions);
    }

    if metric.clone().cholesky().is_none() {
        return Err(LinalgError::NotPositiveDefinite);
    }

    let mut directions = DMatrix::<f64>::identity(n, n);
    orthonormalize_wrt_metric(&mut directions, metric)?;

    let gen_matrix = generator.generator(n)?;
    if gen_matrix.ncols() != n || gen_matrix.nrows() < n {
        return Err(LinalgError::GeneratorShape {
            rows: gen_matrix.nrows(),
            cols: gen_matrix.ncols(),
        });
    }

    let mut lower = square_lower_triangular(&gen_matrix)?;
    normalize_generator(
        &mut lower,
        generator.normalized_thickness(n),
        max_mismatch.sqrt(),
    )?;

    tracing::trace!(
        lattice = generator.name(),
        dimensions = n,
        max_mismatch,
        "computed lattice increments"
    );

    Ok(directions * lower)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::{AnstarLattice, CubicLattice};

    fn correlated_metric() -> DMatrix<f64> {
        DMatrix::from_row_slice(
            3,
            3,
            &[
                4.0, 1.0, 0.5, //
                1.0, 3.0, 0.2, //
                0.5, 0.2, 2.0,
            ],
        )
    }

    #[test]
    fn test_bounding_box_diagonal() {
        let g = DMatrix::from_diagonal(&DVector::from_vec(vec![4.0, 1.0]));
        let bbox = metric_ellipse_bounding_box(&g, 0.25).unwrap();
        assert!((bbox[0] - 0.25).abs() < 1e-12);
        assert!((bbox[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_bounding_box_correlated_exceeds_diagonal_estimate() {
        let g = correlated_metric();
        let bbox = metric_ellipse_bounding_box(&g, 1.0).unwrap();
        for i in 0..3 {
            // Correlations widen the ellipsoid's shadow on each axis
            assert!(bbox[i] >= 1.0 / g[(i, i)].sqrt() - 1e-12);
        }
    }

    #[test]
    fn test_bounding_box_rejects_non_square() {
        let g = DMatrix::<f64>::zeros(2, 3);
        assert_eq!(
            metric_ellipse_bounding_box(&g, 1.0),
            Err(LinalgError::NotSquare { rows: 2, cols: 3 })
        );
    }

    #[test]
    fn test_orthonormal_directions() {
        let g = correlated_metric();
        let mut d = DMatrix::<f64>::identity(3, 3);
        orthonormalize_wrt_metric(&mut d, &g).unwrap();

        let gram = d.transpose() * &g * &d;
        assert!((gram - DMatrix::<f64>::identity(3, 3)).norm() < 1e-12);

        // Reverse-order Gram-Schmidt of the identity is lower triangular
        for i in 0..3 {
            for j in (i + 1)..3 {
                assert_eq!(d[(i, j)], 0.0);
            }
        }
    }

    #[test]
    fn test_square_lower_triangular_anstar() {
        let g = AnstarLattice.generator(3).unwrap();
        let l = square_lower_triangular(&g).unwrap();
        assert_eq!(l.shape(), (3, 3));
        for i in 0..3 {
            assert!(l[(i, i)] > 0.0);
            for j in (i + 1)..3 {
                assert_eq!(l[(i, j)], 0.0);
            }
        }
        // Rotation preserves the Gram matrix up to the column reversal
        let gram_g = g.transpose() * &g;
        let gram_l = l.transpose() * &l;
        for i in 0..3 {
            for j in 0..3 {
                assert!((gram_l[(i, j)] - gram_g[(2 - i, 2 - j)]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_square_lower_triangular_rejects_wide() {
        let g = DMatrix::<f64>::zeros(2, 3);
        assert_eq!(
            square_lower_triangular(&g),
            Err(LinalgError::GeneratorShape { rows: 2, cols: 3 })
        );
    }

    #[test]
    fn test_normalized_covering_radius() {
        for n in 1..=5 {
            for lattice in [&CubicLattice as &dyn LatticeGenerator, &AnstarLattice] {
                let g = lattice.generator(n).unwrap();
                let mut l = square_lower_triangular(&g).unwrap();
                normalize_generator(&mut l, lattice.normalized_thickness(n), 0.3).unwrap();
                let det = l.clone().lu().determinant();
                let radius = (lattice.normalized_thickness(n) * det).powf(1.0 / n as f64);
                assert!((radius - 0.3).abs() < 1e-12, "{} n={}", lattice.name(), n);
            }
        }
    }

    #[test]
    fn test_cubic_increment_one_dimension() {
        let g = DMatrix::from_element(1, 1, 1.0);
        let incr = lattice_increments(&CubicLattice, &g, 0.01).unwrap();
        // Covering radius √μ = 0.1 is half the cubic spacing
        assert!((incr[(0, 0)] - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_cubic_increments_identity_metric() {
        let g = DMatrix::<f64>::identity(2, 2);
        let incr = lattice_increments(&CubicLattice, &g, 0.01).unwrap();
        let spacing = 2.0 * 0.1 / 2f64.sqrt();
        assert!((incr - DMatrix::<f64>::identity(2, 2) * spacing).norm() < 1e-12);
    }

    #[test]
    fn test_hexagonal_increment_length() {
        let g = DMatrix::<f64>::identity(2, 2);
        let mu = 0.04;
        let incr = lattice_increments(&AnstarLattice, &g, mu).unwrap();
        // Minimal vector of a hexagonal lattice is √3 times its covering radius
        let shortest = incr.column(0).norm();
        assert!((shortest - (3.0 * mu).sqrt()).abs() < 1e-12);
        assert_eq!(incr[(0, 1)], 0.0);
    }

    #[test]
    fn test_increments_lower_triangular_for_correlated_metric() {
        let g = correlated_metric();
        let incr = lattice_increments(&AnstarLattice, &g, 0.1).unwrap();
        for i in 0..3 {
            assert!(incr[(i, i)] > 0.0);
            for j in (i + 1)..3 {
                assert!(incr[(i, j)].abs() < 1e-15);
            }
        }
    }

    #[test]
    fn test_increments_reject_indefinite_metric() {
        let g = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]);
        assert_eq!(
            lattice_increments(&CubicLattice, &g, 0.1),
            Err(LinalgError::NotPositiveDefinite)
        );
    }

    #[test]
    fn test_increments_reject_bad_mismatch() {
        let g = DMatrix::<f64>::identity(2, 2);
        assert_eq!(
            lattice_increments(&CubicLattice, &g, 0.0),
            Err(LinalgError::InvalidMismatch(0.0))
        );
        assert!(lattice_increments(&CubicLattice, &g, f64::NAN).is_err());
    }
}
