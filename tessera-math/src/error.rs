// Copyright (c) 2025-2026 brdigetrlol. All rights reserved.
// SPDX-License-Identifier: LicenseRef-Icarus-Proprietary
// See LICENSE in the repository root for full license terms.

//! Numerical failures raised by lattice and metric computations.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LinalgError {
    #[error("matrix is not square: {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },

    #[error("metric is not symmetric at ({row}, {col})")]
    NotSymmetric { row: usize, col: usize },

    #[error("metric is not positive definite")]
    NotPositiveDefinite,

    #[error("matrix is singular: {0}")]
    SingularMatrix(&'static str),

    #[error("maximum mismatch must be positive and finite, got {0}")]
    InvalidMismatch(f64),

    #[error("lattice generator requires at least one dimension")]
    EmptyDimensions,

    #[error("generator has shape {rows}x{cols}, expected rows >= cols")]
    GeneratorShape { rows: usize, cols: usize },
}

pub type Result<T> = std::result::Result<T, LinalgError>;
