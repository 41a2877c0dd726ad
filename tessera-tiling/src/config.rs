//! Declarative tiling configuration
//!
//! Describes a complete tiling (bounds, lattice family, metric and
//! mismatch) as plain data, so tilings can be loaded from JSON files and
//! shared between runs.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tessera_math::LatticeKind;

use crate::error::{Result, TilingError};
use crate::tiling::Tiling;

/// Bound on one dimension, or on a pair for elliptical regions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BoundConfig {
    /// Fixed interval; singular when `lower == upper`
    Constant {
        dimension: usize,
        lower: f64,
        upper: f64,
    },
    /// Ellipse over `x_dimension` and `x_dimension + 1`
    Elliptical {
        x_dimension: usize,
        x_centre: f64,
        y_centre: f64,
        x_semi: f64,
        y_semi: f64,
    },
}

/// Parameter-space metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetricConfig {
    Identity,
    /// Diagonal entries, one per dimension
    Diagonal(Vec<f64>),
    /// Full matrix, row by row
    Full(Vec<Vec<f64>>),
}

impl MetricConfig {
    /// Dense `dimensions × dimensions` matrix for this metric.
    pub fn to_matrix(&self, dimensions: usize) -> Result<DMatrix<f64>> {
        match self {
            MetricConfig::Identity => Ok(DMatrix::identity(dimensions, dimensions)),
            MetricConfig::Diagonal(diag) => {
                if diag.len() != dimensions {
                    return Err(TilingError::Config(format!(
                        "diagonal metric has {} entries, expected {}",
                        diag.len(),
                        dimensions
                    )));
                }
                Ok(DMatrix::from_diagonal(&DVector::from_column_slice(diag)))
            }
            MetricConfig::Full(rows) => {
                if rows.len() != dimensions || rows.iter().any(|r| r.len() != dimensions) {
                    return Err(TilingError::Config(format!(
                        "metric must be {}x{}",
                        dimensions, dimensions
                    )));
                }
                Ok(DMatrix::from_fn(dimensions, dimensions, |i, j| rows[i][j]))
            }
        }
    }
}

/// Complete description of a tiling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TilingConfig {
    pub dimensions: usize,
    /// Applied in order; later entries override earlier ones on the same dimension
    pub bounds: Vec<BoundConfig>,
    #[serde(default)]
    pub lattice: LatticeKind,
    pub metric: MetricConfig,
    /// Maximum squared metric distance from any point to its nearest template
    pub max_mismatch: f64,
}

impl TilingConfig {
    /// Unit interval with a flat metric and cubic lattice.
    pub fn unit_interval() -> Self {
        Self {
            dimensions: 1,
            bounds: vec![BoundConfig::Constant {
                dimension: 0,
                lower: 0.0,
                upper: 1.0,
            }],
            lattice: LatticeKind::Cubic,
            metric: MetricConfig::Identity,
            max_mismatch: 0.01,
        }
    }

    /// Unit disk covered by the A_2* (hexagonal) lattice.
    pub fn unit_disk() -> Self {
        Self {
            dimensions: 2,
            bounds: vec![BoundConfig::Elliptical {
                x_dimension: 0,
                x_centre: 0.0,
                y_centre: 0.0,
                x_semi: 1.0,
                y_semi: 1.0,
            }],
            lattice: LatticeKind::Anstar,
            metric: MetricConfig::Identity,
            max_mismatch: 0.01,
        }
    }

    /// Three-dimensional box with a correlated metric.
    pub fn box_3d() -> Self {
        Self {
            dimensions: 3,
            bounds: (0..3)
                .map(|dimension| BoundConfig::Constant {
                    dimension,
                    lower: 0.0,
                    upper: 1.0,
                })
                .collect(),
            lattice: LatticeKind::Anstar,
            metric: MetricConfig::Full(vec![
                vec![1.0, 0.2, 0.1],
                vec![0.2, 2.0, 0.3],
                vec![0.1, 0.3, 1.5],
            ]),
            max_mismatch: 0.05,
        }
    }

    /// Named presets, in the order the bench runs them.
    pub fn presets() -> Vec<(&'static str, Self)> {
        vec![
            ("unit_interval", Self::unit_interval()),
            ("unit_disk", Self::unit_disk()),
            ("box_3d", Self::box_3d()),
        ]
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Build and initialise the tiling described by this configuration.
    pub fn build(&self) -> Result<Tiling> {
        let mut tiling = Tiling::new(self.dimensions)?;
        for bound in &self.bounds {
            match *bound {
                BoundConfig::Constant {
                    dimension,
                    lower,
                    upper,
                } => tiling.set_constant_bound(dimension, lower, upper)?,
                BoundConfig::Elliptical {
                    x_dimension,
                    x_centre,
                    y_centre,
                    x_semi,
                    y_semi,
                } => tiling.set_elliptical_bounds(x_dimension, x_centre, y_centre, x_semi, y_semi)?,
            }
        }
        tiling.set_lattice(self.lattice)?;

        let metric = self.metric.to_matrix(self.dimensions)?;
        tiling.set_metric(&metric, self.max_mismatch)?;
        Ok(tiling)
    }
}
