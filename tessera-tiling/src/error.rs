// Copyright (c) 2025-2026 brdigetrlol. All rights reserved.
// SPDX-License-Identifier: LicenseRef-Icarus-Proprietary
// See LICENSE in the repository root for full license terms.

use tessera_math::LinalgError;
use thiserror::Error;

/// Errors reported by tiling configuration, enumeration and queries.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TilingError {
    /// A required argument is out of range or not finite
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation is not allowed in the tiling's current lifecycle state
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Metric or generator failed a numerical requirement
    #[error("numerical failure: {0}")]
    Numerical(#[from] LinalgError),

    /// A configuration document could not be parsed or applied
    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, TilingError>;

impl From<serde_json::Error> for TilingError {
    fn from(err: serde_json::Error) -> Self {
        TilingError::Config(err.to_string())
    }
}
