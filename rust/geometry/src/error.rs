// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during geometry reconstruction
#[derive(Error, Debug)]
pub enum Error {
    #[error("Degenerate curve: {distinct} distinct point(s), need at least 2")]
    DegenerateCurve { distinct: usize },

    #[error("Unresolvable arc: control points coincide")]
    UnresolvableArc,

    #[error("Insufficient samples: need {needed}, found {found}")]
    InsufficientSamples { needed: usize, found: usize },

    #[error("Triangulation failed: {0}")]
    TriangulationError(String),

    #[error("Core error: {0}")]
    CoreError(#[from] roadnet_core::Error),
}
