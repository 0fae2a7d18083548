// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for loading and placement.

/// Result type alias for processing operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while assembling a road network or placing objects on it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No lane of the road brackets the requested lateral offset.
    #[error("no lane of road {road} contains s={s}, t={t}")]
    NoMatchingLane { road: String, s: f64, t: f64 },

    /// No pole accepted the object within tolerance.
    #[error("no pole matches object {object}")]
    NoMatchingPole { object: String },

    #[error("unknown road: {0}")]
    UnknownRoad(String),

    #[error("unknown junction: {0}")]
    UnknownJunction(String),

    #[error("road {road} has no lane {lane}")]
    UnknownLane { road: String, lane: String },

    #[error("unknown lane link: {0}")]
    UnknownLaneLink(String),

    #[error("unknown pole: {0}")]
    UnknownPole(String),

    /// A lane references a boundary id missing from its section.
    #[error("lane {lane} references unknown boundary {boundary}")]
    UnknownBoundary { lane: String, boundary: String },

    /// A pole name has no structural entry in the catalog.
    #[error("no pole structure for '{0}'")]
    UnknownPoleStructure(String),

    #[error("worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("geometry error: {0}")]
    Geometry(#[from] roadnet_geometry::Error),

    #[error("core error: {0}")]
    Core(#[from] roadnet_core::Error),
}
