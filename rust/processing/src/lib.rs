// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # RoadNet-Lite Processing
//!
//! Loads a road network from import records into a [`MapRepository`]:
//! reference lines, lanes and boundary markings, junctions with their lane
//! links and surface, poles, and the devices mounted on them.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use roadnet_core::EngineConfig;
//! use roadnet_processing::{InMemoryPoleCatalog, MapLoader, PoleStructure};
//!
//! let catalog = InMemoryPoleCatalog::new().with("Vertical_Pole", PoleStructure::vertical(0.1, 6.0));
//! let loader = MapLoader::new(EngineConfig::from_env())?;
//! let report = loader.load_json(&content, &catalog)?;
//! for warning in &report.warnings {
//!     eprintln!("{warning}");
//! }
//! for (_, object) in report.repository.objects() {
//!     if let Some(placement) = &object.placement {
//!         println!("{} on {} at {:?}", object.id, placement.pole_id, placement.local_position);
//!     }
//! }
//! ```
//!
//! Geometry jobs run on a rayon pool sized by `EngineConfig::worker_threads`;
//! junction assembly and pole matching run after every job has finished.

pub mod error;
pub mod jobs;
pub mod junction;
pub mod keys;
pub mod lane_match;
pub mod model;
pub mod mount;
pub mod pipeline;
pub mod poles;
pub mod repository;

#[cfg(test)]
mod test_support;

pub use error::{Error, Result};
pub use jobs::{GeometryJob, GeometryOutput, JobEntity, JobKey, WorkerPool};
pub use junction::JunctionAssembler;
pub use keys::{EntityKind, JunctionKey, ObjectKey, PoleKey, RoadKey};
pub use lane_match::{lane_at_st, LaneMatch};
pub use model::{
    Anchor, ArmStructure, Boundary, DeviceBindings, Direction, Junction, Lane, LaneEnd, LaneLink, LinkRoad,
    MountPlacement, MountedKind, MountedObject, Pole, PoleStructure, Road, Section,
};
pub use mount::{ArmSide, MountPart, MountPointResolver, MountRequest};
pub use pipeline::{LoadReport, LoadStats, LoadTimings, LoadWarning, MapLoader};
pub use poles::{InMemoryPoleCatalog, ObjectKind, PoleCatalog, PoleIndex};
pub use repository::MapRepository;
