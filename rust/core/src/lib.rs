// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # RoadNet-Lite Core
//!
//! Shared building blocks for road network reconstruction:
//!
//! - **Records**: serde mirrors of the map interchange format (roads, sections,
//!   lanes, boundaries, lane links, objects)
//! - **Angles**: degree/radian normalization into `(-180°, 180°]`
//! - **Boundary styles**: decoding of the hexadecimal boundary mark mask
//! - **Lane types**: lane type codes and their default friction
//! - **Configuration**: [`EngineConfig`] with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use roadnet_core::{MapRecords, BoundaryStyle};
//!
//! let records = MapRecords::from_json(content)?;
//! for road in &records.roads {
//!     for boundary in road.sections.iter().flat_map(|s| &s.boundaries) {
//!         let style = BoundaryStyle::from_mask(boundary.mark);
//!         println!("{} -> {} lines", boundary.id, style.line_count());
//!     }
//! }
//! ```
//!
//! Geometry lives in `roadnet-geometry`; nothing in this crate depends on a
//! math library.

pub mod angle;
pub mod config;
pub mod error;
pub mod lane_type;
pub mod records;
pub mod style;

pub use angle::{degree_delta, normalize_degrees, normalize_radians, round_to};
pub use config::{CurveKind, EngineConfig};
pub use error::{Error, Result};
pub use lane_type::LaneType;
pub use records::{
    BoundaryRecord, ControlPointRecord, ControlType, ElevationRecord, LaneLinkRecord, LaneRecord,
    LinkEnd, MapHeader, MapPoint, MapRecords, ObjectRecord, RecordKind, RejectedRecord, RoadRecord,
    SectionRecord, UserDataRecord,
};
pub use style::{BoundaryStyle, LinePattern, MarkColor};
