// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! RoadNet-Lite Geometry
//!
//! Reference-line reconstruction (splines, arcs, elevation), station/offset
//! coordinates, and mesh generation for lanes, boundary markings and
//! junction surfaces. Triangulation uses earcutr and all vector math goes
//! through nalgebra.
//!
//! The world frame is y-up; see [`frame`] for the axis and angle
//! conventions shared by every module.

pub mod arc;
pub mod boundary;
pub mod curve;
pub mod elevation;
pub mod error;
pub mod frame;
pub mod junction;
pub mod lane;
pub mod mesh;
pub mod offset;
pub mod reconstruct;
pub mod spline;
pub mod st;
pub mod triangulation;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point2, Point3, Vector2, Vector3};

pub use arc::{solve_arc, ArcControlPoint, ArcGeometry};
pub use boundary::{BoundaryLine, BoundaryLines, BoundaryRasterizer, LineSlot};
pub use curve::{segments_for_length, Curve3, CurvePoint, Interpolation, Projection};
pub use elevation::ElevationProfile;
pub use error::{Error, Result};
pub use junction::{build_junction_surface, lane_link_curve, JunctionSurface, RefRoadEnd};
pub use lane::{build_lane_mesh, classify_width, LaneWidth, WidthTrend};
pub use mesh::Mesh;
pub use offset::{parallel_samples, Side};
pub use reconstruct::{CurveInput, CurveReconstructor, ReconstructedCurve};
pub use st::{
    locate_on_lane_link, look_at_by_angle, look_at_by_yaw, t_value, yaw_in_junction, LocateOptions, StCoordinate, StLocation,
    StResolver,
};
pub use triangulation::{triangulate_ground, triangulate_polygon};
