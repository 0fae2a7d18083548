// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity model of a loaded road network.
//!
//! Roads own their sections, sections own lanes and boundaries, junctions own
//! their lane links. Cross references between entities (a lane's boundaries,
//! a lane link's roads, an object's pole) are string ids as found in the map
//! file; the [`MapRepository`](crate::MapRepository) resolves them.

use nalgebra::{Point3, Vector3};
use roadnet_core::{normalize_degrees, BoundaryStyle, ControlPointRecord, ControlType, LaneType, LinkEnd};
use roadnet_geometry::frame::world_angle_deg;
use roadnet_geometry::{
    ArcGeometry, BoundaryLines, Curve3, ElevationProfile, JunctionSurface, LaneWidth, LocateOptions, Mesh,
    StLocation, StResolver,
};
use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};

/// Travel direction of a lane relative to its road's reference line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Negative lane ids, right of the reference line.
    Forward,
    /// Positive lane ids, left of the reference line.
    Reverse,
}

impl Direction {
    /// Direction encoded in the sign of a lane id. Unparsable ids count as
    /// reverse.
    pub fn of_lane(id: &str) -> Self {
        match id.trim().parse::<f64>() {
            Ok(v) if v < 0.0 => Direction::Forward,
            _ => Direction::Reverse,
        }
    }

    pub fn is_forward(self) -> bool {
        self == Direction::Forward
    }
}

#[derive(Debug, Clone)]
pub struct Boundary {
    pub id: String,
    pub mark: u32,
    pub style: BoundaryStyle,
    /// World-space samples along the boundary.
    pub samples: Vec<Point3<f64>>,
    /// Rasterized lines, filled by the geometry jobs.
    pub lines: BoundaryLines,
}

#[derive(Debug, Clone)]
pub struct Lane {
    pub id: String,
    pub lane_type: LaneType,
    pub left_boundary: String,
    pub right_boundary: String,
    pub speed_limit: f64,
    pub friction: f64,
    /// Start offset inside the section, clamped to the section length.
    pub s_offset: f64,
    /// World-space centre line samples.
    pub samples: Vec<Point3<f64>>,
    pub width: Option<LaneWidth>,
    /// Surface strip, filled by the geometry jobs.
    pub mesh: Option<Mesh>,
}

impl Lane {
    pub fn direction(&self) -> Direction {
        Direction::of_lane(&self.id)
    }

    pub fn normal_width(&self) -> f64 {
        self.width.map_or(0.0, |w| w.normal_width)
    }

    pub fn is_transition(&self) -> bool {
        self.width.is_some_and(|w| w.is_transition())
    }
}

#[derive(Debug, Clone)]
pub struct Section {
    pub id: String,
    pub start_percent: f64,
    pub end_percent: f64,
    /// `road.length * (end_percent - start_percent)`.
    pub length: f64,
    pub lanes: Vec<Lane>,
    pub boundaries: Vec<Boundary>,
}

impl Section {
    pub fn lane(&self, id: &str) -> Option<&Lane> {
        self.lanes.iter().find(|l| l.id == id)
    }

    pub fn lane_mut(&mut self, id: &str) -> Option<&mut Lane> {
        self.lanes.iter_mut().find(|l| l.id == id)
    }

    pub fn boundary(&self, id: &str) -> Option<&Boundary> {
        self.boundaries.iter().find(|b| b.id == id)
    }

    pub fn boundary_mut(&mut self, id: &str) -> Option<&mut Boundary> {
        self.boundaries.iter_mut().find(|b| b.id == id)
    }

    pub fn contains_percent(&self, percent: f64) -> bool {
        percent >= self.start_percent && percent <= self.end_percent
    }
}

#[derive(Debug, Clone)]
pub struct Road {
    pub id: String,
    pub road_type: i32,
    /// Length written in the map file. Kept for diagnostics only.
    pub declared_length: f64,
    /// Length of the reconstructed reference line, in millimetres precision.
    pub length: f64,
    pub curve: Curve3,
    pub elevation: Option<ElevationProfile>,
    pub arc: Option<ArcGeometry>,
    pub sections: Vec<Section>,
    /// Junctions touching this road, filled during junction assembly.
    pub link_junctions: Vec<String>,
}

impl Road {
    pub fn resolver(&self) -> StResolver<'_> {
        StResolver::new(&self.curve).with_elevation(self.elevation.as_ref())
    }

    /// World location of `(s, t)` on this road with default options.
    pub fn locate(&self, s: f64, t: f64) -> StLocation {
        self.resolver().locate(s, t, LocateOptions::default())
    }

    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }

    pub fn section_mut(&mut self, id: &str) -> Option<&mut Section> {
        self.sections.iter_mut().find(|s| s.id == id)
    }

    /// First section for the head, last one for the tail.
    pub fn end_section(&self, tail: bool) -> Option<&Section> {
        if tail {
            self.sections.last()
        } else {
            self.sections.first()
        }
    }

    /// Ground direction leaving the road at one of its ends.
    pub fn end_along(&self, tail: bool) -> Vector3<f64> {
        self.curve.end_along(tail)
    }

    /// Ground vector to the right of the reference line at one of its ends.
    pub fn end_vertical(&self, tail: bool) -> Vector3<f64> {
        if tail {
            self.curve.tail_vertical()
        } else {
            self.curve.head_vertical()
        }
    }

    pub fn lane_count(&self) -> usize {
        self.sections.iter().map(|s| s.lanes.len()).sum()
    }

    pub fn boundary_count(&self) -> usize {
        self.sections.iter().map(|s| s.boundaries.len()).sum()
    }
}

/// A road end connected to a junction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinkRoad {
    pub road_id: String,
    pub end: LinkEnd,
    pub direction: Direction,
}

impl LinkRoad {
    pub fn is_tail(&self) -> bool {
        self.end == LinkEnd::End
    }

    pub fn percent(&self) -> f64 {
        self.end.percent()
    }
}

/// One side of a lane link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaneEnd {
    pub road_id: String,
    pub section_id: String,
    pub lane_id: String,
    pub end: LinkEnd,
}

impl LaneEnd {
    pub fn direction(&self) -> Direction {
        Direction::of_lane(&self.lane_id)
    }

    pub fn is_tail(&self) -> bool {
        self.end == LinkEnd::End
    }

    fn link_road(&self) -> LinkRoad {
        LinkRoad {
            road_id: self.road_id.clone(),
            end: self.end,
            direction: self.direction(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LaneLink {
    pub id: String,
    pub junction_id: String,
    /// Road id the editor binds to this link, when the file carries one.
    pub road_id: Option<String>,
    pub from: LaneEnd,
    pub to: LaneEnd,
    pub declared_length: f64,
    /// World-space connectivity samples.
    pub samples: Vec<Point3<f64>>,
    pub curve: Option<Curve3>,
    pub enabled: bool,
    pub control_points: Vec<ControlPointRecord>,
    pub control_type: Option<ControlType>,
}

/// Location on a lane link together with the world heading of the object.
#[derive(Debug, Clone, Copy)]
pub struct LaneLinkLocation {
    pub location: StLocation,
    /// World heading in degrees, `(-180, 180]`.
    pub angle: f64,
}

impl LaneLink {
    /// The two road ends this link joins, from side first.
    pub fn link_roads(&self) -> SmallVec<[LinkRoad; 2]> {
        smallvec![self.from.link_road(), self.to.link_road()]
    }

    pub fn length(&self) -> f64 {
        self.curve.as_ref().map_or(0.0, Curve3::length)
    }

    /// Resolve `(s, t)` against the link curve; `yaw_deg` is relative to the
    /// link tangent.
    pub fn locate(&self, s: f64, t: f64, yaw_deg: f64) -> Option<LaneLinkLocation> {
        let curve = self.curve.as_ref()?;
        let location = StResolver::new(curve).locate(s, t, LocateOptions::default());
        let angle = normalize_degrees(world_angle_deg(&location.tangent) + yaw_deg);
        Some(LaneLinkLocation { location, angle })
    }
}

#[derive(Debug, Clone)]
pub struct Junction {
    pub id: String,
    pub lane_links: Vec<LaneLink>,
    /// Distinct road ends reached by the lane links, in first-seen order.
    pub link_roads: Vec<LinkRoad>,
    pub surface: Option<JunctionSurface>,
}

impl Junction {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            lane_links: Vec::new(),
            link_roads: Vec::new(),
            surface: None,
        }
    }

    pub fn lane_link(&self, id: &str) -> Option<&LaneLink> {
        self.lane_links.iter().find(|l| l.id == id)
    }

    /// Add a road end unless already present. Returns whether it was new.
    pub fn add_link_road(&mut self, link_road: LinkRoad) -> bool {
        if self.link_roads.contains(&link_road) {
            return false;
        }
        self.link_roads.push(link_road);
        true
    }

    pub fn is_renderable(&self) -> bool {
        !self.link_roads.is_empty()
    }
}

/// Horizontal arm of a combined pole.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmStructure {
    pub radius: f64,
    pub length: f64,
}

/// Structural dimensions of a pole model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoleStructure {
    pub shaft_radius: f64,
    pub height: f64,
    pub arm: Option<ArmStructure>,
}

impl PoleStructure {
    pub fn vertical(shaft_radius: f64, height: f64) -> Self {
        Self {
            shaft_radius,
            height,
            arm: None,
        }
    }

    pub fn with_arm(shaft_radius: f64, height: f64, arm_radius: f64, arm_length: f64) -> Self {
        Self {
            shaft_radius,
            height,
            arm: Some(ArmStructure {
                radius: arm_radius,
                length: arm_length,
            }),
        }
    }

    pub fn is_vertical(&self) -> bool {
        self.arm.is_none()
    }
}

/// What an object is placed relative to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Anchor {
    Road(String),
    Junction { junction: String, lane_link: String },
}

impl Anchor {
    pub fn road(&self) -> Option<&str> {
        match self {
            Anchor::Road(id) => Some(id),
            Anchor::Junction { .. } => None,
        }
    }

    pub fn junction(&self) -> Option<&str> {
        match self {
            Anchor::Road(_) => None,
            Anchor::Junction { junction, .. } => Some(junction),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Pole {
    pub id: String,
    pub name: String,
    pub anchor: Anchor,
    /// Station and offset after clamping.
    pub s: f64,
    pub t: f64,
    /// Yaw relative to the reference tangent, degrees.
    pub yaw: f64,
    pub position: Point3<f64>,
    pub look_at: Point3<f64>,
    pub structure: PoleStructure,
}

impl Pole {
    /// Ground direction the pole faces.
    pub fn facing(&self) -> Vector3<f64> {
        let d = self.look_at - self.position;
        Vector3::new(d.x, 0.0, d.z)
    }

    /// World heading of the pole in degrees.
    pub fn angle(&self) -> f64 {
        world_angle_deg(&self.facing())
    }
}

/// Device kinds that hang on poles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MountedKind {
    TrafficLight,
    SignalBoard,
    Sensor,
}

/// Where an object sits inside its pole's local frame.
#[derive(Debug, Clone, PartialEq)]
pub struct MountPlacement {
    pub pole_id: String,
    pub on_vertical_part: bool,
    pub local_position: Vector3<f64>,
    /// Degrees, `(-180, 180]`.
    pub local_angle: f64,
}

/// Non-geometric bindings recovered from object userdata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceBindings {
    pub control_junction: Option<String>,
    pub control_roads: Vec<String>,
    /// Remaining userdata, in file order.
    pub params: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct MountedObject {
    pub id: String,
    pub name: String,
    pub kind: MountedKind,
    pub anchor: Anchor,
    pub s: f64,
    pub t: f64,
    pub z_offset: f64,
    pub yaw: f64,
    /// `None` when no pole accepted the object.
    pub placement: Option<MountPlacement>,
    pub bindings: DeviceBindings,
}

impl MountedObject {
    pub fn is_attached(&self) -> bool {
        self.placement.is_some()
    }

    pub fn pole_id(&self) -> Option<&str> {
        self.placement.as_ref().map(|p| p.pole_id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_from_lane_sign() {
        assert_eq!(Direction::of_lane("-1"), Direction::Forward);
        assert_eq!(Direction::of_lane("2"), Direction::Reverse);
        assert_eq!(Direction::of_lane(" -3 "), Direction::Forward);
        assert_eq!(Direction::of_lane("x"), Direction::Reverse);
    }

    #[test]
    fn junction_dedups_link_roads() {
        let mut junction = Junction::new("j1");
        let end = LinkRoad {
            road_id: "1".into(),
            end: LinkEnd::End,
            direction: Direction::Forward,
        };
        assert!(junction.add_link_road(end.clone()));
        assert!(!junction.add_link_road(end.clone()));
        assert!(junction.add_link_road(LinkRoad {
            direction: Direction::Reverse,
            ..end
        }));
        assert_eq!(junction.link_roads.len(), 2);
        assert!(junction.is_renderable());
    }

    #[test]
    fn lane_link_roads_follow_lane_signs() {
        let link = LaneLink {
            id: "l".into(),
            junction_id: "j".into(),
            road_id: None,
            from: LaneEnd {
                road_id: "1".into(),
                section_id: "0".into(),
                lane_id: "-1".into(),
                end: LinkEnd::End,
            },
            to: LaneEnd {
                road_id: "2".into(),
                section_id: "0".into(),
                lane_id: "1".into(),
                end: LinkEnd::End,
            },
            declared_length: 0.0,
            samples: Vec::new(),
            curve: None,
            enabled: true,
            control_points: Vec::new(),
            control_type: None,
        };
        let roads = link.link_roads();
        assert_eq!(roads[0].direction, Direction::Forward);
        assert!(roads[1].is_tail());
        assert_eq!(roads[1].direction, Direction::Reverse);
        assert!(link.locate(1.0, 0.0, 0.0).is_none());
    }
}
