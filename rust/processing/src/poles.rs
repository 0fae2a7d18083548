// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Poles: structural catalog, placement on roads and lane links, and the
//! load-scoped index used to find mounting candidates.

use std::f64::consts::{FRAC_PI_2, PI};

use roadnet_core::{round_to, ObjectRecord};
use roadnet_geometry::{look_at_by_angle, look_at_by_yaw};
use rustc_hash::FxHashMap;

use crate::keys::PoleKey;
use crate::model::{Anchor, DeviceBindings, MountedKind, Pole, PoleStructure};
use crate::repository::MapRepository;
use crate::{Error, Result};

/// Userdata codes with a meaning of their own.
pub mod codes {
    /// Id of the pole an object hangs on.
    pub const POLE_ID: &str = "pole_id";
    /// Junction controlled by a traffic light.
    pub const RELATE_CONTROL: &str = "relate_control";
    /// Roads controlled by a traffic light, `|`-separated.
    pub const RELATE_ROAD: &str = "relate_road";
}

/// Source of structural dimensions, keyed by pole model name.
pub trait PoleCatalog: Send + Sync {
    fn structure(&self, name: &str) -> Option<PoleStructure>;
}

/// Catalog backed by a hash map.
///
/// ```
/// use roadnet_processing::{InMemoryPoleCatalog, PoleCatalog, PoleStructure};
///
/// let catalog = InMemoryPoleCatalog::new()
///     .with("Vertical_Pole", PoleStructure::vertical(0.1, 6.0))
///     .with("Cross_Pole", PoleStructure::with_arm(0.15, 6.5, 0.1, 8.0));
/// assert!(catalog.structure("Cross_Pole").unwrap().arm.is_some());
/// assert!(catalog.structure("Unknown").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryPoleCatalog {
    entries: FxHashMap<String, PoleStructure>,
}

impl InMemoryPoleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, structure: PoleStructure) -> Self {
        self.insert(name, structure);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, structure: PoleStructure) {
        self.entries.insert(name.into(), structure);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PoleCatalog for InMemoryPoleCatalog {
    fn structure(&self, name: &str) -> Option<PoleStructure> {
        self.entries.get(name).copied()
    }
}

/// What an object record turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Pole,
    Mounted(MountedKind),
    /// Surface markings, parking spaces and other objects outside this engine.
    Other,
}

impl ObjectKind {
    pub fn classify(record: &ObjectRecord) -> Self {
        match record.object_type.as_str() {
            "pole" => ObjectKind::Pole,
            "trafficLight" | "signal" => ObjectKind::Mounted(MountedKind::TrafficLight),
            "signalBoard" | "sign" => ObjectKind::Mounted(MountedKind::SignalBoard),
            "sensor" => ObjectKind::Mounted(MountedKind::Sensor),
            _ => ObjectKind::Other,
        }
    }
}

/// Heading of an object in radians, with the legacy-map correction applied.
pub fn corrected_heading(record: &ObjectRecord, kind: ObjectKind, legacy: bool) -> f64 {
    if !legacy {
        return record.hdg;
    }
    match kind {
        ObjectKind::Pole => record.hdg + FRAC_PI_2,
        ObjectKind::Mounted(MountedKind::TrafficLight | MountedKind::SignalBoard) => record.hdg + PI,
        _ => record.hdg,
    }
}

/// Yaw in degrees as stored in the model.
pub fn yaw_degrees(heading: f64) -> f64 {
    round_to(heading.to_degrees(), 3)
}

/// Userdata other than the pole id, sorted into bindings.
pub fn device_bindings(record: &ObjectRecord) -> DeviceBindings {
    let mut bindings = DeviceBindings::default();
    for entry in &record.userdata {
        let Some(value) = entry.value_str() else {
            continue;
        };
        match entry.code.as_str() {
            codes::POLE_ID => {}
            codes::RELATE_CONTROL => bindings.control_junction = Some(value),
            codes::RELATE_ROAD => {
                bindings.control_roads = value
                    .split('|')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            _ => bindings.params.push((entry.code.clone(), value)),
        }
    }
    bindings
}

/// Explicit pole id from userdata, if any.
pub fn target_pole(record: &ObjectRecord) -> Option<String> {
    record
        .userdata(codes::POLE_ID)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && v != "-1")
}

/// Where an object record is placed, resolved against the repository.
pub fn anchor_of(record: &ObjectRecord, repository: &MapRepository) -> Result<Anchor> {
    if record.on_lane_link() {
        let (junction, link) = repository
            .lane_link_by_id(&record.lane_link_id)
            .ok_or_else(|| Error::UnknownLaneLink(record.lane_link_id.clone()))?;
        return Ok(Anchor::Junction {
            junction: junction.id.clone(),
            lane_link: link.id.clone(),
        });
    }
    if record.road_id.is_empty() || record.road_id == "-1" {
        return Err(Error::UnknownRoad(record.road_id.clone()));
    }
    if repository.road_by_id(&record.road_id).is_none() {
        return Err(Error::UnknownRoad(record.road_id.clone()));
    }
    Ok(Anchor::Road(record.road_id.clone()))
}

/// Place a pole record on its road or lane link.
pub fn place_pole(record: &ObjectRecord, structure: PoleStructure, repository: &MapRepository, legacy: bool) -> Result<Pole> {
    let yaw = yaw_degrees(corrected_heading(record, ObjectKind::Pole, legacy));
    let anchor = anchor_of(record, repository)?;
    let (s, t, position, look_at) = match &anchor {
        Anchor::Road(road_id) => {
            let road = repository
                .road_by_id(road_id)
                .ok_or_else(|| Error::UnknownRoad(road_id.clone()))?;
            let location = road.locate(record.s, record.t);
            let look_at = look_at_by_yaw(&location.target_point, &location.tangent, yaw, false);
            (location.s, location.t, location.target_point, look_at)
        }
        Anchor::Junction { lane_link, .. } => {
            let located = repository
                .lane_link_by_id(lane_link)
                .and_then(|(_, link)| link.locate(record.s, record.t, yaw))
                .ok_or_else(|| Error::UnknownLaneLink(lane_link.clone()))?;
            let target = located.location.target_point;
            (
                located.location.s,
                located.location.t,
                target,
                look_at_by_angle(&target, located.angle),
            )
        }
    };
    Ok(Pole {
        id: record.id.clone(),
        name: record.name.clone(),
        anchor,
        s,
        t,
        yaw,
        position,
        look_at,
        structure,
    })
}

/// Poles grouped by the road or junction they stand in, for one load pass.
#[derive(Debug, Default)]
pub struct PoleIndex {
    by_road: FxHashMap<String, Vec<PoleKey>>,
    by_junction: FxHashMap<String, Vec<PoleKey>>,
}

impl PoleIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, anchor: &Anchor, key: PoleKey) {
        let slot = match anchor {
            Anchor::Road(road) => self.by_road.entry(road.clone()).or_default(),
            Anchor::Junction { junction, .. } => self.by_junction.entry(junction.clone()).or_default(),
        };
        if !slot.contains(&key) {
            slot.push(key);
        }
    }

    /// Poles sharing the anchor's road, or its junction for lane links.
    pub fn candidates(&self, anchor: &Anchor) -> &[PoleKey] {
        let found = match anchor {
            Anchor::Road(road) => self.by_road.get(road),
            Anchor::Junction { junction, .. } => self.by_junction.get(junction),
        };
        found.map(Vec::as_slice).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.by_road.values().chain(self.by_junction.values()).map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
