// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Map interchange records.
//!
//! These mirror the JSON produced by the import layer. Field names follow the
//! file format; numbers that the format sometimes stores as strings (object
//! placement, headings, ids) are read leniently.
//!
//! Map coordinates put the ground plane on x/y with z as height. The engine
//! works in a y-up frame, see [`MapPoint::to_world`].
//!
//! Roads, lane links and objects are read one by one. A record that does not
//! parse or fails its structural checks is set aside as a [`RejectedRecord`]
//! and the rest of the map is kept.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Header version written by the legacy editor.
pub const LEGACY_MAP_VERSION: &str = "tadsim v1.0";

#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient {
    Num(f64),
    Str(String),
    Null,
}

/// Accept `1.5`, `"1.5"`, `""` and `null` for a float field.
pub fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Lenient::deserialize(deserializer)? {
        Lenient::Num(n) => Ok(n),
        Lenient::Str(s) if s.trim().is_empty() => Ok(0.0),
        Lenient::Str(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("not a number: {s}"))),
        Lenient::Null => Ok(0.0),
    }
}

/// Accept numeric or string ids.
pub fn lenient_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Lenient::deserialize(deserializer)? {
        Lenient::Num(n) if n.fract() == 0.0 => format!("{}", n as i64),
        Lenient::Num(n) => n.to_string(),
        Lenient::Str(s) => s,
        Lenient::Null => String::new(),
    })
}

/// A point in map coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MapPoint {
    #[serde(deserialize_with = "lenient_f64")]
    pub x: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub y: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub z: f64,
}

impl MapPoint {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Components in the engine's y-up frame: ground x/z, height y.
    #[inline]
    pub fn to_world(&self) -> [f64; 3] {
        [self.y, self.z, self.x]
    }
}

/// Curve control point with a heading in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ControlPointRecord {
    #[serde(deserialize_with = "lenient_f64")]
    pub x: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub y: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub z: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub hdg: f64,
}

impl ControlPointRecord {
    pub fn point(&self) -> MapPoint {
        MapPoint::new(self.x, self.y, self.z)
    }
}

/// How control points are interpolated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlType {
    #[default]
    Catmullrom,
    Arc,
    Bezier,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ElevationRecord {
    #[serde(deserialize_with = "lenient_f64")]
    pub s: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub h: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundaryRecord {
    #[serde(deserialize_with = "lenient_id")]
    pub id: String,
    #[serde(default)]
    pub mark: u32,
    #[serde(default)]
    pub sample_points: Vec<MapPoint>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaneRecord {
    #[serde(deserialize_with = "lenient_id")]
    pub id: String,
    #[serde(rename = "type", default)]
    pub lane_type: i32,
    #[serde(rename = "lbid", default, deserialize_with = "lenient_id")]
    pub left_boundary_id: String,
    #[serde(rename = "rbid", default, deserialize_with = "lenient_id")]
    pub right_boundary_id: String,
    #[serde(rename = "speedlimit", default, deserialize_with = "lenient_f64")]
    pub speed_limit: f64,
    #[serde(default)]
    pub sample_points: Vec<MapPoint>,
    #[serde(default)]
    pub friction: Option<f64>,
    #[serde(default)]
    pub s_offset: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionRecord {
    #[serde(deserialize_with = "lenient_id")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub start_percent: f64,
    #[serde(default = "one", deserialize_with = "lenient_f64")]
    pub end_percent: f64,
    #[serde(default)]
    pub lanes: Vec<LaneRecord>,
    #[serde(rename = "boundarys", alias = "boundaries", default)]
    pub boundaries: Vec<BoundaryRecord>,
}

fn one() -> f64 {
    1.0
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadRecord {
    #[serde(deserialize_with = "lenient_id")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub length: f64,
    #[serde(rename = "type", default)]
    pub road_type: i32,
    #[serde(default)]
    pub sample_points: Vec<MapPoint>,
    #[serde(default)]
    pub sections: Vec<SectionRecord>,
    #[serde(default)]
    pub control_points: Vec<ControlPointRecord>,
    #[serde(default)]
    pub control_type: Option<ControlType>,
    #[serde(default)]
    pub elevation: Vec<ElevationRecord>,
}

/// Which end of a road a lane link touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkEnd {
    #[default]
    Start,
    End,
}

impl LinkEnd {
    /// Percent along the road: 0 for the start, 1 for the end.
    #[inline]
    pub fn percent(self) -> f64 {
        match self {
            LinkEnd::Start => 0.0,
            LinkEnd::End => 1.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaneLinkRecord {
    #[serde(deserialize_with = "lenient_id")]
    pub id: String,
    #[serde(rename = "junctionid", deserialize_with = "lenient_id")]
    pub junction_id: String,
    #[serde(rename = "fid", deserialize_with = "lenient_id")]
    pub from_lane: String,
    #[serde(rename = "frid", deserialize_with = "lenient_id")]
    pub from_road: String,
    #[serde(rename = "fsid", default, deserialize_with = "lenient_id")]
    pub from_section: String,
    #[serde(rename = "ftype", default)]
    pub from_end: LinkEnd,
    #[serde(rename = "tid", deserialize_with = "lenient_id")]
    pub to_lane: String,
    #[serde(rename = "trid", deserialize_with = "lenient_id")]
    pub to_road: String,
    #[serde(rename = "tsid", default, deserialize_with = "lenient_id")]
    pub to_section: String,
    #[serde(rename = "ttype", default)]
    pub to_end: LinkEnd,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub length: f64,
    #[serde(rename = "roadid", default, deserialize_with = "lenient_id")]
    pub road_id: String,
    #[serde(default)]
    pub sample_points: Vec<MapPoint>,
    #[serde(default)]
    pub control_points: Vec<ControlPointRecord>,
    #[serde(default)]
    pub control_type: Option<ControlType>,
}

/// Free-form key/value attached to an object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserDataRecord {
    pub code: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl UserDataRecord {
    /// Value rendered as text; strings are returned without quotes.
    pub fn value_str(&self) -> Option<String> {
        match &self.value {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRecord {
    #[serde(deserialize_with = "lenient_id")]
    pub id: String,
    #[serde(rename = "type", default)]
    pub object_type: String,
    #[serde(default)]
    pub subtype: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "roadid", default, deserialize_with = "lenient_id")]
    pub road_id: String,
    #[serde(rename = "lanelinkid", default, deserialize_with = "lenient_id")]
    pub lane_link_id: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub s: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub t: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub z_offset: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub hdg: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub height: f64,
    #[serde(default)]
    pub userdata: Vec<UserDataRecord>,
}

impl ObjectRecord {
    /// First userdata value stored under `code`.
    pub fn userdata(&self, code: &str) -> Option<String> {
        self.userdata
            .iter()
            .find(|u| u.code == code)
            .and_then(UserDataRecord::value_str)
    }

    /// Whether the object sits on a lane link rather than a road.
    pub fn on_lane_link(&self) -> bool {
        !self.lane_link_id.is_empty() && self.lane_link_id != "-1"
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MapHeader {
    #[serde(default)]
    pub version: String,
}

/// Fields read with [`lenient_f64`]; a string in one of them that is not a
/// number is reported as [`Error::InvalidNumber`].
const NUMERIC_FIELDS: &[&str] = &[
    "x",
    "y",
    "z",
    "hdg",
    "h",
    "s",
    "t",
    "zOffset",
    "height",
    "length",
    "startPercent",
    "endPercent",
    "speedlimit",
];

/// Top-level record families of a map file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Road,
    LaneLink,
    Object,
}

/// A record left out of [`MapRecords`] and why.
#[derive(Debug)]
pub struct RejectedRecord {
    pub kind: RecordKind,
    /// Id as written in the file; empty when it has none.
    pub id: String,
    pub error: Error,
}

#[derive(Deserialize)]
struct RawMap {
    #[serde(default)]
    header: Option<MapHeader>,
    #[serde(default)]
    roads: Vec<Value>,
    #[serde(default)]
    lanelinks: Vec<Value>,
    #[serde(default)]
    objects: Vec<Value>,
}

/// Everything the import layer hands to the engine for one map.
#[derive(Debug, Default, Serialize)]
pub struct MapRecords {
    pub header: Option<MapHeader>,
    pub roads: Vec<RoadRecord>,
    pub lanelinks: Vec<LaneLinkRecord>,
    pub objects: Vec<ObjectRecord>,
    /// Records that were dropped while reading.
    #[serde(skip)]
    pub rejected: Vec<RejectedRecord>,
}

impl MapRecords {
    /// Read a map file. Only a malformed document fails; bad records end up
    /// in [`MapRecords::rejected`].
    pub fn from_json(content: &str) -> Result<Self> {
        let raw: RawMap = serde_json::from_str(content)?;
        Ok(Self::from_raw(raw))
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let raw: RawMap = serde_json::from_value(value)?;
        Ok(Self::from_raw(raw))
    }

    fn from_raw(raw: RawMap) -> Self {
        let mut rejected = Vec::new();
        let roads = parse_each(RecordKind::Road, raw.roads, road_issue, &mut rejected);
        let lanelinks = parse_each(RecordKind::LaneLink, raw.lanelinks, lane_link_issue, &mut rejected);
        let objects = parse_each(RecordKind::Object, raw.objects, |_| None, &mut rejected);
        Self {
            header: raw.header,
            roads,
            lanelinks,
            objects,
            rejected,
        }
    }

    /// Maps written by the legacy editor store headings rotated by 90°.
    pub fn is_legacy(&self) -> bool {
        self.header
            .as_ref()
            .is_some_and(|h| h.version == LEGACY_MAP_VERSION)
    }

    /// Hand the rejected records over, leaving none behind.
    pub fn take_rejected(&mut self) -> Vec<RejectedRecord> {
        std::mem::take(&mut self.rejected)
    }

    /// Junction ids referenced by lane links, in first-seen order.
    pub fn junction_ids(&self) -> Vec<String> {
        let mut seen = rustc_hash::FxHashSet::default();
        self.lanelinks
            .iter()
            .filter(|l| seen.insert(l.junction_id.as_str()))
            .map(|l| l.junction_id.clone())
            .collect()
    }
}

fn parse_each<T, F>(kind: RecordKind, values: Vec<Value>, check: F, rejected: &mut Vec<RejectedRecord>) -> Vec<T>
where
    T: DeserializeOwned,
    F: Fn(&T) -> Option<Error>,
{
    let mut records = Vec::with_capacity(values.len());
    for value in values {
        let error = match T::deserialize(&value) {
            Ok(record) => match check(&record) {
                None => {
                    records.push(record);
                    continue;
                }
                Some(error) => error,
            },
            Err(e) => record_error(&value, e),
        };
        rejected.push(RejectedRecord {
            kind,
            id: raw_id(&value),
            error,
        });
    }
    records
}

fn raw_id(value: &Value) -> String {
    match value.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Name the offending field when the failure is a non-numeric string in a
/// numeric field.
fn record_error(value: &Value, error: serde_json::Error) -> Error {
    match find_bad_number(value) {
        Some((field, value)) => Error::InvalidNumber { field, value },
        None => Error::invalid_record(error.to_string()),
    }
}

fn find_bad_number(value: &Value) -> Option<(&'static str, String)> {
    match value {
        Value::Object(map) => map.iter().find_map(|(key, v)| match v {
            Value::String(raw) => {
                let field = NUMERIC_FIELDS.iter().copied().find(|f| *f == key.as_str())?;
                let trimmed = raw.trim();
                (!trimmed.is_empty() && trimmed.parse::<f64>().is_err()).then(|| (field, raw.clone()))
            }
            other => find_bad_number(other),
        }),
        Value::Array(items) => items.iter().find_map(find_bad_number),
        _ => None,
    }
}

fn road_issue(road: &RoadRecord) -> Option<Error> {
    if road.id.is_empty() {
        return Some(Error::invalid_record("road without id"));
    }
    road.sections
        .iter()
        .find(|section| !(section.start_percent <= section.end_percent))
        .map(|section| {
            Error::invalid_record(format!(
                "road {} section {} has inverted range [{}, {}]",
                road.id, section.id, section.start_percent, section.end_percent
            ))
        })
}

fn lane_link_issue(link: &LaneLinkRecord) -> Option<Error> {
    link.junction_id
        .is_empty()
        .then(|| Error::invalid_record(format!("lane link {} without junction id", link.id)))
}
