// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Which lane of a road contains an ST position.

use roadnet_geometry::t_value;

use crate::model::{Direction, Lane, Road, Section};
use crate::{Error, Result};

/// Lane found by [`lane_at_st`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaneMatch {
    pub section_id: String,
    pub lane_id: String,
}

/// Find the lane of `road` that brackets the lateral offset `t` at station `s`.
///
/// Lanes are searched on the side given by the sign of `t`: negative offsets
/// look at forward lanes, others at reverse lanes. A lane matches when `|t|`
/// falls between the offsets of its two boundaries at either end of its
/// section.
pub fn lane_at_st(road: &Road, s: f64, t: f64) -> Result<LaneMatch> {
    let no_match = || Error::NoMatchingLane {
        road: road.id.clone(),
        s,
        t,
    };

    let ratio = if road.length > 0.0 {
        (s / road.length).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let section = road
        .sections
        .iter()
        .find(|sec| sec.contains_percent(ratio))
        .or_else(|| road.sections.last())
        .ok_or_else(no_match)?;

    let side = if t < 0.0 {
        Direction::Forward
    } else {
        Direction::Reverse
    };
    let offset = t.abs();

    section
        .lanes
        .iter()
        .filter(|lane| lane.direction() == side)
        .find(|lane| {
            [false, true].into_iter().any(|tail| {
                boundary_range(road, section, lane, tail).is_some_and(|(inner, outer)| inner <= offset && offset <= outer)
            })
        })
        .map(|lane| LaneMatch {
            section_id: section.id.clone(),
            lane_id: lane.id.clone(),
        })
        .ok_or_else(no_match)
}

/// Unsigned offsets of a lane's two boundaries at one end of its section,
/// smaller first.
fn boundary_range(road: &Road, section: &Section, lane: &Lane, tail: bool) -> Option<(f64, f64)> {
    let percent = if tail {
        section.end_percent
    } else {
        section.start_percent
    };
    let ref_point = road.curve.point_at(percent);
    let tangent = road.curve.tangent_at(percent);

    let offset_of = |boundary_id: &str| {
        let samples = &section.boundary(boundary_id)?.samples;
        let end = if tail { samples.last() } else { samples.first() }?;
        Some(t_value(&ref_point, &tangent, end).abs())
    };
    let a = offset_of(&lane.left_boundary)?;
    let b = offset_of(&lane.right_boundary)?;
    Some((a.min(b), a.max(b)))
}
