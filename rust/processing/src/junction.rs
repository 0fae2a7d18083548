// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Junction assembly: lane link curves, the road ends a junction connects,
//! and the drivable surface between them.

use nalgebra::Point3;
use roadnet_core::{EngineConfig, LaneLinkRecord};
use roadnet_geometry::frame::world_point;
use roadnet_geometry::{
    build_junction_surface, lane_link_curve, Curve3, CurveInput, CurveReconstructor, JunctionSurface,
    RefRoadEnd,
};

use crate::model::{Junction, LaneEnd, LaneLink, LinkRoad, Road};
use crate::repository::MapRepository;
use crate::{Error, Result};

/// Builds junctions from lane link records against already loaded roads.
#[derive(Debug, Clone, Copy)]
pub struct JunctionAssembler<'c> {
    config: &'c EngineConfig,
}

impl<'c> JunctionAssembler<'c> {
    pub fn new(config: &'c EngineConfig) -> Self {
        Self { config }
    }

    /// Assemble junction `id` from its lane link records.
    ///
    /// Links whose curve cannot be built are left out and returned with the
    /// reason; the junction keeps every other link. Link roads are collected
    /// from the surviving links, without duplicates.
    pub fn assemble<'r>(
        &self,
        id: &str,
        records: impl IntoIterator<Item = &'r LaneLinkRecord>,
        repository: &MapRepository,
    ) -> (Junction, Vec<(String, Error)>) {
        let mut junction = Junction::new(id);
        let mut rejected = Vec::new();
        for record in records {
            match self.lane_link(record, repository) {
                Ok(link) => {
                    for link_road in link.link_roads() {
                        junction.add_link_road(link_road);
                    }
                    junction.lane_links.push(link);
                }
                Err(e) => rejected.push((record.id.clone(), e)),
            }
        }
        (junction, rejected)
    }

    /// Build one lane link, choosing its curve source in order: control
    /// points, connectivity samples, then a Bézier generated between the two
    /// lane ends.
    pub fn lane_link(&self, record: &LaneLinkRecord, repository: &MapRepository) -> Result<LaneLink> {
        let from = LaneEnd {
            road_id: record.from_road.clone(),
            section_id: record.from_section.clone(),
            lane_id: record.from_lane.clone(),
            end: record.from_end,
        };
        let to = LaneEnd {
            road_id: record.to_road.clone(),
            section_id: record.to_section.clone(),
            lane_id: record.to_lane.clone(),
            end: record.to_end,
        };

        let reconstructor = CurveReconstructor::new(self.config);
        let (curve, samples) = if record.control_points.len() >= 2 {
            let curve = reconstructor
                .reconstruct(CurveInput::ControlPoints {
                    points: &record.control_points,
                    control_type: record.control_type.unwrap_or_default(),
                })?
                .curve;
            (curve, record.sample_points.iter().map(world_point).collect())
        } else if record.sample_points.len() >= 2 {
            let curve = reconstructor.reconstruct(CurveInput::Samples(&record.sample_points))?.curve;
            (curve, record.sample_points.iter().map(world_point).collect())
        } else {
            let curve = self.generated_curve(&from, &to, repository)?;
            let samples = curve.spaced_points(self.config.lane_link_segments);
            (curve, samples)
        };

        Ok(LaneLink {
            id: record.id.clone(),
            junction_id: record.junction_id.clone(),
            road_id: Some(record.road_id.clone()).filter(|r| !r.is_empty() && r != "-1"),
            from,
            to,
            declared_length: record.length,
            samples,
            curve: Some(curve),
            enabled: true,
            control_points: record.control_points.clone(),
            control_type: record.control_type,
        })
    }

    /// Bézier from the end of the incoming lane to the start of the outgoing
    /// one, leaving and entering along the road directions.
    fn generated_curve(&self, from: &LaneEnd, to: &LaneEnd, repository: &MapRepository) -> Result<Curve3> {
        let (from_road, from_point) = lane_end_point(from, repository)?;
        let (to_road, to_point) = lane_end_point(to, repository)?;
        Ok(lane_link_curve(
            from_point,
            &from_road.end_along(from.is_tail()),
            to_point,
            &to_road.end_along(to.is_tail()),
            self.config.junction_control_ratio,
        )?)
    }

    /// Road ends of `junction`, one per link road whose road is loaded.
    pub fn road_ends(&self, junction: &Junction, repository: &MapRepository) -> Vec<RefRoadEnd<String>> {
        junction
            .link_roads
            .iter()
            .filter_map(|link_road| {
                let Some(road) = repository.road_by_id(&link_road.road_id) else {
                    tracing::debug!(junction = %junction.id, road = %link_road.road_id, "link road not loaded");
                    return None;
                };
                road_end(link_road, road)
            })
            .collect()
    }

    /// Surface of a junction joining at least two road ends, `None` otherwise.
    pub fn surface(&self, junction: &Junction, repository: &MapRepository) -> Result<Option<JunctionSurface>> {
        if junction.link_roads.len() < 2 {
            return Ok(None);
        }
        let mut ends = self.road_ends(junction, repository);
        if ends.len() < 2 {
            return Ok(None);
        }
        let surface = build_junction_surface(
            &mut ends,
            self.config.junction_edge_segments,
            self.config.junction_control_ratio,
        )?;
        Ok(Some(surface))
    }
}

/// Record on every connected road that it touches `junction`.
pub fn register_link_junctions(junction: &Junction, repository: &mut MapRepository) {
    for link_road in &junction.link_roads {
        if let Some(road) = repository.road_by_id_mut(&link_road.road_id) {
            if !road.link_junctions.contains(&junction.id) {
                road.link_junctions.push(junction.id.clone());
            }
        }
    }
}

/// Centre line point of a lane at the road end the link touches.
fn lane_end_point<'r>(end: &LaneEnd, repository: &'r MapRepository) -> Result<(&'r Road, Point3<f64>)> {
    let road = repository
        .road_by_id(&end.road_id)
        .ok_or_else(|| Error::UnknownRoad(end.road_id.clone()))?;
    let unknown_lane = || Error::UnknownLane {
        road: end.road_id.clone(),
        lane: end.lane_id.clone(),
    };
    let section = road
        .section(&end.section_id)
        .filter(|s| s.lane(&end.lane_id).is_some())
        .or_else(|| road.end_section(end.is_tail()))
        .ok_or_else(unknown_lane)?;
    let lane = section.lane(&end.lane_id).ok_or_else(unknown_lane)?;
    let point = if end.is_tail() {
        lane.samples.last()
    } else {
        lane.samples.first()
    };
    let point = point.copied().unwrap_or_else(|| road.curve.point_at(end.end.percent()));
    Ok((road, point))
}

/// Outermost boundary points of the lanes of one direction at a road end.
fn road_end(link_road: &LinkRoad, road: &Road) -> Option<RefRoadEnd<String>> {
    let tail = link_road.is_tail();
    let section = road.end_section(tail)?;
    let percent = link_road.percent();
    let ref_point = road.curve.point_at(percent);
    let vertical = road.end_vertical(tail);

    let mut left: Option<(f64, Point3<f64>)> = None;
    let mut right: Option<(f64, Point3<f64>)> = None;
    let ends = section
        .lanes
        .iter()
        .filter(|lane| lane.direction() == link_road.direction)
        .flat_map(|lane| [&lane.left_boundary, &lane.right_boundary])
        .filter_map(|id| section.boundary(id))
        .filter_map(|b| if tail { b.samples.last() } else { b.samples.first() });
    for p in ends {
        // lateral offset, positive on the left like ST t
        let t = -(*p - ref_point).dot(&vertical);
        if left.map_or(true, |(best, _)| t > best) {
            left = Some((t, *p));
        }
        if right.map_or(true, |(best, _)| t < best) {
            right = Some((t, *p));
        }
    }

    Some(RefRoadEnd {
        road: road.id.clone(),
        is_tail: tail,
        forward: link_road.direction.is_forward(),
        along: road.end_along(tail),
        left: left?.1,
        right: right?.1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Direction;
    use crate::test_support::two_way_road;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use roadnet_core::LinkEnd;
    use serde_json::json;

    /// Road 1 ends at z = -10 heading +z, road 2 starts at x = 10 heading +x.
    fn corner() -> MapRepository {
        let mut repo = MapRepository::new();
        repo.insert_road(two_way_road("1", Point3::new(0.0, 0.0, -60.0), Point3::new(0.0, 0.0, -10.0)));
        repo.insert_road(two_way_road("2", Point3::new(10.0, 0.0, 0.0), Point3::new(60.0, 0.0, 0.0)));
        repo
    }

    fn record(value: serde_json::Value) -> LaneLinkRecord {
        serde_json::from_value(value).unwrap()
    }

    fn turn() -> LaneLinkRecord {
        record(json!({
            "id": "l1", "junctionid": "j1",
            "fid": "-1", "frid": "1", "fsid": "0", "ftype": "end",
            "tid": "-1", "trid": "2", "tsid": "0", "ttype": "start"
        }))
    }

    #[test]
    fn test_generated_lane_link_curve() {
        let repo = corner();
        let config = EngineConfig::default();
        let link = JunctionAssembler::new(&config).lane_link(&turn(), &repo).unwrap();
        let curve = link.curve.as_ref().unwrap();
        // lane -1 centre lies 1.75 m right of each reference line
        assert_relative_eq!(curve.point_at(0.0), Point3::new(-1.75, 0.0, -10.0), epsilon = 1e-6);
        assert_relative_eq!(curve.point_at(1.0), Point3::new(10.0, 0.0, 1.75), epsilon = 1e-6);
        assert_relative_eq!(curve.tangent_at(0.0), Vector3::z(), epsilon = 1e-6);
        assert_eq!(link.samples.len(), config.lane_link_segments + 1);
        assert!(link.road_id.is_none());
        assert!(link.enabled);
    }

    #[test]
    fn test_lane_link_from_samples() {
        let repo = MapRepository::new();
        let config = EngineConfig::default();
        let link = JunctionAssembler::new(&config)
            .lane_link(
                &record(json!({
                    "id": "l2", "junctionid": "j1", "roadid": "77",
                    "fid": "-1", "frid": "8", "tid": "-1", "trid": "9",
                    "samplePoints": [{ "x": 0, "y": 0 }, { "x": 5, "y": 1 }, { "x": 10, "y": 0 }]
                })),
                &repo,
            )
            .unwrap();
        assert_eq!(link.samples.len(), 3);
        assert_eq!(link.road_id.as_deref(), Some("77"));
        assert!(link.length() > 10.0);
    }

    #[test]
    fn test_unknown_lane_rejected() {
        let repo = corner();
        let config = EngineConfig::default();
        let mut bad = turn();
        bad.from_lane = "-9".into();
        let (junction, rejected) = JunctionAssembler::new(&config).assemble("j1", [&turn(), &bad], &repo);
        assert_eq!(junction.lane_links.len(), 1);
        assert_eq!(rejected.len(), 1);
        assert!(matches!(rejected[0].1, Error::UnknownLane { .. }));
    }

    #[test]
    fn test_road_ends_and_surface() {
        let mut repo = corner();
        let config = EngineConfig::default();
        let assembler = JunctionAssembler::new(&config);
        let mut back = turn();
        back.id = "l2".into();
        back.from_lane = "1".into();
        back.from_road = "2".into();
        back.from_end = LinkEnd::Start;
        back.to_lane = "1".into();
        back.to_road = "1".into();
        back.to_end = LinkEnd::End;
        let (junction, rejected) = assembler.assemble("j1", [&turn(), &back], &repo);
        assert!(rejected.is_empty());
        // forward and reverse sides of both roads
        assert_eq!(junction.link_roads.len(), 4);
        assert!(junction.link_roads.contains(&LinkRoad {
            road_id: "1".into(),
            end: LinkEnd::End,
            direction: Direction::Reverse,
        }));

        let ends = assembler.road_ends(&junction, &repo);
        let forward_in = ends.iter().find(|e| e.road == "1" && e.forward).unwrap();
        assert!(forward_in.is_tail);
        assert_relative_eq!(forward_in.left, Point3::new(0.0, 0.0, -10.0), epsilon = 1e-6);
        assert_relative_eq!(forward_in.right, Point3::new(-7.0, 0.0, -10.0), epsilon = 1e-6);
        assert_relative_eq!(forward_in.along, Vector3::z(), epsilon = 1e-6);

        let surface = assembler.surface(&junction, &repo).unwrap().unwrap();
        assert!(surface.mesh.triangle_count() > 0);

        register_link_junctions(&junction, &mut repo);
        register_link_junctions(&junction, &mut repo);
        assert_eq!(repo.road_by_id("2").unwrap().link_junctions, vec!["j1".to_string()]);
    }

    #[test]
    fn test_single_road_has_no_surface() {
        let repo = corner();
        let config = EngineConfig::default();
        let mut junction = Junction::new("j2");
        junction.add_link_road(LinkRoad {
            road_id: "1".into(),
            end: LinkEnd::End,
            direction: Direction::Forward,
        });
        assert!(JunctionAssembler::new(&config).surface(&junction, &repo).unwrap().is_none());
    }
}
