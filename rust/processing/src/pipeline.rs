// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Map load pipeline.
//!
//! Turns import records into a populated [`MapRepository`]:
//!
//! 1. reference lines are reconstructed in parallel, one task per road
//! 2. sections, lanes and boundaries are derived from the records
//! 3. lane strips and boundary lines run as keyed jobs on the worker pool
//! 4. junctions are assembled once every road is complete
//! 5. poles are placed, then devices are mounted on them
//!
//! A failing entity never aborts the load; it is skipped (or, for devices,
//! kept without a pole) and reported as a [`LoadWarning`].

use std::fmt;
use std::time::Instant;

use rayon::prelude::*;
use roadnet_core::{
    BoundaryStyle, EngineConfig, LaneLinkRecord, LaneType, MapRecords, ObjectRecord, RecordKind, RoadRecord,
};
use roadnet_geometry::frame::world_point;
use roadnet_geometry::{classify_width, CurveInput, CurveReconstructor, ElevationProfile, StResolver};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::jobs::{apply_output, collect_jobs, JobEntity, WorkerPool};
use crate::junction::{register_link_junctions, JunctionAssembler};
use crate::keys::EntityKind;
use crate::model::{Anchor, Boundary, Lane, MountedKind, MountedObject, Road, Section};
use crate::mount::{MountPointResolver, MountRequest};
use crate::poles::{
    anchor_of, corrected_heading, device_bindings, place_pole, target_pole, yaw_degrees, ObjectKind, PoleCatalog,
    PoleIndex,
};
use crate::repository::MapRepository;
use crate::{Error, Result};

/// Declared and reconstructed road lengths further apart than this are logged.
const LENGTH_MISMATCH: f64 = 0.01;

/// An entity that was skipped or left incomplete during a load.
#[derive(Debug)]
pub struct LoadWarning {
    pub entity: EntityKind,
    /// File id; lanes and boundaries are `road/section/id`.
    pub id: String,
    pub error: Error,
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.entity, self.id, self.error)
    }
}

/// Wall-clock time per load phase, in milliseconds.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LoadTimings {
    pub roads_ms: u64,
    pub sections_ms: u64,
    pub geometry_ms: u64,
    pub junctions_ms: u64,
    pub objects_ms: u64,
    pub total_ms: u64,
}

/// Entity counts after a load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadStats {
    pub roads: usize,
    pub lanes: usize,
    pub boundaries: usize,
    pub geometry_jobs: usize,
    pub junctions: usize,
    pub lane_links: usize,
    pub poles: usize,
    pub objects: usize,
    pub attached_objects: usize,
    /// Object records of kinds this engine does not place.
    pub ignored_objects: usize,
}

/// Outcome of [`MapLoader::load`].
#[derive(Debug, Default)]
pub struct LoadReport {
    pub repository: MapRepository,
    pub warnings: Vec<LoadWarning>,
    pub timings: LoadTimings,
    pub stats: LoadStats,
}

impl LoadReport {
    fn warn(&mut self, entity: EntityKind, id: impl Into<String>, error: Error) {
        let id = id.into();
        tracing::warn!(entity = %entity, id = %id, error = %error, "entity skipped");
        self.warnings.push(LoadWarning { entity, id, error });
    }

    /// Warnings about one kind of entity.
    pub fn warnings_for(&self, entity: EntityKind) -> impl Iterator<Item = &LoadWarning> {
        self.warnings.iter().filter(move |w| w.entity == entity)
    }

    /// Devices that no pole accepted.
    pub fn orphaned_objects(&self) -> impl Iterator<Item = &MountedObject> {
        self.repository
            .objects()
            .map(|(_, o)| o)
            .filter(|o| !o.is_attached())
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Loads maps with one configuration and one worker pool.
#[derive(Debug)]
pub struct MapLoader {
    config: EngineConfig,
    pool: WorkerPool,
}

impl MapLoader {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let pool = WorkerPool::new(config.worker_threads)?;
        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Parse a map file and load it. Only a malformed document fails; records
    /// that do not parse come back as warnings.
    pub fn load_json(&self, content: &str, catalog: &dyn PoleCatalog) -> Result<LoadReport> {
        let records = MapRecords::from_json(content)?;
        Ok(self.load(records, catalog))
    }

    pub fn load(&self, mut records: MapRecords, catalog: &dyn PoleCatalog) -> LoadReport {
        let total = Instant::now();
        let mut report = LoadReport::default();
        for rejected in records.take_rejected() {
            let entity = match rejected.kind {
                RecordKind::Road => EntityKind::Road,
                RecordKind::LaneLink => EntityKind::LaneLink,
                RecordKind::Object => EntityKind::Object,
            };
            report.warn(entity, rejected.id, rejected.error.into());
        }
        tracing::info!(
            roads = records.roads.len(),
            lane_links = records.lanelinks.len(),
            objects = records.objects.len(),
            rejected = report.warnings.len(),
            threads = self.pool.threads(),
            "Starting map load"
        );

        let records = &records;
        self.load_roads(records, &mut report);
        self.load_geometry(&mut report);
        // run() returns once every job has finished, so junctions and poles
        // below see complete roads
        self.load_junctions(records, &mut report);
        self.load_objects(records, catalog, &mut report);

        report.timings.total_ms = elapsed_ms(total);
        tracing::info!(
            total_ms = report.timings.total_ms,
            warnings = report.warnings.len(),
            "Map load complete"
        );
        report
    }

    fn load_roads(&self, records: &MapRecords, report: &mut LoadReport) {
        let start = Instant::now();
        let built: Vec<Result<Road>> = self
            .pool
            .install(|| records.roads.par_iter().map(|record| self.build_road(record)).collect());
        for (record, result) in records.roads.iter().zip(built) {
            match result {
                Ok(road) => {
                    report.repository.insert_road(road);
                }
                Err(e) => report.warn(EntityKind::Road, record.id.clone(), e),
            }
        }
        report.timings.roads_ms = elapsed_ms(start);

        let start = Instant::now();
        for record in &records.roads {
            let Some(road) = report.repository.road_by_id_mut(&record.id) else {
                continue;
            };
            let warnings = self.derive_sections(road, record);
            for warning in warnings {
                report.warn(warning.entity, warning.id, warning.error);
            }
        }
        report.timings.sections_ms = elapsed_ms(start);

        let repo = &report.repository;
        report.stats.roads = repo.road_count();
        report.stats.lanes = repo.roads().map(|(_, r)| r.lane_count()).sum();
        report.stats.boundaries = repo.roads().map(|(_, r)| r.boundary_count()).sum();
        tracing::info!(
            roads = report.stats.roads,
            lanes = report.stats.lanes,
            boundaries = report.stats.boundaries,
            roads_ms = report.timings.roads_ms,
            sections_ms = report.timings.sections_ms,
            "Roads reconstructed"
        );
    }

    /// Reference line and elevation of one road. Sections come later.
    fn build_road(&self, record: &RoadRecord) -> Result<Road> {
        let input = if record.control_points.len() >= 2 {
            CurveInput::ControlPoints {
                points: &record.control_points,
                control_type: record.control_type.unwrap_or_default(),
            }
        } else {
            CurveInput::Samples(&record.sample_points)
        };
        let rebuilt = CurveReconstructor::new(&self.config).reconstruct(input)?;
        if rebuilt.arc_fallback {
            tracing::debug!(road = %record.id, "arc control points unresolvable, using spline");
        }
        if record.length > 0.0 && (record.length - rebuilt.length).abs() > LENGTH_MISMATCH {
            tracing::debug!(
                road = %record.id,
                declared = record.length,
                reconstructed = rebuilt.length,
                "declared road length differs, using reconstructed"
            );
        }
        let elevation = if record.elevation.is_empty() {
            None
        } else {
            Some(ElevationProfile::from_records(&record.elevation, rebuilt.length, &self.config)?)
        };

        Ok(Road {
            id: record.id.clone(),
            road_type: record.road_type,
            declared_length: record.length,
            length: rebuilt.length,
            curve: rebuilt.curve,
            elevation,
            arc: rebuilt.arc,
            sections: Vec::new(),
            link_junctions: Vec::new(),
        })
    }

    fn derive_sections(&self, road: &mut Road, record: &RoadRecord) -> Vec<LoadWarning> {
        let mut warnings = Vec::new();
        road.sections.clear();
        for section in &record.sections {
            let length = road.length * (section.end_percent - section.start_percent).max(0.0);
            let boundaries: Vec<Boundary> = section
                .boundaries
                .iter()
                .map(|b| Boundary {
                    id: b.id.clone(),
                    mark: b.mark,
                    style: BoundaryStyle::from_mask(b.mark),
                    samples: b.sample_points.iter().map(world_point).collect(),
                    lines: Default::default(),
                })
                .collect();

            let mut lanes = Vec::with_capacity(section.lanes.len());
            for lane in &section.lanes {
                let lane_type = LaneType::from_code(lane.lane_type);
                let find = |id: &str| boundaries.iter().find(|b| b.id == id);
                let (left, right) = (find(&lane.left_boundary_id), find(&lane.right_boundary_id));
                for (id, found) in [(&lane.left_boundary_id, left), (&lane.right_boundary_id, right)] {
                    if found.is_none() {
                        warnings.push(LoadWarning {
                            entity: EntityKind::Lane,
                            id: format!("{}/{}/{}", road.id, section.id, lane.id),
                            error: Error::UnknownBoundary {
                                lane: lane.id.clone(),
                                boundary: id.clone(),
                            },
                        });
                    }
                }
                let width = match (left, right) {
                    (Some(l), Some(r)) => classify_width(&l.samples, &r.samples, self.config.transition_deviation),
                    _ => None,
                };
                lanes.push(Lane {
                    id: lane.id.clone(),
                    lane_type,
                    left_boundary: lane.left_boundary_id.clone(),
                    right_boundary: lane.right_boundary_id.clone(),
                    speed_limit: lane.speed_limit,
                    friction: lane
                        .friction
                        .filter(|f| *f != 0.0)
                        .unwrap_or_else(|| lane_type.default_friction()),
                    s_offset: lane.s_offset.unwrap_or(0.0).clamp(0.0, length),
                    samples: lane.sample_points.iter().map(world_point).collect(),
                    width,
                    mesh: None,
                });
            }

            road.sections.push(Section {
                id: section.id.clone(),
                start_percent: section.start_percent,
                end_percent: section.end_percent,
                length,
                lanes,
                boundaries,
            });
        }
        warnings
    }

    fn load_geometry(&self, report: &mut LoadReport) {
        let start = Instant::now();
        let jobs = collect_jobs(&report.repository);
        report.stats.geometry_jobs = jobs.len();
        for (key, output) in self.pool.run(&self.config, jobs) {
            match output {
                Ok(output) => {
                    if !apply_output(&mut report.repository, &key, output) {
                        tracing::debug!(
                            section = %key.section,
                            entity = ?key.entity,
                            "geometry output has no matching target, dropped"
                        );
                    }
                }
                Err(e) => {
                    let road = report
                        .repository
                        .get_road(key.road)
                        .map_or_else(String::new, |r| r.id.clone());
                    let (entity, id) = match &key.entity {
                        JobEntity::Lane(id) => (EntityKind::Lane, id),
                        JobEntity::Boundary(id, _) => (EntityKind::Boundary, id),
                    };
                    report.warn(entity, format!("{road}/{}/{id}", key.section), e);
                }
            }
        }
        report.timings.geometry_ms = elapsed_ms(start);
        tracing::info!(
            jobs = report.stats.geometry_jobs,
            geometry_ms = report.timings.geometry_ms,
            "Geometry jobs complete"
        );
    }

    fn load_junctions(&self, records: &MapRecords, report: &mut LoadReport) {
        let start = Instant::now();
        let mut by_junction: FxHashMap<&str, Vec<&LaneLinkRecord>> = FxHashMap::default();
        for link in &records.lanelinks {
            by_junction.entry(link.junction_id.as_str()).or_default().push(link);
        }

        let assembler = JunctionAssembler::new(&self.config);
        for junction_id in records.junction_ids() {
            let links = by_junction.remove(junction_id.as_str()).unwrap_or_default();
            let (mut junction, rejected) = assembler.assemble(&junction_id, links, &report.repository);
            for (link_id, e) in rejected {
                report.warn(EntityKind::LaneLink, link_id, e);
            }
            if !junction.is_renderable() {
                tracing::debug!(junction = %junction_id, "junction without link roads skipped");
                continue;
            }
            register_link_junctions(&junction, &mut report.repository);
            match assembler.surface(&junction, &report.repository) {
                Ok(surface) => junction.surface = surface,
                Err(e) => report.warn(EntityKind::Junction, junction_id.clone(), e),
            }
            report.stats.lane_links += junction.lane_links.len();
            report.repository.insert_junction(junction);
        }

        report.timings.junctions_ms = elapsed_ms(start);
        report.stats.junctions = report.repository.junction_count();
        tracing::info!(
            junctions = report.stats.junctions,
            lane_links = report.stats.lane_links,
            junctions_ms = report.timings.junctions_ms,
            "Junctions assembled"
        );
    }

    fn load_objects(&self, records: &MapRecords, catalog: &dyn PoleCatalog, report: &mut LoadReport) {
        let start = Instant::now();
        let legacy = records.is_legacy();

        let mut poles = Vec::new();
        let mut devices = Vec::new();
        for record in &records.objects {
            match ObjectKind::classify(record) {
                ObjectKind::Pole => poles.push(record),
                // pole models are sometimes typed by their catalog name only
                ObjectKind::Other if catalog.structure(&record.name).is_some() => poles.push(record),
                ObjectKind::Mounted(kind) => devices.push((record, kind)),
                ObjectKind::Other => {
                    tracing::debug!(object = %record.id, kind = %record.object_type, "object kind not placed");
                    report.stats.ignored_objects += 1;
                }
            }
        }

        let mut index = PoleIndex::new();
        for record in poles {
            let placed = catalog
                .structure(&record.name)
                .ok_or_else(|| Error::UnknownPoleStructure(record.name.clone()))
                .and_then(|structure| place_pole(record, structure, &report.repository, legacy));
            match placed {
                Ok(pole) => {
                    let anchor = pole.anchor.clone();
                    let key = report.repository.insert_pole(pole);
                    index.insert(&anchor, key);
                }
                Err(e) => report.warn(EntityKind::Pole, record.id.clone(), e),
            }
        }

        for (record, kind) in devices {
            match self.mount_object(record, kind, &report.repository, &index, legacy) {
                Ok((object, unattached)) => {
                    if let Some(e) = unattached {
                        report.warn(EntityKind::Object, record.id.clone(), e);
                    }
                    report.repository.insert_object(object);
                }
                Err(e) => report.warn(EntityKind::Object, record.id.clone(), e),
            }
        }

        report.timings.objects_ms = elapsed_ms(start);
        report.stats.poles = report.repository.pole_count();
        report.stats.objects = report.repository.object_count();
        report.stats.attached_objects = report
            .repository
            .objects()
            .filter(|(_, o)| o.is_attached())
            .count();
        tracing::info!(
            poles = report.stats.poles,
            objects = report.stats.objects,
            attached = report.stats.attached_objects,
            objects_ms = report.timings.objects_ms,
            "Objects placed"
        );
    }

    /// Build a device and try to hang it on a pole. A missing pole leaves the
    /// device unattached and is returned next to it; an unresolvable anchor
    /// drops the device.
    fn mount_object(
        &self,
        record: &ObjectRecord,
        kind: MountedKind,
        repository: &MapRepository,
        index: &PoleIndex,
        legacy: bool,
    ) -> Result<(MountedObject, Option<Error>)> {
        let anchor = anchor_of(record, repository)?;
        let yaw = yaw_degrees(corrected_heading(record, ObjectKind::Mounted(kind), legacy));
        let target = target_pole(record);
        let request = MountRequest {
            object: &record.id,
            s: record.s,
            t: record.t,
            yaw,
            z_offset: record.z_offset,
            target_pole: target.as_deref(),
        };

        let resolver = MountPointResolver::new(&self.config, repository, index);
        let placement = match &anchor {
            Anchor::Road(road_id) => {
                let road = repository
                    .road_by_id(road_id)
                    .ok_or_else(|| Error::UnknownRoad(road_id.clone()))?;
                resolver.resolve(&road.resolver(), &anchor, &request)
            }
            Anchor::Junction { lane_link, .. } => {
                let curve = repository
                    .lane_link_by_id(lane_link)
                    .and_then(|(_, link)| link.curve.as_ref())
                    .ok_or_else(|| Error::UnknownLaneLink(lane_link.clone()))?;
                resolver.resolve(&StResolver::new(curve), &anchor, &request)
            }
        };
        let (placement, unattached) = match placement {
            Ok(placement) => (Some(placement), None),
            Err(e) => (None, Some(e)),
        };

        let object = MountedObject {
            id: record.id.clone(),
            name: record.name.clone(),
            kind,
            anchor,
            s: record.s,
            t: record.t,
            z_offset: record.z_offset,
            yaw,
            placement,
            bindings: device_bindings(record),
        };
        Ok((object, unattached))
    }
}
