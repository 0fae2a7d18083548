// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parallel geometry jobs.
//!
//! Lane strips and boundary lines only read their own input samples, so they
//! are collected from the repository as owned jobs, run on a rayon pool, and
//! written back by key once every job has finished.

use nalgebra::Point3;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use roadnet_core::{BoundaryStyle, EngineConfig};
use roadnet_geometry::{build_lane_mesh, BoundaryLine, BoundaryRasterizer, LineSlot, Mesh};

use crate::keys::RoadKey;
use crate::repository::MapRepository;
use crate::Result;

/// What a job produces geometry for, inside one section.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JobEntity {
    Lane(String),
    Boundary(String, LineSlot),
}

/// Where a job's output goes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobKey {
    pub road: RoadKey,
    pub section: String,
    pub entity: JobEntity,
}

/// Self-contained geometry work.
#[derive(Debug, Clone)]
pub enum GeometryJob {
    LaneStrip {
        left: Vec<Point3<f64>>,
        right: Vec<Point3<f64>>,
    },
    BoundaryLine {
        points: Vec<Point3<f64>>,
        style: BoundaryStyle,
        slot: LineSlot,
    },
}

#[derive(Debug, Clone)]
pub enum GeometryOutput {
    LaneStrip(Option<Mesh>),
    BoundaryLine(Option<BoundaryLine>),
}

impl GeometryJob {
    pub fn run(&self, rasterizer: &BoundaryRasterizer<'_>) -> Result<GeometryOutput> {
        match self {
            GeometryJob::LaneStrip { left, right } => Ok(GeometryOutput::LaneStrip(build_lane_mesh(left, right))),
            GeometryJob::BoundaryLine { points, style, slot } => Ok(GeometryOutput::BoundaryLine(
                rasterizer.rasterize_slot(points, style, *slot)?,
            )),
        }
    }
}

/// Fixed-size rayon pool owned by one loader.
pub struct WorkerPool {
    pool: ThreadPool,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("threads", &self.threads())
            .finish()
    }
}

impl WorkerPool {
    pub fn new(threads: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("roadnet-worker-{i}"))
            .build()?;
        Ok(Self { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run `op` inside the pool so nested parallel iterators use its threads.
    pub fn install<R, F>(&self, op: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }

    /// Run every job and return the outputs paired with their keys. Returns
    /// only after all jobs are done.
    pub fn run(&self, config: &EngineConfig, jobs: Vec<(JobKey, GeometryJob)>) -> Vec<(JobKey, Result<GeometryOutput>)> {
        let rasterizer = BoundaryRasterizer::new(config);
        self.install(|| {
            jobs.into_par_iter()
                .map(|(key, job)| {
                    let output = job.run(&rasterizer);
                    (key, output)
                })
                .collect()
        })
    }
}

/// Jobs for every lane strip and boundary line of the loaded roads.
///
/// Lanes whose boundaries are missing and boundaries without painted lines
/// produce no job.
pub fn collect_jobs(repository: &MapRepository) -> Vec<(JobKey, GeometryJob)> {
    let mut jobs = Vec::new();
    for (road_key, road) in repository.roads() {
        for section in &road.sections {
            let key = |entity| JobKey {
                road: road_key,
                section: section.id.clone(),
                entity,
            };
            for lane in &section.lanes {
                let (Some(left), Some(right)) = (
                    section.boundary(&lane.left_boundary),
                    section.boundary(&lane.right_boundary),
                ) else {
                    continue;
                };
                jobs.push((
                    key(JobEntity::Lane(lane.id.clone())),
                    GeometryJob::LaneStrip {
                        left: left.samples.clone(),
                        right: right.samples.clone(),
                    },
                ));
            }
            for boundary in &section.boundaries {
                for slot in [LineSlot::First, LineSlot::Second] {
                    if boundary.style.lines.get(slot.index()).is_none() {
                        continue;
                    }
                    jobs.push((
                        key(JobEntity::Boundary(boundary.id.clone(), slot)),
                        GeometryJob::BoundaryLine {
                            points: boundary.samples.clone(),
                            style: boundary.style.clone(),
                            slot,
                        },
                    ));
                }
            }
        }
    }
    jobs
}

/// Store a job's output on its entity. Returns `false` when the target no
/// longer exists or the output does not fit it.
pub fn apply_output(repository: &mut MapRepository, key: &JobKey, output: GeometryOutput) -> bool {
    let Some(section) = repository
        .get_road_mut(key.road)
        .and_then(|road| road.section_mut(&key.section))
    else {
        return false;
    };
    match (&key.entity, output) {
        (JobEntity::Lane(id), GeometryOutput::LaneStrip(mesh)) => match section.lane_mut(id) {
            Some(lane) => {
                lane.mesh = mesh;
                true
            }
            None => false,
        },
        (JobEntity::Boundary(id, slot), GeometryOutput::BoundaryLine(line)) => match section.boundary_mut(id) {
            Some(boundary) => {
                boundary.lines.set(*slot, line);
                true
            }
            None => false,
        },
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::two_way_road;
    use roadnet_core::style::mask;

    fn repository() -> (MapRepository, RoadKey) {
        let mut road = two_way_road("1", Point3::origin(), Point3::new(0.0, 0.0, 50.0));
        let section = &mut road.sections[0];
        // centre line double yellow, lane divider dashed
        section.boundary_mut("b0").unwrap().style = BoundaryStyle::from_mask(mask::DOUBLE_SOLID_YELLOW);
        section.boundary_mut("b-3.5").unwrap().style = BoundaryStyle::from_mask(mask::SINGLE_DASH_WHITE);
        let mut repo = MapRepository::new();
        let key = repo.insert_road(road);
        (repo, key)
    }

    #[test]
    fn test_collect_jobs() {
        let (repo, _) = repository();
        let jobs = collect_jobs(&repo);
        let lanes = jobs.iter().filter(|(k, _)| matches!(k.entity, JobEntity::Lane(_))).count();
        let lines = jobs.len() - lanes;
        assert_eq!(lanes, 3);
        // two lines for the double yellow, one for the dashed divider
        assert_eq!(lines, 3);
    }

    #[test]
    fn test_run_and_apply() {
        let (mut repo, key) = repository();
        let pool = WorkerPool::new(2).unwrap();
        assert_eq!(pool.threads(), 2);
        let config = EngineConfig::default();
        let outputs = pool.run(&config, collect_jobs(&repo));
        assert_eq!(outputs.len(), 6);
        for (job_key, output) in outputs {
            assert!(apply_output(&mut repo, &job_key, output.unwrap()));
        }

        let section = &repo.get_road(key).unwrap().sections[0];
        assert!(section.lanes.iter().all(|l| l.mesh.is_some()));
        let centre = &section.boundary("b0").unwrap().lines;
        assert!(centre.first.is_some() && centre.second.is_some());
        let divider = section.boundary("b-3.5").unwrap().lines.first.as_ref().unwrap();
        let painted = divider.painted_length();
        assert!(painted > 0.0 && painted < 50.0);
        assert!(section.boundary("b-7").unwrap().lines.is_empty());
    }

    #[test]
    fn test_apply_to_missing_target() {
        let (mut repo, key) = repository();
        let stale = JobKey {
            road: key,
            section: "0".into(),
            entity: JobEntity::Lane("9".into()),
        };
        assert!(!apply_output(&mut repo, &stale, GeometryOutput::LaneStrip(None)));
        let mismatched = JobKey {
            entity: JobEntity::Lane("-1".into()),
            ..stale
        };
        assert!(!apply_output(&mut repo, &mismatched, GeometryOutput::BoundaryLine(None)));
    }
}
