// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reference-line reconstruction from control points or legacy samples.

use nalgebra::Point3;
use roadnet_core::{round_to, ControlPointRecord, ControlType, EngineConfig, MapPoint};
use rustc_hash::FxHashSet;

use crate::arc::{ArcControlPoint, ArcGeometry};
use crate::curve::{Curve3, Interpolation};
use crate::frame::world_point;
use crate::Result;

/// Where a reference line comes from.
#[derive(Debug, Clone, Copy)]
pub enum CurveInput<'a> {
    /// Explicit control points with their interpolation kind.
    ControlPoints {
        points: &'a [ControlPointRecord],
        control_type: ControlType,
    },
    /// Raw sampled positions (maps without control points).
    Samples(&'a [MapPoint]),
}

/// Outcome of a reconstruction.
#[derive(Debug, Clone)]
pub struct ReconstructedCurve {
    pub curve: Curve3,
    /// Arc metadata when the control points describe a resolvable arc.
    pub arc: Option<ArcGeometry>,
    /// An arc was requested but could not be solved; the control points were
    /// used as a plain spline instead.
    pub arc_fallback: bool,
    /// Curve length rounded to the millimetre.
    pub length: f64,
}

/// Builds reference lines using the engine's spline settings.
#[derive(Debug, Clone, Copy)]
pub struct CurveReconstructor<'c> {
    config: &'c EngineConfig,
}

impl<'c> CurveReconstructor<'c> {
    pub fn new(config: &'c EngineConfig) -> Self {
        Self { config }
    }

    pub fn reconstruct(&self, input: CurveInput<'_>) -> Result<ReconstructedCurve> {
        match input {
            CurveInput::Samples(samples) => {
                let points = self
                    .clean(samples.iter().map(|p| (*p, ())))
                    .into_iter()
                    .map(|(p, _)| p)
                    .collect();
                self.finish(self.spline(points)?, None, false)
            }
            CurveInput::ControlPoints {
                points: records,
                control_type,
            } => {
                // headings travel with the points that survive deduplication
                let (mut points, headings): (Vec<_>, Vec<_>) =
                    self.clean(records.iter().map(|r| (r.point(), r.hdg))).into_iter().unzip();
                match control_type {
                    ControlType::Arc if points.len() >= 2 => {
                        let start = ArcControlPoint::new(points[0], headings[0]);
                        let end = ArcControlPoint::new(points[1], headings[1]);
                        match ArcGeometry::solve(&start, &end, self.config.arc_step_degrees) {
                            Ok(arc) if arc.points.len() > 2 => {
                                let curve = self
                                    .spline(arc.points.clone())?
                                    .with_interpolation(Interpolation::Arc);
                                self.finish(curve, Some(arc), false)
                            }
                            _ => self.finish(self.spline(points)?, None, true),
                        }
                    }
                    ControlType::Catmullrom => {
                        strip_virtual_endpoints(&mut points);
                        self.finish(self.spline(points)?, None, false)
                    }
                    _ => self.finish(self.spline(points)?, None, false),
                }
            }
        }
    }

    /// Round, convert to the world frame and drop duplicates (first wins).
    /// Each point keeps the payload it came with.
    fn clean<T>(&self, items: impl Iterator<Item = (MapPoint, T)>) -> Vec<(Point3<f64>, T)> {
        let decimals = self.config.dedup_decimals;
        let mut seen = FxHashSet::default();
        items
            .map(|(p, payload)| {
                let rounded = MapPoint::new(
                    round_to(p.x, decimals),
                    round_to(p.y, decimals),
                    round_to(p.z, decimals),
                );
                (rounded, payload)
            })
            .filter(|(p, _)| seen.insert((p.x.to_bits(), p.y.to_bits(), p.z.to_bits())))
            .map(|(p, payload)| (world_point(&p), payload))
            .collect()
    }

    fn spline(&self, points: Vec<Point3<f64>>) -> Result<Curve3> {
        Curve3::catmull_rom(points, self.config.curve_kind, self.config.spline_tension)
    }

    fn finish(&self, curve: Curve3, arc: Option<ArcGeometry>, arc_fallback: bool) -> Result<ReconstructedCurve> {
        let length = round_to(curve.length(), 3);
        Ok(ReconstructedCurve {
            curve,
            arc,
            arc_fallback,
            length,
        })
    }
}

/// Mirror the first and last points outward so that a saved Catmull-Rom
/// curve keeps its end tangents.
pub fn pad_virtual_endpoints(points: &[Point3<f64>]) -> Vec<Point3<f64>> {
    if points.len() < 2 {
        return points.to_vec();
    }
    let n = points.len();
    let head = points[0] + (points[0] - points[1]);
    let tail = points[n - 1] + (points[n - 1] - points[n - 2]);
    let mut padded = Vec::with_capacity(n + 2);
    padded.push(head);
    padded.extend_from_slice(points);
    padded.push(tail);
    padded
}

/// Remove the mirrored head/tail points written by [`pad_virtual_endpoints`].
/// Lists that would drop below two points are left untouched.
pub fn strip_virtual_endpoints(points: &mut Vec<Point3<f64>>) {
    if points.len() >= 4 {
        points.pop();
        points.remove(0);
    }
}
