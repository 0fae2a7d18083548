// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Arc-length parametrised 3D curves.
//!
//! [`Curve3`] is the reference-line handle used everywhere else. It is
//! evaluated by *percent*, the fraction of its length, so that
//! `point_at(s / length)` is the point at station `s`.

use nalgebra::{Point3, Vector3};
use roadnet_core::CurveKind;

use crate::frame::{ground_distance, right_of, unit_or};
use crate::spline::{ArcLengthTable, CatmullRom, CubicBezier, Parametric};
use crate::{Error, Result};

/// Minimum number of arc-length divisions for any curve.
const MIN_DIVISIONS: usize = 200;
/// Additional divisions per spline segment.
const DIVISIONS_PER_SEGMENT: usize = 24;

/// How a curve was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    /// Catmull-Rom through control points
    Spline,
    /// Catmull-Rom through points sampled from a circular arc
    Arc,
    /// Single cubic Bézier
    Bezier,
}

#[derive(Debug, Clone)]
enum Source {
    CatmullRom(CatmullRom),
    Bezier(CubicBezier),
}

impl Source {
    #[inline]
    fn as_parametric(&self) -> &dyn Parametric {
        match self {
            Source::CatmullRom(c) => c as &dyn Parametric,
            Source::Bezier(b) => b as &dyn Parametric,
        }
    }
}

/// Position and unit tangent on a curve.
#[derive(Debug, Clone, Copy)]
pub struct CurvePoint {
    pub position: Point3<f64>,
    pub tangent: Vector3<f64>,
}

/// Result of projecting a point onto a curve.
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    pub percent: f64,
    pub point: Point3<f64>,
    pub tangent: Vector3<f64>,
    /// Horizontal distance between the query and `point`.
    pub distance: f64,
}

/// Immutable arc-length parametrised curve.
#[derive(Debug, Clone)]
pub struct Curve3 {
    source: Source,
    interpolation: Interpolation,
    table: ArcLengthTable,
}

impl Curve3 {
    /// Catmull-Rom curve through `points`. Needs two or more distinct points.
    pub fn catmull_rom(points: Vec<Point3<f64>>, kind: CurveKind, tension: f64) -> Result<Self> {
        let distinct = count_distinct(&points);
        if distinct < 2 {
            return Err(Error::DegenerateCurve { distinct });
        }
        let divisions = MIN_DIVISIONS.max(points.len() * DIVISIONS_PER_SEGMENT);
        let spline = CatmullRom::new(points, kind, tension);
        let table = ArcLengthTable::build(&spline, divisions);
        Ok(Self {
            source: Source::CatmullRom(spline),
            interpolation: Interpolation::Spline,
            table,
        })
    }

    /// Cubic Bézier curve between `p0` and `p3`.
    pub fn bezier(bezier: CubicBezier) -> Result<Self> {
        if (bezier.p3 - bezier.p0).norm() < 1e-9 {
            return Err(Error::DegenerateCurve { distinct: 1 });
        }
        let table = ArcLengthTable::build(&bezier, MIN_DIVISIONS);
        Ok(Self {
            source: Source::Bezier(bezier),
            interpolation: Interpolation::Bezier,
            table,
        })
    }

    pub(crate) fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    /// Points the curve was built from.
    pub fn control_points(&self) -> Vec<Point3<f64>> {
        match &self.source {
            Source::CatmullRom(c) => c.points().to_vec(),
            Source::Bezier(b) => b.control_points().to_vec(),
        }
    }

    /// Arc length.
    #[inline]
    pub fn length(&self) -> f64 {
        self.table.total()
    }

    /// Point at a length fraction in `[0, 1]`.
    #[inline]
    pub fn point_at(&self, percent: f64) -> Point3<f64> {
        let t = self.table.u_to_t(percent);
        self.source.as_parametric().point(t)
    }

    /// Unit tangent at a length fraction in `[0, 1]`.
    pub fn tangent_at(&self, percent: f64) -> Vector3<f64> {
        let t = self.table.u_to_t(percent);
        let curve = self.source.as_parametric();
        let d = curve.derivative(t);
        if let Some(unit) = d.try_normalize(1e-12) {
            return unit;
        }
        // Zero derivative (cusp or repeated knot): use a finite difference.
        let (a, b) = ((t - 1e-4).max(0.0), (t + 1e-4).min(1.0));
        unit_or(curve.point(b) - curve.point(a), Vector3::z())
    }

    pub fn sample_at(&self, percent: f64) -> CurvePoint {
        CurvePoint {
            position: self.point_at(percent),
            tangent: self.tangent_at(percent),
        }
    }

    /// `segments + 1` points equally spaced by arc length.
    pub fn spaced_points(&self, segments: usize) -> Vec<Point3<f64>> {
        let segments = segments.max(1);
        (0..=segments)
            .map(|i| self.point_at(i as f64 / segments as f64))
            .collect()
    }

    /// Ground-plane unit vector to the right of the head tangent.
    pub fn head_vertical(&self) -> Vector3<f64> {
        right_of(&self.tangent_at(0.0))
    }

    /// Ground-plane unit vector to the right of the tail tangent.
    pub fn tail_vertical(&self) -> Vector3<f64> {
        right_of(&self.tangent_at(1.0))
    }

    /// Ground-plane tangent at one end, pointing away from the curve.
    pub fn end_along(&self, tail: bool) -> Vector3<f64> {
        let t = self.tangent_at(if tail { 1.0 } else { 0.0 });
        let along = Vector3::new(t.x, 0.0, t.z);
        let along = if tail { along } else { -along };
        unit_or(along, Vector3::z())
    }

    /// Same geometry traversed from tail to head.
    pub fn reversed(&self) -> Self {
        let source = match &self.source {
            Source::CatmullRom(c) => {
                let mut points = c.points().to_vec();
                points.reverse();
                Source::CatmullRom(CatmullRom::new(points, c.kind(), c.tension()))
            }
            Source::Bezier(b) => Source::Bezier(CubicBezier::new(b.p3, b.p2, b.p1, b.p0)),
        };
        let divisions = match &source {
            Source::CatmullRom(c) => MIN_DIVISIONS.max(c.points().len() * DIVISIONS_PER_SEGMENT),
            Source::Bezier(_) => MIN_DIVISIONS,
        };
        let table = ArcLengthTable::build(source.as_parametric(), divisions);
        Self {
            source,
            interpolation: self.interpolation,
            table,
        }
    }

    /// Percent of the point closest to `target`.
    pub fn closest_percent(&self, target: &Point3<f64>) -> f64 {
        self.project(target).percent
    }

    /// Closest point to `target` on the ground plane.
    ///
    /// A coarse scan picks the best sample, then a ternary search refines it
    /// within the neighbouring samples.
    pub fn project(&self, target: &Point3<f64>) -> Projection {
        let length = self.length();
        let samples = ((length / 0.5).ceil() as usize).clamp(64, 4096);

        let mut best = 0;
        let mut best_dist = f64::INFINITY;
        for i in 0..=samples {
            let d = ground_distance(&self.point_at(i as f64 / samples as f64), target);
            if d < best_dist {
                best_dist = d;
                best = i;
            }
        }

        let step = 1.0 / samples as f64;
        let mut lo = (best as f64 * step - step).max(0.0);
        let mut hi = (best as f64 * step + step).min(1.0);
        for _ in 0..60 {
            let m1 = lo + (hi - lo) / 3.0;
            let m2 = hi - (hi - lo) / 3.0;
            let d1 = ground_distance(&self.point_at(m1), target);
            let d2 = ground_distance(&self.point_at(m2), target);
            if d1 <= d2 {
                hi = m2;
            } else {
                lo = m1;
            }
        }
        let percent = 0.5 * (lo + hi);
        let point = self.point_at(percent);
        Projection {
            percent,
            point,
            tangent: self.tangent_at(percent),
            distance: ground_distance(&point, target),
        }
    }
}

/// Consecutive points closer than this are considered one.
const DISTINCT_EPSILON: f64 = 1e-6;

fn count_distinct(points: &[Point3<f64>]) -> usize {
    let mut distinct: Vec<&Point3<f64>> = Vec::with_capacity(points.len().min(8));
    for p in points {
        if !distinct.iter().any(|q| (*q - p).norm() < DISTINCT_EPSILON) {
            distinct.push(p);
            if distinct.len() >= 2 {
                return 2;
            }
        }
    }
    distinct.len()
}

/// Sample count used when tessellating a curve of the given length.
pub fn segments_for_length(length: f64) -> usize {
    if length <= 50.0 {
        20
    } else if length <= 100.0 {
        30
    } else if length <= 300.0 {
        40
    } else {
        (length / 10.0).floor() as usize + 1
    }
}
