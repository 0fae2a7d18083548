// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parametric curve primitives.
//!
//! [`CatmullRom`] and [`CubicBezier`] are evaluated over a raw parameter
//! `t ∈ [0, 1]` that is not proportional to distance. [`ArcLengthTable`]
//! maps a distance fraction `u` onto `t`.

use nalgebra::{Point3, Vector3};
use roadnet_core::CurveKind;

/// A curve evaluated over its raw parameter.
pub trait Parametric {
    /// Position at raw parameter `t ∈ [0, 1]`.
    fn point(&self, t: f64) -> Point3<f64>;

    /// Derivative with respect to `t`.
    fn derivative(&self, t: f64) -> Vector3<f64>;
}

/// Cubic `c0 + c1·w + c2·w² + c3·w³` with vector coefficients.
#[derive(Debug, Clone, Copy)]
struct CubicPoly {
    c0: Vector3<f64>,
    c1: Vector3<f64>,
    c2: Vector3<f64>,
    c3: Vector3<f64>,
}

impl CubicPoly {
    /// Hermite form from two values and their tangents.
    fn hermite(x0: Vector3<f64>, x1: Vector3<f64>, t0: Vector3<f64>, t1: Vector3<f64>) -> Self {
        Self {
            c0: x0,
            c1: t0,
            c2: -3.0 * x0 + 3.0 * x1 - 2.0 * t0 - t1,
            c3: 2.0 * x0 - 2.0 * x1 + t0 + t1,
        }
    }

    #[inline]
    fn eval(&self, w: f64) -> Vector3<f64> {
        self.c0 + w * (self.c1 + w * (self.c2 + w * self.c3))
    }

    #[inline]
    fn eval_derivative(&self, w: f64) -> Vector3<f64> {
        self.c1 + w * (2.0 * self.c2 + w * 3.0 * self.c3)
    }
}

/// Open Catmull-Rom spline through its control points.
///
/// End segments use mirrored phantom points (`2·p0 − p1`), so the curve
/// starts and ends exactly on the first and last control points.
#[derive(Debug, Clone)]
pub struct CatmullRom {
    points: Vec<Point3<f64>>,
    kind: CurveKind,
    tension: f64,
    segments: Vec<CubicPoly>,
}

impl CatmullRom {
    /// Build a spline. Callers guarantee at least two points.
    pub fn new(points: Vec<Point3<f64>>, kind: CurveKind, tension: f64) -> Self {
        let segments = build_segments(&points, kind, tension);
        Self {
            points,
            kind,
            tension,
            segments,
        }
    }

    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    pub fn kind(&self) -> CurveKind {
        self.kind
    }

    pub fn tension(&self) -> f64 {
        self.tension
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Segment index and local weight for a raw parameter.
    #[inline]
    fn locate(&self, t: f64) -> (usize, f64) {
        let n = self.segments.len();
        let p = t.clamp(0.0, 1.0) * n as f64;
        let mut index = p.floor() as usize;
        let mut weight = p - index as f64;
        if index >= n {
            index = n - 1;
            weight = 1.0;
        }
        (index, weight)
    }
}

fn build_segments(points: &[Point3<f64>], kind: CurveKind, tension: f64) -> Vec<CubicPoly> {
    let l = points.len();
    if l < 2 {
        return Vec::new();
    }
    let at = |i: usize| points[i].coords;
    (0..l - 1)
        .map(|i| {
            let p1 = at(i);
            let p2 = at(i + 1);
            let p0 = if i > 0 { at(i - 1) } else { 2.0 * p1 - p2 };
            let p3 = if i + 2 < l { at(i + 2) } else { 2.0 * p2 - p1 };
            match kind {
                CurveKind::CatmullRom => CubicPoly::hermite(
                    p1,
                    p2,
                    tension * (p2 - p0),
                    tension * (p3 - p1),
                ),
                CurveKind::Centripetal | CurveKind::Chordal => {
                    let pow = if kind == CurveKind::Chordal { 0.5 } else { 0.25 };
                    let mut dt0 = (p1 - p0).norm_squared().powf(pow);
                    let mut dt1 = (p2 - p1).norm_squared().powf(pow);
                    let mut dt2 = (p3 - p2).norm_squared().powf(pow);
                    // safety check for repeated points
                    if dt1 < 1e-4 {
                        dt1 = 1.0;
                    }
                    if dt0 < 1e-4 {
                        dt0 = dt1;
                    }
                    if dt2 < 1e-4 {
                        dt2 = dt1;
                    }
                    let t1 = ((p1 - p0) / dt0 - (p2 - p0) / (dt0 + dt1) + (p2 - p1) / dt1) * dt1;
                    let t2 = ((p2 - p1) / dt1 - (p3 - p1) / (dt1 + dt2) + (p3 - p2) / dt2) * dt1;
                    CubicPoly::hermite(p1, p2, t1, t2)
                }
            }
        })
        .collect()
}

impl Parametric for CatmullRom {
    fn point(&self, t: f64) -> Point3<f64> {
        let (i, w) = self.locate(t);
        Point3::from(self.segments[i].eval(w))
    }

    fn derivative(&self, t: f64) -> Vector3<f64> {
        let (i, w) = self.locate(t);
        self.segments[i].eval_derivative(w) * self.segments.len() as f64
    }
}

/// Cubic Bézier curve.
#[derive(Debug, Clone, Copy)]
pub struct CubicBezier {
    pub p0: Point3<f64>,
    pub p1: Point3<f64>,
    pub p2: Point3<f64>,
    pub p3: Point3<f64>,
}

impl CubicBezier {
    pub fn new(p0: Point3<f64>, p1: Point3<f64>, p2: Point3<f64>, p3: Point3<f64>) -> Self {
        Self { p0, p1, p2, p3 }
    }

    pub fn control_points(&self) -> [Point3<f64>; 4] {
        [self.p0, self.p1, self.p2, self.p3]
    }
}

impl Parametric for CubicBezier {
    fn point(&self, t: f64) -> Point3<f64> {
        let t = t.clamp(0.0, 1.0);
        let k = 1.0 - t;
        let v = self.p0.coords * (k * k * k)
            + self.p1.coords * (3.0 * k * k * t)
            + self.p2.coords * (3.0 * k * t * t)
            + self.p3.coords * (t * t * t);
        Point3::from(v)
    }

    fn derivative(&self, t: f64) -> Vector3<f64> {
        let t = t.clamp(0.0, 1.0);
        let k = 1.0 - t;
        (self.p1 - self.p0) * (3.0 * k * k)
            + (self.p2 - self.p1) * (6.0 * k * t)
            + (self.p3 - self.p2) * (3.0 * t * t)
    }
}

/// Cumulative chord lengths over uniformly spaced raw parameters.
#[derive(Debug, Clone)]
pub struct ArcLengthTable {
    lengths: Vec<f64>,
}

impl ArcLengthTable {
    pub fn build<C: Parametric + ?Sized>(curve: &C, divisions: usize) -> Self {
        let divisions = divisions.max(1);
        let mut lengths = Vec::with_capacity(divisions + 1);
        let mut last = curve.point(0.0);
        let mut sum = 0.0;
        lengths.push(0.0);
        for i in 1..=divisions {
            let current = curve.point(i as f64 / divisions as f64);
            sum += (current - last).norm();
            lengths.push(sum);
            last = current;
        }
        Self { lengths }
    }

    #[inline]
    pub fn total(&self) -> f64 {
        self.lengths.last().copied().unwrap_or(0.0)
    }

    /// Raw parameter at distance fraction `u`.
    pub fn u_to_t(&self, u: f64) -> f64 {
        let il = self.lengths.len();
        let total = self.total();
        if il < 2 || total <= 0.0 {
            return u.clamp(0.0, 1.0);
        }
        let target = u.clamp(0.0, 1.0) * total;

        // last index whose length is <= target
        let i = match self
            .lengths
            .binary_search_by(|len| len.partial_cmp(&target).unwrap_or(std::cmp::Ordering::Less))
        {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        if i >= il - 1 {
            return 1.0;
        }

        let before = self.lengths[i];
        let segment = self.lengths[i + 1] - before;
        let fraction = if segment > 0.0 {
            (target - before) / segment
        } else {
            0.0
        };
        (i as f64 + fraction) / (il - 1) as f64
    }

    /// Distance fraction at raw parameter `t`.
    pub fn t_to_u(&self, t: f64) -> f64 {
        let il = self.lengths.len();
        let total = self.total();
        if il < 2 || total <= 0.0 {
            return t.clamp(0.0, 1.0);
        }
        let p = t.clamp(0.0, 1.0) * (il - 1) as f64;
        let i = (p.floor() as usize).min(il - 2);
        let w = p - i as f64;
        (self.lengths[i] + w * (self.lengths[i + 1] - self.lengths[i])) / total
    }
}
