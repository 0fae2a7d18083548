// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Circular arcs from two heading control points.

use std::f64::consts::{FRAC_PI_2, PI};

use nalgebra::Point3;
use roadnet_core::{normalize_radians, round_to};

use crate::frame::{direction_from_angle, left_of, right_of};
use crate::{Error, Result};

/// Position and heading (radians) of one arc end.
#[derive(Debug, Clone, Copy)]
pub struct ArcControlPoint {
    pub position: Point3<f64>,
    pub heading: f64,
}

impl ArcControlPoint {
    pub fn new(position: Point3<f64>, heading: f64) -> Self {
        Self { position, heading }
    }
}

/// Reconstructed arc. Angles are radians measured like headings around `center`.
#[derive(Debug, Clone)]
pub struct ArcGeometry {
    pub radius: f64,
    pub center: Point3<f64>,
    pub start_angle: f64,
    pub end_angle: f64,
    pub clockwise: bool,
    /// Samples from start to end; the last one is the exact end point.
    pub points: Vec<Point3<f64>>,
}

impl ArcGeometry {
    /// Swept angle in radians.
    pub fn sweep(&self) -> f64 {
        (self.end_angle - self.start_angle).abs()
    }

    pub fn arc_length(&self) -> f64 {
        self.radius * self.sweep()
    }

    /// [`solve_arc`] with the failure reported as [`Error::UnresolvableArc`].
    pub fn solve(start: &ArcControlPoint, end: &ArcControlPoint, step_degrees: f64) -> Result<Self> {
        solve_arc(start, end, step_degrees).ok_or(Error::UnresolvableArc)
    }
}

/// Solve the circular arc leaving `start` along its heading and reaching
/// `end` along its heading, sampled every `step_degrees`.
///
/// Returns `None` when the end points coincide (to the millimetre), when the
/// headings describe no turn, or when fewer than two samples result.
pub fn solve_arc(start: &ArcControlPoint, end: &ArcControlPoint, step_degrees: f64) -> Option<ArcGeometry> {
    let h1 = normalize_radians(start.heading);
    let h2 = normalize_radians(end.heading);
    let d1 = direction_from_angle(h1);

    let p1 = start.position;
    let p2 = end.position;
    let mut chord = p2 - p1;
    chord.y = 0.0;
    let dist = chord.norm();
    if round_to(dist, 3) == 0.0 {
        return None;
    }

    // Turning right when the end point lies on the right of the start heading
    let clockwise = chord.dot(&left_of(&d1)) < 0.0;

    let tau = 2.0 * PI;
    let (start_angle, end_angle) = if clockwise {
        let mut a = (h1 + FRAC_PI_2) % tau;
        let b = (h2 + FRAC_PI_2) % tau;
        if a < b {
            a += tau;
        }
        (a, b)
    } else {
        let a = (h1 - FRAC_PI_2) % tau;
        let mut b = (h2 - FRAC_PI_2) % tau;
        if b < a {
            b += tau;
        }
        (a, b)
    };

    let sweep = (end_angle - start_angle).abs();
    let half_sin = (sweep / 2.0).sin();
    if sweep < 1e-9 || half_sin.abs() < 1e-9 {
        return None;
    }
    let radius = dist / 2.0 / half_sin;

    let inward = if clockwise { right_of(&d1) } else { left_of(&d1) };
    let mut center = p1 + inward * radius;
    center.y = 0.5 * (p1.y + p2.y);

    let points = sample_arc(&center, radius, start_angle, end_angle, clockwise, step_degrees, p1.y, p2.y);
    if points.len() < 2 {
        return None;
    }

    Some(ArcGeometry {
        radius,
        center,
        start_angle,
        end_angle,
        clockwise,
        points,
    })
}

#[allow(clippy::too_many_arguments)]
fn sample_arc(
    center: &Point3<f64>,
    radius: f64,
    start_angle: f64,
    end_angle: f64,
    clockwise: bool,
    step_degrees: f64,
    start_height: f64,
    end_height: f64,
) -> Vec<Point3<f64>> {
    let step = step_degrees.max(1e-3).to_radians();
    let sweep = (end_angle - start_angle).abs();
    let sign = if clockwise { -1.0 } else { 1.0 };
    let at = |angle: f64| {
        let fraction = ((angle - start_angle).abs() / sweep).clamp(0.0, 1.0);
        let mut p = center + direction_from_angle(angle) * radius;
        p.y = start_height + (end_height - start_height) * fraction;
        p
    };

    let full_steps = (sweep / step + 1e-9).floor() as usize;
    let mut points: Vec<Point3<f64>> = (0..=full_steps)
        .map(|k| at(start_angle + sign * step * k as f64))
        .collect();
    if (full_steps as f64 * step - sweep).abs() > 1e-9 {
        points.push(at(end_angle));
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_4;

    #[test]
    fn test_quarter_turn_left() {
        // 10 m chord with a 90° heading change
        let r = 10.0 / (2.0 * FRAC_PI_4.sin());
        let start = ArcControlPoint::new(Point3::origin(), 0.0);
        let end = ArcControlPoint::new(Point3::new(r, 0.0, r), FRAC_PI_2);
        let arc = solve_arc(&start, &end, 2.0).unwrap();

        assert!(!arc.clockwise);
        assert_relative_eq!(arc.radius, 7.0710678, epsilon = 1e-6);
        assert_relative_eq!(arc.center, Point3::new(r, 0.0, 0.0), epsilon = 1e-9);
        assert_relative_eq!(arc.sweep(), FRAC_PI_2, epsilon = 1e-12);
        assert_eq!(arc.points.len(), 46);

        let first = arc.points.first().unwrap();
        let last = arc.points.last().unwrap();
        assert!((first - start.position).norm() < 1e-3);
        assert!((last - end.position).norm() < 1e-3);
        for p in &arc.points {
            assert_relative_eq!((p - arc.center).norm(), arc.radius, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_quarter_turn_right() {
        let r = 10.0 / (2.0 * FRAC_PI_4.sin());
        let start = ArcControlPoint::new(Point3::origin(), 0.0);
        let end = ArcControlPoint::new(Point3::new(-r, 0.0, r), -FRAC_PI_2);
        let arc = solve_arc(&start, &end, 2.0).unwrap();

        assert!(arc.clockwise);
        assert_relative_eq!(arc.center, Point3::new(-r, 0.0, 0.0), epsilon = 1e-9);
        let last = arc.points.last().unwrap();
        assert!((last - end.position).norm() < 1e-3);
        assert!(arc.start_angle > arc.end_angle);
    }

    #[test]
    fn test_uneven_step_appends_end() {
        let r = 20.0;
        let start = ArcControlPoint::new(Point3::origin(), 0.0);
        // 45° sweep with a 2° step leaves a 1° remainder
        let sweep = FRAC_PI_4;
        let end_pos = Point3::new(r - r * sweep.cos(), 1.0, r * sweep.sin());
        let arc = solve_arc(&start, &ArcControlPoint::new(end_pos, sweep), 2.0).unwrap();
        assert_eq!(arc.points.len(), 24);
        assert!((arc.points.last().unwrap() - end_pos).norm() < 1e-6);
        assert_relative_eq!(arc.points.last().unwrap().y, 1.0);
    }

    #[test]
    fn test_coincident_points_unresolvable() {
        let start = ArcControlPoint::new(Point3::new(1.0, 0.0, 1.0), 0.0);
        let end = ArcControlPoint::new(Point3::new(1.0002, 0.0, 1.0), 1.0);
        assert!(solve_arc(&start, &end, 2.0).is_none());
    }

    #[test]
    fn test_parallel_headings_unresolvable() {
        let start = ArcControlPoint::new(Point3::origin(), 0.0);
        let end = ArcControlPoint::new(Point3::new(0.0, 0.0, 10.0), 0.0);
        assert!(solve_arc(&start, &end, 2.0).is_none());
        assert!(matches!(ArcGeometry::solve(&start, &end, 2.0), Err(Error::UnresolvableArc)));
    }
}
