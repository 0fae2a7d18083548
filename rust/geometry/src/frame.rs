// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! World frame conventions.
//!
//! The world is y-up with the ground on the x/z plane. A heading angle θ
//! (radians) points along `(sin θ, 0, cos θ)`, so growing angles turn left.

use nalgebra::{Point3, Rotation3, Unit, Vector3};
use roadnet_core::MapPoint;

/// World up axis.
#[inline]
pub fn up() -> Vector3<f64> {
    Vector3::y()
}

/// Convert a map-file point (ground x/y, height z) to the world frame.
#[inline]
pub fn world_point(p: &MapPoint) -> Point3<f64> {
    let [x, y, z] = p.to_world();
    Point3::new(x, y, z)
}

/// Heading of a direction on the ground plane, in radians.
#[inline]
pub fn world_angle(dir: &Vector3<f64>) -> f64 {
    dir.x.atan2(dir.z)
}

/// Heading of a direction on the ground plane, in degrees.
#[inline]
pub fn world_angle_deg(dir: &Vector3<f64>) -> f64 {
    world_angle(dir).to_degrees()
}

/// Unit ground direction for a heading in radians.
#[inline]
pub fn direction_from_angle(rad: f64) -> Vector3<f64> {
    Vector3::new(rad.sin(), 0.0, rad.cos())
}

/// Ground-plane unit vector to the right of `tangent`.
#[inline]
pub fn right_of(tangent: &Vector3<f64>) -> Vector3<f64> {
    Vector3::new(-tangent.z, 0.0, tangent.x)
        .try_normalize(1e-12)
        .unwrap_or_else(Vector3::x)
}

/// Ground-plane unit vector to the left of `tangent`.
#[inline]
pub fn left_of(tangent: &Vector3<f64>) -> Vector3<f64> {
    -right_of(tangent)
}

/// Rotate `v` around `axis` by `rad` (right-handed).
#[inline]
pub fn rotate_about(v: &Vector3<f64>, axis: &Vector3<f64>, rad: f64) -> Vector3<f64> {
    match Unit::try_new(*axis, 1e-12) {
        Some(axis) => Rotation3::from_axis_angle(&axis, rad) * v,
        None => *v,
    }
}

/// Horizontal distance between two points.
#[inline]
pub fn ground_distance(a: &Point3<f64>, b: &Point3<f64>) -> f64 {
    ((a.x - b.x).powi(2) + (a.z - b.z).powi(2)).sqrt()
}

/// Normalize, falling back to `fallback` for zero-length input.
#[inline]
pub fn unit_or(v: Vector3<f64>, fallback: Vector3<f64>) -> Vector3<f64> {
    v.try_normalize(1e-12).unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_map_to_world_axes() {
        let p = world_point(&MapPoint::new(1.0, 2.0, 3.0));
        assert_eq!(p, Point3::new(2.0, 3.0, 1.0));
    }

    #[test]
    fn test_heading_turns_left() {
        let forward = direction_from_angle(0.0);
        let left = direction_from_angle(FRAC_PI_2);
        assert_relative_eq!(forward, Vector3::z(), epsilon = 1e-12);
        assert_relative_eq!(left, left_of(&forward), epsilon = 1e-12);
        assert_relative_eq!(right_of(&forward), -Vector3::x(), epsilon = 1e-12);
        assert_relative_eq!(world_angle(&left), FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn test_rotate_about_up_matches_heading() {
        let rotated = rotate_about(&Vector3::z(), &up(), FRAC_PI_2);
        assert_relative_eq!(rotated, Vector3::x(), epsilon = 1e-12);
    }
}
