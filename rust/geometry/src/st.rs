// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Station/offset (ST) coordinates.
//!
//! `s` is the distance along a reference line and `t` the signed lateral
//! offset: positive on the left of the travel direction, negative on the
//! right. World angles are degrees in `(-180, 180]`, measured with
//! [`world_angle_deg`].

use std::f64::consts::FRAC_PI_2;

use nalgebra::{Point3, Vector3};
use roadnet_core::{normalize_degrees, EngineConfig};

use crate::curve::Curve3;
use crate::elevation::ElevationProfile;
use crate::frame::{right_of, rotate_about, unit_or, up, world_angle_deg};
use crate::Result;

/// Options for [`StResolver::locate`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LocateOptions {
    /// Tilt tangent and normal by the elevation slope.
    pub use_elevation_tangent: bool,
    /// Extrapolate along the end tangents for `s` outside `[0, length]`.
    pub cross_border: bool,
}

impl LocateOptions {
    pub fn cross_border() -> Self {
        Self {
            cross_border: true,
            ..Self::default()
        }
    }
}

/// A resolved ST placement.
#[derive(Debug, Clone, Copy)]
pub struct StLocation {
    /// Station actually used (clamped unless crossing the border).
    pub s: f64,
    pub t: f64,
    /// `s / length`; outside `[0, 1]` only when crossing the border.
    pub percent: f64,
    /// Point on the reference line.
    pub ref_point: Point3<f64>,
    /// Offset point.
    pub target_point: Point3<f64>,
    /// Unit tangent of the reference line.
    pub tangent: Vector3<f64>,
    /// Surface normal: the tangent turned 90° about its right vector.
    pub normal: Vector3<f64>,
    /// The requested station was outside the line and got clamped.
    pub clamped: bool,
}

impl StLocation {
    /// Ground-plane vector pointing to the right of the reference line.
    pub fn right(&self) -> Vector3<f64> {
        right_of(&self.tangent)
    }

    /// Heading of the tangent in degrees.
    pub fn tangent_angle(&self) -> f64 {
        world_angle_deg(&self.tangent)
    }
}

/// Inverse placement produced by [`StResolver::project`].
#[derive(Debug, Clone, Copy)]
pub struct StCoordinate {
    pub s: f64,
    pub t: f64,
    pub percent: f64,
}

/// Converts between ST coordinates and world positions on one reference line.
#[derive(Debug, Clone, Copy)]
pub struct StResolver<'a> {
    curve: &'a Curve3,
    elevation: Option<&'a ElevationProfile>,
}

impl<'a> StResolver<'a> {
    pub fn new(curve: &'a Curve3) -> Self {
        Self {
            curve,
            elevation: None,
        }
    }

    pub fn with_elevation(mut self, elevation: Option<&'a ElevationProfile>) -> Self {
        self.elevation = elevation;
        self
    }

    pub fn curve(&self) -> &'a Curve3 {
        self.curve
    }

    pub fn length(&self) -> f64 {
        self.curve.length()
    }

    /// World position, tangent and normal of `(s, t)`.
    pub fn locate(&self, s: f64, t: f64, options: LocateOptions) -> StLocation {
        let length = self.curve.length();
        let outside = s < 0.0 || s > length;

        let (valid_s, percent, mut ref_point, mut tangent) = if options.cross_border && outside {
            let tail = s > length;
            let end = if tail { 1.0 } else { 0.0 };
            let tangent = self.curve.tangent_at(end);
            let overrun = if tail { s - length } else { s };
            let ref_point = self.curve.point_at(end) + tangent * overrun;
            let percent = if length > 0.0 { s / length } else { 0.0 };
            (s, percent, ref_point, tangent)
        } else {
            let valid_s = s.clamp(0.0, length);
            let percent = if length > 0.0 { valid_s / length } else { 0.0 };
            (
                valid_s,
                percent,
                self.curve.point_at(percent),
                self.curve.tangent_at(percent),
            )
        };

        if let Some(profile) = self.elevation {
            let station = s.clamp(0.0, length);
            ref_point.y = profile.height_at(station);
            if options.use_elevation_tangent {
                let flat = unit_or(Vector3::new(tangent.x, 0.0, tangent.z), tangent);
                tangent = unit_or(
                    Vector3::new(flat.x, profile.slope_at(station), flat.z),
                    flat,
                );
            }
        }

        let right = right_of(&tangent);
        let normal = unit_or(rotate_about(&tangent, &right, FRAC_PI_2), up());
        let target_point = if t == 0.0 {
            ref_point
        } else {
            ref_point + right * -t
        };

        StLocation {
            s: valid_s,
            t,
            percent,
            ref_point,
            target_point,
            tangent,
            normal,
            clamped: outside && !options.cross_border,
        }
    }

    /// ST coordinates of a world point, by closest-point projection.
    pub fn project(&self, point: &Point3<f64>) -> StCoordinate {
        let projection = self.curve.project(point);
        let s = projection.percent * self.curve.length();
        StCoordinate {
            s,
            t: t_value(&projection.point, &projection.tangent, point),
            percent: projection.percent,
        }
    }
}

/// Locate `(s, t)` against a lane link given only by its sample points.
///
/// The samples are fitted with the configured Catmull-Rom curve; `s` is
/// clamped to the fitted length.
pub fn locate_on_lane_link(samples: &[Point3<f64>], s: f64, t: f64, config: &EngineConfig) -> Result<StLocation> {
    let curve = Curve3::catmull_rom(samples.to_vec(), config.curve_kind, config.spline_tension)?;
    Ok(StResolver::new(&curve).locate(s, t, LocateOptions::default()))
}

/// Signed lateral distance of `target` from `ref_point` on the ground plane:
/// positive on the left of `tangent`.
pub fn t_value(ref_point: &Point3<f64>, tangent: &Vector3<f64>, target: &Point3<f64>) -> f64 {
    let dz = target.z - ref_point.z;
    let dx = target.x - ref_point.x;
    let dist = (dx * dx + dz * dz).sqrt();
    // 2D cross of (target - ref) with the tangent, both as (z, x)
    let cross = dz * tangent.x - dx * tangent.z;
    if cross >= 0.0 {
        -dist
    } else {
        dist
    }
}

/// Point one metre away from `point` in the direction obtained by turning
/// `tangent` by `yaw_deg`.
///
/// Without elevation the tangent is flattened and turned about world up;
/// with elevation it is turned about the slope normal.
pub fn look_at_by_yaw(point: &Point3<f64>, tangent: &Vector3<f64>, yaw_deg: f64, use_elevation: bool) -> Point3<f64> {
    let (direction, axis) = if use_elevation {
        let right = right_of(tangent);
        let normal = unit_or(rotate_about(tangent, &right, FRAC_PI_2), up());
        (*tangent, normal)
    } else {
        (Vector3::new(tangent.x, 0.0, tangent.z), up())
    };
    let turned = unit_or(rotate_about(&direction, &axis, yaw_deg.to_radians()), Vector3::z());
    point + turned
}

/// Point one metre away from `point` along the world heading `angle_deg`.
pub fn look_at_by_angle(point: &Point3<f64>, angle_deg: f64) -> Point3<f64> {
    let direction = rotate_about(&Vector3::z(), &up(), angle_deg.to_radians());
    point + direction
}

/// Yaw, relative to `tangent`, of an object facing world heading `angle_deg`.
pub fn yaw_in_junction(tangent: &Vector3<f64>, angle_deg: f64) -> f64 {
    normalize_degrees(angle_deg - world_angle_deg(tangent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use roadnet_core::{CurveKind, ElevationRecord, EngineConfig};

    fn straight_along_z(len: f64) -> Curve3 {
        Curve3::catmull_rom(
            vec![Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 0.0, len)],
            CurveKind::Centripetal,
            0.5,
        )
        .unwrap()
    }

    #[test]
    fn test_locate_left_and_right() {
        let curve = straight_along_z(100.0);
        let resolver = StResolver::new(&curve);
        let left = resolver.locate(50.0, 3.0, LocateOptions::default());
        assert_relative_eq!(left.target_point, Point3::new(3.0, 0.0, 50.0), epsilon = 1e-6);
        let right = resolver.locate(50.0, -3.0, LocateOptions::default());
        assert_relative_eq!(right.target_point, Point3::new(-3.0, 0.0, 50.0), epsilon = 1e-6);
        assert_relative_eq!(right.normal, Vector3::y(), epsilon = 1e-9);
        assert_relative_eq!(right.percent, 0.5, epsilon = 1e-12);
        assert!(!right.clamped);
    }

    #[test]
    fn test_locate_clamps_without_cross_border() {
        let curve = straight_along_z(100.0);
        let resolver = StResolver::new(&curve);
        let loc = resolver.locate(120.0, 0.0, LocateOptions::default());
        assert!(loc.clamped);
        assert_relative_eq!(loc.s, 100.0);
        assert_relative_eq!(loc.ref_point.z, 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_locate_cross_border_extrapolates() {
        let curve = straight_along_z(100.0);
        let resolver = StResolver::new(&curve);
        let after = resolver.locate(105.0, 1.0, LocateOptions::cross_border());
        assert_relative_eq!(after.ref_point, Point3::new(0.0, 0.0, 105.0), epsilon = 1e-6);
        assert_relative_eq!(after.target_point, Point3::new(1.0, 0.0, 105.0), epsilon = 1e-6);
        assert_relative_eq!(after.percent, 1.05, epsilon = 1e-12);
        let before = resolver.locate(-4.0, 0.0, LocateOptions::cross_border());
        assert_relative_eq!(before.ref_point, Point3::new(0.0, 0.0, -4.0), epsilon = 1e-6);
        assert!(!before.clamped);
    }

    #[test]
    fn test_round_trip_on_curved_line() {
        let curve = Curve3::catmull_rom(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(15.0, 0.0, 40.0),
                Point3::new(0.0, 0.0, 80.0),
                Point3::new(-20.0, 0.0, 110.0),
            ],
            CurveKind::Centripetal,
            0.5,
        )
        .unwrap();
        let resolver = StResolver::new(&curve);
        for &(s, t) in &[(10.0, 2.0), (37.5, -3.5), (60.0, 1.25), (100.0, -0.5)] {
            let loc = resolver.locate(s, t, LocateOptions::default());
            let back = resolver.project(&loc.target_point);
            assert_relative_eq!(back.s, s, epsilon = 1e-3);
            assert_relative_eq!(back.t, t, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_elevation_lifts_and_tilts() {
        let curve = straight_along_z(100.0);
        let profile = ElevationProfile::from_records(
            &[ElevationRecord { s: 0.0, h: 0.0 }, ElevationRecord { s: 100.0, h: 10.0 }],
            100.0,
            &EngineConfig::default(),
        )
        .unwrap();
        let resolver = StResolver::new(&curve).with_elevation(Some(&profile));
        let options = LocateOptions {
            use_elevation_tangent: true,
            ..LocateOptions::default()
        };
        let loc = resolver.locate(50.0, -2.0, options);
        assert_relative_eq!(loc.ref_point.y, 5.0, epsilon = 1e-6);
        assert_relative_eq!(loc.target_point.y, 5.0, epsilon = 1e-6);
        assert_relative_eq!(loc.tangent.y / loc.tangent.z, 0.1, epsilon = 1e-6);
        assert!(loc.normal.y > 0.99 && loc.normal.z < 0.0);
    }

    #[test]
    fn test_t_value_sign() {
        let ref_point = Point3::origin();
        let tangent = Vector3::z();
        assert_relative_eq!(t_value(&ref_point, &tangent, &Point3::new(2.0, 0.0, 0.0)), 2.0);
        assert_relative_eq!(t_value(&ref_point, &tangent, &Point3::new(-2.0, 0.0, 0.0)), -2.0);
    }

    #[test]
    fn test_look_at_helpers() {
        let p = Point3::new(1.0, 2.0, 3.0);
        let ahead = look_at_by_yaw(&p, &Vector3::z(), 0.0, false);
        assert_relative_eq!(ahead, Point3::new(1.0, 2.0, 4.0), epsilon = 1e-12);
        let left = look_at_by_yaw(&p, &Vector3::z(), 90.0, false);
        assert_relative_eq!(left, Point3::new(2.0, 2.0, 3.0), epsilon = 1e-12);
        let by_angle = look_at_by_angle(&p, 90.0);
        assert_relative_eq!(by_angle, left, epsilon = 1e-12);
        assert_relative_eq!(yaw_in_junction(&Vector3::x(), 0.0), -90.0, epsilon = 1e-9);
        assert_relative_eq!(yaw_in_junction(&Vector3::z(), 270.0), -90.0, epsilon = 1e-9);
    }

    #[test]
    fn test_locate_on_lane_link_samples() {
        let samples = [Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 0.0, 20.0)];
        let config = EngineConfig::default();
        let location = locate_on_lane_link(&samples, 5.0, -1.0, &config).unwrap();
        assert_relative_eq!(location.target_point, Point3::new(-1.0, 0.0, 5.0), epsilon = 1e-6);
        let end = locate_on_lane_link(&samples, 30.0, 0.0, &config).unwrap();
        assert!(end.clamped);
        assert!(locate_on_lane_link(&samples[..1], 0.0, 0.0, &config).is_err());
    }
}
