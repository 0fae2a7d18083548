// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Angle normalization.
//!
//! Public angles are degrees in `(-180, 180]`. Trigonometry happens in radians.

use std::f64::consts::PI;

/// Normalize degrees into `(-180, 180]`.
#[inline]
pub fn normalize_degrees(deg: f64) -> f64 {
    let mut d = deg % 360.0;
    if d > 180.0 {
        d -= 360.0;
    } else if d <= -180.0 {
        d += 360.0;
    }
    d
}

/// Normalize radians into `(-π, π]`.
#[inline]
pub fn normalize_radians(rad: f64) -> f64 {
    let tau = 2.0 * PI;
    let mut r = rad % tau;
    if r > PI {
        r -= tau;
    } else if r <= -PI {
        r += tau;
    }
    r
}

/// Absolute difference of two angles in degrees, folded into `[0, 180]`.
#[inline]
pub fn degree_delta(a: f64, b: f64) -> f64 {
    normalize_degrees(a - b).abs()
}

/// Round to a fixed number of decimals.
#[inline]
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    let rounded = (value * factor).round() / factor;
    // -0.0 would otherwise leak into ids and comparisons
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_normalize_degrees_range() {
        assert_relative_eq!(normalize_degrees(190.0), -170.0);
        assert_relative_eq!(normalize_degrees(-190.0), 170.0);
        assert_relative_eq!(normalize_degrees(180.0), 180.0);
        assert_relative_eq!(normalize_degrees(-180.0), 180.0);
        assert_relative_eq!(normalize_degrees(720.0 + 45.0), 45.0);
        assert_relative_eq!(normalize_degrees(0.0), 0.0);
    }

    #[test]
    fn test_normalize_radians_range() {
        assert_relative_eq!(normalize_radians(2.5 * PI), 0.5 * PI, epsilon = 1e-12);
        assert_relative_eq!(normalize_radians(-PI), PI, epsilon = 1e-12);
        assert_relative_eq!(normalize_radians(PI / 2.0 + 2.0 * PI), PI / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_degree_delta_wraps() {
        assert_relative_eq!(degree_delta(179.0, -179.0), 2.0, epsilon = 1e-12);
        assert_relative_eq!(degree_delta(10.0, 25.0), 15.0, epsilon = 1e-12);
    }

    #[test]
    fn test_round_to() {
        assert_relative_eq!(round_to(1.23456, 4), 1.2346);
        assert_relative_eq!(round_to(99.99951, 3), 100.0);
        assert_eq!(round_to(-0.00001, 3).to_bits(), 0.0f64.to_bits());
    }
}
