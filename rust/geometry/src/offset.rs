// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Points running parallel to a reference line.

use std::ops::RangeInclusive;

use nalgebra::Point3;

use crate::curve::Curve3;
use crate::elevation::ElevationProfile;
use crate::st::{LocateOptions, StResolver};

/// Side of the reference line, seen along the travel direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Signed `t` for an unsigned lateral distance.
    #[inline]
    pub fn signed(self, distance: f64) -> f64 {
        match self {
            Side::Left => distance.abs(),
            Side::Right => -distance.abs(),
        }
    }
}

/// `segments + 1` points at lateral distance `offset` on `side`, evenly
/// spaced over the percent `range` of `curve`.
pub fn parallel_samples(
    curve: &Curve3,
    offset: f64,
    side: Side,
    range: RangeInclusive<f64>,
    segments: usize,
    elevation: Option<&ElevationProfile>,
) -> Vec<Point3<f64>> {
    let segments = segments.max(1);
    let (start, end) = (range.start().clamp(0.0, 1.0), range.end().clamp(0.0, 1.0));
    let resolver = StResolver::new(curve).with_elevation(elevation);
    let length = curve.length();
    let t = side.signed(offset);
    (0..=segments)
        .map(|i| {
            let percent = start + (end - start) * i as f64 / segments as f64;
            resolver
                .locate(percent * length, t, LocateOptions::default())
                .target_point
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use roadnet_core::CurveKind;

    #[test]
    fn test_parallel_to_straight_line() {
        let curve = Curve3::catmull_rom(
            vec![Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 0.0, 40.0)],
            CurveKind::Centripetal,
            0.5,
        )
        .unwrap();
        let right = parallel_samples(&curve, 1.75, Side::Right, 0.25..=0.75, 4, None);
        assert_eq!(right.len(), 5);
        assert_relative_eq!(right[0], Point3::new(-1.75, 0.0, 10.0), epsilon = 1e-6);
        assert_relative_eq!(right[4], Point3::new(-1.75, 0.0, 30.0), epsilon = 1e-6);

        let left = parallel_samples(&curve, 1.75, Side::Left, 0.0..=1.0, 2, None);
        assert_relative_eq!(left[1], Point3::new(1.75, 0.0, 20.0), epsilon = 1e-6);
    }

    #[test]
    fn test_side_sign() {
        assert_eq!(Side::Left.signed(-2.0), 2.0);
        assert_eq!(Side::Right.signed(2.0), -2.0);
    }
}
