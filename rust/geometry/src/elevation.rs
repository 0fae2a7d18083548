// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Height along a reference line.
//!
//! The profile is a Catmull-Rom curve in the (s, height) plane, stored as
//! `(x = s, y = height, z = 0)` so it shares the centerline machinery.

use nalgebra::Point3;
use roadnet_core::{ElevationRecord, EngineConfig};

use crate::curve::Curve3;
use crate::Result;

const BISECTION_STEPS: usize = 60;

#[derive(Debug, Clone)]
enum Shape {
    Flat,
    Curve(Curve3),
}

/// Road height as a function of station `s`.
#[derive(Debug, Clone)]
pub struct ElevationProfile {
    shape: Shape,
    length: f64,
}

impl ElevationProfile {
    /// Zero height over `[0, length]`.
    pub fn flat(length: f64) -> Self {
        Self {
            shape: Shape::Flat,
            length,
        }
    }

    /// Profile through `(s, h)` records. The first record is pinned to `s = 0`
    /// and the last one to `s = road_length`. Fewer than two records give a
    /// flat profile.
    pub fn from_records(records: &[ElevationRecord], road_length: f64, config: &EngineConfig) -> Result<Self> {
        if records.len() < 2 || road_length <= 0.0 {
            return Ok(Self::flat(road_length));
        }
        let last = records.len() - 1;
        let points: Vec<Point3<f64>> = records
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let s = match i {
                    0 => 0.0,
                    i if i == last => road_length,
                    _ => r.s,
                };
                Point3::new(s, r.h, 0.0)
            })
            .collect();
        let curve = Curve3::catmull_rom(points, config.curve_kind, config.spline_tension)?;
        Ok(Self {
            shape: Shape::Curve(curve),
            length: road_length,
        })
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn is_flat(&self) -> bool {
        matches!(self.shape, Shape::Flat)
    }

    /// Curve percent whose station equals `s`.
    fn percent_at(curve: &Curve3, s: f64) -> f64 {
        let (mut lo, mut hi) = (0.0, 1.0);
        for _ in 0..BISECTION_STEPS {
            let mid = 0.5 * (lo + hi);
            if curve.point_at(mid).x < s {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        0.5 * (lo + hi)
    }

    /// Height at station `s`, clamped to the profile range.
    pub fn height_at(&self, s: f64) -> f64 {
        match &self.shape {
            Shape::Flat => 0.0,
            Shape::Curve(curve) => {
                let s = s.clamp(0.0, self.length);
                curve.point_at(Self::percent_at(curve, s)).y
            }
        }
    }

    /// Rise over run at station `s`.
    pub fn slope_at(&self, s: f64) -> f64 {
        match &self.shape {
            Shape::Flat => 0.0,
            Shape::Curve(curve) => {
                let s = s.clamp(0.0, self.length);
                let tangent = curve.tangent_at(Self::percent_at(curve, s));
                if tangent.x.abs() < 1e-12 {
                    0.0
                } else {
                    tangent.y / tangent.x
                }
            }
        }
    }
}
