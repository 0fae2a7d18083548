// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Painted boundary lines.
//!
//! A boundary's samples are smoothed into a Catmull-Rom curve, then each
//! painted line becomes a thin strip offset sideways from that curve. Dashed
//! lines only produce geometry over their painted spans.

use nalgebra::Point3;
use roadnet_core::{BoundaryStyle, EngineConfig, LinePattern};

use crate::curve::Curve3;
use crate::frame::{right_of, unit_or, up};
use crate::mesh::Mesh;
use crate::{Error, Result};

/// Samples per metre of a dash.
const DASH_SAMPLE_SPACING: f64 = 1.0;

/// Which line of a boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineSlot {
    First,
    Second,
}

impl LineSlot {
    pub fn index(self) -> usize {
        match self {
            LineSlot::First => 0,
            LineSlot::Second => 1,
        }
    }
}

/// One rasterized line.
#[derive(Debug, Clone)]
pub struct BoundaryLine {
    pub pattern: LinePattern,
    pub mesh: Mesh,
    /// Painted `(start, end)` stations along the boundary, in metres.
    pub spans: Vec<(f64, f64)>,
}

impl BoundaryLine {
    /// Total painted length.
    pub fn painted_length(&self) -> f64 {
        self.spans.iter().map(|(a, b)| b - a).sum()
    }
}

/// Both lines of a boundary; a single line uses `first` only.
#[derive(Debug, Clone, Default)]
pub struct BoundaryLines {
    pub first: Option<BoundaryLine>,
    pub second: Option<BoundaryLine>,
}

impl BoundaryLines {
    pub fn is_empty(&self) -> bool {
        self.first.is_none() && self.second.is_none()
    }

    pub fn get(&self, slot: LineSlot) -> Option<&BoundaryLine> {
        match slot {
            LineSlot::First => self.first.as_ref(),
            LineSlot::Second => self.second.as_ref(),
        }
    }

    pub fn set(&mut self, slot: LineSlot, line: Option<BoundaryLine>) {
        match slot {
            LineSlot::First => self.first = line,
            LineSlot::Second => self.second = line,
        }
    }
}

/// Turns boundary samples and a decoded style into strip meshes.
#[derive(Debug, Clone, Copy)]
pub struct BoundaryRasterizer<'c> {
    config: &'c EngineConfig,
}

impl<'c> BoundaryRasterizer<'c> {
    pub fn new(config: &'c EngineConfig) -> Self {
        Self { config }
    }

    /// Rasterize every line of `style`. A style without lines yields no
    /// geometry and no error.
    pub fn rasterize(&self, points: &[Point3<f64>], style: &BoundaryStyle) -> Result<BoundaryLines> {
        let mut lines = BoundaryLines::default();
        if style.is_empty() {
            return Ok(lines);
        }
        let curve = self.guide(points)?;
        for slot in [LineSlot::First, LineSlot::Second] {
            lines.set(slot, self.line_on(&curve, points.len(), style, slot));
        }
        Ok(lines)
    }

    /// Rasterize a single line. `Ok(None)` when the style has no such line.
    pub fn rasterize_slot(
        &self,
        points: &[Point3<f64>],
        style: &BoundaryStyle,
        slot: LineSlot,
    ) -> Result<Option<BoundaryLine>> {
        if style.lines.get(slot.index()).is_none() {
            return Ok(None);
        }
        let curve = self.guide(points)?;
        Ok(self.line_on(&curve, points.len(), style, slot))
    }

    fn guide(&self, points: &[Point3<f64>]) -> Result<Curve3> {
        if points.len() < 2 {
            return Err(Error::InsufficientSamples {
                needed: 2,
                found: points.len(),
            });
        }
        Curve3::catmull_rom(points.to_vec(), self.config.curve_kind, self.config.spline_tension)
    }

    fn line_on(&self, curve: &Curve3, samples: usize, style: &BoundaryStyle, slot: LineSlot) -> Option<BoundaryLine> {
        let pattern = *style.lines.get(slot.index())?;
        let lateral = self.lateral_extent(style.is_double(), slot);
        let line = match pattern {
            LinePattern::Solid => solid_strip(curve, samples.saturating_sub(1).max(1), lateral),
            LinePattern::Dashed => dashed_strip(
                curve,
                self.config.mark_unit_length,
                self.config.mark_gap_length,
                lateral,
            ),
        };
        Some(BoundaryLine {
            pattern,
            mesh: line.0,
            spans: line.1,
        })
    }

    /// Offsets of the strip edges along the rightward vector, lowest first.
    fn lateral_extent(&self, double: bool, slot: LineSlot) -> (f64, f64) {
        let width = self.config.mark_width;
        let offset = self.config.mark_offset;
        match (double, slot) {
            (false, _) => (-width / 2.0, width / 2.0),
            (true, LineSlot::First) => (offset, offset + width),
            (true, LineSlot::Second) => (-offset - width, -offset),
        }
    }
}

fn push_station(mesh: &mut Mesh, curve: &Curve3, percent: f64, lateral: (f64, f64)) -> u32 {
    let sample = curve.sample_at(percent);
    let right = right_of(&sample.tangent);
    let normal = unit_or(right.cross(&sample.tangent), up());
    let first = mesh.add_vertex(sample.position + right * lateral.0, normal);
    mesh.add_vertex(sample.position + right * lateral.1, normal);
    first
}

fn add_quad(mesh: &mut Mesh, first: u32) {
    let (a, b, c, d) = (first, first + 1, first + 2, first + 3);
    mesh.add_triangle(a, b, d);
    mesh.add_triangle(a, d, c);
}

fn solid_strip(curve: &Curve3, segments: usize, lateral: (f64, f64)) -> (Mesh, Vec<(f64, f64)>) {
    let mut mesh = Mesh::with_capacity((segments + 1) * 2, segments * 6);
    for i in 0..=segments {
        let first = push_station(&mut mesh, curve, i as f64 / segments as f64, lateral);
        if i < segments {
            add_quad(&mut mesh, first);
        }
    }
    (mesh, vec![(0.0, curve.length())])
}

fn dashed_strip(curve: &Curve3, unit: f64, gap: f64, lateral: (f64, f64)) -> (Mesh, Vec<(f64, f64)>) {
    let length = curve.length();
    let period = (unit + gap).max(1e-3);
    let mut mesh = Mesh::new();
    let mut spans = Vec::new();
    let mut start = 0.0;
    while start < length - 1e-9 {
        let end = (start + unit).min(length);
        let pieces = ((end - start) / DASH_SAMPLE_SPACING).ceil().max(1.0) as usize;
        for j in 0..=pieces {
            let station = start + (end - start) * j as f64 / pieces as f64;
            let first = push_station(&mut mesh, curve, station / length, lateral);
            if j < pieces {
                add_quad(&mut mesh, first);
            }
        }
        spans.push((start, end));
        start += period;
    }
    (mesh, spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use roadnet_core::style::mask;

    fn straight(len: f64, samples: usize) -> Vec<Point3<f64>> {
        (0..samples)
            .map(|i| Point3::new(0.0, 0.0, len * i as f64 / (samples - 1) as f64))
            .collect()
    }

    #[test]
    fn test_zero_mask_is_empty() {
        let config = EngineConfig::default();
        let lines = BoundaryRasterizer::new(&config)
            .rasterize(&[], &BoundaryStyle::from_mask(0))
            .unwrap();
        assert!(lines.is_empty());
    }

    #[test]
    fn test_single_solid() {
        let config = EngineConfig::default();
        let points = straight(30.0, 4);
        let lines = BoundaryRasterizer::new(&config)
            .rasterize(&points, &BoundaryStyle::from_mask(mask::SINGLE_SOLID_WHITE))
            .unwrap();
        let first = lines.first.unwrap();
        assert!(lines.second.is_none());
        assert_eq!(first.pattern, LinePattern::Solid);
        assert_eq!(first.mesh.triangle_count(), 6);
        assert_relative_eq!(first.painted_length(), 30.0, epsilon = 1e-9);
        let (min, max) = first.mesh.bounds();
        assert_relative_eq!(max.x - min.x, 0.15, epsilon = 1e-6);
        for i in 0..first.mesh.triangle_count() {
            assert!(first.mesh.face_normal(i).unwrap().y > 0.0);
        }
    }

    #[test]
    fn test_dashed_on_ratio() {
        let config = EngineConfig::default();
        let points = straight(100.0, 11);
        let lines = BoundaryRasterizer::new(&config)
            .rasterize(&points, &BoundaryStyle::from_mask(mask::SINGLE_DASH_WHITE))
            .unwrap();
        let dashed = lines.first.unwrap();
        assert_eq!(dashed.spans.len(), 10);
        assert_relative_eq!(dashed.painted_length(), 40.0, epsilon = 1e-9);
        // every vertex lies on a painted span
        for chunk in dashed.mesh.positions.chunks_exact(3) {
            let z = chunk[2] as f64;
            assert!(dashed.spans.iter().any(|(a, b)| z >= a - 1e-3 && z <= b + 1e-3));
        }
        // four 1 m pieces per dash
        assert_eq!(dashed.mesh.triangle_count(), 10 * 4 * 2);
    }

    #[test]
    fn test_double_line_sides() {
        let config = EngineConfig::default();
        let points = straight(20.0, 3);
        let lines = BoundaryRasterizer::new(&config)
            .rasterize(&points, &BoundaryStyle::from_mask(mask::DOUBLE_SOLID_YELLOW))
            .unwrap();
        // boundary runs along +z, so its right is -x
        let (first_min, first_max) = lines.first.unwrap().mesh.bounds();
        assert_relative_eq!(first_max.x, -0.1, epsilon = 1e-6);
        assert_relative_eq!(first_min.x, -0.25, epsilon = 1e-6);
        let (second_min, second_max) = lines.second.unwrap().mesh.bounds();
        assert_relative_eq!(second_min.x, 0.1, epsilon = 1e-6);
        assert_relative_eq!(second_max.x, 0.25, epsilon = 1e-6);
    }

    #[test]
    fn test_single_slot_and_short_input() {
        let config = EngineConfig::default();
        let rasterizer = BoundaryRasterizer::new(&config);
        let style = BoundaryStyle::from_mask(mask::SINGLE_SOLID_WHITE);
        assert!(rasterizer
            .rasterize_slot(&straight(10.0, 2), &style, LineSlot::Second)
            .unwrap()
            .is_none());
        let err = rasterizer.rasterize(&[Point3::origin()], &style).unwrap_err();
        assert!(matches!(err, Error::InsufficientSamples { needed: 2, found: 1 }));
    }
}
