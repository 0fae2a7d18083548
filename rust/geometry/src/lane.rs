// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Lane cross-sections: surface strips between two boundaries and width
//! trend detection.

use nalgebra::Point3;
use roadnet_core::round_to;

use crate::frame::{unit_or, up};
use crate::mesh::Mesh;

/// How a lane's width evolves over its section.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WidthTrend {
    /// Head and tail widths agree within the deviation threshold.
    Uniform,
    /// The lane tapers. `extends` is true when it widens towards the tail.
    Transition { extends: bool },
}

/// Width summary of a lane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaneWidth {
    /// Average width for uniform lanes, the wider end for transitions.
    pub normal_width: f64,
    pub head_width: f64,
    pub tail_width: f64,
    pub trend: WidthTrend,
}

impl LaneWidth {
    pub fn is_transition(&self) -> bool {
        matches!(self.trend, WidthTrend::Transition { .. })
    }
}

/// Compare the boundary distance at the section head and tail.
///
/// Returns `None` when either boundary has no samples.
pub fn classify_width(left: &[Point3<f64>], right: &[Point3<f64>], deviation: f64) -> Option<LaneWidth> {
    let head_width = round_to((left.first()? - right.first()?).norm(), 3);
    let tail_width = round_to((left.last()? - right.last()?).norm(), 3);
    let (normal_width, trend) = if (head_width - tail_width).abs() <= deviation {
        (round_to(0.5 * (head_width + tail_width), 3), WidthTrend::Uniform)
    } else {
        (
            head_width.max(tail_width),
            WidthTrend::Transition {
                extends: tail_width > head_width,
            },
        )
    };
    Some(LaneWidth {
        normal_width,
        head_width,
        tail_width,
        trend,
    })
}

/// Triangulate the strip between a lane's left and right boundary samples.
///
/// Stations are paired by index. Each consecutive pair of stations gives one
/// quad of two up-facing triangles. `u` runs along the lane in metres of
/// midline length and `v` across it from 0 (left) to 1 (right). Returns
/// `None` for fewer than two stations.
pub fn build_lane_mesh(left: &[Point3<f64>], right: &[Point3<f64>]) -> Option<Mesh> {
    let n = left.len().min(right.len());
    if n < 2 {
        return None;
    }

    let mid: Vec<Point3<f64>> = (0..n).map(|i| nalgebra::center(&left[i], &right[i])).collect();
    let mut mesh = Mesh::with_capacity(n * 2, (n - 1) * 6);
    let mut u = 0.0;
    for i in 0..n {
        if i > 0 {
            u += (mid[i] - mid[i - 1]).norm();
        }
        let along = if i + 1 < n { mid[i + 1] - mid[i] } else { mid[i] - mid[i - 1] };
        let across = right[i] - left[i];
        let mut normal = unit_or(across.cross(&along), up());
        if normal.y < 0.0 {
            normal = -normal;
        }
        mesh.add_vertex_uv(left[i], normal, [u, 0.0]);
        mesh.add_vertex_uv(right[i], normal, [u, 1.0]);
    }

    for i in 0..n as u32 - 1 {
        let (a, b, c, d) = (2 * i, 2 * i + 1, 2 * i + 2, 2 * i + 3);
        mesh.add_triangle(a, b, d);
        mesh.add_triangle(a, d, c);
    }
    Some(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Lane running along +z between x = +w/2 (left) and x = -w/2 (right).
    fn straight_lane(stations: usize, head: f64, tail: f64) -> (Vec<Point3<f64>>, Vec<Point3<f64>>) {
        let (mut left, mut right) = (Vec::new(), Vec::new());
        for i in 0..stations {
            let f = i as f64 / (stations - 1) as f64;
            let w = head + (tail - head) * f;
            left.push(Point3::new(w / 2.0, 0.0, 10.0 * i as f64));
            right.push(Point3::new(-w / 2.0, 0.0, 10.0 * i as f64));
        }
        (left, right)
    }

    #[test]
    fn test_triangle_count() {
        for stations in [2, 3, 11] {
            let (left, right) = straight_lane(stations, 3.5, 3.5);
            let mesh = build_lane_mesh(&left, &right).unwrap();
            assert_eq!(mesh.triangle_count(), 2 * (stations - 1));
            assert_eq!(mesh.vertex_count(), 2 * stations);
        }
    }

    #[test]
    fn test_faces_point_up() {
        let (left, right) = straight_lane(4, 3.5, 3.0);
        let mesh = build_lane_mesh(&left, &right).unwrap();
        for i in 0..mesh.triangle_count() {
            assert!(mesh.face_normal(i).unwrap().y > 0.0);
        }
    }

    #[test]
    fn test_uvs() {
        let (left, right) = straight_lane(3, 3.5, 3.5);
        let mesh = build_lane_mesh(&left, &right).unwrap();
        assert_eq!(mesh.uvs, vec![0.0, 0.0, 0.0, 1.0, 10.0, 0.0, 10.0, 1.0, 20.0, 0.0, 20.0, 1.0]);
    }

    #[test]
    fn test_too_few_stations_skipped() {
        let (left, right) = straight_lane(2, 3.5, 3.5);
        assert!(build_lane_mesh(&left[..1], &right[..1]).is_none());
        assert!(build_lane_mesh(&[], &[]).is_none());
    }

    #[test]
    fn test_uniform_width() {
        let (left, right) = straight_lane(5, 3.5, 3.8);
        let width = classify_width(&left, &right, 0.5).unwrap();
        assert_eq!(width.trend, WidthTrend::Uniform);
        assert_relative_eq!(width.normal_width, 3.65);
    }

    #[test]
    fn test_transition_width() {
        let (left, right) = straight_lane(5, 0.0, 3.5);
        let widening = classify_width(&left, &right, 0.5).unwrap();
        assert_eq!(widening.trend, WidthTrend::Transition { extends: true });
        assert_relative_eq!(widening.normal_width, 3.5);

        let (left, right) = straight_lane(5, 3.5, 0.2);
        let narrowing = classify_width(&left, &right, 0.5).unwrap();
        assert_eq!(narrowing.trend, WidthTrend::Transition { extends: false });
        assert!(narrowing.is_transition());
    }
}
