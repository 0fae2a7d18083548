// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Junction surfaces and generated lane-link curves.
//!
//! A junction's outline is built from the ends of the roads it connects.
//! Ends are ordered by angle around a robust centre, then every pair of
//! neighbouring ends is joined with a cubic Bézier edge leaving each end
//! along the road direction. The closed outline is triangulated on the
//! ground plane.

use std::f64::consts::TAU;

use nalgebra::{Point3, Vector3};

use crate::curve::Curve3;
use crate::frame::{unit_or, up};
use crate::mesh::Mesh;
use crate::spline::CubicBezier;
use crate::triangulation::triangulate_ground;
use crate::{Error, Result};

/// End points closer than this are treated as the same point.
const COINCIDENT_EPSILON: f64 = 1e-3;

/// The end of a road where it enters a junction.
#[derive(Debug, Clone)]
pub struct RefRoadEnd<K> {
    pub road: K,
    /// The junction touches the road's tail (percent 1) rather than its head.
    pub is_tail: bool,
    /// Lanes of the forward direction (negative lane ids).
    pub forward: bool,
    /// Ground-plane unit vector at the road end pointing into the junction.
    pub along: Vector3<f64>,
    /// Outermost lane boundary point on the left (larger `t`).
    pub left: Point3<f64>,
    /// Outermost lane boundary point on the right (smaller `t`).
    pub right: Point3<f64>,
}

impl<K> RefRoadEnd<K> {
    fn ground_mid(&self) -> Point3<f64> {
        Point3::new(
            0.5 * (self.left.x + self.right.x),
            0.0,
            0.5 * (self.left.z + self.right.z),
        )
    }

    /// Start of the outline edge leaving this end.
    fn leaving_point(&self) -> Point3<f64> {
        if self.is_tail {
            self.left
        } else {
            self.right
        }
    }

    /// End of the outline edge arriving at this end.
    fn arriving_point(&self) -> Point3<f64> {
        if self.is_tail {
            self.right
        } else {
            self.left
        }
    }
}

/// Triangulated junction outline.
#[derive(Debug, Clone)]
pub struct JunctionSurface {
    /// Closed outline without a repeated first point.
    pub outline: Vec<Point3<f64>>,
    pub mesh: Mesh,
}

/// Cubic Bézier from `p1` to `p2` whose inner control points sit at
/// `ratio` times the chord length along each end direction.
pub fn bezier_with_directions(
    p1: Point3<f64>,
    direction1: &Vector3<f64>,
    p2: Point3<f64>,
    direction2: &Vector3<f64>,
    ratio: f64,
) -> CubicBezier {
    let reach = (p2 - p1).norm() * ratio;
    let c1 = p1 + unit_or(*direction1, Vector3::zeros()) * reach;
    let c2 = p2 + unit_or(*direction2, Vector3::zeros()) * reach;
    CubicBezier::new(p1, c1, c2, p2)
}

/// Sort road ends by angle around the centre of the junction.
///
/// The centre is the mean of the midpoints of ground Bézier curves joining
/// every pair of end midpoints, which stays inside the junction even for
/// strongly curved approaches.
pub fn sort_road_ends<K>(ends: &mut [RefRoadEnd<K>], ratio: f64) {
    if ends.len() < 2 {
        return;
    }
    let mids: Vec<Point3<f64>> = ends.iter().map(RefRoadEnd::ground_mid).collect();
    let ground = |v: &Vector3<f64>| Vector3::new(v.x, 0.0, v.z);
    let mut centre = Vector3::zeros();
    let mut count = 0usize;
    for i in 0..ends.len() {
        for j in i + 1..ends.len() {
            let bezier = bezier_with_directions(mids[i], &ground(&ends[i].along), mids[j], &ground(&ends[j].along), ratio);
            let middle = match Curve3::bezier(bezier) {
                Ok(curve) => curve.point_at(0.5),
                Err(_) => nalgebra::center(&mids[i], &mids[j]),
            };
            centre += middle.coords;
            count += 1;
        }
    }
    let centre = Point3::from(centre / count as f64);

    let angle = |end: &RefRoadEnd<K>| {
        let p = end.ground_mid();
        let a = (p.z - centre.z).atan2(p.x - centre.x);
        if a < 0.0 {
            a + TAU
        } else {
            a
        }
    };
    ends.sort_by(|a, b| angle(a).total_cmp(&angle(b)));
}

/// Sampled outline edges between consecutive (already sorted) road ends.
///
/// With more than two ends, edges whose end points coincide are dropped.
pub fn outline_edges<K>(ends: &[RefRoadEnd<K>], segments: usize, ratio: f64) -> Vec<Vec<Point3<f64>>> {
    let n = ends.len();
    let allow_close = n == 2;
    let mut edges = Vec::with_capacity(n);
    for i in 0..n {
        let current = &ends[i];
        let next = &ends[(i + 1) % n];
        let from = current.leaving_point();
        let to = next.arriving_point();
        if (to - from).norm() < COINCIDENT_EPSILON {
            if !allow_close {
                continue;
            }
            edges.push(vec![from]);
            continue;
        }
        let bezier = bezier_with_directions(from, &current.along, to, &next.along, ratio);
        match Curve3::bezier(bezier) {
            Ok(curve) => edges.push(curve.spaced_points(segments)),
            Err(_) => edges.push(vec![from, to]),
        }
    }
    edges
}

/// Build the junction surface from the road ends it connects.
pub fn build_junction_surface<K>(ends: &mut [RefRoadEnd<K>], segments: usize, ratio: f64) -> Result<JunctionSurface> {
    if ends.len() < 2 {
        return Err(Error::InsufficientSamples {
            needed: 2,
            found: ends.len(),
        });
    }
    sort_road_ends(ends, ratio);
    let ring: Vec<Point3<f64>> = outline_edges(ends, segments, ratio).into_iter().flatten().collect();
    let (outline, triangles) = triangulate_ground(&ring)?;

    let mut mesh = Mesh::with_capacity(outline.len(), triangles.len());
    for p in &outline {
        mesh.add_vertex_uv(*p, up(), [p.x, p.z]);
    }
    mesh.indices = triangles;
    Ok(JunctionSurface { outline, mesh })
}

/// Curve for a lane link that carries no samples of its own.
///
/// `from_dir` and `to_dir` are the ground directions at each lane end
/// pointing into the junction.
pub fn lane_link_curve(
    from: Point3<f64>,
    from_dir: &Vector3<f64>,
    to: Point3<f64>,
    to_dir: &Vector3<f64>,
    ratio: f64,
) -> Result<Curve3> {
    Curve3::bezier(bezier_with_directions(from, from_dir, to, to_dir, ratio))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Arm of a cross junction centred at the origin, lanes 4 m wide each side.
    fn arm(id: u32, heading_deg: f64) -> RefRoadEnd<u32> {
        // road arrives from far away along `-dir` and ends 10 m from the centre
        let a = heading_deg.to_radians();
        let dir = Vector3::new(a.sin(), 0.0, a.cos());
        let right = Vector3::new(-dir.z, 0.0, dir.x);
        let end = Point3::origin() - dir * 10.0;
        RefRoadEnd {
            road: id,
            is_tail: true,
            forward: true,
            along: dir,
            left: end - right * 4.0,
            right: end + right * 4.0,
        }
    }

    #[test]
    fn test_sort_by_angle() {
        let mut ends = vec![arm(1, 30.0), arm(2, 210.0), arm(3, 120.0), arm(4, 300.0)];
        sort_road_ends(&mut ends, 0.5);
        let order: Vec<u32> = ends.iter().map(|e| e.road).collect();
        // end midpoints lie at 240°, 60°, 150° and 330° around the centre
        assert_eq!(order, vec![2, 3, 1, 4]);
    }

    #[test]
    fn test_cross_junction_surface() {
        let mut ends = vec![arm(1, 0.0), arm(2, 90.0), arm(3, 180.0), arm(4, 270.0)];
        let surface = build_junction_surface(&mut ends, 30, 0.5).unwrap();
        assert_eq!(surface.outline.len(), 4 * 31);

        // triangles cover the outline exactly once
        let outline_area = {
            let n = surface.outline.len();
            let twice: f64 = (0..n)
                .map(|i| {
                    let (p, q) = (surface.outline[i], surface.outline[(i + 1) % n]);
                    p.x * q.z - q.x * p.z
                })
                .sum();
            twice.abs() / 2.0
        };
        let triangle_area: f64 = (0..surface.mesh.triangle_count())
            .map(|i| surface.mesh.face_normal(i).unwrap().y as f64 / 2.0)
            .sum();
        assert_relative_eq!(triangle_area, outline_area, max_relative = 1e-4);
        for i in 0..surface.mesh.triangle_count() {
            assert!(surface.mesh.face_normal(i).unwrap().y > -1e-4);
        }

        let (min, max) = surface.mesh.bounds();
        assert_relative_eq!(min.x, -10.0, epsilon = 1e-4);
        assert_relative_eq!(max.z, 10.0, epsilon = 1e-4);
    }

    #[test]
    fn test_two_road_surface() {
        // road A ends at z = 0, road B starts at z = 10
        let a = RefRoadEnd {
            road: 'a',
            is_tail: true,
            forward: true,
            along: Vector3::z(),
            left: Point3::new(0.0, 0.0, 0.0),
            right: Point3::new(-3.5, 0.0, 0.0),
        };
        let b = RefRoadEnd {
            road: 'b',
            is_tail: false,
            forward: true,
            along: -Vector3::z(),
            left: Point3::new(0.0, 0.0, 10.0),
            right: Point3::new(-3.5, 0.0, 10.0),
        };
        let mut ends = vec![a, b];
        let surface = build_junction_surface(&mut ends, 10, 0.5).unwrap();
        assert_eq!(surface.outline.len(), 22);
        let (min, max) = surface.mesh.bounds();
        assert_relative_eq!(min.x, -3.5, epsilon = 1e-5);
        assert_relative_eq!(max.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(max.z, 10.0, epsilon = 1e-5);
    }

    #[test]
    fn test_single_end_rejected() {
        let mut ends = vec![arm(1, 0.0)];
        assert!(build_junction_surface(&mut ends, 30, 0.5).is_err());
    }

    #[test]
    fn test_lane_link_curve_leaves_along_directions() {
        // right turn from a road heading +z into a road heading -x
        let curve = lane_link_curve(
            Point3::new(-2.0, 0.0, -10.0),
            &Vector3::z(),
            Point3::new(-10.0, 0.0, 2.0),
            &Vector3::x(),
            0.5,
        )
        .unwrap();
        assert_relative_eq!(curve.tangent_at(0.0), Vector3::z(), epsilon = 1e-6);
        assert_relative_eq!(curve.tangent_at(1.0), -Vector3::x(), epsilon = 1e-6);
        assert_eq!(curve.spaced_points(20).len(), 21);
    }
}
