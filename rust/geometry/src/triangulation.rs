// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polygon triangulation for junction surfaces.
//!
//! Wrapper around earcutr for ground-plane polygons.

use crate::{Error, Point2, Point3, Result};

/// Ring vertices closer than this on the ground are merged.
const WELD_EPSILON: f64 = 1e-6;

/// True when every non-degenerate corner turns the same way.
fn turns_one_way(points: &[Point2<f64>]) -> bool {
    let n = points.len();
    let mut turn = 0.0f64;
    for k in 0..n {
        let (a, b, c) = (points[k], points[(k + 1) % n], points[(k + 2) % n]);
        let cross = (b - a).perp(&(c - b));
        if cross.abs() <= 1e-10 {
            continue;
        }
        if turn != 0.0 && turn.signum() != cross.signum() {
            return false;
        }
        turn = cross;
    }
    true
}

fn fan(n: usize) -> Vec<usize> {
    (1..n - 1).flat_map(|k| [0, k, k + 1]).collect()
}

/// Triangulate a simple polygon (no holes).
/// Returns triangle indices into the input points.
pub fn triangulate_polygon(points: &[Point2<f64>]) -> Result<Vec<usize>> {
    let n = points.len();
    if n < 3 {
        return Err(Error::TriangulationError(format!(
            "need at least 3 points to triangulate, got {n}"
        )));
    }
    if n == 3 {
        return Ok(vec![0, 1, 2]);
    }
    if n <= 8 && turns_one_way(points) {
        return Ok(fan(n));
    }

    let vertices: Vec<f64> = points.iter().flat_map(|p| [p.x, p.y]).collect();
    earcutr::earcut(&vertices, &[], 2).map_err(|e| Error::TriangulationError(format!("{:?}", e)))
}

/// Ground-plane triangulation of a closed 3D ring.
///
/// The ring is projected onto (x, z). Repeated vertices (including a closing
/// copy of the first one) are welded. Returned triangles reference the welded
/// ring and are wound so that their normals point up.
pub fn triangulate_ground(ring: &[Point3<f64>]) -> Result<(Vec<Point3<f64>>, Vec<u32>)> {
    let mut welded: Vec<Point3<f64>> = Vec::with_capacity(ring.len());
    for p in ring {
        let duplicate = welded
            .last()
            .is_some_and(|q| (q.x - p.x).abs() < WELD_EPSILON && (q.z - p.z).abs() < WELD_EPSILON);
        if !duplicate {
            welded.push(*p);
        }
    }
    if welded.len() > 1 {
        let (first, last) = (welded[0], welded[welded.len() - 1]);
        if (first.x - last.x).abs() < WELD_EPSILON && (first.z - last.z).abs() < WELD_EPSILON {
            welded.pop();
        }
    }

    let flat: Vec<Point2<f64>> = welded.iter().map(|p| Point2::new(p.x, p.z)).collect();
    let indices = triangulate_polygon(&flat)?;

    let mut triangles = Vec::with_capacity(indices.len());
    for tri in indices.chunks_exact(3) {
        let (a, b, c) = (welded[tri[0]], welded[tri[1]], welded[tri[2]]);
        // y of (b - a) x (c - a)
        let up = (b.z - a.z) * (c.x - a.x) - (b.x - a.x) * (c.z - a.z);
        if up >= 0.0 {
            triangles.extend_from_slice(&[tri[0] as u32, tri[1] as u32, tri[2] as u32]);
        } else {
            triangles.extend_from_slice(&[tri[0] as u32, tri[2] as u32, tri[1] as u32]);
        }
    }
    Ok((welded, triangles))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ground_up(ring: &[Point3<f64>], tri: &[u32]) -> f64 {
        let (a, b, c) = (ring[tri[0] as usize], ring[tri[1] as usize], ring[tri[2] as usize]);
        (b - a).cross(&(c - a)).y
    }

    #[test]
    fn test_square_fans_into_two_triangles() {
        let points = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ];
        assert_eq!(triangulate_polygon(&points).unwrap().len(), 6);
    }

    #[test]
    fn test_triangulate_concave() {
        // L shape
        let points = vec![
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(2.0, 1.0),
            Point2::new(1.0, 1.0),
            Point2::new(1.0, 2.0),
            Point2::new(0.0, 2.0),
        ];
        assert_eq!(triangulate_polygon(&points).unwrap().len(), 12);
    }

    #[test]
    fn test_two_points_rejected() {
        let points = vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)];
        assert!(triangulate_polygon(&points).is_err());
    }

    #[test]
    fn test_ground_triangles_face_up_either_winding() {
        let ring = vec![
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(4.0, 1.0, 0.0),
            Point3::new(4.0, 1.0, 0.0),
            Point3::new(4.0, 1.5, 4.0),
            Point3::new(2.0, 1.0, 3.0),
            Point3::new(0.0, 1.0, 4.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        for ring in [ring.clone(), ring.into_iter().rev().collect()] {
            let (welded, triangles) = triangulate_ground(&ring).unwrap();
            assert_eq!(welded.len(), 5);
            assert_eq!(triangles.len(), 9);
            for tri in triangles.chunks_exact(3) {
                assert!(ground_up(&welded, tri) > 0.0);
            }
        }
    }
}
