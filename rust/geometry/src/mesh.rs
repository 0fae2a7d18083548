// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Render buffers for lanes, markings and junction surfaces.

use nalgebra::{Point3, Vector3};

/// Triangle mesh with flat `f32` buffers ready for upload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// Positions, three floats per vertex
    pub positions: Vec<f32>,
    /// Normals, parallel to `positions`
    pub normals: Vec<f32>,
    /// Texture coordinates (u, v); empty when the mesh carries none
    pub uvs: Vec<f32>,
    /// Three indices per triangle
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(vertex_count: usize, index_count: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertex_count * 3),
            normals: Vec::with_capacity(vertex_count * 3),
            uvs: Vec::with_capacity(vertex_count * 2),
            indices: Vec::with_capacity(index_count),
        }
    }

    /// Add a vertex and return its index.
    #[inline]
    pub fn add_vertex(&mut self, position: Point3<f64>, normal: Vector3<f64>) -> u32 {
        let index = self.vertex_count() as u32;
        self.positions
            .extend_from_slice(&[position.x as f32, position.y as f32, position.z as f32]);
        self.normals
            .extend_from_slice(&[normal.x as f32, normal.y as f32, normal.z as f32]);
        index
    }

    /// Add a vertex with texture coordinates and return its index.
    #[inline]
    pub fn add_vertex_uv(&mut self, position: Point3<f64>, normal: Vector3<f64>, uv: [f64; 2]) -> u32 {
        self.uvs.extend_from_slice(&[uv[0] as f32, uv[1] as f32]);
        self.add_vertex(position, normal)
    }

    #[inline]
    pub fn add_triangle(&mut self, i0: u32, i1: u32, i2: u32) {
        self.indices.extend_from_slice(&[i0, i1, i2]);
    }

    /// Append another mesh, offsetting its indices.
    pub fn merge(&mut self, other: &Mesh) {
        if other.is_empty() {
            return;
        }
        let base = self.vertex_count() as u32;
        self.positions.extend_from_slice(&other.positions);
        self.normals.extend_from_slice(&other.normals);
        self.uvs.extend_from_slice(&other.uvs);
        self.indices
            .extend(other.indices.iter().map(|&i| base + i));
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Position of vertex `i`.
    pub fn vertex(&self, i: usize) -> Option<Point3<f32>> {
        self.positions
            .get(i * 3..i * 3 + 3)
            .map(|c| Point3::new(c[0], c[1], c[2]))
    }

    /// Unnormalised face normal of triangle `i`.
    pub fn face_normal(&self, i: usize) -> Option<Vector3<f32>> {
        let tri = self.indices.get(i * 3..i * 3 + 3)?;
        let a = self.vertex(tri[0] as usize)?;
        let b = self.vertex(tri[1] as usize)?;
        let c = self.vertex(tri[2] as usize)?;
        Some((b - a).cross(&(c - a)))
    }

    /// Axis-aligned bounds as (min, max); the origin twice for an empty mesh.
    pub fn bounds(&self) -> (Point3<f32>, Point3<f32>) {
        let mut corners = self.positions.chunks_exact(3).map(|c| Point3::new(c[0], c[1], c[2]));
        let Some(first) = corners.next() else {
            return (Point3::origin(), Point3::origin());
        };
        corners.fold((first, first), |(lo, hi), p| (lo.inf(&p), hi.sup(&p)))
    }
}
