/// Fixed cube geometry surrounding the scene
use log::debug;
use nalgebra::{Point3, Vector3};

use crate::mesh::{GeometryBuffers, TriangleSurface};

/// Half edge length of the skybox, far outside the mesh's natural scale
pub const DEFAULT_HALF_EXTENT: f32 = 300.0;

/// One face of an axis-aligned cube, in cubemap upload order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeFace {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

impl CubeFace {
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PositiveX,
        CubeFace::NegativeX,
        CubeFace::PositiveY,
        CubeFace::NegativeY,
        CubeFace::PositiveZ,
        CubeFace::NegativeZ,
    ];

    /// Position in [`CubeFace::ALL`]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// 0 for X, 1 for Y, 2 for Z
    pub fn axis(self) -> usize {
        self.index() / 2
    }

    pub fn sign(self) -> f32 {
        if self.index() % 2 == 0 {
            1.0
        } else {
            -1.0
        }
    }

    /// Outward unit normal
    pub fn normal(self) -> Vector3<f32> {
        let mut normal = Vector3::zeros();
        normal[self.axis()] = self.sign();
        normal
    }

    /// Image file stem used for this face (`pos-x`, `neg-z`, ...)
    pub fn file_stem(self) -> &'static str {
        match self {
            CubeFace::PositiveX => "pos-x",
            CubeFace::NegativeX => "neg-x",
            CubeFace::PositiveY => "pos-y",
            CubeFace::NegativeY => "neg-y",
            CubeFace::PositiveZ => "pos-z",
            CubeFace::NegativeZ => "neg-z",
        }
    }

    /// Two in-face unit axes `(u, v)` with `u x v` equal to the outward normal
    fn tangents(self) -> (Vector3<f32>, Vector3<f32>) {
        let axis = self.axis();
        let mut next = Vector3::zeros();
        next[(axis + 1) % 3] = 1.0;
        let mut after = Vector3::zeros();
        after[(axis + 2) % 3] = 1.0;

        if self.sign() > 0.0 {
            (next, after)
        } else {
            (after, next)
        }
    }
}

/// 36-vertex, 12-triangle cube with flat per-face normals
#[derive(Debug, Clone)]
pub struct SkyboxGeometry {
    half_extent: f32,
    vertices: Vec<Point3<f32>>,
    normals: Vec<Vector3<f32>>,
    faces: Vec<[u32; 3]>,
}

impl SkyboxGeometry {
    pub fn new(half_extent: f32) -> Self {
        let mut vertices = Vec::with_capacity(36);
        let mut normals = Vec::with_capacity(36);

        for face in CubeFace::ALL {
            let normal = face.normal();
            let (u, v) = face.tangents();
            let center = normal * half_extent;
            let corner = |su: f32, sv: f32| Point3::from(center + (u * su + v * sv) * half_extent);

            // Counter-clockwise seen from outside, so (b - a) x (c - a) points along `normal`
            let quad = [
                corner(-1.0, -1.0),
                corner(1.0, -1.0),
                corner(1.0, 1.0),
                corner(-1.0, -1.0),
                corner(1.0, 1.0),
                corner(-1.0, 1.0),
            ];
            vertices.extend_from_slice(&quad);
            normals.extend(std::iter::repeat(normal).take(quad.len()));
        }

        let faces = (0..vertices.len() as u32 / 3)
            .map(|t| [3 * t, 3 * t + 1, 3 * t + 2])
            .collect::<Vec<_>>();

        debug!(
            "Skybox: generated {} triangles, {} vertices",
            faces.len(),
            vertices.len()
        );

        Self {
            half_extent,
            vertices,
            normals,
            faces,
        }
    }

    pub fn half_extent(&self) -> f32 {
        self.half_extent
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn vertices(&self) -> &[Point3<f32>] {
        &self.vertices
    }

    pub fn normals(&self) -> &[Vector3<f32>] {
        &self.normals
    }

    pub fn faces(&self) -> &[[u32; 3]] {
        &self.faces
    }
}

impl Default for SkyboxGeometry {
    fn default() -> Self {
        Self::new(DEFAULT_HALF_EXTENT)
    }
}

impl TriangleSurface for SkyboxGeometry {
    fn buffers(&self) -> GeometryBuffers<'_> {
        GeometryBuffers {
            positions: &self.vertices,
            normals: &self.normals,
            faces: &self.faces,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::collections::HashMap;

    #[test]
    fn test_counts() {
        let skybox = SkyboxGeometry::default();
        assert_eq!(skybox.vertex_count(), 36);
        assert_eq!(skybox.face_count(), 12);
        assert_eq!(skybox.normals().len(), 36);
        assert_eq!(skybox.half_extent(), DEFAULT_HALF_EXTENT);
    }

    #[test]
    fn test_six_unit_normals_each_shared_by_six_vertices() {
        let skybox = SkyboxGeometry::default();
        let mut counts: HashMap<[i32; 3], usize> = HashMap::new();
        for normal in skybox.normals() {
            assert_relative_eq!(normal.norm(), 1.0);
            let key = [normal.x as i32, normal.y as i32, normal.z as i32];
            *counts.entry(key).or_default() += 1;
        }
        assert_eq!(counts.len(), 6);
        assert!(counts.values().all(|&count| count == 6));
    }

    #[test]
    fn test_winding_matches_normals() {
        let skybox = SkyboxGeometry::new(2.0);
        for face in skybox.faces() {
            let [a, b, c] = face.map(|i| skybox.vertices()[i as usize]);
            let derived = (b - a).cross(&(c - a)).normalize();
            for &i in face {
                assert_relative_eq!(derived, skybox.normals()[i as usize], epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_vertices_lie_on_the_cube() {
        let skybox = SkyboxGeometry::new(5.0);
        for (vertex, normal) in skybox.vertices().iter().zip(skybox.normals()) {
            assert_relative_eq!(vertex.coords.dot(normal), 5.0);
            assert!(vertex.coords.amax() <= 5.0);
        }
    }

    #[test]
    fn test_cube_face_metadata() {
        assert_eq!(CubeFace::from_index(3), Some(CubeFace::NegativeY));
        assert_eq!(CubeFace::from_index(6), None);
        assert_eq!(CubeFace::NegativeZ.normal(), Vector3::new(0.0, 0.0, -1.0));
        assert_eq!(CubeFace::PositiveX.file_stem(), "pos-x");
        for face in CubeFace::ALL {
            let (u, v) = face.tangents();
            assert_eq!(u.cross(&v), face.normal());
        }
    }
}
