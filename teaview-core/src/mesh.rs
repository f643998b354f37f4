/// Triangle mesh storage, bounding boxes and normal synthesis
use nalgebra::{Point3, Vector3};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl BoundingBox {
    /// A degenerate box holding a single point
    pub fn from_point(point: Point3<f32>) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    /// Widen the box so it contains `point`
    pub fn include(&mut self, point: &Point3<f32>) {
        for axis in 0..3 {
            if point[axis] < self.min[axis] {
                self.min[axis] = point[axis];
            }
            if point[axis] > self.max[axis] {
                self.max[axis] = point[axis];
            }
        }
    }

    pub fn center(&self) -> Point3<f32> {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn extent(&self) -> Vector3<f32> {
        self.max - self.min
    }

    pub fn contains(&self, point: &Point3<f32>) -> bool {
        (0..3).all(|axis| self.min[axis] <= point[axis] && point[axis] <= self.max[axis])
    }
}

/// Borrowed view of a surface's index/vertex/normal buffers, ready for upload
#[derive(Debug, Clone, Copy)]
pub struct GeometryBuffers<'a> {
    pub positions: &'a [Point3<f32>],
    pub normals: &'a [Vector3<f32>],
    pub faces: &'a [[u32; 3]],
}

impl GeometryBuffers<'_> {
    /// Positions flattened to `x, y, z, x, y, z, ...`
    pub fn position_data(&self) -> Vec<f32> {
        self.positions.iter().flat_map(|p| [p.x, p.y, p.z]).collect()
    }

    /// Normals flattened to `x, y, z, ...`
    pub fn normal_data(&self) -> Vec<f32> {
        self.normals.iter().flat_map(|n| [n.x, n.y, n.z]).collect()
    }

    /// Triangle indices flattened for an element buffer
    pub fn index_data(&self) -> Vec<u32> {
        self.faces.iter().flatten().copied().collect()
    }
}

/// Anything that can hand its triangle buffers to a render backend
pub trait TriangleSurface {
    fn buffers(&self) -> GeometryBuffers<'_>;
}

/// A triangulated surface with per-vertex normals and a running bounding box
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    vertices: Vec<Point3<f32>>,
    faces: Vec<[u32; 3]>,
    normals: Vec<Vector3<f32>>,
    bounds: Option<BoundingBox>,
}

impl MeshData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a mesh from prepared buffers, computing bounds and normals
    pub fn from_parts(vertices: Vec<Point3<f32>>, faces: Vec<[u32; 3]>) -> Self {
        let mut mesh = Self::new();
        for vertex in vertices {
            mesh.push_vertex(vertex);
        }
        mesh.faces = faces;
        mesh.generate_normals();
        mesh
    }

    /// Append a vertex and widen the bounding box
    pub fn push_vertex(&mut self, vertex: Point3<f32>) {
        match &mut self.bounds {
            Some(bounds) => bounds.include(&vertex),
            None => self.bounds = Some(BoundingBox::from_point(vertex)),
        }
        self.vertices.push(vertex);
    }

    /// Append a triangle of 0-based vertex indices
    pub fn push_face(&mut self, face: [u32; 3]) {
        self.faces.push(face);
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

    pub fn faces(&self) -> &[[u32; 3]] {
        &self.faces
    }

    pub fn normals(&self) -> &[Vector3<f32>] {
        &self.normals
    }

    /// Bounds of every vertex seen so far, `None` for an empty mesh
    pub fn bounding_box(&self) -> Option<&BoundingBox> {
        self.bounds.as_ref()
    }

    pub fn vertex(&self, id: usize) -> Option<Point3<f32>> {
        self.vertices.get(id).copied()
    }

    /// Overwrite a vertex position.
    ///
    /// The bounding box is widened to include the new position; normals are
    /// left as they were until [`MeshData::generate_normals`] runs again.
    /// Returns `false` when `id` is out of range.
    pub fn set_vertex(&mut self, id: usize, position: Point3<f32>) -> bool {
        let Some(slot) = self.vertices.get_mut(id) else {
            return false;
        };
        *slot = position;
        if let Some(bounds) = &mut self.bounds {
            bounds.include(&position);
        }
        true
    }

    /// Recompute per-vertex normals from the current faces
    pub fn generate_normals(&mut self) {
        self.normals = compute_normals(&self.vertices, &self.faces);
    }
}

impl TriangleSurface for MeshData {
    fn buffers(&self) -> GeometryBuffers<'_> {
        GeometryBuffers {
            positions: &self.vertices,
            normals: &self.normals,
            faces: &self.faces,
        }
    }
}

/// Face-normal accumulation.
///
/// Every triangle adds its unnormalized normal `(v2 - v1) x (v3 - v1)` to each
/// of its three vertices, so larger triangles weigh more. Accumulators are
/// normalized once at the end; vertices no triangle touches stay zero.
/// Faces referencing missing vertices are skipped.
pub fn compute_normals(vertices: &[Point3<f32>], faces: &[[u32; 3]]) -> Vec<Vector3<f32>> {
    let mut normals = vec![Vector3::zeros(); vertices.len()];

    for face in faces {
        let [i1, i2, i3] = face.map(|index| index as usize);
        let (Some(v1), Some(v2), Some(v3)) = (vertices.get(i1), vertices.get(i2), vertices.get(i3))
        else {
            continue;
        };

        let edge1 = v2 - v1;
        let edge2 = v3 - v1;
        let normal = edge1.cross(&edge2);

        normals[i1] += normal;
        normals[i2] += normal;
        normals[i3] += normal;
    }

    // Rescale by the largest component first so tiny meshes don't underflow
    for normal in &mut normals {
        let scale = normal.amax();
        if scale > 0.0 {
            *normal /= scale;
            normal.normalize_mut();
        }
    }

    normals
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn single_triangle() -> MeshData {
        MeshData::from_parts(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        )
    }

    #[test]
    fn test_single_triangle_normals() {
        let mesh = single_triangle();
        for normal in mesh.normals() {
            assert_relative_eq!(*normal, Vector3::new(0.0, 0.0, 1.0), epsilon = 1e-6);
        }
    }

    #[test]
    fn test_tilted_triangle_normals_follow_cross_product() {
        let vertices = vec![
            Point3::new(0.2, -0.4, 1.0),
            Point3::new(1.5, 0.3, -0.2),
            Point3::new(-0.7, 2.0, 0.4),
        ];
        let expected = (vertices[1] - vertices[0])
            .cross(&(vertices[2] - vertices[0]))
            .normalize();

        let normals = compute_normals(&vertices, &[[0, 1, 2]]);
        assert_eq!(normals.len(), 3);
        for normal in &normals {
            assert_relative_eq!(normal.norm(), 1.0, epsilon = 1e-6);
            assert_relative_eq!(*normal, expected, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_face_order_does_not_change_normals() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ];
        let faces = vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]];
        let mut reversed = faces.clone();
        reversed.reverse();
        let mut rotated = faces.clone();
        rotated.rotate_left(1);

        let baseline = compute_normals(&vertices, &faces);
        for permuted in [reversed, rotated] {
            let normals = compute_normals(&vertices, &permuted);
            for (a, b) in baseline.iter().zip(&normals) {
                assert_relative_eq!(*a, *b, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_larger_faces_weigh_more() {
        // Shared vertex 0 sits on a small +Z triangle and a large +X triangle
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.1, 0.0, 0.0),
            Point3::new(0.0, 0.1, 0.0),
            Point3::new(0.0, 0.0, 2.0),
            Point3::new(0.0, 2.0, 0.0),
        ];
        let normals = compute_normals(&vertices, &[[0, 1, 2], [0, 4, 3]]);
        assert!(normals[0].x > normals[0].z);
    }

    #[test]
    fn test_untouched_vertex_keeps_zero_normal() {
        let mut mesh = single_triangle();
        mesh.push_vertex(Point3::new(5.0, 5.0, 5.0));
        mesh.generate_normals();
        assert_eq!(mesh.normals().len(), mesh.vertex_count());
        assert_eq!(mesh.normals()[3], Vector3::zeros());
    }

    #[test]
    fn test_tiny_triangle_normals_are_unit_length() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1e-4, 0.0, 0.0),
            Point3::new(0.0, 1e-4, 0.0),
        ];
        for normal in compute_normals(&vertices, &[[0, 1, 2]]) {
            assert_relative_eq!(normal, Vector3::new(0.0, 0.0, 1.0), epsilon = 1e-6);
        }

        let microscopic = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 1e-18, 0.0),
            Point3::new(0.0, 0.0, 1e-18),
        ];
        for normal in compute_normals(&microscopic, &[[0, 1, 2]]) {
            assert_relative_eq!(normal, Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-6);
        }
    }

    #[test]
    fn test_bounding_box_tracks_vertices() {
        let mut mesh = MeshData::new();
        assert!(mesh.bounding_box().is_none());

        mesh.push_vertex(Point3::new(1.0, -2.0, 3.0));
        let bounds = mesh.bounding_box().copied().unwrap();
        assert_eq!(bounds.min, bounds.max);

        mesh.push_vertex(Point3::new(-1.0, 4.0, 0.5));
        let bounds = mesh.bounding_box().copied().unwrap();
        assert_eq!(bounds.min, Point3::new(-1.0, -2.0, 0.5));
        assert_eq!(bounds.max, Point3::new(1.0, 4.0, 3.0));
        assert_eq!(bounds.center(), Point3::new(0.0, 1.0, 1.75));
        for vertex in mesh.vertices() {
            assert!(bounds.contains(vertex));
        }
    }

    #[test]
    fn test_set_vertex_widens_bounds() {
        let mut mesh = single_triangle();
        assert!(mesh.set_vertex(1, Point3::new(3.0, 0.0, -1.0)));
        assert!(!mesh.set_vertex(10, Point3::origin()));

        assert_eq!(mesh.vertex(1), Some(Point3::new(3.0, 0.0, -1.0)));
        let bounds = mesh.bounding_box().unwrap();
        assert_eq!(bounds.max.x, 3.0);
        assert_eq!(bounds.min.z, -1.0);
    }

    #[test]
    fn test_flattened_buffers() {
        let mesh = single_triangle();
        let buffers = mesh.buffers();
        assert_eq!(buffers.position_data().len(), 9);
        assert_eq!(buffers.normal_data()[2], 1.0);
        assert_eq!(buffers.index_data(), vec![0, 1, 2]);
    }
}
