/// 3D transformation matrices
use nalgebra::{Matrix3, Matrix4, Point3, Vector3};

/// Transform builder for 3D transformations
pub struct Transform;

impl Transform {
    /// Create a rotation matrix about the Y axis (radians)
    pub fn rotation_y(radians: f32) -> Matrix4<f32> {
        Matrix4::new_rotation(Vector3::new(0.0, radians, 0.0))
    }

    /// Create a translation matrix
    pub fn translation_matrix(x: f32, y: f32, z: f32) -> Matrix4<f32> {
        Matrix4::new_translation(&Vector3::new(x, y, z))
    }

    /// Right-handed perspective projection, OpenGL clip conventions
    pub fn perspective(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Matrix4<f32> {
        Matrix4::new_perspective(aspect, fov_y_degrees.to_radians(), near, far)
    }

    /// Right-handed view matrix looking from `eye` toward `target`
    pub fn look_at(eye: &Point3<f32>, target: &Point3<f32>, up: &Vector3<f32>) -> Matrix4<f32> {
        Matrix4::look_at_rh(eye, target, up)
    }

    /// Inverse-transpose of the upper 3x3, for transforming normals.
    ///
    /// Falls back to identity when the matrix is singular.
    pub fn normal_matrix(model_view: &Matrix4<f32>) -> Matrix3<f32> {
        let upper: Matrix3<f32> = model_view.fixed_view::<3, 3>(0, 0).into_owned();
        upper
            .try_inverse()
            .map(|inverse| inverse.transpose())
            .unwrap_or_else(Matrix3::identity)
    }

    /// Create a model-view-projection matrix
    pub fn mvp_matrix(
        model: &Matrix4<f32>,
        view: &Matrix4<f32>,
        projection: &Matrix4<f32>,
    ) -> Matrix4<f32> {
        projection * view * model
    }
}
