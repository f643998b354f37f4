/// Camera and projection utilities
use nalgebra::{Matrix4, Point3, Vector3};

use crate::transform::Transform;

/// Vertical field of view used for every frame
pub const FIELD_OF_VIEW_DEGREES: f32 = 45.0;
pub const NEAR_PLANE: f32 = 0.1;
pub const FAR_PLANE: f32 = 500.0;

/// Camera looking along `view_dir` from `eye`
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub eye: Point3<f32>,
    pub view_dir: Vector3<f32>,
    pub up: Vector3<f32>,
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn new(eye: Point3<f32>, view_dir: Vector3<f32>, up: Vector3<f32>) -> Self {
        Self {
            eye,
            view_dir,
            up,
            fov_degrees: FIELD_OF_VIEW_DEGREES,
            near: NEAR_PLANE,
            far: FAR_PLANE,
        }
    }

    /// A point one `view_dir` ahead of the eye
    pub fn look_at_point(&self) -> Point3<f32> {
        self.eye + self.view_dir
    }

    /// Create the view matrix (camera transformation)
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Transform::look_at(&self.eye, &self.look_at_point(), &self.up)
    }

    /// Create the projection matrix for a viewport aspect ratio
    pub fn projection_matrix(&self, aspect: f32) -> Matrix4<f32> {
        Transform::perspective(self.fov_degrees, aspect, self.near, self.far)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(
            Point3::new(0.0, 0.0, 2.5),
            Vector3::new(0.0, 0.0, -1.0),
            Vector3::new(0.0, 1.0, 0.0),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_camera_creation() {
        let camera = Camera::default();
        assert_eq!(camera.eye, Point3::new(0.0, 0.0, 2.5));
        assert_eq!(camera.look_at_point(), Point3::new(0.0, 0.0, 1.5));
        assert_eq!(camera.fov_degrees, 45.0);
    }

    #[test]
    fn test_view_matrix_moves_eye_to_origin() {
        let camera = Camera::default();
        let view = camera.view_matrix();
        assert_relative_eq!(
            view.transform_point(&camera.eye),
            Point3::origin(),
            epsilon = 1e-6
        );
        // Looking down -Z from +Z: the origin ends up 2.5 units ahead
        assert_relative_eq!(
            view.transform_point(&Point3::origin()),
            Point3::new(0.0, 0.0, -2.5),
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_projection_planes() {
        let camera = Camera::default();
        let projection = camera.projection_matrix(1.0);
        let near = projection.transform_point(&Point3::new(0.0, 0.0, -NEAR_PLANE));
        let far = projection.transform_point(&Point3::new(0.0, 0.0, -FAR_PLANE));
        assert_relative_eq!(near.z, -1.0, epsilon = 1e-4);
        assert_relative_eq!(far.z, 1.0, epsilon = 1e-4);
    }
}
