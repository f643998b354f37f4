//! Mutable per-session scene state shared by input handling and rendering

use crate::camera::Camera;
use crate::shading::ShadingToggles;

/// Camera, orbit and spin state.
///
/// Passed by reference into the input controller and the render pass each
/// frame. Both angles are in degrees and accumulate without bound.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SceneState {
    pub camera: Camera,
    /// Rotation of the view about the world Y axis
    pub orbit_degrees: f32,
    /// Rotation of the mesh about its own Y axis
    pub spin_degrees: f32,
    pub shading: ShadingToggles,
}

impl SceneState {
    pub fn new(camera: Camera, shading: ShadingToggles) -> Self {
        Self {
            camera,
            orbit_degrees: 0.0,
            spin_degrees: 0.0,
            shading,
        }
    }
}
