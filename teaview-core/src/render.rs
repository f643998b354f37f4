//! Per-frame render pass: transform composition and draw ordering
//!
//! [`RenderPass`] owns the two per-drawable modelview matrices and their
//! readiness. Each frame it recomputes projection and view from the
//! [`SceneState`], centres and spins the mesh, orbits the view, and hands
//! typed uniform bundles to a [`RenderBackend`].

use log::{debug, error, info, warn};
use nalgebra::{Matrix3, Matrix4, Point3, Vector3};

use crate::cubemap::CubemapImage;
use crate::error::{LoadError, RenderError};
use crate::matrix_stack::ModelView;
use crate::mesh::{BoundingBox, GeometryBuffers, MeshData, TriangleSurface};
use crate::scene::SceneState;
use crate::shading::{LightUniforms, MaterialUniforms, ShadingMode};
use crate::skybox::SkyboxGeometry;
use crate::transform::Transform;

/// Texture unit the environment cubemap is bound to
pub const ENVIRONMENT_TEXTURE_UNIT: u32 = 0;

/// Depth comparison used while drawing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthFunc {
    Less,
    /// Lets the skybox sit on the far plane without fighting itself
    LessEqual,
}

/// Matrices for the skybox program
#[derive(Debug, Clone, PartialEq)]
pub struct SkyboxUniforms {
    pub model_view: Matrix4<f32>,
    pub projection: Matrix4<f32>,
    pub normal: Matrix3<f32>,
    pub environment_unit: u32,
}

/// Matrices, light and material for the mesh program
#[derive(Debug, Clone, PartialEq)]
pub struct MeshUniforms {
    pub model_view: Matrix4<f32>,
    pub projection: Matrix4<f32>,
    pub normal: Matrix3<f32>,
    /// View matrix of this frame, orbit included; maps environment lookups back to world space
    pub view: Matrix4<f32>,
    /// Eye in the frame `view` maps from, so it turns with the orbit
    pub camera_position: Point3<f32>,
    pub mode: ShadingMode,
    pub light: LightUniforms,
    pub material: MaterialUniforms,
    pub environment_unit: u32,
}

/// Platform side of rendering: buffer upload, texture upload and draw calls
pub trait RenderBackend {
    /// Viewport width over height
    fn aspect_ratio(&self) -> f32;

    /// Clear colour and depth before a frame
    fn begin_frame(&mut self) -> Result<(), RenderError>;

    fn set_depth_func(&mut self, func: DepthFunc);

    fn upload_skybox(&mut self, buffers: GeometryBuffers<'_>) -> Result<(), RenderError>;

    fn upload_mesh(&mut self, buffers: GeometryBuffers<'_>) -> Result<(), RenderError>;

    /// Replace one cubemap face; faces arrive independently
    fn upload_cubemap_face(&mut self, image: &CubemapImage) -> Result<(), RenderError>;

    fn draw_skybox(&mut self, uniforms: &SkyboxUniforms) -> Result<(), RenderError>;

    fn draw_mesh(&mut self, uniforms: &MeshUniforms) -> Result<(), RenderError>;
}

/// Load state of one drawable; leaves `Pending` exactly once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Readiness {
    #[default]
    Pending,
    Ready,
    Failed,
}

/// What a call to [`RenderPass::render_frame`] did
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    /// Translation applied to the mesh before spinning it
    pub mesh_offset: Vector3<f32>,
    /// Shading modes drawn this frame, in order
    pub modes_drawn: Vec<ShadingMode>,
    /// False while either drawable is still loading (or failed)
    pub drawn: bool,
}

/// Composes transforms and issues draws for the skybox and the mesh
#[derive(Debug, Default)]
pub struct RenderPass {
    skybox_model_view: ModelView,
    mesh_model_view: ModelView,
    skybox: Readiness,
    mesh: Readiness,
    mesh_bounds: BoundingBox,
    material: MaterialUniforms,
}

impl RenderPass {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skybox_readiness(&self) -> Readiness {
        self.skybox
    }

    pub fn mesh_readiness(&self) -> Readiness {
        self.mesh
    }

    pub fn is_ready(&self) -> bool {
        self.skybox == Readiness::Ready && self.mesh == Readiness::Ready
    }

    /// Upload the skybox buffers and mark it ready
    pub fn upload_skybox<B: RenderBackend>(
        &mut self,
        skybox: &SkyboxGeometry,
        backend: &mut B,
    ) -> Result<(), RenderError> {
        if self.skybox != Readiness::Pending {
            warn!("Skybox already {:?}, ignoring upload", self.skybox);
            return Ok(());
        }
        backend.upload_skybox(skybox.buffers())?;
        self.skybox = Readiness::Ready;
        info!("Skybox: uploaded {} triangles", skybox.face_count());
        Ok(())
    }

    /// Upload the mesh buffers, remember its bounds and mark it ready
    pub fn upload_mesh<B: RenderBackend>(
        &mut self,
        mesh: &MeshData,
        backend: &mut B,
    ) -> Result<(), RenderError> {
        if self.mesh != Readiness::Pending {
            warn!("Mesh already {:?}, ignoring upload", self.mesh);
            return Ok(());
        }
        backend.upload_mesh(mesh.buffers())?;
        self.mesh_bounds = mesh.bounding_box().copied().unwrap_or_default();
        self.mesh = Readiness::Ready;
        info!(
            "Mesh: uploaded {} triangles, bounds {:?} .. {:?}",
            mesh.face_count(),
            self.mesh_bounds.min,
            self.mesh_bounds.max
        );
        Ok(())
    }

    /// A failed load leaves the mesh permanently not ready
    pub fn mark_mesh_failed(&mut self, reason: &LoadError) {
        error!("Mesh load failed: {}", reason);
        if self.mesh == Readiness::Pending {
            self.mesh = Readiness::Failed;
        }
    }

    /// Recentring offset for the mesh.
    ///
    /// X and Y are negated, Z is not: `(-cx, -cy, +cz)`.
    pub fn mesh_offset(bounds: &BoundingBox) -> Vector3<f32> {
        let center = bounds.center();
        Vector3::new(-center.x, -center.y, center.z)
    }

    /// Compose this frame's transforms and draw, if both drawables are ready.
    ///
    /// Both modelview stacks are balanced on return, including when a draw
    /// call fails.
    pub fn render_frame<B: RenderBackend>(
        &mut self,
        scene: &SceneState,
        backend: &mut B,
    ) -> Result<FrameReport, RenderError> {
        backend.begin_frame()?;

        let camera = &scene.camera;
        let projection = camera.projection_matrix(backend.aspect_ratio());
        let mut view = camera.view_matrix();
        let mesh_offset = Self::mesh_offset(&self.mesh_bounds);

        self.skybox_model_view.push();
        self.mesh_model_view.push();

        self.mesh_model_view.translate(&mesh_offset);
        self.mesh_model_view.rotate_y_degrees(scene.spin_degrees);

        view *= Transform::rotation_y(scene.orbit_degrees.to_radians());
        self.mesh_model_view.pre_multiply(&view);
        self.skybox_model_view.pre_multiply(&view);

        backend.set_depth_func(DepthFunc::LessEqual);

        let drawn = if self.is_ready() {
            self.issue_draws(scene, &projection, &view, backend)
        } else {
            debug!(
                "Skipping draws: skybox {:?}, mesh {:?}",
                self.skybox, self.mesh
            );
            Ok(Vec::new())
        };

        self.mesh_model_view.pop()?;
        self.skybox_model_view.pop()?;

        let modes_drawn = drawn?;
        Ok(FrameReport {
            mesh_offset,
            drawn: self.is_ready(),
            modes_drawn,
        })
    }

    fn issue_draws<B: RenderBackend>(
        &self,
        scene: &SceneState,
        projection: &Matrix4<f32>,
        view: &Matrix4<f32>,
        backend: &mut B,
    ) -> Result<Vec<ShadingMode>, RenderError> {
        let skybox = SkyboxUniforms {
            model_view: *self.skybox_model_view.matrix(),
            projection: *projection,
            normal: self.skybox_model_view.normal_matrix(),
            environment_unit: ENVIRONMENT_TEXTURE_UNIT,
        };

        let camera_position = Transform::rotation_y(-scene.orbit_degrees.to_radians())
            .transform_point(&scene.camera.eye);

        let mut drawn = Vec::new();
        for mode in scene.shading.active_modes() {
            backend.draw_skybox(&skybox)?;
            backend.draw_mesh(&MeshUniforms {
                model_view: *self.mesh_model_view.matrix(),
                projection: *projection,
                normal: self.mesh_model_view.normal_matrix(),
                view: *view,
                camera_position,
                mode,
                light: LightUniforms::for_mode(mode),
                material: self.material,
                environment_unit: ENVIRONMENT_TEXTURE_UNIT,
            })?;
            drawn.push(mode);
        }
        Ok(drawn)
    }

    /// Current skybox modelview, identity between frames
    pub fn skybox_model_view(&self) -> &Matrix4<f32> {
        self.skybox_model_view.matrix()
    }

    /// Current mesh modelview, identity between frames
    pub fn mesh_model_view(&self) -> &Matrix4<f32> {
        self.mesh_model_view.matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obj::parse_mesh;
    use crate::shading::ShadingToggles;
    use approx::assert_relative_eq;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        DepthFunc(DepthFunc),
        UploadSkybox(usize),
        UploadMesh(usize),
        Skybox(Matrix4<f32>),
        Mesh(ShadingMode, Matrix4<f32>, Vector3<f32>),
    }

    #[derive(Default)]
    struct RecordingBackend {
        calls: Vec<Call>,
        camera_positions: Vec<Point3<f32>>,
        fail_mesh_draw: bool,
    }

    impl RecordingBackend {
        fn draws(&self) -> Vec<&Call> {
            self.calls
                .iter()
                .filter(|call| matches!(call, Call::Skybox(_) | Call::Mesh(..)))
                .collect()
        }
    }

    impl RenderBackend for RecordingBackend {
        fn aspect_ratio(&self) -> f32 {
            4.0 / 3.0
        }

        fn begin_frame(&mut self) -> Result<(), RenderError> {
            Ok(())
        }

        fn set_depth_func(&mut self, func: DepthFunc) {
            self.calls.push(Call::DepthFunc(func));
        }

        fn upload_skybox(&mut self, buffers: GeometryBuffers<'_>) -> Result<(), RenderError> {
            self.calls.push(Call::UploadSkybox(buffers.faces.len()));
            Ok(())
        }

        fn upload_mesh(&mut self, buffers: GeometryBuffers<'_>) -> Result<(), RenderError> {
            self.calls.push(Call::UploadMesh(buffers.faces.len()));
            Ok(())
        }

        fn upload_cubemap_face(&mut self, _image: &CubemapImage) -> Result<(), RenderError> {
            Ok(())
        }

        fn draw_skybox(&mut self, uniforms: &SkyboxUniforms) -> Result<(), RenderError> {
            self.calls.push(Call::Skybox(uniforms.model_view));
            Ok(())
        }

        fn draw_mesh(&mut self, uniforms: &MeshUniforms) -> Result<(), RenderError> {
            if self.fail_mesh_draw {
                return Err(RenderError::Backend("lost context".to_string()));
            }
            self.camera_positions.push(uniforms.camera_position);
            self.calls.push(Call::Mesh(
                uniforms.mode,
                uniforms.model_view,
                uniforms.light.position,
            ));
            Ok(())
        }
    }

    fn offset_mesh() -> MeshData {
        // Bounds (0,0,0)..(2,4,6), centre (1,2,3)
        parse_mesh("v 0 0 0\nv 2 0 0\nv 0 4 6\nf 1 2 3\n").unwrap()
    }

    fn ready_pass(backend: &mut RecordingBackend) -> RenderPass {
        let mut pass = RenderPass::new();
        pass.upload_skybox(&SkyboxGeometry::default(), backend).unwrap();
        pass.upload_mesh(&offset_mesh(), backend).unwrap();
        pass
    }

    #[test]
    fn test_draws_skipped_until_both_ready() {
        let mut backend = RecordingBackend::default();
        let mut pass = RenderPass::new();
        let scene = SceneState::default();

        let report = pass.render_frame(&scene, &mut backend).unwrap();
        assert!(!report.drawn);
        assert!(backend.draws().is_empty());

        pass.upload_skybox(&SkyboxGeometry::default(), &mut backend).unwrap();
        pass.render_frame(&scene, &mut backend).unwrap();
        assert!(backend.draws().is_empty());

        pass.upload_mesh(&offset_mesh(), &mut backend).unwrap();
        let report = pass.render_frame(&scene, &mut backend).unwrap();
        assert!(report.drawn);
        assert_eq!(backend.draws().len(), 2);
    }

    #[test]
    fn test_skybox_before_mesh_with_less_equal_depth() {
        let mut backend = RecordingBackend::default();
        let mut pass = ready_pass(&mut backend);
        backend.calls.clear();

        pass.render_frame(&SceneState::default(), &mut backend).unwrap();
        assert_eq!(backend.calls[0], Call::DepthFunc(DepthFunc::LessEqual));
        assert!(matches!(backend.calls[1], Call::Skybox(_)));
        assert!(matches!(backend.calls[2], Call::Mesh(ShadingMode::Shaded, ..)));
    }

    #[test]
    fn test_one_draw_pair_per_enabled_mode() {
        let mut backend = RecordingBackend::default();
        let mut pass = ready_pass(&mut backend);
        backend.calls.clear();

        let mut scene = SceneState::default();
        scene.shading = ShadingToggles {
            shaded: true,
            reflective: true,
            refractive: true,
        };
        let report = pass.render_frame(&scene, &mut backend).unwrap();
        assert_eq!(report.modes_drawn, ShadingMode::ALL.to_vec());

        let lights: Vec<Vector3<f32>> = backend
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::Mesh(_, _, light) => Some(*light),
                _ => None,
            })
            .collect();
        assert_eq!(
            lights,
            vec![
                Vector3::repeat(1.0),
                Vector3::repeat(0.0),
                Vector3::repeat(0.55)
            ]
        );
        assert_eq!(backend.draws().len(), 6);
    }

    #[test]
    fn test_no_modes_enabled_draws_nothing() {
        let mut backend = RecordingBackend::default();
        let mut pass = ready_pass(&mut backend);
        backend.calls.clear();

        let mut scene = SceneState::default();
        scene.shading = ShadingToggles::none();
        let report = pass.render_frame(&scene, &mut backend).unwrap();
        assert!(report.drawn);
        assert!(report.modes_drawn.is_empty());
        assert!(backend.draws().is_empty());
    }

    #[test]
    fn test_mesh_offset_keeps_positive_z() {
        let bounds = offset_mesh().bounding_box().copied().unwrap();
        // X and Y are negated but Z is added, unlike a plain recentre
        assert_eq!(RenderPass::mesh_offset(&bounds), Vector3::new(-1.0, -2.0, 3.0));

        let mut backend = RecordingBackend::default();
        let mut pass = ready_pass(&mut backend);
        let report = pass.render_frame(&SceneState::default(), &mut backend).unwrap();
        assert_eq!(report.mesh_offset, Vector3::new(-1.0, -2.0, 3.0));
    }

    #[test]
    fn test_mesh_transform_composition() {
        let mut backend = RecordingBackend::default();
        let mut pass = ready_pass(&mut backend);
        backend.calls.clear();

        let mut scene = SceneState::default();
        scene.spin_degrees = 30.0;
        scene.orbit_degrees = -45.0;
        pass.render_frame(&scene, &mut backend).unwrap();

        let view = scene.camera.view_matrix() * Transform::rotation_y((-45.0f32).to_radians());
        let local = Transform::translation_matrix(-1.0, -2.0, 3.0)
            * Transform::rotation_y(30.0f32.to_radians());

        let Call::Skybox(sky) = &backend.calls[1] else {
            panic!("expected skybox draw, got {:?}", backend.calls[1]);
        };
        let Call::Mesh(_, mesh, _) = &backend.calls[2] else {
            panic!("expected mesh draw, got {:?}", backend.calls[2]);
        };
        assert_relative_eq!(*sky, view, epsilon = 1e-5);
        assert_relative_eq!(*mesh, view * local, epsilon = 1e-5);
    }

    #[test]
    fn test_camera_position_follows_orbit() {
        let mut backend = RecordingBackend::default();
        let mut pass = ready_pass(&mut backend);

        let mut scene = SceneState::default();
        pass.render_frame(&scene, &mut backend).unwrap();
        scene.orbit_degrees = -90.0;
        pass.render_frame(&scene, &mut backend).unwrap();

        assert_eq!(backend.camera_positions.len(), 2);
        assert_relative_eq!(backend.camera_positions[0], scene.camera.eye, epsilon = 1e-6);
        assert_relative_eq!(
            backend.camera_positions[1],
            Point3::new(2.5, 0.0, 0.0),
            epsilon = 1e-5
        );

        let view = scene.camera.view_matrix() * Transform::rotation_y((-90.0f32).to_radians());
        assert_relative_eq!(
            view.transform_point(&backend.camera_positions[1]),
            Point3::origin(),
            epsilon = 1e-5
        );
    }

    #[test]
    fn test_stacks_balanced_between_frames() {
        let mut backend = RecordingBackend::default();
        let mut pass = ready_pass(&mut backend);
        let mut scene = SceneState::default();
        scene.spin_degrees = 10.0;

        for _ in 0..3 {
            pass.render_frame(&scene, &mut backend).unwrap();
            assert_eq!(*pass.mesh_model_view(), Matrix4::identity());
            assert_eq!(*pass.skybox_model_view(), Matrix4::identity());
        }
    }

    #[test]
    fn test_failed_draw_still_restores_stacks() {
        let mut backend = RecordingBackend::default();
        let mut pass = ready_pass(&mut backend);
        backend.fail_mesh_draw = true;

        let result = pass.render_frame(&SceneState::default(), &mut backend);
        assert!(matches!(result, Err(RenderError::Backend(_))));
        assert_eq!(*pass.mesh_model_view(), Matrix4::identity());
        assert_eq!(pass.mesh_model_view.depth(), 0);
        assert_eq!(pass.skybox_model_view.depth(), 0);
    }

    #[test]
    fn test_readiness_flips_once() {
        let mut backend = RecordingBackend::default();
        let mut pass = RenderPass::new();
        pass.mark_mesh_failed(&LoadError::Disconnected("mesh".to_string()));
        assert_eq!(pass.mesh_readiness(), Readiness::Failed);

        pass.upload_mesh(&offset_mesh(), &mut backend).unwrap();
        assert_eq!(pass.mesh_readiness(), Readiness::Failed);
        assert!(!backend.calls.contains(&Call::UploadMesh(1)));

        pass.upload_skybox(&SkyboxGeometry::default(), &mut backend).unwrap();
        pass.upload_skybox(&SkyboxGeometry::default(), &mut backend).unwrap();
        let uploads = backend
            .calls
            .iter()
            .filter(|call| matches!(call, Call::UploadSkybox(12)))
            .count();
        assert_eq!(uploads, 1);
    }
}
