/// teaview web viewer - WebGL2 rendering driven from JavaScript
///
/// The page fetches the mesh text and decodes the cubemap images
/// asynchronously, hands each result over as it arrives, and calls
/// `frame()` from `requestAnimationFrame`. Frames keep running while either
/// drawable is still loading.
use std::fmt::Display;
use std::io;
use std::path::PathBuf;

use log::{error, info, warn};
use teaview_core::{
    parse_mesh, parse_mesh_lenient, CubeFace, CubemapImage, FrameReport, InputController,
    LoadError, RenderBackend, RenderError, RenderPass, SceneState, ShadingToggles,
    SkyboxGeometry, ViewerConfig,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{HtmlCanvasElement, WebGl2RenderingContext};

pub mod gl;
pub mod keys;
pub mod logger;
pub mod shaders;

pub use gl::WebGlBackend;
pub use keys::key_from_dom;

/// Viewer state independent of the browser bindings
pub struct ViewerState<B: RenderBackend> {
    backend: B,
    pass: RenderPass,
    scene: SceneState,
    input: InputController,
    strict_parse: bool,
}

impl<B: RenderBackend> ViewerState<B> {
    /// Upload the skybox right away; the mesh and cubemap follow later
    pub fn new(mut backend: B, config: &ViewerConfig) -> Result<Self, RenderError> {
        let mut pass = RenderPass::new();
        pass.upload_skybox(&SkyboxGeometry::new(config.skybox_half_extent), &mut backend)?;
        Ok(Self {
            backend,
            pass,
            scene: config.scene_state(),
            input: InputController::new(),
            strict_parse: config.strict_parse,
        })
    }

    pub fn scene(&self) -> &SceneState {
        &self.scene
    }

    pub fn pass(&self) -> &RenderPass {
        &self.pass
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Parse fetched mesh text and upload it. Returns how many lines were skipped.
    ///
    /// A strict parse failure marks the mesh failed instead of uploading it.
    pub fn load_mesh_text(&mut self, text: &str) -> Result<usize, RenderError> {
        if self.strict_parse {
            match parse_mesh(text) {
                Ok(mesh) => {
                    self.pass.upload_mesh(&mesh, &mut self.backend)?;
                    Ok(0)
                }
                Err(err) => {
                    self.pass.mark_mesh_failed(&LoadError::Parse(err));
                    Ok(0)
                }
            }
        } else {
            let parsed = parse_mesh_lenient(text);
            self.pass.upload_mesh(&parsed.mesh, &mut self.backend)?;
            Ok(parsed.skipped.len())
        }
    }

    pub fn fail_mesh(&mut self, err: &LoadError) {
        self.pass.mark_mesh_failed(err);
    }

    pub fn upload_cubemap_face(&mut self, image: &CubemapImage) -> Result<(), RenderError> {
        self.backend.upload_cubemap_face(image)
    }

    /// Returns true when the page should suppress the event's default action
    pub fn key_down(&mut self, name: &str) -> bool {
        match key_from_dom(name) {
            Some(key) => self.input.key_down(key, &mut self.scene).suppress_default,
            None => false,
        }
    }

    pub fn key_up(&mut self, name: &str) {
        if let Some(key) = key_from_dom(name) {
            self.input.key_up(key);
        }
    }

    /// Losing focus drops every held key
    pub fn release_keys(&mut self) {
        self.input.release_all();
    }

    pub fn set_shading(&mut self, shading: ShadingToggles) {
        self.scene.shading = shading;
    }

    pub fn frame(&mut self) -> Result<FrameReport, RenderError> {
        self.pass.render_frame(&self.scene, &mut self.backend)
    }
}

fn to_js(err: impl Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// JavaScript-facing viewer bound to one canvas
#[wasm_bindgen]
pub struct WebViewer {
    state: ViewerState<WebGlBackend>,
}

#[wasm_bindgen]
impl WebViewer {
    /// Fails when the canvas is missing or has no WebGL2 context
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_id: &str) -> Result<WebViewer, JsValue> {
        let document = web_sys::window()
            .and_then(|window| window.document())
            .ok_or_else(|| to_js("no document available"))?;
        let canvas = document
            .get_element_by_id(canvas_id)
            .ok_or_else(|| to_js(format!("no element with id {}", canvas_id)))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| to_js(format!("element {} is not a canvas", canvas_id)))?;
        let context = canvas
            .get_context("webgl2")?
            .ok_or_else(|| to_js("WebGL2 is not supported by this browser"))?
            .dyn_into::<WebGl2RenderingContext>()
            .map_err(|_| to_js("webgl2 context has an unexpected type"))?;

        let backend = WebGlBackend::new(context, canvas.width() as i32, canvas.height() as i32)
            .map_err(to_js)?;
        let state = ViewerState::new(backend, &ViewerConfig::default()).map_err(to_js)?;
        info!("Viewer attached to #{}", canvas_id);
        Ok(WebViewer { state })
    }

    pub fn load_mesh(&mut self, text: &str) -> Result<(), JsValue> {
        let skipped = self.state.load_mesh_text(text).map_err(to_js)?;
        if skipped > 0 {
            warn!("Skipped {} malformed mesh lines", skipped);
        }
        Ok(())
    }

    /// Report a failed fetch; the mesh is never drawn afterwards
    pub fn mesh_load_failed(&mut self, url: &str, reason: &str) {
        self.state.fail_mesh(&LoadError::Io {
            path: PathBuf::from(url),
            source: io::Error::new(io::ErrorKind::Other, reason.to_string()),
        });
    }

    /// Upload decoded RGBA pixels for face `index` (0 = +X ... 5 = -Z)
    pub fn upload_cubemap_face(
        &mut self,
        index: usize,
        width: u32,
        height: u32,
        rgba: Vec<u8>,
    ) -> Result<(), JsValue> {
        let face = CubeFace::from_index(index)
            .ok_or_else(|| to_js(format!("cubemap face index {} out of range", index)))?;
        let image = CubemapImage::from_rgba(face, width, height, rgba).map_err(to_js)?;
        self.state.upload_cubemap_face(&image).map_err(to_js)
    }

    pub fn key_down(&mut self, key: &str) -> bool {
        self.state.key_down(key)
    }

    pub fn key_up(&mut self, key: &str) {
        self.state.key_up(key);
    }

    pub fn release_keys(&mut self) {
        self.state.release_keys();
    }

    pub fn set_shading(&mut self, shaded: bool, reflective: bool, refractive: bool) {
        self.state.set_shading(ShadingToggles {
            shaded,
            reflective,
            refractive,
        });
    }

    pub fn resize(&mut self, width: i32, height: i32) {
        self.state.backend_mut().resize(width, height);
    }

    pub fn frame(&mut self) -> Result<(), JsValue> {
        self.state.frame().map(|_| ()).map_err(|err| {
            error!("Frame aborted: {}", err);
            to_js(err)
        })
    }

    #[wasm_bindgen(getter)]
    pub fn spin(&self) -> f32 {
        self.state.scene().spin_degrees
    }

    #[wasm_bindgen(getter)]
    pub fn eye_z(&self) -> f32 {
        self.state.scene().camera.eye.z
    }

    #[wasm_bindgen(getter)]
    pub fn orbit(&self) -> f32 {
        self.state.scene().orbit_degrees
    }
}

/// Route Rust panics to `console.error` instead of a bare `unreachable`
fn install_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

#[wasm_bindgen(start)]
pub fn start() {
    install_panic_hook();
    logger::init(log::LevelFilter::Info);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use teaview_core::{
        DepthFunc, GeometryBuffers, MeshUniforms, Readiness, ShadingMode, SkyboxUniforms,
    };

    #[derive(Default)]
    struct CountingBackend {
        meshes: usize,
        faces: usize,
        mesh_draws: usize,
        skybox_draws: usize,
    }

    impl RenderBackend for CountingBackend {
        fn aspect_ratio(&self) -> f32 {
            1.0
        }

        fn begin_frame(&mut self) -> Result<(), RenderError> {
            Ok(())
        }

        fn set_depth_func(&mut self, _func: DepthFunc) {}

        fn upload_skybox(&mut self, _buffers: GeometryBuffers<'_>) -> Result<(), RenderError> {
            Ok(())
        }

        fn upload_mesh(&mut self, _buffers: GeometryBuffers<'_>) -> Result<(), RenderError> {
            self.meshes += 1;
            Ok(())
        }

        fn upload_cubemap_face(&mut self, _image: &CubemapImage) -> Result<(), RenderError> {
            self.faces += 1;
            Ok(())
        }

        fn draw_skybox(&mut self, _uniforms: &SkyboxUniforms) -> Result<(), RenderError> {
            self.skybox_draws += 1;
            Ok(())
        }

        fn draw_mesh(&mut self, _uniforms: &MeshUniforms) -> Result<(), RenderError> {
            self.mesh_draws += 1;
            Ok(())
        }
    }

    const TRIANGLE: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";

    fn viewer() -> ViewerState<CountingBackend> {
        ViewerState::new(CountingBackend::default(), &ViewerConfig::default()).unwrap()
    }

    #[test]
    fn test_frames_skip_draws_until_mesh_arrives() {
        let mut viewer = viewer();
        assert!(!viewer.frame().unwrap().drawn);
        assert_eq!(viewer.backend().mesh_draws, 0);

        assert_eq!(viewer.load_mesh_text(TRIANGLE).unwrap(), 0);
        assert!(viewer.frame().unwrap().drawn);
        assert_eq!(viewer.backend().mesh_draws, 1);
        assert_eq!(viewer.backend().skybox_draws, 1);
    }

    #[test]
    fn test_lenient_load_reports_skipped_lines() {
        let mut viewer = viewer();
        let skipped = viewer
            .load_mesh_text("v 0 0 0\nv 1 0 0\nv x y z\nv 0 1 0\nf 1 2 3\n")
            .unwrap();
        assert_eq!(skipped, 1);
        assert_eq!(viewer.pass().mesh_readiness(), Readiness::Ready);
    }

    #[test]
    fn test_strict_load_failure_marks_mesh_failed() {
        let config = ViewerConfig {
            strict_parse: true,
            ..ViewerConfig::default()
        };
        let mut viewer = ViewerState::new(CountingBackend::default(), &config).unwrap();
        viewer.load_mesh_text("v 0 0 0\nf 1 2 3\n").unwrap();
        assert_eq!(viewer.pass().mesh_readiness(), Readiness::Failed);
        assert_eq!(viewer.backend().meshes, 0);
    }

    #[test]
    fn test_failed_fetch_never_draws() {
        let mut viewer = viewer();
        viewer.fail_mesh(&LoadError::Disconnected("teapot".to_string()));
        viewer.load_mesh_text(TRIANGLE).unwrap();
        viewer.frame().unwrap();
        assert_eq!(viewer.backend().mesh_draws, 0);
    }

    #[test]
    fn test_keys_drive_scene_and_suppress_scrolling() {
        let mut viewer = viewer();
        assert!(!viewer.key_down("a"));
        viewer.key_up("a");
        assert!(viewer.key_down("ArrowDown"));
        viewer.key_up("ArrowDown");
        assert!(viewer.key_down("ArrowRight"));
        assert!(!viewer.key_down("x"));

        assert_relative_eq!(viewer.scene().spin_degrees, -1.0);
        assert_relative_eq!(viewer.scene().camera.eye.z, 2.49);
        assert_relative_eq!(viewer.scene().orbit_degrees, -1.0);

        // ArrowRight was still held; after releasing everything it stops orbiting
        viewer.release_keys();
        viewer.key_down("a");
        assert_relative_eq!(viewer.scene().spin_degrees, -2.0);
        assert_relative_eq!(viewer.scene().orbit_degrees, -1.0);
    }

    #[test]
    fn test_shading_flags_multiply_draws() {
        let mut viewer = viewer();
        viewer.load_mesh_text(TRIANGLE).unwrap();
        viewer.set_shading(ShadingToggles {
            shaded: true,
            reflective: true,
            refractive: true,
        });
        let report = viewer.frame().unwrap();
        assert_eq!(report.modes_drawn, ShadingMode::ALL.to_vec());
        assert_eq!(viewer.backend().mesh_draws, 3);
    }

    #[test]
    fn test_cubemap_faces_pass_through() {
        let mut viewer = viewer();
        viewer
            .upload_cubemap_face(&CubemapImage::solid(CubeFace::NegativeY, 2, [1, 2, 3, 255]))
            .unwrap();
        assert_eq!(viewer.backend().faces, 1);
    }

    #[test]
    fn test_panic_hook_install_is_repeatable() {
        install_panic_hook();
        install_panic_hook();
        let result = std::panic::catch_unwind(|| panic!("still unwinds"));
        assert!(result.is_err());
    }
}
