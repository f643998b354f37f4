//! teaview core library - mesh ingestion, transforms and frame composition
//!
//! Everything here is backend-agnostic: a render backend (terminal, WebGL)
//! implements [`RenderBackend`] and the viewer drives a [`RenderPass`] with
//! an explicit [`SceneState`].

pub mod camera;
pub mod config;
pub mod cubemap;
pub mod error;
pub mod input;
pub mod loader;
pub mod matrix_stack;
pub mod mesh;
pub mod obj;
pub mod render;
pub mod scene;
pub mod shading;
pub mod skybox;
pub mod transform;

// Re-export commonly used types
pub use camera::Camera;
pub use config::ViewerConfig;
pub use cubemap::CubemapImage;
pub use error::{ConfigError, LoadError, MeshParseError, RenderError, StackError};
pub use input::{InputController, Key, KeyResponse};
pub use loader::{LoadStatus, PendingLoad};
pub use matrix_stack::{MatrixStack, ModelView};
pub use mesh::{BoundingBox, GeometryBuffers, MeshData, TriangleSurface};
pub use obj::{parse_mesh, parse_mesh_lenient, ParsedMesh};
pub use render::{
    DepthFunc, FrameReport, MeshUniforms, Readiness, RenderBackend, RenderPass, SkyboxUniforms,
};
pub use scene::SceneState;
pub use shading::{ShadingMode, ShadingToggles};
pub use skybox::{CubeFace, SkyboxGeometry};
pub use transform::Transform;
