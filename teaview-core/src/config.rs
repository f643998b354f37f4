//! Viewer configuration, loaded from TOML

use std::path::{Path, PathBuf};

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::camera::{Camera, FAR_PLANE, FIELD_OF_VIEW_DEGREES, NEAR_PLANE};
use crate::error::ConfigError;
use crate::scene::SceneState;
use crate::shading::ShadingToggles;
use crate::skybox::DEFAULT_HALF_EXTENT;

/// Starting camera
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub eye: [f32; 3],
    pub view_dir: [f32; 3],
    pub up: [f32; 3],
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            eye: [0.0, 0.0, 2.5],
            view_dir: [0.0, 0.0, -1.0],
            up: [0.0, 1.0, 0.0],
            fov_degrees: FIELD_OF_VIEW_DEGREES,
            near: NEAR_PLANE,
            far: FAR_PLANE,
        }
    }
}

impl CameraConfig {
    pub fn to_camera(&self) -> Camera {
        Camera {
            eye: Point3::from(self.eye),
            view_dir: Vector3::from(self.view_dir),
            up: Vector3::from(self.up),
            fov_degrees: self.fov_degrees,
            near: self.near,
            far: self.far,
        }
    }
}

/// Which shading toggles start enabled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadingConfig {
    pub shaded: bool,
    pub reflective: bool,
    pub refractive: bool,
}

impl Default for ShadingConfig {
    fn default() -> Self {
        let toggles = ShadingToggles::default();
        Self {
            shaded: toggles.shaded,
            reflective: toggles.reflective,
            refractive: toggles.refractive,
        }
    }
}

impl From<&ShadingConfig> for ShadingToggles {
    fn from(config: &ShadingConfig) -> Self {
        Self {
            shaded: config.shaded,
            reflective: config.reflective,
            refractive: config.refractive,
        }
    }
}

/// Top-level viewer settings; every field has a default
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Text mesh to load in the background
    pub mesh_path: PathBuf,
    /// Directory holding `pos-x.png` ... `neg-z.png`
    pub cubemap_dir: PathBuf,
    pub skybox_half_extent: f32,
    /// Fail the whole mesh on the first bad line instead of skipping it
    pub strict_parse: bool,
    pub target_fps: u32,
    /// Where the terminal viewer writes its log
    pub log_file: PathBuf,
    pub camera: CameraConfig,
    pub shading: ShadingConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            mesh_path: PathBuf::from("assets/teapot_0.obj"),
            cubemap_dir: PathBuf::from("assets/London"),
            skybox_half_extent: DEFAULT_HALF_EXTENT,
            strict_parse: false,
            target_fps: 30,
            log_file: PathBuf::from("teaview.log"),
            camera: CameraConfig::default(),
            shading: ShadingConfig::default(),
        }
    }
}

impl ViewerConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Initial scene built from the camera and shading sections
    pub fn scene_state(&self) -> SceneState {
        SceneState::new(self.camera.to_camera(), (&self.shading).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = ViewerConfig::from_toml_str("").unwrap();
        assert_eq!(config, ViewerConfig::default());
        assert_eq!(config.scene_state(), SceneState::default());
    }

    #[test]
    fn test_partial_document() {
        let config = ViewerConfig::from_toml_str(
            r#"
            mesh_path = "meshes/cow.obj"
            strict_parse = true

            [camera]
            eye = [0.0, 1.0, 4.0]

            [shading]
            shaded = false
            refractive = true
            "#,
        )
        .unwrap();

        assert_eq!(config.mesh_path, PathBuf::from("meshes/cow.obj"));
        assert!(config.strict_parse);
        assert_eq!(config.target_fps, 30);
        assert_eq!(config.camera.view_dir, [0.0, 0.0, -1.0]);

        let scene = config.scene_state();
        assert_eq!(scene.camera.eye, Point3::new(0.0, 1.0, 4.0));
        let modes: Vec<_> = scene.shading.active_modes().collect();
        assert_eq!(modes, vec![crate::shading::ShadingMode::Refractive]);
    }

    #[test]
    fn test_round_trip_through_toml() {
        let mut config = ViewerConfig::default();
        config.skybox_half_extent = 120.0;
        let text = toml::to_string(&config).unwrap();
        assert_eq!(ViewerConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_bad_document_is_a_parse_error() {
        assert!(matches!(
            ViewerConfig::from_toml_str("target_fps = \"fast\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        assert!(matches!(
            ViewerConfig::load(Path::new("/no/such/teaview.toml")),
            Err(ConfigError::Io(_))
        ));
    }
}
