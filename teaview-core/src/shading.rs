//! Shading modes and the fixed light/material constants

use nalgebra::Vector3;

/// How the mesh is lit for one draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShadingMode {
    /// Phong reflection
    Shaded,
    /// Mirror reflection of the environment cubemap
    Reflective,
    /// Refraction through the environment cubemap
    Refractive,
}

impl ShadingMode {
    pub const ALL: [ShadingMode; 3] = [
        ShadingMode::Shaded,
        ShadingMode::Reflective,
        ShadingMode::Refractive,
    ];

    /// Light position in view coordinates; every axis gets the same value
    pub fn light_position(self) -> Vector3<f32> {
        let value = match self {
            ShadingMode::Shaded => 1.0,
            ShadingMode::Reflective => 0.0,
            ShadingMode::Refractive => 0.55,
        };
        Vector3::repeat(value)
    }

    pub fn label(self) -> &'static str {
        match self {
            ShadingMode::Shaded => "shaded",
            ShadingMode::Reflective => "reflective",
            ShadingMode::Refractive => "refractive",
        }
    }
}

/// Three independent UI toggles; each enabled one produces a draw per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadingToggles {
    pub shaded: bool,
    pub reflective: bool,
    pub refractive: bool,
}

impl ShadingToggles {
    pub fn only(mode: ShadingMode) -> Self {
        let mut toggles = Self::none();
        toggles.set(mode, true);
        toggles
    }

    pub fn none() -> Self {
        Self {
            shaded: false,
            reflective: false,
            refractive: false,
        }
    }

    pub fn is_enabled(&self, mode: ShadingMode) -> bool {
        match mode {
            ShadingMode::Shaded => self.shaded,
            ShadingMode::Reflective => self.reflective,
            ShadingMode::Refractive => self.refractive,
        }
    }

    pub fn set(&mut self, mode: ShadingMode, enabled: bool) {
        match mode {
            ShadingMode::Shaded => self.shaded = enabled,
            ShadingMode::Reflective => self.reflective = enabled,
            ShadingMode::Refractive => self.refractive = enabled,
        }
    }

    pub fn toggle(&mut self, mode: ShadingMode) {
        self.set(mode, !self.is_enabled(mode));
    }

    /// Radio-button behaviour: enable `mode`, disable the others
    pub fn select(&mut self, mode: ShadingMode) {
        *self = Self::only(mode);
    }

    /// Enabled modes in draw order
    pub fn active_modes(&self) -> impl Iterator<Item = ShadingMode> + '_ {
        ShadingMode::ALL
            .into_iter()
            .filter(move |&mode| self.is_enabled(mode))
    }
}

impl Default for ShadingToggles {
    fn default() -> Self {
        Self::only(ShadingMode::Shaded)
    }
}

/// Light colour terms for Phong reflection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightUniforms {
    pub position: Vector3<f32>,
    pub ambient: Vector3<f32>,
    pub diffuse: Vector3<f32>,
    pub specular: Vector3<f32>,
}

impl LightUniforms {
    pub fn for_mode(mode: ShadingMode) -> Self {
        Self {
            position: mode.light_position(),
            ambient: Vector3::repeat(0.1),
            diffuse: Vector3::repeat(0.5),
            specular: Vector3::repeat(1.0),
        }
    }
}

/// Material colour terms for Phong reflection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialUniforms {
    pub ambient: Vector3<f32>,
    pub diffuse: Vector3<f32>,
    pub specular: Vector3<f32>,
    pub shininess: f32,
}

impl Default for MaterialUniforms {
    fn default() -> Self {
        Self {
            ambient: Vector3::repeat(0.3),
            diffuse: Vector3::new(100.0 / 255.0, 50.0 / 255.0, 63.0 / 255.0),
            specular: Vector3::repeat(1.0),
            shininess: 23.0,
        }
    }
}
