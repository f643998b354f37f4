//! Per-cell shading for the software renderer
//!
//! Mirrors what the GPU programs do per fragment: Phong lighting in view
//! space for the shaded mode, and environment lookups for the reflective and
//! refractive modes.

use nalgebra::{Matrix3, Vector3};
use teaview_core::{MeshUniforms, ShadingMode};

use crate::texture::CubemapTexture;

/// Relative index of refraction going from air into glass
pub const REFRACTION_RATIO: f32 = 1.0 / 1.52;

/// Interpolated per-fragment inputs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Varying {
    /// Position in view space
    pub view_position: Vector3<f32>,
    /// Normal in view space, not yet renormalized
    pub normal: Vector3<f32>,
    /// Untransformed model-space position
    pub local: Vector3<f32>,
}

impl Varying {
    pub fn lerp(&self, other: &Varying, t: f32) -> Varying {
        Varying {
            view_position: self.view_position.lerp(&other.view_position, t),
            normal: self.normal.lerp(&other.normal, t),
            local: self.local.lerp(&other.local, t),
        }
    }

    /// Weighted sum of three varyings; weights are expected to sum to one
    pub fn blend(corners: [&Varying; 3], weights: [f32; 3]) -> Varying {
        let mut out = Varying {
            view_position: Vector3::zeros(),
            normal: Vector3::zeros(),
            local: Vector3::zeros(),
        };
        for (corner, weight) in corners.iter().zip(weights) {
            out.view_position += corner.view_position * weight;
            out.normal += corner.normal * weight;
            out.local += corner.local * weight;
        }
        out
    }
}

/// Skybox colour: the environment seen along the cube's own position
pub fn skybox(environment: &CubemapTexture, varying: &Varying) -> Vector3<f32> {
    environment.sample(&varying.local)
}

/// Mesh colour for one of the three shading modes.
///
/// `view_rotation_inverse` maps view-space directions back into the
/// cubemap's world frame.
pub fn mesh(
    environment: &CubemapTexture,
    uniforms: &MeshUniforms,
    view_rotation_inverse: &Matrix3<f32>,
    varying: &Varying,
) -> Vector3<f32> {
    let normal = varying
        .normal
        .try_normalize(f32::EPSILON)
        .unwrap_or_else(Vector3::z);
    let incident = varying
        .view_position
        .try_normalize(f32::EPSILON)
        .unwrap_or_else(|| -Vector3::z());

    match uniforms.mode {
        ShadingMode::Shaded => phong(uniforms, varying, &normal, &incident),
        ShadingMode::Reflective => {
            let direction = reflect(&incident, &normal);
            environment.sample(&(view_rotation_inverse * direction))
        }
        ShadingMode::Refractive => {
            let direction = refract(&incident, &normal, REFRACTION_RATIO)
                .unwrap_or_else(|| reflect(&incident, &normal));
            environment.sample(&(view_rotation_inverse * direction))
        }
    }
}

fn phong(
    uniforms: &MeshUniforms,
    varying: &Varying,
    normal: &Vector3<f32>,
    incident: &Vector3<f32>,
) -> Vector3<f32> {
    let light = &uniforms.light;
    let material = &uniforms.material;

    let ambient = material.ambient.component_mul(&light.ambient);
    let to_light = (light.position - varying.view_position)
        .try_normalize(f32::EPSILON)
        .unwrap_or_else(Vector3::z);

    let lambert = normal.dot(&to_light).max(0.0);
    let diffuse = material.diffuse.component_mul(&light.diffuse) * lambert;

    let specular = if lambert > 0.0 {
        let reflected = reflect(&-to_light, normal);
        let highlight = reflected.dot(&-incident).max(0.0).powf(material.shininess);
        material.specular.component_mul(&light.specular) * highlight
    } else {
        Vector3::zeros()
    };

    (ambient + diffuse + specular).map(|c| c.clamp(0.0, 1.0))
}

/// GLSL `reflect`
pub fn reflect(incident: &Vector3<f32>, normal: &Vector3<f32>) -> Vector3<f32> {
    incident - normal * (2.0 * normal.dot(incident))
}

/// GLSL `refract`, `None` on total internal reflection
pub fn refract(incident: &Vector3<f32>, normal: &Vector3<f32>, eta: f32) -> Option<Vector3<f32>> {
    let cos_i = normal.dot(incident);
    let k = 1.0 - eta * eta * (1.0 - cos_i * cos_i);
    if k < 0.0 {
        return None;
    }
    Some(incident * eta - normal * (eta * cos_i + k.sqrt()))
}
