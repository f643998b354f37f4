//! GLSL programs for the skybox and the mesh, with typed handle lookup

use teaview_core::{RenderError, ShadingMode};
use web_sys::{WebGl2RenderingContext as Gl, WebGlProgram, WebGlShader, WebGlUniformLocation};

pub const SKYBOX_VERTEX: &str = r#"#version 300 es
in vec3 aVertexPositionSky;
in vec3 aVertexNormalSky;

uniform mat4 uMVMatrixSky;
uniform mat4 uPMatrix;
uniform mat3 uNMatrixSky;

out vec3 vDirection;

void main() {
    vDirection = aVertexPositionSky;
    gl_Position = uPMatrix * uMVMatrixSky * vec4(aVertexPositionSky, 1.0);
}
"#;

pub const SKYBOX_FRAGMENT: &str = r#"#version 300 es
precision mediump float;

in vec3 vDirection;
uniform samplerCube uSkyboxTexture;
out vec4 fragColor;

void main() {
    fragColor = texture(uSkyboxTexture, normalize(vDirection));
}
"#;

pub const MESH_VERTEX: &str = r#"#version 300 es
in vec3 aVertexPositionTea;
in vec3 aVertexNormalTea;

uniform mat4 uMVMatrixTea;
uniform mat4 uPMatrix;
uniform mat3 uNMatrixTea;

out vec3 vPosition;
out vec3 vNormal;

void main() {
    vec4 viewPosition = uMVMatrixTea * vec4(aVertexPositionTea, 1.0);
    vPosition = viewPosition.xyz;
    vNormal = normalize(uNMatrixTea * aVertexNormalTea);
    gl_Position = uPMatrix * viewPosition;
}
"#;

pub const MESH_FRAGMENT: &str = r#"#version 300 es
precision mediump float;

in vec3 vPosition;
in vec3 vNormal;

uniform int uMode;
uniform vec3 uLightPosition;
uniform vec3 uAmbientLightColor;
uniform vec3 uDiffuseLightColor;
uniform vec3 uSpecularLightColor;
uniform vec3 uKAmbient;
uniform vec3 uKDiffuse;
uniform vec3 uKSpecular;
uniform float uShininess;
uniform mat3 uViewInverse;
uniform vec3 uCameraPosition;
uniform samplerCube uSkyboxTexture;

out vec4 fragColor;

const float REFRACTION_RATIO = 1.0 / 1.52;

void main() {
    vec3 normal = normalize(vNormal);
    vec3 incident = normalize(vPosition);

    if (uMode == 0) {
        vec3 toLight = normalize(uLightPosition - vPosition);
        float lambert = max(dot(normal, toLight), 0.0);
        float highlight = 0.0;
        if (lambert > 0.0) {
            vec3 reflected = reflect(-toLight, normal);
            highlight = pow(max(dot(reflected, -incident), 0.0), uShininess);
        }
        vec3 color = uKAmbient * uAmbientLightColor
            + uKDiffuse * uDiffuseLightColor * lambert
            + uKSpecular * uSpecularLightColor * highlight;
        fragColor = vec4(clamp(color, 0.0, 1.0), 1.0);
    } else {
        // Environment lookups happen in world space, where the cubemap lives
        vec3 worldPosition = uViewInverse * vPosition + uCameraPosition;
        vec3 worldNormal = normalize(uViewInverse * normal);
        vec3 worldIncident = normalize(worldPosition - uCameraPosition);
        vec3 direction = reflect(worldIncident, worldNormal);
        if (uMode == 2) {
            vec3 refracted = refract(worldIncident, worldNormal, REFRACTION_RATIO);
            if (dot(refracted, refracted) > 0.0) {
                direction = refracted;
            }
        }
        fragColor = texture(uSkyboxTexture, direction);
    }
}
"#;

/// Value of `uMode` for each shading mode
pub fn mode_index(mode: ShadingMode) -> i32 {
    match mode {
        ShadingMode::Shaded => 0,
        ShadingMode::Reflective => 1,
        ShadingMode::Refractive => 2,
    }
}

pub fn compile_shader(gl: &Gl, kind: u32, source: &str) -> Result<WebGlShader, RenderError> {
    let shader = gl
        .create_shader(kind)
        .ok_or_else(|| RenderError::Backend("unable to create shader object".to_string()))?;
    gl.shader_source(&shader, source);
    gl.compile_shader(&shader);

    let compiled = gl
        .get_shader_parameter(&shader, Gl::COMPILE_STATUS)
        .as_bool()
        .unwrap_or(false);
    if compiled {
        Ok(shader)
    } else {
        let log = gl.get_shader_info_log(&shader).unwrap_or_default();
        gl.delete_shader(Some(&shader));
        Err(RenderError::Backend(format!("shader compile failed: {}", log)))
    }
}

pub fn link_program(gl: &Gl, vertex: &str, fragment: &str) -> Result<WebGlProgram, RenderError> {
    let vertex = compile_shader(gl, Gl::VERTEX_SHADER, vertex)?;
    let fragment = compile_shader(gl, Gl::FRAGMENT_SHADER, fragment)?;
    let program = gl
        .create_program()
        .ok_or_else(|| RenderError::Backend("unable to create program object".to_string()))?;
    gl.attach_shader(&program, &vertex);
    gl.attach_shader(&program, &fragment);
    gl.link_program(&program);

    let linked = gl
        .get_program_parameter(&program, Gl::LINK_STATUS)
        .as_bool()
        .unwrap_or(false);
    if linked {
        Ok(program)
    } else {
        let log = gl.get_program_info_log(&program).unwrap_or_default();
        gl.delete_program(Some(&program));
        Err(RenderError::Backend(format!("program link failed: {}", log)))
    }
}

/// Attribute index, `None` when the linker dropped it
fn attribute(gl: &Gl, program: &WebGlProgram, name: &str) -> Option<u32> {
    u32::try_from(gl.get_attrib_location(program, name)).ok()
}

pub struct SkyboxProgram {
    pub program: WebGlProgram,
    pub position: Option<u32>,
    pub normal: Option<u32>,
    pub model_view: Option<WebGlUniformLocation>,
    pub projection: Option<WebGlUniformLocation>,
    pub normal_matrix: Option<WebGlUniformLocation>,
    pub environment: Option<WebGlUniformLocation>,
}

impl SkyboxProgram {
    pub fn new(gl: &Gl) -> Result<Self, RenderError> {
        let program = link_program(gl, SKYBOX_VERTEX, SKYBOX_FRAGMENT)?;
        Ok(Self {
            position: attribute(gl, &program, "aVertexPositionSky"),
            normal: attribute(gl, &program, "aVertexNormalSky"),
            model_view: gl.get_uniform_location(&program, "uMVMatrixSky"),
            projection: gl.get_uniform_location(&program, "uPMatrix"),
            normal_matrix: gl.get_uniform_location(&program, "uNMatrixSky"),
            environment: gl.get_uniform_location(&program, "uSkyboxTexture"),
            program,
        })
    }
}

pub struct MeshProgram {
    pub program: WebGlProgram,
    pub position: Option<u32>,
    pub normal: Option<u32>,
    pub model_view: Option<WebGlUniformLocation>,
    pub projection: Option<WebGlUniformLocation>,
    pub normal_matrix: Option<WebGlUniformLocation>,
    pub view_inverse: Option<WebGlUniformLocation>,
    pub camera_position: Option<WebGlUniformLocation>,
    pub mode: Option<WebGlUniformLocation>,
    pub light_position: Option<WebGlUniformLocation>,
    pub light_ambient: Option<WebGlUniformLocation>,
    pub light_diffuse: Option<WebGlUniformLocation>,
    pub light_specular: Option<WebGlUniformLocation>,
    pub k_ambient: Option<WebGlUniformLocation>,
    pub k_diffuse: Option<WebGlUniformLocation>,
    pub k_specular: Option<WebGlUniformLocation>,
    pub shininess: Option<WebGlUniformLocation>,
    pub environment: Option<WebGlUniformLocation>,
}

impl MeshProgram {
    pub fn new(gl: &Gl) -> Result<Self, RenderError> {
        let program = link_program(gl, MESH_VERTEX, MESH_FRAGMENT)?;
        let uniform = |name: &str| gl.get_uniform_location(&program, name);
        Ok(Self {
            position: attribute(gl, &program, "aVertexPositionTea"),
            normal: attribute(gl, &program, "aVertexNormalTea"),
            model_view: uniform("uMVMatrixTea"),
            projection: uniform("uPMatrix"),
            normal_matrix: uniform("uNMatrixTea"),
            view_inverse: uniform("uViewInverse"),
            camera_position: uniform("uCameraPosition"),
            mode: uniform("uMode"),
            light_position: uniform("uLightPosition"),
            light_ambient: uniform("uAmbientLightColor"),
            light_diffuse: uniform("uDiffuseLightColor"),
            light_specular: uniform("uSpecularLightColor"),
            k_ambient: uniform("uKAmbient"),
            k_diffuse: uniform("uKDiffuse"),
            k_specular: uniform("uKSpecular"),
            shininess: uniform("uShininess"),
            environment: uniform("uSkyboxTexture"),
            program,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sources_declare_looked_up_names() {
        for name in ["aVertexPositionSky", "uMVMatrixSky", "uPMatrix", "uNMatrixSky"] {
            assert!(SKYBOX_VERTEX.contains(name), "{}", name);
        }
        assert!(SKYBOX_FRAGMENT.contains("uSkyboxTexture"));

        for name in ["aVertexPositionTea", "aVertexNormalTea", "uMVMatrixTea", "uNMatrixTea"] {
            assert!(MESH_VERTEX.contains(name), "{}", name);
        }
        for name in [
            "uMode",
            "uLightPosition",
            "uAmbientLightColor",
            "uDiffuseLightColor",
            "uSpecularLightColor",
            "uKAmbient",
            "uKDiffuse",
            "uKSpecular",
            "uShininess",
            "uViewInverse",
            "uCameraPosition",
            "uSkyboxTexture",
        ] {
            assert!(MESH_FRAGMENT.contains(name), "{}", name);
        }
    }

    #[test]
    fn test_sources_target_es3() {
        for source in [SKYBOX_VERTEX, SKYBOX_FRAGMENT, MESH_VERTEX, MESH_FRAGMENT] {
            assert!(source.starts_with("#version 300 es\n"));
        }
    }

    #[test]
    fn test_mode_indices_match_fragment_branches() {
        assert_eq!(mode_index(ShadingMode::Shaded), 0);
        assert_eq!(mode_index(ShadingMode::Reflective), 1);
        assert_eq!(mode_index(ShadingMode::Refractive), 2);
    }
}
