//! WebGL2 implementation of the render backend

use log::{debug, info};
use nalgebra::{Matrix3, Matrix4, Vector3};
use teaview_core::cubemap::FACE_SIZE;
use teaview_core::{
    CubeFace, CubemapImage, DepthFunc, GeometryBuffers, MeshUniforms, RenderBackend, RenderError,
    SkyboxUniforms,
};
use web_sys::{
    WebGl2RenderingContext as Gl, WebGlBuffer, WebGlTexture, WebGlUniformLocation,
};

use crate::shaders::{mode_index, MeshProgram, SkyboxProgram};

/// Buffers for one uploaded surface
struct GpuSurface {
    positions: WebGlBuffer,
    normals: WebGlBuffer,
    indices: WebGlBuffer,
    index_count: i32,
}

pub struct WebGlBackend {
    gl: Gl,
    width: i32,
    height: i32,
    skybox_program: SkyboxProgram,
    mesh_program: MeshProgram,
    skybox: Option<GpuSurface>,
    mesh: Option<GpuSurface>,
    cubemap: WebGlTexture,
}

fn js_error(context: &str, value: wasm_bindgen::JsValue) -> RenderError {
    RenderError::Backend(format!("{}: {:?}", context, value))
}

impl WebGlBackend {
    /// Compile both programs and allocate the cubemap with blank faces
    pub fn new(gl: Gl, width: i32, height: i32) -> Result<Self, RenderError> {
        let skybox_program = SkyboxProgram::new(&gl)?;
        let mesh_program = MeshProgram::new(&gl)?;

        let cubemap = gl
            .create_texture()
            .ok_or_else(|| RenderError::Backend("unable to create cubemap texture".to_string()))?;
        gl.bind_texture(Gl::TEXTURE_CUBE_MAP, Some(&cubemap));
        for face in CubeFace::ALL {
            gl.tex_image_2d_with_i32_and_i32_and_i32_and_format_and_type_and_opt_u8_array(
                face_target(face),
                0,
                Gl::RGBA as i32,
                FACE_SIZE as i32,
                FACE_SIZE as i32,
                0,
                Gl::RGBA,
                Gl::UNSIGNED_BYTE,
                None,
            )
            .map_err(|err| js_error("allocating cubemap face", err))?;
        }
        gl.tex_parameteri(Gl::TEXTURE_CUBE_MAP, Gl::TEXTURE_MIN_FILTER, Gl::LINEAR as i32);
        gl.tex_parameteri(Gl::TEXTURE_CUBE_MAP, Gl::TEXTURE_MAG_FILTER, Gl::LINEAR as i32);

        gl.clear_color(0.0, 0.0, 0.0, 1.0);
        gl.enable(Gl::DEPTH_TEST);
        info!("WebGL backend ready at {}x{}", width, height);

        Ok(Self {
            gl,
            width,
            height,
            skybox_program,
            mesh_program,
            skybox: None,
            mesh: None,
            cubemap,
        })
    }

    pub fn resize(&mut self, width: i32, height: i32) {
        self.width = width;
        self.height = height;
    }

    fn array_buffer(&self, data: &[f32]) -> Result<WebGlBuffer, RenderError> {
        let buffer = self
            .gl
            .create_buffer()
            .ok_or_else(|| RenderError::Backend("unable to create buffer".to_string()))?;
        self.gl.bind_buffer(Gl::ARRAY_BUFFER, Some(&buffer));
        self.gl
            .buffer_data_with_u8_array(Gl::ARRAY_BUFFER, bytemuck::cast_slice(data), Gl::STATIC_DRAW);
        Ok(buffer)
    }

    fn upload_surface(&self, buffers: GeometryBuffers<'_>) -> Result<GpuSurface, RenderError> {
        let positions = self.array_buffer(&buffers.position_data())?;
        let normals = self.array_buffer(&buffers.normal_data())?;

        let index_data = buffers.index_data();
        let indices = self
            .gl
            .create_buffer()
            .ok_or_else(|| RenderError::Backend("unable to create index buffer".to_string()))?;
        self.gl.bind_buffer(Gl::ELEMENT_ARRAY_BUFFER, Some(&indices));
        self.gl.buffer_data_with_u8_array(
            Gl::ELEMENT_ARRAY_BUFFER,
            bytemuck::cast_slice(&index_data),
            Gl::STATIC_DRAW,
        );

        let index_count = i32::try_from(index_data.len())
            .map_err(|_| RenderError::Backend("too many indices".to_string()))?;
        debug!("Uploaded {} vertices, {} indices", buffers.positions.len(), index_count);
        Ok(GpuSurface {
            positions,
            normals,
            indices,
            index_count,
        })
    }

    fn bind_attribute(&self, location: Option<u32>, buffer: &WebGlBuffer) {
        let Some(location) = location else {
            return;
        };
        self.gl.bind_buffer(Gl::ARRAY_BUFFER, Some(buffer));
        self.gl.enable_vertex_attrib_array(location);
        self.gl
            .vertex_attrib_pointer_with_i32(location, 3, Gl::FLOAT, false, 0, 0);
    }

    fn draw_surface(&self, surface: &GpuSurface, position: Option<u32>, normal: Option<u32>) {
        self.bind_attribute(position, &surface.positions);
        self.bind_attribute(normal, &surface.normals);
        self.gl
            .bind_buffer(Gl::ELEMENT_ARRAY_BUFFER, Some(&surface.indices));
        self.gl
            .draw_elements_with_i32(Gl::TRIANGLES, surface.index_count, Gl::UNSIGNED_INT, 0);
    }

    fn bind_environment(&self, location: Option<&WebGlUniformLocation>, unit: u32) {
        self.gl.active_texture(Gl::TEXTURE0 + unit);
        self.gl.bind_texture(Gl::TEXTURE_CUBE_MAP, Some(&self.cubemap));
        self.gl.uniform1i(location, unit as i32);
    }

    fn matrix4(&self, location: Option<&WebGlUniformLocation>, matrix: &Matrix4<f32>) {
        self.gl
            .uniform_matrix4fv_with_f32_array(location, false, matrix.as_slice());
    }

    fn matrix3(&self, location: Option<&WebGlUniformLocation>, matrix: &Matrix3<f32>) {
        self.gl
            .uniform_matrix3fv_with_f32_array(location, false, matrix.as_slice());
    }

    fn vector3(&self, location: Option<&WebGlUniformLocation>, vector: &Vector3<f32>) {
        self.gl.uniform3fv_with_f32_array(location, vector.as_slice());
    }
}

/// `TEXTURE_CUBE_MAP_POSITIVE_X + i`; faces are enumerated in the same order
fn face_target(face: CubeFace) -> u32 {
    Gl::TEXTURE_CUBE_MAP_POSITIVE_X + face.index() as u32
}

impl RenderBackend for WebGlBackend {
    fn aspect_ratio(&self) -> f32 {
        if self.height <= 0 {
            return 1.0;
        }
        self.width as f32 / self.height as f32
    }

    fn begin_frame(&mut self) -> Result<(), RenderError> {
        self.gl.viewport(0, 0, self.width, self.height);
        self.gl.clear(Gl::COLOR_BUFFER_BIT | Gl::DEPTH_BUFFER_BIT);
        Ok(())
    }

    fn set_depth_func(&mut self, func: DepthFunc) {
        let func = match func {
            DepthFunc::Less => Gl::LESS,
            DepthFunc::LessEqual => Gl::LEQUAL,
        };
        self.gl.depth_func(func);
    }

    fn upload_skybox(&mut self, buffers: GeometryBuffers<'_>) -> Result<(), RenderError> {
        self.skybox = Some(self.upload_surface(buffers)?);
        Ok(())
    }

    fn upload_mesh(&mut self, buffers: GeometryBuffers<'_>) -> Result<(), RenderError> {
        self.mesh = Some(self.upload_surface(buffers)?);
        Ok(())
    }

    fn upload_cubemap_face(&mut self, image: &CubemapImage) -> Result<(), RenderError> {
        let width = i32::try_from(image.width())
            .map_err(|_| RenderError::Backend("cubemap face too wide".to_string()))?;
        let height = i32::try_from(image.height())
            .map_err(|_| RenderError::Backend("cubemap face too tall".to_string()))?;

        self.gl.bind_texture(Gl::TEXTURE_CUBE_MAP, Some(&self.cubemap));
        self.gl
            .tex_image_2d_with_i32_and_i32_and_i32_and_format_and_type_and_opt_u8_array(
                face_target(image.face()),
                0,
                Gl::RGBA as i32,
                width,
                height,
                0,
                Gl::RGBA,
                Gl::UNSIGNED_BYTE,
                Some(image.rgba()),
            )
            .map_err(|err| js_error("uploading cubemap face", err))?;
        self.gl.generate_mipmap(Gl::TEXTURE_CUBE_MAP);
        self.gl.tex_parameteri(
            Gl::TEXTURE_CUBE_MAP,
            Gl::TEXTURE_MIN_FILTER,
            Gl::LINEAR_MIPMAP_LINEAR as i32,
        );
        debug!("Cubemap face {:?} uploaded", image.face());
        Ok(())
    }

    fn draw_skybox(&mut self, uniforms: &SkyboxUniforms) -> Result<(), RenderError> {
        let surface = self
            .skybox
            .as_ref()
            .ok_or_else(|| RenderError::Backend("skybox drawn before upload".to_string()))?;
        let program = &self.skybox_program;

        self.gl.use_program(Some(&program.program));
        self.matrix4(program.model_view.as_ref(), &uniforms.model_view);
        self.matrix4(program.projection.as_ref(), &uniforms.projection);
        self.matrix3(program.normal_matrix.as_ref(), &uniforms.normal);
        self.bind_environment(program.environment.as_ref(), uniforms.environment_unit);
        self.draw_surface(surface, program.position, program.normal);
        Ok(())
    }

    fn draw_mesh(&mut self, uniforms: &MeshUniforms) -> Result<(), RenderError> {
        let surface = self
            .mesh
            .as_ref()
            .ok_or_else(|| RenderError::Backend("mesh drawn before upload".to_string()))?;
        let program = &self.mesh_program;
        let view_inverse: Matrix3<f32> = uniforms.view.fixed_view::<3, 3>(0, 0).transpose();

        self.gl.use_program(Some(&program.program));
        self.matrix4(program.model_view.as_ref(), &uniforms.model_view);
        self.matrix4(program.projection.as_ref(), &uniforms.projection);
        self.matrix3(program.normal_matrix.as_ref(), &uniforms.normal);
        self.matrix3(program.view_inverse.as_ref(), &view_inverse);
        self.vector3(
            program.camera_position.as_ref(),
            &uniforms.camera_position.coords,
        );
        self.gl
            .uniform1i(program.mode.as_ref(), mode_index(uniforms.mode));

        self.vector3(program.light_position.as_ref(), &uniforms.light.position);
        self.vector3(program.light_ambient.as_ref(), &uniforms.light.ambient);
        self.vector3(program.light_diffuse.as_ref(), &uniforms.light.diffuse);
        self.vector3(program.light_specular.as_ref(), &uniforms.light.specular);
        self.vector3(program.k_ambient.as_ref(), &uniforms.material.ambient);
        self.vector3(program.k_diffuse.as_ref(), &uniforms.material.diffuse);
        self.vector3(program.k_specular.as_ref(), &uniforms.material.specular);
        self.gl
            .uniform1f(program.shininess.as_ref(), uniforms.material.shininess);

        self.bind_environment(program.environment.as_ref(), uniforms.environment_unit);
        self.draw_surface(surface, program.position, program.normal);
        Ok(())
    }
}
