/// ASCII rasterizer implementing the render backend for terminals
use crossterm::{
    cursor,
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use log::{debug, trace};
use nalgebra::{Matrix3, Matrix4, Point3, Vector3, Vector4};
use std::io::Write;
use teaview_core::{
    CubemapImage, DepthFunc, GeometryBuffers, MeshUniforms, RenderBackend, RenderError,
    SkyboxUniforms,
};

use crate::shader::{self, Varying};
use crate::texture::CubemapTexture;

/// Character luminosity ramp for shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Terminal cells are about twice as tall as they are wide
pub const CELL_ASPECT: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Cell {
    glyph: char,
    color: [u8; 3],
}

const EMPTY_CELL: Cell = Cell {
    glyph: ' ',
    color: [0, 0, 0],
};

/// Owned copy of uploaded geometry
#[derive(Debug, Clone, Default)]
struct Surface {
    positions: Vec<Point3<f32>>,
    normals: Vec<Vector3<f32>>,
    faces: Vec<[u32; 3]>,
}

impl Surface {
    fn from_buffers(buffers: GeometryBuffers<'_>) -> Self {
        Self {
            positions: buffers.positions.to_vec(),
            normals: buffers.normals.to_vec(),
            faces: buffers.faces.to_vec(),
        }
    }
}

/// Matrices a draw call transforms its vertices with
struct Transforms {
    model_view: Matrix4<f32>,
    projection: Matrix4<f32>,
    normal: Matrix3<f32>,
}

#[derive(Debug, Clone, Copy)]
struct ClipVertex {
    clip: Vector4<f32>,
    varying: Varying,
}

impl ClipVertex {
    /// Signed distance to the near plane; negative means behind it
    fn near_distance(&self) -> f32 {
        self.clip.z + self.clip.w
    }

    fn lerp(&self, other: &ClipVertex, t: f32) -> ClipVertex {
        ClipVertex {
            clip: self.clip.lerp(&other.clip, t),
            varying: self.varying.lerp(&other.varying, t),
        }
    }
}

struct ScreenVertex {
    x: f32,
    y: f32,
    depth: f32,
    inv_w: f32,
}

/// Colour and depth storage for one frame
struct Framebuffer {
    width: usize,
    height: usize,
    depth_buffer: Vec<f32>,
    cells: Vec<Cell>,
    depth_func: DepthFunc,
}

impl Framebuffer {
    fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            depth_buffer: vec![f32::INFINITY; size],
            cells: vec![EMPTY_CELL; size],
            depth_func: DepthFunc::Less,
        }
    }

    fn clear(&mut self) {
        self.depth_buffer.fill(f32::INFINITY);
        self.cells.fill(EMPTY_CELL);
    }

    fn passes_depth(&self, idx: usize, depth: f32) -> bool {
        match self.depth_func {
            DepthFunc::Less => depth < self.depth_buffer[idx],
            DepthFunc::LessEqual => depth <= self.depth_buffer[idx],
        }
    }

    fn rasterize_surface<F>(&mut self, surface: &Surface, transforms: &Transforms, shade: F)
    where
        F: Fn(&Varying) -> Cell,
    {
        for face in &surface.faces {
            let Some(corners) = corner_vertices(surface, face, transforms) else {
                continue;
            };
            for triangle in clip_near(corners) {
                self.rasterize_triangle(&triangle, &shade);
            }
        }
    }

    fn to_screen(&self, vertex: &ClipVertex) -> ScreenVertex {
        let inv_w = 1.0 / vertex.clip.w;
        let ndc = vertex.clip.xyz() * inv_w;
        ScreenVertex {
            x: (ndc.x + 1.0) * 0.5 * self.width as f32,
            y: (1.0 - ndc.y) * 0.5 * self.height as f32,
            depth: ndc.z,
            inv_w,
        }
    }

    fn rasterize_triangle<F>(&mut self, triangle: &[ClipVertex; 3], shade: &F)
    where
        F: Fn(&Varying) -> Cell,
    {
        let [v0, v1, v2] = triangle.map(|vertex| self.to_screen(&vertex));

        // Bounding box
        let min_x = v0.x.min(v1.x).min(v2.x).floor() as i32;
        let max_x = v0.x.max(v1.x).max(v2.x).ceil() as i32;
        let min_y = v0.y.min(v1.y).min(v2.y).floor() as i32;
        let max_y = v0.y.max(v1.y).max(v2.y).ceil() as i32;

        // Clip to screen bounds
        let min_x = min_x.max(0);
        let max_x = max_x.min(self.width as i32 - 1);
        let min_y = min_y.max(0);
        let max_y = max_y.min(self.height as i32 - 1);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let px = x as f32 + 0.5;
                let py = y as f32 + 0.5;

                let Some((w0, w1, w2)) =
                    barycentric((v0.x, v0.y), (v1.x, v1.y), (v2.x, v2.y), (px, py))
                else {
                    continue;
                };
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }

                let depth = w0 * v0.depth + w1 * v1.depth + w2 * v2.depth;
                if depth > 1.0 {
                    continue;
                }
                let idx = y as usize * self.width + x as usize;
                if !self.passes_depth(idx, depth) {
                    continue;
                }

                // Perspective-correct weights
                let (a, b, c) = (w0 * v0.inv_w, w1 * v1.inv_w, w2 * v2.inv_w);
                let sum = a + b + c;
                let varying = Varying::blend(
                    [&triangle[0].varying, &triangle[1].varying, &triangle[2].varying],
                    [a / sum, b / sum, c / sum],
                );

                self.depth_buffer[idx] = depth;
                self.cells[idx] = shade(&varying);
            }
        }
    }
}

/// Transform one face's corners to clip space; `None` if an index is out of range
fn corner_vertices(
    surface: &Surface,
    face: &[u32; 3],
    transforms: &Transforms,
) -> Option<[ClipVertex; 3]> {
    let corner = |index: u32| -> Option<ClipVertex> {
        let position = surface.positions.get(index as usize)?;
        let normal = surface
            .normals
            .get(index as usize)
            .copied()
            .unwrap_or_else(Vector3::zeros);
        let view = transforms.model_view * position.to_homogeneous();
        Some(ClipVertex {
            clip: transforms.projection * view,
            varying: Varying {
                view_position: view.xyz(),
                normal: transforms.normal * normal,
                local: position.coords,
            },
        })
    };
    Some([corner(face[0])?, corner(face[1])?, corner(face[2])?])
}

/// Clip a triangle against the near plane, fanning the result back into triangles
fn clip_near(triangle: [ClipVertex; 3]) -> Vec<[ClipVertex; 3]> {
    let mut polygon: Vec<ClipVertex> = Vec::with_capacity(4);
    for i in 0..3 {
        let current = &triangle[i];
        let next = &triangle[(i + 1) % 3];
        let (dc, dn) = (current.near_distance(), next.near_distance());
        if dc >= 0.0 {
            polygon.push(*current);
        }
        if (dc >= 0.0) != (dn >= 0.0) {
            polygon.push(current.lerp(next, dc / (dc - dn)));
        }
    }
    polygon.retain(|vertex| vertex.clip.w > f32::EPSILON);

    (1..polygon.len().saturating_sub(1))
        .map(|i| [polygon[0], polygon[i], polygon[i + 1]])
        .collect()
}

/// Map a colour to a ramp glyph by its luminance
fn glyph_for(color: &Vector3<f32>, min_index: usize) -> char {
    let luminance = 0.2126 * color.x + 0.7152 * color.y + 0.0722 * color.z;
    let top = LUMINOSITY_RAMP.len() - 1;
    let index = (luminance.clamp(0.0, 1.0) * top as f32).round() as usize;
    LUMINOSITY_RAMP[index.clamp(min_index, top)]
}

fn to_cell(color: Vector3<f32>, min_glyph: usize) -> Cell {
    let rgb = color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
    Cell {
        glyph: glyph_for(&color, min_glyph),
        color: [rgb.x, rgb.y, rgb.z],
    }
}

/// Software renderer that draws into a grid of coloured characters
pub struct AsciiRenderer {
    framebuffer: Framebuffer,
    skybox: Option<Surface>,
    mesh: Option<Surface>,
    environment: CubemapTexture,
}

impl AsciiRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            framebuffer: Framebuffer::new(width, height),
            skybox: None,
            mesh: None,
            environment: CubemapTexture::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.framebuffer.width
    }

    pub fn height(&self) -> usize {
        self.framebuffer.height
    }

    /// Reallocate buffers for a new terminal size; uploads are kept
    pub fn resize(&mut self, width: usize, height: usize) {
        debug!("Resizing framebuffer to {}x{}", width, height);
        let depth_func = self.framebuffer.depth_func;
        self.framebuffer = Framebuffer::new(width, height);
        self.framebuffer.depth_func = depth_func;
    }

    pub fn environment(&self) -> &CubemapTexture {
        &self.environment
    }

    /// Glyph and colour at a cell, `None` outside the grid
    pub fn cell(&self, x: usize, y: usize) -> Option<(char, [u8; 3])> {
        if x >= self.framebuffer.width {
            return None;
        }
        let cell = self.framebuffer.cells.get(y * self.framebuffer.width + x)?;
        Some((cell.glyph, cell.color))
    }

    pub fn clear(&mut self) {
        self.framebuffer.clear();
    }

    /// Queue the whole grid to `writer`, one row per terminal line
    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        let mut current: Option<[u8; 3]> = None;
        for y in 0..self.framebuffer.height {
            writer.queue(cursor::MoveTo(0, y as u16))?;
            for x in 0..self.framebuffer.width {
                let cell = self.framebuffer.cells[y * self.framebuffer.width + x];
                if current != Some(cell.color) {
                    let [r, g, b] = cell.color;
                    writer.queue(SetForegroundColor(Color::Rgb { r, g, b }))?;
                    current = Some(cell.color);
                }
                writer.queue(Print(cell.glyph))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

impl RenderBackend for AsciiRenderer {
    fn aspect_ratio(&self) -> f32 {
        if self.framebuffer.height == 0 {
            return 1.0;
        }
        self.framebuffer.width as f32 / (self.framebuffer.height as f32 * CELL_ASPECT)
    }

    fn begin_frame(&mut self) -> Result<(), RenderError> {
        self.framebuffer.clear();
        Ok(())
    }

    fn set_depth_func(&mut self, func: DepthFunc) {
        self.framebuffer.depth_func = func;
    }

    fn upload_skybox(&mut self, buffers: GeometryBuffers<'_>) -> Result<(), RenderError> {
        self.skybox = Some(Surface::from_buffers(buffers));
        Ok(())
    }

    fn upload_mesh(&mut self, buffers: GeometryBuffers<'_>) -> Result<(), RenderError> {
        self.mesh = Some(Surface::from_buffers(buffers));
        Ok(())
    }

    fn upload_cubemap_face(&mut self, image: &CubemapImage) -> Result<(), RenderError> {
        trace!("Cubemap face {:?} {}x{}", image.face(), image.width(), image.height());
        self.environment.upload(image.clone());
        Ok(())
    }

    fn draw_skybox(&mut self, uniforms: &SkyboxUniforms) -> Result<(), RenderError> {
        let Some(skybox) = &self.skybox else {
            return Err(RenderError::Backend("skybox drawn before upload".to_string()));
        };
        let transforms = Transforms {
            model_view: uniforms.model_view,
            projection: uniforms.projection,
            normal: uniforms.normal,
        };
        let environment = &self.environment;
        self.framebuffer.rasterize_surface(skybox, &transforms, |varying| {
            to_cell(shader::skybox(environment, varying), 0)
        });
        Ok(())
    }

    fn draw_mesh(&mut self, uniforms: &MeshUniforms) -> Result<(), RenderError> {
        let Some(mesh) = &self.mesh else {
            return Err(RenderError::Backend("mesh drawn before upload".to_string()));
        };
        let transforms = Transforms {
            model_view: uniforms.model_view,
            projection: uniforms.projection,
            normal: uniforms.normal,
        };
        let view_rotation_inverse = uniforms.view.fixed_view::<3, 3>(0, 0).transpose();
        let environment = &self.environment;
        // Keep the silhouette visible against a dark environment
        self.framebuffer.rasterize_surface(mesh, &transforms, |varying| {
            to_cell(
                shader::mesh(environment, uniforms, &view_rotation_inverse, varying),
                1,
            )
        });
        Ok(())
    }
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: (f32, f32),
    v1: (f32, f32),
    v2: (f32, f32),
    p: (f32, f32),
) -> Option<(f32, f32, f32)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}
