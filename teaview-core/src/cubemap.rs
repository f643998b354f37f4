//! Cubemap face images

use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::error::LoadError;
use crate::skybox::CubeFace;

/// Edge length each face is allocated at before its image arrives
pub const FACE_SIZE: u32 = 512;

/// One decoded cubemap face in RGBA8, rows top to bottom
#[derive(Debug, Clone, PartialEq)]
pub struct CubemapImage {
    face: CubeFace,
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl CubemapImage {
    /// Wrap raw RGBA bytes, checking the length matches the dimensions
    pub fn from_rgba(face: CubeFace, width: u32, height: u32, rgba: Vec<u8>) -> Result<Self, LoadError> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(LoadError::ImageSize {
                width,
                height,
                expected,
                actual: rgba.len(),
            });
        }
        Ok(Self {
            face,
            width,
            height,
            rgba,
        })
    }

    /// A single-colour face, handy as a placeholder
    pub fn solid(face: CubeFace, size: u32, color: [u8; 4]) -> Self {
        let rgba = color
            .iter()
            .copied()
            .cycle()
            .take(size as usize * size as usize * 4)
            .collect();
        Self {
            face,
            width: size,
            height: size,
            rgba,
        }
    }

    /// Decode an image file into RGBA8
    pub fn load(face: CubeFace, path: &Path) -> Result<Self, LoadError> {
        let decoded = image::open(path).map_err(|source| LoadError::Image {
            path: path.to_path_buf(),
            source,
        })?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        if width != height {
            warn!(
                "Cubemap face {:?} from {} is {}x{}, not square",
                face,
                path.display(),
                width,
                height
            );
        }
        info!("Loaded cubemap face {:?} {}x{}", face, width, height);
        Ok(Self {
            face,
            width,
            height,
            rgba: rgba.into_raw(),
        })
    }

    pub fn face(&self) -> CubeFace {
        self.face
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel bytes, always `width * height * 4` long
    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    /// RGBA at pixel `(x, y)`, clamped to the image
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        if self.width == 0 || self.height == 0 {
            return [0, 0, 0, 255];
        }
        let x = x.min(self.width - 1) as usize;
        let y = y.min(self.height - 1) as usize;
        let offset = (y * self.width as usize + x) * 4;
        self.rgba
            .get(offset..offset + 4)
            .and_then(|texel| texel.try_into().ok())
            .unwrap_or([0, 0, 0, 255])
    }
}

/// `<dir>/<stem>.png` for a face, e.g. `London/pos-x.png`
pub fn face_path(dir: &Path, face: CubeFace) -> PathBuf {
    dir.join(format!("{}.png", face.file_stem()))
}
