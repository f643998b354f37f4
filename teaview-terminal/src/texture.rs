/// Cubemap texture sampling for the software renderer
use nalgebra::Vector3;
use teaview_core::{CubeFace, CubemapImage};

/// Colour returned for faces whose image has not arrived
const MISSING_FACE: [u8; 3] = [0, 0, 0];

/// Six independently uploaded faces
#[derive(Debug, Clone, Default)]
pub struct CubemapTexture {
    faces: [Option<CubemapImage>; 6],
}

impl CubemapTexture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upload(&mut self, image: CubemapImage) {
        let index = image.face().index();
        self.faces[index] = Some(image);
    }

    pub fn loaded_faces(&self) -> usize {
        self.faces.iter().filter(|face| face.is_some()).count()
    }

    /// Pick the face a direction points at and the `(u, v)` within it.
    ///
    /// Uses the OpenGL cubemap convention with `v` running down the image.
    pub fn select_face(direction: &Vector3<f32>) -> Option<(CubeFace, f32, f32)> {
        let (x, y, z) = (direction.x, direction.y, direction.z);
        let (ax, ay, az) = (x.abs(), y.abs(), z.abs());

        let (face, sc, tc, major) = if ax >= ay && ax >= az {
            if x > 0.0 {
                (CubeFace::PositiveX, -z, -y, ax)
            } else {
                (CubeFace::NegativeX, z, -y, ax)
            }
        } else if ay >= az {
            if y > 0.0 {
                (CubeFace::PositiveY, x, z, ay)
            } else {
                (CubeFace::NegativeY, x, -z, ay)
            }
        } else if z > 0.0 {
            (CubeFace::PositiveZ, x, -y, az)
        } else {
            (CubeFace::NegativeZ, -x, -y, az)
        };

        if major <= f32::EPSILON || !major.is_finite() {
            return None;
        }
        Some((face, 0.5 * (sc / major + 1.0), 0.5 * (tc / major + 1.0)))
    }

    /// Nearest-texel RGB in `0.0..=1.0` for a direction
    pub fn sample(&self, direction: &Vector3<f32>) -> Vector3<f32> {
        let rgb = Self::select_face(direction)
            .and_then(|(face, u, v)| {
                let image = self.faces[face.index()].as_ref()?;
                let x = (u * image.width() as f32) as u32;
                let y = (v * image.height() as f32) as u32;
                let [r, g, b, _] = image.pixel(x, y);
                Some([r, g, b])
            })
            .unwrap_or(MISSING_FACE);
        Vector3::new(rgb[0] as f32, rgb[1] as f32, rgb[2] as f32) / 255.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_axis_directions_hit_face_centres() {
        for face in CubeFace::ALL {
            let (selected, u, v) = CubemapTexture::select_face(&face.normal()).unwrap();
            assert_eq!(selected, face);
            assert_relative_eq!(u, 0.5);
            assert_relative_eq!(v, 0.5);
        }
    }

    #[test]
    fn test_upward_tilt_samples_upper_rows() {
        let (face, _, v) = CubemapTexture::select_face(&Vector3::new(1.0, 0.5, 0.0)).unwrap();
        assert_eq!(face, CubeFace::PositiveX);
        assert_relative_eq!(v, 0.25);
    }

    #[test]
    fn test_zero_direction_selects_nothing() {
        assert!(CubemapTexture::select_face(&Vector3::zeros()).is_none());
    }

    #[test]
    fn test_missing_faces_sample_black() {
        let mut texture = CubemapTexture::new();
        texture.upload(CubemapImage::solid(CubeFace::PositiveZ, 4, [255, 0, 0, 255]));
        assert_eq!(texture.loaded_faces(), 1);

        assert_eq!(texture.sample(&Vector3::new(0.1, 0.0, 1.0)), Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(texture.sample(&Vector3::new(0.0, 0.0, -1.0)), Vector3::zeros());
    }

    #[test]
    fn test_reupload_replaces_face() {
        let mut texture = CubemapTexture::new();
        texture.upload(CubemapImage::solid(CubeFace::NegativeX, 2, [0, 0, 0, 255]));
        texture.upload(CubemapImage::solid(CubeFace::NegativeX, 2, [0, 255, 0, 255]));
        assert_eq!(texture.loaded_faces(), 1);
        assert_eq!(texture.sample(&Vector3::new(-1.0, 0.0, 0.0)), Vector3::new(0.0, 1.0, 0.0));
    }
}
