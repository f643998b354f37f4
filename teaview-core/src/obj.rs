/// Parser for the line-oriented text mesh format (`#`, `v`, `f` lines)
use log::{info, trace, warn};
use nalgebra::Point3;
use nom::{
    bytes::complete::take_till,
    character::complete::{char, space0, space1, u32 as index},
    combinator::{all_consuming, opt, verify},
    number::complete::float,
    sequence::{preceded, terminated, tuple},
    IResult,
};

use crate::error::MeshParseError;
use crate::mesh::MeshData;

/// Result of a lenient parse: the mesh plus every line that was skipped
#[derive(Debug, Clone, Default)]
pub struct ParsedMesh {
    pub mesh: MeshData,
    pub skipped: Vec<MeshParseError>,
}

/// Parse a text mesh, failing on the earliest malformed `v` or `f` line.
///
/// Faces may reference vertices declared further down, so the whole text is
/// scanned before the error with the lowest line number is returned.
pub fn parse_mesh(text: &str) -> Result<MeshData, MeshParseError> {
    let parsed = scan(text);
    match parsed.skipped.into_iter().next() {
        Some(err) => Err(err),
        None => Ok(parsed.mesh),
    }
}

/// Parse a text mesh, logging and skipping malformed lines instead of failing
pub fn parse_mesh_lenient(text: &str) -> ParsedMesh {
    let parsed = scan(text);
    for err in &parsed.skipped {
        warn!("Skipping mesh {}", err);
    }
    parsed
}

/// Build the mesh from every well-formed line; errors come back in line order
fn scan(text: &str) -> ParsedMesh {
    let mut builder = MeshBuilder::default();
    let mut skipped = Vec::new();
    for (number, line) in text.lines().enumerate() {
        if let Err(err) = builder.line(number + 1, line) {
            skipped.push(err);
        }
    }

    let mut parsed = builder.finish();
    skipped.append(&mut parsed.skipped);
    skipped.sort_by_key(MeshParseError::line);
    parsed.skipped = skipped;
    parsed
}

/// Face line as read, kept with its line number until vertices are all known
struct PendingFace {
    line: usize,
    indices: [u32; 3],
}

#[derive(Default)]
struct MeshBuilder {
    mesh: MeshData,
    faces: Vec<PendingFace>,
}

impl MeshBuilder {
    fn line(&mut self, number: usize, raw: &str) -> Result<(), MeshParseError> {
        let line = raw.trim();
        if line.starts_with('#') {
            trace!("{}", line);
            return Ok(());
        }

        let mut tokens = line.splitn(2, char::is_whitespace);
        let keyword = tokens.next().unwrap_or_default();
        let rest = tokens.next().unwrap_or_default();

        match keyword {
            "v" => {
                let (_, (x, y, z)) = all_consuming(vertex_fields)(rest).map_err(|_| {
                    MeshParseError::MalformedVertex {
                        line: number,
                        content: line.to_string(),
                    }
                })?;
                self.mesh.push_vertex(Point3::new(x, y, z));
            }
            "f" => {
                let (_, (a, b, c)) = all_consuming(face_fields)(rest).map_err(|_| {
                    MeshParseError::MalformedFace {
                        line: number,
                        content: line.to_string(),
                    }
                })?;
                if a == 0 || b == 0 || c == 0 {
                    return Err(MeshParseError::ZeroIndex {
                        line: number,
                        content: line.to_string(),
                    });
                }
                self.faces.push(PendingFace {
                    line: number,
                    indices: [a - 1, b - 1, c - 1],
                });
            }
            _ => {}
        }
        Ok(())
    }

    /// Range-check faces against the final vertex count and build normals.
    ///
    /// Out-of-range faces are dropped and returned in `skipped`.
    fn finish(mut self) -> ParsedMesh {
        let vertex_count = self.mesh.vertex_count();
        let mut skipped = Vec::new();

        for face in self.faces {
            let out_of_range = face
                .indices
                .iter()
                .find(|&&i| i as usize >= vertex_count)
                .copied();
            match out_of_range {
                None => self.mesh.push_face(face.indices),
                Some(i) => skipped.push(MeshParseError::IndexOutOfRange {
                    line: face.line,
                    index: i + 1,
                    vertex_count,
                }),
            }
        }

        self.mesh.generate_normals();
        info!(
            "Mesh: loaded {} triangles, {} vertices",
            self.mesh.face_count(),
            self.mesh.vertex_count()
        );

        ParsedMesh {
            mesh: self.mesh,
            skipped,
        }
    }
}

/// A finite float; `nan` and `inf` are rejected
fn coordinate(input: &str) -> IResult<&str, f32> {
    verify(float, |value: &f32| value.is_finite())(input)
}

fn vertex_fields(input: &str) -> IResult<&str, (f32, f32, f32)> {
    terminated(
        tuple((
            preceded(space0, coordinate),
            preceded(space1, coordinate),
            preceded(space1, coordinate),
        )),
        space0,
    )(input)
}

/// A vertex reference, ignoring any `/texture/normal` suffix
fn face_index(input: &str) -> IResult<&str, u32> {
    terminated(
        index,
        opt(preceded(char('/'), take_till(|c: char| c.is_whitespace()))),
    )(input)
}

fn face_fields(input: &str) -> IResult<&str, (u32, u32, u32)> {
    terminated(
        tuple((
            preceded(space0, face_index),
            preceded(space1, face_index),
            preceded(space1, face_index),
        )),
        space0,
    )(input)
}
