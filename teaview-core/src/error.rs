//! Error types shared across the viewer

use std::path::PathBuf;
use thiserror::Error;

/// A malformed or inconsistent line in a text mesh
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeshParseError {
    #[error("line {line}: malformed vertex `{content}`")]
    MalformedVertex { line: usize, content: String },

    #[error("line {line}: malformed face `{content}`")]
    MalformedFace { line: usize, content: String },

    #[error("line {line}: face index 0 in `{content}` (indices start at 1)")]
    ZeroIndex { line: usize, content: String },

    #[error("line {line}: face references vertex {index} but the mesh has {vertex_count} vertices")]
    IndexOutOfRange {
        line: usize,
        index: u32,
        vertex_count: usize,
    },
}

impl MeshParseError {
    /// 1-based line number of the offending line
    pub fn line(&self) -> usize {
        match self {
            Self::MalformedVertex { line, .. }
            | Self::MalformedFace { line, .. }
            | Self::ZeroIndex { line, .. }
            | Self::IndexOutOfRange { line, .. } => *line,
        }
    }
}

/// Misuse of a modelview matrix stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StackError {
    #[error("pop on an empty matrix stack")]
    EmptyPop,
}

/// Failure of a background mesh or texture load
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse mesh: {0}")]
    Parse(#[from] MeshParseError),

    #[error("failed to decode image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("image data is {actual} bytes, expected {expected} for {width}x{height} RGBA")]
    ImageSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("could not start loader thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("loader for {0} stopped without delivering a result")]
    Disconnected(String),
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Failure while composing or issuing a frame
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Stack(#[from] StackError),

    #[error("render backend failure: {0}")]
    Backend(String),

    #[error("output error: {0}")]
    Io(#[from] std::io::Error),
}
