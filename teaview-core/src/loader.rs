//! Background loading of meshes and cubemap faces
//!
//! Each load runs on its own worker thread and delivers exactly one result
//! through a channel. The render loop polls without blocking and keeps
//! drawing whatever is ready.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;

use log::{debug, info};

use crate::cubemap::{face_path, CubemapImage};
use crate::error::LoadError;
use crate::mesh::MeshData;
use crate::obj::{parse_mesh, parse_mesh_lenient};
use crate::skybox::CubeFace;

/// Outcome of polling a [`PendingLoad`]
#[derive(Debug)]
pub enum LoadStatus<T> {
    Pending,
    Ready(T),
    Failed(LoadError),
}

/// A non-blocking handle to an in-flight load.
/// Call `poll()` each frame to check for the result without blocking the render loop.
pub struct PendingLoad<T> {
    label: String,
    receiver: mpsc::Receiver<Result<T, LoadError>>,
}

impl<T> PendingLoad<T> {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Non-blocking check. Once this returns `Ready` or `Failed` the handle is spent.
    pub fn poll(&self) -> LoadStatus<T> {
        match self.receiver.try_recv() {
            Ok(Ok(value)) => LoadStatus::Ready(value),
            Ok(Err(err)) => LoadStatus::Failed(err),
            Err(mpsc::TryRecvError::Empty) => LoadStatus::Pending,
            Err(mpsc::TryRecvError::Disconnected) => {
                LoadStatus::Failed(LoadError::Disconnected(self.label.clone()))
            }
        }
    }

    /// Blocking wait for the result. Only for tools and tests.
    pub fn wait(self) -> Result<T, LoadError> {
        self.receiver
            .recv()
            .map_err(|_| LoadError::Disconnected(self.label))?
    }
}

/// Run `job` on a named worker thread
pub fn spawn<T, F>(label: impl Into<String>, job: F) -> PendingLoad<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, LoadError> + Send + 'static,
{
    let label = label.into();
    let (tx, rx) = mpsc::channel();
    let worker_tx = tx.clone();

    let spawned = thread::Builder::new()
        .name(format!("load-{}", label))
        .spawn(move || {
            let _ = worker_tx.send(job());
        });
    if let Err(err) = spawned {
        let _ = tx.send(Err(LoadError::Spawn(err)));
    }
    debug!("Started load of {}", label);

    PendingLoad {
        label,
        receiver: rx,
    }
}

/// Read and parse a mesh file on the calling thread
pub fn read_mesh_file(path: &Path, strict: bool) -> Result<MeshData, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Read mesh text from {} ({} bytes)", path.display(), text.len());

    if strict {
        Ok(parse_mesh(&text)?)
    } else {
        Ok(parse_mesh_lenient(&text).mesh)
    }
}

/// Read and parse a mesh file in the background
pub fn load_mesh(path: impl Into<PathBuf>, strict: bool) -> PendingLoad<MeshData> {
    let path = path.into();
    let label = path.display().to_string();
    spawn(label, move || read_mesh_file(&path, strict))
}

/// Start six independent face loads from `dir`, in [`CubeFace::ALL`] order
pub fn load_cubemap(dir: &Path) -> Vec<PendingLoad<CubemapImage>> {
    CubeFace::ALL
        .into_iter()
        .map(|face| {
            let path = face_path(dir, face);
            spawn(face.file_stem(), move || CubemapImage::load(face, &path))
        })
        .collect()
}
