mod gltf_import;

pub use gltf_import::decode_model;

use crate::scene::{NodeId, SceneGraph};
use glam::Vec3;
use std::io::Read;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read model at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode model at {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: gltf::Error,
    },
    #[error("model at {path} contains no scene")]
    EmptyAsset { path: String },
    #[error("no model paths configured")]
    NoCandidates,
    #[error("all model paths failed: {}", .attempts.join("; "))]
    Exhausted { attempts: Vec<String> },
}

impl LoadError {
    pub fn is_decode_failure(&self) -> bool {
        matches!(self, LoadError::Decode { .. } | LoadError::EmptyAsset { .. })
    }
}

/// Bytes transferred so far. `total` is known only when the source reports a content length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadProgress {
    pub loaded: u64,
    pub total: Option<u64>,
}

impl LoadProgress {
    pub fn fraction(&self) -> Option<f32> {
        match self.total {
            Some(total) if total > 0 => Some((self.loaded as f64 / total as f64).min(1.0) as f32),
            _ => None,
        }
    }
}

/// Where model bytes come from.
pub trait AssetSource {
    fn fetch(
        &self,
        path: &str,
        progress: &mut dyn FnMut(LoadProgress),
    ) -> Result<Vec<u8>, LoadError>;
}

/// Reads models from the local filesystem in fixed-size chunks.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSource;

impl FileSource {
    const CHUNK_SIZE: usize = 256 * 1024;
}

impl AssetSource for FileSource {
    fn fetch(
        &self,
        path: &str,
        progress: &mut dyn FnMut(LoadProgress),
    ) -> Result<Vec<u8>, LoadError> {
        let read_error = |source| LoadError::Read {
            path: path.to_string(),
            source,
        };
        let mut file = std::fs::File::open(path).map_err(read_error)?;
        let total = file.metadata().ok().map(|meta| meta.len());
        let mut bytes = Vec::with_capacity(total.unwrap_or(0) as usize);
        let mut chunk = vec![0u8; Self::CHUNK_SIZE];
        loop {
            let count = file.read(&mut chunk).map_err(read_error)?;
            if count == 0 {
                break;
            }
            bytes.extend_from_slice(&chunk[..count]);
            progress(LoadProgress {
                loaded: bytes.len() as u64,
                total,
            });
        }
        Ok(bytes)
    }
}

#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub name: String,
    pub path: String,
    pub graph: SceneGraph,
}

/// Tries the primary path and then each fallback in order, stopping at the first success.
pub struct ModelLoader<S> {
    source: S,
}

impl<S: AssetSource> ModelLoader<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn load<F>(&self, paths: &[String], mut on_progress: F) -> Result<LoadedModel, LoadError>
    where
        F: FnMut(&str, LoadProgress),
    {
        if paths.is_empty() {
            return Err(LoadError::NoCandidates);
        }
        let mut attempts = Vec::with_capacity(paths.len());
        for (index, path) in paths.iter().enumerate() {
            if index > 0 {
                log::info!("Trying fallback model path: {}", path);
            }
            match self.load_one(path, &mut on_progress) {
                Ok(model) => {
                    log::info!("Model loaded from {}", path);
                    return Ok(model);
                }
                Err(err) if err.is_decode_failure() => {
                    log::warn!("Model at {} is not a usable glTF: {}", path, err);
                    attempts.push(err.to_string());
                }
                Err(err) => {
                    log::info!("Could not load model from {}: {}", path, err);
                    attempts.push(err.to_string());
                }
            }
        }
        log::error!("All {} model paths failed", paths.len());
        Err(LoadError::Exhausted { attempts })
    }

    fn load_one<F>(&self, path: &str, on_progress: &mut F) -> Result<LoadedModel, LoadError>
    where
        F: FnMut(&str, LoadProgress),
    {
        let mut last = LoadProgress::default();
        let bytes = self.source.fetch(path, &mut |progress| {
            if progress.loaded >= last.loaded {
                last = progress;
                on_progress(path, progress);
            }
        })?;
        let graph = decode_model(path, &bytes)?;
        let name = Path::new(path)
            .file_name()
            .and_then(|value| value.to_str())
            .unwrap_or("model")
            .to_string();
        Ok(LoadedModel {
            name,
            path: path.to_string(),
            graph,
        })
    }
}

/// Identifies one started load. Only the most recently issued ticket may attach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    Attached { root: NodeId, replaced: bool },
    Stale,
    AlreadyAttached,
}

#[derive(Debug, Clone, Copy)]
struct AttachedModel {
    ticket: LoadTicket,
    root: NodeId,
}

/// The single place in the live scene that holds a model.
#[derive(Debug)]
pub struct ModelSlot {
    parent: NodeId,
    scale: f32,
    latest: u64,
    attached: Option<AttachedModel>,
}

impl ModelSlot {
    pub fn new(parent: NodeId, scale: f32) -> Self {
        Self {
            parent,
            scale,
            latest: 0,
            attached: None,
        }
    }

    /// Starts a new load, superseding any load still in flight.
    pub fn begin(&mut self) -> LoadTicket {
        self.latest += 1;
        LoadTicket(self.latest)
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        ticket.0 == self.latest
    }

    pub fn model_root(&self) -> Option<NodeId> {
        self.attached.map(|attached| attached.root)
    }

    pub fn attach(
        &mut self,
        graph: &mut SceneGraph,
        ticket: LoadTicket,
        model: SceneGraph,
    ) -> AttachOutcome {
        if !self.is_current(ticket) {
            return AttachOutcome::Stale;
        }
        if self.attached.map(|attached| attached.ticket) == Some(ticket) {
            return AttachOutcome::AlreadyAttached;
        }
        let replaced = match self.attached.take() {
            Some(previous) => {
                let removed = graph.remove_subtree(previous.root);
                log::info!("Removed previous model ({} nodes)", removed);
                true
            }
            None => false,
        };
        let Some(root) = graph.graft(self.parent, model) else {
            log::error!("Model parent node is missing from the live scene");
            return AttachOutcome::Stale;
        };
        if let Some(node) = graph.get_mut(root) {
            node.transform.scale = Vec3::splat(self.scale);
        }
        self.attached = Some(AttachedModel { ticket, root });
        AttachOutcome::Attached { root, replaced }
    }
}
