//! Background model loading.
//!
//! The fetch and decode run on a worker thread. The frame thread polls the handle once per
//! frame and attaches the result itself, so the scene graph never leaves the frame thread.

use crate::assets::{AssetSource, LoadError, LoadProgress, LoadTicket, LoadedModel, ModelLoader};
use std::sync::mpsc::{self, Receiver, TryRecvError};

#[derive(Debug)]
pub enum LoadEvent {
    Progress { path: String, progress: LoadProgress },
    Finished(Result<LoadedModel, LoadError>),
}

/// Polled each frame; yields events in the order the worker produced them.
pub struct LoadHandle {
    ticket: LoadTicket,
    receiver: Receiver<LoadEvent>,
    finished: bool,
}

impl LoadHandle {
    pub fn ticket(&self) -> LoadTicket {
        self.ticket
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Returns every event queued since the last poll.
    pub fn poll(&mut self) -> Vec<LoadEvent> {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if matches!(event, LoadEvent::Finished(_)) {
                        self.finished = true;
                    }
                    events.push(event);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.finished {
                        log::error!("Model loader thread exited without a result");
                        self.finished = true;
                    }
                    break;
                }
            }
        }
        events
    }
}

/// Starts loading `paths` in order on a worker thread.
pub fn load_async<S>(ticket: LoadTicket, paths: Vec<String>, source: S) -> LoadHandle
where
    S: AssetSource + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let spawned = std::thread::Builder::new()
        .name("model-loader".to_string())
        .spawn({
            let tx = tx.clone();
            move || {
                let loader = ModelLoader::new(source);
                let result = loader.load(&paths, |path, progress| {
                    let _ = tx.send(LoadEvent::Progress {
                        path: path.to_string(),
                        progress,
                    });
                });
                // The receiver is gone once a newer load replaced this one.
                let _ = tx.send(LoadEvent::Finished(result));
            }
        });
    if let Err(err) = spawned {
        log::error!("Failed to spawn model loader thread: {}", err);
        let _ = tx.send(LoadEvent::Finished(Err(LoadError::Read {
            path: "<loader thread>".to_string(),
            source: err,
        })));
    }

    LoadHandle {
        ticket,
        receiver: rx,
        finished: false,
    }
}
