//! State shared between the HTTP server and the watch loop.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use kiln_config::DevServerDescriptor;
use path_clean::PathClean;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::dev::DevEvent;

/// Messages buffered per client; a full buffer drops further messages.
const CLIENT_BUFFER: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
    NotStarted,
    InProgress { started_at: Instant },
    Success { duration_ms: u64 },
    Failed { error: String },
}

impl BuildStatus {
    pub fn is_in_progress(&self) -> bool {
        matches!(self, BuildStatus::InProgress { .. })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BuildStatus::Success { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            BuildStatus::Failed { error } => Some(error),
            _ => None,
        }
    }
}

/// Connected WebSocket clients, keyed by connection id.
pub type ClientRegistry = Arc<RwLock<HashMap<usize, mpsc::Sender<String>>>>;

pub struct DevServerState {
    pub status: RwLock<BuildStatus>,
    pub clients: ClientRegistry,
    next_client_id: AtomicUsize,
    content_base: PathBuf,
    compress: bool,
}

impl DevServerState {
    pub fn new(content_base: impl Into<PathBuf>, compress: bool) -> Self {
        Self {
            status: RwLock::new(BuildStatus::NotStarted),
            clients: Arc::new(RwLock::new(HashMap::new())),
            next_client_id: AtomicUsize::new(0),
            content_base: content_base.into().clean(),
            compress,
        }
    }

    pub fn from_descriptor(descriptor: &DevServerDescriptor) -> Self {
        Self::new(descriptor.content_base.clone(), descriptor.compress)
    }

    /// Directory served as static content.
    pub fn content_base(&self) -> &Path {
        &self.content_base
    }

    pub fn compress(&self) -> bool {
        self.compress
    }

    pub fn start_build(&self) {
        *self.status.write() = BuildStatus::InProgress {
            started_at: Instant::now(),
        };
    }

    pub fn complete_build(&self, duration_ms: u64) {
        *self.status.write() = BuildStatus::Success { duration_ms };
    }

    pub fn fail_build(&self, error: String) {
        *self.status.write() = BuildStatus::Failed { error };
    }

    pub fn get_status(&self) -> BuildStatus {
        self.status.read().clone()
    }

    /// Register a client and return its id and message receiver.
    pub fn register_client(&self) -> (usize, mpsc::Receiver<String>) {
        let id = self.next_client_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(CLIENT_BUFFER);
        self.clients.write().insert(id, tx);
        tracing::debug!(client = id, "client connected");
        (id, rx)
    }

    pub fn unregister_client(&self, id: usize) {
        if self.clients.write().remove(&id).is_some() {
            tracing::debug!(client = id, "client disconnected");
        }
    }

    /// Send `event` to every connected client once, without waiting.
    ///
    /// A client whose buffer is full misses this message. Clients whose
    /// receiver is gone are dropped from the registry. Returns the number of
    /// clients reached.
    pub fn broadcast(&self, event: &DevEvent) -> usize {
        let message = event.to_message();
        let clients: Vec<(usize, mpsc::Sender<String>)> = self
            .clients
            .read()
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        let mut delivered = 0;
        let mut closed = Vec::new();
        for (id, tx) in clients {
            match tx.try_send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::debug!(client = id, "client is not keeping up, message dropped");
                }
                Err(TrySendError::Closed(_)) => closed.push(id),
            }
        }

        for id in closed {
            self.unregister_client(id);
        }

        tracing::debug!(message = %message, clients = delivered, "broadcast");
        delivered
    }

    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }
}

pub type SharedState = Arc<DevServerState>;
