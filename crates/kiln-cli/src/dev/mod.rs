//! Development server.
//!
//! Serves the output directory over HTTP, pushes reload messages to browsers
//! over a WebSocket, and watches the project for changes:
//! - markup matching the watch patterns triggers `content-changed`,
//! - anything under `src/` triggers a rebuild followed by `ok` or `errors`.

pub mod server;
pub mod state;
pub mod watcher;

pub use server::{RELOAD_SCRIPT_PATH, WS_PATH, bind, router, serve};
pub use state::{BuildStatus, DevServerState, SharedState};
pub use watcher::{FileChange, FileWatcher, WatchFilter};

use serde::Serialize;

/// Messages pushed to connected browsers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum DevEvent {
    /// A watched markup file was added, changed or removed.
    ContentChanged,
    /// A rebuild finished without errors.
    Ok,
    /// A rebuild failed.
    Errors(Vec<String>),
}

impl DevEvent {
    /// Wire text for this event.
    ///
    /// `content-changed` goes out as the bare literal; rebuild results are
    /// JSON objects with a `type` field.
    pub fn to_message(&self) -> String {
        match self {
            DevEvent::ContentChanged => kiln_config::CONTENT_CHANGED.to_string(),
            other => serde_json::to_string(other).unwrap_or_else(|_| "{}".to_string()),
        }
    }
}
