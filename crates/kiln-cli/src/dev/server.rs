//! HTTP side of the dev server: static files, the reload client and the
//! WebSocket push channel.

use std::path::{Path, PathBuf};

use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::get,
};
use futures::{SinkExt, StreamExt};
use kiln_bundler::plugins::{PageAssets, html};
use path_clean::PathClean;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;

use crate::dev::SharedState;
use crate::error::{CliError, Result};

/// WebSocket endpoint that receives reload messages.
pub const WS_PATH: &str = "/__kiln_ws__";

/// Script injected into every served HTML page.
pub const RELOAD_SCRIPT_PATH: &str = "/__kiln_reload__.js";

const RELOAD_SCRIPT: &str = include_str!("../../assets/dev/reload-client.js");

pub fn router(state: SharedState) -> Router {
    let compress = state.compress();
    let router = Router::new()
        .route(WS_PATH, get(handle_ws))
        .route(RELOAD_SCRIPT_PATH, get(handle_reload_script))
        .fallback(handle_request)
        .with_state(state);

    if compress {
        router.layer(CompressionLayer::new())
    } else {
        router
    }
}

/// Bind the dev server on localhost.
pub async fn bind(port: u16) -> Result<TcpListener> {
    TcpListener::bind(("127.0.0.1", port))
        .await
        .map_err(|e| CliError::Server(format!("Failed to bind to port {}: {}", port, e)))
}

/// Serve until the listener fails.
pub async fn serve(listener: TcpListener, state: SharedState) -> Result<()> {
    axum::serve(listener, router(state))
        .await
        .map_err(|e| CliError::Server(e.to_string()))
}

async fn handle_ws(ws: WebSocketUpgrade, State(state): State<SharedState>) -> Response {
    ws.on_upgrade(move |socket| client_session(socket, state))
}

/// Forward broadcasts to one browser until either side goes away.
async fn client_session(socket: WebSocket, state: SharedState) {
    let (id, mut rx) = state.register_client();
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            message = rx.recv() => {
                let Some(text) = message else { break };
                if sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    state.unregister_client(id);
}

async fn handle_reload_script() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/javascript"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        RELOAD_SCRIPT,
    )
}

/// Serve a file from the content base.
async fn handle_request(State(state): State<SharedState>, uri: Uri) -> Response {
    let Some(path) = resolve_request_path(state.content_base(), uri.path()) else {
        return not_found(uri.path());
    };

    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            let content_type = content_type(&path);
            let body = if content_type.starts_with("text/html") {
                inject_reload_script(&bytes)
            } else {
                bytes
            };
            (
                [
                    (header::CONTENT_TYPE, content_type),
                    (header::CACHE_CONTROL, "no-cache"),
                ],
                body,
            )
                .into_response()
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => not_found(uri.path()),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read file");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to read {}", uri.path()),
            )
                .into_response()
        }
    }
}

fn not_found(path: &str) -> Response {
    (StatusCode::NOT_FOUND, format!("File not found: {}", path)).into_response()
}

/// Map a URL path to a file under `base`. Directories map to their
/// `index.html`; anything escaping `base` maps to nothing.
fn resolve_request_path(base: &Path, url_path: &str) -> Option<PathBuf> {
    let candidate = base.join(url_path.trim_start_matches('/')).clean();
    if !candidate.starts_with(base) {
        return None;
    }
    if candidate.is_dir() {
        Some(candidate.join("index.html"))
    } else {
        Some(candidate)
    }
}

fn inject_reload_script(content: &[u8]) -> Vec<u8> {
    let assets = PageAssets {
        scripts: vec![RELOAD_SCRIPT_PATH.to_string()],
        ..PageAssets::default()
    };
    html::inject(&String::from_utf8_lossy(content), &assets).into_bytes()
}

fn content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("");

    match extension {
        "html" | "htm" => "text/html; charset=utf-8",
        "js" | "mjs" => "application/javascript",
        "json" | "map" => "application/json",
        "css" => "text/css",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "eot" => "application/vnd.ms-fontobject",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_request_paths_stay_inside_base() {
        let base = Path::new("/site/public");
        assert_eq!(
            resolve_request_path(base, "/bundle.js"),
            Some(PathBuf::from("/site/public/bundle.js"))
        );
        assert_eq!(
            resolve_request_path(base, "/images/../bundle.js"),
            Some(PathBuf::from("/site/public/bundle.js"))
        );
        assert_eq!(resolve_request_path(base, "/../secret.txt"), None);
        assert_eq!(resolve_request_path(base, "/../../etc/passwd"), None);
    }

    #[test]
    fn test_directories_serve_index_html() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("docs")).unwrap();

        assert_eq!(
            resolve_request_path(dir.path(), "/"),
            Some(dir.path().join("index.html"))
        );
        assert_eq!(
            resolve_request_path(dir.path(), "/docs"),
            Some(dir.path().join("docs/index.html"))
        );
    }

    #[test]
    fn test_reload_script_goes_before_body_end() {
        let page = inject_reload_script(b"<html><body><h1>Hi</h1></body></html>");
        let page = String::from_utf8(page).unwrap();

        let script = page
            .find(r#"<script src="/__kiln_reload__.js"></script>"#)
            .unwrap();
        assert!(script < page.find("</body>").unwrap());
    }

    #[test]
    fn test_content_types() {
        assert_eq!(
            content_type(Path::new("index.html")),
            "text/html; charset=utf-8"
        );
        assert_eq!(
            content_type(Path::new("bundle.js")),
            "application/javascript"
        );
        assert_eq!(
            content_type(Path::new("bundle.js.map")),
            "application/json"
        );
        assert_eq!(content_type(Path::new("icons-ab/favicon.ico")), "image/x-icon");
        assert_eq!(content_type(Path::new("fonts/a.woff2")), "font/woff2");
        assert_eq!(
            content_type(Path::new("LICENSE")),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_reload_client_listens_on_ws_path() {
        assert!(RELOAD_SCRIPT.contains(WS_PATH));
        assert!(RELOAD_SCRIPT.contains(kiln_config::CONTENT_CHANGED));
    }
}
