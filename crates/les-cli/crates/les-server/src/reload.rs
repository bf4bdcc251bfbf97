use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use notify::{Event, RecursiveMode, Watcher};
use serde::Serialize;
use std::path::PathBuf;
use tokio::sync::mpsc;

const RELOAD_JS: &str = include_str!("reload.js");

/// Payload pushed to live-reload clients on every filesystem change.
#[derive(Debug, Serialize)]
struct FileChanged {
    event: &'static str,
    filename: String,
}

#[derive(Clone)]
struct ReloadState {
    watch_dir: PathBuf,
}

/// Routes for the live-reload side channel: the push socket plus the
/// client script a served page can include.
pub fn reload_routes(watch_dir: PathBuf) -> Router {
    Router::new()
        .route("/__les/ws", get(ws_handler))
        .route("/__les/reload.js", get(reload_script))
        .with_state(ReloadState { watch_dir })
}

async fn reload_script() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/javascript")], RELOAD_JS)
}

async fn ws_handler(
    State(state): State<ReloadState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state.watch_dir))
}

/// One connection, one watcher. Dropping the watcher when the client goes
/// away unregisters its filesystem hooks.
async fn handle_ws(socket: WebSocket, watch_dir: PathBuf) {
    let (tx, mut rx) = mpsc::unbounded_channel::<PathBuf>();
    let mut watcher = match notify::recommended_watcher(
        move |res: Result<Event, notify::Error>| {
            if let Ok(event) = res {
                for path in event.paths {
                    let _ = tx.send(path);
                }
            }
        },
    ) {
        Ok(watcher) => watcher,
        Err(err) => {
            eprintln!("live-reload watcher failed: {err}");
            return;
        }
    };
    if let Err(err) = watcher.watch(&watch_dir, RecursiveMode::Recursive) {
        eprintln!("cannot watch {}: {err}", watch_dir.display());
        return;
    }

    let (mut sender, mut receiver) = socket.split();

    // Forward change events to the client as fileChanged frames
    let send_task = tokio::spawn(async move {
        while let Some(path) = rx.recv().await {
            let payload = FileChanged {
                event: "fileChanged",
                filename: path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            };
            let Ok(json) = serde_json::to_string(&payload) else {
                continue;
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // Drain incoming frames to notice the disconnect
    let recv_task = tokio::spawn(async move {
        while let Some(Ok(_)) = receiver.next().await {}
    });

    tokio::select! {
        _ = send_task => {}
        _ = recv_task => {}
    }

    drop(watcher);
}
