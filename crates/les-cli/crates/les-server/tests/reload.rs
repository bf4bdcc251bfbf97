use futures_util::StreamExt;
use les_config::{Protocol, ServerConfig};
use les_server::{static_app, ServerInstance};
use std::time::Duration;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

#[tokio::test]
async fn file_change_pushes_a_file_changed_frame() {
    let dir = tempfile::tempdir().unwrap();
    let watched = dir.path().join("watched.html");
    std::fs::write(&watched, "v0").unwrap();

    let app = static_app(dir.path(), Some(dir.path().to_path_buf()));
    let cfg = ServerConfig {
        proto: Protocol::Http,
        host: "127.0.0.1".into(),
        port: 0,
        port_range: None,
        ssl_key: None,
        ssl_cert: None,
    };
    let mut instance = ServerInstance::new(cfg, app);
    let info = instance.start().await.unwrap();

    let url = format!("ws://127.0.0.1:{}/__les/ws", info.port);
    let (mut ws, _) = connect_async(url).await.unwrap();

    // The per-connection watcher registers shortly after the upgrade, so
    // keep touching the file until a frame comes through.
    let mut frame = None;
    for round in 0..20 {
        std::fs::write(&watched, format!("v{round}")).unwrap();
        match tokio::time::timeout(Duration::from_millis(500), ws.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => {
                frame = Some(text.to_string());
                break;
            }
            _ => continue,
        }
    }

    let frame = frame.expect("no fileChanged frame within the deadline");
    let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
    assert_eq!(value["event"], "fileChanged");
    assert!(value["filename"].is_string());

    instance.stop();
}
