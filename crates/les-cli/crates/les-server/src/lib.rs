pub mod instance;
pub mod probe;
pub mod reload;

use axum::Router;
use std::path::{Path, PathBuf};
use tower_http::services::ServeDir;

pub use instance::{ListeningInfo, ServerInstance, StartError};

/// Build the one handler stack shared read-only by every instance: the
/// static mount plus, when watching, the live-reload routes.
pub fn static_app(static_root: &Path, watch_dir: Option<PathBuf>) -> Router {
    let mut app = Router::new();
    if let Some(dir) = watch_dir {
        app = app.merge(reload::reload_routes(dir));
    }
    app.fallback_service(ServeDir::new(static_root))
}
