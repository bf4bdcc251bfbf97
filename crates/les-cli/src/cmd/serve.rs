use anyhow::Result;
use console::style;
use futures_util::future;
use les_config::{load_server_configs_localized, merge_configs, CliConfig, WatchMode};
use les_server::{static_app, ListeningInfo, ServerInstance, StartError};
use std::path::Path;

use crate::cmd::open;
use crate::locale::LocaleBundle;

/// One started server: the listening info plus the instance handle kept
/// alive so the caller can stop it.
#[derive(Debug)]
pub struct StartedServer {
    pub instance: ServerInstance,
    pub info: ListeningInfo,
}

/// Merge configs and start one instance per entry.
///
/// Starts are initiated in list order and awaited together; result slots
/// stay index-stable regardless of completion order. The first fatal start
/// error rejects the whole aggregate immediately; siblings that already
/// bound are left running, callers stop them explicitly.
pub async fn run(cli: &CliConfig, bundle: &LocaleBundle, cwd: &Path) -> Result<Vec<StartedServer>> {
    let persisted = load_server_configs_localized(cwd, &crate::locale::rc_key_aliases(bundle));
    let merged = merge_configs(&cli.entry, persisted, &bundle.defaults());

    let static_root = cwd.join(&cli.static_dir);
    let watch_dir = match &cli.watch {
        WatchMode::Off => None,
        WatchMode::StaticRoot => Some(static_root.clone()),
        WatchMode::Dir(dir) => Some(cwd.join(dir)),
    };
    // one static mount shared read-only by every instance
    let app = static_app(&static_root, watch_dir.clone());

    let starts = merged.into_iter().map(|cfg| {
        let mut instance = ServerInstance::new(cfg, app.clone());
        async move {
            let info = instance.start().await?;
            Ok::<_, StartError>(StartedServer { instance, info })
        }
    });
    let started = future::try_join_all(starts).await?;

    for server in &started {
        println!(
            "{}",
            bundle.msgs.serving_static_dir.replace("%1", &cli.static_dir)
        );
        if cli.open {
            // a missing opener (headless box) must not take down servers
            // that are already listening
            match open::open_browser(&server.info) {
                Ok(_) => println!("{}", bundle.msgs.browser_opened),
                Err(err) => eprintln!("could not open browser: {err:#}"),
            }
        }
    }
    if let Some(dir) = &watch_dir {
        println!(
            "{}",
            bundle
                .msgs
                .watching_dir
                .replace("%1", &dir.display().to_string())
        );
    }
    println!("{}", style(&bundle.msgs.server_cfgs_started).green());

    Ok(started)
}
