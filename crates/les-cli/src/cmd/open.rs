use anyhow::{Context, Result};
use les_server::ListeningInfo;
use std::process::{Child, Command};

/// Spawn the platform browser opener pointed at the instance's URL.
///
/// The URL scheme comes from the protocol, with http2 mapped to https.
pub fn open_browser(info: &ListeningInfo) -> Result<Child> {
    let url = info.url();
    let (cmd, args): (&str, &[&str]) = if cfg!(target_os = "windows") {
        ("cmd", &["/c", "start"])
    } else if cfg!(target_os = "macos") {
        ("open", &[])
    } else {
        ("xdg-open", &[])
    };
    Command::new(cmd)
        .args(args)
        .arg(&url)
        .spawn()
        .with_context(|| format!("failed to open browser at {url}"))
}
