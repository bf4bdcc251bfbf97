mod cmd;
pub mod locale;

use anyhow::Result;
use std::ffi::OsString;
use std::path::Path;

pub use cmd::serve::StartedServer;

/// What a CLI invocation resolved to.
#[derive(Debug)]
pub enum RunOutcome {
    /// `--help`: the rendered usage text. No servers were started.
    Usage(String),
    /// `--init`: the project was scaffolded.
    Initialized,
    /// Servers started, one slot per merged config entry.
    Started(Vec<StartedServer>),
}

/// Parse `argv`, resolve the locale bundle, and dispatch.
///
/// `cwd` anchors the persisted `.lesrc` lookup, the static root, and the
/// default init destination.
pub async fn run<I, T>(argv: I, cwd: &Path) -> Result<RunOutcome>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let bundle = locale::import_cli_options()?;
    let matches = locale::build_command(&bundle).try_get_matches_from(argv)?;
    let cli = locale::build_cli_cfg(&matches)?;

    if cli.help {
        let usage = locale::build_cli_usage(
            &format!("{}: les [path] [options]", bundle.msgs.usage),
            &bundle,
        );
        return Ok(RunOutcome::Usage(usage));
    }

    if let Some(dest) = &cli.init {
        let dest = dest.clone().unwrap_or_else(|| cwd.to_path_buf());
        les_init::run(&dest, &cli.entry)?;
        return Ok(RunOutcome::Initialized);
    }

    let started = cmd::serve::run(&cli, &bundle, cwd).await?;
    Ok(RunOutcome::Started(started))
}
