use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use les_config::{parse_range, CliConfig, Defaults, WatchMode};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

const EN: &str = include_str!("../locales/en.json");
const ES: &str = include_str!("../locales/es.json");

/// One CLI option as described by a locale bundle. Keys of the bundle's
/// `options` map are the user-facing (possibly translated) spellings; the
/// `en_US` backref carries the canonical name all internal logic is keyed
/// on. English bundles omit it.
#[derive(Debug, Clone, Deserialize)]
pub struct CliOption {
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub dflt: Option<serde_json::Value>,
    #[serde(default, rename = "limitTo")]
    pub limit_to: Option<Vec<String>>,
    #[serde(default, rename = "en_US")]
    pub en_us: Option<String>,
}

/// Locale-resolved CLI messages. `%1` placeholders are substituted at the
/// call site.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Messages {
    pub usage: String,
    pub end_of_help: String,
    pub serving_static_dir: String,
    pub server_cfgs_started: String,
    pub browser_opened: String,
    pub watching_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocaleBundle {
    pub msgs: Messages,
    pub options: BTreeMap<String, CliOption>,
}

impl LocaleBundle {
    /// Schema defaults for fields no config entry sets.
    pub fn defaults(&self) -> Defaults {
        let mut defaults = Defaults::default();
        for (spelling, opt) in &self.options {
            let canonical = opt.en_us.as_deref().unwrap_or(spelling);
            match (canonical, &opt.dflt) {
                ("host", Some(value)) => {
                    if let Some(host) = value.as_str() {
                        defaults.host = host.to_string();
                    }
                }
                ("port", Some(value)) => {
                    if let Some(port) = value.as_u64() {
                        defaults.port = port as u16;
                    }
                }
                ("proto", Some(value)) => {
                    if let Some(proto) = value.as_str().and_then(|s| s.parse().ok()) {
                        defaults.proto = proto;
                    }
                }
                _ => {}
            }
        }
        defaults
    }
}

/// Map each locale-spelled option name to the `.lesrc` field it sets, so
/// persisted entries can be written in the active locale too (`"puerto"`
/// next to `"port"`). Options with no config field (help, open, ...) and
/// untranslated spellings are left out.
pub fn rc_key_aliases(bundle: &LocaleBundle) -> BTreeMap<String, String> {
    let mut aliases = BTreeMap::new();
    for (spelling, opt) in &bundle.options {
        let canonical = opt.en_us.as_deref().unwrap_or(spelling);
        let field = match canonical {
            "host" | "port" | "proto" | "sslKey" | "sslCert" => canonical,
            "range" => "portRange",
            _ => continue,
        };
        if spelling != field {
            aliases.insert(spelling.clone(), field.to_string());
        }
    }
    aliases
}

/// Resolve the active locale from `LANG` (`es_ES.UTF-8` selects `es`) and
/// load its bundle. Unset or unsupported locales fall back to English.
pub fn import_cli_options() -> Result<LocaleBundle> {
    let lang = std::env::var("LANG").unwrap_or_else(|_| "en".into());
    let locale = lang
        .split('.')
        .next()
        .and_then(|tag| tag.split('_').next())
        .unwrap_or("en");
    load_locale(locale)
}

pub fn load_locale(locale: &str) -> Result<LocaleBundle> {
    let raw = match locale {
        "" | "C" | "en" => EN,
        "es" => ES,
        other => {
            eprintln!("options for locale {other} do not exist, defaulting to 'en'");
            EN
        }
    };
    serde_json::from_str(raw).context("failed to parse embedded locale bundle")
}

/// Build the clap command from the locale option schema. The localized
/// spelling is the flag the user types; the arg id stays canonical, so
/// dispatch never depends on the locale.
pub fn build_command(bundle: &LocaleBundle) -> Command {
    let mut cmd = Command::new("les")
        .disable_help_flag(true)
        .disable_version_flag(true)
        .arg(Arg::new("path").num_args(0..=1));

    for (spelling, opt) in &bundle.options {
        let canonical = opt.en_us.as_deref().unwrap_or(spelling).to_string();
        let mut arg = Arg::new(canonical.clone()).long(spelling.clone());
        if let Some(alias) = &opt.alias {
            if let Some(short) = alias.chars().next() {
                arg = arg.short(short);
            }
        }
        if !opt.desc.is_empty() {
            arg = arg.help(opt.desc.clone());
        }
        arg = match canonical.as_str() {
            "help" | "open" => arg.action(ArgAction::SetTrue),
            // bare `--init` and `--watch` are valid; a path is attached
            // with `=` so the positional static dir stays unambiguous
            "init" | "watch" => arg
                .action(ArgAction::Set)
                .num_args(0..=1)
                .require_equals(true)
                .default_missing_value(""),
            _ => arg.action(ArgAction::Set),
        };
        cmd = cmd.arg(arg);
    }
    cmd
}

/// Extract the canonical-keyed CLI config from parsed matches. A malformed
/// `--range` aborts here, before any socket is opened.
pub fn build_cli_cfg(matches: &ArgMatches) -> Result<CliConfig> {
    let mut cli = CliConfig::default();
    cli.help = matches.get_flag("help");
    cli.open = matches.get_flag("open");

    if let Some(path) = matches.get_one::<String>("path") {
        cli.static_dir = path.clone();
    }
    if let Some(dest) = matches.get_one::<String>("init") {
        cli.init = Some((!dest.is_empty()).then(|| PathBuf::from(dest)));
    }
    if let Some(dir) = matches.get_one::<String>("watch") {
        cli.watch = if dir.is_empty() {
            WatchMode::StaticRoot
        } else {
            WatchMode::Dir(PathBuf::from(dir))
        };
    }
    if let Some(host) = matches.get_one::<String>("host") {
        cli.entry.host = Some(host.clone());
    }
    if let Some(port) = matches.get_one::<String>("port") {
        cli.entry.port = Some(port.parse().context("invalid --port value")?);
    }
    if let Some(proto) = matches.get_one::<String>("proto") {
        cli.entry.proto = Some(proto.parse().map_err(anyhow::Error::msg)?);
    }
    if let Some(key) = matches.get_one::<String>("sslKey") {
        cli.entry.ssl_key = Some(PathBuf::from(key));
    }
    if let Some(cert) = matches.get_one::<String>("sslCert") {
        cli.entry.ssl_cert = Some(PathBuf::from(cert));
    }
    if let Some(range) = matches.get_one::<String>("range") {
        let (start, end) = parse_range(range)?;
        cli.entry.port_range = Some((start, end));
        if cli.entry.port.is_none() {
            cli.entry.port = Some(start);
        }
    }
    Ok(cli)
}

/// Render the usage block as a tab-joined table, one row per option.
pub fn build_cli_usage(cmd_fmt: &str, bundle: &LocaleBundle) -> String {
    let mut usage = vec![cmd_fmt.to_string(), String::new(), "options:".to_string()];
    for (spelling, opt) in &bundle.options {
        let alias = opt
            .alias
            .as_ref()
            .map(|alias| format!("-{alias},"))
            .unwrap_or_default();
        let mut desc = opt.desc.clone();
        if let Some(dflt) = &opt.dflt {
            let shown = dflt.as_str().map(str::to_string).unwrap_or_else(|| dflt.to_string());
            desc = format!("{desc} [{shown}]");
        }
        if let Some(limit) = &opt.limit_to {
            desc = format!("{desc} ({})", limit.join(", "));
        }
        usage.push(format!("\t{alias}\t--{spelling}\t{desc}"));
    }
    format!("{}\n\n---{}---\n\n", usage.join("\n"), bundle.msgs.end_of_help)
}
