use crate::config::{ConfigEntry, Protocol, ServerConfig};
use anyhow::{anyhow, Result};
use regex::Regex;
use std::path::PathBuf;

/// Stable message for a malformed `--range` value. Raised synchronously,
/// before any socket is opened.
pub const RANGE_FORMAT_ERROR: &str =
    "port range incorrectly formatted. Format as --range=start-end";

/// What `--watch` asked for.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum WatchMode {
    #[default]
    Off,
    /// Bare `--watch`: watch the served static root.
    StaticRoot,
    /// `--watch=dir`: watch that explicit path.
    Dir(PathBuf),
}

/// Canonical-keyed CLI overrides, already locale-resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct CliConfig {
    pub help: bool,
    /// `Some(None)` is a bare `--init` (scaffold into cwd).
    pub init: Option<Option<PathBuf>>,
    /// Positional path to serve, relative to cwd.
    pub static_dir: String,
    /// proto/host/port/range/ssl overrides, merged into the matched entry.
    pub entry: ConfigEntry,
    pub open: bool,
    pub watch: WatchMode,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            help: false,
            init: None,
            static_dir: "public".into(),
            entry: ConfigEntry::default(),
            open: false,
            watch: WatchMode::Off,
        }
    }
}

/// Schema-supplied defaults for fields no entry sets.
#[derive(Debug, Clone, PartialEq)]
pub struct Defaults {
    pub proto: Protocol,
    pub host: String,
    pub port: u16,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            proto: Protocol::Http,
            host: "localhost".into(),
            port: 8080,
        }
    }
}

/// Parse a `--range start-end` value.
pub fn parse_range(raw: &str) -> Result<(u16, u16)> {
    let re = Regex::new(r"^(\d+)-(\d+)$").expect("static range pattern");
    let caps = re
        .captures(raw.trim())
        .ok_or_else(|| anyhow!(RANGE_FORMAT_ERROR))?;
    let start = caps[1].parse::<u16>().map_err(|_| anyhow!(RANGE_FORMAT_ERROR))?;
    let end = caps[2].parse::<u16>().map_err(|_| anyhow!(RANGE_FORMAT_ERROR))?;
    Ok((start, end))
}

/// Propagate the first complete ssl key/cert pair into entries missing
/// one. Fields an entry already has are never overwritten, even when its
/// pair is only partial.
pub fn attach_ssl(cfgs: &mut [ConfigEntry]) {
    let pair = cfgs.iter().find_map(|cfg| match (&cfg.ssl_key, &cfg.ssl_cert) {
        (Some(key), Some(cert)) => Some((key.clone(), cert.clone())),
        _ => None,
    });
    let Some((key, cert)) = pair else { return };
    for cfg in cfgs {
        if cfg.ssl_key.is_none() {
            cfg.ssl_key = Some(key.clone());
        }
        if cfg.ssl_cert.is_none() {
            cfg.ssl_cert = Some(cert.clone());
        }
    }
}

/// Merge CLI overrides into the persisted entries and resolve every field.
///
/// The matched entry is the first whose `proto` equals the CLI `proto`
/// (index 0 when none matches); CLI values win there. Entries without an
/// explicit port derive one: their own range's lower bound if present,
/// else the matched entry's port offset by the index delta, which keeps
/// default ports distinct across a multi-protocol set.
pub fn merge_configs(
    cli: &ConfigEntry,
    mut merged: Vec<ConfigEntry>,
    dflt: &Defaults,
) -> Vec<ServerConfig> {
    if merged.is_empty() {
        merged.push(ConfigEntry::default());
    }
    attach_ssl(&mut merged);

    let fnd = merged
        .iter()
        .position(|cfg| cfg.proto == cli.proto)
        .unwrap_or(0);

    overlay(&mut merged[fnd], cli);

    // The matched entry anchors port derivation, so resolve it first.
    let base_port = merged[fnd]
        .port
        .or(merged[fnd].port_range.map(|(start, _)| start))
        .unwrap_or(dflt.port);

    merged
        .iter()
        .enumerate()
        .map(|(idx, entry)| {
            let port = entry.port.unwrap_or_else(|| match entry.port_range {
                Some((start, _)) => start,
                None => offset_port(base_port, idx as i32 - fnd as i32),
            });
            ServerConfig {
                proto: entry.proto.unwrap_or(dflt.proto),
                host: entry.host.clone().unwrap_or_else(|| dflt.host.clone()),
                port,
                port_range: entry.port_range,
                ssl_key: entry.ssl_key.clone(),
                ssl_cert: entry.ssl_cert.clone(),
            }
        })
        .collect()
}

/// Shallow-merge `src` into `dst`; set fields of `src` win.
fn overlay(dst: &mut ConfigEntry, src: &ConfigEntry) {
    if src.proto.is_some() {
        dst.proto = src.proto;
    }
    if src.host.is_some() {
        dst.host = src.host.clone();
    }
    if src.port.is_some() {
        dst.port = src.port;
    }
    if src.port_range.is_some() {
        dst.port_range = src.port_range;
    }
    if src.ssl_key.is_some() {
        dst.ssl_key = src.ssl_key.clone();
    }
    if src.ssl_cert.is_some() {
        dst.ssl_cert = src.ssl_cert.clone();
    }
}

fn offset_port(base: u16, delta: i32) -> u16 {
    (base as i32 + delta).clamp(1, u16::MAX as i32) as u16
}
