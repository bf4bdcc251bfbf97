use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Name of the persisted config file looked up in the working directory.
pub const RC_FILE: &str = ".lesrc";

/// Wire protocol served by one instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Http,
    Https,
    /// `http2s` is accepted as a legacy spelling of `http2`.
    #[serde(alias = "http2s")]
    Http2,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
            Protocol::Http2 => "http2",
        }
    }

    /// URL scheme a browser should use to reach this protocol. http2 is
    /// served over TLS, so it maps to `https`.
    pub fn scheme(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https | Protocol::Http2 => "https",
        }
    }

    pub fn is_tls(&self) -> bool {
        matches!(self, Protocol::Https | Protocol::Http2)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "http" => Ok(Protocol::Http),
            "https" => Ok(Protocol::Https),
            "http2" | "http2s" => Ok(Protocol::Http2),
            other => Err(format!("unknown protocol '{other}' (http, https, http2)")),
        }
    }
}

/// One raw entry of a `.lesrc` file, or the CLI override set. Every field
/// is optional; [`crate::resolve::merge_configs`] turns a list of these
/// into final [`ServerConfig`]s.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proto: Option<Protocol>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// `[start, end]` search window, also the port seed when no explicit
    /// port is given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_range: Option<(u16, u16)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssl_key: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssl_cert: Option<PathBuf>,
}

/// Final, defaulted config for one server instance. Immutable once handed
/// to an instance; the instance derives its own *actual* bound port, which
/// can differ after conflict recovery.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub proto: Protocol,
    pub host: String,
    pub port: u16,
    pub port_range: Option<(u16, u16)>,
    pub ssl_key: Option<PathBuf>,
    pub ssl_cert: Option<PathBuf>,
}

/// Load the persisted config entries from `<dir>/.lesrc`.
///
/// A missing file or malformed JSON degrades to a single default entry
/// with an informational line; it is never fatal.
pub fn load_server_configs(dir: &Path) -> Vec<ConfigEntry> {
    load_server_configs_localized(dir, &BTreeMap::new())
}

/// Like [`load_server_configs`], but entries may also use locale-spelled
/// keys. `aliases` maps each localized spelling to the canonical field name
/// (e.g. `"puerto"` to `"port"`); canonical keys always stay valid.
pub fn load_server_configs_localized(
    dir: &Path,
    aliases: &BTreeMap<String, String>,
) -> Vec<ConfigEntry> {
    let rc = dir.join(RC_FILE);
    let raw = match fs::read_to_string(&rc) {
        Ok(raw) => raw,
        Err(_) => {
            eprintln!("{RC_FILE} does not exist. Using CLI only");
            return vec![ConfigEntry::default()];
        }
    };
    let parsed = serde_json::from_str::<serde_json::Value>(&raw)
        .map(|mut value| {
            canonicalize_keys(&mut value, aliases);
            value
        })
        .and_then(serde_json::from_value::<Vec<ConfigEntry>>);
    match parsed {
        Ok(cfgs) if !cfgs.is_empty() => cfgs,
        Ok(_) => vec![ConfigEntry::default()],
        Err(err) => {
            eprintln!("error parsing {RC_FILE}. Is it formatted as JSON correctly? ({err})");
            vec![ConfigEntry::default()]
        }
    }
}

/// Rename locale-spelled keys of every entry object to their canonical
/// form. A canonical key already present wins over its alias.
fn canonicalize_keys(value: &mut serde_json::Value, aliases: &BTreeMap<String, String>) {
    let Some(entries) = value.as_array_mut() else {
        return;
    };
    for entry in entries {
        let Some(obj) = entry.as_object_mut() else {
            continue;
        };
        for (spelling, canonical) in aliases {
            if obj.contains_key(canonical) {
                continue;
            }
            if let Some(moved) = obj.remove(spelling) {
                obj.insert(canonical.clone(), moved);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_parse_and_alias() {
        assert_eq!("http".parse::<Protocol>().unwrap(), Protocol::Http);
        assert_eq!("http2".parse::<Protocol>().unwrap(), Protocol::Http2);
        // legacy spelling normalizes
        assert_eq!("http2s".parse::<Protocol>().unwrap(), Protocol::Http2);
        assert!("gopher".parse::<Protocol>().is_err());

        let entry: ConfigEntry = serde_json::from_str(r#"{ "proto": "http2s" }"#).unwrap();
        assert_eq!(entry.proto, Some(Protocol::Http2));
    }

    #[test]
    fn test_protocol_scheme_maps_http2_to_https() {
        assert_eq!(Protocol::Http.scheme(), "http");
        assert_eq!(Protocol::Https.scheme(), "https");
        assert_eq!(Protocol::Http2.scheme(), "https");
    }

    #[test]
    fn test_entry_camel_case_keys() {
        let entry: ConfigEntry = serde_json::from_str(
            r#"{ "portRange": [8000, 9000], "sslKey": "k.pem", "sslCert": "c.pem" }"#,
        )
        .unwrap();
        assert_eq!(entry.port_range, Some((8000, 9000)));
        assert_eq!(entry.ssl_key, Some(PathBuf::from("k.pem")));
        assert_eq!(entry.ssl_cert, Some(PathBuf::from("c.pem")));
    }

    #[test]
    fn test_load_missing_rc_degrades_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let cfgs = load_server_configs(dir.path());
        assert_eq!(cfgs, vec![ConfigEntry::default()]);
    }

    #[test]
    fn test_load_malformed_rc_degrades_to_default() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(RC_FILE), "{ not json").unwrap();
        let cfgs = load_server_configs(dir.path());
        assert_eq!(cfgs, vec![ConfigEntry::default()]);
    }

    #[test]
    fn test_load_rc_localized_keys_canonicalize() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(RC_FILE),
            r#"[{ "puerto": 3000, "proto": "http" }, { "port": 8443, "puerto": 9999 }]"#,
        )
        .unwrap();
        let aliases = BTreeMap::from([("puerto".to_string(), "port".to_string())]);
        let cfgs = load_server_configs_localized(dir.path(), &aliases);
        assert_eq!(cfgs[0].port, Some(3000));
        // a canonical key already present wins over its alias
        assert_eq!(cfgs[1].port, Some(8443));
    }

    #[test]
    fn test_load_rc_entries() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(RC_FILE),
            r#"[{ "proto": "https", "port": 8443 }, { "host": "0.0.0.0" }]"#,
        )
        .unwrap();
        let cfgs = load_server_configs(dir.path());
        assert_eq!(cfgs.len(), 2);
        assert_eq!(cfgs[0].proto, Some(Protocol::Https));
        assert_eq!(cfgs[0].port, Some(8443));
        assert_eq!(cfgs[1].host.as_deref(), Some("0.0.0.0"));
    }
}
