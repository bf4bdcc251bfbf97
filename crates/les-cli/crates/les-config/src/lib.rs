pub mod config;
pub mod resolve;

pub use config::{
    load_server_configs, load_server_configs_localized, ConfigEntry, Protocol, ServerConfig,
    RC_FILE,
};
pub use resolve::{
    attach_ssl, merge_configs, parse_range, CliConfig, Defaults, WatchMode, RANGE_FORMAT_ERROR,
};
