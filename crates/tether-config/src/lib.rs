//! Runtime configuration for the tether hub daemon.
//!
//! The configuration surface is deliberately small: where to listen, where
//! the device catalog lives, where the shared setup-values file lives, and
//! how to log. Values come from command-line flags with built-in defaults;
//! [`Config::load_from_iter`] exists so tests can drive the loader without
//! touching the process environment.

mod defaults;
mod logging;
mod socket;

use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

pub use defaults::{
    DEFAULT_HOST, DEFAULT_LOG_FILTER, DEFAULT_TCP_PORT, default_catalog_dir, default_log_format,
    default_setup_values_path, default_socket_endpoint,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use socket::{SocketEndpoint, SocketParseError};

/// Resolved daemon configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Endpoint the listener binds.
    pub listen: SocketEndpoint,
    /// Directory holding `devices_cfg.json` and the descriptor documents.
    pub catalog_dir: PathBuf,
    /// File served verbatim for `REQUEST_SETUP_VALUES`.
    pub setup_values_path: PathBuf,
    /// Tracing filter expression.
    pub log_filter: String,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_socket_endpoint(),
            catalog_dir: default_catalog_dir(),
            setup_values_path: default_setup_values_path(),
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Loads the configuration from the process command line.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an argument fails to parse.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_iter(std::env::args_os())
    }

    /// Loads the configuration from an explicit argument list.
    ///
    /// The first element is treated as the binary name, matching the shape
    /// of `std::env::args_os`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an argument fails to parse.
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let cli = Cli::try_parse_from(args)?;
        Ok(cli.into_config())
    }
}

/// Errors surfaced while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Command-line arguments failed to parse.
    #[error("invalid command line arguments: {0}")]
    Arguments(#[from] clap::Error),
}

#[derive(Debug, Parser)]
#[command(name = "tetherd", about = "Device-management hub daemon", version)]
struct Cli {
    /// Endpoint to listen on, e.g. tcp://0.0.0.0:3334.
    #[arg(long, value_name = "URL")]
    listen: Option<SocketEndpoint>,

    /// Directory holding devices_cfg.json and the device descriptors.
    #[arg(long, value_name = "DIR")]
    catalog_dir: Option<PathBuf>,

    /// File served verbatim for REQUEST_SETUP_VALUES.
    #[arg(long, value_name = "FILE")]
    setup_values: Option<PathBuf>,

    /// Tracing filter expression, e.g. info or tetherd=debug.
    #[arg(long, value_name = "FILTER")]
    log_filter: Option<String>,

    /// Log output format: json or compact.
    #[arg(long, value_name = "FORMAT")]
    log_format: Option<LogFormat>,
}

impl Cli {
    fn into_config(self) -> Config {
        let base = Config::default();
        Config {
            listen: self.listen.unwrap_or(base.listen),
            catalog_dir: self.catalog_dir.unwrap_or(base.catalog_dir),
            setup_values_path: self.setup_values.unwrap_or(base.setup_values_path),
            log_filter: self.log_filter.unwrap_or(base.log_filter),
            log_format: self.log_format.unwrap_or(base.log_format),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployed_layout() {
        let config = Config::load_from_iter(["tetherd"]).expect("load defaults");
        assert_eq!(config.listen, SocketEndpoint::new("0.0.0.0", 3334));
        assert_eq!(config.catalog_dir, PathBuf::from("devices"));
        assert_eq!(
            config.setup_values_path,
            PathBuf::from("device_setup_values.json")
        );
        assert_eq!(config.log_filter, "info");
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn flags_override_defaults() {
        let config = Config::load_from_iter([
            "tetherd",
            "--listen",
            "tcp://127.0.0.1:9000",
            "--catalog-dir",
            "/srv/bench/devices",
            "--setup-values",
            "/srv/bench/values.json",
            "--log-filter",
            "tetherd=debug",
            "--log-format",
            "compact",
        ])
        .expect("load overridden");
        assert_eq!(config.listen, SocketEndpoint::new("127.0.0.1", 9000));
        assert_eq!(config.catalog_dir, PathBuf::from("/srv/bench/devices"));
        assert_eq!(config.setup_values_path, PathBuf::from("/srv/bench/values.json"));
        assert_eq!(config.log_filter, "tetherd=debug");
        assert_eq!(config.log_format, LogFormat::Compact);
    }

    #[test]
    fn rejects_non_tcp_listen_endpoint() {
        let result = Config::load_from_iter(["tetherd", "--listen", "unix:///tmp/hub.sock"]);
        assert!(matches!(result, Err(ConfigError::Arguments(_))));
    }
}
