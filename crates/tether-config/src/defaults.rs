//! Default configuration values.

use std::path::PathBuf;

use crate::logging::LogFormat;
use crate::socket::SocketEndpoint;

/// Default TCP port the hub listens on.
pub const DEFAULT_TCP_PORT: u16 = 3334;

/// Default listen host; the hub serves every bench interface.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Computes the default listen endpoint for the daemon.
#[must_use]
pub fn default_socket_endpoint() -> SocketEndpoint {
    SocketEndpoint::new(DEFAULT_HOST, DEFAULT_TCP_PORT)
}

/// Directory holding the device catalog (`devices_cfg.json` plus the
/// per-device descriptor documents), relative to the working directory.
#[must_use]
pub fn default_catalog_dir() -> PathBuf {
    PathBuf::from("devices")
}

/// Path of the shared setup-values file served verbatim to clients.
#[must_use]
pub fn default_setup_values_path() -> PathBuf {
    PathBuf::from("device_setup_values.json")
}

/// Default logging format for the binaries.
#[must_use]
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}
