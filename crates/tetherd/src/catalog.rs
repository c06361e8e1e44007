//! Device catalog access.
//!
//! The catalog is the external registry of known devices: a table file
//! (`devices_cfg.json`) naming every configured device and how it is
//! reached, plus one descriptor document per file-backed device and a shared
//! setup-values file. The dispatcher only sees the [`DeviceCatalog`] trait;
//! [`FsCatalog`] is the filesystem implementation used in production.
//!
//! Catalog reads are idempotent and side-effect free, so any number of
//! connection workers may call into the same catalog concurrently without
//! locking. Catalog documents are stored in the same code page as the wire
//! (Windows-1251); the reader converts on the way in.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use tether_protocol::DeviceDescriptor;

pub(crate) const CATALOG_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::catalog");

/// Name of the configured-device table inside the catalog directory.
const CATALOG_CONFIG_FILE: &str = "devices_cfg.json";

/// How a configured device is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMethod {
    /// Descriptor document on local storage.
    File,
    /// Serial-attached device. Configured but not resolvable yet.
    ComPort,
    /// Network-attached device. Configured but not resolvable yet.
    Socket,
}

impl AccessMethod {
    /// Returns the canonical catalog spelling.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::ComPort => "com_port",
            Self::Socket => "socket",
        }
    }
}

impl fmt::Display for AccessMethod {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Opaque token identifying where a device's documents can be read from.
///
/// For file-backed devices this is the descriptor file name relative to the
/// catalog directory. Sessions cache these so later requests can reach a
/// device without re-scanning the table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLocator(String);

impl SourceLocator {
    /// Wraps a locator token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the locator token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceLocator {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// One entry of the configured-device table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// How the device is reached.
    pub access: AccessMethod,
    /// Where its documents live. Only file-backed entries carry a locator in
    /// the current catalog schema.
    pub locator: Option<SourceLocator>,
}

/// Errors surfaced while reading catalog storage.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A catalog file could not be read.
    #[error("failed to read catalog file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A catalog file was not parseable JSON (or not the expected layout).
    #[error("catalog file {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A descriptor document lacks its `dev_info` section.
    #[error("descriptor {path} has no dev_info section")]
    MissingDeviceInfo { path: PathBuf },

    /// A descriptor's `dev_info` section does not match the device schema.
    #[error("descriptor {path} has an invalid dev_info section: {source}")]
    InvalidDescriptor {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A file-backed table entry has no `file_name`.
    #[error("file-backed catalog entry is missing its file_name")]
    MissingLocator,
}

/// Read-only contract the dispatcher holds against the catalog.
pub trait DeviceCatalog: Send + Sync {
    /// Returns every configured device entry, in table order.
    fn list_configured_devices(&self) -> Result<Vec<CatalogEntry>, CatalogError>;

    /// Reads and parses the `dev_info` section of a descriptor document.
    fn read_descriptor(&self, locator: &SourceLocator) -> Result<DeviceDescriptor, CatalogError>;

    /// Reads a whole descriptor document for verbatim passthrough.
    fn read_setup_document(&self, locator: &SourceLocator) -> Result<Value, CatalogError>;

    /// Reads the shared setup-values file, byte for byte.
    fn read_setup_values(&self) -> Result<Vec<u8>, CatalogError>;
}

/// Catalog backed by JSON documents under a single directory.
#[derive(Debug, Clone)]
pub struct FsCatalog {
    root: PathBuf,
    setup_values_path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct CatalogTable {
    devices_to_check: Vec<ConfiguredDevice>,
}

#[derive(Debug, Deserialize)]
struct ConfiguredDevice {
    access_via: AccessMethod,
    #[serde(default)]
    file_name: Option<String>,
}

impl FsCatalog {
    /// Creates a catalog rooted at `root`, serving `setup_values_path` for
    /// value requests.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, setup_values_path: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            setup_values_path: setup_values_path.into(),
        }
    }

    fn locator_path(&self, locator: &SourceLocator) -> PathBuf {
        self.root.join(locator.as_str())
    }

    fn read_json(&self, path: &Path) -> Result<Value, CatalogError> {
        let raw = fs::read(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let text = tether_protocol::decode_text(&raw);
        serde_json::from_str(text.as_ref()).map_err(|source| CatalogError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl DeviceCatalog for FsCatalog {
    fn list_configured_devices(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        let path = self.root.join(CATALOG_CONFIG_FILE);
        let document = self.read_json(&path)?;
        let table: CatalogTable = serde_json::from_value(document)
            .map_err(|source| CatalogError::Parse { path, source })?;
        debug!(
            target: CATALOG_TARGET,
            entries = table.devices_to_check.len(),
            "configured-device table loaded"
        );
        Ok(table
            .devices_to_check
            .into_iter()
            .map(|device| CatalogEntry {
                access: device.access_via,
                locator: device.file_name.map(SourceLocator::new),
            })
            .collect())
    }

    fn read_descriptor(&self, locator: &SourceLocator) -> Result<DeviceDescriptor, CatalogError> {
        let path = self.locator_path(locator);
        let document = self.read_json(&path)?;
        let info = document
            .get("dev_info")
            .cloned()
            .ok_or_else(|| CatalogError::MissingDeviceInfo { path: path.clone() })?;
        serde_json::from_value(info)
            .map_err(|source| CatalogError::InvalidDescriptor { path, source })
    }

    fn read_setup_document(&self, locator: &SourceLocator) -> Result<Value, CatalogError> {
        self.read_json(&self.locator_path(locator))
    }

    fn read_setup_values(&self) -> Result<Vec<u8>, CatalogError> {
        fs::read(&self.setup_values_path).map_err(|source| CatalogError::Read {
            path: self.setup_values_path.clone(),
            source,
        })
    }
}
