//! The tether hub daemon.
//!
//! `tetherd` is a command/response server for a device-management protocol:
//! bench clients connect over TCP, send JSON requests and receive JSON
//! responses describing configured devices and their parameter setups. The
//! daemon accepts any number of concurrent connections, giving each one a
//! dedicated worker thread and its own session state (outbound message-id
//! counter plus the cache of devices resolved by earlier listings on that
//! connection).
//!
//! The crate splits along the request path:
//!
//! - `transport` — bounded-poll accept loop, worker registry, cooperative
//!   shutdown.
//! - `dispatch` ([`MessageRouter`], [`HubConnectionHandler`]) — type-keyed
//!   routing of decoded requests and the per-connection receive loop.
//! - `catalog` ([`DeviceCatalog`], [`FsCatalog`]) — read-only access to the
//!   configured device table and descriptor documents.
//! - `session` ([`SessionState`]) — per-connection mutable context.
//! - `bootstrap`/`process` — configuration, telemetry, signals and the
//!   launch/stop sequence.
//!
//! Wire payloads are Windows-1251 JSON, handled by the `tether-protocol`
//! crate.

mod bootstrap;
mod catalog;
mod dispatch;
mod health;
mod process;
mod session;
mod telemetry;
mod transport;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use catalog::{
    AccessMethod, CatalogEntry, CatalogError, DeviceCatalog, FsCatalog, SourceLocator,
};
pub use dispatch::{DispatchOutcome, HubConnectionHandler, MessageRouter};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{
    LaunchError, LaunchPlan, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_daemon,
    run_daemon_with,
};
pub use session::SessionState;
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
