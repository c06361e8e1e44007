//! Socket listener and connection plumbing for the hub daemon.
//!
//! The transport module binds the configured TCP endpoint, accepts
//! connections in a background thread and hands each one to a dedicated
//! worker thread. Workers are tracked in a registry so a server-level stop
//! joins every connection before the listening socket closes.

mod errors;
mod handler;
mod listener;

pub(crate) use self::errors::ListenerError;
pub(crate) use self::handler::{ConnectionHandler, ConnectionStream, StopToken};
pub(crate) use self::listener::{ListenerHandle, SocketListener};

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
