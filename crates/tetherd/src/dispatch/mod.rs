//! Protocol dispatch for the hub daemon.
//!
//! Each connection worker reads one JSON payload per socket read, decodes it
//! with `tether-protocol`, routes it by `msg_type` and writes the outcome
//! back on the same connection. The router is a pure type-keyed switch; all
//! continuity (message-id counter, resolved-device cache) lives in the
//! per-connection session state.
//!
//! ## Protocol
//!
//! | Request `msg_type` | Reply |
//! |---|---|
//! | `REQUEST_DEVICE_LIST` | `DEVICE_LIST` |
//! | `REQUEST_SETUP_FULL` | `DEVICE_SETUP_FULL` (needs a prior listing) |
//! | `REQUEST_SETUP_VALUES` | raw passthrough, no JSON wrapper |
//! | `REQUEST_CHANGE_VALUE` | `DEVICE_VALUE_CONFIRM`, always `"OK"` |
//!
//! Anything else is dropped without a reply. Payloads are not framed: a
//! message must arrive in a single read, a long-standing limitation of the
//! deployed clients that this server preserves rather than papers over.

mod handler;
mod router;

pub use self::handler::HubConnectionHandler;
pub use self::router::{DispatchOutcome, MessageRouter};
pub(crate) use self::router::DISPATCH_TARGET;
