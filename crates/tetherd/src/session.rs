//! Per-connection session state.

use std::collections::HashMap;

use tether_protocol::{DeviceId, MessageId};

use crate::catalog::SourceLocator;

/// Mutable context owned by exactly one connection worker.
///
/// Nothing here is shared between connections, so no synchronisation is
/// needed; the worker threads the state through every dispatch call. The
/// state dies with the connection — reconnecting clients start from a fresh
/// counter and an empty device cache.
#[derive(Debug, Default)]
pub struct SessionState {
    next_message_id: MessageId,
    known_devices: HashMap<DeviceId, SourceLocator>,
}

impl SessionState {
    /// Creates a fresh session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next outbound message id.
    ///
    /// The counter starts at 0, so the first message a session originates
    /// carries id 1. Callers must only allocate once the operation is known
    /// to succeed; a failed listing must not consume an id.
    pub fn next_message_id(&mut self) -> MessageId {
        self.next_message_id += 1;
        self.next_message_id
    }

    /// Records the backing source of a device resolved by a listing.
    ///
    /// Entries never expire within a session. Re-listing simply overwrites,
    /// which keeps the cache current if the catalog moved a device between
    /// listings.
    pub fn record_device(&mut self, device: DeviceId, locator: SourceLocator) {
        self.known_devices.insert(device, locator);
    }

    /// Looks up the backing source of a previously listed device.
    #[must_use]
    pub fn resolve_device(&self, device: DeviceId) -> Option<&SourceLocator> {
        self.known_devices.get(&device)
    }

    /// Number of devices this session has resolved so far.
    #[must_use]
    pub fn known_device_count(&self) -> usize {
        self.known_devices.len()
    }
}
