//! Type-keyed routing of decoded requests.

use tracing::{debug, warn};

use tether_protocol::{DeviceId, MessageId, NumericValue, ParamId, Request, Response, ValueConfirm, ValueResult};

use crate::catalog::{AccessMethod, CatalogError, DeviceCatalog, SourceLocator};
use crate::session::SessionState;

pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Device id the hub uses when it originates a listing reply itself.
const HUB_DEVICE_ID: DeviceId = 0;

/// Result of dispatching one request.
#[derive(Debug, PartialEq)]
pub enum DispatchOutcome {
    /// One typed response to encode and send.
    Reply(Response),
    /// Raw chunks written to the peer in order, no JSON wrapper.
    Passthrough(Vec<Vec<u8>>),
    /// Deliberate silence: unrecognised message type, or a setup request for
    /// a device this session never listed.
    NoReply,
}

/// Routes decoded requests to their response-construction logic.
///
/// Not a state machine: every request type is valid at any time. The one
/// ordering dependency — `GetFullSetup` only answers for devices resolved by
/// an earlier `ListDevices` on the same connection — is expressed through
/// the session cache, not through transition guards.
#[derive(Debug, Default)]
pub struct MessageRouter;

impl MessageRouter {
    /// Creates a new router.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Resolves a request against the session and the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when catalog storage fails mid-operation;
    /// the caller logs it and sends nothing, leaving session state exactly
    /// as it was before the request.
    pub fn handle(
        &self,
        request: Request,
        session: &mut SessionState,
        catalog: &dyn DeviceCatalog,
    ) -> Result<DispatchOutcome, CatalogError> {
        match request {
            Request::ListDevices { requester_id } => {
                self.list_devices(requester_id, session, catalog)
            }
            Request::GetFullSetup {
                msg_id,
                sender_dev_id,
                dest_dev_id,
            } => self.full_setup(msg_id, sender_dev_id, dest_dev_id, session, catalog),
            Request::GetSetupValues => self.setup_values(catalog),
            Request::ChangeValue {
                msg_id,
                sender_dev_id,
                dest_dev_id,
                param_id,
                new_value,
            } => Ok(self.change_value(msg_id, sender_dev_id, dest_dev_id, param_id, new_value, session)),
            Request::Unrecognised { msg_type } => {
                debug!(
                    target: DISPATCH_TARGET,
                    msg_type,
                    "ignoring unrecognised message type"
                );
                Ok(DispatchOutcome::NoReply)
            }
        }
    }

    /// Builds a `DEVICE_LIST` from every resolvable catalog entry.
    ///
    /// The session cache and the message counter are only touched once every
    /// catalog read has succeeded, so a failing entry aborts the operation
    /// without partial effects.
    fn list_devices(
        &self,
        requester_id: DeviceId,
        session: &mut SessionState,
        catalog: &dyn DeviceCatalog,
    ) -> Result<DispatchOutcome, CatalogError> {
        let entries = catalog.list_configured_devices()?;
        let mut devices = Vec::new();
        let mut resolved: Vec<(DeviceId, SourceLocator)> = Vec::new();
        for entry in entries {
            match entry.access {
                AccessMethod::File => {
                    let locator = entry.locator.ok_or(CatalogError::MissingLocator)?;
                    let mut descriptor = catalog.read_descriptor(&locator)?;
                    descriptor.dev_name = format!(
                        "{}  | id: {}  | file",
                        descriptor.dev_name, descriptor.dev_id
                    );
                    resolved.push((descriptor.dev_id, locator));
                    devices.push(descriptor);
                }
                access @ (AccessMethod::ComPort | AccessMethod::Socket) => {
                    // Known capability gap: configured but not resolvable yet.
                    warn!(
                        target: DISPATCH_TARGET,
                        access = access.as_str(),
                        "unsupported access method; entry skipped"
                    );
                }
            }
        }

        for (device, locator) in resolved {
            session.record_device(device, locator);
        }
        let msg_id = session.next_message_id();
        Ok(DispatchOutcome::Reply(Response::device_list(
            msg_id,
            HUB_DEVICE_ID,
            requester_id,
            devices,
        )))
    }

    /// Serves the full setup document of a device resolved earlier in this
    /// session. Unresolved devices get silence, not an error reply.
    fn full_setup(
        &self,
        msg_id: MessageId,
        sender_dev_id: DeviceId,
        dest_dev_id: DeviceId,
        session: &SessionState,
        catalog: &dyn DeviceCatalog,
    ) -> Result<DispatchOutcome, CatalogError> {
        let Some(locator) = session.resolve_device(dest_dev_id) else {
            debug!(
                target: DISPATCH_TARGET,
                device = dest_dev_id,
                "setup requested for a device this session never listed"
            );
            return Ok(DispatchOutcome::NoReply);
        };
        let body = catalog.read_setup_document(locator)?;
        Ok(DispatchOutcome::Reply(Response::full_setup(
            msg_id,
            dest_dev_id,
            sender_dev_id,
            body,
        )))
    }

    fn setup_values(&self, catalog: &dyn DeviceCatalog) -> Result<DispatchOutcome, CatalogError> {
        let raw = catalog.read_setup_values()?;
        Ok(DispatchOutcome::Passthrough(split_lines(&raw)))
    }

    /// Confirms a value change. There is deliberately no validation path:
    /// any requested value is accepted and echoed back with `"OK"`.
    fn change_value(
        &self,
        msg_id: MessageId,
        sender_dev_id: DeviceId,
        dest_dev_id: DeviceId,
        param_id: ParamId,
        new_value: NumericValue,
        session: &mut SessionState,
    ) -> DispatchOutcome {
        let confirm_id = session.next_message_id();
        DispatchOutcome::Reply(Response::value_confirm(
            confirm_id,
            dest_dev_id,
            sender_dev_id,
            ValueConfirm {
                msg_id_confirm: msg_id,
                result: ValueResult::Ok,
                param_id,
                new_value,
            },
        ))
    }
}

/// Splits the values file into per-line chunks, newline included, matching
/// how the file is streamed to the peer.
fn split_lines(raw: &[u8]) -> Vec<Vec<u8>> {
    let mut chunks = Vec::new();
    let mut rest = raw;
    while !rest.is_empty() {
        let cut = rest
            .iter()
            .position(|byte| *byte == b'\n')
            .map_or(rest.len(), |pos| pos + 1);
        let (chunk, tail) = rest.split_at(cut);
        chunks.push(chunk.to_vec());
        rest = tail;
    }
    chunks
}
