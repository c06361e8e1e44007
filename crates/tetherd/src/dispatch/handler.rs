//! Connection handler running the per-connection receive loop.
//!
//! One handler instance is shared by every worker thread; everything mutable
//! (the session) lives on the worker's stack. The loop is strictly
//! sequential — read, decode, dispatch, reply — so a connection has at most
//! one request in flight.

use std::io::{self, Read, Write};
use std::time::Duration;

use tracing::{debug, warn};

use tether_protocol::Response;

use crate::catalog::DeviceCatalog;
use crate::session::SessionState;
use crate::transport::{ConnectionHandler, ConnectionStream, StopToken};

use super::DISPATCH_TARGET;
use super::router::{DispatchOutcome, MessageRouter};

/// Bound on a single blocking read so the stop token is observed promptly.
const READ_POLL: Duration = Duration::from_secs(1);

/// Upper bound on one inbound payload. The protocol has no framing — one
/// read is one message — so the buffer size is also the request size limit.
const RECV_BUFFER_BYTES: usize = 1024;

/// Connection handler that parses and dispatches protocol payloads.
pub struct HubConnectionHandler<C> {
    router: MessageRouter,
    catalog: C,
}

impl<C: DeviceCatalog> HubConnectionHandler<C> {
    /// Creates a handler serving requests out of the given catalog.
    pub fn new(catalog: C) -> Self {
        Self {
            router: MessageRouter::new(),
            catalog,
        }
    }

    fn serve(&self, mut stream: ConnectionStream, stop: &StopToken) {
        let peer = stream.peer_addr();
        if let Err(error) = stream.set_read_timeout(READ_POLL) {
            warn!(
                target: DISPATCH_TARGET,
                error = %error,
                "failed to bound connection reads"
            );
            return;
        }
        debug!(target: DISPATCH_TARGET, peer = ?peer, "connection active");

        let mut session = SessionState::new();
        let mut buffer = [0_u8; RECV_BUFFER_BYTES];
        while !stop.is_triggered() {
            let read = match stream.read(&mut buffer) {
                Ok(0) => {
                    debug!(target: DISPATCH_TARGET, peer = ?peer, "peer closed the connection");
                    break;
                }
                Ok(read) => read,
                Err(error)
                    if matches!(
                        error.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                    ) =>
                {
                    continue;
                }
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error) => {
                    warn!(target: DISPATCH_TARGET, error = %error, "socket read failed");
                    break;
                }
            };

            if !self.process_payload(&mut stream, &mut session, &buffer[..read]) {
                break;
            }
        }
        debug!(target: DISPATCH_TARGET, peer = ?peer, "connection closing");
    }

    /// Handles one payload. Returns `false` when the connection must close
    /// (write failure); every protocol-level failure is absorbed instead.
    fn process_payload(
        &self,
        stream: &mut ConnectionStream,
        session: &mut SessionState,
        payload: &[u8],
    ) -> bool {
        let request = match tether_protocol::decode(payload) {
            Ok(request) => request,
            Err(error) => {
                warn!(
                    target: DISPATCH_TARGET,
                    error = %error,
                    "ignoring undecodable payload"
                );
                return true;
            }
        };

        let outcome = match self.router.handle(request, session, &self.catalog) {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(
                    target: DISPATCH_TARGET,
                    error = %error,
                    "catalog access failed; request dropped"
                );
                return true;
            }
        };

        match outcome {
            DispatchOutcome::Reply(response) => self.write_reply(stream, &response),
            DispatchOutcome::Passthrough(chunks) => self.write_chunks(stream, &chunks),
            DispatchOutcome::NoReply => true,
        }
    }

    fn write_reply(&self, stream: &mut ConnectionStream, response: &Response) -> bool {
        let payload = match tether_protocol::encode(response) {
            Ok(payload) => payload,
            Err(error) => {
                warn!(
                    target: DISPATCH_TARGET,
                    error = %error,
                    "response failed to serialise; dropped"
                );
                return true;
            }
        };
        self.write_all(stream, &payload)
    }

    fn write_chunks(&self, stream: &mut ConnectionStream, chunks: &[Vec<u8>]) -> bool {
        chunks.iter().all(|chunk| self.write_all(stream, chunk))
    }

    fn write_all(&self, stream: &mut ConnectionStream, payload: &[u8]) -> bool {
        if let Err(error) = stream.write_all(payload).and_then(|()| stream.flush()) {
            warn!(target: DISPATCH_TARGET, error = %error, "socket write failed");
            return false;
        }
        true
    }
}

impl<C: DeviceCatalog + 'static> ConnectionHandler for HubConnectionHandler<C> {
    fn handle(&self, stream: ConnectionStream, stop: &StopToken) {
        self.serve(stream, stop);
    }
}
