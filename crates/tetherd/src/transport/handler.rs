//! Connection handling abstractions for the daemon listener.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Cooperative stop flag shared by the acceptor and every connection worker.
///
/// Stops are observed, never forced: workers check the token once per loop
/// iteration after a bounded wait, so shutdown completes within roughly one
/// read-timeout per connection.
#[derive(Debug, Clone, Default)]
pub(crate) struct StopToken(Arc<AtomicBool>);

impl StopToken {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub(crate) fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Stream accepted by the daemon listener.
pub(crate) struct ConnectionStream {
    inner: TcpStream,
}

impl ConnectionStream {
    pub(crate) fn new(inner: TcpStream) -> Self {
        Self { inner }
    }

    /// Bounds every read so the worker can observe its stop token.
    pub(crate) fn set_read_timeout(&self, timeout: Duration) -> io::Result<()> {
        self.inner.set_read_timeout(Some(timeout))
    }

    pub(crate) fn peer_addr(&self) -> Option<SocketAddr> {
        self.inner.peer_addr().ok()
    }
}

impl Read for ConnectionStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for ConnectionStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Handles accepted socket connections.
pub(crate) trait ConnectionHandler: Send + Sync + 'static {
    /// Handles one connection until the peer disconnects or the stop token
    /// fires. Implementations should avoid panicking.
    fn handle(&self, stream: ConnectionStream, stop: &StopToken);
}
