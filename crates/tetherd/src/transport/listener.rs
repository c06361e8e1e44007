//! Listener implementation for the daemon transport socket.

use std::collections::HashMap;
use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use tether_config::SocketEndpoint;

use super::handler::{ConnectionHandler, ConnectionStream, StopToken};
use super::{LISTENER_TARGET, ListenerError};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// Listener bound to the configured endpoint.
#[derive(Debug)]
pub(crate) struct SocketListener {
    endpoint: SocketEndpoint,
    listener: TcpListener,
}

impl SocketListener {
    pub(crate) fn bind(endpoint: &SocketEndpoint) -> Result<Self, ListenerError> {
        let listener = bind_tcp(&endpoint.host, endpoint.port)?;
        Ok(Self {
            endpoint: endpoint.clone(),
            listener,
        })
    }

    pub(crate) fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.local_addr().ok()
    }

    /// Moves the listener into a background accept loop.
    ///
    /// Every accepted connection runs on its own worker thread, tracked in a
    /// registry. Triggering the returned handle's shutdown stops the accept
    /// loop, which then joins every live worker before the listening socket
    /// drops.
    pub(crate) fn start(
        self,
        handler: Arc<dyn ConnectionHandler>,
    ) -> Result<ListenerHandle, ListenerError> {
        self.listener
            .set_nonblocking(true)
            .map_err(|source| ListenerError::NonBlocking { source })?;
        let stop = StopToken::new();
        let registry = Arc::new(WorkerRegistry::default());
        let loop_stop = stop.clone();
        let handle = thread::spawn(move || run_accept_loop(&self, &loop_stop, &registry, &handler));
        Ok(ListenerHandle {
            stop,
            handle: Some(handle),
        })
    }
}

/// Handle to the background listener thread.
pub(crate) struct ListenerHandle {
    stop: StopToken,
    handle: Option<JoinHandle<()>>,
}

impl ListenerHandle {
    /// Signals the accept loop and every connection worker to stop.
    pub(crate) fn shutdown(&self) {
        self.stop.trigger();
    }

    /// Waits for the accept loop (and, transitively, every worker) to exit.
    pub(crate) fn join(mut self) -> Result<(), ListenerError> {
        if let Some(handle) = self.handle.take() {
            handle.join().map_err(|_| ListenerError::ThreadPanic)?;
        }
        Ok(())
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.stop.trigger();
    }
}

/// Registry of live connection workers.
///
/// Mutated from two sides only: the acceptor adds entries, a worker removes
/// itself when its connection closes. The accept loop drains whatever is
/// left at shutdown and joins it.
#[derive(Default)]
struct WorkerRegistry {
    workers: Mutex<HashMap<u64, JoinHandle<()>>>,
}

impl WorkerRegistry {
    fn register(&self, id: u64, handle: JoinHandle<()>) {
        if let Ok(mut workers) = self.workers.lock() {
            workers.insert(id, handle);
        }
    }

    fn release(&self, id: u64) {
        if let Ok(mut workers) = self.workers.lock() {
            workers.remove(&id);
        }
    }

    fn drain(&self) -> Vec<JoinHandle<()>> {
        match self.workers.lock() {
            Ok(mut workers) => workers.drain().map(|(_, handle)| handle).collect(),
            Err(_) => Vec::new(),
        }
    }
}

fn run_accept_loop(
    listener: &SocketListener,
    stop: &StopToken,
    registry: &Arc<WorkerRegistry>,
    handler: &Arc<dyn ConnectionHandler>,
) {
    info!(
        target: LISTENER_TARGET,
        endpoint = %listener.endpoint,
        "socket listener active"
    );
    let mut next_worker_id: u64 = 0;
    let mut last_error = None::<io::ErrorKind>;
    while !stop.is_triggered() {
        match accept_connection(&listener.listener) {
            Ok(Some(stream)) => {
                last_error = None;
                spawn_worker(next_worker_id, stream, registry, handler, stop);
                next_worker_id += 1;
            }
            Ok(None) => {
                thread::sleep(ACCEPT_BACKOFF);
            }
            Err(error) => {
                let kind = error.kind();
                if last_error != Some(kind) {
                    warn!(
                        target: LISTENER_TARGET,
                        error = %error,
                        "socket accept error"
                    );
                }
                last_error = Some(kind);
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }

    let workers = registry.drain();
    let worker_count = workers.len();
    for handle in workers {
        let _ = handle.join();
    }
    debug!(
        target: LISTENER_TARGET,
        worker_count,
        "connection workers joined"
    );
}

fn spawn_worker(
    id: u64,
    stream: TcpStream,
    registry: &Arc<WorkerRegistry>,
    handler: &Arc<dyn ConnectionHandler>,
    stop: &StopToken,
) {
    let handler = Arc::clone(handler);
    let worker_registry = Arc::clone(registry);
    let worker_stop = stop.clone();
    let handle = thread::spawn(move || {
        handler.handle(ConnectionStream::new(stream), &worker_stop);
        worker_registry.release(id);
    });
    registry.register(id, handle);
}

fn accept_connection(listener: &TcpListener) -> Result<Option<TcpStream>, io::Error> {
    match listener.accept() {
        Ok((stream, _)) => {
            stream.set_nonblocking(false)?;
            Ok(Some(stream))
        }
        Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
        Err(error) => Err(error),
    }
}

fn bind_tcp(host: &str, port: u16) -> Result<TcpListener, ListenerError> {
    let mut addrs = (host, port)
        .to_socket_addrs()
        .map_err(|source| ListenerError::Resolve {
            host: host.to_owned(),
            port,
            source,
        })?;
    let addr = addrs
        .find(|addr| matches!(addr, SocketAddr::V4(_) | SocketAddr::V6(_)))
        .ok_or_else(|| ListenerError::ResolveEmpty {
            host: host.to_owned(),
            port,
        })?;
    TcpListener::bind(addr).map_err(|source| ListenerError::BindTcp { addr, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    struct CountingHandler {
        count: Arc<AtomicUsize>,
    }

    impl ConnectionHandler for CountingHandler {
        fn handle(&self, _stream: ConnectionStream, _stop: &StopToken) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Holds its connection open until the stop token fires.
    struct BlockingHandler;

    impl ConnectionHandler for BlockingHandler {
        fn handle(&self, _stream: ConnectionStream, stop: &StopToken) {
            while !stop.is_triggered() {
                thread::sleep(Duration::from_millis(10));
            }
        }
    }

    fn wait_for_count(count: &AtomicUsize, expected: usize) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if count.load(Ordering::SeqCst) >= expected {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }

    fn start_listener(handler: Arc<dyn ConnectionHandler>) -> (ListenerHandle, SocketAddr) {
        let endpoint = SocketEndpoint::new("127.0.0.1", 0);
        let listener = SocketListener::bind(&endpoint).expect("bind listener");
        let addr = listener
            .local_addr()
            .expect("listener should report local address");
        let handle = listener.start(handler).expect("start listener");
        (handle, addr)
    }

    #[test]
    fn accepts_multiple_connections() {
        let count = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(CountingHandler {
            count: Arc::clone(&count),
        });
        let (handle, addr) = start_listener(handler);

        TcpStream::connect(addr).expect("connect first client");
        TcpStream::connect(addr).expect("connect second client");

        assert!(wait_for_count(&count, 2), "expected two connections");
        handle.shutdown();
        handle.join().expect("join listener");
    }

    #[test]
    fn shutdown_joins_active_workers() {
        let (handle, addr) = start_listener(Arc::new(BlockingHandler));

        let _client = TcpStream::connect(addr).expect("connect client");
        // Give the acceptor time to register the worker.
        thread::sleep(Duration::from_millis(100));

        handle.shutdown();
        let started = Instant::now();
        handle.join().expect("join listener");
        assert!(
            started.elapsed() < Duration::from_secs(2),
            "shutdown should complete within the poll bound"
        );
    }
}
