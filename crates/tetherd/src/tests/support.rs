//! Shared fixtures for the behaviour suite: an on-disk catalog, a running
//! listener and a blocking test client.

use std::fs;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use tether_config::SocketEndpoint;

use crate::catalog::FsCatalog;
use crate::dispatch::HubConnectionHandler;
use crate::transport::{ConnectionHandler, ListenerHandle, SocketListener};

const CLIENT_READ_TIMEOUT: Duration = Duration::from_millis(1500);
const DRAIN_TIMEOUT: Duration = Duration::from_millis(300);

/// Contents of the shared values file served for `REQUEST_SETUP_VALUES`.
pub(crate) const SETUP_VALUES: &[u8] = b"{\"values\":\n  [{\"param_id\": 42, \"value\": 3}]}\n";

/// A running hub over loopback TCP with a temp-dir catalog behind it.
pub(crate) struct HubWorld {
    addr: SocketAddr,
    listener: Option<ListenerHandle>,
    _catalog_dir: TempDir,
}

impl HubWorld {
    pub(crate) fn start() -> Self {
        let catalog_dir = TempDir::new().expect("temp dir");
        write_fixture(&catalog_dir);
        let catalog = FsCatalog::new(
            catalog_dir.path(),
            catalog_dir.path().join("device_setup_values.json"),
        );
        let handler: Arc<dyn ConnectionHandler> = Arc::new(HubConnectionHandler::new(catalog));

        let listener =
            SocketListener::bind(&SocketEndpoint::new("127.0.0.1", 0)).expect("bind listener");
        let addr = listener.local_addr().expect("local addr");
        let handle = listener.start(handler).expect("start listener");

        Self {
            addr,
            listener: Some(handle),
            _catalog_dir: catalog_dir,
        }
    }

    pub(crate) fn connect(&self) -> HubClient {
        HubClient::connect(self.addr)
    }

    /// Stops the listener, joining every connection worker.
    pub(crate) fn stop(mut self) {
        if let Some(handle) = self.listener.take() {
            handle.shutdown();
            handle.join().expect("join listener");
        }
    }
}

/// Blocking test client speaking the wire protocol.
pub(crate) struct HubClient {
    stream: TcpStream,
}

impl HubClient {
    fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).expect("connect client");
        stream
            .set_read_timeout(Some(CLIENT_READ_TIMEOUT))
            .expect("client read timeout");
        Self { stream }
    }

    pub(crate) fn send(&mut self, payload: &[u8]) {
        self.stream.write_all(payload).expect("write request");
        self.stream.flush().expect("flush request");
    }

    /// Collects whatever the hub sends until it goes quiet.
    pub(crate) fn read_raw(&mut self) -> Vec<u8> {
        let mut collected = Vec::new();
        let mut buffer = [0_u8; 64 * 1024];
        loop {
            match self.stream.read(&mut buffer) {
                Ok(0) => break,
                Ok(read) => {
                    collected.extend_from_slice(&buffer[..read]);
                    // Later chunks of the same reply arrive quickly or not
                    // at all.
                    self.stream
                        .set_read_timeout(Some(DRAIN_TIMEOUT))
                        .expect("drain timeout");
                }
                Err(error)
                    if matches!(
                        error.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                    ) =>
                {
                    break;
                }
                Err(error) => panic!("client read failed: {error}"),
            }
        }
        self.stream
            .set_read_timeout(Some(CLIENT_READ_TIMEOUT))
            .expect("restore timeout");
        collected
    }

    /// Reads one JSON reply.
    pub(crate) fn read_json(&mut self) -> serde_json::Value {
        let payload = self.read_raw();
        assert!(!payload.is_empty(), "expected a reply, got silence");
        let text = tether_protocol::decode_text(&payload);
        serde_json::from_str(text.as_ref()).expect("reply should be JSON")
    }

    /// Asserts that the hub sends nothing within the client timeout.
    pub(crate) fn expect_silence(&mut self) {
        let payload = self.read_raw();
        assert!(
            payload.is_empty(),
            "expected silence, got {} bytes",
            payload.len()
        );
    }
}

fn write_fixture(dir: &TempDir) {
    fs::write(
        dir.path().join("devices_cfg.json"),
        r#"{"devices_to_check": [
            {"access_via": "file", "file_name": "device7.json"},
            {"access_via": "com_port"}
        ]}"#,
    )
    .expect("write table");

    // Descriptor carries a Cyrillic display name and is stored in the wire
    // code page, like the deployed catalog.
    let descriptor = r#"{
        "dev_info": {
            "dev_id": 7,
            "dev_type": "pressure",
            "dev_name": "Датчик давления",
            "dev_hw_ver": "1.2",
            "dev_fw_ver": "3.0.1",
            "fw_date": "2023-11-02",
            "param_uuid": "c4a760a8-dbcf-4e14-9f39-645a8bc4d0f1"
        },
        "params": [{"param_id": 42, "value": 3}]
    }"#;
    fs::write(
        dir.path().join("device7.json"),
        tether_protocol::encode_text(descriptor),
    )
    .expect("write descriptor");

    fs::write(dir.path().join("device_setup_values.json"), SETUP_VALUES).expect("write values");
}
