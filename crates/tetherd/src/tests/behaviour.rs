//! End-to-end behaviour of the hub daemon over loopback TCP.

use std::thread;
use std::time::{Duration, Instant};

use super::support::{HubWorld, SETUP_VALUES};

#[test]
fn full_session_against_file_backed_catalog() {
    let world = HubWorld::start();
    let mut client = world.connect();

    // Listing: one file-backed device resolves, the com_port entry is
    // skipped, and the session counter hands out id 1.
    client.send(
        br#"{"msg_type": "REQUEST_DEVICE_LIST", "msg_id": 0, "sender_dev_id": 0, "dest_dev_id": 99}"#,
    );
    let listing = client.read_json();
    assert_eq!(listing["msg_type"], "DEVICE_LIST");
    assert_eq!(listing["msg_id"], 1);
    let devices = listing["msg_body"]["device_list"]
        .as_array()
        .expect("device array");
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0]["dev_id"], 7);
    assert_eq!(devices[0]["dev_name"], "Датчик давления  | id: 7  | file");

    // Change value: confirmed with the next session id and the request id
    // echoed back, identity swapped.
    client.send(
        br#"{"msg_type": "REQUEST_CHANGE_VALUE", "msg_id": 5, "sender_dev_id": 1,
            "dest_dev_id": 7, "msg_body": {"value_new": {"param_id": 42, "param_value": 3}}}"#,
    );
    let confirm = client.read_json();
    assert_eq!(confirm["msg_type"], "DEVICE_VALUE_CONFIRM");
    assert_eq!(confirm["msg_id"], 2);
    assert_eq!(confirm["sender_dev_id"], 7);
    assert_eq!(confirm["dest_dev_id"], 1);
    assert_eq!(confirm["msg_body"]["value_confirm"]["msg_id_confirm"], 5);
    assert_eq!(confirm["msg_body"]["value_confirm"]["result"], "OK");
    assert_eq!(confirm["msg_body"]["value_confirm"]["param_id"], 42);
    assert_eq!(confirm["msg_body"]["value_confirm"]["new_value"], 3);

    // Full setup resolves now that the listing cached device 7.
    client.send(
        br#"{"msg_type": "REQUEST_SETUP_FULL", "msg_id": 6, "sender_dev_id": 1, "dest_dev_id": 7}"#,
    );
    let setup = client.read_json();
    assert_eq!(setup["msg_type"], "DEVICE_SETUP_FULL");
    assert_eq!(setup["msg_id"], 6);
    assert_eq!(setup["sender_dev_id"], 7);
    assert_eq!(setup["dest_dev_id"], 1);
    assert_eq!(setup["msg_body"]["dev_info"]["dev_id"], 7);
    assert_eq!(setup["msg_body"]["params"][0]["param_id"], 42);

    // Values file streams through byte for byte, no JSON wrapper.
    client.send(br#"{"msg_type": "REQUEST_SETUP_VALUES"}"#);
    assert_eq!(client.read_raw(), SETUP_VALUES);

    world.stop();
}

#[test]
fn sessions_are_isolated_per_connection() {
    let world = HubWorld::start();

    let mut first = world.connect();
    first.send(
        br#"{"msg_type": "REQUEST_DEVICE_LIST", "msg_id": 0, "sender_dev_id": 1, "dest_dev_id": 0}"#,
    );
    assert_eq!(first.read_json()["msg_id"], 1);

    // A second connection starts from a fresh counter and an empty device
    // cache, regardless of what the first one did.
    let mut second = world.connect();
    second.send(
        br#"{"msg_type": "REQUEST_CHANGE_VALUE", "msg_id": 5, "sender_dev_id": 2,
            "dest_dev_id": 7, "msg_body": {"value_new": {"param_id": 8, "param_value": 1.5}}}"#,
    );
    let confirm = second.read_json();
    assert_eq!(confirm["msg_id"], 1);
    assert_eq!(confirm["msg_body"]["value_confirm"]["new_value"], 1.5);

    second.send(
        br#"{"msg_type": "REQUEST_SETUP_FULL", "msg_id": 6, "sender_dev_id": 2, "dest_dev_id": 7}"#,
    );
    second.expect_silence();

    world.stop();
}

#[test]
fn stop_joins_every_active_connection() {
    let world = HubWorld::start();
    let _first = world.connect();
    let _second = world.connect();

    // Give the acceptor time to hand both connections to workers.
    thread::sleep(Duration::from_millis(150));

    let started = Instant::now();
    world.stop();
    assert!(
        started.elapsed() < Duration::from_secs(3),
        "shutdown must complete within the poll bounds"
    );
}
