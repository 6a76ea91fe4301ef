//! Relay integration tests
//!
//! A relay on a loopback port with plain TCP clients and `Connection`
//! readers attached.

mod common;

use common::{connect, wait_until};
use std::io::{ErrorKind, Read, Write};
use std::thread;
use std::time::Duration;
use vga_view::net::{Connection, Relay, RelayHandle, TransportEvent};

// ========================================
// Test Helper Functions
// ========================================

fn start_relay(max_clients: usize) -> RelayHandle {
    Relay::bind("127.0.0.1:0", max_clients)
        .unwrap()
        .spawn()
        .unwrap()
}

/// Read from `connection` until `len` bytes arrived
fn collect(connection: &Connection, len: usize) -> Vec<u8> {
    let mut received = Vec::new();
    while received.len() < len {
        match connection.recv() {
            Some(TransportEvent::Data(bytes)) => received.extend_from_slice(&bytes),
            other => panic!("unexpected transport event: {:?}", other),
        }
    }
    received
}

// ========================================
// Broadcast
// ========================================

#[test]
fn test_broadcast_reaches_other_peers_only() {
    let relay = start_relay(5);
    let mut sender = connect(relay.local_addr());
    let mut first = connect(relay.local_addr());
    let mut second = connect(relay.local_addr());
    assert!(wait_until(|| relay.peer_count() == 3));

    sender.write_all(b"[displayvga]-{}\n").unwrap();

    let mut buf = [0u8; 16];
    first.read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"[displayvga]-{}\n");
    second.read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"[displayvga]-{}\n");

    sender
        .set_read_timeout(Some(Duration::from_millis(200)))
        .unwrap();
    let err = sender.read(&mut buf).unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::WouldBlock | ErrorKind::TimedOut
    ));
}

#[test]
fn test_bytes_arrive_in_order() {
    let relay = start_relay(5);
    let mut sender = connect(relay.local_addr());
    let viewer = Connection::connect(relay.local_addr(), 4).unwrap();
    assert!(wait_until(|| relay.peer_count() == 2));

    let payload: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
    for piece in payload.chunks(1000) {
        sender.write_all(piece).unwrap();
    }

    assert_eq!(collect(&viewer, payload.len()), payload);
}

#[test]
fn test_gamepad_records_flow_back() {
    let relay = start_relay(5);
    let mut model = connect(relay.local_addr());
    let viewer = Connection::connect(relay.local_addr(), 4).unwrap();
    assert!(wait_until(|| relay.peer_count() == 2));

    let record = b"[gamepad]-{\"u\":true,\"d\":false,\"l\":false,\"r\":false,\"a\":false,\"b\":false}\n";
    viewer.writer().unwrap().write_all(record).unwrap();

    let mut buf = vec![0u8; record.len()];
    model.read_exact(&mut buf).unwrap();
    assert_eq!(buf, record);
}

// ========================================
// Peer Management
// ========================================

#[test]
fn test_extra_clients_are_closed() {
    let relay = start_relay(2);
    let _first = connect(relay.local_addr());
    let _second = connect(relay.local_addr());
    assert!(wait_until(|| relay.peer_count() == 2));

    let mut extra = connect(relay.local_addr());
    let mut buf = [0u8; 1];
    match extra.read(&mut buf) {
        Ok(n) => assert_eq!(n, 0),
        Err(err) => assert_eq!(err.kind(), ErrorKind::ConnectionReset),
    }
    assert_eq!(relay.peer_count(), 2);
}

#[test]
fn test_peer_that_stops_reading_is_dropped() {
    const PIECE: usize = 64 * 1024;
    const PIECES: usize = 1024;

    let relay = Relay::bind("127.0.0.1:0", 5)
        .unwrap()
        .with_write_timeout(Duration::from_millis(500))
        .spawn()
        .unwrap();
    let mut sender = connect(relay.local_addr());
    let mut viewer = connect(relay.local_addr());
    let _stalled = connect(relay.local_addr());
    assert!(wait_until(|| relay.peer_count() == 3));

    // 64 MiB is more than the stalled socket and its queue can hold
    let writer = thread::spawn(move || {
        let piece: Vec<u8> = (0..PIECE).map(|i| (i % 251) as u8).collect();
        for _ in 0..PIECES {
            sender.write_all(&piece).unwrap();
        }
        sender
    });

    let mut piece = vec![0u8; PIECE];
    for n in 0..PIECES {
        viewer
            .read_exact(&mut piece)
            .unwrap_or_else(|err| panic!("viewer starved at piece {n}: {err}"));
        assert_eq!(piece[PIECE - 1], ((PIECE - 1) % 251) as u8);
    }
    let _sender = writer.join().unwrap();

    assert!(wait_until(|| relay.peer_count() == 2));

    // The relay still admits new peers and shuts down cleanly
    let _late = connect(relay.local_addr());
    assert!(wait_until(|| relay.peer_count() == 3));
    relay.stop().unwrap();
}

#[test]
fn test_disconnected_peer_is_removed() {
    let relay = start_relay(5);
    let first = connect(relay.local_addr());
    let _second = connect(relay.local_addr());
    assert!(wait_until(|| relay.peer_count() == 2));

    drop(first);
    assert!(wait_until(|| relay.peer_count() == 1));
}

#[test]
fn test_stop_closes_connections() {
    let relay = start_relay(5);
    let viewer = Connection::connect(relay.local_addr(), 4).unwrap();
    assert!(wait_until(|| relay.peer_count() == 1));

    relay.stop().unwrap();

    assert!(matches!(
        viewer.recv(),
        Some(TransportEvent::Closed) | Some(TransportEvent::Failed(_))
    ));
}
