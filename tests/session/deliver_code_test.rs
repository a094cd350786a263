// Deliver Code Tests
// Code framing and the write -> dwell -> disconnect flow

use smartlocker::config::{BleConfig, DeliveryChannel, LockerConfig};
use smartlocker::session::{frame_code, LockerError, LockerSession, SessionState};
use smartlocker::storage::{LockerAssignment, MemoryStore};
use smartlocker::transport::{MockResponse, MockTransport, TransportCall, TransportError};
use std::time::Duration;

fn locker() -> MockTransport {
    MockTransport::new().with_device("AA:BB:CC:DD:EE:FF", "SmartLocker-01")
}

fn session_with(
    config: LockerConfig,
    transport: &MockTransport,
    store: &MemoryStore,
) -> LockerSession<MockTransport, MemoryStore> {
    LockerSession::new(config, transport.clone(), store.clone())
}

// ============================================================================
// FRAMING
// ============================================================================

#[test]
fn test_frame_code_exact_bytes() {
    assert_eq!(frame_code("123456").unwrap(), b" 123456\r\n".to_vec());
}

#[test]
fn test_frame_code_ignores_caller_whitespace() {
    assert_eq!(frame_code("  123456\n").unwrap(), b" 123456\r\n".to_vec());
    assert_eq!(frame_code("\t123456 ").unwrap(), b" 123456\r\n".to_vec());
}

#[test]
fn test_frame_code_empty_is_rejected() {
    assert_eq!(frame_code(""), Err(LockerError::InvalidCode));
}

// ============================================================================
// DELIVERY FLOW
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_open_locker_sends_framed_code() {
    let ble = BleConfig::default();
    let transport = locker();
    let store = MemoryStore::new();
    let mut session = session_with(LockerConfig::default(), &transport, &store);

    session.open_locker(" 123456 ").await.unwrap();

    assert_eq!(
        transport.writes_to(ble.write_char_uuid),
        vec![b" 123456\r\n".to_vec()]
    );
}

#[tokio::test(start_paused = true)]
async fn test_deliver_code_sends_payload_verbatim() {
    let ble = BleConfig::default();
    let transport = locker();
    let store = MemoryStore::new();
    let mut session = session_with(LockerConfig::default(), &transport, &store);

    session.deliver_code(b"raw").await.unwrap();

    assert_eq!(transport.writes_to(ble.write_char_uuid), vec![b"raw".to_vec()]);
}

#[tokio::test(start_paused = true)]
async fn test_deliver_code_dwells_then_disconnects() {
    let transport = locker();
    let store = MemoryStore::new();
    let mut session = session_with(LockerConfig::default(), &transport, &store);

    let start = tokio::time::Instant::now();
    session.open_locker("123456").await.unwrap();

    assert!(start.elapsed() >= Duration::from_secs(1));
    assert_eq!(session.state(), SessionState::Disconnected);
    assert_eq!(transport.calls().last(), Some(&TransportCall::Disconnect));
}

#[tokio::test(start_paused = true)]
async fn test_deliver_code_leaves_store_untouched() {
    let transport = locker();
    let record = LockerAssignment::new("123456", "B2", Some(3));
    let store = MemoryStore::with_record(record.clone());
    let mut session = session_with(LockerConfig::default(), &transport, &store);

    session.open_locker("123456").await.unwrap();

    assert_eq!(store.save_count(), 0);
    assert_eq!(store.record(), Some(record));
    assert_eq!(session.code(), Some("123456"));
}

#[tokio::test(start_paused = true)]
async fn test_write_timeout_still_disconnects() {
    let ble = BleConfig::default();
    let transport = locker().with_write(ble.write_char_uuid, MockResponse::Hang);
    let store = MemoryStore::new();
    let mut session = session_with(LockerConfig::default(), &transport, &store);

    let err = session.open_locker("123456").await.unwrap_err();

    assert_eq!(err, LockerError::Timeout(ble.write_char_uuid));
    assert_eq!(session.state(), SessionState::Disconnected);
    assert!(!transport.is_connected());
}

#[tokio::test(start_paused = true)]
async fn test_write_failure_skips_dwell() {
    let ble = BleConfig::default();
    let transport = locker().with_write(ble.write_char_uuid, MockResponse::Fail("rejected".to_string()));
    let store = MemoryStore::new();
    let mut session = session_with(LockerConfig::default(), &transport, &store);

    let start = tokio::time::Instant::now();
    let err = session.deliver_code(b" 1\r\n").await.unwrap_err();

    assert!(matches!(
        err,
        LockerError::Gatt { source: TransportError::WriteFailed(_), .. }
    ));
    assert!(start.elapsed() < Duration::from_secs(1));
    assert_eq!(transport.calls().last(), Some(&TransportCall::Disconnect));
}

#[tokio::test(start_paused = true)]
async fn test_connect_failure_skips_write_and_disconnect() {
    let transport = MockTransport::new();
    let store = MemoryStore::new();
    let mut session = session_with(LockerConfig::default(), &transport, &store);

    let err = session.open_locker("123456").await.unwrap_err();

    assert_eq!(err, LockerError::DeviceNotFound);
    assert!(transport.calls().iter().all(|c| *c == TransportCall::Scan));
}

#[tokio::test(start_paused = true)]
async fn test_empty_code_never_touches_radio() {
    let transport = locker();
    let store = MemoryStore::new();
    let mut session = session_with(LockerConfig::default(), &transport, &store);

    let err = session.open_locker("   ").await.unwrap_err();

    assert_eq!(err, LockerError::InvalidCode);
    assert!(transport.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_serial_delivery_channel() {
    let ble = BleConfig::default().with_delivery(DeliveryChannel::Serial);
    let config = LockerConfig::default().with_ble(ble.clone());
    let transport = locker();
    let store = MemoryStore::new();
    let mut session = session_with(config, &transport, &store);

    session.open_locker("123456").await.unwrap();

    assert_eq!(
        transport.writes_to(ble.serial_char_uuid),
        vec![b" 123456\r\n".to_vec()]
    );
    assert!(transport.writes_to(ble.write_char_uuid).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_deliver_reuses_open_link() {
    let ble = BleConfig::default();
    let transport = MockTransport::new()
        .with_device("AA:BB:CC:DD:EE:FF", "SmartLocker-01")
        .with_read(ble.locker_code_uuid, MockResponse::Hang);
    let store = MemoryStore::new();
    let mut session = session_with(LockerConfig::default(), &transport, &store);

    // Leaves the link up
    session.request_locker().await.unwrap_err();
    session.open_locker("123456").await.unwrap();

    let connects = transport
        .calls()
        .iter()
        .filter(|c| matches!(c, TransportCall::Connect(_)))
        .count();
    assert_eq!(connects, 1);
    assert_eq!(session.state(), SessionState::Disconnected);
}
