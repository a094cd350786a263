// Mock Transport
// Scripted in-process locker peripheral that records every call

use crate::transport::{ConnectionHandle, DiscoveredDevice, LockerTransport, TransportError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use uuid::Uuid;

/// One call observed by the mock, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Scan,
    Connect(String),
    Pair,
    Read(Uuid),
    Write(Uuid, Vec<u8>),
    Disconnect,
}

impl TransportCall {
    /// Reads and writes only
    pub fn is_gatt(&self) -> bool {
        matches!(self, Self::Read(_) | Self::Write(..))
    }
}

/// Scripted behaviour for a characteristic
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Succeed (reads return the bytes, writes ignore them)
    Value(Vec<u8>),
    /// Never answer; the caller's timeout fires
    Hang,
    /// Fail immediately with a non-timeout error
    Fail(String),
}

#[derive(Debug, Default)]
struct MockState {
    devices: Vec<DiscoveredDevice>,
    hidden_scans: usize,
    scans: usize,
    reads: HashMap<Uuid, MockResponse>,
    writes: HashMap<Uuid, MockResponse>,
    connect_error: Option<TransportError>,
    pair_error: Option<TransportError>,
    fail_disconnect: bool,
    connected: Option<String>,
    calls: Vec<TransportCall>,
}

/// Mock implementation of LockerTransport for tests and demos.
///
/// Clones share state, so a test can keep one copy for assertions while the
/// session owns the other.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create a mock with no devices in range
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Put a device in range
    pub fn with_device(self, id: &str, name: &str) -> Self {
        self.lock().devices.push(DiscoveredDevice::new(id, Some(name)));
        self
    }

    /// Devices stay invisible for the first `scans` passes
    pub fn with_hidden_scans(self, scans: usize) -> Self {
        self.lock().hidden_scans = scans;
        self
    }

    /// Script a characteristic read
    pub fn with_read(self, characteristic: Uuid, response: MockResponse) -> Self {
        self.lock().reads.insert(characteristic, response);
        self
    }

    /// Shorthand for a successful read
    pub fn with_value(self, characteristic: Uuid, value: &[u8]) -> Self {
        self.with_read(characteristic, MockResponse::Value(value.to_vec()))
    }

    /// Script a characteristic write (writes succeed by default)
    pub fn with_write(self, characteristic: Uuid, response: MockResponse) -> Self {
        self.lock().writes.insert(characteristic, response);
        self
    }

    /// Make every connect attempt fail
    pub fn with_connect_error(self, error: TransportError) -> Self {
        self.lock().connect_error = Some(error);
        self
    }

    /// Make pairing fail instead of succeeding
    pub fn with_pair_error(self, error: TransportError) -> Self {
        self.lock().pair_error = Some(error);
        self
    }

    /// Make disconnect report an error
    pub fn with_failing_disconnect(self) -> Self {
        self.lock().fail_disconnect = true;
        self
    }

    /// Simulate the peripheral dropping the link on its side
    pub fn drop_link(&self) {
        self.lock().connected = None;
    }

    /// Every call so far, in order
    pub fn calls(&self) -> Vec<TransportCall> {
        self.lock().calls.clone()
    }

    /// Payloads written to `characteristic`, in order
    pub fn writes_to(&self, characteristic: Uuid) -> Vec<Vec<u8>> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                TransportCall::Write(uuid, data) if *uuid == characteristic => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of scan passes run
    pub fn scan_count(&self) -> usize {
        self.lock().scans
    }

    /// Whether the mock currently holds a link
    pub fn is_connected(&self) -> bool {
        self.lock().connected.is_some()
    }

    fn check_link(state: &MockState, connection: &ConnectionHandle) -> Result<(), TransportError> {
        match &state.connected {
            Some(id) if id == connection.device_id() => Ok(()),
            _ => Err(TransportError::NotConnected),
        }
    }

    async fn respond(response: Option<MockResponse>, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        match response {
            Some(MockResponse::Value(bytes)) => Ok(bytes),
            Some(MockResponse::Hang) => {
                tokio::time::timeout(timeout, std::future::pending::<()>()).await?;
                Err(TransportError::Timeout)
            }
            Some(MockResponse::Fail(reason)) => Err(TransportError::Backend(reason)),
            None => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl LockerTransport for MockTransport {
    async fn scan(&mut self) -> Result<Vec<DiscoveredDevice>, TransportError> {
        let mut state = self.lock();
        state.calls.push(TransportCall::Scan);
        state.scans += 1;
        if state.scans <= state.hidden_scans {
            return Ok(Vec::new());
        }
        Ok(state.devices.clone())
    }

    async fn connect(
        &mut self,
        device: &DiscoveredDevice,
        _timeout: Duration,
    ) -> Result<ConnectionHandle, TransportError> {
        let mut state = self.lock();
        state.calls.push(TransportCall::Connect(device.id().to_string()));
        if let Some(error) = state.connect_error.clone() {
            return Err(error);
        }
        state.connected = Some(device.id().to_string());
        Ok(ConnectionHandle::new(device.id()))
    }

    async fn pair(
        &mut self,
        connection: &ConnectionHandle,
        _timeout: Duration,
    ) -> Result<(), TransportError> {
        let mut state = self.lock();
        state.calls.push(TransportCall::Pair);
        Self::check_link(&state, connection)?;
        match state.pair_error.clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn read(
        &mut self,
        connection: &ConnectionHandle,
        characteristic: Uuid,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        let response = {
            let mut state = self.lock();
            state.calls.push(TransportCall::Read(characteristic));
            Self::check_link(&state, connection)?;
            state.reads.get(&characteristic).cloned()
        };
        let value = Self::respond(response, timeout).await;
        value.map_err(|e| match e {
            TransportError::Backend(reason) => TransportError::ReadFailed(reason),
            other => other,
        })
    }

    async fn write(
        &mut self,
        connection: &ConnectionHandle,
        characteristic: Uuid,
        data: &[u8],
        timeout: Duration,
    ) -> Result<(), TransportError> {
        let response = {
            let mut state = self.lock();
            state.calls.push(TransportCall::Write(characteristic, data.to_vec()));
            Self::check_link(&state, connection)?;
            state.writes.get(&characteristic).cloned()
        };
        Self::respond(response, timeout)
            .await
            .map(|_| ())
            .map_err(|e| match e {
                TransportError::Backend(reason) => TransportError::WriteFailed(reason),
                other => other,
            })
    }

    async fn disconnect(&mut self, _connection: &ConnectionHandle) -> Result<(), TransportError> {
        let mut state = self.lock();
        state.calls.push(TransportCall::Disconnect);
        state.connected = None;
        if state.fail_disconnect {
            return Err(TransportError::Backend("link already dropped".to_string()));
        }
        Ok(())
    }
}
