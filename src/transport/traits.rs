// Transport Traits and Core Types
// Defines the abstract BLE transport the locker session drives

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// DEVICE AND CONNECTION HANDLES
// ============================================================================

/// A BLE peripheral seen during a scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredDevice {
    id: String,
    name: Option<String>,
    rssi: Option<i16>,
}

impl DiscoveredDevice {
    pub fn new(id: &str, name: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            name: name.map(str::to_string),
            rssi: None,
        }
    }

    pub fn with_rssi(mut self, rssi: i16) -> Self {
        self.rssi = Some(rssi);
        self
    }

    /// Backend-specific identifier (MAC address or platform UUID)
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Advertised local name, if any
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn rssi(&self) -> Option<i16> {
        self.rssi
    }

    /// True when the advertised name contains `needle`
    pub fn name_contains(&self, needle: &str) -> bool {
        self.name.as_deref().is_some_and(|name| name.contains(needle))
    }
}

impl fmt::Display for DiscoveredDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} ({})", name, self.id),
            None => write!(f, "{}", self.id),
        }
    }
}

/// Handle to an established link. Owned by exactly one session.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ConnectionHandle {
    device_id: String,
}

impl ConnectionHandle {
    pub fn new(device_id: &str) -> Self {
        Self {
            device_id: device_id.to_string(),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }
}

// ============================================================================
// TRANSPORT ERRORS
// ============================================================================

/// Errors surfaced by a BLE transport
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Device not found")]
    DeviceNotFound,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Operation timed out")]
    Timeout,

    #[error("Not connected")]
    NotConnected,

    #[error("Characteristic not found: {0}")]
    CharacteristicNotFound(Uuid),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("Bluetooth adapter unavailable")]
    HardwareUnavailable,

    #[error("Backend error: {0}")]
    Backend(String),
}

impl TransportError {
    /// Check if this is a connection-related error
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::DeviceNotFound
                | Self::ConnectionFailed(_)
                | Self::NotConnected
                | Self::HardwareUnavailable
        )
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

impl From<tokio::time::error::Elapsed> for TransportError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Self::Timeout
    }
}

// ============================================================================
// TRANSPORT TRAIT
// ============================================================================

/// Abstract BLE central used by the locker session.
///
/// Implementations own whatever platform objects back a [`ConnectionHandle`];
/// every GATT call carries its own timeout and reports expiry as
/// [`TransportError::Timeout`].
#[async_trait]
pub trait LockerTransport: Send {
    /// Run one scan pass and return everything seen
    async fn scan(&mut self) -> Result<Vec<DiscoveredDevice>, TransportError>;

    /// Establish a link to a previously discovered device
    async fn connect(
        &mut self,
        device: &DiscoveredDevice,
        timeout: Duration,
    ) -> Result<ConnectionHandle, TransportError>;

    /// Bond with the peer. Backends without pairing support keep the default.
    async fn pair(
        &mut self,
        _connection: &ConnectionHandle,
        _timeout: Duration,
    ) -> Result<(), TransportError> {
        Err(TransportError::Unsupported("pairing"))
    }

    /// Read a characteristic value
    async fn read(
        &mut self,
        connection: &ConnectionHandle,
        characteristic: Uuid,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError>;

    /// Write a characteristic value (with response)
    async fn write(
        &mut self,
        connection: &ConnectionHandle,
        characteristic: Uuid,
        data: &[u8],
        timeout: Duration,
    ) -> Result<(), TransportError>;

    /// Tear down the link
    async fn disconnect(&mut self, connection: &ConnectionHandle) -> Result<(), TransportError>;

    /// Scan up to `attempts` times until a device whose name contains
    /// `name_substring` shows up, sleeping `delay` between passes.
    async fn discover(
        &mut self,
        name_substring: &str,
        attempts: u32,
        delay: Duration,
    ) -> Result<DiscoveredDevice, TransportError> {
        for attempt in 1..=attempts {
            let devices = self.scan().await?;
            if let Some(device) = devices.into_iter().find(|d| d.name_contains(name_substring)) {
                tracing::debug!(%device, attempt, "device discovered");
                return Ok(device);
            }
            tracing::debug!(attempt, attempts, name_substring, "device not seen yet");
            if attempt < attempts {
                tokio::time::sleep(delay).await;
            }
        }
        Err(TransportError::DeviceNotFound)
    }
}
