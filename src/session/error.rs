// Locker session errors

use crate::transport::TransportError;
use thiserror::Error;
use uuid::Uuid;

/// Errors returned by locker session operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockerError {
    /// Discovery exhausted every attempt
    #[error("Device not found")]
    DeviceNotFound,

    #[error("Connect failed: {0}")]
    ConnectFailed(String),

    /// A single GATT read or write ran past its timeout
    #[error("Timed out on characteristic {0}")]
    Timeout(Uuid),

    #[error("GATT operation on {characteristic} failed: {source}")]
    Gatt {
        characteristic: Uuid,
        #[source]
        source: TransportError,
    },

    #[error("Code is empty")]
    InvalidCode,
}

impl LockerError {
    /// The locker could not be reached, or the link dropped mid-flow
    pub fn is_connection_error(&self) -> bool {
        match self {
            Self::DeviceNotFound | Self::ConnectFailed(_) => true,
            Self::Gatt { source, .. } => source.is_connection_error(),
            _ => false,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Map a transport failure during the connect phase
    pub(crate) fn from_connect(error: TransportError) -> Self {
        match error {
            TransportError::DeviceNotFound => Self::DeviceNotFound,
            TransportError::ConnectionFailed(reason) => Self::ConnectFailed(reason),
            other => Self::ConnectFailed(format!("BLE error: {other}")),
        }
    }

    /// Map a transport failure on a characteristic
    pub(crate) fn from_gatt(characteristic: Uuid, error: TransportError) -> Self {
        match error {
            TransportError::Timeout => Self::Timeout(characteristic),
            source => Self::Gatt {
                characteristic,
                source,
            },
        }
    }
}
