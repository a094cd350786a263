// Transport module - THE RADIO (abstract)
// BLE central abstraction plus the scripted mock and the btleplug backend

mod traits;
mod mock;
#[cfg(feature = "bluetooth")]
mod btle;

pub use traits::{
    // Core trait
    LockerTransport,
    // Handles
    ConnectionHandle, DiscoveredDevice,
    // Errors
    TransportError,
};

pub use mock::{MockResponse, MockTransport, TransportCall};

#[cfg(feature = "bluetooth")]
pub use btle::BtleplugTransport;
