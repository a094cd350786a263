// smartlocker - BLE client for smart-locker banks
//
// Requests a locker, reads back its code, door and the free-locker count,
// and later replays the code to reopen the door.

pub mod config;
pub mod observer;
pub mod session;
pub mod storage;
pub mod transport;

pub use config::{BleConfig, LockerConfig};
pub use session::{LockerError, LockerSession, SessionState};
pub use storage::LockerAssignment;
