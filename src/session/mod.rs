// Session module - THE PROTOCOL
// Connection lifecycle and the request-locker / deliver-code flows

mod error;
mod machine;
pub mod protocol;
mod state;

pub use error::LockerError;
pub use machine::LockerSession;
pub use protocol::{frame_code, REQUEST_LOCKER};
pub use state::SessionState;
