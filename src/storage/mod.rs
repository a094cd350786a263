// Storage module - PERSISTENCE
// Durable record of the last locker assignment

mod record;
mod store;

pub use record::LockerAssignment;
pub use store::{AssignmentStore, JsonFileStore, MemoryStore, SledStore, StoreError};
