// Observer module - CALLBACKS
// Single-subscriber-per-signal delivery of code, door and availability

mod registry;

pub use registry::{Callback, ObserverRegistry, Signal, SignalKind};
