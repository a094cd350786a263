// Observer Registry - one callback slot per signal
//
// Late-join semantics: a callback registered after a value is known gets
// that value immediately, on the registering call.

use std::collections::HashMap;
use std::fmt;

/// The three values a locker session publishes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SignalKind {
    Code,
    Door,
    Available,
}

/// A published value
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Signal {
    Code(String),
    Door(String),
    /// `None` means the locker reported something unparseable
    Available(Option<i64>),
}

impl Signal {
    pub fn kind(&self) -> SignalKind {
        match self {
            Self::Code(_) => SignalKind::Code,
            Self::Door(_) => SignalKind::Door,
            Self::Available(_) => SignalKind::Available,
        }
    }

    /// Unknown availability is delivered live but never replayed
    fn is_known(&self) -> bool {
        !matches!(self, Self::Available(None))
    }
}

/// Boxed observer callback
pub type Callback = Box<dyn FnMut(&Signal) + Send>;

/// Dispatch table keyed by [`SignalKind`]
#[derive(Default)]
pub struct ObserverRegistry {
    slots: HashMap<SignalKind, Callback>,
    latest: HashMap<SignalKind, Signal>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value as last known without calling anyone (startup restore)
    pub fn seed(&mut self, signal: Signal) {
        if signal.is_known() {
            self.latest.insert(signal.kind(), signal);
        }
    }

    /// Install `callback` for `kind`, replacing any previous one, and replay
    /// the last known value to it.
    pub fn register(&mut self, kind: SignalKind, mut callback: Callback) {
        if let Some(current) = self.latest.get(&kind) {
            callback(current);
        }
        self.slots.insert(kind, callback);
    }

    /// Drop the callback for `kind`
    pub fn unregister(&mut self, kind: SignalKind) -> bool {
        self.slots.remove(&kind).is_some()
    }

    /// Publish a new value
    pub fn notify(&mut self, signal: Signal) {
        let kind = signal.kind();
        if let Some(callback) = self.slots.get_mut(&kind) {
            callback(&signal);
        }
        if signal.is_known() {
            self.latest.insert(kind, signal);
        } else {
            self.latest.remove(&kind);
        }
    }

    /// Forget the last known value so it is no longer replayed
    pub fn forget(&mut self, kind: SignalKind) {
        self.latest.remove(&kind);
    }

    /// Last known value for `kind`
    pub fn latest(&self, kind: SignalKind) -> Option<&Signal> {
        self.latest.get(&kind)
    }

    pub fn is_registered(&self, kind: SignalKind) -> bool {
        self.slots.contains_key(&kind)
    }
}

impl fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("slots", &self.slots.keys().collect::<Vec<_>>())
            .field("latest", &self.latest)
            .finish()
    }
}
