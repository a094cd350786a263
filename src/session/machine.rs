// LockerSession - the BLE protocol state machine
//
// Owns the transport link, the durable record and the observer table.
// Two flows run on top of one connect sub-procedure:
// - request_locker: 0xA4 -> settle -> read code, door, available -> persist
// - deliver_code:   payload -> dwell -> disconnect

use super::protocol::{self, REQUEST_LOCKER};
use super::{LockerError, SessionState};
use crate::config::LockerConfig;
use crate::observer::{ObserverRegistry, Signal, SignalKind};
use crate::storage::{AssignmentStore, LockerAssignment};
use crate::transport::{ConnectionHandle, DiscoveredDevice, LockerTransport, TransportError};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Client session for one locker bank
pub struct LockerSession<T, S> {
    config: LockerConfig,
    transport: T,
    store: S,
    observers: ObserverRegistry,
    assignment: LockerAssignment,
    state: SessionState,
    device: Option<DiscoveredDevice>,
    connection: Option<ConnectionHandle>,
}

impl<T: LockerTransport, S: AssignmentStore> LockerSession<T, S> {
    /// Create a session, restoring the last stored assignment
    pub fn new(config: LockerConfig, transport: T, store: S) -> Self {
        let assignment = store.load();
        let mut observers = ObserverRegistry::new();
        if let Some(code) = &assignment.code {
            observers.seed(Signal::Code(code.clone()));
        }
        if let Some(door) = &assignment.door {
            observers.seed(Signal::Door(door.clone()));
        }
        observers.seed(Signal::Available(assignment.available));

        Self {
            config,
            transport,
            store,
            observers,
            assignment,
            state: SessionState::Disconnected,
            device: None,
            connection: None,
        }
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn config(&self) -> &LockerConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Last known locker code
    pub fn code(&self) -> Option<&str> {
        self.assignment.code.as_deref()
    }

    /// Last known door
    pub fn door(&self) -> Option<&str> {
        self.assignment.door.as_deref()
    }

    /// Last known free-locker count
    pub fn available(&self) -> Option<i64> {
        self.assignment.available
    }

    pub fn assignment(&self) -> &LockerAssignment {
        &self.assignment
    }

    /// Device found by the most recent discovery
    pub fn device(&self) -> Option<&DiscoveredDevice> {
        self.device.as_ref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // ========================================================================
    // OBSERVERS
    // ========================================================================

    /// Called with every new code, and right away if one is known
    pub fn register_code_callback<F>(&mut self, mut callback: F)
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.observers.register(
            SignalKind::Code,
            Box::new(move |signal| {
                if let Signal::Code(code) = signal {
                    callback(code);
                }
            }),
        );
    }

    /// Called with every new door, and right away if one is known
    pub fn register_door_callback<F>(&mut self, mut callback: F)
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.observers.register(
            SignalKind::Door,
            Box::new(move |signal| {
                if let Signal::Door(door) = signal {
                    callback(door);
                }
            }),
        );
    }

    /// Called after every locker request (`None` when the count was
    /// unreadable), and right away if a count is known
    pub fn register_available_callback<F>(&mut self, mut callback: F)
    where
        F: FnMut(Option<i64>) + Send + 'static,
    {
        self.observers.register(
            SignalKind::Available,
            Box::new(move |signal| {
                if let Signal::Available(count) = signal {
                    callback(*count);
                }
            }),
        );
    }

    // ========================================================================
    // FLOWS
    // ========================================================================

    /// Ask the locker bank for a locker and return its code.
    ///
    /// A failed read or write reports nothing. A timeout leaves the link up,
    /// a lost link is dropped. Only a complete flow updates observers and the
    /// store, then disconnects.
    pub async fn request_locker(&mut self) -> Result<String, LockerError> {
        self.connect().await?;

        let ble = self.config.ble.clone();
        self.write_char(ble.write_char_uuid, &[REQUEST_LOCKER]).await?;

        // The locker needs this long before its state is readable
        tokio::time::sleep(self.config.timing.request_settle()).await;

        let code = protocol::decode_text(&self.read_char(ble.locker_code_uuid).await?);
        info!(%code, "locker code read");

        let door = protocol::decode_text(&self.read_char(ble.door_char_uuid).await?);
        info!(%door, "door read");

        let raw = self.read_char(ble.available_char_uuid).await?;
        let available = protocol::parse_available(&raw);
        match available {
            Some(count) => info!(count, "available read"),
            None => warn!(raw = %hex::encode(&raw), "available count unparseable, storing unknown"),
        }

        self.assignment = LockerAssignment {
            code: Some(code.clone()),
            door: Some(door.clone()),
            available,
        };
        self.observers.notify(Signal::Code(code.clone()));
        self.observers.notify(Signal::Door(door));
        self.observers.notify(Signal::Available(available));

        self.store.save(&self.assignment);
        self.disconnect().await;
        Ok(code)
    }

    /// Write a pre-framed payload to the delivery characteristic, dwell,
    /// then disconnect. The store is left alone.
    pub async fn deliver_code(&mut self, payload: &[u8]) -> Result<(), LockerError> {
        self.connect().await?;

        let target = self.config.ble.delivery_char_uuid();
        let result = self.write_char(target, payload).await;
        if result.is_ok() {
            tokio::time::sleep(self.config.timing.delivery_dwell()).await;
        }

        self.disconnect().await;
        result
    }

    /// Frame a human-entered code and deliver it
    pub async fn open_locker(&mut self, code: &str) -> Result<(), LockerError> {
        let payload = protocol::frame_code(code)?;
        self.deliver_code(&payload).await
    }

    /// Drop the cached code (after the items were collected) and persist
    pub fn forget_code(&mut self) {
        if self.assignment.code.take().is_some() {
            self.observers.forget(SignalKind::Code);
            self.store.save(&self.assignment);
            info!("locker code cleared");
        }
    }

    // ========================================================================
    // CONNECTION LIFECYCLE
    // ========================================================================

    /// Discover, connect and try to pair. No-op when already connected.
    pub async fn connect(&mut self) -> Result<(), LockerError> {
        if self.state.is_connected() && self.connection.is_some() {
            return Ok(());
        }
        self.transition(SessionState::Connecting);

        match self.establish().await {
            Ok(connection) => {
                self.connection = Some(connection);
                self.transition(SessionState::Connected);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "connect failed");
                self.transition(SessionState::Disconnected);
                Err(e)
            }
        }
    }

    async fn establish(&mut self) -> Result<ConnectionHandle, LockerError> {
        let timing = self.config.timing.clone();
        let device = self
            .transport
            .discover(
                &self.config.ble.device_name,
                timing.discovery_attempts,
                timing.discovery_delay(),
            )
            .await
            .map_err(LockerError::from_connect)?;
        self.device = Some(device.clone());

        let connection = self
            .transport
            .connect(&device, timing.connect_timeout())
            .await
            .map_err(LockerError::from_connect)?;
        info!(%device, "connected");

        match self.transport.pair(&connection, timing.pair_timeout()).await {
            Ok(()) => info!("paired"),
            Err(e) => warn!(error = %e, "pair skipped"),
        }
        Ok(connection)
    }

    /// Best-effort teardown; always ends Disconnected
    pub async fn disconnect(&mut self) {
        if let Some(connection) = self.connection.take() {
            match self.transport.disconnect(&connection).await {
                Ok(()) => info!("disconnected"),
                Err(e) => debug!(error = %e, "disconnect error ignored"),
            }
        }
        if self.state != SessionState::Disconnected {
            self.transition(SessionState::Disconnected);
        }
    }

    fn transition(&mut self, next: SessionState) {
        // A dropped flow can leave Connecting behind; the next connect restarts it
        if !self.state.can_transition_to(next) {
            warn!(from = %self.state, to = %next, "unexpected session transition");
        } else {
            debug!(from = %self.state, to = %next, "session state");
        }
        self.state = next;
    }

    // ========================================================================
    // GATT STEPS
    // ========================================================================

    async fn write_char(&mut self, characteristic: Uuid, data: &[u8]) -> Result<(), LockerError> {
        let timeout = self.config.timing.gatt_timeout();
        let connection = self
            .connection
            .as_ref()
            .ok_or_else(|| LockerError::from_gatt(characteristic, TransportError::NotConnected))?;
        let result = self.transport.write(connection, characteristic, data, timeout).await;
        match result {
            Ok(()) => {
                info!(data = %hex::encode(data), %characteristic, "wrote");
                Ok(())
            }
            Err(e) => Err(self.gatt_failure(characteristic, e)),
        }
    }

    async fn read_char(&mut self, characteristic: Uuid) -> Result<Vec<u8>, LockerError> {
        let timeout = self.config.timing.gatt_timeout();
        let connection = self
            .connection
            .as_ref()
            .ok_or_else(|| LockerError::from_gatt(characteristic, TransportError::NotConnected))?;
        let result = self.transport.read(connection, characteristic, timeout).await;
        result.map_err(|e| self.gatt_failure(characteristic, e))
    }

    /// A lost link is dropped so the next flow rediscovers; a timeout keeps it
    fn gatt_failure(&mut self, characteristic: Uuid, error: TransportError) -> LockerError {
        if error.is_connection_error() && self.connection.take().is_some() {
            warn!(error = %error, %characteristic, "link lost, dropping connection");
            self.transition(SessionState::Disconnected);
        }
        LockerError::from_gatt(characteristic, error)
    }
}
