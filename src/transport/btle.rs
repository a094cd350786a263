// btleplug Transport
// Real BLE central backed by the platform Bluetooth stack

use crate::transport::{ConnectionHandle, DiscoveredDevice, LockerTransport, TransportError};
use async_trait::async_trait;
use btleplug::api::{Central, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType};
use btleplug::platform::{Adapter, Manager, Peripheral};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info};
use uuid::Uuid;

impl From<btleplug::Error> for TransportError {
    fn from(e: btleplug::Error) -> Self {
        match e {
            btleplug::Error::NotConnected => Self::NotConnected,
            btleplug::Error::TimedOut(_) => Self::Timeout,
            btleplug::Error::DeviceNotFound => Self::DeviceNotFound,
            other => Self::Backend(other.to_string()),
        }
    }
}

/// Run `teardown` when `linked` failed, ignoring its outcome. The teardown
/// future is never polled on success.
async fn release_on_error<F, E>(linked: Result<(), TransportError>, teardown: F) -> Result<(), TransportError>
where
    F: Future<Output = Result<(), E>>,
    E: std::fmt::Display,
{
    if linked.is_err() {
        if let Err(e) = teardown.await {
            debug!(error = %e, "disconnect after failed connect ignored");
        }
    }
    linked
}

/// BLE transport on the first adapter reported by the OS
pub struct BtleplugTransport {
    adapter: Adapter,
    scan_window: Duration,
    peripherals: HashMap<String, Peripheral>,
}

impl BtleplugTransport {
    /// Open the first available Bluetooth adapter
    pub async fn new(scan_window: Duration) -> Result<Self, TransportError> {
        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or(TransportError::HardwareUnavailable)?;
        info!(adapter = %adapter.adapter_info().await.unwrap_or_default(), "bluetooth adapter ready");

        Ok(Self {
            adapter,
            scan_window,
            peripherals: HashMap::new(),
        })
    }

    fn peripheral(&self, device_id: &str) -> Result<&Peripheral, TransportError> {
        self.peripherals
            .get(device_id)
            .ok_or(TransportError::NotConnected)
    }

    fn characteristic(peripheral: &Peripheral, uuid: Uuid) -> Result<Characteristic, TransportError> {
        peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == uuid)
            .ok_or(TransportError::CharacteristicNotFound(uuid))
    }

    async fn finish_connect(peripheral: &Peripheral, limit: Duration) -> Result<(), TransportError> {
        if !peripheral.is_connected().await? {
            return Err(TransportError::ConnectionFailed("Connect failed".to_string()));
        }
        timeout(limit, peripheral.discover_services())
            .await
            .map_err(|_| TransportError::ConnectionFailed("service discovery timed out".to_string()))?
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))
    }
}

#[async_trait]
impl LockerTransport for BtleplugTransport {
    async fn scan(&mut self) -> Result<Vec<DiscoveredDevice>, TransportError> {
        self.adapter.start_scan(ScanFilter::default()).await?;
        tokio::time::sleep(self.scan_window).await;
        self.adapter.stop_scan().await?;

        let mut devices = Vec::new();
        for peripheral in self.adapter.peripherals().await? {
            let properties = peripheral.properties().await?;
            let id = format!("{:?}", peripheral.id());
            let name = properties.as_ref().and_then(|p| p.local_name.clone());
            let mut device = DiscoveredDevice::new(&id, name.as_deref());
            if let Some(rssi) = properties.and_then(|p| p.rssi) {
                device = device.with_rssi(rssi);
            }
            self.peripherals.insert(id, peripheral);
            devices.push(device);
        }
        debug!(count = devices.len(), "scan pass finished");
        Ok(devices)
    }

    async fn connect(
        &mut self,
        device: &DiscoveredDevice,
        connect_timeout: Duration,
    ) -> Result<ConnectionHandle, TransportError> {
        let peripheral = self
            .peripherals
            .get(device.id())
            .ok_or(TransportError::DeviceNotFound)?;

        let linked = match timeout(connect_timeout, peripheral.connect()).await {
            Ok(Ok(())) => Self::finish_connect(peripheral, connect_timeout).await,
            Ok(Err(e)) => Err(TransportError::ConnectionFailed(e.to_string())),
            Err(_) => Err(TransportError::ConnectionFailed("connect timed out".to_string())),
        };

        // The stack may have linked up even when we gave up on it
        release_on_error(linked, peripheral.disconnect()).await?;

        Ok(ConnectionHandle::new(device.id()))
    }

    async fn read(
        &mut self,
        connection: &ConnectionHandle,
        characteristic: Uuid,
        read_timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        let peripheral = self.peripheral(connection.device_id())?;
        let characteristic = Self::characteristic(peripheral, characteristic)?;
        timeout(read_timeout, peripheral.read(&characteristic))
            .await?
            .map_err(|e| TransportError::ReadFailed(e.to_string()))
    }

    async fn write(
        &mut self,
        connection: &ConnectionHandle,
        characteristic: Uuid,
        data: &[u8],
        write_timeout: Duration,
    ) -> Result<(), TransportError> {
        let peripheral = self.peripheral(connection.device_id())?;
        let characteristic = Self::characteristic(peripheral, characteristic)?;
        timeout(
            write_timeout,
            peripheral.write(&characteristic, data, WriteType::WithResponse),
        )
        .await?
        .map_err(|e| TransportError::WriteFailed(e.to_string()))
    }

    async fn disconnect(&mut self, connection: &ConnectionHandle) -> Result<(), TransportError> {
        let peripheral = self.peripheral(connection.device_id())?;
        peripheral.disconnect().await?;
        Ok(())
    }
}
