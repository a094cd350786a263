// Locker configuration
//
// Stored as JSON at:
// - macOS: ~/Library/Application Support/smartlocker/config.json
// - Linux: ~/.config/smartlocker/config.json
// - Windows: %APPDATA%\smartlocker\config.json
// Every field has a default, so a partial or missing file is fine.

use crate::storage::{AssignmentStore, JsonFileStore, SledStore, StoreError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use uuid::{uuid, Uuid};

/// Errors from loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Could not determine the {0} directory")]
    NoHomeDirectory(&'static str),
}

// ============================================================================
// BLE CONFIG
// ============================================================================

/// Which characteristic receives a delivered code
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryChannel {
    /// The request/write characteristic
    #[default]
    Write,
    /// The serial TX characteristic
    Serial,
}

/// GATT layout of the locker peripheral
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BleConfig {
    pub service_uuid: Uuid,
    /// Request trigger (0xA4) and code delivery
    pub write_char_uuid: Uuid,
    /// Read+notify on the peripheral; only read is used
    pub locker_code_uuid: Uuid,
    pub door_char_uuid: Uuid,
    pub available_char_uuid: Uuid,
    pub serial_char_uuid: Uuid,
    /// Substring matched against advertised names
    pub device_name: String,
    pub delivery: DeliveryChannel,
}

impl Default for BleConfig {
    fn default() -> Self {
        Self {
            service_uuid: uuid!("567890AB-1234-1234-3412-341278563412"),
            write_char_uuid: uuid!("76543210-BA98-FEDC-1032-547698BADCFE"),
            locker_code_uuid: uuid!("DEADDEAD-4444-3333-2222-ADDEADDEADDE"),
            door_char_uuid: uuid!("7B8B8715-0627-40A4-8D58-09AD6C7972EB"),
            available_char_uuid: uuid!("D4C3B2A1-F6E5-2211-3344-556699887766"),
            serial_char_uuid: uuid!("44556677-3333-2222-1111-111177665544"),
            device_name: "SmartLocker".to_string(),
            delivery: DeliveryChannel::Write,
        }
    }
}

impl BleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device_name(mut self, name: &str) -> Self {
        self.device_name = name.to_string();
        self
    }

    pub fn with_delivery(mut self, delivery: DeliveryChannel) -> Self {
        self.delivery = delivery;
        self
    }

    /// Characteristic that receives framed codes
    pub fn delivery_char_uuid(&self) -> Uuid {
        match self.delivery {
            DeliveryChannel::Write => self.write_char_uuid,
            DeliveryChannel::Serial => self.serial_char_uuid,
        }
    }
}

// ============================================================================
// TIMING CONFIG
// ============================================================================

/// Protocol timeouts and dwell times
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Scan passes before giving up on discovery
    pub discovery_attempts: u32,
    /// Pause between scan passes
    pub discovery_delay_ms: u64,
    /// Length of one scan pass (real radios only)
    pub scan_window_ms: u64,
    pub connect_timeout_ms: u64,
    pub pair_timeout_ms: u64,
    /// Applies to each GATT read and write
    pub gatt_timeout_ms: u64,
    /// Wait after the request byte before the locker state is readable
    pub request_settle_ms: u64,
    /// Wait after delivering a code before disconnecting
    pub delivery_dwell_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            discovery_attempts: 3,
            discovery_delay_ms: 1_000,
            scan_window_ms: 5_000,
            connect_timeout_ms: 20_000,
            pair_timeout_ms: 10_000,
            gatt_timeout_ms: 10_000,
            request_settle_ms: 2_000,
            delivery_dwell_ms: 1_000,
        }
    }
}

impl TimingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_discovery_attempts(mut self, attempts: u32) -> Self {
        self.discovery_attempts = attempts;
        self
    }

    pub fn with_gatt_timeout_ms(mut self, ms: u64) -> Self {
        self.gatt_timeout_ms = ms;
        self
    }

    pub fn with_request_settle_ms(mut self, ms: u64) -> Self {
        self.request_settle_ms = ms;
        self
    }

    pub fn with_delivery_dwell_ms(mut self, ms: u64) -> Self {
        self.delivery_dwell_ms = ms;
        self
    }

    pub fn discovery_delay(&self) -> Duration {
        Duration::from_millis(self.discovery_delay_ms)
    }

    pub fn scan_window(&self) -> Duration {
        Duration::from_millis(self.scan_window_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn pair_timeout(&self) -> Duration {
        Duration::from_millis(self.pair_timeout_ms)
    }

    pub fn gatt_timeout(&self) -> Duration {
        Duration::from_millis(self.gatt_timeout_ms)
    }

    pub fn request_settle(&self) -> Duration {
        Duration::from_millis(self.request_settle_ms)
    }

    pub fn delivery_dwell(&self) -> Duration {
        Duration::from_millis(self.delivery_dwell_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.discovery_attempts == 0 {
            return Err(ConfigError::Invalid("discovery_attempts cannot be 0".to_string()));
        }
        if self.connect_timeout_ms == 0 || self.gatt_timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeouts must be non-zero".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// STORAGE CONFIG
// ============================================================================

/// Where the locker record lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StorageConfig {
    Json { path: PathBuf },
    Sled { path: PathBuf },
}

impl Default for StorageConfig {
    fn default() -> Self {
        let path = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("smartlocker")
            .join("locker_code.json");
        Self::Json { path }
    }
}

impl StorageConfig {
    pub fn path(&self) -> &Path {
        match self {
            Self::Json { path } | Self::Sled { path } => path,
        }
    }

    /// Open the configured backend
    pub fn open(&self) -> Result<Box<dyn AssignmentStore>, StoreError> {
        Ok(match self {
            Self::Json { path } => Box::new(JsonFileStore::new(path)),
            Self::Sled { path } => Box::new(SledStore::open(path)?),
        })
    }
}

// ============================================================================
// LOCKER CONFIG
// ============================================================================

/// Everything a locker session needs to know up front
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockerConfig {
    pub ble: BleConfig,
    pub timing: TimingConfig,
    pub storage: StorageConfig,
}

impl LockerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ble(mut self, ble: BleConfig) -> Self {
        self.ble = ble;
        self
    }

    pub fn with_timing(mut self, timing: TimingConfig) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_storage(mut self, storage: StorageConfig) -> Self {
        self.storage = storage;
        self
    }

    /// Default config file location
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Ok(dirs::config_dir()
            .ok_or(ConfigError::NoHomeDirectory("config"))?
            .join("smartlocker")
            .join("config.json"))
    }

    /// Load from `path`; a missing file yields the defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Write as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ble.device_name.is_empty() {
            return Err(ConfigError::Invalid("device_name cannot be empty".to_string()));
        }
        self.timing.validate()
    }
}
