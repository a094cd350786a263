// Config module - SETTINGS
// GATT layout, protocol timing and storage location

mod settings;

pub use settings::{
    BleConfig, ConfigError, DeliveryChannel, LockerConfig, StorageConfig, TimingConfig,
};
