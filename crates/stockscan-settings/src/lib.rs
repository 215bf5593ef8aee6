//! StockScan Settings Crate
//!
//! Handles application configuration, the synchronous settings store used by
//! the scanner and workflows, and config file location.

pub mod config;
pub mod error;
pub mod manager;
pub mod store;

pub use config::{
    validate_server_address, BarcodeApiSettings, Config, KeyBinding, ScannerSettings,
    ServerSettings,
};
pub use error::{SettingsError, SettingsResult};
pub use manager::SettingsManager;
pub use store::{SettingsProvider, SettingsStore};
