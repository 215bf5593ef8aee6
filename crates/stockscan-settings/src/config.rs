//! Configuration for StockScan
//!
//! Provides configuration file handling and validation. Supports JSON and
//! TOML file formats.
//!
//! Configuration is organized into logical sections:
//! - Server settings (catalog address, request timeout)
//! - Scanner settings (trigger key, throttle, guard and auto-submit timing)
//! - Focus session (last successful focus point)
//! - Barcode API settings (third-party product info lookup)

use crate::error::{SettingsError, SettingsResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use stockscan_core::constants::{
    DEFAULT_AUTO_SUBMIT_MS, DEFAULT_GUARD_MS, DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_SERVER_ADDRESS,
    DEFAULT_THROTTLE_MS, MAX_AUTO_SUBMIT_MS, MAX_THROTTLE_MS, MIN_AUTO_SUBMIT_MS,
    MIN_THROTTLE_MS,
};
use stockscan_core::{FocusSession, ValidationError};

/// Catalog server settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Base address, e.g. `http://10.0.2.2:5000/`
    pub address: String,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            address: DEFAULT_SERVER_ADDRESS.to_string(),
            timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

/// A physical key bound to "open scanner"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBinding {
    /// Platform key code
    pub code: u32,
    /// Human readable key name
    pub name: String,
}

impl KeyBinding {
    /// Create a binding; a blank name falls back to the code.
    pub fn new(code: u32, name: impl Into<String>) -> Self {
        let name = name.into();
        let name = if name.trim().is_empty() {
            format!("Key {}", code)
        } else {
            name.trim().to_string()
        };
        Self { code, name }
    }
}

impl std::fmt::Display for KeyBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.code)
    }
}

/// Scanner timing and trigger settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerSettings {
    /// Minimum gap between decode attempts (ms)
    pub throttle_ms: u64,
    /// How long a screen ignores scans after accepting one (ms)
    pub guard_ms: u64,
    /// Delay before a scan-completed form submits itself (ms)
    pub auto_submit_delay_ms: u64,
    /// Key that opens the scanner on the active screen
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_key: Option<KeyBinding>,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            throttle_ms: DEFAULT_THROTTLE_MS,
            guard_ms: DEFAULT_GUARD_MS,
            auto_submit_delay_ms: DEFAULT_AUTO_SUBMIT_MS,
            trigger_key: None,
        }
    }
}

/// Third-party barcode information service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BarcodeApiSettings {
    /// Look up product details when a new item's code is a barcode
    pub enabled: bool,
    /// App code sent as `Authorization: APPCODE <code>`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_code: Option<String>,
    /// Service endpoint
    pub endpoint: String,
}

impl Default for BarcodeApiSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            app_code: None,
            endpoint: "https://ali-barcode.showapi.com/barcode".to_string(),
        }
    }
}

/// Complete application configuration
///
/// Aggregates all settings sections and provides file I/O operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Catalog server settings
    pub server: ServerSettings,
    /// Scanner settings
    pub scanner: ScannerSettings,
    /// Last focus point
    pub focus: FocusSession,
    /// Barcode info service settings
    pub barcode_api: BarcodeApiSettings,
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| SettingsError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let config: Self = match Format::of(path)? {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match Format::of(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        std::fs::write(path, content).map_err(|source| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        validate_server_address(&self.server.address)
            .map_err(|e| SettingsError::invalid("server.address", e.to_string()))?;

        if self.server.timeout_ms == 0 {
            return Err(SettingsError::invalid(
                "server.timeout_ms",
                "must be greater than 0",
            ));
        }

        let scanner = &self.scanner;
        if !(MIN_THROTTLE_MS..=MAX_THROTTLE_MS).contains(&scanner.throttle_ms) {
            return Err(SettingsError::OutOfRange {
                key: "scanner.throttle_ms",
                value: scanner.throttle_ms,
                min: MIN_THROTTLE_MS,
                max: MAX_THROTTLE_MS,
            });
        }
        if scanner.guard_ms == 0 {
            return Err(SettingsError::invalid(
                "scanner.guard_ms",
                "must be greater than 0",
            ));
        }
        if !(MIN_AUTO_SUBMIT_MS..=MAX_AUTO_SUBMIT_MS).contains(&scanner.auto_submit_delay_ms) {
            return Err(SettingsError::OutOfRange {
                key: "scanner.auto_submit_delay_ms",
                value: scanner.auto_submit_delay_ms,
                min: MIN_AUTO_SUBMIT_MS,
                max: MAX_AUTO_SUBMIT_MS,
            });
        }

        let focus = &self.focus;
        if !(0.0..=1.0).contains(&focus.last_x) || !(0.0..=1.0).contains(&focus.last_y) {
            return Err(SettingsError::invalid(
                "focus",
                "focus point must be inside the viewport",
            ));
        }

        if self.barcode_api.enabled && self.barcode_api.endpoint.trim().is_empty() {
            return Err(SettingsError::invalid(
                "barcode_api.endpoint",
                "required when the barcode API is enabled",
            ));
        }

        Ok(())
    }
}

enum Format {
    Json,
    Toml,
}

impl Format {
    fn of(path: &Path) -> SettingsResult<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Format::Json),
            Some("toml") => Ok(Format::Toml),
            _ => Err(SettingsError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// Check a catalog server address
///
/// Must be non-empty, use `http://` or `https://`, and end with `/` so
/// relative API paths join onto it.
pub fn validate_server_address(address: &str) -> Result<(), ValidationError> {
    let trimmed = address.trim();
    let scheme_ok = trimmed.starts_with("http://") || trimmed.starts_with("https://");
    let has_host = trimmed
        .split_once("://")
        .is_some_and(|(_, rest)| !rest.trim_end_matches('/').is_empty());
    if trimmed.is_empty() || !scheme_ok || !has_host || !trimmed.ends_with('/') {
        return Err(ValidationError::InvalidServerAddress {
            address: address.to_string(),
        });
    }
    Ok(())
}
