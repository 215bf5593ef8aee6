//! Settings store
//!
//! Synchronous get/set access to persisted preferences. The scanner writes
//! the focus session from the camera thread, so every accessor is cheap and
//! lock-protected; writes go straight to disk when the store is file-backed.

use crate::config::{validate_server_address, Config, KeyBinding, ScannerSettings};
use crate::error::{SettingsError, SettingsResult};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use stockscan_core::FocusSession;

/// Preferences the scanner and workflows read and write.
pub trait SettingsProvider: Send + Sync {
    /// Catalog base address
    fn server_address(&self) -> String;

    /// Change the catalog base address; rejects malformed addresses
    fn set_server_address(&self, address: &str) -> SettingsResult<()>;

    /// Key bound to "open scanner", if any
    fn trigger_key(&self) -> Option<KeyBinding>;

    /// Bind the "open scanner" key
    fn bind_trigger_key(&self, binding: KeyBinding) -> SettingsResult<()>;

    /// Remove the "open scanner" binding
    fn clear_trigger_key(&self) -> SettingsResult<()>;

    /// Last saved focus point
    fn focus_session(&self) -> FocusSession;

    /// Persist a focus point
    fn save_focus_session(&self, session: FocusSession) -> SettingsResult<()>;

    /// App code for the barcode info service
    fn barcode_app_code(&self) -> Option<String>;

    /// Store the app code for the barcode info service
    fn set_barcode_app_code(&self, app_code: &str) -> SettingsResult<()>;

    /// Whether new items should be prefilled from the barcode info service
    fn api_lookup_enabled(&self) -> bool;

    /// Scanner timing settings
    fn scanner(&self) -> ScannerSettings;
}

/// [`SettingsProvider`] backed by a [`Config`], optionally saved to a file.
#[derive(Debug)]
pub struct SettingsStore {
    config: RwLock<Config>,
    path: Option<PathBuf>,
}

impl SettingsStore {
    /// Store that lives only in memory
    pub fn in_memory(config: Config) -> Self {
        Self {
            config: RwLock::new(config),
            path: None,
        }
    }

    /// Open a file-backed store
    ///
    /// A missing file yields defaults; the file is created on the first
    /// change.
    pub fn open(path: impl Into<PathBuf>) -> SettingsResult<Self> {
        let path = path.into();
        let config = if path.exists() {
            Config::load_from_file(&path)?
        } else {
            tracing::info!("No settings at {}, using defaults", path.display());
            Config::default()
        };
        Ok(Self {
            config: RwLock::new(config),
            path: Some(path),
        })
    }

    /// Backing file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Copy of the current configuration
    pub fn snapshot(&self) -> Config {
        self.config.read().clone()
    }

    /// Apply a change, validate it, persist it, then make it visible.
    ///
    /// Nothing changes if validation or the write fails.
    pub fn update<F>(&self, change: F) -> SettingsResult<()>
    where
        F: FnOnce(&mut Config),
    {
        let mut config = self.config.write();
        let mut next = config.clone();
        change(&mut next);
        next.validate()?;
        if let Some(path) = &self.path {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|source| {
                        SettingsError::CreateDir {
                            path: parent.to_path_buf(),
                            source,
                        }
                    })?;
                }
            }
            next.save_to_file(path)?;
        }
        *config = next;
        Ok(())
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::in_memory(Config::default())
    }
}

impl SettingsProvider for SettingsStore {
    fn server_address(&self) -> String {
        self.config.read().server.address.clone()
    }

    fn set_server_address(&self, address: &str) -> SettingsResult<()> {
        let address = address.trim();
        validate_server_address(address)
            .map_err(|e| SettingsError::invalid("server.address", e.to_string()))?;
        self.update(|c| c.server.address = address.to_string())?;
        tracing::info!("Server address set to {}", address);
        Ok(())
    }

    fn trigger_key(&self) -> Option<KeyBinding> {
        self.config.read().scanner.trigger_key.clone()
    }

    fn bind_trigger_key(&self, binding: KeyBinding) -> SettingsResult<()> {
        tracing::info!("Scanner trigger bound to {}", binding);
        self.update(|c| c.scanner.trigger_key = Some(binding))
    }

    fn clear_trigger_key(&self) -> SettingsResult<()> {
        self.update(|c| c.scanner.trigger_key = None)
    }

    fn focus_session(&self) -> FocusSession {
        self.config.read().focus
    }

    fn save_focus_session(&self, session: FocusSession) -> SettingsResult<()> {
        self.update(|c| c.focus = session)
    }

    fn barcode_app_code(&self) -> Option<String> {
        self.config
            .read()
            .barcode_api
            .app_code
            .clone()
            .filter(|code| !code.trim().is_empty())
    }

    fn set_barcode_app_code(&self, app_code: &str) -> SettingsResult<()> {
        let app_code = app_code.trim();
        if app_code.is_empty() {
            return Err(SettingsError::invalid(
                "barcode_api.app_code",
                "must not be empty",
            ));
        }
        self.update(|c| c.barcode_api.app_code = Some(app_code.to_string()))
    }

    fn api_lookup_enabled(&self) -> bool {
        self.config.read().barcode_api.enabled
    }

    fn scanner(&self) -> ScannerSettings {
        self.config.read().scanner.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_in_memory_store() {
        let store = SettingsStore::default();
        assert_eq!(store.server_address(), "http://10.0.2.2:5000/");
        assert!(store.path().is_none());

        store.set_server_address(" http://192.168.0.5:5000/ ").unwrap();
        assert_eq!(store.server_address(), "http://192.168.0.5:5000/");
    }

    #[test]
    fn test_invalid_address_leaves_store_untouched() {
        let store = SettingsStore::default();
        assert!(store.set_server_address("192.168.0.5:5000").is_err());
        assert!(store.set_server_address("http://192.168.0.5:5000").is_err());
        assert_eq!(store.server_address(), "http://10.0.2.2:5000/");
    }

    #[test]
    fn test_trigger_key_binding() {
        let store = SettingsStore::default();
        store.bind_trigger_key(KeyBinding::new(24, "Volume Up")).unwrap();
        assert_eq!(store.trigger_key().map(|k| k.code), Some(24));

        store.clear_trigger_key().unwrap();
        assert!(store.trigger_key().is_none());
    }

    #[test]
    fn test_blank_app_code_is_none() {
        let store = SettingsStore::default();
        assert!(store.barcode_app_code().is_none());
        assert!(store.set_barcode_app_code("  ").is_err());
        store.set_barcode_app_code("abc").unwrap();
        assert_eq!(store.barcode_app_code().as_deref(), Some("abc"));
    }

    #[test]
    fn test_file_store_persists_changes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let store = SettingsStore::open(&path).unwrap();
        assert!(!path.exists());

        store.save_focus_session(FocusSession::at(0.3, 0.6)).unwrap();
        store.set_barcode_app_code("appcode-1").unwrap();
        assert!(path.exists());

        let reopened = SettingsStore::open(&path).unwrap();
        let focus = reopened.focus_session();
        assert!(focus.has_saved);
        assert!((focus.last_x - 0.3).abs() < 1e-6);
        assert!((focus.last_y - 0.6).abs() < 1e-6);
        assert_eq!(reopened.barcode_app_code().as_deref(), Some("appcode-1"));
    }

    #[test]
    fn test_failed_update_is_not_applied() {
        let store = SettingsStore::default();
        let result = store.update(|c| c.scanner.throttle_ms = 10);
        assert!(result.is_err());
        assert_eq!(store.scanner().throttle_ms, 300);
    }
}
