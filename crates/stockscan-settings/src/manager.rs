//! Config file location.

use crate::error::{SettingsError, SettingsResult};
use std::path::PathBuf;

const APP_DIR: &str = "stockscan";
const CONFIG_FILE: &str = "config.toml";

/// Resolves where settings live on this platform.
pub struct SettingsManager;

impl SettingsManager {
    /// Platform config directory for StockScan
    pub fn config_dir() -> SettingsResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(SettingsError::NoConfigDir(std::env::consts::OS))
    }

    /// Default settings file path
    pub fn config_file_path() -> SettingsResult<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    /// Create the config directory if needed
    pub fn ensure_config_dir() -> SettingsResult<PathBuf> {
        let dir = Self::config_dir()?;
        std::fs::create_dir_all(&dir).map_err(|source| SettingsError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        Ok(dir)
    }

    /// Settings file to use: an explicit override, else the default location
    pub fn resolve(explicit: Option<PathBuf>) -> SettingsResult<PathBuf> {
        match explicit {
            Some(path) => Ok(path),
            None => {
                Self::ensure_config_dir()?;
                Self::config_file_path()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        let path = PathBuf::from("/tmp/elsewhere/settings.json");
        assert_eq!(SettingsManager::resolve(Some(path.clone())).unwrap(), path);
    }

    #[test]
    fn test_default_file_name() {
        if let Ok(path) = SettingsManager::config_file_path() {
            assert!(path.ends_with("stockscan/config.toml"));
        }
    }
}
