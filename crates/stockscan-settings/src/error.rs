//! Settings errors.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Cannot read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot write settings to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The platform has no per-user config directory.
    #[error("No config directory on {0}")]
    NoConfigDir(&'static str),

    #[error("Cannot create config directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Settings files are `.toml` or `.json`.
    #[error("Unsupported settings file {0}, expected .toml or .json")]
    UnsupportedFormat(PathBuf),

    #[error("Invalid setting '{key}': {reason}")]
    Invalid { key: String, reason: String },

    #[error("'{key}' must be between {min} and {max}, got {value}")]
    OutOfRange {
        key: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },

    #[error("Malformed JSON settings: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed TOML settings: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Cannot encode settings as TOML: {0}")]
    TomlEncode(#[from] toml::ser::Error),
}

impl SettingsError {
    /// Shorthand for [`SettingsError::Invalid`].
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        SettingsError::Invalid {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// The setting this error is about, when there is one.
    pub fn key(&self) -> Option<&str> {
        match self {
            SettingsError::Invalid { key, .. } => Some(key),
            SettingsError::OutOfRange { key, .. } => Some(key),
            _ => None,
        }
    }
}

pub type SettingsResult<T> = Result<T, SettingsError>;
