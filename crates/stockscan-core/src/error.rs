//! Error handling for StockScan
//!
//! Provides error types for all layers of the application:
//! - Catalog errors (transport, HTTP status, business rejection)
//! - Validation errors (input checks made before any network call)
//! - Capture errors (camera permission, binding, decoding, focus)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Catalog error type
///
/// Represents failures talking to the remote catalog service. Transport
/// problems and HTTP status failures are kept apart from business-level
/// rejections so the caller can phrase them differently.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// The server could not be reached
    #[error("Connection failed: {reason}")]
    Connection {
        /// The reason the connection failed.
        reason: String,
    },

    /// The request timed out
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout {
        /// The timeout duration in milliseconds.
        timeout_ms: u64,
    },

    /// The server host name could not be resolved
    #[error("Unknown host: {host}")]
    UnknownHost {
        /// The host that failed to resolve.
        host: String,
    },

    /// The server answered 404
    #[error("Not found: {what}")]
    NotFound {
        /// What was being looked for.
        what: String,
    },

    /// The server answered 401
    #[error("Unauthorized")]
    Unauthorized,

    /// Any other non-success HTTP status
    #[error("Server returned HTTP {status}: {message}")]
    HttpStatus {
        /// The HTTP status code.
        status: u16,
        /// Body or reason phrase returned with the status.
        message: String,
    },

    /// The request went through but the service reported failure
    #[error("Rejected by server: {message}")]
    Rejected {
        /// The message returned by the service.
        message: String,
    },

    /// The response body could not be understood
    #[error("Malformed response: {reason}")]
    Decode {
        /// The reason decoding failed.
        reason: String,
    },

    /// A third-party service needs a credential that is not configured
    #[error("No credential configured for {service}")]
    CredentialMissing {
        /// The service that needs the credential.
        service: String,
    },

    /// The configured server address cannot be used to build a request
    #[error("Invalid server address: {address}")]
    InvalidAddress {
        /// The offending address.
        address: String,
    },
}

impl CatalogError {
    /// True for failures where the request never produced an HTTP answer.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            CatalogError::Connection { .. }
                | CatalogError::Timeout { .. }
                | CatalogError::UnknownHost { .. }
        )
    }

    /// Message suitable for showing to the person holding the scanner.
    pub fn user_message(&self) -> String {
        match self {
            CatalogError::Connection { .. } => {
                "Cannot reach the catalog server. Check the network and try again.".to_string()
            }
            CatalogError::Timeout { .. } => {
                "The catalog server took too long to answer. Try again.".to_string()
            }
            CatalogError::UnknownHost { host } => {
                format!("Unknown server '{}'. Check the server address in settings.", host)
            }
            CatalogError::NotFound { what } => format!("{} was not found on the server", what),
            CatalogError::Unauthorized => "The server refused access (401).".to_string(),
            CatalogError::HttpStatus { status, .. } if *status >= 500 => {
                format!("Server error ({}). Try again later.", status)
            }
            CatalogError::HttpStatus { status, .. } => format!("Request failed ({})", status),
            CatalogError::Rejected { message } => message.clone(),
            CatalogError::Decode { .. } => "The server sent an unexpected response.".to_string(),
            CatalogError::CredentialMissing { service } => {
                format!("An app code for {} is required", service)
            }
            CatalogError::InvalidAddress { address } => {
                format!("Server address '{}' is not usable", address)
            }
        }
    }
}

/// Validation error type
///
/// Input problems detected locally, before anything is sent to the catalog.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A scan produced nothing but whitespace
    #[error("Scan value is empty")]
    EmptyScan,

    /// A required field is blank
    #[error("{field} is required")]
    MissingField {
        /// The name of the missing field.
        field: String,
    },

    /// Quantity is not a positive whole number
    #[error("Invalid quantity: {value}")]
    InvalidQuantity {
        /// The rejected text.
        value: String,
    },

    /// A numeric field could not be parsed
    #[error("Invalid number for {field}: {value}")]
    InvalidNumber {
        /// The field being parsed.
        field: String,
        /// The rejected text.
        value: String,
    },

    /// Barcode does not have the catalog shape
    #[error("Invalid barcode format: {value}")]
    InvalidBarcode {
        /// The rejected value.
        value: String,
    },

    /// Server address is blank or malformed
    #[error("Invalid server address: {address}")]
    InvalidServerAddress {
        /// The rejected address.
        address: String,
    },

    /// The item exists but holds no stock
    #[error("Item {code} is not in stock")]
    NotInStock {
        /// Code of the item.
        code: String,
    },

    /// The item does not exist in the catalog
    #[error("Item {code} does not exist")]
    ItemMissing {
        /// Code that was looked up.
        code: String,
    },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::MissingField`].
    pub fn missing(field: impl Into<String>) -> Self {
        ValidationError::MissingField {
            field: field.into(),
        }
    }
}

/// Capture error type
///
/// Represents camera and decoder failures in a scan session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// Camera permission was not granted
    #[error("Camera permission denied")]
    PermissionDenied,

    /// The camera could not be bound to the session
    #[error("Camera binding failed: {reason}")]
    CameraBinding {
        /// The reason binding failed.
        reason: String,
    },

    /// The vision decoder failed on a frame
    #[error("Decoder failed: {reason}")]
    Decoder {
        /// The reason decoding failed.
        reason: String,
    },

    /// A focus/metering request failed
    #[error("Focus failed: {reason}")]
    Focus {
        /// The reason focusing failed.
        reason: String,
    },

    /// The frame analyzer stopped unexpectedly
    #[error("Scan session aborted: {reason}")]
    SessionAborted {
        /// The reason the session ended.
        reason: String,
    },
}

/// Main error type for StockScan
///
/// A unified error type that can represent any error from all layers.
#[derive(Error, Debug)]
pub enum Error {
    /// Catalog error
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Validation error
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Capture error
    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Catalog(CatalogError::Timeout { .. }))
    }

    /// Check if this is a transport-level catalog error
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Error::Catalog(e) if e.is_transport())
    }

    /// Check if this is a validation error
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    /// Check if this error makes the capture session unusable
    pub fn is_fatal_capture_error(&self) -> bool {
        matches!(
            self,
            Error::Capture(CaptureError::PermissionDenied | CaptureError::CameraBinding { .. })
        )
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
