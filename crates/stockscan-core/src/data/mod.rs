//! Data models for StockScan
//!
//! Scan values and their classification, catalog item snapshots, and the
//! persisted focus session.

mod focus;
mod item;
mod scan;

pub use focus::FocusSession;
pub use item::{BarcodeInfo, LookupResult, NewItem};
pub use scan::{is_barcode_shaped, normalize_barcode, LookupKey, ScanTarget, ScanValue};
