//! # StockScan Core
//!
//! Core types, traits, and utilities for StockScan.
//! Provides the scan event bus, the layered error types, the inventory
//! data model, and the collaborator traits shared by the capture, catalog
//! and workflow crates.

pub mod constants;
pub mod core;
pub mod data;
pub mod error;
pub mod event_bus;

pub use core::feedback::{FeedbackSink, NoFeedback};

pub use data::{
    is_barcode_shaped, normalize_barcode, BarcodeInfo, FocusSession, LookupKey, LookupResult,
    NewItem, ScanTarget, ScanValue,
};

pub use error::{CaptureError, CatalogError, Error, Result, ValidationError};

// Re-export event bus for convenience
pub use event_bus::{
    PublishOutcome, ScanEvent, ScanEventBus, ScanEventBusConfig, SubscriptionId,
};
