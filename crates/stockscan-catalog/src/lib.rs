//! # StockScan Catalog
//!
//! Client side of the remote stock catalog: item lookup by code or barcode,
//! item creation, stock receive/issue, relocation and barcode registration,
//! plus the optional third-party barcode information lookup used to prefill
//! new items.

pub mod barcode_info;
pub mod client;
pub mod http;
pub mod model;

pub use barcode_info::{BarcodeInfoService, ShowApiBarcodeInfo};
pub use client::CatalogService;
pub use http::HttpCatalogClient;
