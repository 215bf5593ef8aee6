//! # StockScan
//!
//! Barcode-driven inventory handling against a remote stock catalog:
//! - Look up items by internal code or 13-digit barcode
//! - Add new items, prefilled from a barcode information service
//! - Receive and issue stock, relocate items between storage locations
//!
//! ## Architecture
//!
//! StockScan is organized as a workspace with multiple crates:
//!
//! 1. **stockscan-core** - Scan values, the scan event bus, error types
//! 2. **stockscan-settings** - Typed configuration and the settings store
//! 3. **stockscan-capture** - Frame analysis, scan sessions, focus control
//! 4. **stockscan-catalog** - Catalog service trait and its HTTP client
//! 5. **stockscan-workflow** - Per-screen coordinators and the screen registry
//! 6. **stockscan** - Composition root and console front-end
//!
//! ## Features
//!
//! - **Single-shot capture**: one debounced value per scan session
//! - **Guarded workflows**: repeated scans inside the guard window are dropped
//! - **Auto-submit**: a form completed by a scan submits itself after a delay
//! - **Screen routing**: only the active screen hears the scanner

pub mod app;
pub mod console;

pub use app::App;
pub use console::{ConsoleCommand, ConsoleInput};

pub use stockscan_capture as capture;
pub use stockscan_catalog as catalog;
pub use stockscan_settings as settings;
pub use stockscan_workflow as workflow;

pub use stockscan_core::{
    CatalogError, Error, FeedbackSink, LookupKey, LookupResult, PublishOutcome, Result,
    ScanEventBus, ScanTarget, ScanValue,
};

pub use stockscan_settings::{Config, KeyBinding, SettingsManager, SettingsProvider, SettingsStore};

pub use stockscan_workflow::{
    CoordinatorHandle, FieldId, Notice, NoticeLevel, Phase, ScreenId, ScreenRegistry, StockMode,
    TriggerAction, WorkflowEvent, WorkflowState,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Environment variable selecting the log format (`pretty` or `json`)
pub const LOG_FORMAT_ENV: &str = "STOCKSCAN_LOG_FORMAT";

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Output on stderr so the console front-end keeps stdout
/// - RUST_LOG environment variable support, `info` otherwise
/// - Pretty formatting, or JSON lines when `STOCKSCAN_LOG_FORMAT=json`
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json = std::env::var(LOG_FORMAT_ENV)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .with_thread_names(true)
            .json();

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    } else {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_line_number(true)
            .pretty();

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    }

    Ok(())
}
