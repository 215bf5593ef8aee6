//! # Scan Event Bus
//!
//! Carries the most recent decoded scan value from the capture pipeline (or
//! a keyboard-wedge scanner) to whichever screen is currently active.
//!
//! ## Overview
//!
//! - The bus holds at most one value; publishing an identical value again is
//!   a no-op until the bus is cleared
//! - Subscribers are registered once and toggled active/inactive as their
//!   screen comes and goes; only active subscribers are notified
//! - A value published while nobody is active is retained and handed to the
//!   next subscriber that becomes active
//! - A one-shot feedback flag lets exactly one party play the confirmation
//!   cue per distinct value
//!
//! The bus is an ordinary value: build one and share it with `Arc`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use stockscan_core::{ScanEventBus, ScanValue};
//!
//! let bus = Arc::new(ScanEventBus::new());
//! let id = bus.subscribe(|event| println!("scanned {}", event.value));
//!
//! bus.publish(ScanValue::new("P100")?);
//! bus.publish(ScanValue::new("P100")?); // duplicate, not delivered
//!
//! bus.set_active(id, false); // screen went away
//! bus.unsubscribe(id);
//! ```

mod bus;
mod events;

pub use bus::*;
pub use events::*;
