//! Event payloads carried by the scan bus.

use crate::data::ScanValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A decoded value as held by the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanEvent {
    /// The decoded value.
    pub value: ScanValue,
    /// When the bus accepted it.
    pub delivered_at: DateTime<Utc>,
}

impl ScanEvent {
    /// Wrap a value, stamped with the current time.
    pub fn new(value: ScanValue) -> Self {
        Self {
            value,
            delivered_at: Utc::now(),
        }
    }
}

impl std::fmt::Display for ScanEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} @ {}",
            self.value,
            self.delivered_at.format("%H:%M:%S%.3f")
        )
    }
}

/// What happened to a published value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Handed to this many active subscribers.
    Delivered(usize),
    /// Nobody was active; held for the next subscriber.
    Retained,
    /// Same as the value already held; nothing happened.
    Duplicate,
}

impl PublishOutcome {
    /// Whether the value was accepted as new
    pub fn is_new(&self) -> bool {
        !matches!(self, PublishOutcome::Duplicate)
    }
}
