//! Coordinator state
//!
//! Everything a coordinator knows about its screen lives in one
//! [`WorkflowState`], owned by the coordinator task. Callers only ever see
//! clones of it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use stockscan_core::constants::DEFAULT_QUANTITY;
use stockscan_core::{LookupKey, LookupResult, ScanTarget};
use tokio::time::Instant;

/// Where a coordinator is in its flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Phase {
    /// Waiting for the primary value.
    #[default]
    AwaitingPrimary,
    /// A lookup for the primary value is running.
    LookupInFlight,
    /// Waiting for the secondary value or the remaining fields.
    AwaitingSecondary,
    /// Everything needed for submission is present.
    ReadyToSubmit,
    /// A submission is running.
    SubmitInFlight,
}

impl Phase {
    /// Whether a catalog request is running
    pub fn is_busy(&self) -> bool {
        matches!(self, Phase::LookupInFlight | Phase::SubmitInFlight)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Phase::AwaitingPrimary => "awaiting primary",
            Phase::LookupInFlight => "lookup in flight",
            Phase::AwaitingSecondary => "awaiting secondary",
            Phase::ReadyToSubmit => "ready to submit",
            Phase::SubmitInFlight => "submit in flight",
        };
        f.write_str(s)
    }
}

/// Form fields a coordinator can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FieldId {
    Code,
    Barcode,
    Name,
    Specs,
    Quantity,
    Location,
    Cost,
    Stock,
    Link,
}

impl FieldId {
    /// All fields, in display order
    pub const ALL: [FieldId; 9] = [
        FieldId::Code,
        FieldId::Barcode,
        FieldId::Name,
        FieldId::Specs,
        FieldId::Quantity,
        FieldId::Location,
        FieldId::Cost,
        FieldId::Stock,
        FieldId::Link,
    ];

    /// Lower-case field name
    pub fn name(&self) -> &'static str {
        match self {
            FieldId::Code => "code",
            FieldId::Barcode => "barcode",
            FieldId::Name => "name",
            FieldId::Specs => "specs",
            FieldId::Quantity => "quantity",
            FieldId::Location => "location",
            FieldId::Cost => "cost",
            FieldId::Stock => "stock",
            FieldId::Link => "link",
        }
    }
}

impl std::fmt::Display for FieldId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for FieldId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldId::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown field '{}'", s))
    }
}

/// Stock-Adjust direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StockMode {
    /// Add stock.
    #[default]
    Receive,
    /// Remove stock.
    Issue,
}

impl std::fmt::Display for StockMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StockMode::Receive => f.write_str("receive"),
            StockMode::Issue => f.write_str("issue"),
        }
    }
}

impl std::str::FromStr for StockMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "receive" | "in" => Ok(StockMode::Receive),
            "issue" | "out" => Ok(StockMode::Issue),
            other => Err(format!("unknown mode '{}'", other)),
        }
    }
}

/// How a value reached the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOrigin {
    /// From the scan event bus.
    Scan,
    /// Typed by the user.
    Typed,
}

/// A coordinator's complete state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorkflowState {
    pub phase: Phase,
    pub current_target: ScanTarget,
    /// Set when the user picked the target explicitly.
    pub target_selected: bool,
    /// Scans before this instant are ignored.
    pub processing_guard_until: Option<Instant>,
    pub last_lookup_key: Option<String>,
    pub remote_exists: bool,
    pub remote_location: Option<String>,
    pub fields: BTreeMap<FieldId, String>,
    pub item: Option<LookupResult>,
    /// Only meaningful on the Stock-Adjust screen.
    pub mode: StockMode,
}

impl WorkflowState {
    /// Text of a field, empty when unset
    pub fn field(&self, id: FieldId) -> &str {
        self.fields.get(&id).map(String::as_str).unwrap_or("")
    }

    /// Trimmed field text, `None` when blank
    pub fn value(&self, id: FieldId) -> Option<&str> {
        Some(self.field(id).trim()).filter(|v| !v.is_empty())
    }

    pub fn set_field(&mut self, id: FieldId, value: impl Into<String>) {
        let value = value.into();
        if value.is_empty() {
            self.fields.remove(&id);
        } else {
            self.fields.insert(id, value);
        }
    }

    pub fn clear_field(&mut self, id: FieldId) {
        self.fields.remove(&id);
    }

    /// Whether the guard window is still open at `now`
    pub fn is_guarded(&self, now: Instant) -> bool {
        self.processing_guard_until.is_some_and(|until| now < until)
    }

    /// Whether `value` is the key of the item currently known to exist
    pub fn is_repeat_of_lookup(&self, value: &str) -> bool {
        self.remote_exists && self.last_lookup_key.as_deref() == Some(value)
    }

    /// The catalog key for the primary field
    pub fn primary_key(&self) -> Option<LookupKey> {
        self.value(FieldId::Code).map(LookupKey::classify)
    }

    /// Forget everything learned from the last lookup
    pub fn reset_lookup(&mut self) {
        self.last_lookup_key = None;
        self.remote_exists = false;
        self.remote_location = None;
        self.item = None;
    }

    /// Back to a blank form, keeping the mode
    pub fn reset(&mut self) {
        let mode = self.mode;
        *self = WorkflowState {
            mode,
            ..Default::default()
        };
    }

    /// Reset the quantity field to its default
    pub fn default_quantity(&mut self) {
        self.set_field(FieldId::Quantity, DEFAULT_QUANTITY.to_string());
    }

    pub fn target(&mut self, target: ScanTarget) {
        self.current_target = target;
    }
}
