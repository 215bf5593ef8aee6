//! # StockScan Workflow
//!
//! Scan-driven workflow coordination. Each screen (Lookup, Add-Item,
//! Stock-Adjust, Move-Item) gets a coordinator task that turns scanned and
//! typed values into guarded catalog lookups, validated forms and, when a
//! scan completes a form, a delayed automatic submission. The
//! [`ScreenRegistry`] decides which coordinator hears the scan event bus.

pub mod coordinator;
pub mod error;
pub mod events;
pub mod registry;
pub mod rules;
pub mod state;

pub use coordinator::{CoordinatorConfig, CoordinatorHandle, WorkflowDeps};
pub use error::WorkflowError;
pub use events::{EventDispatcher, IgnoreReason, Notice, NoticeLevel, WorkflowEvent};
pub use registry::{ScreenId, ScreenRegistry, TriggerAction};
pub use rules::{
    AddItemRules, Ctx, LookupRules, MoveItemRules, StockAdjustRules, Step, Submission,
    WorkflowRules,
};
pub use state::{FieldId, InputOrigin, Phase, StockMode, WorkflowState};
