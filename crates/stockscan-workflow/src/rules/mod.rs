//! Per-screen business rules
//!
//! The coordinator engine owns timing, tasks and the guard; a
//! [`WorkflowRules`] implementation decides what a value means for its screen.
//! Rules only touch the state through [`Ctx`] and describe catalog work as
//! [`Step`]s and [`Submission`]s for the engine to run.

mod add_item;
mod lookup;
mod move_item;
mod stock_adjust;

pub use add_item::AddItemRules;
pub use lookup::LookupRules;
pub use move_item::MoveItemRules;
pub use stock_adjust::StockAdjustRules;

use crate::events::Notice;
use crate::state::{FieldId, InputOrigin, Phase, StockMode, WorkflowState};
use stockscan_catalog::CatalogService;
use stockscan_core::{
    BarcodeInfo, CatalogError, LookupKey, LookupResult, NewItem, ScanTarget, ScanValue,
    ValidationError,
};

/// Mutable view of the state handed to rules, collecting notices.
pub struct Ctx<'a> {
    pub state: &'a mut WorkflowState,
    notices: &'a mut Vec<Notice>,
}

impl<'a> Ctx<'a> {
    pub fn new(state: &'a mut WorkflowState, notices: &'a mut Vec<Notice>) -> Self {
        Self { state, notices }
    }

    pub fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.notify(Notice::Info(message.into()));
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.notify(Notice::Warning(message.into()));
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.notify(Notice::Error(message.into()));
    }

    /// Move to a phase and point the next scan at `target`
    pub fn go(&mut self, phase: Phase, target: ScanTarget) {
        self.state.phase = phase;
        self.state.current_target = target;
        self.state.target_selected = false;
    }
}

/// What the engine should do after a rule handled a value.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Nothing more.
    Done,
    /// Look the key up in the catalog.
    Lookup(LookupKey),
    /// Fetch third-party product details for a barcode.
    BarcodeInfo {
        /// Barcode to look up.
        barcode: String,
        /// Credential for the service.
        app_code: String,
    },
    /// The secondary value was filled: validate, report problems, and
    /// auto-submit when it came from a scan.
    Filled,
    /// Recompute readiness quietly.
    Settle,
}

/// A catalog write ready to run.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    RegisterBarcode { code: String, barcode: String },
    Create(NewItem),
    Receive {
        key: LookupKey,
        quantity: u32,
        location: Option<String>,
    },
    Issue { key: LookupKey, quantity: u32 },
    Move { key: LookupKey, location: String },
}

impl Submission {
    /// Run against the catalog
    pub async fn execute(&self, catalog: &dyn CatalogService) -> Result<String, CatalogError> {
        match self {
            Submission::RegisterBarcode { code, barcode } => {
                catalog.register_barcode(code, barcode).await
            }
            Submission::Create(item) => catalog.create(item).await,
            Submission::Receive {
                key,
                quantity,
                location,
            } => {
                catalog
                    .receive_stock(key, *quantity, location.as_deref())
                    .await
            }
            Submission::Issue { key, quantity } => catalog.issue_stock(key, *quantity).await,
            Submission::Move { key, location } => catalog.move_location(key, location).await,
        }
    }
}

impl std::fmt::Display for Submission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Submission::RegisterBarcode { code, barcode } => {
                write!(f, "register barcode {} for {}", barcode, code)
            }
            Submission::Create(item) => write!(f, "create item {} '{}'", item.code, item.name),
            Submission::Receive {
                key,
                quantity,
                location: Some(location),
            } => write!(f, "receive {} x {} into {}", quantity, key, location),
            Submission::Receive { key, quantity, .. } => {
                write!(f, "receive {} x {}", quantity, key)
            }
            Submission::Issue { key, quantity } => write!(f, "issue {} x {}", quantity, key),
            Submission::Move { key, location } => write!(f, "move {} to {}", key, location),
        }
    }
}

/// Screen-specific behaviour plugged into the coordinator engine.
pub trait WorkflowRules: Send + 'static {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Prepare a fresh state (also called after a successful submission)
    fn init(&self, _state: &mut WorkflowState) {}

    /// Field the secondary target writes to, if the screen has one
    fn secondary_field(&self) -> Option<FieldId>;

    /// Whether a scan that completes the form submits on its own
    fn auto_submits(&self) -> bool {
        true
    }

    /// Pick the target for a scanned value
    fn route_scan(&self, state: &WorkflowState, _value: &ScanValue) -> ScanTarget {
        state.current_target
    }

    /// Handle a value for the primary field
    fn on_primary(&self, ctx: &mut Ctx<'_>, value: &ScanValue, origin: InputOrigin) -> Step;

    /// Handle a value for the secondary field
    fn on_secondary(&self, ctx: &mut Ctx<'_>, value: &ScanValue, _origin: InputOrigin) -> Step {
        match self.secondary_field() {
            Some(field) => {
                ctx.state.set_field(field, value.as_str());
                Step::Filled
            }
            None => {
                ctx.warn("This screen has no secondary field");
                Step::Done
            }
        }
    }

    /// Apply a catalog lookup result
    fn on_lookup(&self, ctx: &mut Ctx<'_>, key: &LookupKey, result: LookupResult);

    /// Apply third-party barcode details
    fn on_barcode_info(&self, _ctx: &mut Ctx<'_>, _info: BarcodeInfo) -> Step {
        Step::Settle
    }

    /// The user edited the primary field by hand
    fn on_primary_edited(&self, ctx: &mut Ctx<'_>) {
        if ctx.state.last_lookup_key.is_some() || ctx.state.item.is_some() {
            tracing::debug!("Primary field edited, dropping lookup state");
        }
        ctx.state.reset_lookup();
        ctx.go(Phase::AwaitingPrimary, ScanTarget::Primary);
    }

    /// Check the fields needed for submission
    fn validate(&self, state: &WorkflowState) -> Result<(), ValidationError> {
        self.submission(state).map(|_| ())
    }

    /// Build the catalog write from the current fields
    fn submission(&self, state: &WorkflowState) -> Result<Submission, ValidationError>;

    /// Apply a successful submission
    fn on_submitted(&self, ctx: &mut Ctx<'_>, _submission: &Submission) {
        ctx.state.reset();
        self.init(ctx.state);
    }

    /// Switch Stock-Adjust mode; other screens refuse
    fn set_mode(&self, ctx: &mut Ctx<'_>, _mode: StockMode) {
        ctx.warn("This screen has no modes");
    }
}

/// Parse the quantity field: blank means the default, otherwise a positive
/// whole number
pub(crate) fn parse_quantity(state: &WorkflowState) -> Result<u32, ValidationError> {
    let Some(text) = state.value(FieldId::Quantity) else {
        return Ok(stockscan_core::constants::DEFAULT_QUANTITY);
    };
    match text.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ValidationError::InvalidQuantity {
            value: text.to_string(),
        }),
    }
}

pub(crate) fn require(state: &WorkflowState, field: FieldId) -> Result<String, ValidationError> {
    state
        .value(field)
        .map(str::to_string)
        .ok_or_else(|| ValidationError::missing(field.name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_quantity() {
        let mut state = WorkflowState::default();
        assert_eq!(parse_quantity(&state), Ok(1));
        state.set_field(FieldId::Quantity, " 12 ");
        assert_eq!(parse_quantity(&state), Ok(12));
        for bad in ["0", "-3", "1.5", "lots"] {
            state.set_field(FieldId::Quantity, bad);
            assert_eq!(
                parse_quantity(&state),
                Err(ValidationError::InvalidQuantity { value: bad.into() })
            );
        }
    }

    #[test]
    fn test_submission_display() {
        let s = Submission::Receive {
            key: LookupKey::Code("P100".into()),
            quantity: 1,
            location: Some("A-12".into()),
        };
        assert_eq!(s.to_string(), "receive 1 x code P100 into A-12");
    }

    proptest! {
        #[test]
        fn prop_positive_counts_parse(n in 1u32..=u32::MAX, pad in " {0,3}") {
            let mut state = WorkflowState::default();
            state.set_field(FieldId::Quantity, format!("{pad}{n}{pad}"));
            prop_assert_eq!(parse_quantity(&state), Ok(n));
        }

        #[test]
        fn prop_non_numeric_quantities_rejected(text in "[A-Za-z.,-]{1,6}") {
            let mut state = WorkflowState::default();
            state.set_field(FieldId::Quantity, text.clone());
            prop_assert!(parse_quantity(&state).is_err());
        }
    }
}
