//! Stock-Adjust screen: receive or issue stock.
//!
//! Receiving accepts unknown items (they are created by the server) as long as
//! a location is given. Issuing requires an existing item holding stock.
//! Scanning the same item again adds one to the quantity instead of looking
//! it up again.

use super::{parse_quantity, require, Ctx, Step, Submission, WorkflowRules};
use crate::state::{FieldId, InputOrigin, Phase, StockMode, WorkflowState};
use stockscan_core::{LookupKey, LookupResult, ScanTarget, ScanValue, ValidationError};

#[derive(Debug, Default, Clone, Copy)]
pub struct StockAdjustRules;

impl WorkflowRules for StockAdjustRules {
    fn name(&self) -> &'static str {
        "stock"
    }

    fn init(&self, state: &mut WorkflowState) {
        state.default_quantity();
    }

    fn secondary_field(&self) -> Option<FieldId> {
        Some(FieldId::Location)
    }

    fn on_primary(&self, ctx: &mut Ctx<'_>, value: &ScanValue, origin: InputOrigin) -> Step {
        if origin == InputOrigin::Scan && ctx.state.is_repeat_of_lookup(value.as_str()) {
            let quantity = parse_quantity(ctx.state).unwrap_or(1).saturating_add(1);
            ctx.state.set_field(FieldId::Quantity, quantity.to_string());
            tracing::debug!("Repeat scan of '{}', quantity now {}", value, quantity);
            ctx.info(format!("Quantity {}", quantity));
            return Step::Done;
        }

        ctx.state.set_field(FieldId::Code, value.as_str());
        ctx.state.clear_field(FieldId::Location);
        ctx.state.default_quantity();
        Step::Lookup(value.lookup_key())
    }

    fn on_lookup(&self, ctx: &mut Ctx<'_>, key: &LookupKey, result: LookupResult) {
        let mode = ctx.state.mode;

        if !result.found {
            ctx.state.remote_exists = false;
            ctx.state.remote_location = None;
            ctx.state.item = None;
            match mode {
                StockMode::Receive => {
                    ctx.info(format!("{} is new, scan a location", key.value()));
                    ctx.go(Phase::AwaitingSecondary, ScanTarget::Secondary);
                }
                StockMode::Issue => {
                    ctx.state.last_lookup_key = None;
                    ctx.state.clear_field(FieldId::Code);
                    ctx.error(
                        ValidationError::ItemMissing {
                            code: key.value().to_string(),
                        }
                        .to_string(),
                    );
                    ctx.go(Phase::AwaitingPrimary, ScanTarget::Primary);
                }
            }
            return;
        }

        let location = result.known_location().map(str::to_string);
        let in_stock = result.in_stock();
        let code = result.code.clone();
        ctx.state.remote_exists = true;
        ctx.state.remote_location = location.clone();
        ctx.state.item = Some(result);

        match (mode, location) {
            (StockMode::Receive, None) => {
                ctx.info(format!("{} has no location, scan one", code));
                ctx.go(Phase::AwaitingSecondary, ScanTarget::Secondary);
            }
            (StockMode::Receive, Some(location)) => {
                ctx.state.set_field(FieldId::Location, location);
                ctx.go(Phase::ReadyToSubmit, ScanTarget::Primary);
            }
            (StockMode::Issue, _) if !in_stock => {
                ctx.state.reset_lookup();
                ctx.state.clear_field(FieldId::Code);
                ctx.error(ValidationError::NotInStock { code }.to_string());
                ctx.go(Phase::AwaitingPrimary, ScanTarget::Primary);
            }
            (StockMode::Issue, location) => {
                if let Some(location) = location {
                    ctx.state.set_field(FieldId::Location, location);
                }
                ctx.go(Phase::ReadyToSubmit, ScanTarget::Primary);
            }
        }
    }

    fn submission(&self, state: &WorkflowState) -> Result<Submission, ValidationError> {
        let code = require(state, FieldId::Code)?;
        let quantity = parse_quantity(state)?;
        let key = LookupKey::classify(&code);

        match state.mode {
            StockMode::Receive => {
                let location = state.value(FieldId::Location).map(str::to_string);
                if !state.remote_exists && location.is_none() {
                    return Err(ValidationError::missing(FieldId::Location.name()));
                }
                Ok(Submission::Receive {
                    key,
                    quantity,
                    location,
                })
            }
            StockMode::Issue => {
                if !state.remote_exists {
                    return Err(ValidationError::ItemMissing { code });
                }
                Ok(Submission::Issue { key, quantity })
            }
        }
    }

    fn set_mode(&self, ctx: &mut Ctx<'_>, mode: StockMode) {
        if ctx.state.mode == mode {
            return;
        }
        ctx.state.reset();
        ctx.state.mode = mode;
        self.init(ctx.state);
        ctx.info(format!("Mode: {}", mode));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(mode: StockMode) -> WorkflowState {
        let mut state = WorkflowState {
            mode,
            ..Default::default()
        };
        StockAdjustRules.init(&mut state);
        state
    }

    fn scan(state: &mut WorkflowState, value: &str) -> Step {
        let mut notices = Vec::new();
        StockAdjustRules.on_primary(
            &mut Ctx::new(state, &mut notices),
            &ScanValue::new(value).unwrap(),
            InputOrigin::Scan,
        )
    }

    fn lookup(state: &mut WorkflowState, result: LookupResult) {
        let mut notices = Vec::new();
        let key = LookupKey::classify(state.field(FieldId::Code));
        state.last_lookup_key = Some(key.value().to_string());
        StockAdjustRules.on_lookup(&mut Ctx::new(state, &mut notices), &key, result);
    }

    fn item(quantity: i64, location: Option<&str>) -> LookupResult {
        LookupResult {
            found: true,
            code: "P100".into(),
            quantity,
            location: location.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_receive_unknown_item_needs_location() {
        let mut s = state(StockMode::Receive);
        assert_eq!(scan(&mut s, "P100"), Step::Lookup(LookupKey::Code("P100".into())));
        lookup(&mut s, LookupResult::not_found());
        assert_eq!(s.phase, Phase::AwaitingSecondary);
        assert_eq!(s.current_target, ScanTarget::Secondary);
        assert_eq!(
            StockAdjustRules.submission(&s),
            Err(ValidationError::missing("location"))
        );

        s.set_field(FieldId::Location, "A-12");
        assert_eq!(
            StockAdjustRules.submission(&s),
            Ok(Submission::Receive {
                key: LookupKey::Code("P100".into()),
                quantity: 1,
                location: Some("A-12".into())
            })
        );
    }

    #[test]
    fn test_receive_located_item_is_ready() {
        let mut s = state(StockMode::Receive);
        scan(&mut s, "P100");
        // Empty items can still be received into
        lookup(&mut s, item(0, Some("B-2")));
        assert_eq!(s.phase, Phase::ReadyToSubmit);
        assert_eq!(s.field(FieldId::Location), "B-2");
    }

    #[test]
    fn test_receive_found_without_location() {
        let mut s = state(StockMode::Receive);
        scan(&mut s, "P100");
        lookup(&mut s, item(3, Some("  ")));
        assert_eq!(s.phase, Phase::AwaitingSecondary);
        assert_eq!(s.current_target, ScanTarget::Secondary);
    }

    #[test]
    fn test_issue_rules() {
        let mut s = state(StockMode::Issue);
        scan(&mut s, "P100");
        lookup(&mut s, LookupResult::not_found());
        assert_eq!(s.phase, Phase::AwaitingPrimary);

        scan(&mut s, "P100");
        lookup(&mut s, item(0, None));
        assert_eq!(s.phase, Phase::AwaitingPrimary);
        assert!(!s.remote_exists);

        scan(&mut s, "P100");
        lookup(&mut s, item(5, None));
        assert_eq!(s.phase, Phase::ReadyToSubmit);
        assert_eq!(
            StockAdjustRules.submission(&s),
            Ok(Submission::Issue {
                key: LookupKey::Code("P100".into()),
                quantity: 1
            })
        );
    }

    #[test]
    fn test_repeat_scan_increments_quantity() {
        let mut s = state(StockMode::Receive);
        scan(&mut s, "P100");
        lookup(&mut s, item(1, Some("A-1")));

        assert_eq!(scan(&mut s, "P100"), Step::Done);
        assert_eq!(scan(&mut s, "P100"), Step::Done);
        assert_eq!(s.field(FieldId::Quantity), "3");

        // A different item starts over
        assert!(matches!(scan(&mut s, "P101"), Step::Lookup(_)));
        assert_eq!(s.field(FieldId::Quantity), "1");
    }

    #[test]
    fn test_mode_switch_resets() {
        let mut s = state(StockMode::Receive);
        scan(&mut s, "P100");
        let mut notices = Vec::new();
        StockAdjustRules.set_mode(&mut Ctx::new(&mut s, &mut notices), StockMode::Issue);
        assert_eq!(s.mode, StockMode::Issue);
        assert_eq!(s.field(FieldId::Code), "");
        assert_eq!(s.field(FieldId::Quantity), "1");
    }
}
