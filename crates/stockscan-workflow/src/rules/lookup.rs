//! Lookup screen: show an item, optionally register a barcode for it.

use super::{require, Ctx, Step, Submission, WorkflowRules};
use crate::state::{FieldId, InputOrigin, Phase, WorkflowState};
use stockscan_core::{
    is_barcode_shaped, LookupKey, LookupResult, ScanTarget, ScanValue, ValidationError,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct LookupRules;

impl WorkflowRules for LookupRules {
    fn name(&self) -> &'static str {
        "lookup"
    }

    fn secondary_field(&self) -> Option<FieldId> {
        Some(FieldId::Barcode)
    }

    // A barcode scanned while an item without a barcode is shown is meant
    // for that item.
    fn route_scan(&self, state: &WorkflowState, value: &ScanValue) -> ScanTarget {
        if state.target_selected {
            return state.current_target;
        }
        if state.item.is_some() && state.value(FieldId::Barcode).is_none() && value.is_barcode()
        {
            tracing::debug!("Routing barcode '{}' to the registration field", value);
            return ScanTarget::Secondary;
        }
        ScanTarget::Primary
    }

    fn on_primary(&self, ctx: &mut Ctx<'_>, value: &ScanValue, origin: InputOrigin) -> Step {
        if origin == InputOrigin::Scan
            && ctx.state.item.is_some()
            && ctx.state.last_lookup_key.as_deref() == Some(value.as_str())
        {
            tracing::debug!("'{}' is already shown", value);
            return Step::Done;
        }
        ctx.state.set_field(FieldId::Code, value.as_str());
        Step::Lookup(value.lookup_key())
    }

    fn on_secondary(&self, ctx: &mut Ctx<'_>, value: &ScanValue, _origin: InputOrigin) -> Step {
        if ctx.state.item.is_none() {
            ctx.warn("Look up an item before adding a barcode");
            return Step::Done;
        }
        if !value.is_barcode() {
            ctx.error(
                ValidationError::InvalidBarcode {
                    value: value.to_string(),
                }
                .to_string(),
            );
            return Step::Done;
        }
        ctx.state.set_field(FieldId::Barcode, value.as_str());
        Step::Filled
    }

    fn on_lookup(&self, ctx: &mut Ctx<'_>, key: &LookupKey, result: LookupResult) {
        if !result.found {
            ctx.state.reset_lookup();
            ctx.state.clear_field(FieldId::Barcode);
            ctx.warn(format!("No item found for {}", key));
            ctx.go(Phase::AwaitingPrimary, ScanTarget::Primary);
            return;
        }

        // An item found by barcode already shows that barcode on the card
        let prefill = if key.is_barcode() {
            String::new()
        } else {
            result.barcode.clone().unwrap_or_default()
        };
        ctx.state.set_field(FieldId::Barcode, prefill);
        ctx.state.remote_exists = true;
        ctx.state.remote_location = result.known_location().map(str::to_string);
        ctx.state.item = Some(result);
        ctx.go(Phase::AwaitingSecondary, ScanTarget::Primary);
    }

    fn submission(&self, state: &WorkflowState) -> Result<Submission, ValidationError> {
        let item = state
            .item
            .as_ref()
            .ok_or_else(|| ValidationError::missing("item"))?;
        let barcode = require(state, FieldId::Barcode)?;
        if !is_barcode_shaped(&barcode) {
            return Err(ValidationError::InvalidBarcode { value: barcode });
        }
        Ok(Submission::RegisterBarcode {
            code: item.code.clone(),
            barcode,
        })
    }

    fn on_submitted(&self, ctx: &mut Ctx<'_>, submission: &Submission) {
        if let (Submission::RegisterBarcode { barcode, .. }, Some(item)) =
            (submission, ctx.state.item.as_mut())
        {
            item.barcode = Some(barcode.clone());
        }
        ctx.go(Phase::AwaitingSecondary, ScanTarget::Primary);
    }
}
