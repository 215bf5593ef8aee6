//! Move-Item screen: relocate an item that holds stock.

use super::{require, Ctx, Step, Submission, WorkflowRules};
use crate::state::{FieldId, InputOrigin, Phase, WorkflowState};
use stockscan_core::{LookupKey, LookupResult, ScanTarget, ScanValue, ValidationError};

#[derive(Debug, Default, Clone, Copy)]
pub struct MoveItemRules;

impl WorkflowRules for MoveItemRules {
    fn name(&self) -> &'static str {
        "move"
    }

    fn secondary_field(&self) -> Option<FieldId> {
        Some(FieldId::Location)
    }

    fn on_primary(&self, ctx: &mut Ctx<'_>, value: &ScanValue, _origin: InputOrigin) -> Step {
        ctx.state.set_field(FieldId::Code, value.as_str());
        ctx.state.clear_field(FieldId::Location);
        Step::Lookup(value.lookup_key())
    }

    fn on_lookup(&self, ctx: &mut Ctx<'_>, key: &LookupKey, result: LookupResult) {
        let rejection = if !result.found {
            Some(ValidationError::ItemMissing {
                code: key.value().to_string(),
            })
        } else if !result.in_stock() {
            Some(ValidationError::NotInStock {
                code: key.value().to_string(),
            })
        } else {
            None
        };

        if let Some(rejection) = rejection {
            tracing::debug!("Move rejected: {}", rejection);
            ctx.state.reset_lookup();
            ctx.state.clear_field(FieldId::Code);
            ctx.error(rejection.to_string());
            ctx.go(Phase::AwaitingPrimary, ScanTarget::Primary);
            return;
        }

        let location = result.known_location().map(str::to_string);
        ctx.info(format!(
            "{} is at {}, scan the new location",
            result.code,
            location.as_deref().unwrap_or("no location")
        ));
        ctx.state.remote_exists = true;
        ctx.state.remote_location = location;
        ctx.state.item = Some(result);
        ctx.go(Phase::AwaitingSecondary, ScanTarget::Secondary);
    }

    fn submission(&self, state: &WorkflowState) -> Result<Submission, ValidationError> {
        let code = require(state, FieldId::Code)?;
        if !state.remote_exists {
            return Err(ValidationError::ItemMissing { code });
        }
        let location = require(state, FieldId::Location)?;
        Ok(Submission::Move {
            key: LookupKey::classify(&code),
            location,
        })
    }
}
