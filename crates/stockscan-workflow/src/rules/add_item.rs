//! Add-Item screen: create a catalog entry, prefilled from the barcode
//! information service when a retail barcode is scanned.

use super::{require, Ctx, Step, Submission, WorkflowRules};
use crate::events::Notice;
use crate::state::{FieldId, InputOrigin, Phase, WorkflowState};
use std::sync::Arc;
use stockscan_core::{
    BarcodeInfo, LookupKey, LookupResult, NewItem, ScanTarget, ScanValue, ValidationError,
};
use stockscan_settings::SettingsProvider;

pub(crate) const BARCODE_SERVICE: &str = "barcode lookup";

pub struct AddItemRules {
    settings: Arc<dyn SettingsProvider>,
}

impl AddItemRules {
    pub fn new(settings: Arc<dyn SettingsProvider>) -> Self {
        Self { settings }
    }
}

impl std::fmt::Debug for AddItemRules {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddItemRules").finish_non_exhaustive()
    }
}

impl WorkflowRules for AddItemRules {
    fn name(&self) -> &'static str {
        "add"
    }

    fn secondary_field(&self) -> Option<FieldId> {
        None
    }

    fn auto_submits(&self) -> bool {
        false
    }

    fn route_scan(&self, _state: &WorkflowState, _value: &ScanValue) -> ScanTarget {
        ScanTarget::Primary
    }

    fn on_primary(&self, ctx: &mut Ctx<'_>, value: &ScanValue, _origin: InputOrigin) -> Step {
        ctx.state.set_field(FieldId::Code, value.as_str());
        ctx.go(Phase::AwaitingSecondary, ScanTarget::Primary);
        if !value.is_barcode() || !self.settings.api_lookup_enabled() {
            return Step::Settle;
        }
        match self.settings.barcode_app_code() {
            Some(app_code) => Step::BarcodeInfo {
                barcode: value.to_string(),
                app_code,
            },
            None => {
                ctx.notify(Notice::CredentialRequired {
                    service: BARCODE_SERVICE.to_string(),
                });
                Step::Settle
            }
        }
    }

    fn on_lookup(&self, _ctx: &mut Ctx<'_>, key: &LookupKey, _result: LookupResult) {
        tracing::debug!("Add-Item ignores catalog result for {}", key);
    }

    fn on_barcode_info(&self, ctx: &mut Ctx<'_>, info: BarcodeInfo) -> Step {
        let mut filled = Vec::new();
        if !info.name.is_empty() {
            ctx.state.set_field(FieldId::Name, info.name);
            filled.push("name");
        }
        if !info.specs.is_empty() {
            ctx.state.set_field(FieldId::Specs, info.specs);
            filled.push("specs");
        }
        if let Some(price) = info.price {
            ctx.state.set_field(FieldId::Cost, price.to_string());
            filled.push("cost");
        }
        if let Some(link) = info.image_url {
            ctx.state.set_field(FieldId::Link, link);
            filled.push("link");
        }
        if filled.is_empty() {
            ctx.info("No product details for this barcode");
        } else {
            ctx.info(format!("Filled {}", filled.join(", ")));
        }
        Step::Settle
    }

    fn on_primary_edited(&self, ctx: &mut Ctx<'_>) {
        ctx.state.reset_lookup();
        ctx.go(Phase::AwaitingSecondary, ScanTarget::Primary);
    }

    fn submission(&self, state: &WorkflowState) -> Result<Submission, ValidationError> {
        let code = require(state, FieldId::Code)?;
        let name = require(state, FieldId::Name)?;
        let specs = require(state, FieldId::Specs)?;

        let cost = match state.value(FieldId::Cost) {
            Some(text) => Some(text.parse::<f64>().map_err(|_| ValidationError::InvalidNumber {
                field: FieldId::Cost.name().to_string(),
                value: text.to_string(),
            })?),
            None => None,
        };
        let stock = match state.value(FieldId::Stock) {
            Some(text) => Some(text.parse::<i64>().map_err(|_| ValidationError::InvalidNumber {
                field: FieldId::Stock.name().to_string(),
                value: text.to_string(),
            })?),
            None => None,
        };

        let barcode = match state.value(FieldId::Barcode) {
            Some(text) if !stockscan_core::is_barcode_shaped(text) => {
                return Err(ValidationError::InvalidBarcode {
                    value: text.to_string(),
                });
            }
            Some(text) => Some(text.to_string()),
            None => stockscan_core::is_barcode_shaped(&code).then(|| code.clone()),
        };

        Ok(Submission::Create(NewItem {
            code,
            name,
            specs,
            stock,
            location: state.value(FieldId::Location).map(str::to_string),
            cost,
            link: state.value(FieldId::Link).map(str::to_string),
            barcode,
        }))
    }
}
