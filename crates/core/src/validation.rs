use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cart::Cart;
use crate::domain::claim::{Claim, ItemKind, ScopeKind};
use crate::grants::GrantBasket;

/// A single recoverable input problem, surfaced inline next to the control
/// it belongs to.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationIssue {
    #[error("a bill total greater than zero is required")]
    MissingBillTotal,
    #[error("at least one purchase line with a quantity is required")]
    EmptyCart,
    #[error("{selected} of {required} required free items selected")]
    GrantCountMismatch { selected: u32, required: u32 },
    #[error("{kind:?} `{id}` is not eligible for this offer")]
    IneligibleGrant { kind: ItemKind, id: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub has_valid_any: bool,
    pub has_valid_list: bool,
    pub grant_count_ok: bool,
    pub all_eligible: bool,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn inputs_valid(&self) -> bool {
        self.has_valid_any && self.has_valid_list && self.grant_count_ok && self.all_eligible
    }
}

/// Pure function of the claim parameters and the two input models,
/// recomputed on every state change.
pub fn validate_inputs(claim: &Claim, cart: &Cart, grants: &GrantBasket) -> ValidationReport {
    let mut issues = Vec::new();

    let has_valid_any = claim.scope_kind != ScopeKind::Any
        || cart.bill_total().is_some_and(|total| total > Decimal::ZERO);
    if !has_valid_any {
        issues.push(ValidationIssue::MissingBillTotal);
    }

    let has_valid_list = claim.scope_kind != ScopeKind::List || cart.has_countable_row();
    if !has_valid_list {
        issues.push(ValidationIssue::EmptyCart);
    }

    let grant_count_ok = !claim.needs_grant_picker() || grants.count_matches_required();
    if !grant_count_ok {
        issues.push(ValidationIssue::GrantCountMismatch {
            selected: grants.selected().len() as u32,
            required: grants.required(),
        });
    }

    let mut all_eligible = true;
    for line in grants.selected() {
        if !grants.is_eligible(line.kind, &line.id) {
            all_eligible = false;
            issues.push(ValidationIssue::IneligibleGrant { kind: line.kind, id: line.id.clone() });
        }
    }

    ValidationReport { has_valid_any, has_valid_list, grant_count_ok, all_eligible, issues }
}
