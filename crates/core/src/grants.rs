use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::catalog::CatalogHit;
use crate::domain::claim::{Claim, ItemKind};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantLine {
    pub kind: ItemKind,
    pub id: String,
    pub qty: u32,
    pub default_qty_hint: Option<u32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectOutcome {
    Added,
    AlreadySelected,
    BasketFull,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GrantError {
    #[error("grant selection is read-only for this claim")]
    ReadOnly,
    #[error("{kind:?} `{id}` is not eligible for this offer")]
    Ineligible { kind: ItemKind, id: String },
    #[error("{kind:?} `{id}` is not part of the current selection")]
    UnknownSelection { kind: ItemKind, id: String },
}

/// The set of free items a grant-type claim will award. Selections are
/// unique by `(kind, id)` and capped at the claim's pick limit. When the
/// limit is zero but the claim already carries grants, the basket is
/// read-only: existing grants are shown but cannot be edited or extended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantBasket {
    lines: Vec<GrantLine>,
    required: u32,
    read_only: bool,
    eligible_products: HashSet<String>,
    eligible_bundles: HashSet<String>,
    default_qty: Vec<(ItemKind, String, u32)>,
}

impl GrantBasket {
    pub fn seeded(claim: &Claim) -> Self {
        let read_only = claim.approval_pick_limit == 0 && !claim.existing_grants.is_empty();

        let mut eligible_products = HashSet::new();
        let mut eligible_bundles = HashSet::new();
        let mut default_qty = Vec::new();
        for item in &claim.eligible_grant_items {
            match item.kind {
                ItemKind::Product => eligible_products.insert(item.id.clone()),
                ItemKind::Bundle => eligible_bundles.insert(item.id.clone()),
            };
            if let Some(qty) = item.default_qty {
                default_qty.push((item.kind, item.id.clone(), qty));
            }
        }

        let lines = claim
            .existing_grants
            .iter()
            .map(|grant| GrantLine {
                kind: grant.kind,
                id: grant.id.clone(),
                qty: grant.qty,
                default_qty_hint: None,
            })
            .collect();

        Self {
            lines,
            required: claim.approval_pick_limit,
            read_only,
            eligible_products,
            eligible_bundles,
            default_qty,
        }
    }

    pub fn selected(&self) -> &[GrantLine] {
        &self.lines
    }

    pub fn required(&self) -> u32 {
        self.required
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn is_full(&self) -> bool {
        self.required > 0 && self.lines.len() as u32 >= self.required
    }

    /// Eligibility check, filtered independently per item kind. An empty
    /// allow-list admits everything.
    pub fn is_eligible(&self, kind: ItemKind, id: &str) -> bool {
        let allow_list = match kind {
            ItemKind::Product => &self.eligible_products,
            ItemKind::Bundle => &self.eligible_bundles,
        };
        if self.eligible_products.is_empty() && self.eligible_bundles.is_empty() {
            return true;
        }
        allow_list.contains(id)
    }

    /// Applies the eligibility allow-list on top of raw picker results. The
    /// fetchers themselves do no filtering.
    pub fn filter_eligible(&self, kind: ItemKind, hits: Vec<CatalogHit>) -> Vec<CatalogHit> {
        hits.into_iter().filter(|hit| self.is_eligible(kind, &hit.id)).collect()
    }

    pub fn select(&mut self, kind: ItemKind, id: &str) -> Result<SelectOutcome, GrantError> {
        if self.read_only {
            return Err(GrantError::ReadOnly);
        }
        if !self.is_eligible(kind, id) {
            return Err(GrantError::Ineligible { kind, id: id.to_string() });
        }
        if self.lines.iter().any(|line| line.kind == kind && line.id == id) {
            return Ok(SelectOutcome::AlreadySelected);
        }
        if self.is_full() {
            return Ok(SelectOutcome::BasketFull);
        }

        let hint = self.default_qty_for(kind, id);
        self.lines.push(GrantLine {
            kind,
            id: id.to_string(),
            qty: hint.unwrap_or(1),
            default_qty_hint: hint,
        });
        Ok(SelectOutcome::Added)
    }

    pub fn deselect(&mut self, kind: ItemKind, id: &str) -> Result<(), GrantError> {
        if self.read_only {
            return Err(GrantError::ReadOnly);
        }
        let index = self
            .lines
            .iter()
            .position(|line| line.kind == kind && line.id == id)
            .ok_or_else(|| GrantError::UnknownSelection { kind, id: id.to_string() })?;
        self.lines.remove(index);
        Ok(())
    }

    pub fn set_qty(&mut self, kind: ItemKind, id: &str, qty: u32) -> Result<(), GrantError> {
        if self.read_only {
            return Err(GrantError::ReadOnly);
        }
        let line = self
            .lines
            .iter_mut()
            .find(|line| line.kind == kind && line.id == id)
            .ok_or_else(|| GrantError::UnknownSelection { kind, id: id.to_string() })?;
        line.qty = qty;
        Ok(())
    }

    pub fn count_matches_required(&self) -> bool {
        self.required == 0 || self.lines.len() as u32 == self.required
    }

    pub fn all_selected_eligible(&self) -> bool {
        self.lines.iter().all(|line| self.is_eligible(line.kind, &line.id))
    }

    fn default_qty_for(&self, kind: ItemKind, id: &str) -> Option<u32> {
        self.default_qty
            .iter()
            .find(|(item_kind, item_id, _)| *item_kind == kind && item_id == id)
            .map(|(_, _, qty)| *qty)
    }
}
