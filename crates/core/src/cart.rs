use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::catalog::CatalogItem;
use crate::domain::claim::ScopeKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowId(pub u64);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartRow {
    pub id: RowId,
    pub item: CatalogItem,
    pub qty: u32,
    pub unit_price: Option<Decimal>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CartError {
    #[error("cart row {0:?} does not exist")]
    UnknownRow(RowId),
}

/// Purchase facts for one approval session: either a single bill total
/// (`Any` scope) or itemized rows with an optional bill-total overlay
/// (`List` scope). Rows are unique by `(kind, id)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    scope_kind: ScopeKind,
    rows: Vec<CartRow>,
    bill_total: Option<Decimal>,
    next_row_id: u64,
}

impl Cart {
    pub fn seeded(scope_kind: ScopeKind, default_bill_total: Option<Decimal>) -> Self {
        Self { scope_kind, rows: Vec::new(), bill_total: default_bill_total, next_row_id: 1 }
    }

    pub fn scope_kind(&self) -> ScopeKind {
        self.scope_kind
    }

    pub fn rows(&self) -> &[CartRow] {
        &self.rows
    }

    pub fn bill_total(&self) -> Option<Decimal> {
        self.bill_total
    }

    pub fn set_bill_total(&mut self, total: Option<Decimal>) {
        self.bill_total = total;
    }

    /// Adds an item, or increments the quantity of the row already holding
    /// the same `(kind, id)`. Returns the id of the affected row.
    pub fn add_or_increment(&mut self, item: CatalogItem) -> RowId {
        if let Some(row) =
            self.rows.iter_mut().find(|row| row.item.kind == item.kind && row.item.id == item.id)
        {
            row.qty = row.qty.saturating_add(1);
            return row.id;
        }

        let id = RowId(self.next_row_id);
        self.next_row_id += 1;
        self.rows.push(CartRow { id, item, qty: 1, unit_price: None });
        id
    }

    pub fn set_row_qty(&mut self, row_id: RowId, qty: u32) -> Result<(), CartError> {
        self.row_mut(row_id)?.qty = qty;
        Ok(())
    }

    pub fn set_row_unit_price(&mut self, row_id: RowId, price: Decimal) -> Result<(), CartError> {
        self.row_mut(row_id)?.unit_price = Some(price);
        Ok(())
    }

    pub fn remove_row(&mut self, row_id: RowId) -> Result<(), CartError> {
        let index = self
            .rows
            .iter()
            .position(|row| row.id == row_id)
            .ok_or(CartError::UnknownRow(row_id))?;
        self.rows.remove(index);
        Ok(())
    }

    /// Σ qty × unit_price over all rows; rows without a price contribute 0.
    pub fn subtotal(&self) -> Decimal {
        self.rows
            .iter()
            .map(|row| row.unit_price.unwrap_or(Decimal::ZERO) * Decimal::from(row.qty))
            .sum()
    }

    pub fn has_countable_row(&self) -> bool {
        self.rows.iter().any(|row| row.qty > 0)
    }

    /// The total-purchase figure for display: the explicit bill total when
    /// set, else the itemized subtotal under `List` scope.
    pub fn effective_total(&self) -> Option<Decimal> {
        match (self.bill_total, self.scope_kind) {
            (Some(total), _) => Some(total),
            (None, ScopeKind::List) => Some(self.subtotal()),
            (None, ScopeKind::Any) => None,
        }
    }

    fn row_mut(&mut self, row_id: RowId) -> Result<&mut CartRow, CartError> {
        self.rows.iter_mut().find(|row| row.id == row_id).ok_or(CartError::UnknownRow(row_id))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::domain::catalog::CatalogItem;
    use crate::domain::claim::{ItemKind, ScopeKind};

    use super::{Cart, CartError, RowId};

    fn item(kind: ItemKind, id: &str) -> CatalogItem {
        CatalogItem {
            kind,
            id: id.to_string(),
            title: format!("item {id}"),
            subtitle: None,
            image_url: None,
        }
    }

    #[test]
    fn re_adding_the_same_item_increments_the_existing_row() {
        let mut cart = Cart::seeded(ScopeKind::List, None);
        let first = cart.add_or_increment(item(ItemKind::Product, "p-1"));
        let second = cart.add_or_increment(item(ItemKind::Product, "p-1"));

        assert_eq!(first, second);
        assert_eq!(cart.rows().len(), 1);
        assert_eq!(cart.rows()[0].qty, 2);
    }

    #[test]
    fn same_id_under_a_different_kind_gets_its_own_row() {
        let mut cart = Cart::seeded(ScopeKind::List, None);
        cart.add_or_increment(item(ItemKind::Product, "x-9"));
        cart.add_or_increment(item(ItemKind::Bundle, "x-9"));

        assert_eq!(cart.rows().len(), 2);
    }

    #[test]
    fn subtotal_ignores_rows_without_a_price() {
        let mut cart = Cart::seeded(ScopeKind::List, None);
        let priced = cart.add_or_increment(item(ItemKind::Product, "p-1"));
        cart.add_or_increment(item(ItemKind::Product, "p-2"));
        cart.set_row_qty(priced, 3).expect("row exists");
        cart.set_row_unit_price(priced, Decimal::new(1_250, 2)).expect("row exists");

        assert_eq!(cart.subtotal(), Decimal::new(3_750, 2));
    }

    #[test]
    fn effective_total_prefers_the_explicit_bill_total() {
        let mut cart = Cart::seeded(ScopeKind::List, None);
        let row = cart.add_or_increment(item(ItemKind::Product, "p-1"));
        cart.set_row_unit_price(row, Decimal::new(2_000, 2)).expect("row exists");

        assert_eq!(cart.effective_total(), Some(Decimal::new(2_000, 2)));

        cart.set_bill_total(Some(Decimal::new(9_999, 2)));
        assert_eq!(cart.effective_total(), Some(Decimal::new(9_999, 2)));
    }

    #[test]
    fn any_scope_has_no_fallback_total() {
        let cart = Cart::seeded(ScopeKind::Any, None);
        assert_eq!(cart.effective_total(), None);
    }

    #[test]
    fn removing_an_unknown_row_is_an_error() {
        let mut cart = Cart::seeded(ScopeKind::List, None);
        let error = cart.remove_row(RowId(42)).expect_err("row does not exist");
        assert_eq!(error, CartError::UnknownRow(RowId(42)));
    }

    #[test]
    fn removal_leaves_the_remaining_rows_intact() {
        let mut cart = Cart::seeded(ScopeKind::List, None);
        let first = cart.add_or_increment(item(ItemKind::Product, "p-1"));
        cart.add_or_increment(item(ItemKind::Bundle, "b-1"));

        cart.remove_row(first).expect("row exists");
        assert_eq!(cart.rows().len(), 1);
        assert_eq!(cart.rows()[0].item.id, "b-1");
    }
}
