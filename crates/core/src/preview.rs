use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cart::Cart;
use crate::domain::claim::{Claim, ItemKind, RedemptionType, ScopeKind};
use crate::grants::GrantBasket;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedGrant {
    pub item_type: ItemKind,
    pub id: String,
    pub quantity: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedBenefit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grants: Option<Vec<AppliedGrant>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextTierHint {
    pub spend_more: Decimal,
    pub next_percent: Decimal,
}

/// Server-computed redemption outcome for the inputs as they were at
/// request time. Any later input mutation makes it stale.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResult {
    pub eligible_subtotal: Decimal,
    pub applied: AppliedBenefit,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_tier_hint: Option<NextTierHint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_total: Option<Decimal>,
    pub can_approve: bool,
}

/// Lifecycle of the preview for one session. `Stale` keeps the superseded
/// result for display; only `Ready` can gate approval.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PreviewState {
    NoPreview,
    Previewing,
    Ready(PreviewResult),
    Stale(PreviewResult),
    Failed(String),
}

impl PreviewState {
    pub fn approvable(&self) -> Option<&PreviewResult> {
        match self {
            Self::Ready(result) if result.can_approve => Some(result),
            _ => None,
        }
    }

    /// The most recent result, fresh or stale, for rendering.
    pub fn last_result(&self) -> Option<&PreviewResult> {
        match self {
            Self::Ready(result) | Self::Stale(result) => Some(result),
            Self::NoPreview | Self::Previewing | Self::Failed(_) => None,
        }
    }

    pub fn is_previewing(&self) -> bool {
        matches!(self, Self::Previewing)
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale(_))
    }

    /// Input mutation: a fresh result is demoted to stale, everything else
    /// is left alone.
    pub fn marked_stale(self) -> Self {
        match self {
            Self::Ready(result) => Self::Stale(result),
            other => other,
        }
    }
}

/// Reference to a catalog item in wire form: `{"productId": …}` or
/// `{"bundleId": …}`, flattened into the enclosing line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireItemRef {
    #[serde(rename = "productId")]
    Product(String),
    #[serde(rename = "bundleId")]
    Bundle(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewCartLine {
    #[serde(flatten)]
    pub item: WireItemRef,
    pub qty: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Decimal>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewGrantLine {
    pub product_id: String,
    pub qty: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    pub redemption_type: RedemptionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bill_total: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cart: Option<Vec<PreviewCartLine>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_grants: Option<Vec<PreviewGrantLine>>,
}

/// Serializes the current inputs into the pricing-service request.
///
/// Bundle-typed grant lines are selectable and approvable but are not sent
/// here; only product grants reach the preview computation.
pub fn build_preview_request(claim: &Claim, cart: &Cart, grants: &GrantBasket) -> PreviewRequest {
    let bill_total = cart.bill_total().filter(|total| *total > Decimal::ZERO);

    let cart_lines = match claim.scope_kind {
        ScopeKind::List => Some(
            cart.rows()
                .iter()
                .map(|row| PreviewCartLine {
                    item: match row.item.kind {
                        ItemKind::Product => WireItemRef::Product(row.item.id.clone()),
                        ItemKind::Bundle => WireItemRef::Bundle(row.item.id.clone()),
                    },
                    qty: row.qty,
                    unit_price: row.unit_price,
                })
                .collect(),
        ),
        ScopeKind::Any => None,
    };

    let product_grants: Vec<PreviewGrantLine> = grants
        .selected()
        .iter()
        .filter(|line| line.kind == ItemKind::Product)
        .map(|line| PreviewGrantLine { product_id: line.id.clone(), qty: line.qty })
        .collect();
    let selected_grants = (!product_grants.is_empty()).then_some(product_grants);

    PreviewRequest {
        redemption_type: claim.redemption_type,
        bill_total,
        cart: cart_lines,
        selected_grants,
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use crate::cart::Cart;
    use crate::domain::catalog::CatalogItem;
    use crate::domain::claim::{
        Claim, ClaimId, ClaimPolicy, ItemKind, OfferId, RedemptionType, ScopeKind,
    };
    use crate::grants::GrantBasket;

    use super::{build_preview_request, AppliedBenefit, PreviewResult, PreviewState};

    fn claim(scope_kind: ScopeKind, redemption_type: RedemptionType, pick_limit: u32) -> Claim {
        Claim {
            id: ClaimId("clm-1".to_string()),
            offer_id: OfferId("off-1".to_string()),
            redemption_type,
            scope_kind,
            policy: ClaimPolicy::Manual,
            approval_pick_limit: pick_limit,
            default_bill_total: None,
            existing_grants: Vec::new(),
            eligible_grant_items: Vec::new(),
            expires_at: None,
        }
    }

    fn item(kind: ItemKind, id: &str) -> CatalogItem {
        CatalogItem {
            kind,
            id: id.to_string(),
            title: id.to_string(),
            subtitle: None,
            image_url: None,
        }
    }

    fn result(can_approve: bool) -> PreviewResult {
        PreviewResult {
            eligible_subtotal: Decimal::new(10_000, 2),
            applied: AppliedBenefit::default(),
            next_tier_hint: None,
            final_total: None,
            can_approve,
        }
    }

    #[test]
    fn zero_bill_total_is_omitted_from_the_request() {
        let claim = claim(ScopeKind::Any, RedemptionType::PercentageDiscount, 0);
        let grants = GrantBasket::seeded(&claim);
        let mut cart = Cart::seeded(ScopeKind::Any, Some(Decimal::ZERO));

        let request = build_preview_request(&claim, &cart, &grants);
        assert_eq!(request.bill_total, None);

        cart.set_bill_total(Some(Decimal::new(2_500, 2)));
        let request = build_preview_request(&claim, &cart, &grants);
        assert_eq!(request.bill_total, Some(Decimal::new(2_500, 2)));
    }

    #[test]
    fn cart_lines_are_sent_only_under_list_scope() {
        let any_claim = claim(ScopeKind::Any, RedemptionType::FixedDiscount, 0);
        let grants = GrantBasket::seeded(&any_claim);
        let mut cart = Cart::seeded(ScopeKind::Any, Some(Decimal::new(1_000, 2)));
        cart.add_or_increment(item(ItemKind::Product, "p-1"));

        assert_eq!(build_preview_request(&any_claim, &cart, &grants).cart, None);

        let list_claim = claim(ScopeKind::List, RedemptionType::FixedDiscount, 0);
        let mut cart = Cart::seeded(ScopeKind::List, None);
        let row = cart.add_or_increment(item(ItemKind::Product, "p-1"));
        cart.set_row_unit_price(row, Decimal::new(999, 2)).expect("row exists");

        let request = build_preview_request(&list_claim, &cart, &grants);
        let lines = request.cart.expect("list scope sends the cart");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].qty, 1);
    }

    #[test]
    fn cart_lines_serialize_with_a_kind_discriminated_id_field() {
        let list_claim = claim(ScopeKind::List, RedemptionType::FixedDiscount, 0);
        let grants = GrantBasket::seeded(&list_claim);
        let mut cart = Cart::seeded(ScopeKind::List, None);
        cart.add_or_increment(item(ItemKind::Product, "p-1"));
        cart.add_or_increment(item(ItemKind::Bundle, "b-1"));

        let request = build_preview_request(&list_claim, &cart, &grants);
        let wire = serde_json::to_value(&request).expect("serializes");

        assert_eq!(wire["cart"][0], json!({ "productId": "p-1", "qty": 1 }));
        assert_eq!(wire["cart"][1], json!({ "bundleId": "b-1", "qty": 1 }));
    }

    #[test]
    fn bundle_grants_are_excluded_from_the_preview_request() {
        let grant_claim = claim(ScopeKind::Any, RedemptionType::Grant, 2);
        let mut grants = GrantBasket::seeded(&grant_claim);
        grants.select(ItemKind::Product, "p-1").expect("select product");
        grants.select(ItemKind::Bundle, "b-1").expect("select bundle");
        let cart = Cart::seeded(ScopeKind::Any, Some(Decimal::new(1_000, 2)));

        let request = build_preview_request(&grant_claim, &cart, &grants);
        let sent = request.selected_grants.expect("product grant is sent");

        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].product_id, "p-1");
    }

    #[test]
    fn bundle_only_selection_sends_no_grants_field() {
        let grant_claim = claim(ScopeKind::Any, RedemptionType::Grant, 1);
        let mut grants = GrantBasket::seeded(&grant_claim);
        grants.select(ItemKind::Bundle, "b-1").expect("select bundle");
        let cart = Cart::seeded(ScopeKind::Any, Some(Decimal::new(1_000, 2)));

        let request = build_preview_request(&grant_claim, &cart, &grants);
        assert_eq!(request.selected_grants, None);
    }

    #[test]
    fn only_a_fresh_result_is_demoted_by_mutation() {
        let fresh = PreviewState::Ready(result(true));
        assert_eq!(fresh.marked_stale(), PreviewState::Stale(result(true)));

        assert_eq!(PreviewState::NoPreview.marked_stale(), PreviewState::NoPreview);
        assert_eq!(
            PreviewState::Failed("boom".to_string()).marked_stale(),
            PreviewState::Failed("boom".to_string())
        );
    }

    #[test]
    fn stale_results_are_displayable_but_never_approvable() {
        let stale = PreviewState::Stale(result(true));
        assert!(stale.last_result().is_some());
        assert!(stale.approvable().is_none());
    }

    #[test]
    fn ready_result_gates_approval_on_the_server_verdict() {
        assert!(PreviewState::Ready(result(true)).approvable().is_some());
        assert!(PreviewState::Ready(result(false)).approvable().is_none());
    }
}
