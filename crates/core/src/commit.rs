use crate::clients::{ApprovalPayload, RejectPayload, WireGrant};
use crate::domain::claim::RedemptionType;
use crate::grants::GrantBasket;
use crate::preview::PreviewResult;

/// The `redemptionValue` string sent on approve.
///
/// Grant claims carry no monetary value. Discount claims send the last
/// preview's applied value at two decimals, falling back to `"0"` when the
/// preview carried no value, including when only a percent was applied.
pub fn redemption_value(
    redemption_type: RedemptionType,
    preview: Option<&PreviewResult>,
) -> String {
    if !redemption_type.is_discount() {
        return String::new();
    }

    preview
        .and_then(|result| result.applied.value)
        .map(|value| format!("{value:.2}"))
        .unwrap_or_else(|| "0".to_string())
}

/// Normalizes the grant selection into the flat wire shape. Unlike the
/// preview request, this includes bundle-typed lines.
pub fn wire_grants(grants: &GrantBasket) -> Option<Vec<WireGrant>> {
    let lines: Vec<WireGrant> = grants
        .selected()
        .iter()
        .map(|line| WireGrant { item_type: line.kind, id: line.id.clone(), quantity: line.qty })
        .collect();
    (!lines.is_empty()).then_some(lines)
}

pub fn build_approval_payload(
    redemption_type: RedemptionType,
    grants: &GrantBasket,
    note: &str,
    preview: Option<&PreviewResult>,
) -> ApprovalPayload {
    let note = note.trim();
    ApprovalPayload {
        redemption_value: redemption_value(redemption_type, preview),
        note: (!note.is_empty()).then(|| note.to_string()),
        grants: wire_grants(grants),
    }
}

pub fn build_reject_payload(reason: Option<&str>) -> RejectPayload {
    let reason = reason.map(str::trim).filter(|reason| !reason.is_empty());
    RejectPayload { reason: reason.map(str::to_string) }
}
