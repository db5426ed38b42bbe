use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClaimId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OfferId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RedemptionType {
    Grant,
    PercentageDiscount,
    FixedDiscount,
}

impl RedemptionType {
    pub fn is_discount(self) -> bool {
        matches!(self, Self::PercentageDiscount | Self::FixedDiscount)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScopeKind {
    Any,
    List,
}

/// How the owning offer allows claims to be settled. `Manual` and `Both`
/// admit an operator decision; `Auto` claims settle without one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimPolicy {
    Manual,
    Auto,
    Both,
}

impl ClaimPolicy {
    pub fn allows_manual_decision(self) -> bool {
        matches!(self, Self::Manual | Self::Both)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemKind {
    Product,
    Bundle,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibleGrantItem {
    pub kind: ItemKind,
    pub id: String,
    pub default_qty: Option<u32>,
}

/// A grant already recorded on the claim before this review session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingGrant {
    pub kind: ItemKind,
    pub id: String,
    pub qty: u32,
}

/// Static context for one approval session. Immutable for the lifetime of
/// the session and re-supplied fresh each time the flow is opened.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub id: ClaimId,
    pub offer_id: OfferId,
    pub redemption_type: RedemptionType,
    pub scope_kind: ScopeKind,
    pub policy: ClaimPolicy,
    pub approval_pick_limit: u32,
    pub default_bill_total: Option<Decimal>,
    pub existing_grants: Vec<ExistingGrant>,
    pub eligible_grant_items: Vec<EligibleGrantItem>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Claim {
    /// Whether the operator must assemble a grant selection before approval.
    pub fn needs_grant_picker(&self) -> bool {
        self.redemption_type == RedemptionType::Grant && self.approval_pick_limit > 0
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::{Claim, ClaimId, ClaimPolicy, OfferId, RedemptionType, ScopeKind};

    fn claim(redemption_type: RedemptionType, approval_pick_limit: u32) -> Claim {
        Claim {
            id: ClaimId("clm-1".to_string()),
            offer_id: OfferId("off-1".to_string()),
            redemption_type,
            scope_kind: ScopeKind::Any,
            policy: ClaimPolicy::Manual,
            approval_pick_limit,
            default_bill_total: None,
            existing_grants: Vec::new(),
            eligible_grant_items: Vec::new(),
            expires_at: None,
        }
    }

    #[test]
    fn grant_claims_with_a_pick_limit_need_the_picker() {
        assert!(claim(RedemptionType::Grant, 2).needs_grant_picker());
        assert!(!claim(RedemptionType::Grant, 0).needs_grant_picker());
        assert!(!claim(RedemptionType::PercentageDiscount, 2).needs_grant_picker());
    }

    #[test]
    fn expiry_is_checked_against_the_supplied_clock() {
        let now = Utc::now();
        let mut claim = claim(RedemptionType::FixedDiscount, 0);
        assert!(!claim.is_expired(now));

        claim.expires_at = Some(now - Duration::minutes(1));
        assert!(claim.is_expired(now));

        claim.expires_at = Some(now + Duration::minutes(1));
        assert!(!claim.is_expired(now));
    }
}
