use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::claim::{Claim, ClaimPolicy};

/// Inputs to the outer gate, evaluated strictly before a review session is
/// opened. The session itself never re-runs this check.
#[derive(Clone, Debug)]
pub struct GateInput<'a> {
    pub claim: &'a Claim,
    pub caller_can_approve: bool,
    pub busy: bool,
    pub now: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GateDenial {
    CallerNotPermitted,
    PolicyForbidsManualDecision { policy: ClaimPolicy },
    ClaimExpired { expired_at: DateTime<Utc> },
    ActionInFlight,
}

impl GateDenial {
    fn reason(&self) -> String {
        match self {
            Self::CallerNotPermitted => "caller is not permitted to settle claims".to_string(),
            Self::PolicyForbidsManualDecision { policy } => {
                format!("claim policy {policy:?} does not allow a manual decision")
            }
            Self::ClaimExpired { expired_at } => {
                format!("claim expired at {expired_at}")
            }
            Self::ActionInFlight => "another action on this claim is still running".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateDecision {
    pub enabled: bool,
    pub reason: String,
    pub denial: Option<GateDenial>,
}

impl GateDecision {
    fn allow(reason: impl Into<String>) -> Self {
        Self { enabled: true, reason: reason.into(), denial: None }
    }

    fn deny(denial: GateDenial) -> Self {
        Self { enabled: false, reason: denial.reason(), denial: Some(denial) }
    }
}

/// Whether the approval flow may be entered at all for this claim.
pub fn evaluate_gate(input: &GateInput<'_>) -> GateDecision {
    if !input.caller_can_approve {
        return GateDecision::deny(GateDenial::CallerNotPermitted);
    }

    if !input.claim.policy.allows_manual_decision() {
        return GateDecision::deny(GateDenial::PolicyForbidsManualDecision {
            policy: input.claim.policy,
        });
    }

    if let Some(expires_at) = input.claim.expires_at {
        if input.now >= expires_at {
            return GateDecision::deny(GateDenial::ClaimExpired { expired_at: expires_at });
        }
    }

    if input.busy {
        return GateDecision::deny(GateDenial::ActionInFlight);
    }

    GateDecision::allow(format!("claim `{}` is open for a manual decision", input.claim.id.0))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use crate::domain::claim::{
        Claim, ClaimId, ClaimPolicy, OfferId, RedemptionType, ScopeKind,
    };

    use super::{evaluate_gate, GateDenial, GateInput};

    fn claim(policy: ClaimPolicy) -> Claim {
        Claim {
            id: ClaimId("clm-1".to_string()),
            offer_id: OfferId("off-1".to_string()),
            redemption_type: RedemptionType::PercentageDiscount,
            scope_kind: ScopeKind::Any,
            policy,
            approval_pick_limit: 0,
            default_bill_total: None,
            existing_grants: Vec::new(),
            eligible_grant_items: Vec::new(),
            expires_at: None,
        }
    }

    #[test]
    fn manual_and_both_policies_admit_a_decision() {
        for policy in [ClaimPolicy::Manual, ClaimPolicy::Both] {
            let claim = claim(policy);
            let decision = evaluate_gate(&GateInput {
                claim: &claim,
                caller_can_approve: true,
                busy: false,
                now: Utc::now(),
            });
            assert!(decision.enabled, "policy {policy:?} should be enabled");
        }
    }

    #[test]
    fn auto_policy_is_denied() {
        let claim = claim(ClaimPolicy::Auto);
        let decision = evaluate_gate(&GateInput {
            claim: &claim,
            caller_can_approve: true,
            busy: false,
            now: Utc::now(),
        });

        assert_eq!(
            decision.denial,
            Some(GateDenial::PolicyForbidsManualDecision { policy: ClaimPolicy::Auto })
        );
    }

    #[test]
    fn expired_claims_are_denied() {
        let now = Utc::now();
        let expired_at = now - Duration::hours(1);
        let mut claim = claim(ClaimPolicy::Manual);
        claim.expires_at = Some(expired_at);

        let decision = evaluate_gate(&GateInput {
            claim: &claim,
            caller_can_approve: true,
            busy: false,
            now,
        });

        assert_eq!(decision.denial, Some(GateDenial::ClaimExpired { expired_at }));
    }

    #[test]
    fn unexpired_deadline_passes() {
        let now = Utc::now();
        let mut claim = claim(ClaimPolicy::Both);
        claim.expires_at = Some(now + Duration::hours(1));

        let decision = evaluate_gate(&GateInput {
            claim: &claim,
            caller_can_approve: true,
            busy: false,
            now,
        });
        assert!(decision.enabled);
    }

    #[test]
    fn permission_and_busy_checks_deny_independently() {
        let claim = claim(ClaimPolicy::Manual);

        let denied = evaluate_gate(&GateInput {
            claim: &claim,
            caller_can_approve: false,
            busy: false,
            now: Utc::now(),
        });
        assert_eq!(denied.denial, Some(GateDenial::CallerNotPermitted));

        let busy = evaluate_gate(&GateInput {
            claim: &claim,
            caller_can_approve: true,
            busy: true,
            now: Utc::now(),
        });
        assert_eq!(busy.denial, Some(GateDenial::ActionInFlight));
    }
}
