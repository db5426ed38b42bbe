use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::catalog::CatalogHit;
use crate::domain::claim::{ClaimId, ItemKind};
use crate::preview::{PreviewRequest, PreviewResult};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("{0}")]
    Rejected(String),
}

/// Grant line in the flat wire shape the approve endpoint expects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireGrant {
    pub item_type: ItemKind,
    pub id: String,
    pub quantity: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalPayload {
    pub redemption_value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grants: Option<Vec<WireGrant>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// The campaign backend's claim endpoints.
#[async_trait]
pub trait ClaimService: Send + Sync {
    async fn preview_redemption(
        &self,
        token: &SecretString,
        claim_id: &ClaimId,
        request: &PreviewRequest,
    ) -> Result<PreviewResult, ServiceError>;

    async fn approve_claim(
        &self,
        token: &SecretString,
        claim_id: &ClaimId,
        payload: &ApprovalPayload,
    ) -> Result<(), ServiceError>;

    async fn reject_claim(
        &self,
        token: &SecretString,
        claim_id: &ClaimId,
        payload: &RejectPayload,
    ) -> Result<(), ServiceError>;
}

/// Catalog lookups backing the cart and grant pickers. Grant-side
/// eligibility filtering is layered on top by the session, not here.
#[async_trait]
pub trait CatalogSearch: Send + Sync {
    async fn scope_products(
        &self,
        token: &SecretString,
        query: &str,
    ) -> Result<Vec<CatalogHit>, ServiceError>;

    async fn scope_bundles(
        &self,
        token: &SecretString,
        query: &str,
    ) -> Result<Vec<CatalogHit>, ServiceError>;

    async fn grant_products(
        &self,
        token: &SecretString,
        query: &str,
    ) -> Result<Vec<CatalogHit>, ServiceError>;

    async fn grant_bundles(
        &self,
        token: &SecretString,
        query: &str,
    ) -> Result<Vec<CatalogHit>, ServiceError>;
}

/// Supplies the bearer token every backend call requires. A `None` here is
/// a hard "not authenticated" failure before any network activity.
pub trait CredentialStore: Send + Sync {
    fn bearer_token(&self) -> Option<SecretString>;
}

#[derive(Clone, Debug, Default)]
pub struct StaticCredentialStore {
    token: Option<SecretString>,
}

impl StaticCredentialStore {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self { token: Some(token.into().into()) }
    }

    pub fn unauthenticated() -> Self {
        Self { token: None }
    }
}

impl CredentialStore for StaticCredentialStore {
    fn bearer_token(&self) -> Option<SecretString> {
        self.token.clone()
    }
}

/// Caller notification once a claim has been approved or rejected, so the
/// owning screen can refresh its feed.
pub trait CompletionSink: Send + Sync {
    fn claim_resolved(&self, claim_id: &ClaimId);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopCompletionSink;

impl CompletionSink for NoopCompletionSink {
    fn claim_resolved(&self, _claim_id: &ClaimId) {}
}

#[derive(Clone, Default)]
pub struct RecordingCompletionSink {
    resolved: Arc<Mutex<Vec<ClaimId>>>,
}

impl RecordingCompletionSink {
    pub fn resolved(&self) -> Vec<ClaimId> {
        match self.resolved.lock() {
            Ok(resolved) => resolved.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl CompletionSink for RecordingCompletionSink {
    fn claim_resolved(&self, claim_id: &ClaimId) {
        match self.resolved.lock() {
            Ok(mut resolved) => resolved.push(claim_id.clone()),
            Err(poisoned) => poisoned.into_inner().push(claim_id.clone()),
        }
    }
}

#[derive(Default)]
struct ScriptedState {
    preview_results: VecDeque<Result<PreviewResult, ServiceError>>,
    approve_results: VecDeque<Result<(), ServiceError>>,
    reject_results: VecDeque<Result<(), ServiceError>>,
    preview_requests: Vec<PreviewRequest>,
    approve_payloads: Vec<ApprovalPayload>,
    reject_payloads: Vec<RejectPayload>,
}

/// Scripted in-memory stand-in for the claim endpoints: responses are
/// popped in order, every request is recorded for assertions.
#[derive(Default)]
pub struct ScriptedClaimService {
    state: Mutex<ScriptedState>,
}

impl ScriptedClaimService {
    pub fn push_preview(&self, result: Result<PreviewResult, ServiceError>) {
        self.lock().preview_results.push_back(result);
    }

    pub fn push_approve(&self, result: Result<(), ServiceError>) {
        self.lock().approve_results.push_back(result);
    }

    pub fn push_reject(&self, result: Result<(), ServiceError>) {
        self.lock().reject_results.push_back(result);
    }

    pub fn preview_requests(&self) -> Vec<PreviewRequest> {
        self.lock().preview_requests.clone()
    }

    pub fn approve_payloads(&self) -> Vec<ApprovalPayload> {
        self.lock().approve_payloads.clone()
    }

    pub fn reject_payloads(&self) -> Vec<RejectPayload> {
        self.lock().reject_payloads.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ScriptedState> {
        match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl ClaimService for ScriptedClaimService {
    async fn preview_redemption(
        &self,
        _token: &SecretString,
        _claim_id: &ClaimId,
        request: &PreviewRequest,
    ) -> Result<PreviewResult, ServiceError> {
        let mut state = self.lock();
        state.preview_requests.push(request.clone());
        state
            .preview_results
            .pop_front()
            .unwrap_or_else(|| Err(ServiceError::Transport("no scripted preview".to_string())))
    }

    async fn approve_claim(
        &self,
        _token: &SecretString,
        _claim_id: &ClaimId,
        payload: &ApprovalPayload,
    ) -> Result<(), ServiceError> {
        let mut state = self.lock();
        state.approve_payloads.push(payload.clone());
        state.approve_results.pop_front().unwrap_or(Ok(()))
    }

    async fn reject_claim(
        &self,
        _token: &SecretString,
        _claim_id: &ClaimId,
        payload: &RejectPayload,
    ) -> Result<(), ServiceError> {
        let mut state = self.lock();
        state.reject_payloads.push(payload.clone());
        state.reject_results.pop_front().unwrap_or(Ok(()))
    }
}

/// Fixed catalog fake for the four search collaborators.
#[derive(Clone, Debug, Default)]
pub struct InMemoryCatalogSearch {
    pub scope_product_hits: Vec<CatalogHit>,
    pub scope_bundle_hits: Vec<CatalogHit>,
    pub grant_product_hits: Vec<CatalogHit>,
    pub grant_bundle_hits: Vec<CatalogHit>,
}

fn matching(hits: &[CatalogHit], query: &str) -> Vec<CatalogHit> {
    let query = query.trim().to_ascii_lowercase();
    hits.iter()
        .filter(|hit| query.is_empty() || hit.title.to_ascii_lowercase().contains(&query))
        .cloned()
        .collect()
}

#[async_trait]
impl CatalogSearch for InMemoryCatalogSearch {
    async fn scope_products(
        &self,
        _token: &SecretString,
        query: &str,
    ) -> Result<Vec<CatalogHit>, ServiceError> {
        Ok(matching(&self.scope_product_hits, query))
    }

    async fn scope_bundles(
        &self,
        _token: &SecretString,
        query: &str,
    ) -> Result<Vec<CatalogHit>, ServiceError> {
        Ok(matching(&self.scope_bundle_hits, query))
    }

    async fn grant_products(
        &self,
        _token: &SecretString,
        query: &str,
    ) -> Result<Vec<CatalogHit>, ServiceError> {
        Ok(matching(&self.grant_product_hits, query))
    }

    async fn grant_bundles(
        &self,
        _token: &SecretString,
        query: &str,
    ) -> Result<Vec<CatalogHit>, ServiceError> {
        Ok(matching(&self.grant_bundle_hits, query))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::domain::catalog::CatalogHit;
    use crate::domain::claim::ClaimId;
    use crate::preview::{AppliedBenefit, PreviewRequest, PreviewResult};

    use super::{
        CatalogSearch, ClaimService, InMemoryCatalogSearch, ScriptedClaimService, ServiceError,
    };

    fn token() -> secrecy::SecretString {
        "tok".to_string().into()
    }

    #[tokio::test]
    async fn scripted_service_replays_results_and_records_requests() {
        let service = ScriptedClaimService::default();
        service.push_preview(Ok(PreviewResult {
            eligible_subtotal: Decimal::new(1_000, 2),
            applied: AppliedBenefit::default(),
            next_tier_hint: None,
            final_total: None,
            can_approve: true,
        }));

        let request = PreviewRequest {
            redemption_type: crate::domain::claim::RedemptionType::FixedDiscount,
            bill_total: Some(Decimal::new(1_000, 2)),
            cart: None,
            selected_grants: None,
        };
        let result = service
            .preview_redemption(&token(), &ClaimId("clm-1".to_string()), &request)
            .await
            .expect("scripted success");

        assert!(result.can_approve);
        assert_eq!(service.preview_requests(), vec![request]);
    }

    #[tokio::test]
    async fn scripted_service_without_a_script_fails_previews() {
        let service = ScriptedClaimService::default();
        let request = PreviewRequest {
            redemption_type: crate::domain::claim::RedemptionType::Grant,
            bill_total: None,
            cart: None,
            selected_grants: None,
        };

        let error = service
            .preview_redemption(&token(), &ClaimId("clm-1".to_string()), &request)
            .await
            .expect_err("nothing scripted");
        assert!(matches!(error, ServiceError::Transport(_)));
    }

    #[tokio::test]
    async fn in_memory_catalog_matches_on_title() {
        let search = InMemoryCatalogSearch {
            scope_product_hits: vec![
                CatalogHit {
                    id: "p-1".to_string(),
                    title: "Espresso Beans".to_string(),
                    subtitle: None,
                    image_url: None,
                },
                CatalogHit {
                    id: "p-2".to_string(),
                    title: "Filter Paper".to_string(),
                    subtitle: None,
                    image_url: None,
                },
            ],
            ..InMemoryCatalogSearch::default()
        };

        let hits = search.scope_products(&token(), "espresso").await.expect("search");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "p-1");
    }
}
