use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::SecretString;

use crate::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink};
use crate::cart::{Cart, CartRow, RowId};
use crate::clients::{CatalogSearch, ClaimService, CompletionSink, CredentialStore};
use crate::commit::{build_approval_payload, build_reject_payload};
use crate::domain::catalog::{CatalogHit, CatalogItem};
use crate::domain::claim::{Claim, ClaimId, ItemKind};
use crate::errors::{ActionKind, FlowError};
use crate::grants::{GrantBasket, GrantLine, SelectOutcome};
use crate::preview::{build_preview_request, PreviewResult, PreviewState};
use crate::search::DebouncedSearch;
use crate::validation::{validate_inputs, ValidationReport};

/// External collaborators one approval session talks to.
#[derive(Clone)]
pub struct FlowCollaborators {
    pub service: Arc<dyn ClaimService>,
    pub search: Arc<dyn CatalogSearch>,
    pub credentials: Arc<dyn CredentialStore>,
    pub completion: Arc<dyn CompletionSink>,
    pub audit: Arc<dyn AuditSink>,
}

struct SessionState {
    claim: Claim,
    cart: Cart,
    grants: GrantBasket,
    note: String,
    preview: PreviewState,
    preview_busy: bool,
    approve_busy: bool,
    reject_busy: bool,
    /// Bumped on every input mutation; a preview reply carrying an older
    /// revision lands stale instead of fresh.
    revision: u64,
    /// Bumped on close; a reply carrying an older generation is discarded.
    generation: u64,
    closed: bool,
}

/// Everything a rendering layer needs about the session, in one copy.
#[derive(Clone, Debug)]
pub struct FlowSnapshot {
    pub claim_id: ClaimId,
    pub rows: Vec<CartRow>,
    pub bill_total: Option<Decimal>,
    pub effective_total: Option<Decimal>,
    pub grants: Vec<GrantLine>,
    pub grants_read_only: bool,
    pub note: String,
    pub preview: PreviewState,
    pub validation: ValidationReport,
    pub preview_busy: bool,
    pub approve_busy: bool,
    pub reject_busy: bool,
}

#[derive(Clone, Copy)]
struct ActionTicket {
    generation: u64,
    revision: u64,
}

/// One claim review session: owns a disposable copy of all input state,
/// serializes previews, and commits the final decision.
///
/// The outer policy gate decides whether a session may be opened at all;
/// the session trusts that check and never repeats it.
pub struct ApprovalFlow {
    state: Arc<Mutex<SessionState>>,
    service: Arc<dyn ClaimService>,
    search: Arc<dyn CatalogSearch>,
    credentials: Arc<dyn CredentialStore>,
    completion: Arc<dyn CompletionSink>,
    audit: Arc<dyn AuditSink>,
    scope_product_search: DebouncedSearch,
    scope_bundle_search: DebouncedSearch,
    grant_product_search: DebouncedSearch,
    grant_bundle_search: DebouncedSearch,
}

impl ApprovalFlow {
    pub fn open(claim: Claim, collaborators: FlowCollaborators) -> Self {
        Self::open_with_debounce(claim, collaborators, crate::search::DEFAULT_DEBOUNCE)
    }

    pub fn open_with_debounce(
        claim: Claim,
        collaborators: FlowCollaborators,
        search_debounce: Duration,
    ) -> Self {
        let cart = Cart::seeded(claim.scope_kind, claim.default_bill_total);
        let grants = GrantBasket::seeded(&claim);
        let claim_id = claim.id.clone();

        let flow = Self {
            state: Arc::new(Mutex::new(SessionState {
                claim,
                cart,
                grants,
                note: String::new(),
                preview: PreviewState::NoPreview,
                preview_busy: false,
                approve_busy: false,
                reject_busy: false,
                revision: 0,
                generation: 0,
                closed: false,
            })),
            service: collaborators.service,
            search: collaborators.search,
            credentials: collaborators.credentials,
            completion: collaborators.completion,
            audit: collaborators.audit,
            scope_product_search: DebouncedSearch::new(search_debounce),
            scope_bundle_search: DebouncedSearch::new(search_debounce),
            grant_product_search: DebouncedSearch::new(search_debounce),
            grant_bundle_search: DebouncedSearch::new(search_debounce),
        };

        flow.audit.emit(AuditEvent::new(
            claim_id,
            "session.opened",
            AuditCategory::Session,
            AuditOutcome::Success,
        ));
        flow
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn close(&self) {
        let claim_id = {
            let mut state = self.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            state.generation += 1;
            state.preview = PreviewState::NoPreview;
            state.preview_busy = false;
            state.approve_busy = false;
            state.reject_busy = false;
            state.claim.id.clone()
        };

        self.audit.emit(AuditEvent::new(
            claim_id,
            "session.closed",
            AuditCategory::Session,
            AuditOutcome::Success,
        ));
    }

    pub fn snapshot(&self) -> FlowSnapshot {
        let state = self.lock();
        FlowSnapshot {
            claim_id: state.claim.id.clone(),
            rows: state.cart.rows().to_vec(),
            bill_total: state.cart.bill_total(),
            effective_total: state.cart.effective_total(),
            grants: state.grants.selected().to_vec(),
            grants_read_only: state.grants.is_read_only(),
            note: state.note.clone(),
            preview: state.preview.clone(),
            validation: validate_inputs(&state.claim, &state.cart, &state.grants),
            preview_busy: state.preview_busy,
            approve_busy: state.approve_busy,
            reject_busy: state.reject_busy,
        }
    }

    pub fn validation(&self) -> ValidationReport {
        let state = self.lock();
        validate_inputs(&state.claim, &state.cart, &state.grants)
    }

    pub fn preview_state(&self) -> PreviewState {
        self.lock().preview.clone()
    }

    // --- input mutations; each successful one invalidates a fresh preview ---

    pub fn add_cart_item(&self, item: CatalogItem) -> Result<RowId, FlowError> {
        self.mutate(|state| Ok(state.cart.add_or_increment(item)))
    }

    pub fn set_cart_row_qty(&self, row_id: RowId, qty: u32) -> Result<(), FlowError> {
        self.mutate(|state| state.cart.set_row_qty(row_id, qty).map_err(FlowError::from))
    }

    pub fn set_cart_row_unit_price(&self, row_id: RowId, price: Decimal) -> Result<(), FlowError> {
        self.mutate(|state| state.cart.set_row_unit_price(row_id, price).map_err(FlowError::from))
    }

    pub fn remove_cart_row(&self, row_id: RowId) -> Result<(), FlowError> {
        self.mutate(|state| state.cart.remove_row(row_id).map_err(FlowError::from))
    }

    pub fn set_bill_total(&self, total: Option<Decimal>) -> Result<(), FlowError> {
        self.mutate(|state| {
            state.cart.set_bill_total(total);
            Ok(())
        })
    }

    pub fn select_grant(&self, kind: ItemKind, id: &str) -> Result<SelectOutcome, FlowError> {
        let mut state = self.lock();
        if state.closed {
            return Err(FlowError::Closed);
        }
        let outcome = state.grants.select(kind, id)?;
        if outcome == SelectOutcome::Added {
            touch(&mut state);
        }
        Ok(outcome)
    }

    pub fn deselect_grant(&self, kind: ItemKind, id: &str) -> Result<(), FlowError> {
        self.mutate(|state| state.grants.deselect(kind, id).map_err(FlowError::from))
    }

    pub fn set_grant_qty(&self, kind: ItemKind, id: &str, qty: u32) -> Result<(), FlowError> {
        self.mutate(|state| state.grants.set_qty(kind, id, qty).map_err(FlowError::from))
    }

    pub fn set_note(&self, note: &str) -> Result<(), FlowError> {
        self.mutate(|state| {
            state.note = note.to_string();
            Ok(())
        })
    }

    // --- preview ---

    /// Serializes the current inputs and asks the pricing service for a
    /// redemption preview. Invalid inputs fail locally; no call is issued.
    pub async fn request_preview(&self) -> Result<PreviewResult, FlowError> {
        let (token, claim_id, request, ticket) = {
            let mut state = self.lock();
            if state.closed {
                return Err(FlowError::Closed);
            }
            if state.preview_busy {
                return Err(FlowError::Busy(ActionKind::Preview));
            }

            let report = validate_inputs(&state.claim, &state.cart, &state.grants);
            if !report.inputs_valid() {
                let claim_id = state.claim.id.clone();
                drop(state);
                self.audit.emit(AuditEvent::new(
                    claim_id,
                    "preview.requested",
                    AuditCategory::Preview,
                    AuditOutcome::Rejected,
                ));
                return Err(FlowError::InvalidInputs(report.issues));
            }

            let Some(token) = self.credentials.bearer_token() else {
                return Err(FlowError::NotAuthenticated);
            };

            let request = build_preview_request(&state.claim, &state.cart, &state.grants);
            state.preview_busy = true;
            state.preview = PreviewState::Previewing;
            let ticket = ActionTicket { generation: state.generation, revision: state.revision };
            (token, state.claim.id.clone(), request, ticket)
        };

        self.audit.emit(AuditEvent::new(
            claim_id.clone(),
            "preview.requested",
            AuditCategory::Preview,
            AuditOutcome::Success,
        ));

        let outcome = self.service.preview_redemption(&token, &claim_id, &request).await;

        let mut state = self.lock();
        if state.generation != ticket.generation {
            // The flow was torn down while the call was outstanding.
            return Err(FlowError::Closed);
        }
        state.preview_busy = false;

        match outcome {
            Ok(result) => {
                let fresh = state.revision == ticket.revision;
                state.preview = if fresh {
                    PreviewState::Ready(result.clone())
                } else {
                    PreviewState::Stale(result.clone())
                };
                drop(state);
                self.audit.emit(
                    AuditEvent::new(
                        claim_id,
                        "preview.completed",
                        AuditCategory::Preview,
                        AuditOutcome::Success,
                    )
                    .with_metadata("can_approve", result.can_approve.to_string())
                    .with_metadata("fresh", fresh.to_string()),
                );
                Ok(result)
            }
            Err(error) => {
                state.preview = PreviewState::Failed(error.to_string());
                drop(state);
                self.audit.emit(
                    AuditEvent::new(
                        claim_id,
                        "preview.failed",
                        AuditCategory::Preview,
                        AuditOutcome::Failed,
                    )
                    .with_metadata("error", error.to_string()),
                );
                Err(error.into())
            }
        }
    }

    // --- decision ---

    /// Commits the approval. Requires a fresh preview whose server verdict
    /// allows it; a stale or missing preview fails locally.
    pub async fn approve(&self) -> Result<(), FlowError> {
        let (token, claim_id, payload, ticket) = {
            let mut state = self.lock();
            if state.closed {
                return Err(FlowError::Closed);
            }
            if state.approve_busy {
                return Err(FlowError::Busy(ActionKind::Approve));
            }

            let result = match &state.preview {
                PreviewState::Stale(_) => return Err(FlowError::PreviewOutOfDate),
                other => match other.approvable() {
                    Some(result) => result.clone(),
                    None => return Err(FlowError::PreviewRequired),
                },
            };

            let Some(token) = self.credentials.bearer_token() else {
                return Err(FlowError::NotAuthenticated);
            };

            let payload = build_approval_payload(
                state.claim.redemption_type,
                &state.grants,
                &state.note,
                Some(&result),
            );
            state.approve_busy = true;
            let ticket = ActionTicket { generation: state.generation, revision: state.revision };
            (token, state.claim.id.clone(), payload, ticket)
        };

        let outcome = self.service.approve_claim(&token, &claim_id, &payload).await;

        {
            let mut state = self.lock();
            if state.generation != ticket.generation {
                return Err(FlowError::Closed);
            }
            state.approve_busy = false;
            if let Err(error) = outcome {
                drop(state);
                self.audit.emit(
                    AuditEvent::new(
                        claim_id,
                        "decision.approve_failed",
                        AuditCategory::Decision,
                        AuditOutcome::Failed,
                    )
                    .with_metadata("error", error.to_string()),
                );
                return Err(error.into());
            }
        }

        self.audit.emit(
            AuditEvent::new(
                claim_id.clone(),
                "decision.approved",
                AuditCategory::Decision,
                AuditOutcome::Success,
            )
            .with_metadata("redemption_value", payload.redemption_value.clone()),
        );
        self.completion.claim_resolved(&claim_id);
        self.close();
        Ok(())
    }

    /// Rejects the claim. Independent of the preview lifecycle: no preview
    /// is required and none is invalidated on failure.
    pub async fn reject(&self, reason: Option<&str>) -> Result<(), FlowError> {
        let (token, claim_id, payload, ticket) = {
            let mut state = self.lock();
            if state.closed {
                return Err(FlowError::Closed);
            }
            if state.reject_busy {
                return Err(FlowError::Busy(ActionKind::Reject));
            }

            let Some(token) = self.credentials.bearer_token() else {
                return Err(FlowError::NotAuthenticated);
            };

            state.reject_busy = true;
            let ticket = ActionTicket { generation: state.generation, revision: state.revision };
            (token, state.claim.id.clone(), build_reject_payload(reason), ticket)
        };

        let outcome = self.service.reject_claim(&token, &claim_id, &payload).await;

        {
            let mut state = self.lock();
            if state.generation != ticket.generation {
                return Err(FlowError::Closed);
            }
            state.reject_busy = false;
            if let Err(error) = outcome {
                drop(state);
                self.audit.emit(
                    AuditEvent::new(
                        claim_id,
                        "decision.reject_failed",
                        AuditCategory::Decision,
                        AuditOutcome::Failed,
                    )
                    .with_metadata("error", error.to_string()),
                );
                return Err(error.into());
            }
        }

        self.audit.emit(AuditEvent::new(
            claim_id.clone(),
            "decision.rejected",
            AuditCategory::Decision,
            AuditOutcome::Success,
        ));
        self.completion.claim_resolved(&claim_id);
        self.close();
        Ok(())
    }

    // --- picker search ---

    pub async fn search_scope_products(
        &self,
        query: &str,
    ) -> Result<Option<Vec<CatalogHit>>, FlowError> {
        let token = self.search_token()?;
        let hits = self
            .scope_product_search
            .run(|| self.search.scope_products(&token, query))
            .await?;
        Ok(hits)
    }

    pub async fn search_scope_bundles(
        &self,
        query: &str,
    ) -> Result<Option<Vec<CatalogHit>>, FlowError> {
        let token = self.search_token()?;
        let hits = self.scope_bundle_search.run(|| self.search.scope_bundles(&token, query)).await?;
        Ok(hits)
    }

    /// Grant pickers additionally narrow results to the claim's allow-list.
    pub async fn search_grant_products(
        &self,
        query: &str,
    ) -> Result<Option<Vec<CatalogHit>>, FlowError> {
        let token = self.search_token()?;
        let hits = self
            .grant_product_search
            .run(|| self.search.grant_products(&token, query))
            .await?;
        Ok(hits.map(|hits| self.lock().grants.filter_eligible(ItemKind::Product, hits)))
    }

    pub async fn search_grant_bundles(
        &self,
        query: &str,
    ) -> Result<Option<Vec<CatalogHit>>, FlowError> {
        let token = self.search_token()?;
        let hits =
            self.grant_bundle_search.run(|| self.search.grant_bundles(&token, query)).await?;
        Ok(hits.map(|hits| self.lock().grants.filter_eligible(ItemKind::Bundle, hits)))
    }

    fn search_token(&self) -> Result<SecretString, FlowError> {
        if self.lock().closed {
            return Err(FlowError::Closed);
        }
        self.credentials.bearer_token().ok_or(FlowError::NotAuthenticated)
    }

    fn mutate<T>(
        &self,
        apply: impl FnOnce(&mut SessionState) -> Result<T, FlowError>,
    ) -> Result<T, FlowError> {
        let mut state = self.lock();
        if state.closed {
            return Err(FlowError::Closed);
        }
        let value = apply(&mut state)?;
        touch(&mut state);
        Ok(value)
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn touch(state: &mut SessionState) {
    state.revision += 1;
    state.preview = std::mem::replace(&mut state.preview, PreviewState::NoPreview).marked_stale();
}
