pub mod audit;
pub mod cart;
pub mod clients;
pub mod commit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod gate;
pub mod grants;
pub mod preview;
pub mod search;
pub mod session;
pub mod validation;

pub use cart::{Cart, CartError, CartRow, RowId};
pub use clients::{
    ApprovalPayload, CatalogSearch, ClaimService, CompletionSink, CredentialStore,
    RejectPayload, ServiceError, StaticCredentialStore, WireGrant,
};
pub use domain::catalog::{CatalogHit, CatalogItem};
pub use domain::claim::{
    Claim, ClaimId, ClaimPolicy, EligibleGrantItem, ExistingGrant, ItemKind, OfferId,
    RedemptionType, ScopeKind,
};
pub use errors::{ActionKind, FlowError};
pub use gate::{evaluate_gate, GateDecision, GateDenial, GateInput};
pub use grants::{GrantBasket, GrantError, GrantLine, SelectOutcome};
pub use preview::{
    build_preview_request, AppliedBenefit, AppliedGrant, NextTierHint, PreviewRequest,
    PreviewResult, PreviewState,
};
pub use session::{ApprovalFlow, FlowCollaborators, FlowSnapshot};
pub use validation::{validate_inputs, ValidationIssue, ValidationReport};
