use thiserror::Error;

use crate::cart::CartError;
use crate::clients::ServiceError;
use crate::grants::GrantError;
use crate::validation::ValidationIssue;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionKind {
    Preview,
    Approve,
    Reject,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Preview => "preview",
            Self::Approve => "approve",
            Self::Reject => "reject",
        };
        write!(f, "{label}")
    }
}

/// Session-level failures. Local problems (validation, busy, missing
/// preview) are recoverable without reloading the flow; service failures
/// leave all selections intact for a retry.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowError {
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("the approval flow is closed")]
    Closed,
    #[error("another {0} request is already in flight")]
    Busy(ActionKind),
    #[error("inputs are not valid: {}", format_issues(.0))]
    InvalidInputs(Vec<ValidationIssue>),
    #[error("no approvable preview is available for the current inputs")]
    PreviewRequired,
    #[error("the last preview no longer matches the current inputs")]
    PreviewOutOfDate,
    #[error(transparent)]
    Cart(#[from] CartError),
    #[error(transparent)]
    Grant(#[from] GrantError),
    #[error(transparent)]
    Service(#[from] ServiceError),
}

fn format_issues(issues: &[ValidationIssue]) -> String {
    if issues.is_empty() {
        return "unknown validation failure".to_string();
    }
    issues.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}
