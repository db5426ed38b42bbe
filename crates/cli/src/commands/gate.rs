use std::fs;
use std::path::Path;

use chrono::Utc;
use claimdesk_core::{evaluate_gate, Claim, GateDecision, GateInput};
use serde::Serialize;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct GateOutput {
    claim_id: String,
    enabled: bool,
    reason: String,
}

pub fn run(claim_path: &Path, can_approve: bool, json_output: bool) -> CommandResult {
    let raw = match fs::read_to_string(claim_path) {
        Ok(raw) => raw,
        Err(error) => {
            return CommandResult::failure(
                "gate",
                "claim_file_unreadable",
                format!("could not read `{}`: {error}", claim_path.display()),
                1,
            );
        }
    };

    let claim: Claim = match serde_json::from_str(&raw) {
        Ok(claim) => claim,
        Err(error) => {
            return CommandResult::failure(
                "gate",
                "claim_file_invalid",
                format!("could not parse `{}`: {error}", claim_path.display()),
                1,
            );
        }
    };

    let decision = evaluate_gate(&GateInput {
        claim: &claim,
        caller_can_approve: can_approve,
        busy: false,
        now: Utc::now(),
    });

    CommandResult { exit_code: 0, output: render(&claim, &decision, json_output) }
}

fn render(claim: &Claim, decision: &GateDecision, json_output: bool) -> String {
    let output = GateOutput {
        claim_id: claim.id.0.clone(),
        enabled: decision.enabled,
        reason: decision.reason.clone(),
    };

    if json_output {
        return serde_json::to_string_pretty(&output)
            .unwrap_or_else(|error| format!("{{\"error\":\"{error}\"}}"));
    }

    let verdict = if output.enabled { "open" } else { "blocked" };
    format!("claim {}: {verdict} ({})", output.claim_id, output.reason)
}
