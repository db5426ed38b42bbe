use claimdesk_api::ApiClient;
use claimdesk_core::config::{AppConfig, LoadOptions};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(load_options: LoadOptions, json_output: bool) -> String {
    let report = build_report(load_options);

    if json_output {
        return serde_json::to_string_pretty(&report)
            .unwrap_or_else(|error| format!("doctor report serialization failed: {error}"));
    }

    render_human(&report)
}

fn build_report(load_options: LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(load_options) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_credentials(&config));
            checks.push(check_api_client(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(DoctorCheck {
                name: "credential_readiness",
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            });
            checks.push(DoctorCheck {
                name: "api_client_construction",
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            });
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_credentials(config: &AppConfig) -> DoctorCheck {
    if config.auth.token.is_some() {
        DoctorCheck {
            name: "credential_readiness",
            status: CheckStatus::Pass,
            details: "bearer token present".to_string(),
        }
    } else {
        DoctorCheck {
            name: "credential_readiness",
            status: CheckStatus::Fail,
            details: "no bearer token configured; every backend call will fail as not authenticated"
                .to_string(),
        }
    }
}

fn check_api_client(config: &AppConfig) -> DoctorCheck {
    match ApiClient::from_config(&config.api) {
        Ok(_) => DoctorCheck {
            name: "api_client_construction",
            status: CheckStatus::Pass,
            details: format!("client ready for `{}`", config.api.base_url),
        },
        Err(error) => DoctorCheck {
            name: "api_client_construction",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = vec![report.summary.clone()];

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("  {marker:<4} {} ({})", check.name, check.details));
    }

    lines.join("\n")
}
