use procure_client::{HttpProcurementApi, ProcurementApi};
use procure_core::config::{AppConfig, LoadOptions};
use procure_core::domain::directory::Role;
use serde::Serialize;

use crate::commands::{runtime, CommandResult, EXIT_CONFIG, EXIT_UNREACHABLE};

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

pub fn run(options: LoadOptions, json_output: bool) -> CommandResult {
    let report = build_report(options);
    let exit_code = exit_code(&report);

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };
    CommandResult { exit_code, output }
}

fn build_report(options: LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options) {
        Ok(config) => {
            crate::init_logging(&config);
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.extend(check_backend(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(skipped("service_health"));
            checks.push(skipped("reference_data"));
        }
    }

    finish(checks)
}

fn check_backend(config: &AppConfig) -> Vec<DoctorCheck> {
    let api = match HttpProcurementApi::from_config(config) {
        Ok(api) => api,
        Err(error) => {
            return vec![
                DoctorCheck {
                    name: "service_health",
                    status: CheckStatus::Fail,
                    details: error.to_string(),
                },
                skipped("reference_data"),
            ]
        }
    };
    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            return vec![
                DoctorCheck {
                    name: "service_health",
                    status: CheckStatus::Fail,
                    details: format!("failed to initialize async runtime: {error}"),
                },
                skipped("reference_data"),
            ]
        }
    };

    runtime.block_on(async {
        let health = check_health(&api, config).await;
        if health.status != CheckStatus::Pass {
            return vec![health, skipped("reference_data")];
        }
        vec![health, check_reference_data(&api).await]
    })
}

async fn check_health(api: &dyn ProcurementApi, config: &AppConfig) -> DoctorCheck {
    match api.health().await {
        Ok(health) if health.is_healthy() => DoctorCheck {
            name: "service_health",
            status: CheckStatus::Pass,
            details: format!("{} reports `{}`", config.api.base_url, health.status),
        },
        Ok(health) => DoctorCheck {
            name: "service_health",
            status: CheckStatus::Fail,
            details: format!(
                "{} reports `{}`: {}",
                config.api.base_url, health.status, health.message
            ),
        },
        Err(error) => DoctorCheck {
            name: "service_health",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

/// Dashboards need users to select and vendors to submit against; approvals need a finance
/// and a legal user to route to.
async fn check_reference_data(api: &dyn ProcurementApi) -> DoctorCheck {
    let directory = match api.directory().await {
        Ok(directory) => directory,
        Err(error) => {
            return DoctorCheck {
                name: "reference_data",
                status: CheckStatus::Fail,
                details: error.to_string(),
            }
        }
    };

    let mut missing = Vec::new();
    if directory.users.is_empty() {
        missing.push("users");
    }
    if directory.vendors.is_empty() {
        missing.push("vendors");
    }
    if directory.departments.is_empty() {
        missing.push("departments");
    }
    if directory.first_with_role(Role::Finance).is_none() {
        missing.push("a finance user");
    }
    if directory.first_with_role(Role::Legal).is_none() {
        missing.push("a legal user");
    }

    if missing.is_empty() {
        DoctorCheck {
            name: "reference_data",
            status: CheckStatus::Pass,
            details: format!(
                "{} users, {} vendors, {} departments",
                directory.users.len(),
                directory.vendors.len(),
                directory.departments.len()
            ),
        }
    } else {
        DoctorCheck {
            name: "reference_data",
            status: CheckStatus::Fail,
            details: format!("missing {}", missing.join(", ")),
        }
    }
}

fn skipped(name: &'static str) -> DoctorCheck {
    DoctorCheck {
        name,
        status: CheckStatus::Skipped,
        details: "skipped because a previous check failed".to_string(),
    }
}

fn finish(checks: Vec<DoctorCheck>) -> DoctorReport {
    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn exit_code(report: &DoctorReport) -> u8 {
    let failed = |name: &str| {
        report.checks.iter().any(|check| check.name == name && check.status == CheckStatus::Fail)
    };
    if failed("config_validation") {
        EXIT_CONFIG
    } else if failed("service_health") {
        EXIT_UNREACHABLE
    } else if report.overall_status == CheckStatus::Fail {
        1
    } else {
        0
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use procure_client::InMemoryProcurementApi;
    use procure_core::config::{AppConfig, ConfigOverrides, LoadOptions};
    use procure_core::domain::directory::Directory;
    use procure_core::flows::WorkflowEngine;

    use super::{check_health, check_reference_data, finish, render_human, run, CheckStatus};

    #[tokio::test]
    async fn demo_engine_passes_every_backend_check() {
        let api = InMemoryProcurementApi::demo();
        let config = AppConfig::load(LoadOptions::default()).expect("default config");

        let report = finish(vec![
            check_health(&api, &config).await,
            check_reference_data(&api).await,
        ]);
        assert_eq!(report.overall_status, CheckStatus::Pass);
        assert!(render_human(&report)
            .contains("- [ok] reference_data: 5 users, 6 vendors, 3 departments"));
    }

    #[tokio::test]
    async fn empty_directory_fails_reference_data() {
        let api =
            InMemoryProcurementApi::new(WorkflowEngine::with_directory(Directory::default()));
        let check = check_reference_data(&api).await;

        assert_eq!(check.status, CheckStatus::Fail);
        assert!(check.details.starts_with("missing users, vendors, departments"));
    }

    #[test]
    fn config_failure_skips_backend_checks() {
        let result = run(
            LoadOptions {
                overrides: ConfigOverrides {
                    log_level: Some("verbose".to_owned()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            },
            true,
        );

        assert_eq!(result.exit_code, 2);
        let report: serde_json::Value =
            serde_json::from_str(&result.output).expect("doctor json output");
        assert_eq!(report["checks"][0]["status"], "fail");
        assert_eq!(report["checks"][1]["status"], "skipped");
        assert_eq!(report["checks"][2]["status"], "skipped");
    }
}
