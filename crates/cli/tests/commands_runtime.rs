use std::env;
use std::sync::{Mutex, OnceLock};

use procure_cli::commands::{config, decide, doctor, smoke, users};
use procure_core::config::LoadOptions;
use procure_core::domain::directory::UserId;
use procure_core::domain::request::RequestId;
use procure_core::flows::ApprovalDecision;
use serde_json::Value;

// Nothing listens on the discard port, so requests fail at connect time.
const UNREACHABLE_BASE_URL: &str = "http://127.0.0.1:9";

#[test]
fn smoke_passes_against_the_in_memory_engine() {
    with_env(&[], || {
        let result = smoke::run();
        assert_eq!(result.exit_code, 0, "expected a passing smoke report:\n{}", result.output);

        let payload = parse_payload(last_line(&result.output));
        assert_eq!(payload["command"], "smoke");
        assert_eq!(payload["status"], "pass");
        assert_eq!(payload["checks"].as_array().map(Vec::len), Some(6));
        assert!(result.output.contains("- [ok] duplicate_decision_refused"));
    });
}

#[test]
fn users_reports_config_failure_for_invalid_env() {
    with_env(&[("PROCURE_API_TIMEOUT_SECS", "soon")], || {
        let result = users::run(LoadOptions::default());
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(last_line(&result.output));
        assert_eq!(payload["command"], "users");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn decision_against_unreachable_backend_exits_with_unreachable_code() {
    with_env(
        &[("PROCURE_API_BASE_URL", UNREACHABLE_BASE_URL), ("PROCURE_API_TIMEOUT_SECS", "2")],
        || {
            let result = decide::run(
                LoadOptions::default(),
                RequestId(1),
                Some(UserId(2)),
                ApprovalDecision::Approve,
            );
            assert_eq!(result.exit_code, 4, "expected unreachable code:\n{}", result.output);

            let payload = parse_payload(last_line(&result.output));
            assert_eq!(payload["command"], "approve");
            assert_eq!(payload["error_class"], "backend_unreachable");
        },
    );
}

#[test]
fn decision_without_an_acting_user_is_invalid_input() {
    with_env(&[("PROCURE_API_BASE_URL", UNREACHABLE_BASE_URL)], || {
        let result =
            decide::run(LoadOptions::default(), RequestId(1), None, ApprovalDecision::Reject);
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(last_line(&result.output));
        assert_eq!(payload["command"], "reject");
        assert_eq!(payload["error_class"], "invalid_input");
    });
}

#[test]
fn doctor_reports_unreachable_backend() {
    with_env(
        &[("PROCURE_API_BASE_URL", UNREACHABLE_BASE_URL), ("PROCURE_API_TIMEOUT_SECS", "2")],
        || {
            let result = doctor::run(LoadOptions::default(), true);
            assert_eq!(result.exit_code, 4);

            let report = parse_payload(&result.output);
            assert_eq!(report["overall_status"], "fail");
            assert_eq!(report["checks"][0]["name"], "config_validation");
            assert_eq!(report["checks"][0]["status"], "pass");
            assert_eq!(report["checks"][1]["status"], "fail");
            assert_eq!(report["checks"][2]["status"], "skipped");
        },
    );
}

#[test]
fn config_attributes_env_sources() {
    with_env(
        &[
            ("PROCURE_API_BASE_URL", "http://procure.example:8000"),
            ("PROCURE_SESSION_USER_ID", "3"),
            ("PROCURE_LOG_FORMAT", "json"),
        ],
        || {
            let result = config::run(LoadOptions::default());
            assert_eq!(result.exit_code, 0);
            assert!(result.output.contains(
                "- api.base_url = http://procure.example:8000 (source: env (PROCURE_API_BASE_URL))"
            ));
            assert!(result
                .output
                .contains("- session.user_id = 3 (source: env (PROCURE_SESSION_USER_ID))"));
            assert!(result.output.contains("- logging.format = json (source: env (PROCURE_LOG_FORMAT))"));
            assert!(result.output.contains("- api.auth_token = <unset> (source: default)"));
        },
    );
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn last_line(output: &str) -> &str {
    output.lines().last().unwrap_or_default()
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "PROCURE_API_BASE_URL",
        "PROCURE_API_TIMEOUT_SECS",
        "PROCURE_API_AUTH_TOKEN",
        "PROCURE_POLLING_REFERENCE_SECS",
        "PROCURE_POLLING_REQUESTS_SECS",
        "PROCURE_POLLING_APPROVALS_SECS",
        "PROCURE_POLLING_PAYMENTS_SECS",
        "PROCURE_POLLING_DETAIL_SECS",
        "PROCURE_SESSION_USER_ID",
        "PROCURE_LOGGING_LEVEL",
        "PROCURE_LOGGING_FORMAT",
        "PROCURE_LOG_LEVEL",
        "PROCURE_LOG_FORMAT",
        "PROCURE_LOG_FILTER",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
