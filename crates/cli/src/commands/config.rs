use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use procure_core::config::{resolve_config_path, AppConfig, LoadOptions};
use toml::Value;

use crate::commands::CommandResult;

const COMMAND: &str = "config";

pub fn run(options: LoadOptions) -> CommandResult {
    let config_file_path = resolve_config_path(options.config_path.as_deref());
    let overrides = options.overrides.clone();
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::config_error(
                COMMAND,
                format!("config validation failed: {error}"),
            )
        }
    };

    let sources = Sources {
        doc: load_config_file_doc(config_file_path.as_deref()),
        path: config_file_path,
    };
    let summary = config.summary();
    let polling = summary.polling;

    let mut lines =
        vec!["effective config (source precedence: flag > env > file > default):".to_string()];
    let mut push = |key: &str, value: String, env_keys: &[&str], flag: bool| {
        let source = if flag { "flag".to_string() } else { sources.source_of(key, env_keys) };
        lines.push(render_line(key, &value, source));
    };

    push("api.base_url", summary.base_url, &["PROCURE_API_BASE_URL"], overrides.base_url.is_some());
    push(
        "api.timeout_secs",
        summary.timeout_secs.to_string(),
        &["PROCURE_API_TIMEOUT_SECS"],
        overrides.timeout_secs.is_some(),
    );
    push(
        "api.auth_token",
        redact_token(summary.auth_token),
        &["PROCURE_API_AUTH_TOKEN"],
        overrides.auth_token.is_some(),
    );
    for (key, value, env_key) in [
        ("polling.reference_secs", polling.reference_secs, "PROCURE_POLLING_REFERENCE_SECS"),
        ("polling.requests_secs", polling.requests_secs, "PROCURE_POLLING_REQUESTS_SECS"),
        ("polling.approvals_secs", polling.approvals_secs, "PROCURE_POLLING_APPROVALS_SECS"),
        ("polling.payments_secs", polling.payments_secs, "PROCURE_POLLING_PAYMENTS_SECS"),
        ("polling.detail_secs", polling.detail_secs, "PROCURE_POLLING_DETAIL_SECS"),
    ] {
        push(key, value.to_string(), &[env_key], false);
    }
    push(
        "session.user_id",
        summary.user_id.map(|id| id.to_string()).unwrap_or_else(|| "<unset>".to_string()),
        &["PROCURE_SESSION_USER_ID"],
        overrides.user_id.is_some(),
    );
    push(
        "logging.level",
        summary.log_level,
        &["PROCURE_LOGGING_LEVEL", "PROCURE_LOG_LEVEL"],
        overrides.log_level.is_some(),
    );
    push(
        "logging.format",
        format!("{:?}", summary.log_format).to_ascii_lowercase(),
        &["PROCURE_LOGGING_FORMAT", "PROCURE_LOG_FORMAT"],
        overrides.log_format.is_some(),
    );

    CommandResult::text(lines.join("\n"))
}

struct Sources {
    doc: Option<Value>,
    path: Option<PathBuf>,
}

impl Sources {
    fn source_of(&self, key_path: &str, env_keys: &[&str]) -> String {
        if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
            return format!("env ({env_key})");
        }

        if let Some(doc) = &self.doc {
            if contains_path(doc, key_path) {
                let file_path = self
                    .path
                    .as_ref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "config file".to_string());
                return format!("file ({file_path})");
            }
        }

        "default".to_string()
    }
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// The token itself is never available here, only whether one is set.
fn redact_token(state: &str) -> String {
    match state {
        "set" => "<redacted>".to_string(),
        _ => "<unset>".to_string(),
    }
}
