use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::directory::UserId;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub polling: PollingConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub auth_token: Option<SecretString>,
}

/// Refresh cadence per feed, in seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PollingConfig {
    pub reference_secs: u64,
    pub requests_secs: u64,
    pub approvals_secs: u64,
    pub payments_secs: u64,
    pub detail_secs: u64,
}

#[derive(Clone, Debug, Default)]
pub struct SessionConfig {
    pub user_id: Option<UserId>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub auth_token: Option<String>,
    pub user_id: Option<UserId>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            reference_secs: 30,
            requests_secs: 5,
            approvals_secs: 5,
            payments_secs: 10,
            detail_secs: 3,
        }
    }
}

impl PollingConfig {
    pub fn reference(&self) -> Duration {
        Duration::from_secs(self.reference_secs)
    }

    pub fn requests(&self) -> Duration {
        Duration::from_secs(self.requests_secs)
    }

    pub fn approvals(&self) -> Duration {
        Duration::from_secs(self.approvals_secs)
    }

    pub fn payments(&self) -> Duration {
        Duration::from_secs(self.payments_secs)
    }

    pub fn detail(&self) -> Duration {
        Duration::from_secs(self.detail_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://localhost:8000".to_string(),
                timeout_secs: 10,
                auth_token: None,
            },
            polling: PollingConfig::default(),
            session: SessionConfig::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

/// What `procure config` prints: every effective value, with the token reduced to
/// whether one is set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConfigSummary {
    pub base_url: String,
    pub timeout_secs: u64,
    pub auth_token: &'static str,
    pub polling: PollingConfig,
    pub user_id: Option<UserId>,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("procure.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn summary(&self) -> ConfigSummary {
        let token_set = self
            .api
            .auth_token
            .as_ref()
            .is_some_and(|token| !token.expose_secret().trim().is_empty());
        ConfigSummary {
            base_url: self.api.base_url.clone(),
            timeout_secs: self.api.timeout_secs,
            auth_token: if token_set { "set" } else { "unset" },
            polling: self.polling,
            user_id: self.session.user_id,
            log_level: self.logging.level.clone(),
            log_format: self.logging.format,
        }
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(api) = patch.api {
            if let Some(base_url) = api.base_url {
                self.api.base_url = base_url;
            }
            if let Some(timeout_secs) = api.timeout_secs {
                self.api.timeout_secs = timeout_secs;
            }
            if let Some(token) = api.auth_token {
                self.api.auth_token = Some(token.into());
            }
        }

        if let Some(polling) = patch.polling {
            if let Some(value) = polling.reference_secs {
                self.polling.reference_secs = value;
            }
            if let Some(value) = polling.requests_secs {
                self.polling.requests_secs = value;
            }
            if let Some(value) = polling.approvals_secs {
                self.polling.approvals_secs = value;
            }
            if let Some(value) = polling.payments_secs {
                self.polling.payments_secs = value;
            }
            if let Some(value) = polling.detail_secs {
                self.polling.detail_secs = value;
            }
        }

        if let Some(session) = patch.session {
            if let Some(user_id) = session.user_id {
                self.session.user_id = Some(UserId(user_id));
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("PROCURE_API_BASE_URL") {
            self.api.base_url = value;
        }
        if let Some(value) = read_env("PROCURE_API_TIMEOUT_SECS") {
            self.api.timeout_secs = parse_u64("PROCURE_API_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("PROCURE_API_AUTH_TOKEN") {
            self.api.auth_token = Some(value.into());
        }

        for (key, slot) in [
            ("PROCURE_POLLING_REFERENCE_SECS", &mut self.polling.reference_secs),
            ("PROCURE_POLLING_REQUESTS_SECS", &mut self.polling.requests_secs),
            ("PROCURE_POLLING_APPROVALS_SECS", &mut self.polling.approvals_secs),
            ("PROCURE_POLLING_PAYMENTS_SECS", &mut self.polling.payments_secs),
            ("PROCURE_POLLING_DETAIL_SECS", &mut self.polling.detail_secs),
        ] {
            if let Some(value) = read_env(key) {
                *slot = parse_u64(key, &value)?;
            }
        }

        if let Some(value) = read_env("PROCURE_SESSION_USER_ID") {
            self.session.user_id = Some(UserId(parse_i64("PROCURE_SESSION_USER_ID", &value)?));
        }

        let log_level = read_env("PROCURE_LOGGING_LEVEL").or_else(|| read_env("PROCURE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("PROCURE_LOGGING_FORMAT").or_else(|| read_env("PROCURE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(base_url) = overrides.base_url {
            self.api.base_url = base_url;
        }
        if let Some(timeout_secs) = overrides.timeout_secs {
            self.api.timeout_secs = timeout_secs;
        }
        if let Some(token) = overrides.auth_token {
            self.api.auth_token = Some(token.into());
        }
        if let Some(user_id) = overrides.user_id {
            self.session.user_id = Some(user_id);
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_api(&self.api)?;
        validate_polling(&self.polling)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("procure.toml"), PathBuf::from("config/procure.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_api(api: &ApiConfig) -> Result<(), ConfigError> {
    let base_url = api.base_url.trim();
    let has_scheme = base_url.starts_with("http://") || base_url.starts_with("https://");
    let has_host = base_url
        .split_once("://")
        .map(|(_, rest)| !rest.trim_matches('/').is_empty())
        .unwrap_or(false);
    if !has_scheme || !has_host {
        return Err(ConfigError::Validation(
            "api.base_url must be an http:// or https:// URL with a host".to_string(),
        ));
    }

    if api.timeout_secs == 0 || api.timeout_secs > 300 {
        return Err(ConfigError::Validation("api.timeout_secs must be in range 1..=300".to_string()));
    }

    Ok(())
}

fn validate_polling(polling: &PollingConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("reference_secs", polling.reference_secs),
        ("requests_secs", polling.requests_secs),
        ("approvals_secs", polling.approvals_secs),
        ("payments_secs", polling.payments_secs),
        ("detail_secs", polling.detail_secs),
    ] {
        if value == 0 || value > 300 {
            return Err(ConfigError::Validation(format!(
                "polling.{name} must be in range 1..=300"
            )));
        }
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_i64(key: &str, value: &str) -> Result<i64, ConfigError> {
    value.trim().parse::<i64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    api: Option<ApiPatch>,
    polling: Option<PollingPatch>,
    session: Option<SessionPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiPatch {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    auth_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PollingPatch {
    reference_secs: Option<u64>,
    requests_secs: Option<u64>,
    approvals_secs: Option<u64>,
    payments_secs: Option<u64>,
    detail_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SessionPatch {
    user_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
