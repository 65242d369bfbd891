pub mod config;
pub mod dashboard;
pub mod decide;
pub mod doctor;
pub mod pay;
pub mod preview;
pub mod render;
pub mod show;
pub mod smoke;
pub mod submit;
pub mod users;

use std::future::Future;
use std::sync::Arc;

use procure_client::{ActionAlert, ApiError, HttpProcurementApi, ProcurementApi};
use procure_core::config::{AppConfig, LoadOptions};
use procure_core::errors::InterfaceError;
use procure_core::domain::directory::{User, UserId};
use serde::Serialize;
use tokio::runtime::Runtime;

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_REJECTED: u8 = 3;
pub const EXIT_UNREACHABLE: u8 = 4;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// Human-readable output with nothing machine-readable attached.
    pub fn text(output: impl Into<String>) -> Self {
        Self { exit_code: 0, output: output.into() }
    }

    /// Prepends rendered text above the JSON outcome line.
    pub fn with_preamble(mut self, preamble: &str) -> Self {
        if !preamble.is_empty() {
            self.output = format!("{preamble}\n{}", self.output);
        }
        self
    }

    pub fn config_error(command: &str, message: impl Into<String>) -> Self {
        Self::failure(command, "config_validation", message, EXIT_CONFIG)
    }

    pub fn invalid_input(command: &str, message: impl Into<String>) -> Self {
        Self::failure(command, "invalid_input", message, EXIT_CONFIG)
    }

    pub fn api_error(command: &str, error: &ApiError) -> Self {
        let interface = error.clone().into_interface(command);
        let exit_code = match interface {
            InterfaceError::InvalidInput { .. } | InterfaceError::Misconfigured { .. } => EXIT_CONFIG,
            InterfaceError::Rejected { .. } => EXIT_REJECTED,
            InterfaceError::Unreachable { .. } => EXIT_UNREACHABLE,
        };
        Self::failure(command, interface.error_class(), error.alert_message(), exit_code)
    }

    pub fn alert(command: &str, alert: &ActionAlert) -> Self {
        Self::api_error(command, &alert.error)
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Loaded config, logging, an HTTP client and a runtime: what every backend-facing
/// command needs before it can do anything.
pub struct Session {
    pub config: AppConfig,
    pub api: Arc<dyn ProcurementApi>,
    runtime: Runtime,
}

impl Session {
    pub fn open(command: &str, options: LoadOptions) -> Result<Self, CommandResult> {
        let config = AppConfig::load(options)
            .map_err(|error| CommandResult::config_error(command, error.to_string()))?;
        crate::init_logging(&config);

        let api = HttpProcurementApi::from_config(&config)
            .map_err(|error| CommandResult::config_error(command, error.to_string()))?;
        let runtime = runtime()
            .map_err(|error| CommandResult::failure(command, "runtime", error.to_string(), 1))?;

        Ok(Self { config, api: Arc::new(api), runtime })
    }

    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// `--user` if given, otherwise `session.user_id` from config.
    pub fn acting_user(&self, command: &str, explicit: Option<UserId>) -> Result<UserId, CommandResult> {
        explicit.or(self.config.session.user_id).ok_or_else(|| {
            CommandResult::invalid_input(
                command,
                "no acting user: pass --user <id> or set session.user_id",
            )
        })
    }
}

pub fn runtime() -> std::io::Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread().worker_threads(2).enable_all().build()
}

/// Fetches the user list and picks `user_id` out of it.
pub async fn resolve_user(
    api: &dyn ProcurementApi,
    command: &str,
    user_id: UserId,
) -> Result<User, CommandResult> {
    let users = api.users().await.map_err(|error| CommandResult::api_error(command, &error))?;
    users
        .into_iter()
        .find(|user| user.id == user_id)
        .ok_or_else(|| CommandResult::invalid_input(command, format!("user {user_id} was not found")))
}
