pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use procure_core::config::{AppConfig, ConfigOverrides, LoadOptions, LogFormat};
use procure_core::dashboard::{FinanceTab, RequestFilter};
use procure_core::domain::directory::{UserId, VendorId};
use procure_core::domain::payment::{PaymentId, PaymentOutcome};
use procure_core::domain::request::RequestId;
use procure_core::flows::ApprovalDecision;
use rust_decimal::Decimal;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::commands::dashboard::DashboardArgs;
use crate::commands::submit::SubmitArgs;

#[derive(Debug, Parser)]
#[command(
    name = "procure",
    about = "Procurement approval client",
    long_about = "Browse role dashboards, submit purchase requests, record approval decisions and process payments against the procurement service.",
    after_help = "Examples:\n  procure users\n  procure dashboard --user 2\n  procure submit --user 1 --title \"Snyk licence\" --amount 12000 --vendor 1\n  procure approve 7 --user 2"
)]
pub struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    #[arg(long, global = true, help = "Path to a procure.toml config file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Procurement service base URL")]
    base_url: Option<String>,
    #[arg(long, global = true, help = "Log level (trace, debug, info, warn, error)")]
    log_level: Option<String>,
    #[arg(long, global = true, value_parser = parse_log_format, help = "Log format (compact, pretty, json)")]
    log_format: Option<LogFormat>,
}

impl GlobalArgs {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides {
                base_url: self.base_url.clone(),
                log_level: self.log_level.clone(),
                log_format: self.log_format,
                ..ConfigOverrides::default()
            },
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "List the users that can be selected as the acting identity")]
    Users,
    #[command(about = "Show the dashboard for the selected user's role, refreshing until Ctrl-C")]
    Dashboard {
        #[arg(long, help = "Acting user id (defaults to session.user_id)")]
        user: Option<i64>,
        #[arg(long, help = "Render the first complete snapshot and exit")]
        once: bool,
        #[arg(long, value_parser = parse_tab, help = "Finance tab: approvals or payments")]
        tab: Option<FinanceTab>,
        #[arg(long, help = "Approvers: list every request instead of the pending queue")]
        history: bool,
        #[arg(long, value_parser = parse_filter, default_value = "all", help = "Admin request filter")]
        filter: RequestFilter,
    },
    #[command(about = "Show one request with its approval steps and audit trail")]
    Show {
        request_id: i64,
        #[arg(long, help = "Viewing user id, used to offer approve/reject")]
        user: Option<i64>,
    },
    #[command(about = "Preview the approval route for a prospective request")]
    Preview {
        #[arg(long)]
        amount: Decimal,
        #[arg(long)]
        vendor: i64,
    },
    #[command(about = "Submit a purchase request")]
    Submit {
        #[arg(long)]
        user: Option<i64>,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        amount: Decimal,
        #[arg(long)]
        vendor: i64,
    },
    #[command(about = "Approve your pending step on a request")]
    Approve {
        request_id: i64,
        #[arg(long)]
        user: Option<i64>,
    },
    #[command(about = "Reject a request at your pending step")]
    Reject {
        request_id: i64,
        #[arg(long)]
        user: Option<i64>,
    },
    #[command(about = "Mark a pending payment completed or failed")]
    Pay {
        payment_id: i64,
        #[arg(long)]
        user: Option<i64>,
        #[arg(long, value_parser = parse_outcome)]
        status: PaymentOutcome,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, service health and reference data readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Run the approval lifecycle scenarios against the in-memory engine")]
    Smoke,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.global.load_options();

    let result = match cli.command {
        Command::Users => commands::users::run(options),
        Command::Dashboard { user, once, tab, history, filter } => commands::dashboard::run(
            options,
            DashboardArgs { user: user.map(UserId), once, tab, history, filter },
        ),
        Command::Show { request_id, user } => {
            commands::show::run(options, RequestId(request_id), user.map(UserId))
        }
        Command::Preview { amount, vendor } => {
            commands::preview::run(options, amount, VendorId(vendor))
        }
        Command::Submit { user, title, description, amount, vendor } => commands::submit::run(
            options,
            SubmitArgs { user: user.map(UserId), title, description, amount, vendor: VendorId(vendor) },
        ),
        Command::Approve { request_id, user } => commands::decide::run(
            options,
            RequestId(request_id),
            user.map(UserId),
            ApprovalDecision::Approve,
        ),
        Command::Reject { request_id, user } => commands::decide::run(
            options,
            RequestId(request_id),
            user.map(UserId),
            ApprovalDecision::Reject,
        ),
        Command::Pay { payment_id, user, status } => {
            commands::pay::run(options, PaymentId(payment_id), user.map(UserId), status)
        }
        Command::Config => commands::config::run(options),
        Command::Doctor { json } => commands::doctor::run(options, json),
        Command::Smoke => commands::smoke::run(),
    };

    if !result.output.is_empty() {
        println!("{}", result.output);
    }
    ExitCode::from(result.exit_code)
}

/// Installs the stderr subscriber once; later calls keep the first one.
pub fn init_logging(config: &AppConfig) {
    let level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let filter = EnvFilter::try_from_env("PROCURE_LOG_FILTER")
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

fn parse_log_format(value: &str) -> Result<LogFormat, String> {
    value.parse().map_err(|error: procure_core::config::ConfigError| error.to_string())
}

fn parse_tab(value: &str) -> Result<FinanceTab, String> {
    value.parse().map_err(|error: procure_core::errors::DomainError| error.to_string())
}

fn parse_filter(value: &str) -> Result<RequestFilter, String> {
    value.parse().map_err(|error: procure_core::errors::DomainError| error.to_string())
}

fn parse_outcome(value: &str) -> Result<PaymentOutcome, String> {
    value.parse().map_err(|error: procure_core::errors::DomainError| error.to_string())
}
