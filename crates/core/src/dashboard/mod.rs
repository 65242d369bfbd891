//! Role dashboards.
//!
//! A selected user's role picks exactly one [`Dashboard`] variant. Each variant names the
//! entity feeds it reads and has one projection in [`views`] that turns the latest feed
//! snapshots into what gets rendered. Projections are pure; fetching and refreshing belong
//! to the client crate.

pub mod format;
pub mod views;

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::PollingConfig;
use crate::domain::approval::ApprovalRole;
use crate::domain::directory::Role;
use crate::errors::DomainError;

pub use format::{
    approval_role_label, display_or_unknown, format_money, format_timestamp, Urgency,
};
pub use views::{
    AdminView, ApprovalAction, ApproverMode, ApproverView, PaymentStats, PaymentView,
    RequestDetailView, RequestFilter, RequesterView, StatusCounts, VendorSpend,
};

/// Which half of the combined finance dashboard is showing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinanceTab {
    #[default]
    Approvals,
    Payments,
}

impl FinanceTab {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approvals => "approvals",
            Self::Payments => "payments",
        }
    }
}

impl fmt::Display for FinanceTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FinanceTab {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "approvals" => Ok(Self::Approvals),
            "payments" => Ok(Self::Payments),
            other => Err(DomainError::UnknownValue { kind: "finance tab", value: other.to_owned() }),
        }
    }
}

/// Backend collections a dashboard polls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    /// Users, vendors and departments.
    Reference,
    Requests,
    PendingApprovals,
    Payments,
    RequestDetail,
}

impl FeedKind {
    pub fn interval(&self, polling: &PollingConfig) -> Duration {
        match self {
            Self::Reference => polling.reference(),
            Self::Requests => polling.requests(),
            Self::PendingApprovals => polling.approvals(),
            Self::Payments => polling.payments(),
            Self::RequestDetail => polling.detail(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Dashboard {
    Requester,
    Approver { role: ApprovalRole },
    /// Finance users both approve large requests and process payments.
    Finance { tab: FinanceTab },
    Admin,
    Unsupported { role: String },
}

impl Dashboard {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Requester => Self::Requester,
            Role::Manager => Self::Approver { role: ApprovalRole::Manager },
            Role::Legal => Self::Approver { role: ApprovalRole::Legal },
            Role::Finance => Self::Finance { tab: FinanceTab::default() },
            Role::Admin => Self::Admin,
            Role::Unknown => Self::Unsupported { role: role.as_str().to_owned() },
        }
    }

    /// Switches the finance tab; other variants are returned unchanged.
    pub fn with_tab(self, tab: FinanceTab) -> Self {
        match self {
            Self::Finance { .. } => Self::Finance { tab },
            other => other,
        }
    }

    pub fn title(&self) -> String {
        match self {
            Self::Requester => "Requester Dashboard".to_owned(),
            Self::Approver { role } => format!("{} Dashboard", approval_role_label(*role)),
            Self::Finance { tab: FinanceTab::Approvals } => "Finance Approver Dashboard".to_owned(),
            Self::Finance { tab: FinanceTab::Payments } => "Payment Processing".to_owned(),
            Self::Admin => "Admin Dashboard".to_owned(),
            Self::Unsupported { role } => format!("Unknown role `{role}`"),
        }
    }

    pub fn feeds(&self) -> Vec<FeedKind> {
        match self {
            Self::Requester => vec![FeedKind::Reference, FeedKind::Requests],
            Self::Approver { .. } | Self::Finance { tab: FinanceTab::Approvals } => {
                vec![FeedKind::PendingApprovals, FeedKind::Requests]
            }
            Self::Finance { tab: FinanceTab::Payments } => vec![FeedKind::Payments],
            Self::Admin => vec![FeedKind::Requests, FeedKind::Payments],
            Self::Unsupported { .. } => Vec::new(),
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported { .. })
    }
}
