use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::directory::UserId;
use crate::domain::request::RequestId;
use crate::domain::{nullable, timestamp};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApprovalId(pub i64);

impl fmt::Display for ApprovalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role that owns one step of an approval chain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalRole {
    Manager,
    Finance,
    Legal,
    #[default]
    #[serde(other)]
    Unknown,
}

impl ApprovalRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manager => "manager",
            Self::Finance => "finance",
            Self::Legal => "legal",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ApprovalRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
    #[default]
    #[serde(other)]
    Unknown,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One required sign-off in a request's workflow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    pub id: ApprovalId,
    pub request_id: RequestId,
    pub approver_id: UserId,
    #[serde(default, deserialize_with = "nullable::or_default")]
    pub role: ApprovalRole,
    #[serde(default, deserialize_with = "nullable::or_default")]
    pub status: ApprovalStatus,
    #[serde(default, deserialize_with = "nullable::or_default")]
    pub step_order: u32,
    #[serde(default, with = "timestamp::lenient")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::lenient", skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approver_name: Option<String>,
}

/// A pending approval row joined with the request fields an approver needs to decide.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingApproval {
    pub id: ApprovalId,
    pub request_id: RequestId,
    pub approver_id: UserId,
    #[serde(default, deserialize_with = "nullable::or_default")]
    pub role: ApprovalRole,
    #[serde(default, deserialize_with = "nullable::or_default")]
    pub status: ApprovalStatus,
    #[serde(default, deserialize_with = "nullable::or_default")]
    pub step_order: u32,
    #[serde(default, deserialize_with = "nullable::or_default")]
    pub title: String,
    #[serde(default, deserialize_with = "nullable::or_default")]
    pub description: String,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(default)]
    pub requester_name: Option<String>,
    #[serde(default)]
    pub vendor_name: Option<String>,
    #[serde(default)]
    pub department_name: Option<String>,
    #[serde(default, with = "timestamp::lenient")]
    pub request_created: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{ApprovalRole, ApprovalStatus, PendingApproval};

    #[test]
    fn pending_approval_decodes_backend_join_row() {
        let row: PendingApproval = serde_json::from_str(
            r#"{
                "id": 4, "request_id": 2, "approver_id": 3, "role": "finance",
                "status": "pending", "step_order": 2, "comment": null,
                "created_at": "2024-05-01 09:30:00",
                "title": "Snyk licence", "description": "Security scanning",
                "amount": 12000.0, "request_created": "2024-05-01 09:29:58",
                "requester_name": "Alice Chen", "vendor_name": "Snyk",
                "department_name": "Engineering"
            }"#,
        )
        .expect("pending approval row should decode");

        assert_eq!(row.role, ApprovalRole::Finance);
        assert_eq!(row.status, ApprovalStatus::Pending);
        assert_eq!(row.amount, Decimal::new(12000, 0));
        assert!(row.request_created.is_some());
        assert_eq!(row.vendor_name.as_deref(), Some("Snyk"));
    }

    #[test]
    fn unrecognized_statuses_fall_back_to_unknown() {
        let status: ApprovalStatus =
            serde_json::from_str(r#""escalated""#).expect("status should decode");
        assert_eq!(status, ApprovalStatus::Unknown);
    }

    #[test]
    fn pending_approval_tolerates_null_request_text() {
        let row: PendingApproval = serde_json::from_str(
            r#"{
                "id": 5, "request_id": 3, "approver_id": 2, "role": "manager",
                "status": null, "step_order": null, "comment": null,
                "created_at": null, "title": null, "description": null,
                "amount": 75.0, "request_created": null, "requester_name": null,
                "vendor_name": null, "department_name": null
            }"#,
        )
        .expect("pending approval with null columns should decode");

        assert_eq!(row.title, "");
        assert_eq!(row.description, "");
        assert_eq!(row.status, ApprovalStatus::Pending);
        assert_eq!(row.step_order, 0);
    }
}
