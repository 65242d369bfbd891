use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::audit::AuditEntry;
use crate::domain::approval::Approval;
use crate::domain::directory::{DepartmentId, UserId, VendorId};
use crate::domain::{nullable, timestamp};
use crate::errors::DomainError;
use crate::routing::RouteStep;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub i64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    #[default]
    #[serde(other)]
    Unknown,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }

    /// Only `pending` requests move, and only into a terminal state.
    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved) | (Self::Pending, Self::Rejected)
        )
    }

    pub fn transition_to(&mut self, next: RequestStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            *self = next;
            return Ok(());
        }

        Err(DomainError::InvalidRequestTransition { from: *self, to: next })
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A purchase request as the backend reports it, including the denormalized names it
/// joins in for display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRequest {
    pub id: RequestId,
    #[serde(default, deserialize_with = "nullable::or_default")]
    pub title: String,
    #[serde(default, deserialize_with = "nullable::or_default")]
    pub description: String,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub requester_id: UserId,
    pub vendor_id: VendorId,
    pub department_id: DepartmentId,
    #[serde(default, deserialize_with = "nullable::or_default")]
    pub status: RequestStatus,
    #[serde(default, with = "timestamp::lenient")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub requester_name: Option<String>,
    #[serde(default)]
    pub vendor_name: Option<String>,
    #[serde(default)]
    pub department_name: Option<String>,
}

/// Body of `POST /requests`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRequest {
    pub title: String,
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub vendor_id: VendorId,
    pub department_id: DepartmentId,
    pub requester_id: UserId,
}

impl NewRequest {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.title.trim().is_empty() {
            return Err(DomainError::InvariantViolation("request title is required".to_owned()));
        }
        if self.amount <= Decimal::ZERO {
            return Err(DomainError::InvariantViolation(
                "request amount must be greater than zero".to_owned(),
            ));
        }
        Ok(())
    }
}

/// One approval step as the backend echoes it back on submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedStep {
    #[serde(flatten)]
    pub step: RouteStep,
    pub approver_id: UserId,
    #[serde(default)]
    pub approver_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub request_id: RequestId,
    #[serde(default)]
    pub status: RequestStatus,
    #[serde(default)]
    pub approval_steps: Vec<CreatedStep>,
}

/// Response of the approve/reject endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionReceipt {
    #[serde(default)]
    pub status: RequestStatus,
    #[serde(default)]
    pub message: String,
}

/// `GET /requests/{id}`: one request with its ordered approval steps and audit trail.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDetail {
    pub request: PurchaseRequest,
    #[serde(default)]
    pub approvals: Vec<Approval>,
    #[serde(default)]
    pub audit_trail: Vec<AuditEntry>,
}

impl RequestDetail {
    /// Approval steps in the order a human reads the workflow.
    pub fn ordered_approvals(&self) -> Vec<&Approval> {
        let mut approvals: Vec<&Approval> = self.approvals.iter().collect();
        approvals.sort_by_key(|approval| (approval.step_order, approval.id));
        approvals
    }
}
