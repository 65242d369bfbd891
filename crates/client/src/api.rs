use async_trait::async_trait;
use procure_core::domain::approval::PendingApproval;
use procure_core::domain::directory::{Department, Directory, User, UserId, Vendor};
use procure_core::domain::payment::{Payment, PaymentId, PaymentOutcome};
use procure_core::domain::request::{
    DecisionReceipt, NewRequest, PurchaseRequest, RequestDetail, RequestId, SubmissionReceipt,
};
use procure_core::flows::ApprovalDecision;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// `GET /health`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

/// Response of `POST /payments/{id}/process`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessReceipt {
    pub payment_id: PaymentId,
    #[serde(default)]
    pub message: String,
}

/// One method per backend endpoint the dashboards use.
#[async_trait]
pub trait ProcurementApi: Send + Sync {
    async fn health(&self) -> Result<HealthStatus, ApiError>;

    async fn users(&self) -> Result<Vec<User>, ApiError>;

    async fn vendors(&self) -> Result<Vec<Vendor>, ApiError>;

    async fn departments(&self) -> Result<Vec<Department>, ApiError>;

    async fn requests(&self) -> Result<Vec<PurchaseRequest>, ApiError>;

    async fn request_detail(&self, request_id: RequestId) -> Result<RequestDetail, ApiError>;

    async fn submit_request(&self, submission: &NewRequest)
        -> Result<SubmissionReceipt, ApiError>;

    async fn approve(
        &self,
        request_id: RequestId,
        approver_id: UserId,
    ) -> Result<DecisionReceipt, ApiError>;

    async fn reject(
        &self,
        request_id: RequestId,
        approver_id: UserId,
    ) -> Result<DecisionReceipt, ApiError>;

    async fn pending_approvals(&self, user_id: UserId) -> Result<Vec<PendingApproval>, ApiError>;

    async fn payments(&self) -> Result<Vec<Payment>, ApiError>;

    async fn process_payment(
        &self,
        payment_id: PaymentId,
        processed_by: UserId,
        outcome: PaymentOutcome,
    ) -> Result<ProcessReceipt, ApiError>;

    async fn decide(
        &self,
        request_id: RequestId,
        approver_id: UserId,
        decision: ApprovalDecision,
    ) -> Result<DecisionReceipt, ApiError> {
        match decision {
            ApprovalDecision::Approve => self.approve(request_id, approver_id).await,
            ApprovalDecision::Reject => self.reject(request_id, approver_id).await,
        }
    }

    /// Users, vendors and departments fetched together.
    async fn directory(&self) -> Result<Directory, ApiError> {
        let (users, vendors, departments) =
            tokio::try_join!(self.users(), self.vendors(), self.departments())?;
        Ok(Directory { users, departments, vendors })
    }
}
