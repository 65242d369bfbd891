//! User-triggered mutations.
//!
//! Each action is one backend call with no retry. On success the affected feeds are asked
//! to re-fetch; on failure the caller gets an [`ActionAlert`] to show and nothing local
//! changes.

use std::fmt;
use std::sync::Arc;

use procure_core::domain::directory::UserId;
use procure_core::domain::payment::{PaymentId, PaymentOutcome};
use procure_core::domain::request::{
    DecisionReceipt, NewRequest, RequestId, SubmissionReceipt,
};
use procure_core::flows::ApprovalDecision;
use tracing::{info, warn};

use crate::api::{ProcessReceipt, ProcurementApi};
use crate::error::ApiError;
use crate::refresh::{FeedKey, RefreshHub};

/// A failed action, ready to show to the operator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionAlert {
    pub action: String,
    pub message: String,
    pub error: ApiError,
}

impl ActionAlert {
    fn new(action: impl Into<String>, error: ApiError) -> Self {
        Self { action: action.into(), message: error.alert_message(), error }
    }

    pub fn is_retryable(&self) -> bool {
        self.error.is_retryable_by_user()
    }
}

impl fmt::Display for ActionAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.action, self.message)
    }
}

impl std::error::Error for ActionAlert {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

pub struct ActionRunner {
    api: Arc<dyn ProcurementApi>,
    hub: Option<Arc<RefreshHub>>,
}

impl ActionRunner {
    pub fn new(api: Arc<dyn ProcurementApi>) -> Self {
        Self { api, hub: None }
    }

    /// Runs actions against the hub's API and refreshes its feeds afterwards.
    pub fn with_hub(hub: Arc<RefreshHub>) -> Self {
        Self { api: hub.api(), hub: Some(hub) }
    }

    pub async fn submit(&self, submission: &NewRequest) -> Result<SubmissionReceipt, ActionAlert> {
        let receipt = self
            .api
            .submit_request(submission)
            .await
            .map_err(|error| alert("submit request", submission.requester_id, error))?;

        info!(
            event_name = "client.action.submitted",
            request_id = %receipt.request_id,
            user_id = %submission.requester_id,
            steps = receipt.approval_steps.len(),
            "request submitted"
        );
        self.refresh_where(|key| {
            matches!(key, FeedKey::Requests | FeedKey::PendingApprovals(_))
        });
        Ok(receipt)
    }

    pub async fn decide(
        &self,
        request_id: RequestId,
        approver_id: UserId,
        decision: ApprovalDecision,
    ) -> Result<DecisionReceipt, ActionAlert> {
        let action = format!("{decision} request {request_id}");
        let receipt = self
            .api
            .decide(request_id, approver_id, decision)
            .await
            .map_err(|error| alert(&action, approver_id, error))?;

        info!(
            event_name = "client.action.decided",
            request_id = %request_id,
            user_id = %approver_id,
            decision = %decision,
            status = %receipt.status,
            "approval decision recorded"
        );
        // A final approval also creates a payment.
        self.refresh_where(|key| match key {
            FeedKey::Requests | FeedKey::Payments | FeedKey::PendingApprovals(_) => true,
            FeedKey::RequestDetail(id) => *id == request_id,
            FeedKey::Reference => false,
        });
        Ok(receipt)
    }

    pub async fn approve(
        &self,
        request_id: RequestId,
        approver_id: UserId,
    ) -> Result<DecisionReceipt, ActionAlert> {
        self.decide(request_id, approver_id, ApprovalDecision::Approve).await
    }

    pub async fn reject(
        &self,
        request_id: RequestId,
        approver_id: UserId,
    ) -> Result<DecisionReceipt, ActionAlert> {
        self.decide(request_id, approver_id, ApprovalDecision::Reject).await
    }

    pub async fn process_payment(
        &self,
        payment_id: PaymentId,
        processed_by: UserId,
        outcome: PaymentOutcome,
    ) -> Result<ProcessReceipt, ActionAlert> {
        let action = format!("process payment {payment_id}");
        let receipt = self
            .api
            .process_payment(payment_id, processed_by, outcome)
            .await
            .map_err(|error| alert(&action, processed_by, error))?;

        info!(
            event_name = "client.action.payment_processed",
            payment_id = %payment_id,
            user_id = %processed_by,
            outcome = %outcome,
            "payment processed"
        );
        self.refresh_where(|key| matches!(key, FeedKey::Payments | FeedKey::RequestDetail(_)));
        Ok(receipt)
    }

    fn refresh_where<F>(&self, matches: F)
    where
        F: Fn(&FeedKey) -> bool,
    {
        if let Some(hub) = &self.hub {
            hub.refresh_where(matches);
        }
    }
}

fn alert(action: &str, user: UserId, error: ApiError) -> ActionAlert {
    warn!(
        event_name = "client.action.failed",
        action,
        user_id = %user,
        error = %error,
        "action failed; no local state changed"
    );
    ActionAlert::new(action, error)
}
