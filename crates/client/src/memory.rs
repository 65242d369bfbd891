use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use procure_core::domain::approval::PendingApproval;
use procure_core::domain::directory::{Department, User, UserId, Vendor};
use procure_core::domain::payment::{Payment, PaymentId, PaymentOutcome};
use procure_core::domain::request::{
    DecisionReceipt, NewRequest, PurchaseRequest, RequestDetail, RequestId, SubmissionReceipt,
};
use procure_core::fixtures::demo_directory;
use procure_core::flows::WorkflowEngine;
use tokio::sync::RwLock;

use crate::api::{HealthStatus, ProcessReceipt, ProcurementApi};
use crate::error::ApiError;

/// Serves the backend contract from an in-process [`WorkflowEngine`].
#[derive(Clone)]
pub struct InMemoryProcurementApi {
    engine: Arc<RwLock<WorkflowEngine>>,
}

impl InMemoryProcurementApi {
    pub fn new(engine: WorkflowEngine) -> Self {
        Self { engine: Arc::new(RwLock::new(engine)) }
    }

    /// Engine seeded with the demo users, departments and vendors.
    pub fn demo() -> Self {
        Self::new(WorkflowEngine::with_directory(demo_directory()))
    }

    pub fn engine(&self) -> Arc<RwLock<WorkflowEngine>> {
        Arc::clone(&self.engine)
    }
}

#[async_trait]
impl ProcurementApi for InMemoryProcurementApi {
    async fn health(&self) -> Result<HealthStatus, ApiError> {
        Ok(HealthStatus {
            status: "healthy".to_owned(),
            message: "in-memory procurement engine".to_owned(),
        })
    }

    async fn users(&self) -> Result<Vec<User>, ApiError> {
        Ok(self.engine.read().await.users())
    }

    async fn vendors(&self) -> Result<Vec<Vendor>, ApiError> {
        Ok(self.engine.read().await.vendors())
    }

    async fn departments(&self) -> Result<Vec<Department>, ApiError> {
        Ok(self.engine.read().await.departments())
    }

    async fn requests(&self) -> Result<Vec<PurchaseRequest>, ApiError> {
        Ok(self.engine.read().await.requests())
    }

    async fn request_detail(&self, request_id: RequestId) -> Result<RequestDetail, ApiError> {
        Ok(self.engine.read().await.request_detail(request_id)?)
    }

    async fn submit_request(
        &self,
        submission: &NewRequest,
    ) -> Result<SubmissionReceipt, ApiError> {
        Ok(self.engine.write().await.submit(submission.clone(), Utc::now())?)
    }

    async fn approve(
        &self,
        request_id: RequestId,
        approver_id: UserId,
    ) -> Result<DecisionReceipt, ApiError> {
        Ok(self.engine.write().await.approve(request_id, approver_id, Utc::now())?)
    }

    async fn reject(
        &self,
        request_id: RequestId,
        approver_id: UserId,
    ) -> Result<DecisionReceipt, ApiError> {
        Ok(self.engine.write().await.reject(request_id, approver_id, Utc::now())?)
    }

    async fn pending_approvals(&self, user_id: UserId) -> Result<Vec<PendingApproval>, ApiError> {
        Ok(self.engine.read().await.pending_approvals_for(user_id))
    }

    async fn payments(&self) -> Result<Vec<Payment>, ApiError> {
        Ok(self.engine.read().await.payments())
    }

    async fn process_payment(
        &self,
        payment_id: PaymentId,
        processed_by: UserId,
        outcome: PaymentOutcome,
    ) -> Result<ProcessReceipt, ApiError> {
        let payment = self.engine.write().await.process_payment(
            payment_id,
            processed_by,
            outcome,
            Utc::now(),
        )?;
        Ok(ProcessReceipt {
            payment_id: payment.id,
            message: format!("Payment {outcome} successfully"),
        })
    }
}
