//! In-memory reference implementation of the request/approval/payment lifecycle.
//!
//! The engine owns the same state the procurement backend persists and enforces the
//! lifecycle contract on every mutation: approval rows are created from the routing rule,
//! a request only moves while `pending`, a payment appears exactly when the last step is
//! approved, and a payment is processed exactly once.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

use crate::audit::{AuditAction, AuditRecord, AuditTrail, InMemoryAuditTrail};
use crate::domain::approval::{
    Approval, ApprovalId, ApprovalRole, ApprovalStatus, PendingApproval,
};
use crate::domain::directory::{Department, Directory, Role, User, UserId, Vendor};
use crate::domain::payment::{
    new_transaction_id, Payment, PaymentId, PaymentMethod, PaymentOutcome, PaymentStatus,
};
use crate::domain::request::{
    CreatedStep, DecisionReceipt, NewRequest, PurchaseRequest, RequestDetail, RequestId,
    RequestStatus, SubmissionReceipt,
};
use crate::errors::DomainError;
use crate::flows::states::{derive_request_status, ApprovalDecision};
use crate::routing::route_for;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("request {0} was not found")]
    RequestNotFound(RequestId),
    #[error("payment {0} was not found")]
    PaymentNotFound(PaymentId),
    #[error("user {0} is not known")]
    UnknownUser(UserId),
    #[error("vendor {0} is not known")]
    UnknownVendor(i64),
    #[error("department {0} is not known")]
    UnknownDepartment(i64),
    #[error("invalid submission: {0}")]
    InvalidSubmission(String),
    #[error("no approver is available for the {0} step")]
    NoApproverForRole(ApprovalRole),
    #[error("request {request_id} is already {status}")]
    RequestClosed { request_id: RequestId, status: RequestStatus },
    #[error("no pending approval found for user {approver_id} on request {request_id}")]
    NoPendingApproval { request_id: RequestId, approver_id: UserId },
    #[error("payment {payment_id} is already {status}")]
    PaymentAlreadyProcessed { payment_id: PaymentId, status: PaymentStatus },
    #[error("not authorized: {0}")]
    NotAuthorized(String),
}

impl LifecycleError {
    /// Status code the procurement backend answers with for this failure.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::RequestNotFound(_)
            | Self::PaymentNotFound(_)
            | Self::NoPendingApproval { .. } => 404,
            Self::RequestClosed { .. } | Self::PaymentAlreadyProcessed { .. } => 409,
            Self::NotAuthorized(_) => 403,
            Self::UnknownUser(_)
            | Self::UnknownVendor(_)
            | Self::UnknownDepartment(_)
            | Self::InvalidSubmission(_)
            | Self::NoApproverForRole(_) => 422,
        }
    }
}

impl From<DomainError> for LifecycleError {
    fn from(value: DomainError) -> Self {
        Self::InvalidSubmission(value.to_string())
    }
}

pub struct WorkflowEngine<A = InMemoryAuditTrail> {
    directory: Directory,
    requests: BTreeMap<RequestId, PurchaseRequest>,
    approvals: BTreeMap<ApprovalId, Approval>,
    payments: BTreeMap<PaymentId, Payment>,
    audit: A,
    next_request_id: i64,
    next_approval_id: i64,
    next_payment_id: i64,
}

impl WorkflowEngine<InMemoryAuditTrail> {
    pub fn with_directory(directory: Directory) -> Self {
        Self::with_audit(directory, InMemoryAuditTrail::default())
    }
}

impl<A> WorkflowEngine<A>
where
    A: AuditTrail,
{
    pub fn with_audit(directory: Directory, audit: A) -> Self {
        Self {
            directory,
            requests: BTreeMap::new(),
            approvals: BTreeMap::new(),
            payments: BTreeMap::new(),
            audit,
            next_request_id: 1,
            next_approval_id: 1,
            next_payment_id: 1,
        }
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    pub fn users(&self) -> Vec<User> {
        self.directory.users.clone()
    }

    pub fn departments(&self) -> Vec<Department> {
        self.directory.departments.clone()
    }

    pub fn vendors(&self) -> Vec<Vendor> {
        self.directory.vendors.clone()
    }

    pub fn submit(
        &mut self,
        submission: NewRequest,
        now: DateTime<Utc>,
    ) -> Result<SubmissionReceipt, LifecycleError> {
        submission.validate()?;

        let requester = self
            .directory
            .user(submission.requester_id)
            .ok_or(LifecycleError::UnknownUser(submission.requester_id))?;
        let vendor = self
            .directory
            .vendor(submission.vendor_id)
            .ok_or(LifecycleError::UnknownVendor(submission.vendor_id.0))?;
        let department = self
            .directory
            .department(submission.department_id)
            .ok_or(LifecycleError::UnknownDepartment(submission.department_id.0))?;

        let route = route_for(submission.amount, vendor.is_new_vendor);

        // Resolve every approver before storing anything so a missing approver leaves no
        // partially created request behind.
        let mut steps = Vec::with_capacity(route.len());
        for step in route.steps {
            let approver = self.approver_for(step.role, &submission)?;
            steps.push(CreatedStep {
                step,
                approver_id: approver.id,
                approver_name: Some(approver.name.clone()),
            });
        }

        let request_id = RequestId(self.next_request_id);
        self.next_request_id += 1;

        let request = PurchaseRequest {
            id: request_id,
            title: submission.title.trim().to_owned(),
            description: submission.description.clone(),
            amount: submission.amount,
            requester_id: requester.id,
            vendor_id: vendor.id,
            department_id: department.id,
            status: RequestStatus::Pending,
            created_at: Some(now),
            requester_name: Some(requester.name.clone()),
            vendor_name: Some(vendor.name.clone()),
            department_name: Some(department.name.clone()),
        };
        let requester_name = requester.name.clone();

        for created in &steps {
            let approval_id = ApprovalId(self.next_approval_id);
            self.next_approval_id += 1;
            self.approvals.insert(
                approval_id,
                Approval {
                    id: approval_id,
                    request_id,
                    approver_id: created.approver_id,
                    role: created.step.role,
                    status: ApprovalStatus::Pending,
                    step_order: created.step.step_order,
                    created_at: Some(now),
                    approved_at: None,
                    approver_name: created.approver_name.clone(),
                },
            );
        }

        self.audit.append(AuditRecord {
            request_id,
            actor_id: submission.requester_id,
            actor_name: Some(requester_name),
            action: AuditAction::Created,
            details: format!("Request created: {}", request.title),
            occurred_at: now,
        });

        info!(
            event_name = "workflow.request.submitted",
            request_id = %request_id,
            requester_id = %submission.requester_id,
            amount = %submission.amount,
            steps = steps.len(),
            "purchase request submitted"
        );

        self.requests.insert(request_id, request);
        Ok(SubmissionReceipt { request_id, status: RequestStatus::Pending, approval_steps: steps })
    }

    pub fn approve(
        &mut self,
        request_id: RequestId,
        approver_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<DecisionReceipt, LifecycleError> {
        self.decide(request_id, approver_id, ApprovalDecision::Approve, now)
    }

    pub fn reject(
        &mut self,
        request_id: RequestId,
        approver_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<DecisionReceipt, LifecycleError> {
        self.decide(request_id, approver_id, ApprovalDecision::Reject, now)
    }

    pub fn decide(
        &mut self,
        request_id: RequestId,
        approver_id: UserId,
        decision: ApprovalDecision,
        now: DateTime<Utc>,
    ) -> Result<DecisionReceipt, LifecycleError> {
        let current = self
            .requests
            .get(&request_id)
            .map(|request| request.status)
            .ok_or(LifecycleError::RequestNotFound(request_id))?;
        if current.is_terminal() {
            warn!(
                event_name = "workflow.approval.closed",
                request_id = %request_id,
                approver_id = %approver_id,
                status = %current,
                "decision on a closed request refused"
            );
            return Err(LifecycleError::RequestClosed { request_id, status: current });
        }

        // Step order is displayed, not enforced: the caller's lowest pending step is taken
        // even when an earlier step owned by someone else is still open.
        let approval_id = self
            .approvals
            .values()
            .filter(|approval| {
                approval.request_id == request_id
                    && approval.approver_id == approver_id
                    && approval.status.is_pending()
            })
            .min_by_key(|approval| (approval.step_order, approval.id))
            .map(|approval| approval.id)
            .ok_or(LifecycleError::NoPendingApproval { request_id, approver_id })?;

        if let Some(approval) = self.approvals.get_mut(&approval_id) {
            approval.status = decision.resulting_step_status();
            approval.approved_at = Some(now);
        }

        let derived = derive_request_status(
            self.approvals
                .values()
                .filter(|approval| approval.request_id == request_id)
                .map(|approval| approval.status),
        );

        let actor_name = self.directory.user(approver_id).map(|user| user.name.clone());
        let mut status = current;
        if derived != current {
            status.transition_to(derived).map_err(LifecycleError::from)?;
            if let Some(request) = self.requests.get_mut(&request_id) {
                request.status = status;
            }
        }

        if status == RequestStatus::Approved {
            let payment_id = self.create_payment(request_id, now);
            self.audit.append(AuditRecord {
                request_id,
                actor_id: approver_id,
                actor_name: actor_name.clone(),
                action: AuditAction::PaymentCreated,
                details: format!("Payment created (ID: {payment_id})"),
                occurred_at: now,
            });
        }

        let action = match decision {
            ApprovalDecision::Approve => AuditAction::Approved,
            ApprovalDecision::Reject => AuditAction::Rejected,
        };
        self.audit.append(AuditRecord {
            request_id,
            actor_id: approver_id,
            actor_name,
            action,
            details: capitalize(decision.past_tense()),
            occurred_at: now,
        });

        info!(
            event_name = "workflow.approval.decided",
            request_id = %request_id,
            approver_id = %approver_id,
            decision = %decision,
            request_status = %status,
            "approval step decided"
        );

        Ok(DecisionReceipt { status, message: format!("Request {}", decision.past_tense()) })
    }

    pub fn process_payment(
        &mut self,
        payment_id: PaymentId,
        processed_by: UserId,
        outcome: PaymentOutcome,
        now: DateTime<Utc>,
    ) -> Result<Payment, LifecycleError> {
        let processor =
            self.directory.user(processed_by).ok_or(LifecycleError::UnknownUser(processed_by))?;
        if processor.role != Role::Finance {
            return Err(LifecycleError::NotAuthorized(format!(
                "user {processed_by} ({}) cannot process payments",
                processor.role
            )));
        }
        let processor_name = processor.name.clone();

        let payment =
            self.payments.get_mut(&payment_id).ok_or(LifecycleError::PaymentNotFound(payment_id))?;
        if payment.payment_status.transition_to(outcome.status()).is_err() {
            warn!(
                event_name = "workflow.payment.already_processed",
                payment_id = %payment_id,
                status = %payment.payment_status,
                "payment processing refused"
            );
            return Err(LifecycleError::PaymentAlreadyProcessed {
                payment_id,
                status: payment.payment_status,
            });
        }
        payment.processed_by = Some(processed_by);
        payment.processed_at = Some(now);
        payment.processed_by_name = Some(processor_name.clone());
        let processed = payment.clone();

        let action = match outcome {
            PaymentOutcome::Completed => AuditAction::PaymentCompleted,
            PaymentOutcome::Failed => AuditAction::PaymentFailed,
        };
        self.audit.append(AuditRecord {
            request_id: processed.request_id,
            actor_id: processed_by,
            actor_name: Some(processor_name.clone()),
            action,
            details: format!("Payment {outcome} by {processor_name}"),
            occurred_at: now,
        });

        info!(
            event_name = "workflow.payment.processed",
            payment_id = %payment_id,
            processed_by = %processed_by,
            outcome = %outcome,
            "payment processed"
        );

        Ok(processed)
    }

    /// Every request, newest first.
    pub fn requests(&self) -> Vec<PurchaseRequest> {
        let mut requests: Vec<PurchaseRequest> = self.requests.values().cloned().collect();
        requests.sort_by(|left, right| {
            right.created_at.cmp(&left.created_at).then_with(|| right.id.cmp(&left.id))
        });
        requests
    }

    pub fn request_detail(&self, request_id: RequestId) -> Result<RequestDetail, LifecycleError> {
        let request = self
            .requests
            .get(&request_id)
            .cloned()
            .ok_or(LifecycleError::RequestNotFound(request_id))?;

        let mut approvals: Vec<Approval> = self
            .approvals
            .values()
            .filter(|approval| approval.request_id == request_id)
            .cloned()
            .collect();
        approvals.sort_by_key(|approval| (approval.step_order, approval.id));

        Ok(RequestDetail { request, approvals, audit_trail: self.audit.entries_for(request_id) })
    }

    pub fn approvals_for(&self, request_id: RequestId) -> Vec<Approval> {
        self.approvals
            .values()
            .filter(|approval| approval.request_id == request_id)
            .cloned()
            .collect()
    }

    /// Pending rows assigned to `user` on requests that can still move, oldest request first.
    pub fn pending_approvals_for(&self, user: UserId) -> Vec<PendingApproval> {
        let mut pending: Vec<(Option<DateTime<Utc>>, PendingApproval)> = self
            .approvals
            .values()
            .filter(|approval| approval.approver_id == user && approval.status.is_pending())
            .filter_map(|approval| {
                let request = self.requests.get(&approval.request_id)?;
                (request.status == RequestStatus::Pending).then(|| {
                    (
                        request.created_at,
                        PendingApproval {
                            id: approval.id,
                            request_id: approval.request_id,
                            approver_id: approval.approver_id,
                            role: approval.role,
                            status: approval.status,
                            step_order: approval.step_order,
                            title: request.title.clone(),
                            description: request.description.clone(),
                            amount: request.amount,
                            requester_name: request.requester_name.clone(),
                            vendor_name: request.vendor_name.clone(),
                            department_name: request.department_name.clone(),
                            request_created: request.created_at,
                        },
                    )
                })
            })
            .collect();
        pending.sort_by(|left, right| {
            left.0.cmp(&right.0).then_with(|| left.1.request_id.cmp(&right.1.request_id))
        });
        pending.into_iter().map(|(_, row)| row).collect()
    }

    /// Every payment, newest first.
    pub fn payments(&self) -> Vec<Payment> {
        let mut payments: Vec<Payment> = self.payments.values().cloned().collect();
        payments.sort_by(|left, right| {
            right.created_at.cmp(&left.created_at).then_with(|| right.id.cmp(&left.id))
        });
        payments
    }

    pub fn payment_for(&self, request_id: RequestId) -> Option<&Payment> {
        self.payments.values().find(|payment| payment.request_id == request_id)
    }

    fn approver_for(
        &self,
        role: ApprovalRole,
        submission: &NewRequest,
    ) -> Result<&User, LifecycleError> {
        let approver = match role {
            ApprovalRole::Manager => self.directory.department_manager(submission.department_id),
            ApprovalRole::Finance => self.directory.first_with_role(Role::Finance),
            ApprovalRole::Legal => self.directory.first_with_role(Role::Legal),
            ApprovalRole::Unknown => None,
        };
        approver.ok_or(LifecycleError::NoApproverForRole(role))
    }

    fn create_payment(&mut self, request_id: RequestId, now: DateTime<Utc>) -> PaymentId {
        if let Some(existing) = self.payment_for(request_id) {
            return existing.id;
        }

        let payment_id = PaymentId(self.next_payment_id);
        self.next_payment_id += 1;

        let request = self.requests.get(&request_id);
        let payment = Payment {
            id: payment_id,
            request_id,
            amount: request.map(|request| request.amount).unwrap_or_default(),
            payment_method: PaymentMethod::BankTransfer,
            payment_status: PaymentStatus::Pending,
            transaction_id: new_transaction_id(),
            processed_by: None,
            processed_at: None,
            created_at: Some(now),
            title: request.map(|request| request.title.clone()).unwrap_or_default(),
            description: request.map(|request| request.description.clone()).unwrap_or_default(),
            vendor_id: request.map(|request| request.vendor_id),
            vendor_name: request.and_then(|request| request.vendor_name.clone()),
            processed_by_name: None,
        };

        info!(
            event_name = "workflow.payment.created",
            request_id = %request_id,
            payment_id = %payment_id,
            transaction_id = %payment.transaction_id,
            "payment created for approved request"
        );
        self.payments.insert(payment_id, payment);
        payment_id
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use crate::audit::AuditAction;
    use crate::domain::approval::{ApprovalRole, ApprovalStatus};
    use crate::domain::directory::{DepartmentId, Directory, Role, UserId, VendorId};
    use crate::domain::payment::{PaymentOutcome, PaymentStatus};
    use crate::domain::request::{NewRequest, RequestId, RequestStatus};
    use crate::fixtures::{
        demo_directory, ADMIN, ENGINEERING, EXISTING_VENDOR, FINANCE, LEGAL, MANAGER, NEW_VENDOR,
        REQUESTER,
    };
    use crate::routing::route_for;

    use super::{LifecycleError, WorkflowEngine};

    fn submission(amount: i64, vendor: VendorId) -> NewRequest {
        NewRequest {
            title: "Tooling".to_owned(),
            description: "Team tooling purchase".to_owned(),
            amount: Decimal::new(amount, 0),
            vendor_id: vendor,
            department_id: ENGINEERING,
            requester_id: REQUESTER,
        }
    }

    fn engine() -> WorkflowEngine {
        WorkflowEngine::with_directory(demo_directory())
    }

    #[test]
    fn created_rows_match_route_preview_for_every_vector() {
        let mut engine = engine();
        for (amount, vendor) in [
            (500, EXISTING_VENDOR),
            (500, NEW_VENDOR),
            (10_000, EXISTING_VENDOR),
            (12_000, EXISTING_VENDOR),
            (12_000, NEW_VENDOR),
        ] {
            let is_new = vendor == NEW_VENDOR;
            let receipt = engine.submit(submission(amount, vendor), Utc::now()).expect("submit");
            let detail = engine.request_detail(receipt.request_id).expect("detail");

            let created: Vec<ApprovalRole> =
                detail.approvals.iter().map(|approval| approval.role).collect();
            assert_eq!(created, route_for(Decimal::new(amount, 0), is_new).roles());
            assert!(detail.approvals.iter().all(|approval| approval.status.is_pending()));
        }
    }

    #[test]
    fn three_step_chain_rejected_at_legal_step() {
        let mut engine = engine();
        let now = Utc::now();
        let receipt = engine.submit(submission(12_000, NEW_VENDOR), now).expect("submit");
        let request_id = receipt.request_id;
        assert_eq!(receipt.approval_steps.len(), 3);

        assert_eq!(engine.approve(request_id, MANAGER, now).expect("manager").status, RequestStatus::Pending);
        assert_eq!(engine.approve(request_id, FINANCE, now).expect("finance").status, RequestStatus::Pending);
        let rejected = engine.reject(request_id, LEGAL, now).expect("legal rejects");
        assert_eq!(rejected.status, RequestStatus::Rejected);

        let detail = engine.request_detail(request_id).expect("detail");
        let statuses: Vec<ApprovalStatus> =
            detail.approvals.iter().map(|approval| approval.status).collect();
        assert_eq!(
            statuses,
            vec![ApprovalStatus::Approved, ApprovalStatus::Approved, ApprovalStatus::Rejected]
        );
        assert_eq!(detail.request.status, RequestStatus::Rejected);
        assert!(engine.payments().is_empty(), "rejected requests never create payments");
    }

    #[test]
    fn single_step_chain_creates_one_pending_payment() {
        let mut engine = engine();
        let now = Utc::now();
        let receipt = engine.submit(submission(500, EXISTING_VENDOR), now).expect("submit");
        assert_eq!(receipt.approval_steps.len(), 1);
        assert_eq!(receipt.approval_steps[0].step.role, ApprovalRole::Manager);

        let approved = engine.approve(receipt.request_id, MANAGER, now).expect("approve");
        assert_eq!(approved.status, RequestStatus::Approved);

        let payments = engine.payments();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].payment_status, PaymentStatus::Pending);
        assert_eq!(payments[0].amount, Decimal::new(500, 0));
        assert_eq!(payments[0].request_id, receipt.request_id);
        assert_eq!(payments[0].vendor_name.as_deref(), Some("GitHub"));
    }

    #[test]
    fn payment_appears_only_when_the_last_step_completes() {
        let mut engine = engine();
        let now = Utc::now();
        let request_id = engine.submit(submission(12_000, NEW_VENDOR), now).expect("submit").request_id;

        engine.approve(request_id, MANAGER, now).expect("manager");
        engine.approve(request_id, FINANCE, now).expect("finance");
        assert!(engine.payment_for(request_id).is_none(), "one step still pending");

        engine.approve(request_id, LEGAL, now).expect("legal");
        assert!(engine.payment_for(request_id).is_some());
        assert_eq!(engine.payments().len(), 1);

        let actions: Vec<AuditAction> = engine
            .request_detail(request_id)
            .expect("detail")
            .audit_trail
            .into_iter()
            .map(|entry| entry.action)
            .collect();
        assert!(actions.contains(&AuditAction::PaymentCreated));
        assert_eq!(actions.iter().filter(|action| **action == AuditAction::Approved).count(), 3);
    }

    #[test]
    fn approving_twice_is_refused() {
        let mut engine = engine();
        let now = Utc::now();
        let request_id = engine.submit(submission(12_000, EXISTING_VENDOR), now).expect("submit").request_id;

        engine.approve(request_id, MANAGER, now).expect("first approval");
        let error = engine.approve(request_id, MANAGER, now).expect_err("second approval");
        assert_eq!(error, LifecycleError::NoPendingApproval { request_id, approver_id: MANAGER });
        assert_eq!(error.http_status(), 404);
    }

    #[test]
    fn terminal_requests_refuse_further_decisions() {
        let mut engine = engine();
        let now = Utc::now();
        let request_id = engine.submit(submission(12_000, NEW_VENDOR), now).expect("submit").request_id;

        engine.reject(request_id, MANAGER, now).expect("manager rejects");
        let error = engine.approve(request_id, FINANCE, now).expect_err("request is closed");
        assert!(matches!(
            error,
            LifecycleError::RequestClosed { status: RequestStatus::Rejected, .. }
        ));
        assert_eq!(error.http_status(), 409);
        assert!(engine.pending_approvals_for(FINANCE).is_empty());
    }

    #[test]
    fn out_of_order_approval_is_accepted() {
        let mut engine = engine();
        let now = Utc::now();
        let request_id = engine.submit(submission(12_000, NEW_VENDOR), now).expect("submit").request_id;

        let receipt = engine.approve(request_id, LEGAL, now).expect("legal before manager");
        assert_eq!(receipt.status, RequestStatus::Pending);
    }

    #[test]
    fn payments_are_processed_exactly_once_by_finance() {
        let mut engine = engine();
        let now = Utc::now();
        let request_id = engine.submit(submission(500, EXISTING_VENDOR), now).expect("submit").request_id;
        engine.approve(request_id, MANAGER, now).expect("approve");
        let payment_id = engine.payment_for(request_id).map(|payment| payment.id).expect("payment");

        let denied = engine
            .process_payment(payment_id, ADMIN, PaymentOutcome::Completed, now)
            .expect_err("admins do not process payments");
        assert_eq!(denied.http_status(), 403);

        let later = now + Duration::seconds(5);
        let processed = engine
            .process_payment(payment_id, FINANCE, PaymentOutcome::Completed, later)
            .expect("finance processes");
        assert_eq!(processed.payment_status, PaymentStatus::Completed);
        assert_eq!(processed.processed_by, Some(FINANCE));
        assert_eq!(processed.processed_at, Some(later));
        assert_eq!(processed.processed_by_name.as_deref(), Some("Fiona Davis"));

        let again = engine
            .process_payment(payment_id, FINANCE, PaymentOutcome::Failed, later)
            .expect_err("terminal payment");
        assert_eq!(
            again,
            LifecycleError::PaymentAlreadyProcessed { payment_id, status: PaymentStatus::Completed }
        );
    }

    #[test]
    fn missing_approver_leaves_no_partial_request() {
        let mut directory: Directory = demo_directory();
        directory.users.retain(|user| user.role != Role::Legal);
        let mut engine = WorkflowEngine::with_directory(directory);

        let error = engine.submit(submission(500, NEW_VENDOR), Utc::now()).expect_err("no legal");
        assert_eq!(error, LifecycleError::NoApproverForRole(ApprovalRole::Legal));
        assert!(engine.requests().is_empty());
        assert!(engine.approvals_for(RequestId(1)).is_empty());
    }

    #[test]
    fn submissions_are_validated_against_the_directory() {
        let mut engine = engine();
        let mut bad_vendor = submission(500, VendorId(99));
        assert_eq!(
            engine.submit(bad_vendor.clone(), Utc::now()).expect_err("unknown vendor"),
            LifecycleError::UnknownVendor(99)
        );

        bad_vendor.vendor_id = EXISTING_VENDOR;
        bad_vendor.department_id = DepartmentId(42);
        assert_eq!(
            engine.submit(bad_vendor.clone(), Utc::now()).expect_err("unknown department"),
            LifecycleError::UnknownDepartment(42)
        );

        let mut blank = submission(500, EXISTING_VENDOR);
        blank.title = " ".to_owned();
        let error = engine.submit(blank, Utc::now()).expect_err("blank title");
        assert_eq!(error.http_status(), 422);

        let mut stranger = submission(500, EXISTING_VENDOR);
        stranger.requester_id = UserId(77);
        assert_eq!(
            engine.submit(stranger, Utc::now()).expect_err("unknown requester"),
            LifecycleError::UnknownUser(UserId(77))
        );
    }

    #[test]
    fn listings_are_ordered_for_display() {
        let mut engine = engine();
        let first = Utc::now();
        let second = first + Duration::seconds(1);
        let older = engine.submit(submission(500, EXISTING_VENDOR), first).expect("older").request_id;
        let newer = engine.submit(submission(700, EXISTING_VENDOR), second).expect("newer").request_id;

        let ids: Vec<RequestId> = engine.requests().into_iter().map(|request| request.id).collect();
        assert_eq!(ids, vec![newer, older], "requests are listed newest first");

        let pending: Vec<RequestId> =
            engine.pending_approvals_for(MANAGER).into_iter().map(|row| row.request_id).collect();
        assert_eq!(pending, vec![older, newer], "approvals are listed oldest first");
    }
}
