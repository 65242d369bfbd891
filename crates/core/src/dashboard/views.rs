//! Per-dashboard projections over the latest feed snapshots.

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::approval::{Approval, ApprovalId, ApprovalRole, PendingApproval};
use crate::domain::directory::{Role, User};
use crate::domain::payment::{Payment, PaymentStatus};
use crate::domain::request::{PurchaseRequest, RequestDetail, RequestId, RequestStatus};
use crate::errors::DomainError;
use crate::flows::next_pending_step;

use super::format::display_or_unknown;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub all: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}

impl StatusCounts {
    pub fn from_requests<'a, I>(requests: I) -> Self
    where
        I: IntoIterator<Item = &'a PurchaseRequest>,
    {
        let mut counts = Self::default();
        for request in requests {
            counts.all += 1;
            match request.status {
                RequestStatus::Pending => counts.pending += 1,
                RequestStatus::Approved => counts.approved += 1,
                RequestStatus::Rejected => counts.rejected += 1,
                RequestStatus::Unknown => {}
            }
        }
        counts
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RequesterView {
    pub user_name: String,
    pub requests: Vec<PurchaseRequest>,
    pub counts: StatusCounts,
}

impl RequesterView {
    /// The caller's own requests, in feed order.
    pub fn project(user: &User, requests: &[PurchaseRequest]) -> Self {
        let own: Vec<PurchaseRequest> =
            requests.iter().filter(|request| request.requester_id == user.id).cloned().collect();
        let counts = StatusCounts::from_requests(&own);
        Self { user_name: user.name.clone(), requests: own, counts }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApproverMode {
    #[default]
    Pending,
    History,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ApproverView {
    pub user_name: String,
    pub mode: ApproverMode,
    pub pending: Vec<PendingApproval>,
    pub history: Vec<PurchaseRequest>,
}

impl ApproverView {
    pub fn project(
        user: &User,
        pending: &[PendingApproval],
        requests: &[PurchaseRequest],
        mode: ApproverMode,
    ) -> Self {
        let pending = pending
            .iter()
            .filter(|row| row.approver_id == user.id && row.status.is_pending())
            .cloned()
            .collect();
        let history = match mode {
            ApproverMode::History => requests.to_vec(),
            ApproverMode::Pending => Vec::new(),
        };
        Self { user_name: user.name.clone(), mode, pending, history }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_caught_up(&self) -> bool {
        self.mode == ApproverMode::Pending && self.pending.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PaymentView {
    pub pending: Vec<Payment>,
    pub processed: Vec<Payment>,
    pub pending_total: Decimal,
}

impl PaymentView {
    pub fn project(payments: &[Payment]) -> Self {
        let (pending, processed): (Vec<Payment>, Vec<Payment>) = payments
            .iter()
            .cloned()
            .partition(|payment| payment.payment_status == PaymentStatus::Pending);
        let pending_total = pending.iter().map(|payment| payment.amount).sum();
        Self { pending, processed, pending_total }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestFilter {
    #[default]
    All,
    Pending,
    Approved,
    Rejected,
}

impl RequestFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn matches(&self, status: RequestStatus) -> bool {
        match self {
            Self::All => true,
            Self::Pending => status == RequestStatus::Pending,
            Self::Approved => status == RequestStatus::Approved,
            Self::Rejected => status == RequestStatus::Rejected,
        }
    }
}

impl fmt::Display for RequestFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RequestFilter {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => {
                Err(DomainError::UnknownValue { kind: "request filter", value: other.to_owned() })
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStats {
    pub pending: usize,
    pub completed: usize,
    pub failed: usize,
    pub total_amount: Decimal,
}

impl PaymentStats {
    pub fn from_payments(payments: &[Payment]) -> Self {
        let mut stats = Self::default();
        for payment in payments {
            match payment.payment_status {
                PaymentStatus::Pending => stats.pending += 1,
                PaymentStatus::Completed => stats.completed += 1,
                PaymentStatus::Failed => stats.failed += 1,
                PaymentStatus::Unknown => {}
            }
            stats.total_amount += payment.amount;
        }
        stats
    }
}

/// Requested amounts per vendor, split by request status.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorSpend {
    pub name: String,
    pub total: Decimal,
    pub approved: Decimal,
    pub pending: Decimal,
    pub rejected: Decimal,
    pub count: usize,
}

impl VendorSpend {
    pub fn rollup(requests: &[PurchaseRequest]) -> Vec<Self> {
        let mut by_vendor: BTreeMap<String, Self> = BTreeMap::new();
        for request in requests {
            let name = display_or_unknown(request.vendor_name.as_deref()).to_owned();
            let entry = by_vendor
                .entry(name.clone())
                .or_insert_with(|| Self { name, ..Self::default() });
            entry.total += request.amount;
            entry.count += 1;
            match request.status {
                RequestStatus::Approved => entry.approved += request.amount,
                RequestStatus::Pending => entry.pending += request.amount,
                RequestStatus::Rejected => entry.rejected += request.amount,
                RequestStatus::Unknown => {}
            }
        }

        let mut vendors: Vec<Self> = by_vendor.into_values().collect();
        vendors.sort_by(|left, right| {
            right.total.cmp(&left.total).then_with(|| left.name.cmp(&right.name))
        });
        vendors
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AdminView {
    pub counts: StatusCounts,
    pub filter: RequestFilter,
    pub requests: Vec<PurchaseRequest>,
    pub total_approved_value: Decimal,
    pub payment_stats: PaymentStats,
    pub vendor_spend: Vec<VendorSpend>,
}

impl AdminView {
    pub fn project(
        requests: &[PurchaseRequest],
        payments: &[Payment],
        filter: RequestFilter,
    ) -> Self {
        let total_approved_value = requests
            .iter()
            .filter(|request| request.status == RequestStatus::Approved)
            .map(|request| request.amount)
            .sum();

        Self {
            counts: StatusCounts::from_requests(requests),
            filter,
            requests: requests
                .iter()
                .filter(|request| filter.matches(request.status))
                .cloned()
                .collect(),
            total_approved_value,
            payment_stats: PaymentStats::from_payments(payments),
            vendor_spend: VendorSpend::rollup(requests),
        }
    }
}

/// The approve/reject affordance offered on a request detail page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalAction {
    pub request_id: RequestId,
    pub approval_id: ApprovalId,
    pub role: ApprovalRole,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RequestDetailView {
    pub detail: RequestDetail,
    pub steps: Vec<Approval>,
    current_step: Option<ApprovalId>,
    action: Option<ApprovalAction>,
}

impl RequestDetailView {
    pub fn project(detail: RequestDetail, viewer: Option<&User>) -> Self {
        let steps: Vec<Approval> = detail.ordered_approvals().into_iter().cloned().collect();
        let current_step = next_pending_step(&steps)
            .filter(|_| detail.request.status == RequestStatus::Pending)
            .map(|step| step.id);

        let action = viewer
            .filter(|user| user.role != Role::Requester)
            .filter(|_| detail.request.status == RequestStatus::Pending)
            .and_then(|user| {
                steps
                    .iter()
                    .find(|step| step.approver_id == user.id && step.status.is_pending())
                    .map(|step| ApprovalAction {
                        request_id: detail.request.id,
                        approval_id: step.id,
                        role: step.role,
                    })
            });

        Self { detail, steps, current_step, action }
    }

    pub fn available_action(&self) -> Option<ApprovalAction> {
        self.action
    }

    /// The lowest pending step of an open request.
    pub fn current_step(&self) -> Option<ApprovalId> {
        self.current_step
    }
}
