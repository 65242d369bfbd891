use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::approval::{Approval, ApprovalStatus};
use crate::domain::request::RequestStatus;

/// The two actions an approver can take on their own pending step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approve,
    Reject,
}

impl ApprovalDecision {
    /// Path segment used by `POST /requests/{id}/{approve|reject}`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }

    pub fn resulting_step_status(&self) -> ApprovalStatus {
        match self {
            Self::Approve => ApprovalStatus::Approved,
            Self::Reject => ApprovalStatus::Rejected,
        }
    }

    pub fn past_tense(&self) -> &'static str {
        match self {
            Self::Approve => "approved",
            Self::Reject => "rejected",
        }
    }
}

impl fmt::Display for ApprovalDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request status as a function of its approval rows: any rejection rejects the request,
/// a non-empty chain with every row approved approves it, anything else is still pending.
pub fn derive_request_status<I>(statuses: I) -> RequestStatus
where
    I: IntoIterator<Item = ApprovalStatus>,
{
    let mut seen_any = false;
    let mut all_approved = true;

    for status in statuses {
        seen_any = true;
        match status {
            ApprovalStatus::Rejected => return RequestStatus::Rejected,
            ApprovalStatus::Approved => {}
            ApprovalStatus::Pending | ApprovalStatus::Unknown => all_approved = false,
        }
    }

    if seen_any && all_approved {
        RequestStatus::Approved
    } else {
        RequestStatus::Pending
    }
}

/// Lowest-numbered step still waiting for a decision.
pub fn next_pending_step<'a, I>(approvals: I) -> Option<&'a Approval>
where
    I: IntoIterator<Item = &'a Approval>,
{
    approvals
        .into_iter()
        .filter(|approval| approval.status.is_pending())
        .min_by_key(|approval| (approval.step_order, approval.id))
}

#[cfg(test)]
mod tests {
    use crate::domain::approval::{Approval, ApprovalId, ApprovalRole, ApprovalStatus};
    use crate::domain::directory::UserId;
    use crate::domain::request::{RequestId, RequestStatus};

    use super::{derive_request_status, next_pending_step};
    use ApprovalStatus::{Approved, Pending, Rejected};

    fn row(id: i64, step_order: u32, status: ApprovalStatus) -> Approval {
        Approval {
            id: ApprovalId(id),
            request_id: RequestId(1),
            approver_id: UserId(id + 1),
            role: ApprovalRole::Manager,
            status,
            step_order,
            created_at: None,
            approved_at: None,
            approver_name: None,
        }
    }

    #[test]
    fn all_approved_rows_approve_the_request() {
        assert_eq!(derive_request_status([Approved, Approved, Approved]), RequestStatus::Approved);
    }

    #[test]
    fn any_rejected_row_rejects_the_request() {
        assert_eq!(derive_request_status([Approved, Approved, Rejected]), RequestStatus::Rejected);
        assert_eq!(derive_request_status([Rejected, Pending]), RequestStatus::Rejected);
    }

    #[test]
    fn outstanding_rows_keep_the_request_pending() {
        assert_eq!(derive_request_status([Approved, Pending]), RequestStatus::Pending);
        assert_eq!(derive_request_status([Pending]), RequestStatus::Pending);
    }

    #[test]
    fn an_empty_chain_never_counts_as_approved() {
        assert_eq!(derive_request_status(Vec::<ApprovalStatus>::new()), RequestStatus::Pending);
    }

    #[test]
    fn next_pending_step_follows_step_order() {
        let rows = vec![row(3, 3, Pending), row(1, 1, Approved), row(2, 2, Pending)];
        let next = next_pending_step(&rows).expect("a step is pending");
        assert_eq!(next.step_order, 2);

        let done = vec![row(1, 1, Approved)];
        assert!(next_pending_step(&done).is_none());
    }
}
