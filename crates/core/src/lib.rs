pub mod audit;
pub mod config;
pub mod dashboard;
pub mod domain;
pub mod errors;
pub mod fixtures;
pub mod flows;
pub mod routing;

pub use audit::{AuditAction, AuditEntry, AuditEntryId, AuditTrail, InMemoryAuditTrail};
pub use dashboard::{Dashboard, FeedKind, FinanceTab};
pub use domain::approval::{Approval, ApprovalId, ApprovalRole, ApprovalStatus, PendingApproval};
pub use domain::directory::{
    Department, DepartmentId, Directory, Role, User, UserId, Vendor, VendorId,
};
pub use domain::payment::{Payment, PaymentId, PaymentMethod, PaymentOutcome, PaymentStatus};
pub use domain::request::{
    CreatedStep, DecisionReceipt, NewRequest, PurchaseRequest, RequestDetail, RequestId,
    RequestStatus, SubmissionReceipt,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use flows::{ApprovalDecision, LifecycleError, WorkflowEngine};
pub use routing::{route_for, ApprovalRoute, RouteStep, FINANCE_REVIEW_THRESHOLD};
