pub mod engine;
pub mod states;

pub use engine::{LifecycleError, WorkflowEngine};
pub use states::{derive_request_status, next_pending_step, ApprovalDecision};
