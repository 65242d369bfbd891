use thiserror::Error;

use crate::domain::payment::PaymentStatus;
use crate::domain::request::RequestStatus;
use crate::flows::LifecycleError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid request transition from {from} to {to}")]
    InvalidRequestTransition { from: RequestStatus, to: RequestStatus },
    #[error("invalid payment transition from {from} to {to}")]
    InvalidPaymentTransition { from: PaymentStatus, to: PaymentStatus },
    #[error("unknown {kind} `{value}`")]
    UnknownValue { kind: &'static str, value: String },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

/// Everything that can stop an operation, before it is shaped for an operator.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error("backend refused with {status}: {detail}")]
    Refused { status: u16, detail: String },
    #[error("backend unreachable: {0}")]
    Unreachable(String),
    #[error("unexpected backend response: {0}")]
    Protocol(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

/// Failure as reported at the edge, tagged with the operation that hit it.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("{operation}: invalid input: {message}")]
    InvalidInput { operation: String, message: String },
    #[error("{operation}: rejected: {message}")]
    Rejected { operation: String, status: Option<u16>, message: String },
    #[error("{operation}: unreachable: {message}")]
    Unreachable { operation: String, message: String },
    #[error("{operation}: misconfigured: {message}")]
    Misconfigured { operation: String, message: String },
}

impl InterfaceError {
    /// Stable machine-readable class, used in JSON command outcomes.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "invalid_input",
            Self::Rejected { .. } => "backend_rejected",
            Self::Unreachable { .. } => "backend_unreachable",
            Self::Misconfigured { .. } => "config_validation",
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "Check the values you entered and try again.",
            Self::Rejected { .. } => "The procurement service refused the action.",
            Self::Unreachable { .. } => {
                "The procurement service is unavailable. Please try again."
            }
            Self::Misconfigured { .. } => "Fix the client configuration and try again.",
        }
    }

    pub fn operation(&self) -> &str {
        match self {
            Self::InvalidInput { operation, .. }
            | Self::Rejected { operation, .. }
            | Self::Unreachable { operation, .. }
            | Self::Misconfigured { operation, .. } => operation,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, operation: impl Into<String>) -> InterfaceError {
        let operation = operation.into();
        match self {
            Self::Domain(error) => {
                InterfaceError::InvalidInput { operation, message: error.to_string() }
            }
            Self::Lifecycle(error) => InterfaceError::Rejected {
                operation,
                status: Some(error.http_status()),
                message: error.to_string(),
            },
            Self::Refused { status, detail } => {
                InterfaceError::Rejected { operation, status: Some(status), message: detail }
            }
            Self::Protocol(message) => InterfaceError::Rejected { operation, status: None, message },
            Self::Unreachable(message) => InterfaceError::Unreachable { operation, message },
            Self::Configuration(message) => InterfaceError::Misconfigured { operation, message },
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::request::{RequestId, RequestStatus};
    use crate::errors::{ApplicationError, DomainError, InterfaceError};
    use crate::flows::LifecycleError;

    #[test]
    fn domain_errors_are_invalid_input() {
        let interface = ApplicationError::from(DomainError::InvariantViolation(
            "request title is required".to_owned(),
        ))
        .into_interface("submit");

        assert_eq!(interface.error_class(), "invalid_input");
        assert_eq!(interface.operation(), "submit");
        assert_eq!(
            interface.to_string(),
            "submit: invalid input: domain invariant violation: request title is required"
        );
    }

    #[test]
    fn lifecycle_errors_carry_their_status_code() {
        let interface = ApplicationError::from(LifecycleError::RequestClosed {
            request_id: RequestId(9),
            status: RequestStatus::Approved,
        })
        .into_interface("approve");

        assert!(matches!(
            interface,
            InterfaceError::Rejected { status: Some(409), ref message, .. } if message.contains("9")
        ));
        assert_eq!(interface.error_class(), "backend_rejected");
    }

    #[test]
    fn unreachable_and_configuration_have_distinct_classes() {
        let down = ApplicationError::Unreachable("connection refused".to_owned()).into_interface("pay");
        assert_eq!(down.error_class(), "backend_unreachable");
        assert_eq!(down.user_message(), "The procurement service is unavailable. Please try again.");

        let config = ApplicationError::Configuration("api.base_url is not a URL".to_owned())
            .into_interface("users");
        assert_eq!(config.error_class(), "config_validation");
    }
}
