use procure_core::errors::{ApplicationError, InterfaceError};
use procure_core::flows::LifecycleError;
use thiserror::Error;

/// Failures talking to the procurement backend.
///
/// Every variant carries plain strings so snapshots can keep the last error around and
/// compare it cheaply.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("could not reach the procurement service at {endpoint}: {message}")]
    Transport { endpoint: String, message: String },
    #[error("request to {endpoint} timed out")]
    Timeout { endpoint: String },
    #[error("procurement service answered {status}: {detail}")]
    Status { status: u16, detail: String },
    #[error("could not decode response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },
    #[error("invalid base url `{0}`")]
    InvalidBaseUrl(String),
}

impl ApiError {
    pub(crate) fn from_reqwest(endpoint: &str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            return Self::Timeout { endpoint: endpoint.to_owned() };
        }
        Self::Transport { endpoint: endpoint.to_owned(), message: error.to_string() }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The backend never answered, as opposed to answering with a refusal.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Timeout { .. })
    }

    /// Whether trying the same action again by hand could succeed.
    pub fn is_retryable_by_user(&self) -> bool {
        match self {
            Self::Transport { .. } | Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status >= 500,
            Self::Decode { .. } | Self::InvalidBaseUrl(_) => false,
        }
    }

    /// Text shown to the operator when a mutation fails.
    pub fn alert_message(&self) -> String {
        match self {
            Self::Status { detail, .. } if !detail.trim().is_empty() => detail.clone(),
            Self::Status { status, .. } => {
                format!("The procurement service refused the action (HTTP {status}).")
            }
            Self::Transport { .. } | Self::Timeout { .. } => {
                "The procurement service is unavailable. Please try again.".to_owned()
            }
            Self::Decode { .. } => {
                "The procurement service sent a response this client does not understand."
                    .to_owned()
            }
            Self::InvalidBaseUrl(url) => {
                format!("The procurement service address `{url}` is not a valid URL.")
            }
        }
    }

    pub fn into_interface(self, operation: impl Into<String>) -> InterfaceError {
        ApplicationError::from(self).into_interface(operation)
    }
}

impl From<LifecycleError> for ApiError {
    fn from(error: LifecycleError) -> Self {
        Self::Status { status: error.http_status(), detail: error.to_string() }
    }
}

impl From<ApiError> for ApplicationError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::Status { status, detail } => ApplicationError::Refused { status, detail },
            ApiError::Transport { .. } | ApiError::Timeout { .. } => {
                ApplicationError::Unreachable(error.to_string())
            }
            ApiError::Decode { .. } => ApplicationError::Protocol(error.to_string()),
            ApiError::InvalidBaseUrl(url) => {
                ApplicationError::Configuration(format!("invalid api.base_url `{url}`"))
            }
        }
    }
}
