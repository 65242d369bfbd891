use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::directory::{UserId, VendorId};
use crate::domain::request::RequestId;
use crate::domain::{nullable, timestamp};
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(pub i64);

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    #[default]
    #[serde(other)]
    Unknown,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Completed) | (Self::Pending, Self::Failed)
        )
    }

    pub fn transition_to(&mut self, next: PaymentStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            *self = next;
            return Ok(());
        }

        Err(DomainError::InvalidPaymentTransition { from: *self, to: next })
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two results a finance user may record for a pending payment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
    Completed,
    Failed,
}

impl PaymentOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn status(&self) -> PaymentStatus {
        match self {
            Self::Completed => PaymentStatus::Completed,
            Self::Failed => PaymentStatus::Failed,
        }
    }
}

impl fmt::Display for PaymentOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentOutcome {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(DomainError::UnknownValue {
                kind: "payment outcome",
                value: other.to_owned(),
            }),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PaymentMethod {
    #[default]
    BankTransfer,
    Other(String),
}

impl PaymentMethod {
    /// `bank_transfer` renders as `BANK TRANSFER`.
    pub fn label(&self) -> String {
        String::from(self.clone()).replace('_', " ").to_ascii_uppercase()
    }
}

impl From<String> for PaymentMethod {
    fn from(value: String) -> Self {
        match value.as_str() {
            "bank_transfer" | "" => Self::BankTransfer,
            _ => Self::Other(value),
        }
    }
}

impl From<PaymentMethod> for String {
    fn from(value: PaymentMethod) -> Self {
        match value {
            PaymentMethod::BankTransfer => "bank_transfer".to_owned(),
            PaymentMethod::Other(method) => method,
        }
    }
}

/// `TXN_` followed by eight uppercase hex characters.
pub fn new_transaction_id() -> String {
    let simple = Uuid::new_v4().simple().to_string();
    format!("TXN_{}", simple[..8].to_ascii_uppercase())
}

/// A payment created for a fully approved request, plus the display fields the backend
/// joins in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub request_id: RequestId,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(default, deserialize_with = "nullable::or_default")]
    pub payment_method: PaymentMethod,
    #[serde(default, deserialize_with = "nullable::or_default")]
    pub payment_status: PaymentStatus,
    #[serde(default, deserialize_with = "nullable::or_default")]
    pub transaction_id: String,
    #[serde(default)]
    pub processed_by: Option<UserId>,
    #[serde(default, with = "timestamp::lenient")]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::lenient")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "nullable::or_default")]
    pub title: String,
    #[serde(default, deserialize_with = "nullable::or_default")]
    pub description: String,
    #[serde(default)]
    pub vendor_id: Option<VendorId>,
    #[serde(default)]
    pub vendor_name: Option<String>,
    #[serde(default)]
    pub processed_by_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::{new_transaction_id, Payment, PaymentMethod, PaymentOutcome, PaymentStatus};

    #[test]
    fn payment_status_is_terminal_once_set() {
        let mut status = PaymentStatus::Pending;
        status.transition_to(PaymentOutcome::Failed.status()).expect("pending -> failed");
        assert!(status.is_terminal());
        assert!(status.transition_to(PaymentStatus::Completed).is_err());
        assert!(!PaymentStatus::Completed.can_transition_to(PaymentStatus::Pending));
    }

    #[test]
    fn transaction_ids_follow_backend_format() {
        let id = new_transaction_id();
        assert_eq!(id.len(), 12);
        assert!(id.starts_with("TXN_"));
        assert!(id[4..].chars().all(|ch| ch.is_ascii_hexdigit() && !ch.is_ascii_lowercase()));
    }

    #[test]
    fn payment_rows_decode_with_null_processor() {
        let payment: Payment = serde_json::from_str(
            r#"{"id": 1, "request_id": 4, "amount": 500.0, "payment_method": "bank_transfer",
                "payment_status": "pending", "transaction_id": "TXN_0A1B2C3D",
                "processed_by": null, "processed_at": null,
                "created_at": "2024-05-02 10:00:00", "title": "GitHub seats",
                "description": "", "vendor_id": 3, "vendor_name": "GitHub",
                "processed_by_name": null}"#,
        )
        .expect("payment should decode");

        assert_eq!(payment.payment_method, PaymentMethod::BankTransfer);
        assert_eq!(payment.payment_method.label(), "BANK TRANSFER");
        assert_eq!(payment.processed_by, None);
        assert_eq!(payment.payment_status, PaymentStatus::Pending);
    }

    #[test]
    fn outcome_parses_only_terminal_values() {
        assert_eq!("completed".parse::<PaymentOutcome>().ok(), Some(PaymentOutcome::Completed));
        assert!("pending".parse::<PaymentOutcome>().is_err());
    }

    #[test]
    fn payment_rows_decode_null_transaction_and_text_columns() {
        let payment: Payment = serde_json::from_str(
            r#"{"id": 2, "request_id": 5, "amount": 90.5, "payment_method": null,
                "payment_status": "failed", "transaction_id": null,
                "processed_by": 3, "processed_at": "2024-05-04 11:00:00",
                "created_at": "2024-05-04 10:00:00", "title": null,
                "description": null, "vendor_id": 3, "vendor_name": "GitHub",
                "processed_by_name": "Carol Diaz"}"#,
        )
        .expect("payment with null columns should decode");

        assert_eq!(payment.transaction_id, "");
        assert_eq!(payment.title, "");
        assert_eq!(payment.description, "");
        assert_eq!(payment.payment_method, PaymentMethod::BankTransfer);
        assert_eq!(payment.payment_status, PaymentStatus::Failed);
    }
}
