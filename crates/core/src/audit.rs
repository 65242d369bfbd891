use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::directory::UserId;
use crate::domain::request::RequestId;
use crate::domain::timestamp;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditEntryId(pub i64);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AuditAction {
    Created,
    Approved,
    Rejected,
    PaymentCreated,
    PaymentCompleted,
    PaymentFailed,
    Other(String),
}

impl AuditAction {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Created => "created",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::PaymentCreated => "payment_created",
            Self::PaymentCompleted => "payment_completed",
            Self::PaymentFailed => "payment_failed",
            Self::Other(action) => action,
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for AuditAction {
    fn from(value: String) -> Self {
        match value.as_str() {
            "created" => Self::Created,
            "approved" => Self::Approved,
            "rejected" => Self::Rejected,
            "payment_created" => Self::PaymentCreated,
            "payment_completed" => Self::PaymentCompleted,
            "payment_failed" => Self::PaymentFailed,
            _ => Self::Other(value),
        }
    }
}

impl From<AuditAction> for String {
    fn from(value: AuditAction) -> Self {
        value.as_str().to_owned()
    }
}

/// One append-only record of a state-changing event on a request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: AuditEntryId,
    #[serde(default)]
    pub request_id: Option<RequestId>,
    #[serde(default)]
    pub actor_id: Option<UserId>,
    #[serde(default)]
    pub actor_name: Option<String>,
    pub action: AuditAction,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default, with = "timestamp::lenient")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Event handed to an [`AuditTrail`]; the trail assigns the id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditRecord {
    pub request_id: RequestId,
    pub actor_id: UserId,
    pub actor_name: Option<String>,
    pub action: AuditAction,
    pub details: String,
    pub occurred_at: DateTime<Utc>,
}

pub trait AuditTrail: Send + Sync {
    fn append(&self, record: AuditRecord) -> AuditEntry;

    /// Entries for one request, newest first.
    fn entries_for(&self, request_id: RequestId) -> Vec<AuditEntry>;
}

#[derive(Clone, Default)]
pub struct InMemoryAuditTrail {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
}

impl InMemoryAuditTrail {
    pub fn entries(&self) -> Vec<AuditEntry> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl AuditTrail for InMemoryAuditTrail {
    fn append(&self, record: AuditRecord) -> AuditEntry {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };

        let entry = AuditEntry {
            id: AuditEntryId(entries.len() as i64 + 1),
            request_id: Some(record.request_id),
            actor_id: Some(record.actor_id),
            actor_name: record.actor_name,
            action: record.action,
            details: Some(record.details),
            created_at: Some(record.occurred_at),
        };
        entries.push(entry.clone());
        entry
    }

    fn entries_for(&self, request_id: RequestId) -> Vec<AuditEntry> {
        let mut matching: Vec<AuditEntry> = self
            .entries()
            .into_iter()
            .filter(|entry| entry.request_id == Some(request_id))
            .collect();
        matching.sort_by(|left, right| {
            right.created_at.cmp(&left.created_at).then_with(|| right.id.cmp(&left.id))
        });
        matching
    }
}
