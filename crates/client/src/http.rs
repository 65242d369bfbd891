//! reqwest implementation of the procurement backend's HTTP contract.

use std::time::Duration;

use async_trait::async_trait;
use procure_core::config::AppConfig;
use procure_core::domain::approval::PendingApproval;
use procure_core::domain::directory::{Department, User, UserId, Vendor};
use procure_core::domain::payment::{Payment, PaymentId, PaymentOutcome};
use procure_core::domain::request::{
    DecisionReceipt, NewRequest, PurchaseRequest, RequestDetail, RequestId, SubmissionReceipt,
};
use procure_core::flows::ApprovalDecision;
use reqwest::{Client, RequestBuilder, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::api::{HealthStatus, ProcessReceipt, ProcurementApi};
use crate::error::ApiError;

pub struct HttpProcurementApi {
    client: Client,
    base_url: String,
    auth_token: Option<SecretString>,
}

impl HttpProcurementApi {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        auth_token: Option<SecretString>,
    ) -> Result<Self, ApiError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        let parsed =
            Url::parse(trimmed).map_err(|_| ApiError::InvalidBaseUrl(base_url.to_owned()))?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(ApiError::InvalidBaseUrl(base_url.to_owned()));
        }

        let client = Client::builder().timeout(timeout).build().map_err(|error| {
            ApiError::Transport { endpoint: trimmed.to_owned(), message: error.to_string() }
        })?;

        Ok(Self { client, base_url: trimmed.to_owned(), auth_token })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ApiError> {
        Self::new(&config.api.base_url, config.request_timeout(), config.api.auth_token.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(self.client.get(self.url(path)), path).await
    }

    async fn list<T: DeserializeOwned>(&self, path: &str, key: &str) -> Result<Vec<T>, ApiError> {
        let body: Value = self.get(path).await?;
        unwrap_list(path, body, key)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        endpoint: &str,
    ) -> Result<T, ApiError> {
        let builder = match &self.auth_token {
            Some(token) if !token.expose_secret().trim().is_empty() => {
                builder.bearer_auth(token.expose_secret())
            }
            _ => builder,
        };

        let response =
            builder.send().await.map_err(|error| ApiError::from_reqwest(endpoint, error))?;
        let status = response.status();
        let body = response.text().await.map_err(|error| ApiError::from_reqwest(endpoint, error))?;
        debug!(
            event_name = "client.http.response",
            endpoint,
            status = status.as_u16(),
            bytes = body.len(),
            "procurement api responded"
        );

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                detail: error_detail(&body, status.canonical_reason()),
            });
        }

        serde_json::from_str(&body).map_err(|error| ApiError::Decode {
            endpoint: endpoint.to_owned(),
            message: error.to_string(),
        })
    }

    async fn post_decision(
        &self,
        request_id: RequestId,
        approver_id: UserId,
        decision: ApprovalDecision,
    ) -> Result<DecisionReceipt, ApiError> {
        let path = format!("/requests/{request_id}/{}", decision.as_str());
        let builder = self
            .client
            .post(self.url(&path))
            .query(&[("approver_id", approver_id.0)])
            .json(&serde_json::json!({}));
        self.send(builder, &path).await
    }
}

/// Collections arrive wrapped, e.g. `{"users": [...]}`; a missing or null key reads as empty.
fn unwrap_list<T: DeserializeOwned>(
    endpoint: &str,
    mut body: Value,
    key: &str,
) -> Result<Vec<T>, ApiError> {
    let items = match body.get_mut(key).map(Value::take) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(items) => items,
    };
    serde_json::from_value(items).map_err(|error| ApiError::Decode {
        endpoint: endpoint.to_owned(),
        message: error.to_string(),
    })
}

/// FastAPI puts the reason in `{"detail": ...}`; anything else falls back to the raw body.
fn error_detail(body: &str, reason: Option<&str>) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        match value.get("detail") {
            Some(Value::String(detail)) => return detail.clone(),
            Some(Value::Null) | None => {}
            Some(other) => return other.to_string(),
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        reason.unwrap_or_default().to_owned()
    } else {
        trimmed.to_owned()
    }
}

#[async_trait]
impl ProcurementApi for HttpProcurementApi {
    async fn health(&self) -> Result<HealthStatus, ApiError> {
        self.get("/health").await
    }

    async fn users(&self) -> Result<Vec<User>, ApiError> {
        self.list("/users", "users").await
    }

    async fn vendors(&self) -> Result<Vec<Vendor>, ApiError> {
        self.list("/vendors", "vendors").await
    }

    async fn departments(&self) -> Result<Vec<Department>, ApiError> {
        self.list("/departments", "departments").await
    }

    async fn requests(&self) -> Result<Vec<PurchaseRequest>, ApiError> {
        self.list("/requests", "requests").await
    }

    async fn request_detail(&self, request_id: RequestId) -> Result<RequestDetail, ApiError> {
        self.get(&format!("/requests/{request_id}")).await
    }

    async fn submit_request(
        &self,
        submission: &NewRequest,
    ) -> Result<SubmissionReceipt, ApiError> {
        let builder = self.client.post(self.url("/requests")).json(submission);
        self.send(builder, "/requests").await
    }

    async fn approve(
        &self,
        request_id: RequestId,
        approver_id: UserId,
    ) -> Result<DecisionReceipt, ApiError> {
        self.post_decision(request_id, approver_id, ApprovalDecision::Approve).await
    }

    async fn reject(
        &self,
        request_id: RequestId,
        approver_id: UserId,
    ) -> Result<DecisionReceipt, ApiError> {
        self.post_decision(request_id, approver_id, ApprovalDecision::Reject).await
    }

    async fn pending_approvals(&self, user_id: UserId) -> Result<Vec<PendingApproval>, ApiError> {
        self.list(&format!("/approvals/mine/{user_id}"), "pending_approvals").await
    }

    async fn payments(&self) -> Result<Vec<Payment>, ApiError> {
        self.list("/payments", "payments").await
    }

    async fn process_payment(
        &self,
        payment_id: PaymentId,
        processed_by: UserId,
        outcome: PaymentOutcome,
    ) -> Result<ProcessReceipt, ApiError> {
        let path = format!("/payments/{payment_id}/process");
        let builder = self
            .client
            .post(self.url(&path))
            .query(&[("processed_by", processed_by.0.to_string()), ("status", outcome.to_string())]);
        self.send(builder, &path).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{error_detail, unwrap_list, HttpProcurementApi};
    use crate::error::ApiError;

    #[test]
    fn base_url_must_be_http() {
        assert!(HttpProcurementApi::new("http://localhost:8000/", Duration::from_secs(1), None)
            .is_ok_and(|api| api.base_url() == "http://localhost:8000"));
        assert!(matches!(
            HttpProcurementApi::new("localhost:8000", Duration::from_secs(1), None),
            Err(ApiError::InvalidBaseUrl(_))
        ));
        assert!(matches!(
            HttpProcurementApi::new("ftp://files.example", Duration::from_secs(1), None),
            Err(ApiError::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn fastapi_detail_is_extracted() {
        assert_eq!(
            error_detail(r#"{"detail": "No pending approval found for this user"}"#, None),
            "No pending approval found for this user"
        );
        assert_eq!(error_detail("", Some("Not Found")), "Not Found");
        assert_eq!(error_detail("upstream exploded", None), "upstream exploded");
    }

    #[test]
    fn missing_envelope_keys_read_as_empty() {
        let empty: Vec<u32> =
            unwrap_list("/users", serde_json::json!({}), "users").unwrap_or_else(|_| vec![1]);
        assert!(empty.is_empty());

        let null: Vec<u32> = unwrap_list("/users", serde_json::json!({"users": null}), "users")
            .unwrap_or_else(|_| vec![1]);
        assert!(null.is_empty());

        let bad = unwrap_list::<u32>("/users", serde_json::json!({"users": "x"}), "users");
        assert!(matches!(bad, Err(ApiError::Decode { .. })));
    }
}
