//! HTTP adapters for the check and submission services
//!
//! Both services speak plain JSON over `POST`. The shapes are owned by the
//! services; these adapters only map them onto the engine's types.

use super::traits::{CheckResponse, RecordSubmissionService, SubmitReceipt, UniquenessCheckService};
use crate::error::{Result, WizardError};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::json;
use std::time::Duration;

fn build_client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder().timeout(timeout).build()?)
}

/// Non-2xx answers become a service error carrying the status and body
async fn ensure_success(service: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(WizardError::service(
        service,
        format!("returned {status}: {body}"),
    ))
}

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path)
}

/// Uniqueness checks over `POST {base}/check`
pub struct HttpCheckService {
    client: Client,
    base_url: String,
}

impl HttpCheckService {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into(),
        })
    }

    async fn request(&self, field: &str, value: &str) -> Result<CheckResponse> {
        let response = self
            .client
            .post(endpoint(&self.base_url, "check"))
            .json(&json!({ "field": field, "value": value }))
            .send()
            .await?;
        let response = ensure_success("check", response).await?;
        Ok(response.json::<CheckResponse>().await?)
    }
}

#[async_trait]
impl UniquenessCheckService for HttpCheckService {
    async fn check(&self, field: &str, value: &str) -> anyhow::Result<CheckResponse> {
        Ok(self.request(field, value).await?)
    }
}

/// Record submission over `POST {base}/records`
pub struct HttpSubmissionService {
    client: Client,
    base_url: String,
}

impl HttpSubmissionService {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into(),
        })
    }

    async fn request(&self, payload: &serde_json::Value) -> Result<SubmitReceipt> {
        let response = self
            .client
            .post(endpoint(&self.base_url, "records"))
            .json(payload)
            .send()
            .await?;
        let response = ensure_success("submission", response).await?;
        Ok(response.json::<SubmitReceipt>().await?)
    }
}

#[async_trait]
impl RecordSubmissionService for HttpSubmissionService {
    async fn submit(&self, payload: serde_json::Value) -> anyhow::Result<SubmitReceipt> {
        Ok(self.request(&payload).await?)
    }
}
