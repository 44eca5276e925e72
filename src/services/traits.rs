//! Trait abstraction for the external services to enable mocking in tests

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Answer of the uniqueness check service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResponse {
    /// A record already holds this value
    pub exists: bool,
    /// Alternative values offered by the service (slug-like fields)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
}

impl CheckResponse {
    pub fn available() -> Self {
        Self::default()
    }

    pub fn taken(suggestions: Option<Vec<String>>) -> Self {
        Self {
            exists: true,
            suggestions,
        }
    }
}

/// Identifier of a stored record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub id: String,
}

/// Asks whether a value is already bound to another record
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UniquenessCheckService: Send + Sync {
    async fn check(&self, field: &str, value: &str) -> Result<CheckResponse>;
}

/// Persists a completed form
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordSubmissionService: Send + Sync {
    async fn submit(&self, payload: serde_json::Value) -> Result<SubmitReceipt>;
}
