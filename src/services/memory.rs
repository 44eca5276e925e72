//! In-process record directory
//!
//! Implements both service traits against maps held in memory. The binary
//! uses it when no service URL is configured; tests use it as a realistic
//! collaborator.

use super::traits::{CheckResponse, RecordSubmissionService, SubmitReceipt, UniquenessCheckService};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Stored form of a value: identity values compare trimmed and case-insensitively
fn normalize(value: &str) -> String {
    value.trim().to_ascii_lowercase()
}

/// A record accepted by the directory
#[derive(Debug, Clone)]
pub struct StoredRecord {
    pub id: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Inner {
    taken: HashMap<String, BTreeSet<String>>,
    records: Vec<StoredRecord>,
}

/// Record store answering uniqueness checks and accepting submissions
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    inner: RwLock<Inner>,
    slug_fields: HashSet<String>,
    latency: Option<Duration>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-register values for a field
    pub fn with_registered<I, S>(mut self, field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner
            .get_mut()
            .taken
            .entry(field.to_string())
            .or_default()
            .extend(values.into_iter().map(|v| {
                let v: String = v.into();
                normalize(&v)
            }));
        self
    }

    /// Fields whose conflicts come back with alternative suggestions
    pub fn with_slug_field(mut self, field: &str) -> Self {
        self.slug_fields.insert(field.to_string());
        self.inner
            .get_mut()
            .taken
            .entry(field.to_string())
            .or_default();
        self
    }

    /// Simulated network latency applied to every call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub async fn records(&self) -> Vec<StoredRecord> {
        self.inner.read().await.records.clone()
    }

    pub async fn is_taken(&self, field: &str, value: &str) -> bool {
        self.inner
            .read()
            .await
            .taken
            .get(field)
            .is_some_and(|values| values.contains(&normalize(value)))
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl UniquenessCheckService for InMemoryDirectory {
    async fn check(&self, field: &str, value: &str) -> Result<CheckResponse> {
        self.simulate_latency().await;
        let inner = self.inner.read().await;
        let Some(values) = inner.taken.get(field) else {
            return Ok(CheckResponse::available());
        };
        let value = normalize(value);
        if !values.contains(&value) {
            return Ok(CheckResponse::available());
        }

        let suggestions = self.slug_fields.contains(field).then(|| {
            (1..)
                .map(|n| format!("{value}-{n}"))
                .filter(|candidate| !values.contains(candidate))
                .take(3)
                .collect()
        });
        Ok(CheckResponse::taken(suggestions))
    }
}

#[async_trait]
impl RecordSubmissionService for InMemoryDirectory {
    async fn submit(&self, payload: serde_json::Value) -> Result<SubmitReceipt> {
        self.simulate_latency().await;
        let values = payload
            .get("values")
            .and_then(|v| v.as_object())
            .ok_or_else(|| anyhow!("Payload has no values object"))?;

        let mut inner = self.inner.write().await;
        let claims: Vec<(String, String)> = inner
            .taken
            .keys()
            .filter_map(|field| {
                let value = values.get(field)?.as_str()?;
                Some((field.clone(), normalize(value)))
            })
            .collect();
        for (field, value) in &claims {
            if inner.taken.get(field).is_some_and(|taken| taken.contains(value)) {
                return Err(anyhow!("{} '{}' is already registered", field, value));
            }
        }
        for (field, value) in claims {
            inner.taken.entry(field).or_default().insert(value);
        }

        let id = Uuid::new_v4().to_string();
        inner.records.push(StoredRecord {
            id: id.clone(),
            payload,
            created_at: Utc::now(),
        });
        Ok(SubmitReceipt { id })
    }
}
