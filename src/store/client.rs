//! REST client for the robotask store API

use crate::error::{Result, RobotaskError};
use crate::store::TaskStore;
use crate::task::{CandidateBatch, ClaimResponse, Task, TaskId};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Default API root; the collection lives at `<base>/robotask`.
pub const DEFAULT_API_BASE_URL: &str = "https://scriptobservatory.org/api";

/// Configuration for the store client
#[derive(Debug, Clone)]
pub struct StoreClientConfig {
    /// API root, without the `/robotask` collection suffix
    pub base_url: String,
    /// Timeout applied to every store request
    pub request_timeout: Duration,
    /// Accept self-signed or otherwise invalid TLS certificates
    pub accept_invalid_certs: bool,
}

impl Default for StoreClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            accept_invalid_certs: false,
        }
    }
}

/// Page returned by `GET /robotask`
#[derive(Debug, Deserialize)]
struct TaskPage {
    objects: Vec<Task>,
}

/// HTTP client for the robotask collection
#[derive(Debug, Clone)]
pub struct TaskStoreClient {
    collection_url: String,
    client: Client,
}

impl TaskStoreClient {
    /// Create a new client
    pub fn new(config: &StoreClientConfig) -> Result<Self> {
        let base = Url::parse(&config.base_url)?;
        if base.cannot_be_a_base() {
            return Err(RobotaskError::ConfigError(format!(
                "store base URL is not a base URL: {}",
                config.base_url
            )));
        }
        let collection_url = format!("{}/robotask", base.as_str().trim_end_matches('/'));

        let client = Client::builder()
            .timeout(config.request_timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| RobotaskError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            collection_url,
            client,
        })
    }

    /// Full URL of the robotask collection
    pub fn collection_url(&self) -> &str {
        &self.collection_url
    }

    fn query_for(max_count: usize) -> String {
        serde_json::json!({
            "order_by": [{ "field": "priority", "direction": "asc" }],
            "results_per_page": max_count,
        })
        .to_string()
    }
}

#[async_trait]
impl TaskStore for TaskStoreClient {
    async fn fetch_candidates(&self, max_count: usize) -> Result<CandidateBatch> {
        let response = self
            .client
            .get(&self.collection_url)
            .query(&[("q", Self::query_for(max_count))])
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| RobotaskError::StoreUnavailable(format!("Failed to list tasks: {}", e)))?;

        if response.status() != StatusCode::OK {
            return Err(RobotaskError::StoreUnavailable(format!(
                "List tasks failed with status {}",
                response.status()
            )));
        }

        let page = response
            .json::<TaskPage>()
            .await
            .map_err(|e| RobotaskError::StoreUnavailable(format!("Failed to parse task list: {}", e)))?;

        debug!("Store returned {} candidate tasks", page.objects.len());
        Ok(CandidateBatch::from_page(page.objects, max_count))
    }

    async fn claim(&self, task_id: TaskId) -> Result<ClaimResponse> {
        let url = format!("{}/{}", self.collection_url, task_id);

        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(|e| RobotaskError::StoreUnavailable(format!("Failed to delete task {}: {}", task_id, e)))?;

        if response.status() == StatusCode::NO_CONTENT {
            Ok(ClaimResponse::Removed)
        } else {
            Ok(ClaimResponse::Rejected(response.status().as_u16()))
        }
    }
}
