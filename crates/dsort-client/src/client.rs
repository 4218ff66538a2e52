//! Reqwest-based client for the sort gateway.

use std::str::FromStr;
use std::sync::Arc;

use dsort_core::{JobId, JobSummary, MetricsSnapshot};
use reqwest::{RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::request::{AbortSort, SortMetrics, StartSort};

/// Tracing target for client operations.
pub const TRACING_TARGET: &str = "dsort_client::client";

struct ClientInner {
    http: reqwest::Client,
    base_url: Url,
    config: ClientConfig,
}

/// Typed client of the sort gateway.
///
/// Cloning is cheap; clones share one connection pool.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not an HTTP(S) URL or the HTTP
    /// client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let base_url = config.parsed_base_url()?;
        let timeout = config.effective_timeout();

        tracing::debug!(
            target: TRACING_TARGET,
            base_url = %base_url,
            timeout_ms = timeout.as_millis(),
            "Creating sort client"
        );

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(config.effective_user_agent())
            .build()?;

        let inner = ClientInner {
            http,
            base_url,
            config,
        };

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Gets the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Starts a sort job and returns its id.
    pub async fn start_sort(&self, request: StartSort) -> Result<JobId> {
        let url = self.endpoint(&["sort", "start"]);
        let response = self.send(self.inner.http.post(url).json(&request.spec)).await?;
        let body = response.text().await?;

        let id = JobId::from_str(body.trim())
            .map_err(|_| Error::Invalid(format!("job id in start response: '{body}'")))?;

        tracing::debug!(target: TRACING_TARGET, job_id = %id, "Sort job started");
        Ok(id)
    }

    /// Requests that a sort job stop.
    pub async fn abort_sort(&self, request: AbortSort) -> Result<()> {
        let id = request.sort_uuid.to_string();
        let url = self.endpoint(&["sort", "abort", &id]);
        self.send(self.inner.http.delete(url)).await?;

        tracing::debug!(target: TRACING_TARGET, job_id = %id, "Sort job abort requested");
        Ok(())
    }

    /// Returns the metrics, state and timestamps of a sort job.
    pub async fn sort_metrics(&self, request: SortMetrics) -> Result<MetricsSnapshot> {
        let id = request.sort_uuid.to_string();
        let url = self.endpoint(&["sort", "metrics", &id]);
        let response = self.send(self.inner.http.get(url)).await?;
        Self::decode(response).await
    }

    /// Lists every retained sort job.
    pub async fn list_sorts(&self) -> Result<Vec<JobSummary>> {
        let url = self.endpoint(&["sort", "list"]);
        let response = self.send(self.inner.http.get(url)).await?;
        Self::decode(response).await
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.inner.base_url.clone();
        // `parsed_base_url` only admits http(s) URLs, which always have a path.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Attaches the bearer token, sends the request and turns non-2xx
    /// answers into [`Error::Api`].
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let request = match self.inner.config.api_token.as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::debug!(
            target: TRACING_TARGET,
            status = %status,
            body = %body,
            "Gateway rejected request"
        );
        Err(Error::Api { status, body })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
