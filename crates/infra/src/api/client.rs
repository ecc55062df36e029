//! REST implementation of the [`RemoteApi`] port.

use std::sync::Arc;

use async_trait::async_trait;
use fieldsync_core::RemoteApi;
use fieldsync_domain::{ApiConfig, DatasetKind, FieldSyncError, HttpMethod, Result};
use reqwest::{Method, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::errors::{status_error, InfraError};
use crate::http::HttpClient;

/// Longest server error body carried into an error message.
const MAX_ERROR_DETAIL: usize = 256;

/// JSON-over-HTTP client for the FieldSync backend.
///
/// Writes go out exactly once; the mutation queue owns their retries. Dataset
/// reads are idempotent and use the HTTP client's own retry loop.
#[derive(Clone)]
pub struct RestApiClient {
    http: Arc<HttpClient>,
    base_url: String,
}

impl RestApiClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    /// `FieldSyncError::Config` if the base URL does not parse or the token is
    /// not a valid header value.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let parsed = Url::parse(&config.base_url).map_err(|err| {
            FieldSyncError::Config(format!("invalid api.base_url '{}': {err}", config.base_url))
        })?;

        let mut builder = HttpClient::builder()
            .timeout(config.timeout())
            .max_attempts(3)
            .user_agent(config.user_agent.clone());
        if let Some(token) = config.auth_token.as_deref().filter(|t| !t.is_empty()) {
            builder = builder.bearer_token(token);
        }

        Ok(Self::with_http_client(builder.build()?, parsed.as_str()))
    }

    /// Wrap an existing HTTP client.
    pub fn with_http_client(http: HttpClient, base_url: &str) -> Self {
        Self { http: Arc::new(http), base_url: base_url.trim_end_matches('/').to_string() }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve an endpoint against the base URL. Absolute URLs pass through.
    pub fn url_for(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return endpoint.to_string();
        }
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    #[instrument(skip(self, method, body), fields(method = %method))]
    async fn write(&self, method: HttpMethod, endpoint: &str, body: Option<&Value>) -> Result<Value> {
        let url = self.url_for(endpoint);
        let mut request = self.http.request(to_reqwest(method), &url);
        if let Some(body) = body {
            request = request.json(body);
        }

        debug!(url = %url, "dispatching mutation");
        let response = self.http.send_once(request).await?;
        read_json(response).await
    }
}

fn to_reqwest(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

/// Turn a response into JSON. Empty bodies become `null`; a non-JSON success
/// body is returned as a string.
async fn read_json(response: Response) -> Result<Value> {
    let status = response.status();
    let text = response.text().await.map_err(InfraError::from)?;

    if !status.is_success() {
        let detail: String = text.chars().take(MAX_ERROR_DETAIL).collect();
        warn!(%status, "remote rejected request");
        return Err(status_error(status, Some(&detail)));
    }

    if status == StatusCode::NO_CONTENT || text.trim().is_empty() {
        return Ok(Value::Null);
    }

    Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
}

#[async_trait]
impl RemoteApi for RestApiClient {
    async fn post(&self, endpoint: &str, body: &Value) -> Result<Value> {
        self.write(HttpMethod::Post, endpoint, Some(body)).await
    }

    async fn put(&self, endpoint: &str, body: &Value) -> Result<Value> {
        self.write(HttpMethod::Put, endpoint, Some(body)).await
    }

    async fn patch(&self, endpoint: &str, body: &Value) -> Result<Value> {
        self.write(HttpMethod::Patch, endpoint, Some(body)).await
    }

    async fn delete(&self, endpoint: &str) -> Result<Value> {
        self.write(HttpMethod::Delete, endpoint, None).await
    }

    #[instrument(skip(self), fields(dataset = %kind.endpoint()))]
    async fn fetch_dataset(&self, kind: DatasetKind) -> Result<Value> {
        let url = self.url_for(kind.endpoint());
        let response = self.http.send(self.http.request(Method::GET, &url)).await?;
        read_json(response).await
    }
}
