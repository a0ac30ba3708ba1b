//! HTTP client for the Q&A API: one attempt per call, bounded by the
//! configured timeout, failures folded into [`ApiError`].

use std::time::{Duration, Instant};

use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ClientConfig;
use crate::messages::{
    AnswerRequest, AnswerResponse, HealthStatus, HistoryResponse, SearchRequest, SearchResponse,
    SearchResult,
};

/// Why a call failed. `Display` is the message shown to the user.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Request timeout")]
    Timeout,
    #[error(
        "Network error (failed to reach the API). Check that the API is reachable and accepts requests from this client. Base URL: {base_url}"
    )]
    Network {
        base_url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("HTTP {status}: {status_text}")]
    Http { status: u16, status_text: String },
    #[error("Invalid JSON response: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ApiError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Timeout)
    }

    /// HTTP status of a non-2xx response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Typed client for `/health`, `/search`, `/answer`, `/history` and `/openapi.json`.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    /// Takes effect for calls started after this returns.
    pub fn set_base_url(&mut self, base_url: impl Into<String>) {
        self.config.base_url = base_url.into();
    }

    /// Takes effect for calls started after this returns.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.config.timeout = timeout;
    }

    pub fn set_config(&mut self, config: ClientConfig) {
        self.config = config;
    }

    pub async fn health(&self) -> Result<HealthStatus, ApiError> {
        self.call(Method::GET, "/health", None::<&()>).await
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>, ApiError> {
        let response: SearchResponse = self.call(Method::POST, "/search", Some(request)).await?;
        Ok(response.into_results())
    }

    pub async fn answer(&self, request: &AnswerRequest) -> Result<AnswerResponse, ApiError> {
        self.call(Method::POST, "/answer", Some(request)).await
    }

    pub async fn history(&self, limit: u32) -> Result<HistoryResponse, ApiError> {
        self.call(Method::GET, &format!("/history?limit={limit}"), None::<&()>)
            .await
    }

    /// Machine-readable API schema, returned as-is.
    pub async fn openapi(&self) -> Result<serde_json::Value, ApiError> {
        self.call(Method::GET, "/openapi.json", None::<&()>).await
    }

    /// Issue one request and decode the JSON body. The whole exchange,
    /// including reading the body, must finish within the configured timeout;
    /// on expiry the in-flight request is dropped.
    pub async fn call<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let ClientConfig { base_url, timeout } = self.config.clone();
        let started = Instant::now();
        tracing::debug!(%method, path, base_url = %base_url, "api request");

        let outcome = tokio::time::timeout(timeout, self.exchange(&base_url, method.clone(), path, body)).await;
        let result = match outcome {
            Ok(result) => result,
            Err(_) => Err(ApiError::Timeout),
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => tracing::debug!(%method, path, elapsed_ms, "api response"),
            Err(e) => tracing::warn!(%method, path, elapsed_ms, error = %e, "api call failed"),
        }
        result
    }

    async fn exchange<T, B>(&self, base_url: &str, method: Method, path: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let network = |source: reqwest::Error| ApiError::Network {
            base_url: base_url.to_string(),
            source,
        };

        let mut request = self
            .http
            .request(method, join_url(base_url, path))
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            request = request.body(serde_json::to_vec(body)?);
        }

        let response = request.send().await.map_err(network)?;
        let status = response.status();
        if !status.is_success() {
            // hyper keeps the wire phrase only when it differs from the canonical one
            let status_text = response
                .extensions()
                .get::<hyper::ext::ReasonPhrase>()
                .and_then(|phrase| std::str::from_utf8(phrase.as_bytes()).ok())
                .or_else(|| status.canonical_reason())
                .unwrap_or("")
                .to_string();
            return Err(ApiError::Http {
                status: status.as_u16(),
                status_text,
            });
        }

        let bytes = response.bytes().await.map_err(network)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn join_url(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_url_tolerates_trailing_slash() {
        assert_eq!(join_url("http://a", "/health"), "http://a/health");
        assert_eq!(join_url("http://a/", "/health"), "http://a/health");
        assert_eq!(join_url("http://a/api/", "/answer"), "http://a/api/answer");
    }

    #[test]
    fn http_error_message_carries_status() {
        let e = ApiError::Http {
            status: 503,
            status_text: "Service Unavailable".into(),
        };
        assert_eq!(e.to_string(), "HTTP 503: Service Unavailable");
        assert_eq!(e.status(), Some(503));
    }

    #[test]
    fn setters_apply_to_config() {
        let mut client = ApiClient::new(ClientConfig::default());
        client.set_base_url("http://other:9000");
        client.set_timeout(Duration::from_millis(250));
        assert_eq!(client.base_url(), "http://other:9000");
        assert_eq!(client.timeout(), Duration::from_millis(250));
    }
}
