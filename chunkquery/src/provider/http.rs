//! HTTP client abstraction for testability

use std::future::Future;
use std::time::Duration;

use tracing::{trace, warn};

use super::types::FetchError;

/// Per-request timeout when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Trait for asynchronous HTTP client operations.
///
/// Only transport problems are errors here. The body is returned whatever
/// the response status, so callers can classify it themselves.
pub trait AsyncHttpClient: Send + Sync {
    /// Performs an async HTTP POST request with JSON body.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to request
    /// * `json_body` - JSON body as a string
    ///
    /// # Returns
    ///
    /// The response body as bytes, or `FetchError::Connection`.
    fn post_json(
        &self,
        url: &str,
        json_body: &str,
    ) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;
}

/// Async HTTP client implementation using reqwest.
#[derive(Clone)]
pub struct AsyncReqwestClient {
    client: reqwest::Client,
}

impl AsyncReqwestClient {
    /// Creates a new AsyncReqwestClient with the default timeout.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a new AsyncReqwestClient with custom timeout.
    pub fn with_timeout(timeout_secs: u64) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| {
                FetchError::Connection(format!("Failed to create async HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }
}

impl AsyncHttpClient for AsyncReqwestClient {
    async fn post_json(&self, url: &str, json_body: &str) -> Result<Vec<u8>, FetchError> {
        trace!(url = url, "HTTP POST request starting");

        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .body(json_body.to_string())
            .send()
            .await
            .map_err(|e| {
                warn!(
                    url = url,
                    error = %e,
                    is_connect = e.is_connect(),
                    is_timeout = e.is_timeout(),
                    "HTTP request failed"
                );
                FetchError::Connection(format!("POST request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            trace!(url = url, status = status.as_u16(), "Non-success status, reading body anyway");
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| FetchError::Connection(format!("Failed to read response: {}", e)))
    }
}
