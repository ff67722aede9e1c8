//! Retrying HTTP client shared by the listing and text phases
//!
//! Provides:
//! - bounded retry with exponential backoff for GET requests
//! - retry only on 429/500/502/503/504 and network-level failures
//! - every other status handed back untouched so callers can interpret it
//!   (a 404 on a text URL means "no text", not "try again")
//!
//! The wrapped [`reqwest::Client`] owns one connection pool; cloning a
//! [`RetryingClient`] shares it, so the same client is safe to hand to many
//! concurrent workers.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::downloader::config::{
    calculate_backoff, is_retryable_status, CONNECT_TIMEOUT, DEFAULT_BACKOFF_FACTOR,
    DEFAULT_MAX_ATTEMPTS, MAX_BACKOFF,
};
use crate::fetcher::retry_formatter::{extract_error_type, RetryContext, RetryErrorType};
use crate::fetcher::{FetcherError, FetcherResult};
use crate::metrics::{record_retry_backoff, HttpRequestMetrics};

/// Retry budget and backoff shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per request, first try included (at least 1)
    pub max_attempts: u32,
    /// Backoff factor in seconds
    pub backoff_factor: f64,
    /// Cap on a single backoff sleep
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
            max_backoff: MAX_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// Create a policy; `max_attempts` is clamped to at least 1
    pub fn new(max_attempts: u32, backoff_factor: f64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_factor,
            max_backoff: MAX_BACKOFF,
        }
    }

    /// Sleep before the next attempt after `consecutive_failures` failures
    pub fn backoff_for(&self, consecutive_failures: u32) -> Duration {
        calculate_backoff(self.backoff_factor, consecutive_failures, self.max_backoff)
    }
}

/// Fully-read response handed back to callers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Final URL after redirects
    pub url: String,
    /// HTTP status code
    pub status: u16,
    /// `Content-Type` header, if present
    pub content_type: Option<String>,
    /// Body decoded as text
    pub body: String,
    /// Attempts it took to obtain this response
    pub attempts: u32,
}

impl HttpResponse {
    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Deserialize the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> FetcherResult<T> {
        serde_json::from_str(&self.body).map_err(|e| {
            FetcherError::ParseError(format!("invalid JSON from {}: {}", self.url, e))
        })
    }
}

/// GET client with bounded retry (see module docs)
#[derive(Debug, Clone)]
pub struct RetryingClient {
    client: Client,
    policy: RetryPolicy,
}

impl RetryingClient {
    /// Build a client with its own connection pool
    pub fn new(policy: RetryPolicy) -> FetcherResult<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(|e| FetcherError::ClientError(e.to_string()))?;

        Ok(Self::with_client(client, policy))
    }

    /// Wrap an existing reqwest client
    pub fn with_client(client: Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// GET `url` with a single `Accept` header
    pub async fn get_accepting(
        &self,
        url: &str,
        accept: &'static str,
        timeout: Duration,
    ) -> FetcherResult<HttpResponse> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(accept));
        self.get(url, &headers, timeout).await
    }

    /// GET `url`, retrying transient failures
    ///
    /// Returns the first response whose status is not retryable, whatever it
    /// is. Fails with [`FetcherError::RetriesExhausted`] once every attempt hit
    /// a retryable status or a network error.
    pub async fn get(
        &self,
        url: &str,
        headers: &HeaderMap,
        timeout: Duration,
    ) -> FetcherResult<HttpResponse> {
        let max_attempts = self.policy.max_attempts.max(1);
        let endpoint = endpoint_label(url);
        let mut last_error = String::new();
        let mut last_status = None;
        let mut last_type = RetryErrorType::NetworkGeneric;

        for attempt in 1..=max_attempts {
            let metrics = HttpRequestMetrics::start(endpoint.clone(), attempt);

            let sent = self
                .client
                .get(url)
                .headers(headers.clone())
                .timeout(timeout)
                .send()
                .await;

            match sent {
                Err(e) if e.is_builder() => {
                    return Err(FetcherError::InvalidRequest(format!("{url}: {e}")));
                }
                Err(e) => {
                    metrics.record_network_error(&e.to_string());
                    last_type = extract_error_type(None, Some(&e));
                    last_error = e.to_string();
                    last_status = None;
                }
                Ok(response) => {
                    let status = response.status();
                    metrics.record_complete(status.as_u16());

                    if is_retryable_status(status.as_u16()) {
                        last_type = extract_error_type(Some(status), None);
                        last_error = format!("HTTP {status}");
                        last_status = Some(status.as_u16());
                    } else {
                        match read_response(response, attempt).await {
                            Ok(read) => {
                                if attempt > 1 {
                                    let ctx = RetryContext::new(
                                        attempt,
                                        max_attempts,
                                        last_type,
                                        Duration::ZERO,
                                        &last_error,
                                        url,
                                    );
                                    info!("{}", ctx.format_success());
                                }
                                return Ok(read);
                            }
                            Err(e) => {
                                last_type = extract_error_type(None, Some(&e));
                                last_error = format!("failed to read body: {e}");
                                last_status = Some(status.as_u16());
                            }
                        }
                    }
                }
            }

            if attempt < max_attempts {
                let backoff = self.policy.backoff_for(attempt);
                let ctx = RetryContext::new(
                    attempt,
                    max_attempts,
                    last_type,
                    backoff,
                    &last_error,
                    url,
                );
                warn!("{}", ctx.format_retry());
                record_retry_backoff(backoff, attempt);
                if !backoff.is_zero() {
                    tokio::time::sleep(backoff).await;
                }
            }
        }

        let ctx = RetryContext::new(
            max_attempts,
            max_attempts,
            last_type,
            Duration::ZERO,
            &last_error,
            url,
        );
        debug!("{}", ctx.format_failure());

        Err(FetcherError::RetriesExhausted {
            url: url.to_string(),
            attempts: max_attempts,
            last_status,
            last_error,
        })
    }
}

async fn read_response(
    response: reqwest::Response,
    attempts: u32,
) -> Result<HttpResponse, reqwest::Error> {
    let status: StatusCode = response.status();
    let url = response.url().to_string();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response.text().await?;

    Ok(HttpResponse {
        url,
        status: status.as_u16(),
        content_type,
        body,
        attempts,
    })
}

/// Host of `url`, used as a low-cardinality metrics label
fn endpoint_label(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| "unknown".to_string())
}
