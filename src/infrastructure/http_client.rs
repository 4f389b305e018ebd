//! HTTP client for listing pages with rate limiting and retries
//!
//! Retries only happen here: the sync core never re-fetches anything.

use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, direct::NotKeyed},
};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, StatusCode};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::domain::errors::ExtractionError;
use crate::infrastructure::config::ExtractionConfig;
use crate::infrastructure::extraction::retry::RetryPolicy;

/// HTTP client configuration for listing fetches
#[derive(Debug, Clone, serde::Serialize)]
pub struct HttpClientConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_requests_per_second: u32,
}

impl HttpClientConfig {
    pub fn from_extraction(config: &ExtractionConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            timeout_seconds: config.request_timeout_seconds,
            max_requests_per_second: config.requests_per_second,
        }
    }
}

/// Rate-limited HTTP client
pub struct HttpClient {
    client: Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    retry: RetryPolicy,
}

impl HttpClient {
    pub fn new(config: &HttpClientConfig, retry: RetryPolicy) -> Result<Self, ExtractionError> {
        let invalid = |message: String| ExtractionError::Configuration { message };

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| invalid(format!("Invalid user agent: {e}")))?,
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| invalid(format!("Failed to create HTTP client: {e}")))?;

        let quota = Quota::per_second(
            NonZeroU32::new(config.max_requests_per_second)
                .ok_or_else(|| invalid("Rate limit must be greater than 0".to_string()))?,
        );

        Ok(Self {
            client,
            rate_limiter: RateLimiter::direct(quota),
            retry,
        })
    }

    /// Single attempt: rate limit, GET, read body
    pub async fn get_text(&self, url: &str) -> Result<String, ExtractionError> {
        self.rate_limiter.until_ready().await;
        debug!("Fetching URL: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ExtractionError::Request {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractionError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let text = response.text().await.map_err(|e| ExtractionError::Request {
            url: url.to_string(),
            message: format!("Failed to read response body: {e}"),
        })?;

        debug!("Successfully fetched: {} ({} chars)", url, text.len());
        Ok(text)
    }

    /// Fetches with the configured retry policy.
    ///
    /// Client errors other than 403/408/429 are not retried.
    pub async fn get_text_with_retry(&self, url: &str) -> Result<String, ExtractionError> {
        let mut attempt = 1;
        loop {
            info!("🌐 Fetching page: {} (attempt {})", url, attempt);
            match self.get_text(url).await {
                Ok(text) => return Ok(text),
                Err(error) if !is_retryable(&error) => return Err(error),
                Err(error) => {
                    if !self.retry.should_retry(attempt) {
                        warn!("All {} attempts failed for {}: {}", attempt, url, error);
                        return Err(ExtractionError::RetriesExhausted {
                            url: url.to_string(),
                            attempts: attempt,
                        });
                    }
                    let delay = self.retry.delay_after(attempt);
                    warn!("⚠️ {} - retrying in {:?}", error, delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Transport failures, server errors and throttling are retried
pub fn is_retryable(error: &ExtractionError) -> bool {
    match error {
        ExtractionError::Request { .. } => true,
        ExtractionError::HttpStatus { status, .. } => StatusCode::from_u16(*status).is_ok_and(|s| {
            s.is_server_error()
                || s == StatusCode::FORBIDDEN
                || s == StatusCode::REQUEST_TIMEOUT
                || s == StatusCode::TOO_MANY_REQUESTS
        }),
        _ => false,
    }
}
