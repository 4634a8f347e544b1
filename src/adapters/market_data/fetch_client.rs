//! Rate-Limited Fetch Client
//!
//! JSON GET client protecting a third-party API:
//! - shared window rate limiter consulted before every attempt
//! - per-attempt timeout
//! - exponential backoff with jitter on network errors, timeouts, 429 and 5xx
//! - responses memoised in the result cache keyed by endpoint + parameters

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::rate_limiter::SharedRateLimiter;
use crate::adapters::cache::ResultCache;

/// CoinGecko demo-tier API key header
const API_KEY_HEADER: &str = "x-cg-demo-api-key";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid JSON response: {0}")]
    Decode(String),

    #[error("Client setup failed: {0}")]
    Setup(String),
}

impl FetchError {
    /// Network errors, timeouts, 429 and 5xx are worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Network(_) | FetchError::Timeout(_) => true,
            FetchError::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || (500..600).contains(status)
            }
            FetchError::Decode(_) | FetchError::Setup(_) => false,
        }
    }
}

/// Upstream API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Optional API key for higher rate limits
    pub api_key: Option<String>,
    /// Per-attempt timeout in seconds (default: 10)
    pub timeout_secs: u64,
    /// Re-attempts after the first failure (default: 3)
    pub max_retries: u32,
    /// First backoff delay in milliseconds (default: 1000)
    pub base_delay_ms: u64,
    /// Backoff ceiling in milliseconds (default: 30000)
    pub max_delay_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.coingecko.com/api/v3".to_string(),
            api_key: None,
            timeout_secs: 10,
            max_retries: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

/// Exponential backoff schedule
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// `base * 2^attempt` capped at `max_delay`, plus up to 50% jitter
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        let backoff = self.base_delay.saturating_mul(factor).min(self.max_delay);
        let jitter_ms = backoff.as_millis() as u64 / 2;
        let jitter = if jitter_ms > 0 {
            rand::thread_rng().gen_range(0..=jitter_ms)
        } else {
            0
        };
        backoff + Duration::from_millis(jitter)
    }
}

/// Run `operation` until it succeeds, fails permanently or retries run out
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                let backoff = policy.delay(attempt);
                tracing::warn!(
                    endpoint = label,
                    error = %e,
                    "Request failed, backing off for {:?} (attempt {}/{})",
                    backoff,
                    attempt + 1,
                    policy.max_retries
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Cache key for an endpoint and its parameters, independent of parameter order
pub fn cache_key(endpoint: &str, params: &[(&str, String)]) -> String {
    let mut sorted: Vec<_> = params.iter().collect();
    sorted.sort();
    let query: Vec<String> = sorted.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("{endpoint}?{}", query.join("&"))
}

/// Rate-limited, retrying, memoising JSON client
#[derive(Debug, Clone)]
pub struct FetchClient {
    http: Client,
    config: ApiConfig,
    retry: RetryPolicy,
    limiter: SharedRateLimiter,
    cache: Arc<ResultCache>,
}

impl FetchClient {
    pub fn new(
        config: ApiConfig,
        limiter: SharedRateLimiter,
        cache: Arc<ResultCache>,
    ) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| FetchError::Setup(e.to_string()))?;

        Ok(Self {
            http,
            retry: config.retry_policy(),
            config,
            limiter,
            cache,
        })
    }

    /// GET `endpoint` with `params`, served from cache when fresh
    pub async fn fetch(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value, FetchError> {
        let key = cache_key(endpoint, params);
        if let Some(cached) = self.cache.get(&key).await {
            tracing::debug!(endpoint, "Cache hit");
            return Ok(cached);
        }

        let client = self;
        let value =
            retry_with_backoff(&self.retry, endpoint, move || client.attempt(endpoint, params))
                .await?;
        self.cache.set(key, value.clone(), None).await;
        Ok(value)
    }

    async fn attempt(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value, FetchError> {
        self.limiter.lock().await.acquire().await;

        let url = format!("{}{}", self.config.base_url, endpoint);
        let mut request = self.http.get(&url).query(params);
        if let Some(ref api_key) = self.config.api_key {
            request = request.header(API_KEY_HEADER, api_key);
        }

        let timeout = self.config.timeout();
        let response = tokio::time::timeout(timeout, request.send())
            .await
            .map_err(|_| FetchError::Timeout(timeout))?
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout(timeout)
                } else {
                    FetchError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }
}
