//! Window Rate Limiter
//!
//! Request budget per fixed window plus a minimum spacing between requests.
//! Callers over budget wait for the window to reset; nothing is rejected.
//!
//! Shared as `Arc<tokio::sync::Mutex<RateLimiter>>`, so waiting callers are
//! served one at a time.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Requests allowed per window (default: 10)
    pub max_requests: u32,
    /// Window length in seconds (default: 60)
    pub window_secs: u64,
    /// Minimum gap between two requests in milliseconds (default: 2000)
    pub min_interval_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window_secs: 60,
            min_interval_ms: 2_000,
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

pub type SharedRateLimiter = Arc<Mutex<RateLimiter>>;

#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    window_start: Instant,
    requests_in_window: u32,
    last_request: Option<Instant>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            window_start: Instant::now(),
            requests_in_window: 0,
            last_request: None,
        }
    }

    pub fn shared(config: RateLimitConfig) -> SharedRateLimiter {
        Arc::new(Mutex::new(Self::new(config)))
    }

    /// Time to wait before a request may go out, `None` if it may go now
    pub fn check(&mut self) -> Option<Duration> {
        let now = Instant::now();
        let elapsed = now.duration_since(self.window_start);

        if elapsed >= self.config.window() {
            self.window_start = now;
            self.requests_in_window = 0;
        } else if self.requests_in_window >= self.config.max_requests {
            return Some(self.config.window() - elapsed);
        }

        if let Some(last) = self.last_request {
            let since_last = now.duration_since(last);
            if since_last < self.config.min_interval() {
                return Some(self.config.min_interval() - since_last);
            }
        }

        None
    }

    /// Count a request made now
    pub fn record(&mut self) {
        self.last_request = Some(Instant::now());
        self.requests_in_window += 1;
    }

    /// Wait until a request may go out, then count it
    pub async fn acquire(&mut self) {
        while let Some(wait) = self.check() {
            tracing::debug!(
                wait_ms = wait.as_millis() as u64,
                in_window = self.requests_in_window,
                "Rate limit wait"
            );
            tokio::time::sleep(wait).await;
        }
        self.record();
    }

    pub fn requests_in_window(&self) -> u32 {
        self.requests_in_window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_limiter(max_requests: u32, window_secs: u64, min_interval_ms: u64) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            max_requests,
            window_secs,
            min_interval_ms,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_requests_within_budget_do_not_wait() {
        let mut limiter = create_test_limiter(3, 10, 0);
        let start = Instant::now();

        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limiter.requests_in_window(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_over_budget_waits_for_window_reset() {
        let mut limiter = create_test_limiter(3, 10, 0);
        let start = Instant::now();

        for _ in 0..3 {
            limiter.acquire().await;
        }
        limiter.acquire().await;

        assert!(start.elapsed() >= Duration::from_secs(10));
        assert_eq!(limiter.requests_in_window(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_minimum_spacing() {
        let mut limiter = create_test_limiter(10, 60, 2_000);
        let start = Instant::now();

        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;

        assert!(start.elapsed() >= Duration::from_secs(4));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_reports_wait() {
        let mut limiter = create_test_limiter(1, 10, 0);
        assert!(limiter.check().is_none());
        limiter.record();

        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(limiter.check(), Some(Duration::from_secs(6)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shared_limiter_serializes_callers() {
        let limiter = RateLimiter::shared(create_test_limiter(2, 5, 0).config);
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move {
                limiter.lock().await.acquire().await;
                Instant::now()
            }));
        }

        let mut finished = Vec::new();
        for handle in handles {
            finished.push(handle.await.unwrap());
        }
        let late = finished
            .iter()
            .filter(|t| t.duration_since(start) >= Duration::from_secs(5))
            .count();
        assert_eq!(late, 2);
    }
}
