//! Market Data Adapters
//!
//! Sources behind `MarketDataPort`:
//! - `CoinGeckoMarketData`: live API over the rate-limited fetch client
//! - `SyntheticMarketData`: seeded generator for offline runs
//!
//! Fetch discipline:
//! - Window rate limiting (10 requests / 60s, 2s spacing by default)
//! - Exponential backoff with jitter on retryable failures
//! - Per-attempt timeout
//! - Responses memoised in the shared result cache

mod coingecko;
mod fetch_client;
mod rate_limiter;
mod synthetic;
mod types;

pub use coingecko::CoinGeckoMarketData;
pub use fetch_client::{cache_key, retry_with_backoff, ApiConfig, FetchClient, FetchError, RetryPolicy};
pub use rate_limiter::{RateLimitConfig, RateLimiter, SharedRateLimiter};
pub use synthetic::SyntheticMarketData;

use serde::{Deserialize, Serialize};

/// Which market data adapter to run against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    #[default]
    Live,
    Synthetic,
}
