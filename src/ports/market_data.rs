//! Market data port
//!
//! Everything the scanner needs from a CoinGecko-compatible listing service:
//! trending ids, paged market listings, global statistics and a per-token
//! snapshot with price/volume history.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketDataError {
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Upstream request timed out")]
    Timeout,

    #[error("Circuit open - upstream unhealthy, retry in {0}s")]
    CircuitOpen(u64),

    #[error("Token not found: {0}")]
    NotFound(String),

    #[error("Response parsing error: {0}")]
    Parse(String),
}

/// Listing sort order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketOrder {
    VolumeDesc,
    MarketCapDesc,
    IdAsc,
}

impl MarketOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketOrder::VolumeDesc => "volume_desc",
            MarketOrder::MarketCapDesc => "market_cap_desc",
            MarketOrder::IdAsc => "id_asc",
        }
    }
}

/// Query against the market listing
#[derive(Debug, Clone, PartialEq)]
pub struct MarketQuery {
    pub order: MarketOrder,
    pub category: Option<String>,
    pub per_page: u32,
    pub page: u32,
}

impl MarketQuery {
    pub fn new(order: MarketOrder, per_page: u32) -> Self {
        Self {
            order,
            category: None,
            per_page,
            page: 1,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// One row of the market listing
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketListing {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub market_cap: f64,
    pub volume_24h: f64,
    pub price_change_24h: f64,
    pub price_change_1h: f64,
    /// All-time-low date, used as a listing-age proxy
    pub atl_date: Option<DateTime<Utc>>,
}

/// Market-wide statistics
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalStats {
    pub active_cryptocurrencies: u64,
    pub markets: u64,
    pub total_market_cap_usd: f64,
    pub total_volume_usd: f64,
    pub market_cap_change_24h: f64,
    pub btc_dominance: f64,
    pub eth_dominance: f64,
}

/// Aligned price/volume series, oldest first
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PriceHistory {
    /// Unix milliseconds
    pub timestamps: Vec<i64>,
    pub prices: Vec<f64>,
    pub volumes: Vec<f64>,
}

impl PriceHistory {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// Current market figures plus history for one token
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TokenSnapshot {
    pub listing: MarketListing,
    pub holders: u64,
    pub top_holders_percentage: Option<f64>,
    pub history: PriceHistory,
}

/// Market data port trait
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataPort: Send + Sync {
    /// Ids of currently trending tokens
    async fn trending_ids(&self) -> Result<Vec<String>, MarketDataError>;

    /// One page of the market listing
    async fn markets(&self, query: &MarketQuery) -> Result<Vec<MarketListing>, MarketDataError>;

    async fn global_stats(&self) -> Result<GlobalStats, MarketDataError>;

    /// Current figures and price/volume history of one token
    async fn token_snapshot(&self, id: &str) -> Result<TokenSnapshot, MarketDataError>;

    /// Adapter name for logging
    fn name(&self) -> &'static str;
}
