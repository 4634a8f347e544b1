//! Token Discovery
//!
//! Unions four listing sources, queried concurrently:
//! - trending tokens
//! - new listings whose all-time-low date falls inside the recency window
//! - high turnover listings (24h volume / market cap above a threshold)
//! - the general listing, top N by volume
//!
//! The first three are optional: a failure (or an open circuit) contributes
//! nothing and is logged. The general listing is required; its failure is fatal.
//! All calls pass through one circuit breaker guarding the upstream.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::domain::{ratio_or_zero, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError};
use crate::ports::{MarketDataError, MarketDataPort, MarketListing, MarketOrder, MarketQuery};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DiscoveryError {
    #[error("General listing unavailable: {0}")]
    Fatal(MarketDataError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Maximum listing age in hours for the new-listings source (default: 48)
    pub recency_hours: i64,
    /// Volume / market cap ratio for the high-turnover source (default: 0.3)
    pub volume_to_mcap_threshold: f64,
    /// Category queried for new listings
    pub new_listings_category: String,
    pub new_listings_per_page: u32,
    pub high_volume_per_page: u32,
    /// Size of the general listing (default: 250)
    pub general_per_page: u32,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            recency_hours: 48,
            volume_to_mcap_threshold: 0.3,
            new_listings_category: "new-tokens".to_string(),
            new_listings_per_page: 250,
            high_volume_per_page: 100,
            general_per_page: 250,
        }
    }
}

impl DiscoveryConfig {
    pub fn new_listings_query(&self) -> MarketQuery {
        MarketQuery::new(MarketOrder::IdAsc, self.new_listings_per_page)
            .with_category(self.new_listings_category.clone())
    }

    pub fn high_volume_query(&self) -> MarketQuery {
        MarketQuery::new(MarketOrder::VolumeDesc, self.high_volume_per_page)
    }

    pub fn general_query(&self) -> MarketQuery {
        MarketQuery::new(MarketOrder::VolumeDesc, self.general_per_page)
    }
}

pub struct TokenDiscovery {
    market: Arc<dyn MarketDataPort>,
    config: DiscoveryConfig,
    breaker: Mutex<CircuitBreaker>,
}

impl TokenDiscovery {
    pub fn new(
        market: Arc<dyn MarketDataPort>,
        config: DiscoveryConfig,
        breaker: CircuitBreakerConfig,
    ) -> Self {
        Self {
            market,
            config,
            breaker: Mutex::new(CircuitBreaker::with_config(breaker)),
        }
    }

    /// De-duplicated union of all sources, first-seen order preserved
    pub async fn discover(&self) -> Result<Vec<String>, DiscoveryError> {
        let (trending, new_listings, high_volume, general) = tokio::join!(
            self.optional("trending", self.trending()),
            self.optional("new_listings", self.new_listings()),
            self.optional("high_volume", self.high_volume()),
            self.general_listing(),
        );
        let general = general?;

        let general_ids: Vec<String> = general.into_iter().map(|l| l.id).collect();
        tracing::info!(
            source = self.market.name(),
            trending = trending.len(),
            new_listings = new_listings.len(),
            high_volume = high_volume.len(),
            general = general_ids.len(),
            "Token discovery sources fetched"
        );

        let tokens = dedupe([trending, new_listings, high_volume, general_ids]);
        tracing::info!(unique_tokens = tokens.len(), "Token discovery completed");
        Ok(tokens)
    }

    /// Required general listing, top N by volume
    pub async fn general_listing(&self) -> Result<Vec<MarketListing>, DiscoveryError> {
        let query = self.config.general_query();
        self.guarded(self.market.markets(&query))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "General listing failed");
                DiscoveryError::Fatal(e)
            })
    }

    async fn trending(&self) -> Result<Vec<String>, MarketDataError> {
        self.guarded(self.market.trending_ids()).await
    }

    async fn new_listings(&self) -> Result<Vec<String>, MarketDataError> {
        let query = self.config.new_listings_query();
        let rows = self.guarded(self.market.markets(&query)).await?;
        let cutoff = Utc::now() - ChronoDuration::hours(self.config.recency_hours);
        Ok(rows
            .into_iter()
            .filter(|row| row.atl_date.map(|d| d >= cutoff).unwrap_or(false))
            .map(|row| row.id)
            .collect())
    }

    async fn high_volume(&self) -> Result<Vec<String>, MarketDataError> {
        let query = self.config.high_volume_query();
        let rows = self.guarded(self.market.markets(&query)).await?;
        let threshold = self.config.volume_to_mcap_threshold;
        Ok(rows
            .into_iter()
            .filter(|row| {
                row.market_cap > 0.0 && ratio_or_zero(row.volume_24h, row.market_cap) > threshold
            })
            .map(|row| row.id)
            .collect())
    }

    /// Empty result for a failed optional source
    async fn optional<F>(&self, source: &'static str, fetch: F) -> Vec<String>
    where
        F: Future<Output = Result<Vec<String>, MarketDataError>>,
    {
        match fetch.await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(source, error = %e, "Discovery source failed, skipping");
                Vec::new()
            }
        }
    }

    /// Run `call` through the circuit breaker
    async fn guarded<T, F>(&self, call: F) -> Result<T, MarketDataError>
    where
        F: Future<Output = Result<T, MarketDataError>>,
    {
        self.breaker
            .lock()
            .await
            .check(unix_now())
            .map_err(|e| match e {
                CircuitBreakerError::Open(secs) => MarketDataError::CircuitOpen(secs),
                CircuitBreakerError::TrialInFlight => MarketDataError::CircuitOpen(0),
            })?;

        let result = call.await;

        let mut breaker = self.breaker.lock().await;
        let now = unix_now();
        match &result {
            Ok(_) => breaker.record_success(),
            Err(_) => {
                breaker.record_failure(now);
                let state = breaker.state(now);
                if !state.status.allows_calls() {
                    tracing::warn!(
                        source = self.market.name(),
                        consecutive_failures = state.consecutive_failures,
                        total_trips = state.total_trips,
                        cooldown_remaining_secs = state.cooldown_remaining_secs,
                        "{}",
                        state.status.description()
                    );
                }
            }
        }
        result
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Flatten id lists keeping the first occurrence of each id
pub fn dedupe<I>(sources: I) -> Vec<String>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut seen = HashSet::new();
    sources
        .into_iter()
        .flatten()
        .filter(|id| seen.insert(id.clone()))
        .collect()
}
