//! Recording mocks for the ports
//!
//! Hand-configured responses plus call recording, shared by unit tests and the
//! integration tests under `tests/`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use super::market_data::{
    GlobalStats, MarketDataError, MarketDataPort, MarketListing, MarketQuery, PriceHistory,
    TokenSnapshot,
};
use super::social::{PlatformActivity, SocialDataPort, SocialError};
use crate::domain::Platform;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Mock market data port that records calls and allows controlled responses
#[derive(Debug, Default, Clone)]
pub struct MockMarketData {
    calls: Arc<Mutex<Vec<String>>>,
    trending: Arc<Mutex<Option<Result<Vec<String>, MarketDataError>>>>,
    markets: Arc<Mutex<Vec<(MarketQuery, Result<Vec<MarketListing>, MarketDataError>)>>>,
    snapshots: Arc<Mutex<HashMap<String, Result<TokenSnapshot, MarketDataError>>>>,
    global: Arc<Mutex<Option<GlobalStats>>>,
    snapshot_delay: Option<Duration>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trending(self, ids: &[&str]) -> Self {
        *lock(&self.trending) = Some(Ok(ids.iter().map(|s| s.to_string()).collect()));
        self
    }

    pub fn with_trending_error(self, error: MarketDataError) -> Self {
        *lock(&self.trending) = Some(Err(error));
        self
    }

    /// Respond to an exact query with listings built from the ids
    pub fn with_markets(self, query: MarketQuery, ids: &[&str]) -> Self {
        let listings = ids.iter().map(|id| listing(id, 1_000_000.0, 100_000.0)).collect();
        self.with_listings(query, listings)
    }

    pub fn with_listings(self, query: MarketQuery, listings: Vec<MarketListing>) -> Self {
        lock(&self.markets).push((query, Ok(listings)));
        self
    }

    pub fn with_markets_error(self, query: MarketQuery, error: MarketDataError) -> Self {
        lock(&self.markets).push((query, Err(error)));
        self
    }

    pub fn with_snapshot(self, snapshot: TokenSnapshot) -> Self {
        lock(&self.snapshots).insert(snapshot.listing.id.clone(), Ok(snapshot));
        self
    }

    pub fn with_snapshot_error(self, id: &str, error: MarketDataError) -> Self {
        lock(&self.snapshots).insert(id.to_string(), Err(error));
        self
    }

    pub fn with_global(self, stats: GlobalStats) -> Self {
        *lock(&self.global) = Some(stats);
        self
    }

    /// Hold every snapshot call for `delay` to make overlap observable
    pub fn with_snapshot_delay(mut self, delay: Duration) -> Self {
        self.snapshot_delay = Some(delay);
        self
    }

    /// Get all recorded calls
    pub fn get_calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    /// Highest number of concurrently running snapshot calls
    pub fn max_concurrent_snapshots(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, call: String) {
        lock(&self.calls).push(call);
    }
}

#[async_trait]
impl MarketDataPort for MockMarketData {
    async fn trending_ids(&self) -> Result<Vec<String>, MarketDataError> {
        self.record("trending".to_string());
        lock(&self.trending).clone().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn markets(&self, query: &MarketQuery) -> Result<Vec<MarketListing>, MarketDataError> {
        self.record(format!("markets:{}:{}", query.order.as_str(), query.per_page));
        lock(&self.markets)
            .iter()
            .find(|(q, _)| q == query)
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn global_stats(&self) -> Result<GlobalStats, MarketDataError> {
        self.record("global".to_string());
        lock(&self.global)
            .clone()
            .ok_or_else(|| MarketDataError::Upstream("No response configured".to_string()))
    }

    async fn token_snapshot(&self, id: &str) -> Result<TokenSnapshot, MarketDataError> {
        self.record(format!("snapshot:{id}"));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.snapshot_delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let configured = lock(&self.snapshots).get(id).cloned();
        configured.unwrap_or_else(|| Ok(snapshot(id)))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Listing row with the given market cap and volume
pub fn listing(id: &str, market_cap: f64, volume_24h: f64) -> MarketListing {
    MarketListing {
        id: id.to_string(),
        symbol: id.to_uppercase(),
        name: id.to_string(),
        price: 1.0,
        market_cap,
        volume_24h,
        ..Default::default()
    }
}

/// Snapshot with a short flat history
pub fn snapshot(id: &str) -> TokenSnapshot {
    let n = 30;
    TokenSnapshot {
        listing: listing(id, 1_000_000.0, 100_000.0),
        holders: 500,
        top_holders_percentage: Some(40.0),
        history: PriceHistory {
            timestamps: (0..n).map(|i| i * 3_600_000).collect(),
            prices: vec![1.0; n as usize],
            volumes: vec![10_000.0; n as usize],
        },
    }
}

/// Mock social port with per-platform activity and optional failing tokens
#[derive(Debug, Default, Clone)]
pub struct MockSocialData {
    calls: Arc<Mutex<Vec<(Platform, String)>>>,
    activity: Arc<Mutex<HashMap<Platform, PlatformActivity>>>,
    failing: Arc<Mutex<Vec<(Platform, String)>>>,
}

impl MockSocialData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_activity(self, platform: Platform, activity: PlatformActivity) -> Self {
        lock(&self.activity).insert(platform, activity);
        self
    }

    /// Fail calls for `token_id` on `platform`
    pub fn failing_for(self, platform: Platform, token_id: &str) -> Self {
        lock(&self.failing).push((platform, token_id.to_string()));
        self
    }

    pub fn get_calls(&self) -> Vec<(Platform, String)> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl SocialDataPort for MockSocialData {
    async fn activity(
        &self,
        platform: Platform,
        token_id: &str,
    ) -> Result<PlatformActivity, SocialError> {
        lock(&self.calls).push((platform, token_id.to_string()));

        let fails = lock(&self.failing)
            .iter()
            .any(|(p, id)| *p == platform && id == token_id);
        if fails {
            return Err(SocialError::Unavailable(platform));
        }

        Ok(lock(&self.activity).get(&platform).cloned().unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
