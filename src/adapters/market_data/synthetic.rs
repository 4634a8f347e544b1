//! Synthetic market data
//!
//! Seeded generator standing in for the live API during demos and tests.
//! Figures for a given token id are stable for a given seed.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::ports::{
    GlobalStats, MarketDataError, MarketDataPort, MarketListing, MarketOrder, MarketQuery,
    PriceHistory, TokenSnapshot,
};

const TOKEN_UNIVERSE: &[&str] = &[
    "pepe", "bonk", "dogwifcoin", "floki", "shiba-inu", "dogecoin", "popcat", "brett",
    "mog-coin", "book-of-meme", "cat-in-a-dogs-world", "gigachad", "turbo", "myro",
    "slerf", "wen", "ponke", "michi", "moo-deng", "goatseus-maximus", "fwog", "retardio",
    "billy", "giko-cat", "sigma", "mother-iggy", "peanut-the-squirrel", "act-i",
    "zerebro", "chill-guy", "neiro", "baby-doge-coin", "dogs", "sundog", "harambe",
    "kekius-maximus", "toshi", "ski-mask-dog", "apu", "andy",
];

/// Hourly history points per snapshot
const HISTORY_POINTS: usize = 72;
const TRENDING_COUNT: usize = 7;

#[derive(Debug, Clone)]
pub struct SyntheticMarketData {
    seed: u64,
}

impl SyntheticMarketData {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    fn rng_for(&self, id: &str) -> StdRng {
        let mut hasher = DefaultHasher::new();
        id.hash(&mut hasher);
        StdRng::seed_from_u64(self.seed ^ hasher.finish())
    }

    fn listing(&self, id: &str, rng: &mut StdRng) -> MarketListing {
        let market_cap = log_uniform(rng, 1e6, 5e9);
        let price = log_uniform(rng, 1e-6, 10.0);
        MarketListing {
            id: id.to_string(),
            symbol: symbol_for(id),
            name: name_for(id),
            price,
            market_cap,
            volume_24h: market_cap * rng.gen_range(0.01..0.8),
            price_change_24h: rng.gen_range(-30.0..60.0),
            price_change_1h: rng.gen_range(-5.0..10.0),
            atl_date: Some(Utc::now() - ChronoDuration::hours(rng.gen_range(1..24 * 30))),
        }
    }

    fn history(&self, listing: &MarketListing, rng: &mut StdRng) -> PriceHistory {
        let now_ms = Utc::now().timestamp_millis();
        let base_volume = (listing.volume_24h / 24.0).max(1.0);
        let mut price = listing.price.max(1e-9);
        let mut history = PriceHistory::default();

        for i in 0..HISTORY_POINTS {
            price *= 1.0 + rng.gen_range(-0.05..0.05);
            let spike = if rng.gen_bool(0.1) { 4.0 } else { 1.0 };
            history
                .timestamps
                .push(now_ms - (HISTORY_POINTS - i) as i64 * 3_600_000);
            history.prices.push(price);
            history
                .volumes
                .push(base_volume * rng.gen_range(0.5..1.5) * spike);
        }
        history
    }
}

#[async_trait]
impl MarketDataPort for SyntheticMarketData {
    async fn trending_ids(&self) -> Result<Vec<String>, MarketDataError> {
        let mut rng = self.rng_for("trending");
        let mut ids: Vec<String> = TOKEN_UNIVERSE.iter().map(|s| s.to_string()).collect();
        let start = rng.gen_range(0..ids.len());
        ids.rotate_left(start);
        ids.truncate(TRENDING_COUNT);
        Ok(ids)
    }

    async fn markets(&self, query: &MarketQuery) -> Result<Vec<MarketListing>, MarketDataError> {
        let mut rows: Vec<MarketListing> = TOKEN_UNIVERSE
            .iter()
            .map(|id| self.listing(id, &mut self.rng_for(id)))
            .collect();

        if query.category.is_some() {
            // newly listed: keep the most recent all-time lows
            rows.retain(|r| {
                r.atl_date
                    .map(|d| Utc::now() - d < ChronoDuration::hours(96))
                    .unwrap_or(false)
            });
        }

        match query.order {
            MarketOrder::VolumeDesc => rows.sort_by(|a, b| b.volume_24h.total_cmp(&a.volume_24h)),
            MarketOrder::MarketCapDesc => rows.sort_by(|a, b| b.market_cap.total_cmp(&a.market_cap)),
            MarketOrder::IdAsc => rows.sort_by(|a, b| a.id.cmp(&b.id)),
        }

        let skip = (query.page.saturating_sub(1) * query.per_page) as usize;
        Ok(rows.into_iter().skip(skip).take(query.per_page as usize).collect())
    }

    async fn global_stats(&self) -> Result<GlobalStats, MarketDataError> {
        let mut rng = self.rng_for("global");
        let btc = rng.gen_range(45.0..60.0);
        Ok(GlobalStats {
            active_cryptocurrencies: rng.gen_range(10_000..16_000),
            markets: rng.gen_range(800..1_200),
            total_market_cap_usd: rng.gen_range(1.5e12..3.5e12),
            total_volume_usd: rng.gen_range(5e10..1.5e11),
            market_cap_change_24h: rng.gen_range(-5.0..5.0),
            btc_dominance: btc,
            eth_dominance: rng.gen_range(10.0..20.0_f64).min(100.0 - btc),
        })
    }

    async fn token_snapshot(&self, id: &str) -> Result<TokenSnapshot, MarketDataError> {
        if id.is_empty() {
            return Err(MarketDataError::NotFound(id.to_string()));
        }
        let mut rng = self.rng_for(id);
        let listing = self.listing(id, &mut rng);
        let history = self.history(&listing, &mut rng);

        Ok(TokenSnapshot {
            holders: rng.gen_range(100..100_000),
            top_holders_percentage: Some(rng.gen_range(10.0..90.0)),
            listing,
            history,
        })
    }

    fn name(&self) -> &'static str {
        "synthetic"
    }
}

fn log_uniform(rng: &mut StdRng, low: f64, high: f64) -> f64 {
    rng.gen_range(low.ln()..high.ln()).exp()
}

fn symbol_for(id: &str) -> String {
    id.split('-')
        .next()
        .unwrap_or(id)
        .chars()
        .take(5)
        .collect::<String>()
        .to_uppercase()
}

fn name_for(id: &str) -> String {
    id.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_snapshot_is_stable_per_seed() {
        let source = SyntheticMarketData::new(7);
        let a = source.token_snapshot("pepe").await.unwrap();
        let b = source.token_snapshot("pepe").await.unwrap();

        assert_eq!(a.listing.market_cap, b.listing.market_cap);
        assert_eq!(a.history.prices, b.history.prices);
        assert_eq!(a.history.len(), HISTORY_POINTS);
        assert_eq!(a.listing.symbol, "PEPE");
    }

    #[tokio::test]
    async fn test_listing_matches_snapshot() {
        let source = SyntheticMarketData::new(7);
        let query = MarketQuery::new(MarketOrder::VolumeDesc, 250);
        let rows = source.markets(&query).await.unwrap();
        let bonk = rows.iter().find(|r| r.id == "bonk").unwrap();

        let snapshot = source.token_snapshot("bonk").await.unwrap();
        assert_eq!(bonk.market_cap, snapshot.listing.market_cap);
    }

    #[tokio::test]
    async fn test_markets_sorted_and_paged() {
        let source = SyntheticMarketData::new(1);
        let rows = source
            .markets(&MarketQuery::new(MarketOrder::VolumeDesc, 10))
            .await
            .unwrap();

        assert_eq!(rows.len(), 10);
        assert!(rows.windows(2).all(|w| w[0].volume_24h >= w[1].volume_24h));
    }

    #[tokio::test]
    async fn test_trending_subset() {
        let source = SyntheticMarketData::new(1);
        let ids = source.trending_ids().await.unwrap();
        assert_eq!(ids.len(), TRENDING_COUNT);
        assert!(ids.iter().all(|id| TOKEN_UNIVERSE.contains(&id.as_str())));
    }

    #[test]
    fn test_display_names() {
        assert_eq!(name_for("cat-in-a-dogs-world"), "Cat In A Dogs World");
        assert_eq!(symbol_for("goatseus-maximus"), "GOATS");
    }
}
