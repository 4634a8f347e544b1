//! CoinGecko market data adapter
//!
//! Implements `MarketDataPort` over the rate-limited fetch client. Every call
//! goes through the shared limiter, retry policy and result cache.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::fetch_client::{FetchClient, FetchError};
use super::types::{CoinDetail, CoinMarketRow, GlobalResponse, MarketChart, TrendingResponse};
use crate::ports::{
    GlobalStats, MarketDataError, MarketDataPort, MarketListing, MarketQuery, PriceHistory,
    TokenSnapshot,
};

/// Days of hourly history requested per snapshot
const HISTORY_DAYS: u32 = 7;

pub struct CoinGeckoMarketData {
    client: FetchClient,
}

impl CoinGeckoMarketData {
    pub fn new(client: FetchClient) -> Self {
        Self { client }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T, MarketDataError> {
        let value = self
            .client
            .fetch(endpoint, params)
            .await
            .map_err(|e| map_fetch_error(endpoint, e))?;
        decode(value)
    }

    async fn price_history(&self, id: &str) -> Result<PriceHistory, MarketDataError> {
        let chart: MarketChart = self
            .get(
                &format!("/coins/{id}/market_chart"),
                &[
                    ("vs_currency", "usd".to_string()),
                    ("days", HISTORY_DAYS.to_string()),
                ],
            )
            .await?;
        Ok(align_chart(chart))
    }
}

#[async_trait]
impl MarketDataPort for CoinGeckoMarketData {
    async fn trending_ids(&self) -> Result<Vec<String>, MarketDataError> {
        let response: TrendingResponse = self.get("/search/trending", &[]).await?;
        Ok(response.coins.into_iter().map(|c| c.item.id).collect())
    }

    async fn markets(&self, query: &MarketQuery) -> Result<Vec<MarketListing>, MarketDataError> {
        let mut params = vec![
            ("vs_currency", "usd".to_string()),
            ("order", query.order.as_str().to_string()),
            ("per_page", query.per_page.to_string()),
            ("page", query.page.to_string()),
            ("sparkline", "false".to_string()),
            ("price_change_percentage", "1h,24h".to_string()),
        ];
        if let Some(ref category) = query.category {
            params.push(("category", category.clone()));
        }

        let rows: Vec<CoinMarketRow> = self.get("/coins/markets", &params).await?;
        Ok(rows.into_iter().map(MarketListing::from).collect())
    }

    async fn global_stats(&self) -> Result<GlobalStats, MarketDataError> {
        let response: GlobalResponse = self.get("/global", &[]).await?;
        Ok(GlobalStats::from(response.data))
    }

    async fn token_snapshot(&self, id: &str) -> Result<TokenSnapshot, MarketDataError> {
        let detail: CoinDetail = self
            .get(
                &format!("/coins/{id}"),
                &[
                    ("localization", "false".to_string()),
                    ("tickers", "false".to_string()),
                    ("community_data", "false".to_string()),
                    ("developer_data", "false".to_string()),
                ],
            )
            .await?;
        let history = self.price_history(id).await?;

        Ok(TokenSnapshot {
            listing: MarketListing::from(detail),
            // holder data is not published by this API
            holders: 0,
            top_holders_percentage: None,
            history,
        })
    }

    fn name(&self) -> &'static str {
        "coingecko"
    }
}

fn map_fetch_error(endpoint: &str, error: FetchError) -> MarketDataError {
    match error {
        FetchError::Timeout(_) => MarketDataError::Timeout,
        FetchError::Status { status: 404, .. } => MarketDataError::NotFound(endpoint.to_string()),
        FetchError::Decode(msg) => MarketDataError::Parse(msg),
        other => MarketDataError::Upstream(other.to_string()),
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, MarketDataError> {
    serde_json::from_value(value).map_err(|e| MarketDataError::Parse(e.to_string()))
}

/// Zip price and volume points into aligned series, dropping unmatched tails
pub fn align_chart(chart: MarketChart) -> PriceHistory {
    let mut history = PriceHistory::default();
    for (price, volume) in chart.prices.iter().zip(chart.total_volumes.iter()) {
        history.timestamps.push(price[0] as i64);
        history.prices.push(price[1]);
        history.volumes.push(volume[1]);
    }
    history
}
