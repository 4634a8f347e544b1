//! CoinGecko response shapes
//!
//! Every numeric field is nullable upstream; missing values default to 0.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;

use crate::ports::{GlobalStats, MarketListing};

/// Row of `/coins/markets`
#[derive(Debug, Clone, Deserialize)]
pub struct CoinMarketRow {
    pub id: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub total_volume: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_1h_in_currency: Option<f64>,
    #[serde(default)]
    pub atl_date: Option<DateTime<Utc>>,
}

impl From<CoinMarketRow> for MarketListing {
    fn from(row: CoinMarketRow) -> Self {
        Self {
            id: row.id,
            symbol: row.symbol.to_uppercase(),
            name: row.name,
            price: row.current_price.unwrap_or_default(),
            market_cap: row.market_cap.unwrap_or_default(),
            volume_24h: row.total_volume.unwrap_or_default(),
            price_change_24h: row.price_change_percentage_24h.unwrap_or_default(),
            price_change_1h: row.price_change_percentage_1h_in_currency.unwrap_or_default(),
            atl_date: row.atl_date,
        }
    }
}

/// `/search/trending`
#[derive(Debug, Deserialize)]
pub struct TrendingResponse {
    #[serde(default)]
    pub coins: Vec<TrendingCoin>,
}

#[derive(Debug, Deserialize)]
pub struct TrendingCoin {
    pub item: TrendingItem,
}

#[derive(Debug, Deserialize)]
pub struct TrendingItem {
    pub id: String,
}

/// `/global`
#[derive(Debug, Deserialize)]
pub struct GlobalResponse {
    pub data: GlobalData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GlobalData {
    pub active_cryptocurrencies: u64,
    pub markets: u64,
    pub total_market_cap: HashMap<String, f64>,
    pub total_volume: HashMap<String, f64>,
    pub market_cap_change_percentage_24h_usd: f64,
    pub market_cap_percentage: HashMap<String, f64>,
}

impl From<GlobalData> for GlobalStats {
    fn from(data: GlobalData) -> Self {
        Self {
            active_cryptocurrencies: data.active_cryptocurrencies,
            markets: data.markets,
            total_market_cap_usd: data.total_market_cap.get("usd").copied().unwrap_or_default(),
            total_volume_usd: data.total_volume.get("usd").copied().unwrap_or_default(),
            market_cap_change_24h: data.market_cap_change_percentage_24h_usd,
            btc_dominance: data.market_cap_percentage.get("btc").copied().unwrap_or_default(),
            eth_dominance: data.market_cap_percentage.get("eth").copied().unwrap_or_default(),
        }
    }
}

/// `/coins/{id}`
#[derive(Debug, Deserialize)]
pub struct CoinDetail {
    pub id: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub market_data: Option<CoinMarketData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CoinMarketData {
    pub current_price: HashMap<String, Option<f64>>,
    pub market_cap: HashMap<String, Option<f64>>,
    pub total_volume: HashMap<String, Option<f64>>,
    pub price_change_percentage_24h: Option<f64>,
    pub price_change_percentage_1h_in_currency: HashMap<String, Option<f64>>,
    pub atl_date: HashMap<String, Option<DateTime<Utc>>>,
}

fn usd<T: Copy + Default>(map: &HashMap<String, Option<T>>) -> T {
    map.get("usd").copied().flatten().unwrap_or_default()
}

impl From<CoinDetail> for MarketListing {
    fn from(detail: CoinDetail) -> Self {
        let md = detail.market_data.unwrap_or_default();
        Self {
            id: detail.id,
            symbol: detail.symbol.to_uppercase(),
            name: detail.name,
            price: usd(&md.current_price),
            market_cap: usd(&md.market_cap),
            volume_24h: usd(&md.total_volume),
            price_change_24h: md.price_change_percentage_24h.unwrap_or_default(),
            price_change_1h: usd(&md.price_change_percentage_1h_in_currency),
            atl_date: md.atl_date.get("usd").copied().flatten(),
        }
    }
}

/// `/coins/{id}/market_chart`: `[unix_ms, value]` pairs
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MarketChart {
    pub prices: Vec<[f64; 2]>,
    pub total_volumes: Vec<[f64; 2]>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_row_nulls_default_to_zero() {
        let row: CoinMarketRow = serde_json::from_str(
            r#"{"id":"bonk","symbol":"bonk","name":"Bonk","current_price":null,
                "market_cap":1000000,"total_volume":null,"atl_date":"2024-01-02T03:04:05.000Z"}"#,
        )
        .unwrap();

        let listing = MarketListing::from(row);
        assert_eq!(listing.symbol, "BONK");
        assert_eq!(listing.price, 0.0);
        assert_eq!(listing.market_cap, 1_000_000.0);
        assert!(listing.atl_date.is_some());
    }

    #[test]
    fn test_global_mapping() {
        let response: GlobalResponse = serde_json::from_str(
            r#"{"data":{"active_cryptocurrencies":12000,"markets":900,
                "total_market_cap":{"usd":2.5e12},"total_volume":{"usd":9.0e10},
                "market_cap_change_percentage_24h_usd":-1.5,
                "market_cap_percentage":{"btc":52.1,"eth":16.8}}}"#,
        )
        .unwrap();

        let stats = GlobalStats::from(response.data);
        assert_eq!(stats.active_cryptocurrencies, 12000);
        assert_eq!(stats.total_market_cap_usd, 2.5e12);
        assert_eq!(stats.btc_dominance, 52.1);
    }

    #[test]
    fn test_coin_detail_mapping() {
        let detail: CoinDetail = serde_json::from_str(
            r#"{"id":"pepe","symbol":"pepe","name":"Pepe","market_data":{
                "current_price":{"usd":0.00001},"market_cap":{"usd":4.0e9},
                "total_volume":{"usd":5.0e8},"price_change_percentage_24h":3.5,
                "price_change_percentage_1h_in_currency":{"usd":0.4},
                "atl_date":{"usd":null}}}"#,
        )
        .unwrap();

        let listing = MarketListing::from(detail);
        assert_eq!(listing.market_cap, 4.0e9);
        assert_eq!(listing.price_change_1h, 0.4);
        assert!(listing.atl_date.is_none());
    }

    #[test]
    fn test_trending_ids() {
        let response: TrendingResponse =
            serde_json::from_str(r#"{"coins":[{"item":{"id":"wif"}},{"item":{"id":"popcat"}}]}"#)
                .unwrap();
        let ids: Vec<_> = response.coins.into_iter().map(|c| c.item.id).collect();
        assert_eq!(ids, vec!["wif", "popcat"]);
    }
}
