//! Adapters Layer - External System Implementations
//!
//! This module contains implementations of the port traits:
//! - Market Data: CoinGecko client over the rate-limited fetch client, plus a
//!   seeded synthetic source
//! - Social: synthetic per-platform activity
//! - Cache: shared TTL result cache
//! - CLI: Command-line interface handlers

pub mod cache;
pub mod cli;
pub mod market_data;
pub mod social;

pub use cache::{CacheConfig, ResultCache, TtlCache};
pub use cli::CliApp;
pub use market_data::{CoinGeckoMarketData, DataSource, FetchClient, SyntheticMarketData};
pub use social::SyntheticSocialData;
