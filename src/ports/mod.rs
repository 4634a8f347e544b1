//! Ports Layer - Trait definitions for external dependencies
//!
//! Following hexagonal architecture, these traits abstract:
//! - Market listings, global stats and per-token history
//! - Raw social activity per platform

pub mod market_data;
pub mod social;
pub mod mocks;

pub use market_data::{
    GlobalStats, MarketDataError, MarketDataPort, MarketListing, MarketOrder, MarketQuery,
    PriceHistory, TokenSnapshot,
};
pub use social::{PlatformActivity, SocialDataPort, SocialError};
