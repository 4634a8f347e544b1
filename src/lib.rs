//! Moonshot Scanner - Early-stage crypto token discovery library
//!
//! Discovers candidate tokens from several market listings, enriches them with
//! price/volume history and social activity, and ranks them by a composite
//! explosion score.
//!
//! # Modules
//!
//! - `domain`: Core types (TokenMetrics, ScrapingJob, CircuitBreaker)
//! - `ports`: Trait abstractions (MarketDataPort, SocialDataPort)
//! - `strategy`: Volume patterns, indicators, sentiment and scoring
//! - `adapters`: External implementations (CoinGecko, synthetic sources, cache, CLI)
//! - `config`: Configuration loading and validation
//! - `application`: Discovery, social aggregation, pipeline and job management

pub mod domain;
pub mod ports;
pub mod strategy;
pub mod adapters;
pub mod config;
pub mod application;
