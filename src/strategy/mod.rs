//! Strategy Layer - Pure analysis and scoring
//!
//! Everything here is a deterministic function of already-collected metrics:
//! - `volume_analyzer`: moving average + RSI pattern classification
//! - `indicators`: RSI, MACD, volume profile and volatility summaries
//! - `sentiment`: pluggable text sentiment and virality
//! - `scoring`: explosion and surge composite scores

pub mod volume_analyzer;
pub mod indicators;
pub mod sentiment;
pub mod scoring;

pub use volume_analyzer::{AnalysisError, AnalyzerConfig, VolumeAnalyzer};
pub use indicators::compute_indicators;
pub use sentiment::{virality_score, KeywordSentiment, SentimentAnalyzer};
pub use scoring::{
    ExplosionBreakdown, ExplosionWeights, MarketCapBand, ScoringConfig, ScoringEngine,
    SocialWeights, StructureWeights, SurgeConfig, SurgeInputs,
};
