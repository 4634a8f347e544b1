//! Per-token enrichment pipeline
//!
//! market snapshot -> social metrics -> volume patterns + indicators -> scores

use std::sync::Arc;

use thiserror::Error;

use super::social_aggregator::SocialAggregator;
use crate::domain::TokenMetrics;
use crate::ports::{MarketDataError, MarketDataPort, SocialError};
use crate::strategy::{compute_indicators, AnalysisError, ScoringEngine, VolumeAnalyzer};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Market data: {0}")]
    Market(#[from] MarketDataError),

    #[error("Social metrics: {0}")]
    Social(#[from] SocialError),

    #[error("Volume analysis: {0}")]
    Analysis(#[from] AnalysisError),
}

pub struct TokenPipeline {
    market: Arc<dyn MarketDataPort>,
    social: SocialAggregator,
    analyzer: VolumeAnalyzer,
    scoring: ScoringEngine,
}

impl TokenPipeline {
    pub fn new(
        market: Arc<dyn MarketDataPort>,
        social: SocialAggregator,
        analyzer: VolumeAnalyzer,
        scoring: ScoringEngine,
    ) -> Self {
        Self {
            market,
            social,
            analyzer,
            scoring,
        }
    }

    /// Fully enrich and score one token
    pub async fn process(&self, token_id: &str) -> Result<TokenMetrics, PipelineError> {
        tracing::debug!(token_id, "Processing token");

        let snapshot = self.market.token_snapshot(token_id).await?;
        let social_metrics = self.social.metrics(token_id).await?;

        let history = &snapshot.history;
        let volume_patterns =
            self.analyzer
                .analyze(&history.volumes, &history.prices, &history.timestamps)?;
        let technical_indicators = compute_indicators(
            &history.prices,
            &history.volumes,
            self.analyzer.config().rsi_period,
        );

        let listing = snapshot.listing;
        let mut token = TokenMetrics {
            id: listing.id,
            symbol: listing.symbol,
            name: listing.name,
            price: listing.price,
            market_cap: listing.market_cap,
            volume_24h: listing.volume_24h,
            price_change_24h: listing.price_change_24h,
            price_change_1h: listing.price_change_1h,
            holders: snapshot.holders,
            top_holders_percentage: snapshot.top_holders_percentage,
            social_metrics,
            volume_patterns,
            technical_indicators,
            explosion_score: None,
            surge_score: None,
        };
        self.scoring.score_token(&mut token);

        tracing::debug!(
            token_id,
            explosion = token.explosion_score.unwrap_or_default(),
            surge = token.surge_score.unwrap_or_default(),
            "Token processing completed"
        );
        Ok(token)
    }
}
