//! Social Metrics Aggregator
//!
//! Fetches raw activity for every platform concurrently, each behind its own
//! window rate limiter, scores post sentiment with the configured strategy and
//! caches the per-token result. One platform failing fails the whole call.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};

use crate::adapters::cache::TtlCache;
use crate::adapters::market_data::{RateLimitConfig, RateLimiter, SharedRateLimiter};
use crate::domain::{Platform, PlatformMetrics, SocialMetrics};
use crate::ports::{SocialDataPort, SocialError};
use crate::strategy::{virality_score, SentimentAnalyzer};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialConfig {
    /// Limiter applied to each platform independently
    pub rate_limit: RateLimitConfig,
    /// Per-token cache lifetime in seconds (default: 300)
    pub cache_ttl_secs: u64,
    /// Engagement rate treated as fully viral (default: 0.1)
    pub viral_rate: f64,
}

impl Default for SocialConfig {
    fn default() -> Self {
        Self {
            rate_limit: RateLimitConfig {
                max_requests: 10,
                window_secs: 60,
                min_interval_ms: 0,
            },
            cache_ttl_secs: 300,
            viral_rate: 0.1,
        }
    }
}

pub struct SocialAggregator {
    source: Arc<dyn SocialDataPort>,
    sentiment: Arc<dyn SentimentAnalyzer>,
    limiters: HashMap<Platform, SharedRateLimiter>,
    cache: TtlCache<SocialMetrics>,
    viral_rate: f64,
}

impl SocialAggregator {
    pub fn new(
        source: Arc<dyn SocialDataPort>,
        sentiment: Arc<dyn SentimentAnalyzer>,
        config: SocialConfig,
    ) -> Self {
        let limiters = Platform::ALL
            .into_iter()
            .map(|p| (p, RateLimiter::shared(config.rate_limit.clone())))
            .collect();

        Self {
            source,
            sentiment,
            limiters,
            cache: TtlCache::new(Duration::from_secs(config.cache_ttl_secs)),
            viral_rate: config.viral_rate,
        }
    }

    /// Social metrics for every platform, cached per token
    pub async fn metrics(&self, token_id: &str) -> Result<SocialMetrics, SocialError> {
        if let Some(cached) = self.cache.get(token_id).await {
            tracing::debug!(token_id, "Using cached social metrics");
            return Ok(cached);
        }

        let fetched = try_join_all(
            Platform::ALL
                .into_iter()
                .map(|platform| self.platform_metrics(platform, token_id)),
        )
        .await
        .map_err(|e| {
            tracing::warn!(token_id, error = %e, "Social metrics fetch failed");
            e
        })?;

        let mut metrics = SocialMetrics::default();
        for (platform, platform_metrics) in fetched {
            metrics.set(platform, platform_metrics);
        }

        let expired = self.cache.sweep().await;
        if expired > 0 {
            tracing::debug!(expired, "Dropped expired social metrics");
        }
        self.cache.set(token_id, metrics.clone(), None).await;
        tracing::debug!(
            token_id,
            sentiment = self.sentiment.name(),
            twitter_mentions = metrics.twitter.mentions,
            "Social metrics fetched"
        );
        Ok(metrics)
    }

    async fn platform_metrics(
        &self,
        platform: Platform,
        token_id: &str,
    ) -> Result<(Platform, PlatformMetrics), SocialError> {
        if let Some(limiter) = self.limiters.get(&platform) {
            limiter.lock().await.acquire().await;
        }

        let activity = self.source.activity(platform, token_id).await?;
        let sentiment = self.sentiment.score_all(&activity.posts).clamp(-1.0, 1.0);

        Ok((
            platform,
            PlatformMetrics {
                mentions: activity.mentions,
                sentiment,
                engagement: activity.engagement,
                trending: activity.trending,
                sentiment_change_24h: activity.prior_sentiment.map(|prior| sentiment - prior),
                virality_score: Some(virality_score(
                    activity.mentions,
                    activity.engagement,
                    self.viral_rate,
                )),
            },
        ))
    }
}
