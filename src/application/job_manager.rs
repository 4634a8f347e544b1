//! Job Manager
//!
//! Owns scraping job lifecycle:
//! 1. `start` registers a pending job and spawns the run, returning at once
//! 2. discovery fixes `total_tokens`; a fatal discovery error fails the job
//! 3. token pipelines run in a `JoinSet`, at most `max_concurrency` at a time
//! 4. per-token failures are logged and dropped; every attempt counts as processed
//! 5. results are ranked by explosion score, stored on the job and in the
//!    result cache under `scraping_results_<id>`
//!
//! Finished jobs beyond `max_retained_jobs` are evicted oldest first.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, Semaphore};
use tokio::task::JoinSet;

use super::discovery::TokenDiscovery;
use super::pipeline::TokenPipeline;
use crate::adapters::cache::ResultCache;
use crate::domain::{JobId, ScrapingJob, TokenMetrics};

/// Cache key prefix for finished job results
pub const RESULTS_KEY_PREFIX: &str = "scraping_results_";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Token pipelines allowed in flight (default: 3)
    pub max_concurrency: usize,
    /// Finished jobs kept for status queries (default: 100)
    pub max_retained_jobs: usize,
    /// Explosion score counted as high potential in the summary log (default: 75)
    pub high_potential_threshold: f64,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 3,
            max_retained_jobs: 100,
            high_potential_threshold: 75.0,
        }
    }
}

pub fn results_key(id: JobId) -> String {
    format!("{RESULTS_KEY_PREFIX}{id}")
}

#[derive(Clone)]
pub struct JobManager {
    inner: Arc<Inner>,
}

struct Inner {
    discovery: TokenDiscovery,
    pipeline: Arc<TokenPipeline>,
    cache: Arc<ResultCache>,
    config: JobConfig,
    jobs: RwLock<BTreeMap<JobId, ScrapingJob>>,
    next_id: AtomicU64,
}

impl JobManager {
    pub fn new(
        discovery: TokenDiscovery,
        pipeline: TokenPipeline,
        cache: Arc<ResultCache>,
        config: JobConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                discovery,
                pipeline: Arc::new(pipeline),
                cache,
                config,
                jobs: RwLock::new(BTreeMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register a new job and run it in the background
    pub async fn start(&self) -> JobId {
        let id = JobId(self.inner.next_id.fetch_add(1, Ordering::SeqCst));
        {
            let mut jobs = self.inner.jobs.write().await;
            jobs.insert(id, ScrapingJob::new(id));
            prune_finished(&mut jobs, self.inner.config.max_retained_jobs);
        }
        tracing::info!(job_id = %id, "Starting scraping job");

        // A panicking run still ends the job as failed
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let run = tokio::spawn(Arc::clone(&inner).run(id));
            if let Err(e) = run.await {
                tracing::error!(job_id = %id, error = %e, "Scraping job task aborted");
                let message = format!("Job task aborted: {e}");
                inner.update(id, |job| job.fail(message)).await;
            }
        });
        id
    }

    /// Snapshot of a job, `None` if unknown or evicted
    pub async fn status(&self, id: JobId) -> Option<ScrapingJob> {
        self.inner.jobs.read().await.get(&id).cloned()
    }

    /// Poll until the job finishes
    pub async fn wait_for(&self, id: JobId, poll_interval: Duration) -> Option<ScrapingJob> {
        loop {
            let job = self.status(id).await?;
            if job.is_finished() {
                return Some(job);
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// All retained jobs, oldest first
    pub async fn jobs(&self) -> Vec<ScrapingJob> {
        self.inner.jobs.read().await.values().cloned().collect()
    }

    /// Results cached for a finished job
    pub async fn cached_results(&self, id: JobId) -> Option<Vec<TokenMetrics>> {
        let value = self.inner.cache.get(&results_key(id)).await?;
        serde_json::from_value(value).ok()
    }
}

impl Inner {
    async fn run(self: Arc<Self>, id: JobId) {
        if !self.update(id, |job| job.mark_running()).await {
            return;
        }

        let tokens = match self.discovery.discover().await {
            Ok(tokens) => tokens,
            Err(e) => {
                tracing::error!(job_id = %id, error = %e, "Scraping job failed");
                let message = e.to_string();
                self.update(id, |job| job.fail(message)).await;
                return;
            }
        };

        let total = tokens.len();
        self.update(id, |job| job.set_total(total)).await;
        tracing::info!(job_id = %id, token_count = total, "Starting token analysis");

        let mut results = self.process_all(id, tokens).await;
        results.sort_by(|a, b| {
            let a = a.explosion_score.unwrap_or(0.0);
            let b = b.explosion_score.unwrap_or(0.0);
            b.total_cmp(&a)
        });

        match serde_json::to_value(&results) {
            Ok(value) => self.cache.set(results_key(id), value, None).await,
            Err(e) => tracing::warn!(job_id = %id, error = %e, "Could not cache job results"),
        }

        let threshold = self.config.high_potential_threshold;
        let high_potential = results
            .iter()
            .filter(|t| t.explosion_score.unwrap_or(0.0) > threshold)
            .count();
        let scored = results.len();

        self.update(id, |job| job.complete(results)).await;
        tracing::info!(
            job_id = %id,
            total_tokens = total,
            scored_tokens = scored,
            high_potential_tokens = high_potential,
            "Scraping job completed"
        );
    }

    async fn process_all(&self, id: JobId, tokens: Vec<String>) -> Vec<TokenMetrics> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for token_id in tokens {
            let semaphore = Arc::clone(&semaphore);
            let pipeline = Arc::clone(&self.pipeline);
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let result = pipeline.process(&token_id).await;
                (token_id, result)
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(token))) => results.push(token),
                Ok((token_id, Err(e))) => {
                    tracing::warn!(job_id = %id, token_id = %token_id, error = %e, "Error processing token");
                }
                Err(e) => {
                    tracing::error!(job_id = %id, error = %e, "Token task aborted");
                }
            }
            self.update(id, |job| job.record_processed()).await;
        }
        results
    }

    /// Apply a job transition, logging rejected ones.
    ///
    /// Retention is enforced under the same lock once the job finishes.
    async fn update<F, E>(&self, id: JobId, f: F) -> bool
    where
        F: FnOnce(&mut ScrapingJob) -> Result<(), E>,
        E: std::fmt::Display,
    {
        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.get_mut(&id) else {
            tracing::warn!(job_id = %id, "Job no longer tracked");
            return false;
        };
        if let Err(e) = f(job) {
            tracing::warn!(job_id = %id, error = %e, "Rejected job transition");
            return false;
        }
        if job.is_finished() {
            prune_finished(&mut jobs, self.config.max_retained_jobs);
        }
        true
    }
}

/// Evict the oldest finished jobs beyond `max_finished`
fn prune_finished(jobs: &mut BTreeMap<JobId, ScrapingJob>, max_finished: usize) {
    let finished: Vec<JobId> = jobs
        .values()
        .filter(|job| job.is_finished())
        .map(|job| job.id)
        .collect();
    let excess = finished.len().saturating_sub(max_finished);
    for id in finished.into_iter().take(excess) {
        jobs.remove(&id);
        tracing::debug!(job_id = %id, "Evicted finished job");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::discovery::DiscoveryConfig;
    use crate::application::social_aggregator::{SocialAggregator, SocialConfig};
    use crate::domain::{CircuitBreakerConfig, JobStatus};
    use crate::ports::mocks::{MockMarketData, MockSocialData};
    use crate::ports::market_data::MockMarketDataPort;
    use crate::ports::{MarketDataError, MarketDataPort};
    use crate::strategy::{AnalyzerConfig, KeywordSentiment, ScoringConfig, ScoringEngine, VolumeAnalyzer};
    use crate::adapters::market_data::RateLimitConfig;

    const POLL: Duration = Duration::from_millis(10);

    fn create_test_manager(market: MockMarketData, config: JobConfig) -> JobManager {
        create_test_manager_with(Arc::new(market), config)
    }

    fn create_test_manager_with(market: Arc<dyn MarketDataPort>, config: JobConfig) -> JobManager {
        let social = SocialAggregator::new(
            Arc::new(MockSocialData::new()),
            Arc::new(KeywordSentiment::new()),
            SocialConfig {
                rate_limit: RateLimitConfig {
                    max_requests: 10_000,
                    window_secs: 60,
                    min_interval_ms: 0,
                },
                ..Default::default()
            },
        );
        let discovery = TokenDiscovery::new(
            market.clone(),
            DiscoveryConfig::default(),
            CircuitBreakerConfig::default(),
        );
        let pipeline = TokenPipeline::new(
            market,
            social,
            VolumeAnalyzer::new(AnalyzerConfig::default()),
            ScoringEngine::new(ScoringConfig::default()),
        );
        JobManager::new(
            discovery,
            pipeline,
            Arc::new(ResultCache::new(Duration::from_secs(300))),
            config,
        )
    }

    fn general(ids: &[&str]) -> MockMarketData {
        MockMarketData::new().with_markets(DiscoveryConfig::default().general_query(), ids)
    }

    #[tokio::test(start_paused = true)]
    async fn test_job_lifecycle() {
        let manager = create_test_manager(general(&["a", "b", "c"]), JobConfig::default());

        let id = manager.start().await;
        let initial = manager.status(id).await.unwrap();
        assert!(matches!(initial.status, JobStatus::Pending | JobStatus::Running));

        let job = manager.wait_for(id, POLL).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.total_tokens, 3);
        assert_eq!(job.processed_tokens, 3);
        assert_eq!(job.results.as_ref().map(Vec::len), Some(3));
        assert!(job.finish_time.is_some());

        let cached = manager.cached_results(id).await.unwrap();
        assert_eq!(cached.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_sorted_by_explosion_score() {
        let manager = create_test_manager(general(&["a", "b", "c", "d", "e"]), JobConfig::default());
        let id = manager.start().await;

        let job = manager.wait_for(id, POLL).await.unwrap();
        let scores: Vec<f64> = job
            .results
            .unwrap_or_default()
            .iter()
            .map(|t| t.explosion_score.unwrap_or(0.0))
            .collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_tokens_are_counted_not_returned() {
        let market = general(&["ok", "broken", "fine"])
            .with_snapshot_error("broken", MarketDataError::Upstream("HTTP 500".into()));
        let manager = create_test_manager(market, JobConfig::default());
        let id = manager.start().await;

        let job = manager.wait_for(id, POLL).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.processed_tokens, 3);
        let ids: Vec<String> = job.results.unwrap_or_default().into_iter().map(|t| t.id).collect();
        assert_eq!(ids.len(), 2);
        assert!(!ids.contains(&"broken".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_discovery_fails_job() {
        let market = MockMarketData::new().with_markets_error(
            DiscoveryConfig::default().general_query(),
            MarketDataError::Upstream("HTTP 503".into()),
        );
        let manager = create_test_manager(market, JobConfig::default());
        let id = manager.start().await;

        let job = manager.wait_for(id, POLL).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.error.unwrap_or_default().contains("General listing unavailable"));
        assert!(job.results.is_none());
        assert!(manager.cached_results(id).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_source_fails_job() {
        let mut market = MockMarketDataPort::new();
        market.expect_trending_ids().returning(|| Ok(Vec::new()));
        market
            .expect_markets()
            .returning(|_| panic!("listing decoder blew up"));
        market.expect_name().return_const("exploding");
        let manager = create_test_manager_with(Arc::new(market), JobConfig::default());

        let id = manager.start().await;
        let job = tokio::time::timeout(Duration::from_secs(3600), manager.wait_for(id, POLL))
            .await
            .expect("job reaches a terminal state")
            .unwrap();

        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.error.unwrap().contains("aborted"));
        assert!(job.finish_time.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_cap() {
        let ids: Vec<String> = (0..10).map(|i| format!("token-{i}")).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let market = general(&id_refs).with_snapshot_delay(Duration::from_millis(50));
        let recorder = market.clone();

        let manager = create_test_manager(market, JobConfig::default());
        let id = manager.start().await;
        let job = manager.wait_for(id, POLL).await.unwrap();

        assert_eq!(job.processed_tokens, 10);
        assert_eq!(recorder.max_concurrent_snapshots(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_job_ids_are_monotonic() {
        let manager = create_test_manager(general(&[]), JobConfig::default());
        let first = manager.start().await;
        let second = manager.start().await;
        assert!(second > first);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retention_evicts_oldest_finished() {
        let config = JobConfig {
            max_retained_jobs: 2,
            ..Default::default()
        };
        let manager = create_test_manager(general(&["a"]), config);

        let mut ids = Vec::new();
        for _ in 0..4 {
            let id = manager.start().await;
            manager.wait_for(id, POLL).await.unwrap();
            ids.push(id);
        }

        assert!(manager.status(ids[0]).await.is_none());
        assert!(manager.status(ids[1]).await.is_none());
        assert!(manager.status(ids[3]).await.is_some());
        assert_eq!(manager.jobs().await.len(), 2);
    }

    #[test]
    fn test_results_key() {
        assert_eq!(results_key(JobId(42)), "scraping_results_42");
    }
}
