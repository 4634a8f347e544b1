//! CLI Command Handlers
//!
//! Implementation of all CLI commands for the moonshot scanner.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::task::JoinHandle;

use crate::adapters::cache::ResultCache;
use crate::adapters::market_data::{
    CoinGeckoMarketData, DataSource, FetchClient, RateLimiter, SyntheticMarketData,
};
use crate::adapters::social::SyntheticSocialData;
use crate::application::{JobManager, SocialAggregator, TokenDiscovery, TokenPipeline};
use crate::config::{load_config, Config};
use crate::domain::{JobStatus, ScrapingJob, TokenMetrics};
use crate::ports::{GlobalStats, MarketDataPort, MarketListing, SocialDataPort};
use crate::strategy::{KeywordSentiment, ScoringEngine, SurgeInputs, VolumeAnalyzer};

/// Moonshot Scanner - discovers and ranks early-stage crypto tokens
#[derive(Parser, Debug)]
#[command(
    name = "moonshot-scanner",
    version = env!("CARGO_PKG_VERSION"),
    about = "Discovers and ranks early-stage crypto tokens",
    long_about = "Moonshot Scanner unions trending, newly listed and high-turnover tokens, \
                  enriches them with market history and social activity, and ranks them \
                  by a composite explosion score."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/scanner.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a full discovery and scoring job
    Scan(ScanCmd),

    /// Rank the general listing by short-horizon surge score
    Surge(SurgeCmd),

    /// Show global market statistics
    Global(GlobalCmd),
}

/// Run a scraping job
#[derive(Parser, Debug)]
pub struct ScanCmd {
    /// Number of ranked tokens to print
    #[arg(short, long, value_name = "N", default_value = "20")]
    pub limit: usize,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,

    /// Job status poll interval in milliseconds
    #[arg(long, value_name = "MS", default_value = "500")]
    pub poll_ms: u64,
}

/// Surge ranking
#[derive(Parser, Debug)]
pub struct SurgeCmd {
    /// Minimum surge score to print
    #[arg(short, long, value_name = "SCORE", default_value = "50")]
    pub threshold: f64,

    /// Number of tokens to print
    #[arg(short, long, value_name = "N", default_value = "20")]
    pub limit: usize,
}

/// Global market statistics
#[derive(Parser, Debug)]
pub struct GlobalCmd {
    /// Print statistics as JSON
    #[arg(long)]
    pub json: bool,
}

/// Shared components built from configuration
pub struct ScannerContext {
    pub config: Config,
    pub market: Arc<dyn MarketDataPort>,
    pub social: Arc<dyn SocialDataPort>,
    pub cache: Arc<ResultCache>,
    sweeper: JoinHandle<()>,
}

impl ScannerContext {
    /// Build the market and social sources and start the cache sweeper.
    /// Must be called inside a tokio runtime.
    pub fn from_config(config: Config) -> Result<Self> {
        let cache = Arc::new(ResultCache::from_config(&config.cache));
        let sweeper =
            cache.spawn_sweeper(Duration::from_secs(config.cache.sweep_interval_secs.max(1)));

        let market: Arc<dyn MarketDataPort> = match config.api.data_source {
            DataSource::Live => {
                let limiter = RateLimiter::shared(config.rate_limit.clone());
                let client = FetchClient::new(config.api.client.clone(), limiter, Arc::clone(&cache))
                    .context("Failed to create HTTP client")?;
                Arc::new(CoinGeckoMarketData::new(client))
            }
            DataSource::Synthetic => {
                tracing::warn!(seed = config.api.seed, "SYNTHETIC MARKET DATA - not live prices");
                Arc::new(SyntheticMarketData::new(config.api.seed))
            }
        };
        let social: Arc<dyn SocialDataPort> = Arc::new(SyntheticSocialData::new(config.api.seed));

        tracing::info!(
            market = market.name(),
            social = social.name(),
            "Data sources ready"
        );

        Ok(Self {
            config,
            market,
            social,
            cache,
            sweeper,
        })
    }

    pub fn discovery(&self) -> TokenDiscovery {
        TokenDiscovery::new(
            Arc::clone(&self.market),
            self.config.discovery.clone(),
            self.config.circuit_breaker.clone(),
        )
    }

    pub fn pipeline(&self) -> TokenPipeline {
        let social = SocialAggregator::new(
            Arc::clone(&self.social),
            Arc::new(KeywordSentiment::new()),
            self.config.social.clone(),
        );
        TokenPipeline::new(
            Arc::clone(&self.market),
            social,
            VolumeAnalyzer::new(self.config.analysis.clone()),
            ScoringEngine::new(self.config.scoring.clone()),
        )
    }

    pub fn job_manager(&self) -> JobManager {
        JobManager::new(
            self.discovery(),
            self.pipeline(),
            Arc::clone(&self.cache),
            self.config.jobs.clone(),
        )
    }
}

impl Drop for ScannerContext {
    fn drop(&mut self) {
        self.sweeper.abort();
    }
}

/// Load the configuration named on the command line
pub fn load_app_config(path: &Path) -> Result<Config> {
    load_config(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

/// Execute a parsed command
pub async fn execute(command: Command, config: Config) -> Result<()> {
    let context = ScannerContext::from_config(config)?;

    match command {
        Command::Scan(cmd) => scan_command(&context, cmd).await,
        Command::Surge(cmd) => surge_command(&context, cmd).await,
        Command::Global(cmd) => global_command(&context, cmd).await,
    }
}

async fn scan_command(context: &ScannerContext, cmd: ScanCmd) -> Result<()> {
    let manager = context.job_manager();
    let id = manager.start().await;

    let job = manager
        .wait_for(id, Duration::from_millis(cmd.poll_ms.max(10)))
        .await
        .with_context(|| format!("Job {id} was evicted before it finished"))?;

    if job.status == JobStatus::Failed {
        anyhow::bail!(
            "Job {} failed: {}",
            id,
            job.error.as_deref().unwrap_or("unknown error")
        );
    }

    let results = job.results.clone().unwrap_or_default();
    if cmd.json {
        let top: Vec<&TokenMetrics> = results.iter().take(cmd.limit).collect();
        println!("{}", serde_json::to_string_pretty(&top)?);
        return Ok(());
    }

    print_job_summary(&job);
    print_ranking(&results, cmd.limit);
    Ok(())
}

fn print_job_summary(job: &ScrapingJob) {
    let elapsed = job
        .finish_time
        .map(|finish| (finish - job.start_time).num_milliseconds() as f64 / 1000.0)
        .unwrap_or_default();

    println!("Job {} {}", job.id, job.status.as_str());
    println!(
        "  Tokens: {} discovered, {} processed, {} scored",
        job.total_tokens,
        job.processed_tokens,
        job.results.as_ref().map(Vec::len).unwrap_or_default()
    );
    println!("  Elapsed: {:.1}s", elapsed);
    println!();
}

fn print_ranking(results: &[TokenMetrics], limit: usize) {
    if results.is_empty() {
        println!("No tokens scored");
        return;
    }

    println!(
        "{:>3}  {:<10} {:<24} {:>14} {:>14} {:>9} {:>7} {:>7}  {}",
        "#", "SYMBOL", "NAME", "MARKET CAP", "VOLUME 24H", "24H %", "SCORE", "SURGE", "RISK"
    );
    for (rank, token) in results.iter().take(limit).enumerate() {
        println!(
            "{:>3}  {:<10} {:<24} {:>14} {:>14} {:>+8.2}% {:>7.1} {:>7.1}  {}",
            rank + 1,
            truncate(&token.symbol.to_uppercase(), 10),
            truncate(&token.name, 24),
            format_usd(token.market_cap),
            format_usd(token.volume_24h),
            token.price_change_24h,
            token.explosion_score.unwrap_or_default(),
            token.surge_score.unwrap_or_default(),
            token.risk_level().as_str()
        );
    }
}

async fn surge_command(context: &ScannerContext, cmd: SurgeCmd) -> Result<()> {
    let listing = context
        .discovery()
        .general_listing()
        .await
        .context("Failed to fetch general listing")?;
    let scoring = ScoringEngine::new(context.config.scoring.clone());

    let mut ranked = surge_ranking(&scoring, listing, cmd.threshold);
    ranked.truncate(cmd.limit);

    if ranked.is_empty() {
        println!("No tokens above surge score {:.1}", cmd.threshold);
        return Ok(());
    }

    println!(
        "{:<10} {:<24} {:>14} {:>9} {:>9} {:>7}",
        "SYMBOL", "NAME", "MARKET CAP", "1H %", "24H %", "SURGE"
    );
    for (row, score) in &ranked {
        println!(
            "{:<10} {:<24} {:>14} {:>+8.2}% {:>+8.2}% {:>7.1}",
            truncate(&row.symbol.to_uppercase(), 10),
            truncate(&row.name, 24),
            format_usd(row.market_cap),
            row.price_change_1h,
            row.price_change_24h,
            score
        );
    }
    Ok(())
}

/// Listings scoring above `threshold`, best first
pub fn surge_ranking(
    scoring: &ScoringEngine,
    listing: Vec<MarketListing>,
    threshold: f64,
) -> Vec<(MarketListing, f64)> {
    let mut ranked: Vec<(MarketListing, f64)> = listing
        .into_iter()
        .map(|row| {
            let score = scoring.surge_score(SurgeInputs {
                market_cap: row.market_cap,
                volume_24h: row.volume_24h,
                price_change_1h: row.price_change_1h,
                price_change_24h: row.price_change_24h,
            });
            (row, score)
        })
        .filter(|(_, score)| *score > threshold)
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
}

async fn global_command(context: &ScannerContext, cmd: GlobalCmd) -> Result<()> {
    let stats = context
        .market
        .global_stats()
        .await
        .context("Failed to fetch global statistics")?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    print_global(&stats);
    Ok(())
}

fn print_global(stats: &GlobalStats) {
    println!("Global Market");
    println!("  Active cryptocurrencies: {}", stats.active_cryptocurrencies);
    println!("  Markets: {}", stats.markets);
    println!("  Total market cap: {}", format_usd(stats.total_market_cap_usd));
    println!("  24h volume: {}", format_usd(stats.total_volume_usd));
    println!("  Market cap change 24h: {:+.2}%", stats.market_cap_change_24h);
    println!("  BTC dominance: {:.1}%", stats.btc_dominance);
    println!("  ETH dominance: {:.1}%", stats.eth_dominance);
}

/// Compact dollar amount: $1.23B, $4.56M, $7.89K
pub fn format_usd(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1e12 {
        format!("${:.2}T", value / 1e12)
    } else if abs >= 1e9 {
        format!("${:.2}B", value / 1e9)
    } else if abs >= 1e6 {
        format!("${:.2}M", value / 1e6)
    } else if abs >= 1e3 {
        format!("${:.2}K", value / 1e3)
    } else {
        format!("${:.2}", value)
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
        out.push('~');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::mocks::listing;
    use crate::strategy::ScoringConfig;

    #[test]
    fn test_parse_scan_with_global_flags() {
        let app = CliApp::try_parse_from([
            "moonshot-scanner",
            "scan",
            "--json",
            "--limit",
            "5",
            "--config",
            "custom.toml",
            "-v",
        ])
        .unwrap();

        assert!(app.verbose);
        assert!(!app.debug);
        assert_eq!(app.config, PathBuf::from("custom.toml"));
        match app.command {
            Command::Scan(cmd) => {
                assert!(cmd.json);
                assert_eq!(cmd.limit, 5);
            }
            other => panic!("expected scan, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_surge_defaults() {
        let app = CliApp::try_parse_from(["moonshot-scanner", "surge"]).unwrap();
        assert_eq!(app.config, PathBuf::from("config/scanner.toml"));
        match app.command {
            Command::Surge(cmd) => {
                assert_eq!(cmd.threshold, 50.0);
                assert_eq!(cmd.limit, 20);
            }
            other => panic!("expected surge, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert!(CliApp::try_parse_from(["moonshot-scanner", "trade"]).is_err());
    }

    #[test]
    fn test_surge_ranking_filters_and_sorts() {
        let scoring = ScoringEngine::new(ScoringConfig::default());
        let hot = MarketListing {
            price_change_1h: 10.0,
            price_change_24h: 30.0,
            ..listing("hot", 5_000_000.0, 2_000_000.0)
        };
        let warm = MarketListing {
            price_change_1h: 2.0,
            ..listing("warm", 5_000_000.0, 2_000_000.0)
        };
        let cold = listing("cold", 900_000_000.0, 1_000.0);

        let ranked = surge_ranking(&scoring, vec![warm, cold, hot], 50.0);
        let ids: Vec<&str> = ranked.iter().map(|(row, _)| row.id.as_str()).collect();
        assert_eq!(ids, vec!["hot", "warm"]);
        assert!(ranked[0].1 >= ranked[1].1);
    }

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(1_234_000_000.0), "$1.23B");
        assert_eq!(format_usd(45_600_000.0), "$45.60M");
        assert_eq!(format_usd(7_890.0), "$7.89K");
        assert_eq!(format_usd(12.5), "$12.50");
    }

    #[test]
    fn test_truncate_long_names() {
        assert_eq!(truncate("pepe", 10), "pepe");
        assert_eq!(truncate("averyveryverylongname", 8), "averyve~");
    }

    #[tokio::test]
    async fn test_context_builds_synthetic_sources() {
        let mut config = Config::default();
        config.api.data_source = DataSource::Synthetic;

        let context = ScannerContext::from_config(config).unwrap();
        assert_eq!(context.market.name(), "synthetic");
        assert!(context.market.global_stats().await.is_ok());
    }
}
