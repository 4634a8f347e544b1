//! Configuration Loader
//!
//! Loads and validates the scanner configuration from a TOML file. Every
//! section is optional and falls back to its defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::adapters::cache::CacheConfig;
use crate::adapters::market_data::{ApiConfig, DataSource, RateLimitConfig};
use crate::application::{DiscoveryConfig, JobConfig, SocialConfig};
use crate::domain::CircuitBreakerConfig;
use crate::strategy::{AnalyzerConfig, ScoringConfig};

/// Environment variable overriding `[api] api_key`
pub const API_KEY_ENV: &str = "COINGECKO_API_KEY";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiSection,
    pub rate_limit: RateLimitConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub discovery: DiscoveryConfig,
    pub analysis: AnalyzerConfig,
    pub social: SocialConfig,
    pub scoring: ScoringConfig,
    pub jobs: JobConfig,
    pub cache: CacheConfig,
    pub logging: LoggingSection,
}

/// Upstream API section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    #[serde(flatten)]
    pub client: ApiConfig,
    /// "live" or "synthetic"
    pub data_source: DataSource,
    /// Seed for the synthetic sources
    pub seed: u64,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            client: ApiConfig::default(),
            data_source: DataSource::Live,
            seed: 42,
        }
    }
}

impl ApiSection {
    /// API key with environment variable override
    /// Checks COINGECKO_API_KEY first, falls back to the config value
    pub fn api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.is_empty())
            .or_else(|| self.client.api_key.clone().filter(|key| !key.is_empty()))
    }
}

/// Logging configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file (`~` is expanded)
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let raw = path.as_ref().to_string_lossy();
    let expanded = shellexpand::tilde(&raw).to_string();
    let content = std::fs::read_to_string(expanded)?;
    let mut config: Config = toml::from_str(&content)?;
    config.api.client.api_key = config.api.api_key();
    config.validate()?;
    Ok(config)
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(message.into())
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.data_source == DataSource::Live && self.api.client.base_url.is_empty() {
            return Err(invalid("api.base_url cannot be empty"));
        }

        if self.api.client.timeout_secs == 0 {
            return Err(invalid("api.timeout_secs must be > 0"));
        }

        if self.api.client.base_delay_ms > self.api.client.max_delay_ms {
            return Err(invalid(format!(
                "api.base_delay_ms ({}) exceeds api.max_delay_ms ({})",
                self.api.client.base_delay_ms, self.api.client.max_delay_ms
            )));
        }

        for (name, limit) in [("rate_limit", &self.rate_limit), ("social.rate_limit", &self.social.rate_limit)] {
            if limit.max_requests == 0 || limit.window_secs == 0 {
                return Err(invalid(format!(
                    "{name}: max_requests and window_secs must be > 0"
                )));
            }
        }

        if self.circuit_breaker.failure_threshold == 0 {
            return Err(invalid("circuit_breaker.failure_threshold must be > 0"));
        }

        if self.discovery.general_per_page == 0 {
            return Err(invalid("discovery.general_per_page must be > 0"));
        }

        if self.discovery.volume_to_mcap_threshold < 0.0 {
            return Err(invalid(format!(
                "discovery.volume_to_mcap_threshold must be >= 0, got {}",
                self.discovery.volume_to_mcap_threshold
            )));
        }

        self.analysis
            .validate()
            .map_err(|e| invalid(format!("analysis: {e}")))?;

        self.scoring
            .validate()
            .map_err(|e| invalid(format!("scoring: {e}")))?;

        if self.social.viral_rate <= 0.0 {
            return Err(invalid(format!(
                "social.viral_rate must be > 0, got {}",
                self.social.viral_rate
            )));
        }

        if self.jobs.max_concurrency == 0 {
            return Err(invalid("jobs.max_concurrency must be > 0"));
        }

        if !(0.0..=100.0).contains(&self.jobs.high_potential_threshold) {
            return Err(invalid(format!(
                "jobs.high_potential_threshold must be 0-100, got {}",
                self.jobs.high_potential_threshold
            )));
        }

        if self.cache.default_ttl_secs == 0 {
            return Err(invalid("cache.default_ttl_secs must be > 0"));
        }

        Ok(())
    }
}
