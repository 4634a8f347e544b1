//! Token Metrics
//!
//! Value types describing one enriched token: market figures, social signal
//! per platform, classified volume patterns and technical indicators.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Social platforms tracked for every token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitter,
    Telegram,
    Reddit,
}

impl Platform {
    /// All tracked platforms, in display order
    pub const ALL: [Platform; 3] = [Platform::Twitter, Platform::Telegram, Platform::Reddit];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Twitter => "twitter",
            Platform::Telegram => "telegram",
            Platform::Reddit => "reddit",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Activity figures for one platform
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformMetrics {
    /// Number of mentions
    pub mentions: u64,
    /// Sentiment in [-1, 1]
    pub sentiment: f64,
    /// Engagement count (likes, replies, reposts)
    pub engagement: u64,
    /// Whether the token is trending on this platform
    pub trending: bool,
    /// Change in sentiment over the last 24 hours
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment_change_24h: Option<f64>,
    /// Engagement-rate based virality (0-100)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virality_score: Option<f64>,
}

/// Fixed per-platform social metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocialMetrics {
    pub twitter: PlatformMetrics,
    pub telegram: PlatformMetrics,
    pub reddit: PlatformMetrics,
}

impl SocialMetrics {
    pub fn get(&self, platform: Platform) -> &PlatformMetrics {
        match platform {
            Platform::Twitter => &self.twitter,
            Platform::Telegram => &self.telegram,
            Platform::Reddit => &self.reddit,
        }
    }

    pub fn set(&mut self, platform: Platform, metrics: PlatformMetrics) {
        match platform {
            Platform::Twitter => self.twitter = metrics,
            Platform::Telegram => self.telegram = metrics,
            Platform::Reddit => self.reddit = metrics,
        }
    }

    /// Iterate over (platform, metrics) pairs
    pub fn iter(&self) -> impl Iterator<Item = (Platform, &PlatformMetrics)> {
        Platform::ALL.into_iter().map(move |p| (p, self.get(p)))
    }
}

/// Volume/price behaviour classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    /// Volume spike with rising price from oversold levels (buying pressure)
    Accumulation,
    /// Volume spike with falling price from overbought levels (selling pressure)
    Distribution,
    Neutral,
}

/// Per-step figures backing a pattern classification
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternMetrics {
    /// Current volume divided by the trailing moving average
    pub volume_ratio: f64,
    /// Fractional price change from the previous step
    pub price_change: f64,
    pub volume_rsi: f64,
    pub price_rsi: f64,
    pub volume_spike: bool,
    pub price_momentum: bool,
}

/// One classified step of a volume/price series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumePattern {
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
    pub volume: f64,
    pub price: f64,
    pub kind: PatternKind,
    pub metrics: PatternMetrics,
}

/// Technical summaries consumed by the scoring engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TechnicalIndicators {
    pub rsi: f64,
    pub macd_signal: f64,
    pub macd_histogram: f64,
    /// Latest volume relative to the mean volume of the history
    pub volume_profile: f64,
    /// Standard deviation of simple returns
    pub price_volatility: f64,
}

impl Default for TechnicalIndicators {
    fn default() -> Self {
        Self {
            rsi: 50.0,
            macd_signal: 0.0,
            macd_histogram: 0.0,
            volume_profile: 0.0,
            price_volatility: 0.0,
        }
    }
}

/// Fully enriched token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenMetrics {
    pub id: String,
    pub symbol: String,
    pub name: String,
    /// Price in USD
    pub price: f64,
    /// Market capitalization in USD
    pub market_cap: f64,
    /// 24-hour volume in USD
    pub volume_24h: f64,
    /// 24-hour price change percentage
    pub price_change_24h: f64,
    /// 1-hour price change percentage
    pub price_change_1h: f64,
    pub holders: u64,
    /// Share of supply held by the top holders (percentage)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_holders_percentage: Option<f64>,
    pub social_metrics: SocialMetrics,
    pub volume_patterns: Vec<VolumePattern>,
    pub technical_indicators: TechnicalIndicators,
    /// Long-horizon explosion score (0-100)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explosion_score: Option<f64>,
    /// Short-horizon surge score (0-100)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surge_score: Option<f64>,
}

impl TokenMetrics {
    /// Volume to market cap ratio, 0 when market cap is unknown
    pub fn volume_to_market_cap(&self) -> f64 {
        ratio_or_zero(self.volume_24h, self.market_cap)
    }

    /// Set the explosion score, clamped to [0, 100]
    pub fn set_explosion_score(&mut self, score: f64) {
        self.explosion_score = Some(clamp_score(score));
    }

    /// Set the surge score, clamped to [0, 100]
    pub fn set_surge_score(&mut self, score: f64) {
        self.surge_score = Some(clamp_score(score));
    }

    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::from_score(self.explosion_score.unwrap_or(0.0))
    }
}

/// Risk bucket for a 0-100 score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Extreme,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Self::Extreme
        } else if score >= 60.0 {
            Self::High
        } else if score >= 40.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Extreme => "EXTREME",
        }
    }
}

/// Clamp a score into [0, 100], mapping non-finite values to 0
pub fn clamp_score(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Divide, returning 0 for a zero or non-finite result
pub fn ratio_or_zero(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    let ratio = numerator / denominator;
    if ratio.is_finite() {
        ratio
    } else {
        0.0
    }
}
