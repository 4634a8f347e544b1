//! Scoring Engine
//!
//! Two independent composite scores in [0, 100]:
//!
//! - **Explosion** (long horizon): weighted blend of viral potential, price
//!   action, volume profile, market structure and social momentum.
//! - **Surge** (short horizon): volume spike (max 45) + 1h/24h momentum (max 35)
//!   + market-cap band bonus (max 20), all tunable through `SurgeConfig`.
//!
//! Every ratio with a zero denominator counts as 0 and every non-finite
//! intermediate is replaced by 0 before clamping.

use serde::{Deserialize, Serialize};

use crate::domain::{
    clamp_score, ratio_or_zero, PatternKind, PlatformMetrics, TokenMetrics, VolumePattern,
};

/// Sub-score weights of the explosion score
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplosionWeights {
    pub viral: f64,
    pub price: f64,
    pub volume: f64,
    pub structure: f64,
    pub social: f64,
}

impl Default for ExplosionWeights {
    fn default() -> Self {
        Self {
            viral: 0.30,
            price: 0.25,
            volume: 0.20,
            structure: 0.15,
            social: 0.10,
        }
    }
}

impl ExplosionWeights {
    pub fn sum(&self) -> f64 {
        self.viral + self.price + self.volume + self.structure + self.social
    }
}

/// Blend of the market structure sub-score
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureWeights {
    pub distribution: f64,
    pub holders: f64,
    pub headroom: f64,
}

impl Default for StructureWeights {
    fn default() -> Self {
        Self {
            distribution: 0.4,
            holders: 0.3,
            headroom: 0.3,
        }
    }
}

/// Per-platform blend of the social momentum sub-score
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialWeights {
    pub mentions: f64,
    pub sentiment: f64,
    pub trending: f64,
}

impl Default for SocialWeights {
    fn default() -> Self {
        Self {
            mentions: 0.4,
            sentiment: 0.3,
            trending: 0.3,
        }
    }
}

/// Surge bonus for market caps strictly below `below`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketCapBand {
    pub below: f64,
    pub bonus: f64,
}

/// Surge score constants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SurgeConfig {
    /// Volume / market cap ratio worth `volume_points` (default: 0.1)
    pub volume_ratio_unit: f64,
    /// Points per `volume_ratio_unit` of turnover (default: 15)
    pub volume_points: f64,
    /// Cap of the volume component (default: 45)
    pub volume_cap: f64,
    /// Points per percent of 1h change (default: 2.0)
    pub momentum_1h_weight: f64,
    /// Points per percent of 24h change (default: 0.5)
    pub momentum_24h_weight: f64,
    /// Cap of the momentum component (default: 35)
    pub momentum_cap: f64,
    /// Ascending by `below`; the first matching band applies
    pub market_cap_bands: Vec<MarketCapBand>,
}

impl Default for SurgeConfig {
    fn default() -> Self {
        let band = |below: f64, bonus: f64| MarketCapBand { below, bonus };
        Self {
            volume_ratio_unit: 0.1,
            volume_points: 15.0,
            volume_cap: 45.0,
            momentum_1h_weight: 2.0,
            momentum_24h_weight: 0.5,
            momentum_cap: 35.0,
            market_cap_bands: vec![
                band(10_000_000.0, 20.0),
                band(50_000_000.0, 15.0),
                band(100_000_000.0, 10.0),
                band(500_000_000.0, 5.0),
            ],
        }
    }
}

impl SurgeConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.volume_ratio_unit <= 0.0 {
            return Err("surge.volume_ratio_unit must be > 0".to_string());
        }
        let non_negative = [
            self.volume_points,
            self.volume_cap,
            self.momentum_1h_weight,
            self.momentum_24h_weight,
            self.momentum_cap,
        ];
        if non_negative.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err("surge weights and caps must be finite and >= 0".to_string());
        }
        if self
            .market_cap_bands
            .windows(2)
            .any(|pair| pair[0].below >= pair[1].below)
        {
            return Err("surge.market_cap_bands must be ascending by `below`".to_string());
        }
        if self
            .market_cap_bands
            .iter()
            .any(|b| b.below <= 0.0 || !(0.0..=100.0).contains(&b.bonus))
        {
            return Err("surge.market_cap_bands need below > 0 and bonus in 0-100".to_string());
        }
        Ok(())
    }

    /// Bonus of the first band above `market_cap`, 0 for unknown caps
    pub fn market_cap_band(&self, market_cap: f64) -> f64 {
        if market_cap <= 0.0 {
            return 0.0;
        }
        self.market_cap_bands
            .iter()
            .find(|band| market_cap < band.below)
            .map(|band| band.bonus)
            .unwrap_or(0.0)
    }
}

/// Scoring thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: ExplosionWeights,
    /// Market cap below which a token counts as small (default: $50M)
    pub small_cap_threshold: f64,
    /// Flat viral bonus for small caps (default: 30)
    pub small_cap_bonus: f64,
    /// 24h change (%) that earns full price momentum (default: 20)
    pub price_momentum_threshold: f64,
    /// RSI earning the full technical RSI component (default: 70)
    pub rsi_overbought: f64,
    /// Volume ratio earning the full per-pattern volume score (default: 3.0)
    pub volume_multiplier: f64,
    /// Number of most recent patterns considered (default: 24)
    pub pattern_lookback: usize,
    /// Mentions (and engagement) that count as viral on one platform (default: 5000)
    pub viral_mentions: f64,
    /// Holder count earning the full holder component (default: 10000)
    pub full_holder_count: f64,
    pub structure: StructureWeights,
    pub social: SocialWeights,
    pub surge: SurgeConfig,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ExplosionWeights::default(),
            small_cap_threshold: 50_000_000.0,
            small_cap_bonus: 30.0,
            price_momentum_threshold: 20.0,
            rsi_overbought: 70.0,
            volume_multiplier: 3.0,
            pattern_lookback: 24,
            viral_mentions: 5_000.0,
            full_holder_count: 10_000.0,
            structure: StructureWeights::default(),
            social: SocialWeights::default(),
            surge: SurgeConfig::default(),
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<(), String> {
        if (self.weights.sum() - 1.0).abs() > 1e-6 {
            return Err(format!(
                "explosion weights must sum to 1.0 (got {:.4})",
                self.weights.sum()
            ));
        }
        if self.small_cap_threshold <= 0.0 {
            return Err("small_cap_threshold must be > 0".to_string());
        }
        if self.price_momentum_threshold <= 0.0 {
            return Err("price_momentum_threshold must be > 0".to_string());
        }
        if self.rsi_overbought <= 0.0 || self.rsi_overbought > 100.0 {
            return Err("rsi_overbought must be in (0, 100]".to_string());
        }
        if self.viral_mentions <= 0.0 {
            return Err("viral_mentions must be > 0".to_string());
        }
        if self.pattern_lookback == 0 {
            return Err("pattern_lookback must be > 0".to_string());
        }
        if self.full_holder_count <= 0.0 {
            return Err("full_holder_count must be > 0".to_string());
        }
        let structure = &self.structure;
        if (structure.distribution + structure.holders + structure.headroom - 1.0).abs() > 1e-6 {
            return Err("structure weights must sum to 1.0".to_string());
        }
        let social = &self.social;
        if (social.mentions + social.sentiment + social.trending - 1.0).abs() > 1e-6 {
            return Err("social weights must sum to 1.0".to_string());
        }
        self.surge.validate()
    }
}

/// Sub-scores behind one explosion score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExplosionBreakdown {
    pub viral: f64,
    pub price: f64,
    pub volume: f64,
    pub structure: f64,
    pub social: f64,
    pub total: f64,
}

/// Market figures the surge score reads
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurgeInputs {
    pub market_cap: f64,
    pub volume_24h: f64,
    pub price_change_1h: f64,
    pub price_change_24h: f64,
}

impl From<&TokenMetrics> for SurgeInputs {
    fn from(token: &TokenMetrics) -> Self {
        Self {
            market_cap: token.market_cap,
            volume_24h: token.volume_24h,
            price_change_1h: token.price_change_1h,
            price_change_24h: token.price_change_24h,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    config: ScoringConfig,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Set both scores on the token.
    ///
    /// Returns `false` when a score degenerated and was replaced by 0.
    pub fn score_token(&self, token: &mut TokenMetrics) -> bool {
        let explosion = self.explosion_breakdown(token).total;
        let surge = self.surge_score(SurgeInputs::from(&*token));
        let healthy = explosion.is_finite() && surge.is_finite();
        if !healthy {
            tracing::warn!(
                token_id = %token.id,
                explosion,
                surge,
                "Degenerate score, defaulting to 0"
            );
        }
        token.set_explosion_score(explosion);
        token.set_surge_score(surge);
        healthy
    }

    pub fn explosion_score(&self, token: &TokenMetrics) -> f64 {
        clamp_score(self.explosion_breakdown(token).total)
    }

    pub fn explosion_breakdown(&self, token: &TokenMetrics) -> ExplosionBreakdown {
        let w = &self.config.weights;
        let viral = sub_score(self.viral_potential(token));
        let price = sub_score(self.price_action(token));
        let volume = sub_score(self.volume_profile(&token.volume_patterns));
        let structure = sub_score(self.market_structure(token));
        let social = sub_score(self.social_momentum(token));

        let total = (viral * w.viral
            + price * w.price
            + volume * w.volume
            + structure * w.structure
            + social * w.social)
            .round();

        ExplosionBreakdown {
            viral,
            price,
            volume,
            structure,
            social,
            total,
        }
    }

    /// Short-horizon surge score
    pub fn surge_score(&self, inputs: SurgeInputs) -> f64 {
        let surge = &self.config.surge;
        let volume_ratio = ratio_or_zero(inputs.volume_24h, inputs.market_cap);
        let volume = (volume_ratio / surge.volume_ratio_unit * surge.volume_points)
            .min(surge.volume_cap);

        let momentum = (surge.momentum_1h_weight * inputs.price_change_1h.abs()
            + surge.momentum_24h_weight * inputs.price_change_24h.abs())
        .min(surge.momentum_cap);

        let band = surge.market_cap_band(inputs.market_cap);

        clamp_score(finite(volume) + finite(momentum) + band)
    }

    fn viral_potential(&self, token: &TokenMetrics) -> f64 {
        let small_cap_bonus = if token.market_cap > 0.0
            && token.market_cap < self.config.small_cap_threshold
        {
            self.config.small_cap_bonus
        } else {
            0.0
        };
        let turnover = (token.volume_to_market_cap() * 100.0).min(100.0);
        let engagement = mean(
            token
                .social_metrics
                .iter()
                .map(|(_, m)| self.engagement_score(m)),
        );

        small_cap_bonus + 0.4 * turnover + 0.3 * engagement
    }

    fn engagement_score(&self, metrics: &PlatformMetrics) -> f64 {
        (metrics.engagement as f64 / self.config.viral_mentions * 100.0).min(100.0)
    }

    fn price_action(&self, token: &TokenMetrics) -> f64 {
        let change = token.price_change_24h;
        let momentum = if change > self.config.price_momentum_threshold {
            100.0
        } else if change > 0.0 {
            change / self.config.price_momentum_threshold * 100.0
        } else {
            0.0
        };

        let ti = &token.technical_indicators;
        let rsi = if ti.rsi > self.config.rsi_overbought {
            100.0
        } else {
            ti.rsi.max(0.0) / (self.config.rsi_overbought / 100.0)
        };
        let macd = if ti.macd_histogram > 0.0 { 100.0 } else { 0.0 };
        let volatility = if ti.price_volatility > 0.0 { 100.0 } else { 0.0 };
        let technical = 0.4 * rsi + 0.3 * macd + 0.3 * volatility;

        0.6 * momentum + 0.4 * technical
    }

    fn volume_profile(&self, patterns: &[VolumePattern]) -> f64 {
        if patterns.is_empty() {
            return 0.0;
        }
        let start = patterns.len().saturating_sub(self.config.pattern_lookback);
        let recent = &patterns[start..];

        let accumulating = recent
            .iter()
            .filter(|p| p.kind == PatternKind::Accumulation && p.metrics.volume_spike)
            .count();
        let accumulation_share = accumulating as f64 / recent.len() as f64 * 100.0;

        let ratio_score = mean(recent.iter().map(|p| {
            if p.metrics.volume_ratio > self.config.volume_multiplier {
                100.0
            } else if p.metrics.volume_ratio > 1.0 {
                50.0
            } else {
                0.0
            }
        }));

        0.6 * accumulation_share + 0.4 * ratio_score
    }

    fn market_structure(&self, token: &TokenMetrics) -> f64 {
        let concentration = token.top_holders_percentage.unwrap_or(0.0);
        let distribution = (100.0 - concentration).max(0.0);
        let holders = (token.holders as f64 / self.config.full_holder_count * 100.0).min(100.0);
        let headroom = if token.market_cap < self.config.small_cap_threshold {
            100.0
        } else {
            (100.0 - token.market_cap / self.config.small_cap_threshold * 100.0).max(0.0)
        };

        let w = &self.config.structure;
        w.distribution * distribution + w.holders * holders + w.headroom * headroom
    }

    fn social_momentum(&self, token: &TokenMetrics) -> f64 {
        let w = &self.config.social;
        mean(token.social_metrics.iter().map(|(_, m)| {
            let mentions = (m.mentions as f64 / self.config.viral_mentions * 100.0).min(100.0);
            let sentiment = (m.sentiment.clamp(-1.0, 1.0) + 1.0) / 2.0 * 100.0;
            let trending = if m.trending { 100.0 } else { 0.0 };
            w.mentions * mentions + w.sentiment * sentiment + w.trending * trending
        }))
    }
}

fn sub_score(value: f64) -> f64 {
    clamp_score(value)
}

fn finite(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + finite(v), c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PatternMetrics, SocialMetrics, TechnicalIndicators};

    fn create_test_token(market_cap: f64, volume: f64, change_24h: f64, change_1h: f64) -> TokenMetrics {
        TokenMetrics {
            id: "test".to_string(),
            symbol: "TST".to_string(),
            name: "Test".to_string(),
            price: 1.0,
            market_cap,
            volume_24h: volume,
            price_change_24h: change_24h,
            price_change_1h: change_1h,
            holders: 0,
            top_holders_percentage: None,
            social_metrics: SocialMetrics::default(),
            volume_patterns: Vec::new(),
            technical_indicators: TechnicalIndicators::default(),
            explosion_score: None,
            surge_score: None,
        }
    }

    fn create_test_pattern(kind: PatternKind, volume_ratio: f64) -> VolumePattern {
        VolumePattern {
            timestamp: 0,
            volume: 1.0,
            price: 1.0,
            kind,
            metrics: PatternMetrics {
                volume_ratio,
                price_change: 0.0,
                volume_rsi: 50.0,
                price_rsi: 50.0,
                volume_spike: volume_ratio > 2.0,
                price_momentum: false,
            },
        }
    }

    #[test]
    fn test_small_cap_outscores_large_cap() {
        let engine = ScoringEngine::default();
        let small = create_test_token(10_000_000.0, 5_000_000.0, 15.0, 3.0);
        let large = create_test_token(2_000_000_000.0, 1_000_000.0, 0.0, 0.0);

        assert!(engine.explosion_score(&small) > engine.explosion_score(&large));
        assert!(
            engine.surge_score(SurgeInputs::from(&small))
                > engine.surge_score(SurgeInputs::from(&large))
        );
    }

    #[test]
    fn test_explosion_breakdown_values() {
        let engine = ScoringEngine::default();
        let token = create_test_token(10_000_000.0, 5_000_000.0, 15.0, 3.0);
        let b = engine.explosion_breakdown(&token);

        // 30 bonus + 0.4 * 50 turnover
        assert!((b.viral - 50.0).abs() < 1e-9);
        assert_eq!(b.volume, 0.0);
        // 0.4 * 100 distribution + 0.3 * 100 headroom
        assert!((b.structure - 70.0).abs() < 1e-9);
        // neutral sentiment only
        assert!((b.social - 15.0).abs() < 1e-9);
        assert_eq!(b.total, 41.0);
    }

    #[test]
    fn test_surge_components() {
        let engine = ScoringEngine::default();
        let inputs = SurgeInputs {
            market_cap: 10_000_000.0,
            volume_24h: 5_000_000.0,
            price_change_1h: 3.0,
            price_change_24h: 15.0,
        };
        // 45 (capped volume) + 13.5 momentum + 15 band
        assert!((engine.surge_score(inputs) - 73.5).abs() < 1e-9);
    }

    #[test]
    fn test_zero_market_cap_is_safe() {
        let engine = ScoringEngine::default();
        let mut token = create_test_token(0.0, 1_000_000.0, 5.0, 1.0);

        assert!(engine.score_token(&mut token));
        let explosion = token.explosion_score.unwrap();
        let surge = token.surge_score.unwrap();
        assert!(explosion.is_finite() && (0.0..=100.0).contains(&explosion));
        assert!(surge.is_finite() && (0.0..=100.0).contains(&surge));
    }

    #[test]
    fn test_scores_bounded_for_extreme_inputs() {
        let engine = ScoringEngine::default();
        let mut token = create_test_token(1.0, 1e15, 1e6, -1e6);
        token.holders = u64::MAX;
        token.top_holders_percentage = Some(250.0);
        token.technical_indicators.rsi = 99.0;
        token.technical_indicators.macd_histogram = 1.0;
        token.technical_indicators.price_volatility = 3.0;
        for platform in crate::domain::Platform::ALL {
            token.social_metrics.set(
                platform,
                PlatformMetrics {
                    mentions: u64::MAX,
                    sentiment: 5.0,
                    engagement: u64::MAX,
                    trending: true,
                    ..Default::default()
                },
            );
        }
        token.volume_patterns = (0..40)
            .map(|_| create_test_pattern(PatternKind::Accumulation, 10.0))
            .collect();

        let b = engine.explosion_breakdown(&token);
        for sub in [b.viral, b.price, b.volume, b.structure, b.social] {
            assert!((0.0..=100.0).contains(&sub));
        }
        assert!(engine.explosion_score(&token) <= 100.0);
        assert!(engine.surge_score(SurgeInputs::from(&token)) <= 100.0);
    }

    #[test]
    fn test_volume_profile_uses_recent_patterns() {
        let engine = ScoringEngine::default();
        let mut patterns: Vec<VolumePattern> = (0..24)
            .map(|_| create_test_pattern(PatternKind::Neutral, 0.5))
            .collect();
        patterns.extend((0..24).map(|_| create_test_pattern(PatternKind::Accumulation, 4.0)));

        assert!((engine.volume_profile(&patterns) - 100.0).abs() < 1e-9);
        assert_eq!(engine.volume_profile(&[]), 0.0);
    }

    #[test]
    fn test_volume_ratio_tiers() {
        let engine = ScoringEngine::default();
        let patterns = vec![
            create_test_pattern(PatternKind::Neutral, 1.5),
            create_test_pattern(PatternKind::Neutral, 0.5),
        ];
        // no accumulation, mean(50, 0) = 25
        assert!((engine.volume_profile(&patterns) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_market_cap_bands() {
        let surge = SurgeConfig::default();
        assert_eq!(surge.market_cap_band(5_000_000.0), 20.0);
        assert_eq!(surge.market_cap_band(10_000_000.0), 15.0);
        assert_eq!(surge.market_cap_band(75_000_000.0), 10.0);
        assert_eq!(surge.market_cap_band(400_000_000.0), 5.0);
        assert_eq!(surge.market_cap_band(1e12), 0.0);
        assert_eq!(surge.market_cap_band(0.0), 0.0);
    }

    #[test]
    fn test_custom_surge_config() {
        let mut config = ScoringConfig::default();
        config.surge = SurgeConfig {
            volume_ratio_unit: 1.0,
            volume_points: 10.0,
            volume_cap: 30.0,
            momentum_1h_weight: 1.0,
            momentum_24h_weight: 0.0,
            momentum_cap: 20.0,
            market_cap_bands: vec![MarketCapBand {
                below: 1_000_000_000.0,
                bonus: 50.0,
            }],
        };
        assert!(config.validate().is_ok());
        let engine = ScoringEngine::new(config);

        let inputs = SurgeInputs {
            market_cap: 400_000_000.0,
            volume_24h: 200_000_000.0,
            price_change_1h: 4.0,
            price_change_24h: 90.0,
        };
        // 0.5 ratio * 10 + 4 * 1.0 + 50 band
        assert!((engine.surge_score(inputs) - 59.0).abs() < 1e-9);

        let above = SurgeInputs {
            market_cap: 2_000_000_000.0,
            ..inputs
        };
        // band table exhausted
        assert!((engine.surge_score(above) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_surge_config_validation() {
        let mut surge = SurgeConfig::default();
        surge.market_cap_bands.swap(0, 1);
        assert!(surge.validate().is_err());

        let mut surge = SurgeConfig::default();
        surge.volume_ratio_unit = 0.0;
        assert!(surge.validate().is_err());

        let mut config = ScoringConfig::default();
        config.structure.holders = 0.9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_holder_component_uses_full_holder_count() {
        let mut config = ScoringConfig::default();
        config.full_holder_count = 100.0;
        let engine = ScoringEngine::new(config);
        let mut token = create_test_token(10_000_000.0, 0.0, 0.0, 0.0);
        token.holders = 100;

        // 0.4 * 100 distribution + 0.3 * 100 holders + 0.3 * 100 headroom
        assert!((engine.market_structure(&token) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_config_validation() {
        assert!(ScoringConfig::default().validate().is_ok());

        let mut config = ScoringConfig::default();
        config.weights.viral = 0.9;
        assert!(config.validate().is_err());
    }
}
