//! Volume Pattern Analyzer
//!
//! Classifies each step of a volume/price series as accumulation,
//! distribution or neutral.
//!
//! Per index `i` (from `window` to the end of the series):
//! - volume ratio: `v[i]` over the trailing mean of the `window` preceding volumes
//! - price change: `(p[i] - p[i-1]) / p[i-1]`
//! - volume RSI / price RSI over the `rsi_period` deltas ending at `i`
//!
//! Accumulation: volume spike + price momentum + rising price, with volume RSI
//! overbought and price RSI oversold. Distribution: the same spike and momentum
//! with a falling price and both RSIs overbought.
//!
//! The analyzer is a pure function: no I/O, no hidden state.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{ratio_or_zero, PatternKind, PatternMetrics, VolumePattern};

/// RSI reported where fewer than `period` deltas are available
pub const NEUTRAL_RSI: f64 = 50.0;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Series length mismatch: volumes={volumes}, prices={prices}, timestamps={timestamps}")]
    LengthMismatch {
        volumes: usize,
        prices: usize,
        timestamps: usize,
    },
    #[error("Invalid analyzer configuration: {0}")]
    InvalidConfig(String),
}

/// Analyzer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Moving-average window and warm-up offset (default: 24)
    pub window: usize,
    /// RSI lookback period (default: 14)
    pub rsi_period: usize,
    /// Volume ratio above which a step is a spike (default: 2.0)
    pub volume_spike_multiplier: f64,
    /// Absolute fractional price change counted as momentum (default: 0.05)
    pub price_momentum_threshold: f64,
    /// RSI above this is overbought (default: 70)
    pub rsi_overbought: f64,
    /// RSI below this is oversold (default: 30)
    pub rsi_oversold: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            window: 24,
            rsi_period: 14,
            volume_spike_multiplier: 2.0,
            price_momentum_threshold: 0.05,
            rsi_overbought: 70.0,
            rsi_oversold: 30.0,
        }
    }
}

impl AnalyzerConfig {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.window == 0 {
            return Err(AnalysisError::InvalidConfig("window must be > 0".into()));
        }
        if self.rsi_period == 0 {
            return Err(AnalysisError::InvalidConfig("rsi_period must be > 0".into()));
        }
        if self.volume_spike_multiplier <= 0.0 {
            return Err(AnalysisError::InvalidConfig(
                "volume_spike_multiplier must be > 0".into(),
            ));
        }
        if self.rsi_oversold >= self.rsi_overbought {
            return Err(AnalysisError::InvalidConfig(
                "rsi_oversold must be below rsi_overbought".into(),
            ));
        }
        Ok(())
    }
}

/// Volume/price pattern classifier
#[derive(Debug, Clone, Default)]
pub struct VolumeAnalyzer {
    config: AnalyzerConfig,
}

impl VolumeAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Classify every index from the warm-up offset to the end of the series
    pub fn analyze(
        &self,
        volumes: &[f64],
        prices: &[f64],
        timestamps: &[i64],
    ) -> Result<Vec<VolumePattern>, AnalysisError> {
        if volumes.len() != prices.len() || volumes.len() != timestamps.len() {
            return Err(AnalysisError::LengthMismatch {
                volumes: volumes.len(),
                prices: prices.len(),
                timestamps: timestamps.len(),
            });
        }

        let window = self.config.window;
        if volumes.len() <= window {
            return Ok(Vec::new());
        }

        let avg_volume = moving_average(volumes, window);
        let volume_rsi = rsi_series(volumes, self.config.rsi_period);
        let price_rsi = rsi_series(prices, self.config.rsi_period);

        let patterns = (window..volumes.len())
            .map(|i| {
                let volume_ratio = ratio_or_zero(volumes[i], avg_volume[i - window]);
                let price_change = ratio_or_zero(prices[i] - prices[i - 1], prices[i - 1]);

                let metrics = PatternMetrics {
                    volume_ratio,
                    price_change,
                    volume_rsi: volume_rsi[i],
                    price_rsi: price_rsi[i],
                    volume_spike: volume_ratio > self.config.volume_spike_multiplier,
                    price_momentum: price_change.abs() > self.config.price_momentum_threshold,
                };

                VolumePattern {
                    timestamp: timestamps[i],
                    volume: volumes[i],
                    price: prices[i],
                    kind: self.classify(&metrics),
                    metrics,
                }
            })
            .collect();

        Ok(patterns)
    }

    fn classify(&self, m: &PatternMetrics) -> PatternKind {
        if !(m.volume_spike && m.price_momentum) || m.volume_rsi <= self.config.rsi_overbought {
            return PatternKind::Neutral;
        }

        if m.price_change > 0.0 && m.price_rsi < self.config.rsi_oversold {
            PatternKind::Accumulation
        } else if m.price_change < 0.0 && m.price_rsi > self.config.rsi_overbought {
            PatternKind::Distribution
        } else {
            PatternKind::Neutral
        }
    }
}

/// Trailing simple moving average.
///
/// Element `k` is the mean of `data[k..k + window]`, so the average that
/// precedes index `i` lives at `i - window`.
pub fn moving_average(data: &[f64], window: usize) -> Vec<f64> {
    if window == 0 || data.len() < window {
        return Vec::new();
    }
    data.windows(window)
        .map(|w| w.iter().sum::<f64>() / window as f64)
        .collect()
}

/// RSI aligned with the input: element `i` covers the `period` deltas ending at `i`.
///
/// Indices without a full period report [`NEUTRAL_RSI`]. A zero average loss is
/// replaced by 1 so a strictly rising series approaches 100 without dividing by zero.
pub fn rsi_series(data: &[f64], period: usize) -> Vec<f64> {
    let mut rsi = vec![NEUTRAL_RSI; data.len()];
    if period == 0 || data.len() <= period {
        return rsi;
    }

    let deltas: Vec<f64> = data.windows(2).map(|w| w[1] - w[0]).collect();

    for i in period..data.len() {
        let slice = &deltas[i - period..i];
        let avg_gain = slice.iter().map(|d| d.max(0.0)).sum::<f64>() / period as f64;
        let avg_loss = slice.iter().map(|d| (-d).max(0.0)).sum::<f64>() / period as f64;
        rsi[i] = rsi_value(avg_gain, avg_loss);
    }

    rsi
}

/// `100 - 100 / (1 + avg_gain / avg_loss)` with a zero loss replaced by 1
pub fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    let loss = if avg_loss == 0.0 { 1.0 } else { avg_loss };
    let rs = avg_gain / loss;
    100.0 - 100.0 / (1.0 + rs)
}
