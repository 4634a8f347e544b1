//! Technical Indicators
//!
//! Summaries of a token's price/volume history consumed by the scoring engine:
//! - RSI over the most recent `rsi_period` deltas
//! - MACD line (EMA12 - EMA26), its EMA9 signal and the histogram
//! - volume profile: latest volume relative to the mean volume
//! - price volatility: sample standard deviation of simple returns
//!
//! Too little history yields the neutral defaults (RSI 50, zeros).

use statrs::statistics::Statistics;

use crate::domain::{ratio_or_zero, TechnicalIndicators};
use super::volume_analyzer::rsi_series;

const MACD_FAST: usize = 12;
const MACD_SLOW: usize = 26;
const MACD_SIGNAL: usize = 9;

/// Compute indicators from aligned price and volume series
pub fn compute_indicators(prices: &[f64], volumes: &[f64], rsi_period: usize) -> TechnicalIndicators {
    let mut indicators = TechnicalIndicators::default();

    if let Some(rsi) = rsi_series(prices, rsi_period).last() {
        indicators.rsi = *rsi;
    }

    if let Some((signal, histogram)) = macd(prices) {
        indicators.macd_signal = finite_or_zero(signal);
        indicators.macd_histogram = finite_or_zero(histogram);
    }

    if let Some(last) = volumes.last() {
        let mean_volume = volumes.iter().sum::<f64>() / volumes.len() as f64;
        indicators.volume_profile = ratio_or_zero(*last, mean_volume);
    }

    indicators.price_volatility = volatility(prices);
    indicators
}

/// Exponential moving average seeded with the first value
pub fn ema(data: &[f64], period: usize) -> Vec<f64> {
    if data.is_empty() || period == 0 {
        return Vec::new();
    }
    let alpha = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(data.len());
    let mut prev = data[0];
    out.push(prev);
    for value in &data[1..] {
        prev = alpha * value + (1.0 - alpha) * prev;
        out.push(prev);
    }
    out
}

/// (signal, histogram) for the last point, `None` without a full slow period
fn macd(prices: &[f64]) -> Option<(f64, f64)> {
    if prices.len() < MACD_SLOW {
        return None;
    }
    let fast = ema(prices, MACD_FAST);
    let slow = ema(prices, MACD_SLOW);
    let line: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
    let signal = ema(&line, MACD_SIGNAL);

    let last_line = *line.last()?;
    let last_signal = *signal.last()?;
    Some((last_signal, last_line - last_signal))
}

fn volatility(prices: &[f64]) -> f64 {
    let returns: Vec<f64> = prices
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect();
    if returns.len() < 2 {
        return 0.0;
    }
    finite_or_zero(returns.iter().std_dev())
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
