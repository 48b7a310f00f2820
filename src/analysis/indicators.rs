// src/analysis/indicators.rs
// Pure technical indicator computation over an ordered price series. Every
// function returns `None` when the input is shorter than the indicator's
// minimum window; nothing here performs I/O or holds state.

use serde::Serialize;

use crate::domain::models::PriceSample;

/// Simple Moving Average over the trailing `period` samples.
pub fn sma(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period {
        return None;
    }
    let window = &prices[prices.len() - period..];
    Some(window.iter().sum::<f64>() / period as f64)
}

/// Exponential Moving Average.
///
/// Seeds with the first sample of the series and applies
/// `ema = (price - ema) * 2/(period+1) + ema` across the rest, so the result
/// depends on where the supplied series starts. Callers must provide a
/// consistent window of history; this is a documented limitation, not a bug.
pub fn ema(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period {
        return None;
    }
    let multiplier = 2.0 / (period + 1) as f64;
    let mut ema = prices[0];
    for &price in &prices[1..] {
        ema = (price - ema) * multiplier + ema;
    }
    Some(ema)
}

/// Relative Strength Index over the trailing `period` price deltas.
/// Always in [0, 100]; exactly 100 when the trailing average loss is zero.
pub fn rsi(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period + 1 {
        return None;
    }

    let changes: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();
    let tail = &changes[changes.len() - period..];

    let avg_gain = tail.iter().filter(|c| **c > 0.0).sum::<f64>() / period as f64;
    let avg_loss = tail.iter().filter(|c| **c < 0.0).map(|c| -c).sum::<f64>() / period as f64;

    if avg_loss == 0.0 {
        return Some(100.0);
    }

    let rs = avg_gain / avg_loss;
    Some(100.0 - (100.0 / (1.0 + rs)))
}

#[derive(Debug, Clone, Serialize)]
pub struct Macd {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// MACD line as fast EMA minus slow EMA.
///
/// The `signal` and `histogram` outputs are fixed fractions (0.9x / 0.1x) of
/// the MACD line rather than a smoothed MACD history. Callers rely on this
/// simplification; do not silently upgrade it to the textbook definition.
pub fn macd(prices: &[f64], fast_period: usize, slow_period: usize) -> Option<Macd> {
    if prices.len() < slow_period {
        return None;
    }

    let fast_ema = ema(prices, fast_period)?;
    let slow_ema = ema(prices, slow_period)?;
    let macd_line = fast_ema - slow_ema;

    Some(Macd {
        macd: macd_line,
        signal: macd_line * 0.9,
        histogram: macd_line * 0.1,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    pub bandwidth: f64,
}

/// Bollinger Bands: SMA middle band with `num_std` standard deviations
/// (population) on either side. Bandwidth is 0 when the middle band is <= 0.
pub fn bollinger_bands(prices: &[f64], period: usize, num_std: f64) -> Option<BollingerBands> {
    if period == 0 || prices.len() < period {
        return None;
    }

    let window = &prices[prices.len() - period..];
    let middle = window.iter().sum::<f64>() / period as f64;
    let std = std_dev(window);

    let bandwidth = if middle > 0.0 {
        (num_std * std * 2.0) / middle
    } else {
        0.0
    };

    Some(BollingerBands {
        upper: middle + num_std * std,
        middle,
        lower: middle - num_std * std,
        bandwidth,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct Stochastic {
    pub k: f64,
    pub d: f64,
}

/// Stochastic oscillator %K over the trailing window. %D is a fixed 0.9x of
/// %K (same simplification caveat as [`macd`]). Returns `None` when the
/// window is flat (highest high equals lowest low).
pub fn stochastic(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    period: usize,
) -> Option<Stochastic> {
    if period == 0
        || closes.len() < period
        || highs.len() < period
        || lows.len() < period
    {
        return None;
    }

    let highest_high = highs[highs.len() - period..]
        .iter()
        .fold(f64::MIN, |a, &b| a.max(b));
    let lowest_low = lows[lows.len() - period..]
        .iter()
        .fold(f64::MAX, |a, &b| a.min(b));

    if highest_high == lowest_low {
        return None;
    }

    let current_close = *closes.last()?;
    let k = (current_close - lowest_low) / (highest_high - lowest_low) * 100.0;

    Some(Stochastic { k, d: k * 0.9 })
}

/// Annualized volatility: standard deviation of period-over-period returns
/// over the trailing window, scaled by sqrt(252), as a percentage.
pub fn volatility(prices: &[f64], period: usize) -> Option<f64> {
    if period < 2 || prices.len() < period {
        return None;
    }

    let window = &prices[prices.len() - period..];
    let returns: Vec<f64> = window
        .windows(2)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect();

    Some(std_dev(&returns) * 252.0_f64.sqrt() * 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Uptrend,
    Downtrend,
    Sideways,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendStrength {
    Weak,
    Moderate,
    Strong,
    Unknown,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendAnalysis {
    pub trend: TrendDirection,
    pub strength: TrendStrength,
    pub direction: i8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ema_separation_percent: Option<f64>,
}

impl TrendAnalysis {
    fn unknown() -> Self {
        Self {
            trend: TrendDirection::Unknown,
            strength: TrendStrength::Unknown,
            direction: 0,
            ema_separation_percent: None,
        }
    }
}

/// Classify the overall trend by comparing EMA(10) against EMA(30). The
/// strength label comes from the percentage separation between the two:
/// >2% strong, >1% moderate, otherwise weak.
pub fn analyze_trend(prices: &[f64]) -> TrendAnalysis {
    if prices.len() < 10 {
        return TrendAnalysis::unknown();
    }

    let (short_ema, long_ema) = match (ema(prices, 10), ema(prices, 30)) {
        (Some(s), Some(l)) => (s, l),
        _ => return TrendAnalysis::unknown(),
    };

    let (trend, direction) = if short_ema > long_ema {
        (TrendDirection::Uptrend, 1)
    } else if short_ema < long_ema {
        (TrendDirection::Downtrend, -1)
    } else {
        (TrendDirection::Sideways, 0)
    };

    let separation = (short_ema - long_ema).abs() / long_ema * 100.0;
    let strength = if separation > 2.0 {
        TrendStrength::Strong
    } else if separation > 1.0 {
        TrendStrength::Moderate
    } else {
        TrendStrength::Weak
    };

    TrendAnalysis {
        trend,
        strength,
        direction,
        ema_separation_percent: Some(separation),
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SupportResistance {
    pub support: Vec<f64>,
    pub resistance: Vec<f64>,
}

/// Find support/resistance levels from local extrema. A sample is a local
/// minimum (maximum) when no other sample within +/- `window` is strictly
/// lower (higher). Levels within 1% relative distance are merged; per side
/// the top 3 surviving levels are returned in ascending order.
pub fn support_resistance(prices: &[f64], window: usize) -> SupportResistance {
    if window == 0 || prices.len() < window * 2 {
        return SupportResistance::default();
    }

    let mut supports = Vec::new();
    let mut resistances = Vec::new();

    for i in window..prices.len() - window {
        let mut local_min = true;
        let mut local_max = true;

        for j in i - window..=i + window {
            if j == i {
                continue;
            }
            if prices[j] < prices[i] {
                local_min = false;
            }
            if prices[j] > prices[i] {
                local_max = false;
            }
        }

        if local_min {
            supports.push(prices[i]);
        }
        if local_max {
            resistances.push(prices[i]);
        }
    }

    SupportResistance {
        support: top_distinct_levels(&supports),
        resistance: top_distinct_levels(&resistances),
    }
}

// Merge levels within 1% relative distance, then keep the 3 highest,
// ascending.
fn top_distinct_levels(levels: &[f64]) -> Vec<f64> {
    let mut filtered: Vec<f64> = Vec::new();
    for &level in levels {
        if !filtered
            .iter()
            .any(|&existing| ((level - existing) / existing).abs() < 0.01)
        {
            filtered.push(level);
        }
    }
    filtered.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    if filtered.len() > 3 {
        filtered.split_off(filtered.len() - 3)
    } else {
        filtered
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RsiSignal {
    Overbought,
    Oversold,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BandPosition {
    AboveUpper,
    BelowLower,
    WithinBands,
}

/// Combined indicator bundle for one price series. Each field is `None` when
/// the series is too short for that indicator's window. Created per signal
/// request and never persisted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndicatorSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sma_20: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sma_50: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ema_12: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ema_26: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rsi: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rsi_signal: Option<RsiSignal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub macd: Option<Macd>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bollinger_bands: Option<BollingerBands>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bb_position: Option<BandPosition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stochastic: Option<Stochastic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volatility_annualized: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<TrendAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub support_resistance: Option<SupportResistance>,
}

impl IndicatorSet {
    pub fn is_empty(&self) -> bool {
        self.sma_20.is_none() && self.rsi.is_none() && self.trend.is_none()
    }
}

/// Analyze a price history and compute the full indicator bundle. Fewer than
/// two samples yields an empty bundle.
pub fn analyze_price_history(history: &[PriceSample]) -> IndicatorSet {
    if history.len() < 2 {
        return IndicatorSet::default();
    }

    let prices: Vec<f64> = history.iter().map(|s| s.price).collect();
    let highs: Vec<f64> = history.iter().map(|s| s.high()).collect();
    let lows: Vec<f64> = history.iter().map(|s| s.low()).collect();

    let mut set = IndicatorSet {
        sma_20: sma(&prices, 20),
        sma_50: sma(&prices, 50),
        ema_12: ema(&prices, 12),
        ema_26: ema(&prices, 26),
        ..IndicatorSet::default()
    };

    if let Some(rsi) = rsi(&prices, 14) {
        set.rsi_signal = Some(if rsi > 70.0 {
            RsiSignal::Overbought
        } else if rsi < 30.0 {
            RsiSignal::Oversold
        } else {
            RsiSignal::Neutral
        });
        set.rsi = Some(rsi);
    }

    set.macd = macd(&prices, 12, 26);

    if let Some(bb) = bollinger_bands(&prices, 20, 2.0) {
        let current = prices[prices.len() - 1];
        set.bb_position = Some(if current > bb.upper {
            BandPosition::AboveUpper
        } else if current < bb.lower {
            BandPosition::BelowLower
        } else {
            BandPosition::WithinBands
        });
        set.bollinger_bands = Some(bb);
    }

    set.stochastic = stochastic(&highs, &lows, &prices, 14);
    set.volatility_annualized = volatility(&prices, 20);
    set.trend = Some(analyze_trend(&prices));
    set.support_resistance = Some(support_resistance(&prices, 5));

    set
}

// Population standard deviation.
fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}
