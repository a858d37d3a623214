//! Fibonacci retracement and extension levels.
//!
//! Levels are built from one swing pair. In an uptrend the retracements run
//! down from the swing high (`high − r·range`) and the extensions run above it
//! (`high + (r − 1)·range`); a downtrend mirrors both around the swing low.
//! Full precision is kept in [`FibonacciLevelSet`]; the analysis output rounds
//! to two decimals.

use serde::{Deserialize, Serialize};

use crate::config::SwingConfig;
use crate::error::{Error, NumericGuard, Result};
use crate::series::Series;
use crate::utils::round2;

use super::note_guard;
use super::swing::{select_swings, SwingPoint, Trend};

/// Retracement ratios, trend end to trend start.
pub const RETRACEMENT_RATIOS: [f64; 7] = [0.0, 0.236, 0.382, 0.5, 0.618, 0.786, 1.0];

/// Extension ratios beyond the trend end.
pub const EXTENSION_RATIOS: [f64; 4] = [1.272, 1.618, 2.0, 2.618];

/// One level of the set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FibonacciLevel {
    /// Ratio of the swing range.
    pub ratio: f64,
    /// Ratio as a percentage label, e.g. `61.8%`.
    pub label: String,
    /// Price of the level.
    pub price: f64,
    /// True for ratios above 1.
    pub is_extension: bool,
}

fn label(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

/// Retracement and extension prices for one swing pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FibonacciLevelSet {
    /// Swing high price.
    pub swing_high: f64,
    /// Swing low price.
    pub swing_low: f64,
    /// Direction the levels are oriented by.
    pub trend: Trend,
    /// Retracements in ratio order, then extensions in ratio order.
    pub levels: Vec<FibonacciLevel>,
}

impl FibonacciLevelSet {
    /// Builds the level set.
    ///
    /// # Errors
    ///
    /// Returns `Error::DegenerateRange` when `swing_high == swing_low`, and
    /// `Error::InvalidParameter` when the low lies above the high.
    pub fn new(swing_low: f64, swing_high: f64, trend: Trend) -> Result<Self> {
        if swing_high == swing_low {
            return Err(Error::DegenerateRange { price: swing_high });
        }
        if swing_high < swing_low {
            return Err(Error::InvalidParameter {
                name: "swing_high",
                reason: format!("swing high {swing_high} is below swing low {swing_low}"),
            });
        }

        let levels = RETRACEMENT_RATIOS
            .iter()
            .chain(EXTENSION_RATIOS.iter())
            .map(|&ratio| FibonacciLevel {
                ratio,
                label: label(ratio),
                price: Self::price_at(swing_low, swing_high, trend, ratio),
                is_extension: ratio > 1.0,
            })
            .collect();

        Ok(Self {
            swing_high,
            swing_low,
            trend,
            levels,
        })
    }

    fn price_at(low: f64, high: f64, trend: Trend, ratio: f64) -> f64 {
        let range = high - low;
        // Exact endpoints, no subtraction drift.
        match (trend, ratio) {
            (Trend::Uptrend, r) if r == 0.0 => high,
            (Trend::Uptrend, r) if r == 1.0 => low,
            (Trend::Downtrend, r) if r == 0.0 => low,
            (Trend::Downtrend, r) if r == 1.0 => high,
            (Trend::Uptrend, r) if r < 1.0 => high - r * range,
            (Trend::Uptrend, r) => high + (r - 1.0) * range,
            (Trend::Downtrend, r) if r < 1.0 => low + r * range,
            (Trend::Downtrend, r) => low - (r - 1.0) * range,
        }
    }

    /// Price of the level with exactly this ratio.
    #[must_use]
    pub fn level(&self, ratio: f64) -> Option<f64> {
        self.levels
            .iter()
            .find(|l| (l.ratio - ratio).abs() < 1e-12)
            .map(|l| l.price)
    }

    /// Highest level strictly below `price`.
    #[must_use]
    pub fn nearest_support(&self, price: f64) -> Option<&FibonacciLevel> {
        self.levels
            .iter()
            .filter(|l| l.price < price)
            .max_by(|a, b| a.price.total_cmp(&b.price))
    }

    /// Lowest level strictly above `price`.
    #[must_use]
    pub fn nearest_resistance(&self, price: f64) -> Option<&FibonacciLevel> {
        self.levels
            .iter()
            .filter(|l| l.price > price)
            .min_by(|a, b| a.price.total_cmp(&b.price))
    }

    /// Reward over risk, oriented by trend. `None` when a side is missing or
    /// the risk is zero.
    #[must_use]
    pub fn risk_reward(&self, price: f64) -> Option<f64> {
        let support = self.nearest_support(price)?.price;
        let resistance = self.nearest_resistance(price)?.price;
        let (reward, risk) = match self.trend {
            Trend::Uptrend => (resistance - price, price - support),
            Trend::Downtrend => (price - support, resistance - price),
        };
        (risk > 0.0).then(|| reward / risk)
    }

    /// Whether `price` sits between the 50% and 61.8% retracements.
    #[must_use]
    pub fn in_golden_zone(&self, price: f64) -> bool {
        match (self.level(0.5), self.level(0.618)) {
            (Some(a), Some(b)) => price >= a.min(b) && price <= a.max(b),
            _ => false,
        }
    }
}

/// A level reference in the analysis output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelRef {
    /// Percentage label.
    pub label: String,
    /// Level price, two decimals.
    pub price: f64,
}

impl From<&FibonacciLevel> for LevelRef {
    fn from(level: &FibonacciLevel) -> Self {
        Self {
            label: level.label.clone(),
            price: round2(level.price),
        }
    }
}

/// Fibonacci analysis of the latest close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FibonacciAnalysis {
    /// Latest close.
    pub current_price: f64,
    /// Orientation of the levels.
    pub trend: Trend,
    /// Swing high used.
    pub swing_high: SwingPoint,
    /// Swing low used.
    pub swing_low: SwingPoint,
    /// Swing high minus swing low, two decimals.
    pub range: f64,
    /// Retracement levels, two decimals.
    pub retracements: Vec<LevelRef>,
    /// Extension levels, two decimals.
    pub extensions: Vec<LevelRef>,
    /// Highest level below the price.
    pub nearest_support: Option<LevelRef>,
    /// Lowest level above the price.
    pub nearest_resistance: Option<LevelRef>,
    /// Trend-oriented reward/risk between the nearest levels.
    pub risk_reward: Option<f64>,
    /// Price within the 50%–61.8% band.
    pub in_golden_zone: bool,
    /// True when either swing is a fallback extreme rather than a confirmed swing.
    pub insufficient_data: bool,
    /// Zero-denominator cases resolved locally.
    pub numeric_guards: Vec<NumericGuard>,
}

/// Selects the active swing pair and places the latest close among its levels.
///
/// # Errors
///
/// Returns `Error::DegenerateRange` when the selected swings share a price,
/// or `Error::InvalidPeriod` for a zero window or lookback.
pub fn analyze_fibonacci(series: &Series, config: &SwingConfig) -> Result<FibonacciAnalysis> {
    let pair = select_swings(series, config)?;
    let set = FibonacciLevelSet::new(pair.low.price, pair.high.price, pair.trend)?;
    let price = series.last().close;

    let mut numeric_guards = Vec::new();
    let risk_reward = set.risk_reward(price).map(round2);
    if risk_reward.is_none() {
        note_guard(&mut numeric_guards, NumericGuard::ZeroRisk);
    }

    let (extensions, retracements): (Vec<&FibonacciLevel>, Vec<&FibonacciLevel>) =
        set.levels.iter().partition(|l| l.is_extension);

    Ok(FibonacciAnalysis {
        current_price: price,
        trend: pair.trend,
        swing_high: pair.high,
        swing_low: pair.low,
        range: round2(pair.high.price - pair.low.price),
        retracements: retracements.into_iter().map(LevelRef::from).collect(),
        extensions: extensions.into_iter().map(LevelRef::from).collect(),
        nearest_support: set.nearest_support(price).map(LevelRef::from),
        nearest_resistance: set.nearest_resistance(price).map(LevelRef::from),
        risk_reward,
        in_golden_zone: set.in_golden_zone(price),
        insufficient_data: !(pair.high_confirmed && pair.low_confirmed),
        numeric_guards,
    })
}
