//! Price/oscillator divergence.
//!
//! Pivots of `pivot_order` bars (strict on both sides) are found on the closes
//! of the trailing window. The two most recent pivot lows and the two most
//! recent pivot highs are compared with the oscillator read at the same bars:
//!
//! | price | oscillator | divergence |
//! |-------|------------|------------|
//! | lower low | higher low | regular bullish |
//! | higher high | lower high | regular bearish |
//! | higher low | lower low | hidden bullish |
//! | lower high | higher high | hidden bearish |
//!
//! An event is active when its closing pivot lies within the last
//! `recency_bars` of the window. Active events from all oscillators are
//! scored (strong = 2, otherwise 1) into one overall signal.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::DivergenceConfig;
use crate::error::{Error, NumericGuard, Result};
use crate::indicators::{macd, obv, rsi};
use crate::series::Series;
use crate::traits::ValidatedInput;
use crate::utils::{last_finite, pct_change};

use super::swing::{pivot_highs, pivot_lows, TieRule};
use super::{note_guard, Direction, Strength};

/// Smallest and largest accepted window.
const LOOKBACK_RANGE: (usize, usize) = (15, 60);
/// Bars of history required beyond the window.
const WARMUP_BARS: usize = 20;
/// Absolute minimum history.
const MIN_BARS: usize = 50;
/// Combined score at which the overall signal is strong.
const STRONG_SCORE: u32 = 3;

/// Oscillators compared with price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Oscillator {
    /// Wilder RSI.
    Rsi,
    /// MACD histogram.
    MacdHist,
    /// On-balance volume.
    Obv,
}

impl Oscillator {
    /// Every oscillator, in report order.
    pub const ALL: [Self; 3] = [Self::Rsi, Self::MacdHist, Self::Obv];

    fn compute(self, series: &Series, config: &DivergenceConfig) -> Result<Vec<f64>> {
        let closes = series.closes();
        match self {
            Self::Rsi => rsi(closes, config.rsi_period),
            Self::MacdHist => {
                macd(closes, config.macd_fast, config.macd_slow, config.macd_signal)
                    .map(|out| out.histogram)
            }
            Self::Obv => obv(closes, series.volumes()),
        }
    }
}

impl FromStr for Oscillator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rsi" => Ok(Self::Rsi),
            "macd" | "macd_hist" | "macd-hist" => Ok(Self::MacdHist),
            "obv" => Ok(Self::Obv),
            other => Err(Error::InvalidParameter {
                name: "indicator",
                reason: format!("unknown oscillator '{other}', expected rsi, macd or obv"),
            }),
        }
    }
}

/// Reversal or continuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DivergenceKind {
    /// Momentum disagrees with a new extreme: reversal warning.
    Regular,
    /// Momentum overshoots a pullback: continuation.
    Hidden,
}

/// One divergence between two pivots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivergenceEvent {
    /// Oscillator that diverged.
    pub indicator: Oscillator,
    /// Regular or hidden.
    pub kind: DivergenceKind,
    /// Bullish for pivot lows, bearish for pivot highs.
    pub direction: Direction,
    /// Grade of `change_pct`.
    pub strength: Strength,
    /// Mean absolute percentage change of price and oscillator.
    pub change_pct: f64,
    /// Series index of the first pivot.
    pub start_index: usize,
    /// Series index of the second pivot.
    pub end_index: usize,
    /// Bars from the second pivot to the latest bar.
    pub bars_ago: usize,
    /// Close at the first pivot.
    pub start_price: f64,
    /// Close at the second pivot.
    pub end_price: f64,
    /// Oscillator at the first pivot.
    pub start_value: f64,
    /// Oscillator at the second pivot.
    pub end_value: f64,
}

/// Divergences of one oscillator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorDivergence {
    /// The oscillator.
    pub indicator: Oscillator,
    /// Its latest value.
    pub current_value: Option<f64>,
    /// Events found in the window.
    pub events: Vec<DivergenceEvent>,
    /// Most recent event, if it is still active.
    pub active: Option<DivergenceEvent>,
}

/// Overall divergence verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DivergenceSignal {
    /// No active divergence.
    None,
    /// Bullish score ahead and at least 3.
    StrongBullish,
    /// Bullish score ahead.
    Bullish,
    /// Scores tied.
    Mixed,
    /// Bearish score ahead.
    Bearish,
    /// Bearish score ahead and at least 3.
    StrongBearish,
}

/// Scores of the active divergences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DivergenceSummary {
    /// Verdict.
    pub signal: DivergenceSignal,
    /// Sum over active bullish events.
    pub bullish_score: u32,
    /// Sum over active bearish events.
    pub bearish_score: u32,
    /// Oscillators with an active event.
    pub active_count: usize,
    /// Active events on the leading side (the larger side on a tie).
    pub agreement: usize,
    /// All active events point the same way.
    pub aligned: bool,
}

/// Divergence analysis result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivergenceAnalysis {
    /// Window actually searched after clamping.
    pub lookback: usize,
    /// Per-oscillator results.
    pub indicators: Vec<IndicatorDivergence>,
    /// Combined verdict.
    pub summary: DivergenceSummary,
    /// Zero-denominator cases resolved locally.
    pub numeric_guards: Vec<NumericGuard>,
}

/// Grades a mean percentage change.
#[must_use]
pub fn strength_for(change_pct: f64) -> Strength {
    if change_pct > 10.0 {
        Strength::Strong
    } else if change_pct > 5.0 {
        Strength::Moderate
    } else {
        Strength::Weak
    }
}

fn abs_change(from: f64, to: f64, guards: &mut Vec<NumericGuard>) -> f64 {
    pct_change(from, to).map_or_else(
        || {
            note_guard(guards, NumericGuard::ZeroBase);
            0.0
        },
        f64::abs,
    )
}

/// Compares the most recent pair of price pivots with the oscillator.
///
/// `prices` and `values` cover the same window; returned indices are
/// relative to it.
///
/// # Errors
///
/// Returns `Error::InvalidPeriod` if `order` is zero.
pub fn find_divergences(
    prices: &[f64],
    values: &[f64],
    order: usize,
    indicator: Oscillator,
    guards: &mut Vec<NumericGuard>,
) -> Result<Vec<DivergenceEvent>> {
    let last = prices.len().saturating_sub(1);
    let mut events = Vec::new();

    let lows = pivot_lows(prices, order, TieRule::Strict)?;
    let highs = pivot_highs(prices, order, TieRule::Strict)?;

    for (pivots, direction) in [(lows, Direction::Bullish), (highs, Direction::Bearish)] {
        let &[.., start, end] = pivots.as_slice() else {
            continue;
        };
        let (p0, p1) = (prices[start], prices[end]);
        let (v0, v1) = (values[start], values[end]);
        if !v0.is_finite() || !v1.is_finite() {
            continue;
        }

        let kind = match direction {
            Direction::Bullish if p1 < p0 && v1 > v0 => DivergenceKind::Regular,
            Direction::Bullish if p1 > p0 && v1 < v0 => DivergenceKind::Hidden,
            Direction::Bearish if p1 > p0 && v1 < v0 => DivergenceKind::Regular,
            Direction::Bearish if p1 < p0 && v1 > v0 => DivergenceKind::Hidden,
            _ => continue,
        };

        let change_pct = (abs_change(p0, p1, guards) + abs_change(v0, v1, guards)) / 2.0;
        events.push(DivergenceEvent {
            indicator,
            kind,
            direction,
            strength: strength_for(change_pct),
            change_pct,
            start_index: start,
            end_index: end,
            bars_ago: last - end,
            start_price: p0,
            end_price: p1,
            start_value: v0,
            end_value: v1,
        });
    }
    Ok(events)
}

/// Scores active events into the overall verdict.
#[must_use]
pub fn summarize<'a, I>(active: I) -> DivergenceSummary
where
    I: IntoIterator<Item = &'a DivergenceEvent>,
{
    let mut bullish_score = 0;
    let mut bearish_score = 0;
    let mut bullish_count = 0;
    let mut bearish_count = 0;
    for event in active {
        let points = if event.strength == Strength::Strong { 2 } else { 1 };
        if event.direction == Direction::Bullish {
            bullish_score += points;
            bullish_count += 1;
        } else {
            bearish_score += points;
            bearish_count += 1;
        }
    }

    let active_count = bullish_count + bearish_count;
    let signal = if active_count == 0 {
        DivergenceSignal::None
    } else if bullish_score > bearish_score {
        if bullish_score >= STRONG_SCORE {
            DivergenceSignal::StrongBullish
        } else {
            DivergenceSignal::Bullish
        }
    } else if bearish_score > bullish_score {
        if bearish_score >= STRONG_SCORE {
            DivergenceSignal::StrongBearish
        } else {
            DivergenceSignal::Bearish
        }
    } else {
        DivergenceSignal::Mixed
    };

    let agreement = match signal {
        DivergenceSignal::StrongBullish | DivergenceSignal::Bullish => bullish_count,
        DivergenceSignal::StrongBearish | DivergenceSignal::Bearish => bearish_count,
        DivergenceSignal::Mixed | DivergenceSignal::None => bullish_count.max(bearish_count),
    };

    DivergenceSummary {
        signal,
        bullish_score,
        bearish_score,
        active_count,
        agreement,
        aligned: active_count > 0 && (bullish_count == 0 || bearish_count == 0),
    }
}

/// Runs the configured oscillators over the trailing window.
///
/// # Errors
///
/// - `Error::InsufficientData` when the series is shorter than
///   `max(lookback + 20, 50)` bars
/// - `Error::InvalidPeriod` / `Error::InvalidParameter` for bad periods
pub fn analyze_divergence(series: &Series, config: &DivergenceConfig) -> Result<DivergenceAnalysis> {
    let lookback = config.lookback.clamp(LOOKBACK_RANGE.0, LOOKBACK_RANGE.1);
    series.require((lookback + WARMUP_BARS).max(MIN_BARS), "divergence")?;

    let n = series.len();
    let offset = n - lookback;
    let prices = &series.closes()[offset..];
    let selected: &[Oscillator] = if config.indicators.is_empty() {
        &Oscillator::ALL
    } else {
        &config.indicators
    };

    let mut numeric_guards = Vec::new();
    let mut indicators = Vec::with_capacity(selected.len());
    for &indicator in selected {
        let values = indicator.compute(series, config)?;
        let mut events = find_divergences(
            prices,
            &values[offset..],
            config.pivot_order,
            indicator,
            &mut numeric_guards,
        )?;
        for event in &mut events {
            event.start_index += offset;
            event.end_index += offset;
        }
        let active = events
            .iter()
            .max_by_key(|e| std::cmp::Reverse(e.bars_ago))
            .filter(|e| e.bars_ago < config.recency_bars)
            .cloned();
        indicators.push(IndicatorDivergence {
            indicator,
            current_value: last_finite(&values),
            events,
            active,
        });
    }

    let summary = summarize(indicators.iter().filter_map(|i| i.active.as_ref()));
    Ok(DivergenceAnalysis {
        lookback,
        indicators,
        summary,
        numeric_guards,
    })
}
