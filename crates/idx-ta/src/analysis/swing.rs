//! Swing-point detection.
//!
//! A bar is a swing high when its high is the maximum of the symmetric window
//! `[i - w, i + w]` and no earlier bar in that window shares the value. Swing
//! lows mirror this on the lows. Bars within `w` of either end of the series
//! lack context and are never confirmed.
//!
//! The detector works on a monotonic-deque rolling argmax/argmin, so the whole
//! series is scanned in O(n).

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::SwingConfig;
use crate::error::{Error, Result};
use crate::kernels::{rolling_argmax, rolling_argmin};
use crate::series::Series;
use crate::traits::validate_period;
use crate::utils::mean;

/// Caller's trend hint for orienting swing-based levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendHint {
    /// Infer from the order of the selected swings.
    #[default]
    Auto,
    /// Treat the move as low → high.
    Uptrend,
    /// Treat the move as high → low.
    Downtrend,
}

impl FromStr for TrendHint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "up" | "uptrend" => Ok(Self::Uptrend),
            "down" | "downtrend" => Ok(Self::Downtrend),
            other => Err(Error::InvalidParameter {
                name: "trend",
                reason: format!("unknown trend '{other}', expected auto, uptrend or downtrend"),
            }),
        }
    }
}

/// Resolved direction of a swing move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trend {
    /// Swing low came first.
    Uptrend,
    /// Swing high came first.
    Downtrend,
}

/// Which extremum a swing point marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SwingKind {
    /// Local maximum of the highs.
    High,
    /// Local minimum of the lows.
    Low,
}

/// A confirmed local extremum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingPoint {
    /// Bar position in the series.
    pub index: usize,
    /// Bar timestamp.
    pub timestamp: i64,
    /// High for a swing high, low for a swing low.
    pub price: f64,
    /// High or low.
    pub kind: SwingKind,
}

/// How equal values inside a confirmation window are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TieRule {
    /// The earliest of several equal extrema is confirmed.
    Earliest,
    /// Any equal value in the window disqualifies the bar.
    Strict,
}

fn pivots(values: &[f64], order: usize, tie: TieRule, want_max: bool) -> Result<Vec<usize>> {
    validate_period(order)?;
    let span = 2 * order + 1;
    if values.len() < span {
        return Ok(Vec::new());
    }

    let args = if want_max {
        rolling_argmax(values, span)?
    } else {
        rolling_argmin(values, span)?
    };

    let mut found = Vec::new();
    for i in order..values.len() - order {
        if args[i + order] != Some(i) {
            continue;
        }
        if tie == TieRule::Strict && values[i + 1..=i + order].contains(&values[i]) {
            continue;
        }
        found.push(i);
    }
    Ok(found)
}

/// Indices of local maxima confirmed by `order` bars on each side.
///
/// # Errors
///
/// Returns `Error::InvalidPeriod` if `order` is zero.
pub fn pivot_highs(values: &[f64], order: usize, tie: TieRule) -> Result<Vec<usize>> {
    pivots(values, order, tie, true)
}

/// Indices of local minima confirmed by `order` bars on each side.
///
/// # Errors
///
/// Returns `Error::InvalidPeriod` if `order` is zero.
pub fn pivot_lows(values: &[f64], order: usize, tie: TieRule) -> Result<Vec<usize>> {
    pivots(values, order, tie, false)
}

/// Every confirmed swing high and low, ordered by bar index.
///
/// # Errors
///
/// Returns `Error::InvalidPeriod` if `window` is zero.
pub fn raw_swings(series: &Series, window: usize) -> Result<Vec<SwingPoint>> {
    let bars = series.bars();
    let highs = pivot_highs(series.highs(), window, TieRule::Earliest)?;
    let lows = pivot_lows(series.lows(), window, TieRule::Earliest)?;

    let mut raw: Vec<SwingPoint> = highs
        .into_iter()
        .map(|i| SwingPoint {
            index: i,
            timestamp: bars[i].timestamp,
            price: bars[i].high,
            kind: SwingKind::High,
        })
        .chain(lows.into_iter().map(|i| SwingPoint {
            index: i,
            timestamp: bars[i].timestamp,
            price: bars[i].low,
            kind: SwingKind::Low,
        }))
        .collect();
    raw.sort_by_key(|p| (p.index, p.kind == SwingKind::Low));
    Ok(raw)
}

/// Consecutive swings of the same kind keep only the more extreme one (the
/// earlier on a tie), so highs and lows strictly alternate in the output.
fn alternate(points: impl IntoIterator<Item = SwingPoint>) -> Vec<SwingPoint> {
    let mut out: Vec<SwingPoint> = Vec::new();
    for point in points {
        match out.last_mut() {
            Some(last) if last.kind == point.kind => {
                let more_extreme = match point.kind {
                    SwingKind::High => point.price > last.price,
                    SwingKind::Low => point.price < last.price,
                };
                if more_extreme {
                    *last = point;
                }
            }
            _ => out.push(point),
        }
    }
    out
}

/// Detects swing points and collapses them into an alternating sequence.
///
/// # Errors
///
/// Returns `Error::InvalidPeriod` if `window` is zero.
pub fn detect_swings(series: &Series, window: usize) -> Result<Vec<SwingPoint>> {
    Ok(alternate(raw_swings(series, window)?))
}

/// The swing high and swing low a set of levels is built from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingPair {
    /// Selected swing high.
    pub high: SwingPoint,
    /// Selected swing low.
    pub low: SwingPoint,
    /// Direction used to orient levels.
    pub trend: Trend,
    /// False when the high is the window's absolute maximum rather than a confirmed swing.
    pub high_confirmed: bool,
    /// False when the low is the window's absolute minimum rather than a confirmed swing.
    pub low_confirmed: bool,
}

fn extreme_in(series: &Series, start: usize, kind: SwingKind) -> SwingPoint {
    let bars = series.bars();
    let mut best = start;
    for i in start + 1..bars.len() {
        let better = match kind {
            SwingKind::High => bars[i].high > bars[best].high,
            SwingKind::Low => bars[i].low < bars[best].low,
        };
        if better {
            best = i;
        }
    }
    SwingPoint {
        index: best,
        timestamp: bars[best].timestamp,
        price: match kind {
            SwingKind::High => bars[best].high,
            SwingKind::Low => bars[best].low,
        },
        kind,
    }
}

/// Second-half average close above first-half average.
fn closes_rising(closes: &[f64]) -> bool {
    let mid = closes.len() / 2;
    match (mean(&closes[..mid]), mean(&closes[mid..])) {
        (Some(first), Some(second)) => second > first,
        _ => true,
    }
}

/// Picks the most recent confirmed swing high and low within the trailing
/// `lookback` bars, falling back to the window's absolute extremes.
///
/// # Errors
///
/// Returns `Error::InvalidPeriod` if the window or lookback is zero.
pub fn select_swings(series: &Series, config: &SwingConfig) -> Result<SwingPair> {
    validate_period(config.lookback)?;
    let start = series.len().saturating_sub(config.lookback);
    let swings = raw_swings(series, config.window)?;

    let recent = |kind: SwingKind| {
        swings
            .iter()
            .rev()
            .take_while(|p| p.index >= start)
            .find(|p| p.kind == kind)
            .copied()
    };

    let (high, high_confirmed) = recent(SwingKind::High)
        .map_or_else(|| (extreme_in(series, start, SwingKind::High), false), |p| (p, true));
    let (low, low_confirmed) = recent(SwingKind::Low)
        .map_or_else(|| (extreme_in(series, start, SwingKind::Low), false), |p| (p, true));

    let trend = match config.trend {
        TrendHint::Uptrend => Trend::Uptrend,
        TrendHint::Downtrend => Trend::Downtrend,
        TrendHint::Auto if low.index < high.index => Trend::Uptrend,
        TrendHint::Auto if high.index < low.index => Trend::Downtrend,
        TrendHint::Auto => {
            if closes_rising(&series.closes()[start..]) {
                Trend::Uptrend
            } else {
                Trend::Downtrend
            }
        }
    };

    Ok(SwingPair {
        high,
        low,
        trend,
        high_confirmed,
        low_confirmed,
    })
}

/// Swing detection result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwingAnalysis {
    /// Alternating confirmed swings inside the lookback, oldest first.
    pub swings: Vec<SwingPoint>,
    /// Pair selected for level construction.
    pub selected: SwingPair,
    /// True when the series is too short to confirm any swing.
    pub insufficient_data: bool,
}

/// Detects swings and selects the active pair.
///
/// # Errors
///
/// Returns `Error::InvalidPeriod` if the window or lookback is zero.
pub fn analyze_swings(series: &Series, config: &SwingConfig) -> Result<SwingAnalysis> {
    let start = series.len().saturating_sub(config.lookback);
    let swings = alternate(
        raw_swings(series, config.window)?
            .into_iter()
            .filter(|p| p.index >= start),
    );
    Ok(SwingAnalysis {
        swings,
        selected: select_swings(series, config)?,
        insufficient_data: series.len() < 2 * config.window + 1,
    })
}
