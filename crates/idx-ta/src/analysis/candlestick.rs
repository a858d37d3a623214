//! Candlestick pattern recognition over the trailing window.
//!
//! Single-bar shapes (doji, hammer family, marubozu), two-bar engulfing and
//! three-bar stars are matched on every bar of the window. Hammer and
//! shooting-star shapes are named by the short-term trend that precedes them.
//! Each match is rated independently:
//!
//! | rating | requires |
//! |--------|----------|
//! | `MEDIUM` | the shape |
//! | `STRONG` | shape, directional, volume above the trailing average |
//! | `VERY_STRONG` | `STRONG` plus another match with the same direction in the window |

use serde::{Deserialize, Serialize};

use crate::config::CandlestickConfig;
use crate::error::NumericGuard;
use crate::indicators::Candle;
use crate::series::Series;
use crate::utils::{mean, pct_change};

use super::{note_guard, Direction};

/// Fewer prior bars than this and no trailing volume average is formed.
const MIN_VOLUME_BARS: usize = 5;
/// Close-to-close change above which a bullish marubozu may be an ARA bar.
const POTENTIAL_ARA_PCT: f64 = 15.0;
/// Net change over the trend window that marks a trend.
const TREND_CHANGE_PCT: f64 = 2.0;
/// Slope of the trailing average that marks a trend.
const TREND_SLOPE_PCT: f64 = 0.5;

/// Recognized patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatternKind {
    /// Open and close nearly equal.
    Doji,
    /// Long lower shadow after a decline.
    Hammer,
    /// Long lower shadow after an advance.
    HangingMan,
    /// Long upper shadow after a decline.
    InvertedHammer,
    /// Long upper shadow after an advance.
    ShootingStar,
    /// Full body with almost no shadows.
    Marubozu,
    /// Bullish body swallowing the previous bearish body.
    BullishEngulfing,
    /// Bearish body swallowing the previous bullish body.
    BearishEngulfing,
    /// Bearish bar, small star, bullish recovery.
    MorningStar,
    /// Bullish bar, small star, bearish reversal.
    EveningStar,
}

impl PatternKind {
    /// Number of bars the pattern spans.
    #[must_use]
    pub const fn bar_span(self) -> usize {
        match self {
            Self::Doji
            | Self::Hammer
            | Self::HangingMan
            | Self::InvertedHammer
            | Self::ShootingStar
            | Self::Marubozu => 1,
            Self::BullishEngulfing | Self::BearishEngulfing => 2,
            Self::MorningStar | Self::EveningStar => 3,
        }
    }
}

/// Rating of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatternStrength {
    /// Shape only.
    Medium,
    /// Shape with volume.
    Strong,
    /// Shape, volume and a same-direction confluence.
    VeryStrong,
}

/// Short-term trend before a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShortTrend {
    /// Rising closes.
    Uptrend,
    /// Falling closes.
    Downtrend,
    /// Neither.
    Sideways,
    /// Not enough prior bars.
    Unknown,
}

/// One matched pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternMatch {
    /// Pattern name.
    pub name: PatternKind,
    /// Index of the last bar of the pattern.
    pub index: usize,
    /// Timestamp of the last bar.
    pub timestamp: i64,
    /// Bars spanned, 1 to 3.
    pub bar_span: usize,
    /// Implied direction.
    pub direction: Direction,
    /// Rating.
    pub strength: PatternStrength,
    /// Volume above the trailing average.
    pub volume_confirmed: bool,
    /// Trend before the pattern.
    pub trend_context: ShortTrend,
    /// Bullish marubozu with an outsized close-to-close gain.
    pub potential_ara: bool,
}

/// Counts by direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSummary {
    /// Bullish matches.
    pub bullish: usize,
    /// Bearish matches.
    pub bearish: usize,
    /// Neutral matches.
    pub neutral: usize,
    /// Majority direction among directional matches.
    pub overall: Direction,
}

/// Candlestick scan result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandlestickAnalysis {
    /// Matches in bar order.
    pub patterns: Vec<PatternMatch>,
    /// Counts and overall direction.
    pub summary: PatternSummary,
    /// True when the series is shorter than `lookback + 5`.
    pub insufficient_data: bool,
    /// Zero-denominator cases resolved locally.
    pub numeric_guards: Vec<NumericGuard>,
}

/// Trend of the `window` closes before `idx`.
#[must_use]
pub fn short_term_trend(closes: &[f64], idx: usize, window: usize) -> ShortTrend {
    if window < 2 || idx < window {
        return ShortTrend::Unknown;
    }
    let recent = &closes[idx - window..idx];
    let change = pct_change(recent[0], recent[window - 1]).unwrap_or(0.0);
    let slope = if window >= 3 {
        let span = window.min(5);
        let current = mean(&recent[window - span..]);
        let previous = mean(&recent[window - span..window - 1]);
        match (previous, current) {
            (Some(prev), Some(curr)) => pct_change(prev, curr).unwrap_or(0.0),
            _ => 0.0,
        }
    } else {
        0.0
    };

    if change > TREND_CHANGE_PCT || slope > TREND_SLOPE_PCT {
        ShortTrend::Uptrend
    } else if change < -TREND_CHANGE_PCT || slope < -TREND_SLOPE_PCT {
        ShortTrend::Downtrend
    } else {
        ShortTrend::Sideways
    }
}

/// Doji threshold for a price level when adaptive thresholds are enabled.
#[must_use]
pub fn doji_threshold(price: f64, config: &CandlestickConfig) -> f64 {
    if !config.adaptive_doji {
        return config.doji_threshold;
    }
    if price < 100.0 {
        0.20
    } else if price < 200.0 {
        0.15
    } else if price < 500.0 {
        0.12
    } else {
        config.doji_threshold
    }
}

/// Body/range below `threshold`; a zero-range bar is never a doji.
#[must_use]
pub fn is_doji(candle: &Candle<f64>, threshold: f64) -> bool {
    candle.body_ratio().is_some_and(|ratio| ratio < threshold)
}

fn effective_body(candle: &Candle<f64>) -> f64 {
    let body = candle.body();
    if body > 0.0 {
        body
    } else {
        candle.range() * 0.01
    }
}

/// Long lower shadow, short upper shadow.
#[must_use]
pub fn has_hammer_shape(candle: &Candle<f64>, multiplier: f64) -> bool {
    if candle.range() <= 0.0 {
        return false;
    }
    let body = effective_body(candle);
    candle.lower_shadow() > multiplier * body && candle.upper_shadow() < body
}

/// Long upper shadow, short lower shadow.
#[must_use]
pub fn has_shooting_star_shape(candle: &Candle<f64>, multiplier: f64) -> bool {
    if candle.range() <= 0.0 {
        return false;
    }
    let body = effective_body(candle);
    candle.upper_shadow() > multiplier * body && candle.lower_shadow() < body
}

/// Both shadows below `ratio` of a non-zero body.
#[must_use]
pub fn is_marubozu(candle: &Candle<f64>, ratio: f64) -> bool {
    let body = candle.body();
    body > 0.0 && candle.upper_shadow() < body * ratio && candle.lower_shadow() < body * ratio
}

/// Bearish bar followed by a bullish bar whose body contains it.
#[must_use]
pub fn is_bullish_engulfing(prev: &Candle<f64>, curr: &Candle<f64>) -> bool {
    prev.is_bearish()
        && curr.is_bullish()
        && curr.open <= prev.close
        && curr.close >= prev.open
}

/// Bullish bar followed by a bearish bar whose body contains it.
#[must_use]
pub fn is_bearish_engulfing(prev: &Candle<f64>, curr: &Candle<f64>) -> bool {
    prev.is_bullish()
        && curr.is_bearish()
        && curr.open >= prev.close
        && curr.close <= prev.open
}

/// Bearish bar, small body gapping below its close, bullish close above its midpoint.
#[must_use]
pub fn is_morning_star(day1: &Candle<f64>, day2: &Candle<f64>, day3: &Candle<f64>, body_ratio: f64) -> bool {
    let body1 = day1.body();
    body1 > 0.0
        && day1.is_bearish()
        && day2.body() < body1 * body_ratio
        && day2.body_top() <= day1.close
        && day3.is_bullish()
        && day3.close > day1.body_midpoint()
}

/// Bullish bar, small body gapping above its close, bearish close below its midpoint.
#[must_use]
pub fn is_evening_star(day1: &Candle<f64>, day2: &Candle<f64>, day3: &Candle<f64>, body_ratio: f64) -> bool {
    let body1 = day1.body();
    body1 > 0.0
        && day1.is_bullish()
        && day2.body() < body1 * body_ratio
        && day2.body_bottom() >= day1.close
        && day3.is_bearish()
        && day3.close < day1.body_midpoint()
}

fn candle_direction(candle: &Candle<f64>) -> Direction {
    if candle.is_bullish() {
        Direction::Bullish
    } else if candle.is_bearish() {
        Direction::Bearish
    } else {
        Direction::Neutral
    }
}

/// Volume above the trailing average, including the bar itself.
fn volume_confirmed(
    volumes: &[f64],
    idx: usize,
    config: &CandlestickConfig,
    guards: &mut Vec<NumericGuard>,
) -> bool {
    let start = (idx + 1).saturating_sub(config.volume_window);
    let window = &volumes[start..=idx];
    if window.len() < MIN_VOLUME_BARS {
        return false;
    }
    match mean(window) {
        Some(avg) if avg > 0.0 => volumes[idx] > avg * config.volume_multiplier,
        _ => {
            note_guard(guards, NumericGuard::ZeroAverageVolume);
            true
        }
    }
}

fn shapes_at(
    series: &Series,
    idx: usize,
    trend: ShortTrend,
    config: &CandlestickConfig,
) -> Vec<(PatternKind, Direction, bool)> {
    let bars = series.bars();
    let curr = Candle::from(&bars[idx]);
    let prev = Candle::from(&bars[idx - 1]);
    let prev2 = Candle::from(&bars[idx - 2]);
    let mut found = Vec::new();

    if is_doji(&curr, doji_threshold(curr.close, config)) {
        found.push((PatternKind::Doji, Direction::Neutral, false));
    }

    if is_marubozu(&curr, config.marubozu_shadow_ratio) {
        let direction = candle_direction(&curr);
        let change = pct_change(prev.close, curr.close).unwrap_or(0.0);
        let potential_ara = direction == Direction::Bullish && change > POTENTIAL_ARA_PCT;
        found.push((PatternKind::Marubozu, direction, potential_ara));
    }

    if has_hammer_shape(&curr, config.shadow_multiplier) {
        let (kind, direction) = match trend {
            ShortTrend::Downtrend => (PatternKind::Hammer, Direction::Bullish),
            ShortTrend::Uptrend => (PatternKind::HangingMan, Direction::Bearish),
            ShortTrend::Sideways | ShortTrend::Unknown => (PatternKind::Hammer, candle_direction(&curr)),
        };
        found.push((kind, direction, false));
    }

    if has_shooting_star_shape(&curr, config.shadow_multiplier) {
        let (kind, direction) = match trend {
            ShortTrend::Downtrend => (PatternKind::InvertedHammer, Direction::Bullish),
            ShortTrend::Uptrend => (PatternKind::ShootingStar, Direction::Bearish),
            ShortTrend::Sideways | ShortTrend::Unknown => {
                (PatternKind::ShootingStar, candle_direction(&curr))
            }
        };
        found.push((kind, direction, false));
    }

    if is_bullish_engulfing(&prev, &curr) {
        found.push((PatternKind::BullishEngulfing, Direction::Bullish, false));
    }
    if is_bearish_engulfing(&prev, &curr) {
        found.push((PatternKind::BearishEngulfing, Direction::Bearish, false));
    }

    if is_morning_star(&prev2, &prev, &curr, config.star_body_ratio) {
        found.push((PatternKind::MorningStar, Direction::Bullish, false));
    }
    if is_evening_star(&prev2, &prev, &curr, config.star_body_ratio) {
        found.push((PatternKind::EveningStar, Direction::Bearish, false));
    }

    found
}

fn summarize(patterns: &[PatternMatch]) -> PatternSummary {
    let count = |d: Direction| patterns.iter().filter(|p| p.direction == d).count();
    let bullish = count(Direction::Bullish);
    let bearish = count(Direction::Bearish);
    let overall = match bullish.cmp(&bearish) {
        std::cmp::Ordering::Greater => Direction::Bullish,
        std::cmp::Ordering::Less => Direction::Bearish,
        std::cmp::Ordering::Equal => Direction::Neutral,
    };
    PatternSummary {
        bullish,
        bearish,
        neutral: count(Direction::Neutral),
        overall,
    }
}

/// Scans the trailing `lookback` bars for patterns.
#[must_use]
pub fn analyze_candlesticks(series: &Series, config: &CandlestickConfig) -> CandlestickAnalysis {
    let n = series.len();
    let mut numeric_guards = Vec::new();

    if n < config.lookback + 5 {
        return CandlestickAnalysis {
            patterns: Vec::new(),
            summary: summarize(&[]),
            insufficient_data: true,
            numeric_guards,
        };
    }

    let closes = series.closes();
    let volumes = series.volumes();
    let bars = series.bars();
    let mut patterns = Vec::new();

    for idx in (n - config.lookback).max(3)..n {
        let trend = short_term_trend(closes, idx, config.trend_window);
        let shapes = shapes_at(series, idx, trend, config);
        if shapes.is_empty() {
            continue;
        }
        let confirmed = volume_confirmed(volumes, idx, config, &mut numeric_guards);
        for (name, direction, potential_ara) in shapes {
            let strength = if confirmed && direction != Direction::Neutral {
                PatternStrength::Strong
            } else {
                PatternStrength::Medium
            };
            patterns.push(PatternMatch {
                name,
                index: idx,
                timestamp: bars[idx].timestamp,
                bar_span: name.bar_span(),
                direction,
                strength,
                volume_confirmed: confirmed,
                trend_context: trend,
                potential_ara,
            });
        }
    }

    // Confluence is judged only after every match in the window is known.
    for i in 0..patterns.len() {
        if patterns[i].strength != PatternStrength::Strong {
            continue;
        }
        let direction = patterns[i].direction;
        let confluent = patterns
            .iter()
            .enumerate()
            .any(|(j, other)| j != i && other.direction == direction);
        if confluent {
            patterns[i].strength = PatternStrength::VeryStrong;
        }
    }

    CandlestickAnalysis {
        summary: summarize(&patterns),
        patterns,
        insufficient_data: false,
        numeric_guards,
    }
}
