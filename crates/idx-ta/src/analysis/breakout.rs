//! Consolidation breakout detection.
//!
//! The range is the highest high and lowest low of the `lookback` bars before
//! the latest one. The latest bar is then classified against it:
//!
//! | condition (first match) | kind |
//! |-------------------------|------|
//! | close > range high | `RESISTANCE_BREAKOUT` |
//! | close < range low | `SUPPORT_BREAKDOWN` |
//! | high within the testing band of the top | `TESTING_RESISTANCE` |
//! | low within the testing band of the bottom | `TESTING_SUPPORT` |
//! | otherwise | `INSIDE_RANGE` |
//!
//! The testing band is `testing_band_atr × ATR`, or `testing_band_pct` % of the
//! level when ATR is unavailable.

use serde::{Deserialize, Serialize};

use crate::config::BreakoutConfig;
use crate::error::{Error, NumericGuard, Result};
use crate::indicators::{atr, Candle};
use crate::series::{Bar, Series};
use crate::traits::ValidatedInput;
use crate::utils::{last_finite, mean};

use super::swing::{pivot_highs, pivot_lows, TieRule};
use super::{note_guard, Strength};

const LOOKBACK_RANGE: (usize, usize) = (10, 60);
/// Bars required beyond the range window.
const EXTRA_BARS: usize = 5;
/// Range projections for targets.
const TARGET_RATIOS: [f64; 3] = [0.618, 1.0, 1.618];
/// Consolidation when the range is narrower than this many ATRs (in percent).
const CONSOLIDATION_ATR_MULTIPLE: f64 = 3.0;
/// Consolidation threshold when ATR is unavailable, in percent.
const CONSOLIDATION_FALLBACK_PCT: f64 = 15.0;
/// Body/range below which the latest bar shows indecision.
const INDECISION_BODY_RATIO: f64 = 0.3;
/// Bars on each side of a refined pivot.
const REFINED_PIVOT_ORDER: usize = 2;

/// Classification of the latest bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BreakoutKind {
    /// Closed above the range.
    ResistanceBreakout,
    /// Closed below the range.
    SupportBreakdown,
    /// Reached the top of the range.
    TestingResistance,
    /// Reached the bottom of the range.
    TestingSupport,
    /// Nowhere near either boundary.
    InsideRange,
}

/// Warning that a breakout may fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FalseBreakoutFlag {
    /// A recent bar traded above the range but closed back below the top.
    UpperWickRejection,
    /// A recent bar traded below the range but closed back above the bottom.
    LowerWickRejection,
    /// Breakout bar volume is below the previous bar's.
    VolumeDeclining,
    /// Volume fell on each of the last three bars.
    DecreasingVolume,
    /// Small body relative to the range on the latest bar.
    Indecision,
}

/// Trading signal derived from the breakout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BreakoutSignal {
    /// Strong confirmed breakout without warnings.
    StrongBullish,
    /// Moderate breakout without warnings.
    Bullish,
    /// Weak or warned breakout.
    WeakBullish,
    /// Testing resistance.
    PotentialBullish,
    /// Inside the range.
    Neutral,
    /// Testing support.
    PotentialBearish,
    /// Weak or warned breakdown.
    WeakBearish,
    /// Moderate breakdown without warnings.
    Bearish,
    /// Strong confirmed breakdown without warnings.
    StrongBearish,
}

/// Breakout analysis of the latest bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakoutEvent {
    /// Range window actually used after clamping.
    pub lookback: usize,
    /// Classification.
    pub kind: BreakoutKind,
    /// Highest high of the range.
    pub range_high: f64,
    /// Lowest low of the range.
    pub range_low: f64,
    /// `range_high − range_low`.
    pub range_width: f64,
    /// Width as a percentage of the low.
    pub range_pct: f64,
    /// Mean of the two-bar pivot highs in the range, or the range high.
    pub refined_resistance: f64,
    /// Mean of the two-bar pivot lows in the range, or the range low.
    pub refined_support: f64,
    /// Range is tight relative to volatility.
    pub is_consolidating: bool,
    /// Width percentage below which the range counts as consolidation.
    pub consolidation_threshold_pct: f64,
    /// Latest ATR when available.
    pub atr: Option<f64>,
    /// Breakout distance in ATRs.
    pub atr_multiple: Option<f64>,
    /// Latest close.
    pub current_price: f64,
    /// Latest volume over the range's average volume.
    pub volume_ratio: f64,
    /// Volume ratio reached the threshold.
    pub volume_confirmed: bool,
    /// Graded only for breakouts and breakdowns.
    pub strength: Option<Strength>,
    /// Range projections beyond the tested or broken boundary.
    pub target_prices: Option<[f64; 3]>,
    /// Opposite range boundary.
    pub stop_loss: Option<f64>,
    /// Reward to the second target over risk to the stop.
    pub risk_reward: Option<f64>,
    /// Failure warnings.
    pub false_breakout_flags: Vec<FalseBreakoutFlag>,
    /// Trading signal.
    pub signal: BreakoutSignal,
    /// Zero-denominator cases resolved locally.
    pub numeric_guards: Vec<NumericGuard>,
}

/// Grades a breakout by its distance beyond the boundary.
///
/// With ATR: strong at ≥ 1 ATR with volume, moderate at ≥ 0.5 ATR or with
/// volume. Without ATR the same grades use 3 % and 1 % of the level.
#[must_use]
pub fn breakout_strength(distance: f64, level: f64, atr: Option<f64>, volume_confirmed: bool) -> Strength {
    let (measure, strong_at, moderate_at, inclusive) = match atr {
        Some(atr) => (distance / atr, 1.0, 0.5, true),
        None => (distance / level * 100.0, 3.0, 1.0, false),
    };
    let beyond = |threshold: f64| {
        if inclusive {
            measure >= threshold
        } else {
            measure > threshold
        }
    };
    if beyond(strong_at) && volume_confirmed {
        Strength::Strong
    } else if beyond(moderate_at) || volume_confirmed {
        Strength::Moderate
    } else {
        Strength::Weak
    }
}

/// Signal table.
#[must_use]
pub fn breakout_signal(
    kind: BreakoutKind,
    strength: Option<Strength>,
    volume_confirmed: bool,
    warned: bool,
) -> BreakoutSignal {
    let graded = |strong, moderate, weak| match strength {
        Some(Strength::Strong) if volume_confirmed && !warned => strong,
        Some(Strength::Moderate) if !warned => moderate,
        _ => weak,
    };
    match kind {
        BreakoutKind::ResistanceBreakout => graded(
            BreakoutSignal::StrongBullish,
            BreakoutSignal::Bullish,
            BreakoutSignal::WeakBullish,
        ),
        BreakoutKind::SupportBreakdown => graded(
            BreakoutSignal::StrongBearish,
            BreakoutSignal::Bearish,
            BreakoutSignal::WeakBearish,
        ),
        BreakoutKind::TestingResistance => BreakoutSignal::PotentialBullish,
        BreakoutKind::TestingSupport => BreakoutSignal::PotentialBearish,
        BreakoutKind::InsideRange => BreakoutSignal::Neutral,
    }
}

/// Targets projected from `level` by fractions of `width`, upward or downward.
#[must_use]
pub fn project_targets(level: f64, width: f64, upward: bool) -> [f64; 3] {
    let sign = if upward { 1.0 } else { -1.0 };
    TARGET_RATIOS.map(|ratio| level + sign * ratio * width)
}

fn refined_level(values: &[f64], highs: bool, fallback: f64) -> Result<f64> {
    let pivots = if highs {
        pivot_highs(values, REFINED_PIVOT_ORDER, TieRule::Strict)?
    } else {
        pivot_lows(values, REFINED_PIVOT_ORDER, TieRule::Strict)?
    };
    let prices: Vec<f64> = pivots.into_iter().map(|i| values[i]).collect();
    Ok(mean(&prices).unwrap_or(fallback))
}

/// Wick rejections of `bar` against a `(top, bottom)` range.
fn wick_rejections(bar: &Bar, top: f64, bottom: f64) -> (bool, bool) {
    (
        bar.high > top && bar.close < top,
        bar.low < bottom && bar.close > bottom,
    )
}

/// The latest bar is judged against the breakout range. Earlier bars of the
/// scan window are judged against the `lookback` bars preceding the window.
fn false_breakout_flags(
    series: &Series,
    kind: BreakoutKind,
    range: (f64, f64),
    lookback: usize,
    scan_bars: usize,
) -> Vec<FalseBreakoutFlag> {
    let bars = series.bars();
    let volumes = series.volumes();
    let n = bars.len();
    let scan_start = n.saturating_sub(scan_bars.max(1));
    let before = &bars[scan_start.saturating_sub(lookback)..scan_start];

    let (mut upper, mut lower) = wick_rejections(&bars[n - 1], range.0, range.1);
    if !before.is_empty() {
        let top = before.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        let bottom = before.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
        for bar in &bars[scan_start..n - 1] {
            let (u, l) = wick_rejections(bar, top, bottom);
            upper |= u;
            lower |= l;
        }
    }

    let mut flags = Vec::new();
    if upper {
        flags.push(FalseBreakoutFlag::UpperWickRejection);
    }
    if lower {
        flags.push(FalseBreakoutFlag::LowerWickRejection);
    }

    let breaking = matches!(
        kind,
        BreakoutKind::ResistanceBreakout | BreakoutKind::SupportBreakdown
    );
    if breaking && n >= 2 && volumes[n - 1] < volumes[n - 2] {
        flags.push(FalseBreakoutFlag::VolumeDeclining);
    }
    if n >= 3 && volumes[n - 1] < volumes[n - 2] && volumes[n - 2] < volumes[n - 3] {
        flags.push(FalseBreakoutFlag::DecreasingVolume);
    }

    let latest: Candle<f64> = Candle::from(&bars[n - 1]);
    if latest
        .body_ratio()
        .is_some_and(|ratio| ratio < INDECISION_BODY_RATIO)
    {
        flags.push(FalseBreakoutFlag::Indecision);
    }
    flags
}

/// Classifies the latest bar against the preceding consolidation range.
///
/// # Errors
///
/// - `Error::InsufficientData` when the series is shorter than `lookback + 5`
///   bars after clamping the lookback to 10..=60
/// - `Error::InvalidPeriod` if the ATR period is zero
pub fn analyze_breakout(series: &Series, config: &BreakoutConfig) -> Result<BreakoutEvent> {
    let lookback = config.lookback.clamp(LOOKBACK_RANGE.0, LOOKBACK_RANGE.1);
    series.require(lookback + EXTRA_BARS, "breakout")?;

    let n = series.len();
    let window = n - 1 - lookback..n - 1;
    let highs = &series.highs()[window.clone()];
    let lows = &series.lows()[window.clone()];
    let latest = series.last();
    let mut numeric_guards = Vec::new();

    let range_high = highs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range_low = lows.iter().copied().fold(f64::INFINITY, f64::min);
    let range_width = range_high - range_low;
    if range_width <= 0.0 {
        note_guard(&mut numeric_guards, NumericGuard::ZeroRange);
    }
    let range_pct = range_width / range_low * 100.0;

    let atr_value = match atr(series.highs(), series.lows(), series.closes(), config.atr_period) {
        Ok(values) => last_finite(&values).filter(|v| *v > 0.0),
        Err(Error::InsufficientData { .. }) => None,
        Err(other) => return Err(other),
    };

    let avg_price = mean(&series.closes()[window.clone()]).unwrap_or(latest.close);
    let consolidation_threshold_pct = atr_value.map_or(CONSOLIDATION_FALLBACK_PCT, |a| {
        a / avg_price * 100.0 * CONSOLIDATION_ATR_MULTIPLE
    });

    let avg_volume = mean(&series.volumes()[window]).unwrap_or(0.0);
    let volume_ratio = if avg_volume > 0.0 {
        latest.volume / avg_volume
    } else {
        note_guard(&mut numeric_guards, NumericGuard::ZeroAverageVolume);
        0.0
    };
    let volume_confirmed = avg_volume > 0.0 && volume_ratio >= config.volume_threshold;

    let band = |level: f64| {
        atr_value.map_or(level * config.testing_band_pct / 100.0, |a| {
            a * config.testing_band_atr
        })
    };
    let kind = if latest.close > range_high {
        BreakoutKind::ResistanceBreakout
    } else if latest.close < range_low {
        BreakoutKind::SupportBreakdown
    } else if latest.high >= range_high - band(range_high) {
        BreakoutKind::TestingResistance
    } else if latest.low <= range_low + band(range_low) {
        BreakoutKind::TestingSupport
    } else {
        BreakoutKind::InsideRange
    };

    let (strength, atr_multiple, target_prices, stop_loss) = match kind {
        BreakoutKind::ResistanceBreakout => {
            let distance = latest.close - range_high;
            (
                Some(breakout_strength(distance, range_high, atr_value, volume_confirmed)),
                atr_value.map(|a| distance / a),
                Some(project_targets(range_high, range_width, true)),
                Some(range_low),
            )
        }
        BreakoutKind::SupportBreakdown => {
            let distance = range_low - latest.close;
            (
                Some(breakout_strength(distance, range_low, atr_value, volume_confirmed)),
                atr_value.map(|a| distance / a),
                Some(project_targets(range_low, range_width, false)),
                Some(range_high),
            )
        }
        BreakoutKind::TestingResistance => (
            None,
            None,
            Some(project_targets(range_high, range_width, true)),
            Some(range_low),
        ),
        BreakoutKind::TestingSupport => (
            None,
            None,
            Some(project_targets(range_low, range_width, false)),
            Some(range_high),
        ),
        BreakoutKind::InsideRange => (None, None, None, None),
    };

    let risk_reward = match (kind, target_prices, stop_loss) {
        (BreakoutKind::ResistanceBreakout, Some(targets), Some(stop)) => {
            let risk = latest.close - stop;
            (risk > 0.0).then(|| (targets[1] - latest.close) / risk)
        }
        (BreakoutKind::SupportBreakdown, Some(targets), Some(stop)) => {
            let risk = stop - latest.close;
            (risk > 0.0).then(|| (latest.close - targets[1]) / risk)
        }
        _ => None,
    };
    if strength.is_some() && risk_reward.is_none() {
        note_guard(&mut numeric_guards, NumericGuard::ZeroRisk);
    }

    let refined_resistance = refined_level(highs, true, range_high)?;
    let refined_support = refined_level(lows, false, range_low)?;

    let false_breakout_flags =
        false_breakout_flags(series, kind, (range_high, range_low), lookback, config.wick_scan_bars);
    let signal = breakout_signal(kind, strength, volume_confirmed, !false_breakout_flags.is_empty());

    Ok(BreakoutEvent {
        lookback,
        kind,
        range_high,
        range_low,
        range_width,
        range_pct,
        refined_resistance,
        refined_support,
        is_consolidating: range_pct < consolidation_threshold_pct,
        consolidation_threshold_pct,
        atr: atr_value,
        atr_multiple,
        current_price: latest.close,
        volume_ratio,
        volume_confirmed,
        strength,
        target_prices,
        stop_loss,
        risk_reward,
        false_breakout_flags,
        signal,
        numeric_guards,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::all, clippy::pedantic, clippy::nursery)]
    use super::*;
    use crate::series::Bar;
    use approx::assert_relative_eq;

    /// 30 bars oscillating inside 98..102 with volume 1000, then `latest`.
    fn range_then(latest: (f64, f64, f64, f64, f64)) -> Series {
        let mut bars: Vec<Bar> = (0..30)
            .map(|i| {
                let c = if i % 2 == 0 { 99.5 } else { 100.5 };
                Bar::new(i, 100.0, 102.0, 98.0, c, 1000.0)
            })
            .collect();
        let (o, h, l, c, v) = latest;
        bars.push(Bar::new(30, o, h, l, c, v));
        Series::normalize(bars).unwrap()
    }

    // ==================== Decision Table Tests ====================

    #[test]
    fn test_strength_with_atr() {
        assert_eq!(breakout_strength(2.0, 100.0, Some(2.0), true), Strength::Strong);
        assert_eq!(breakout_strength(2.0, 100.0, Some(2.0), false), Strength::Moderate);
        assert_eq!(breakout_strength(1.0, 100.0, Some(2.0), false), Strength::Moderate);
        assert_eq!(breakout_strength(0.5, 100.0, Some(2.0), true), Strength::Moderate);
        assert_eq!(breakout_strength(0.5, 100.0, Some(2.0), false), Strength::Weak);
    }

    #[test]
    fn test_strength_without_atr() {
        assert_eq!(breakout_strength(4.0, 100.0, None, true), Strength::Strong);
        assert_eq!(breakout_strength(3.0, 100.0, None, true), Strength::Moderate);
        assert_eq!(breakout_strength(1.5, 100.0, None, false), Strength::Moderate);
        assert_eq!(breakout_strength(1.0, 100.0, None, false), Strength::Weak);
    }

    #[test]
    fn test_signal_table() {
        use BreakoutKind as K;
        assert_eq!(
            breakout_signal(K::ResistanceBreakout, Some(Strength::Strong), true, false),
            BreakoutSignal::StrongBullish
        );
        assert_eq!(
            breakout_signal(K::ResistanceBreakout, Some(Strength::Strong), true, true),
            BreakoutSignal::WeakBullish
        );
        assert_eq!(
            breakout_signal(K::SupportBreakdown, Some(Strength::Moderate), false, false),
            BreakoutSignal::Bearish
        );
        assert_eq!(
            breakout_signal(K::SupportBreakdown, Some(Strength::Weak), false, false),
            BreakoutSignal::WeakBearish
        );
        assert_eq!(breakout_signal(K::TestingSupport, None, false, true), BreakoutSignal::PotentialBearish);
        assert_eq!(breakout_signal(K::InsideRange, None, true, false), BreakoutSignal::Neutral);
    }

    #[test]
    fn test_project_targets() {
        let up = project_targets(102.0, 4.0, true);
        assert_relative_eq!(up[0], 104.472, epsilon = 1e-9);
        assert_relative_eq!(up[1], 106.0, epsilon = 1e-9);
        assert_relative_eq!(up[2], 108.472, epsilon = 1e-9);
        let down = project_targets(98.0, 4.0, false);
        assert_relative_eq!(down[1], 94.0, epsilon = 1e-9);
    }

    // ==================== Analyzer Tests ====================

    #[test]
    fn test_confirmed_resistance_breakout() {
        let event = analyze_breakout(
            &range_then((101.5, 104.5, 101.0, 104.0, 1600.0)),
            &BreakoutConfig::default(),
        )
        .unwrap();
        assert_eq!(event.kind, BreakoutKind::ResistanceBreakout);
        assert_eq!((event.range_high, event.range_low), (102.0, 98.0));
        assert!(event.volume_confirmed);
        assert_relative_eq!(event.volume_ratio, 1.6, epsilon = 1e-12);
        assert!(event.strength.unwrap() >= Strength::Moderate);
        assert_eq!(event.stop_loss, Some(98.0));
        let targets = event.target_prices.unwrap();
        assert_relative_eq!(targets[1], 106.0, epsilon = 1e-9);
        // reward 2, risk 6
        assert_relative_eq!(event.risk_reward.unwrap(), 2.0 / 6.0, epsilon = 1e-9);
        assert!(event.atr.is_some());
        assert!(!event.false_breakout_flags.contains(&FalseBreakoutFlag::Indecision));
    }

    #[test]
    fn test_unconfirmed_breakdown_with_declining_volume() {
        let event = analyze_breakout(
            &range_then((98.5, 98.6, 96.0, 96.2, 500.0)),
            &BreakoutConfig::default(),
        )
        .unwrap();
        assert_eq!(event.kind, BreakoutKind::SupportBreakdown);
        assert!(!event.volume_confirmed);
        assert_eq!(event.stop_loss, Some(102.0));
        assert!(event
            .false_breakout_flags
            .contains(&FalseBreakoutFlag::VolumeDeclining));
        assert!(matches!(
            event.signal,
            BreakoutSignal::WeakBearish | BreakoutSignal::Bearish
        ));
        assert_eq!(event.signal, BreakoutSignal::WeakBearish);
    }

    #[test]
    fn test_wick_above_range_is_testing_with_rejection() {
        let event = analyze_breakout(
            &range_then((100.0, 103.0, 99.8, 101.5, 1000.0)),
            &BreakoutConfig::default(),
        )
        .unwrap();
        assert_eq!(event.kind, BreakoutKind::TestingResistance);
        assert_eq!(event.strength, None);
        assert!(event
            .false_breakout_flags
            .contains(&FalseBreakoutFlag::UpperWickRejection));
        assert_eq!(event.signal, BreakoutSignal::PotentialBullish);
        assert_eq!(event.risk_reward, None);
    }

    #[test]
    fn test_earlier_wick_in_scan_window_is_flagged() {
        // Bar 30 pokes above the 98..102 range and closes back inside; three
        // quiet bars follow. The breakout range now tops at 103.5, but the
        // wick is judged against the range before the scan window.
        let mut bars: Vec<Bar> = (0..30)
            .map(|i| {
                let c = if i % 2 == 0 { 99.5 } else { 100.5 };
                Bar::new(i, 100.0, 102.0, 98.0, c, 1000.0)
            })
            .collect();
        bars.push(Bar::new(30, 101.0, 103.5, 100.5, 101.5, 1000.0));
        for i in 31..34 {
            bars.push(Bar::new(i, 100.0, 100.6, 99.6, 100.2, 1000.0));
        }
        let event = analyze_breakout(&Series::normalize(bars).unwrap(), &BreakoutConfig::default())
            .unwrap();
        assert_eq!(event.range_high, 103.5);
        assert!(event
            .false_breakout_flags
            .contains(&FalseBreakoutFlag::UpperWickRejection));
        assert!(!event
            .false_breakout_flags
            .contains(&FalseBreakoutFlag::LowerWickRejection));
    }

    #[test]
    fn test_inside_range() {
        let config = BreakoutConfig {
            testing_band_atr: 0.1,
            ..BreakoutConfig::default()
        };
        let event = analyze_breakout(&range_then((99.6, 100.8, 99.4, 100.6, 1000.0)), &config).unwrap();
        assert_eq!(event.kind, BreakoutKind::InsideRange);
        assert_eq!(event.target_prices, None);
        assert_eq!(event.signal, BreakoutSignal::Neutral);
        assert!(event.is_consolidating);
    }

    #[test]
    fn test_zero_volume_is_unconfirmed() {
        let bars: Vec<Bar> = (0..26)
            .map(|i| Bar::new(i, 100.0, 102.0, 98.0, 100.0 + (i % 2) as f64, 0.0))
            .chain([Bar::new(26, 101.0, 106.0, 101.0, 105.0, 0.0)])
            .collect();
        let event = analyze_breakout(&Series::normalize(bars).unwrap(), &BreakoutConfig::default()).unwrap();
        assert_eq!(event.kind, BreakoutKind::ResistanceBreakout);
        assert!(!event.volume_confirmed);
        assert!(event.numeric_guards.contains(&NumericGuard::ZeroAverageVolume));
    }

    #[test]
    fn test_lookback_clamped_and_required() {
        let config = BreakoutConfig {
            lookback: 3,
            ..BreakoutConfig::default()
        };
        let bars: Vec<Bar> = (0..14)
            .map(|i| Bar::new(i, 100.0, 101.0, 99.0, 100.0, 10.0))
            .collect();
        let err = analyze_breakout(&Series::normalize(bars).unwrap(), &config).unwrap_err();
        assert!(matches!(err, Error::InsufficientData { required: 15, actual: 14, .. }));
    }
}
