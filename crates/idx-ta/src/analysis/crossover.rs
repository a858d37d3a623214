//! Moving-average crossover detection.
//!
//! Four pairs are monitored: SMA20/SMA50, SMA50/SMA200 (long histories only),
//! EMA9/EMA21 and EMA12/EMA26. A cross is a strict sign change of
//! `fast − slow` between two consecutive bars inside the trailing window;
//! bars where either average is undefined are skipped. The analysis also
//! reports the latest close's distance from every average and a 0 to 100
//! composite score.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::CrossoverConfig;
use crate::error::NumericGuard;
use crate::indicators::{ema, sma};
use crate::series::Series;

use super::{note_guard, Direction};

/// Averaging method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaMethod {
    /// Simple moving average.
    Sma,
    /// Exponential moving average.
    Ema,
}

/// A moving average of the closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MovingAverage {
    /// Averaging method.
    pub method: MaMethod,
    /// Window length in bars.
    pub period: usize,
}

impl MovingAverage {
    const fn sma(period: usize) -> Self {
        Self {
            method: MaMethod::Sma,
            period,
        }
    }

    const fn ema(period: usize) -> Self {
        Self {
            method: MaMethod::Ema,
            period,
        }
    }

    /// Values over `closes`, `None` when the series is shorter than the period.
    fn compute(self, closes: &[f64]) -> Option<Vec<f64>> {
        match self.method {
            MaMethod::Sma => sma(closes, self.period).ok(),
            MaMethod::Ema => ema(closes, self.period).ok(),
        }
    }
}

impl fmt::Display for MovingAverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let method = match self.method {
            MaMethod::Sma => "SMA",
            MaMethod::Ema => "EMA",
        };
        write!(f, "{method}{}", self.period)
    }
}

/// Every average whose distance from price is reported.
const TRACKED: [MovingAverage; 7] = [
    MovingAverage::sma(20),
    MovingAverage::sma(50),
    MovingAverage::sma(200),
    MovingAverage::ema(9),
    MovingAverage::ema(12),
    MovingAverage::ema(21),
    MovingAverage::ema(26),
];

/// Monitored fast/slow pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CrossPair {
    /// Short-term trend.
    #[serde(rename = "SMA_20_50")]
    Sma20Sma50,
    /// The classic golden/death cross.
    #[serde(rename = "SMA_50_200")]
    Sma50Sma200,
    /// Swing-trading pair.
    #[serde(rename = "EMA_9_21")]
    Ema9Ema21,
    /// MACD-style pair.
    #[serde(rename = "EMA_12_26")]
    Ema12Ema26,
}

impl CrossPair {
    /// All pairs in report order.
    pub const ALL: [Self; 4] = [
        Self::Sma20Sma50,
        Self::Sma50Sma200,
        Self::Ema9Ema21,
        Self::Ema12Ema26,
    ];

    /// Fast and slow averages.
    #[must_use]
    pub const fn averages(self) -> (MovingAverage, MovingAverage) {
        match self {
            Self::Sma20Sma50 => (MovingAverage::sma(20), MovingAverage::sma(50)),
            Self::Sma50Sma200 => (MovingAverage::sma(50), MovingAverage::sma(200)),
            Self::Ema9Ema21 => (MovingAverage::ema(9), MovingAverage::ema(21)),
            Self::Ema12Ema26 => (MovingAverage::ema(12), MovingAverage::ema(26)),
        }
    }

    const fn event_kind(self, direction: Direction) -> CrossKind {
        let ema = matches!(self, Self::Ema9Ema21 | Self::Ema12Ema26);
        match (ema, direction) {
            (false, Direction::Bullish) => CrossKind::GoldenCross,
            (false, _) => CrossKind::DeathCross,
            (true, Direction::Bullish) => CrossKind::EmaCrossUp,
            (true, _) => CrossKind::EmaCrossDown,
        }
    }
}

/// Crossover event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CrossKind {
    /// SMA fast crossed above slow.
    GoldenCross,
    /// SMA fast crossed below slow.
    DeathCross,
    /// EMA fast crossed above slow.
    EmaCrossUp,
    /// EMA fast crossed below slow.
    EmaCrossDown,
}

impl CrossKind {
    /// Direction implied by the cross.
    #[must_use]
    pub const fn direction(self) -> Direction {
        match self {
            Self::GoldenCross | Self::EmaCrossUp => Direction::Bullish,
            Self::DeathCross | Self::EmaCrossDown => Direction::Bearish,
        }
    }
}

/// One crossover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossEvent {
    /// Pair that crossed.
    pub pair: CrossPair,
    /// Fast average.
    pub fast_ma: MovingAverage,
    /// Slow average.
    pub slow_ma: MovingAverage,
    /// Event type.
    pub kind: CrossKind,
    /// Bar on which the sign changed.
    pub index: usize,
    /// Timestamp of that bar.
    pub timestamp: i64,
    /// Bars between the event and the latest bar.
    pub bars_ago: usize,
    /// Fast average on the event bar.
    pub fast_value: f64,
    /// Slow average on the event bar.
    pub slow_value: f64,
}

/// Current state of one pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairState {
    /// The pair.
    pub pair: CrossPair,
    /// Latest fast value.
    pub fast_value: Option<f64>,
    /// Latest slow value.
    pub slow_value: Option<f64>,
    /// Bullish when fast is above slow; `None` when either is undefined.
    pub alignment: Option<Direction>,
    /// Most recent cross inside the window.
    pub latest_cross: Option<CrossEvent>,
}

/// Where the close sits relative to an average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaPosition {
    /// More than 10 % above.
    FarAbove,
    /// 5 % to 10 % above.
    Above,
    /// Up to 5 % above.
    SlightlyAbove,
    /// Up to 5 % below.
    SlightlyBelow,
    /// 5 % to 10 % below.
    Below,
    /// More than 10 % below.
    FarBelow,
    /// Average is zero.
    Unknown,
}

impl MaPosition {
    /// Buckets a signed percentage distance.
    #[must_use]
    pub fn from_distance(distance_pct: f64) -> Self {
        if distance_pct > 10.0 {
            Self::FarAbove
        } else if distance_pct > 5.0 {
            Self::Above
        } else if distance_pct > 0.0 {
            Self::SlightlyAbove
        } else if distance_pct > -5.0 {
            Self::SlightlyBelow
        } else if distance_pct > -10.0 {
            Self::Below
        } else {
            Self::FarBelow
        }
    }
}

/// Distance of the latest close from one average.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaDistance {
    /// The average.
    pub ma: MovingAverage,
    /// Its latest value.
    pub value: f64,
    /// `(close − value) / value × 100`, zero when the average is zero.
    pub distance_pct: f64,
    /// Bucket.
    pub position: MaPosition,
}

/// Composite recommendation bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rating {
    /// Score ≥ 70.
    StrongBuy,
    /// Score ≥ 55.
    Buy,
    /// Score ≥ 45.
    Neutral,
    /// Score ≥ 30.
    Sell,
    /// Below 30.
    StrongSell,
}

impl Rating {
    /// Bucket for a clamped score.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= 70.0 {
            Self::StrongBuy
        } else if score >= 55.0 {
            Self::Buy
        } else if score >= 45.0 {
            Self::Neutral
        } else if score >= 30.0 {
            Self::Sell
        } else {
            Self::StrongSell
        }
    }
}

/// Crossover analysis result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossoverAnalysis {
    /// Latest close.
    pub current_price: f64,
    /// Bars searched for crosses.
    pub lookback_days: usize,
    /// State of every monitored pair that could be computed.
    pub pairs: Vec<PairState>,
    /// Every cross inside the window, in bar order.
    pub events: Vec<CrossEvent>,
    /// Distance from each average that could be computed.
    pub distances: Vec<MaDistance>,
    /// Composite score, 0 to 100.
    pub score: u8,
    /// Bucket of the score.
    pub rating: Rating,
    /// True when no pair could be evaluated.
    pub insufficient_data: bool,
    /// Zero-denominator cases resolved locally.
    pub numeric_guards: Vec<NumericGuard>,
}

/// Strict sign changes of `fast − slow` at indices `from..len`.
///
/// Returns `(index, direction)` pairs in bar order; a touch without a sign
/// change is not a cross.
#[must_use]
pub fn find_crosses(fast: &[f64], slow: &[f64], from: usize) -> Vec<(usize, Direction)> {
    let n = fast.len().min(slow.len());
    let mut crosses = Vec::new();
    for i in from.max(1)..n {
        let (f0, s0, f1, s1) = (fast[i - 1], slow[i - 1], fast[i], slow[i]);
        if f0.is_nan() || s0.is_nan() || f1.is_nan() || s1.is_nan() {
            continue;
        }
        if f0 < s0 && f1 > s1 {
            crosses.push((i, Direction::Bullish));
        } else if f0 > s0 && f1 < s1 {
            crosses.push((i, Direction::Bearish));
        }
    }
    crosses
}

/// Composite score before rounding, clamped to 0..=100.
///
/// Alignment contributes up to ±20, window crosses ±10 each capped at ±20,
/// and the close's distance from SMA200 (when known) +10, +5, −5 or −10.
#[must_use]
pub fn composite_score(pairs: &[PairState], events: &[CrossEvent], sma200_distance: Option<f64>) -> f64 {
    let mut score = 50.0;

    let aligned: Vec<Direction> = pairs.iter().filter_map(|p| p.alignment).collect();
    if !aligned.is_empty() {
        let net: i32 = aligned.iter().map(|d| d.sign()).sum();
        score += f64::from(net) / aligned.len() as f64 * 20.0;
    }

    let net_crosses: i32 = events.iter().map(|e| e.kind.direction().sign()).sum();
    score += f64::from((net_crosses * 10).clamp(-20, 20));

    if let Some(dist) = sma200_distance {
        score += if dist > 0.0 && dist < 10.0 {
            10.0
        } else if dist >= 10.0 {
            5.0
        } else if dist > -10.0 && dist < 0.0 {
            -5.0
        } else {
            -10.0
        };
    }

    score.clamp(0.0, 100.0)
}

fn distance(ma: MovingAverage, value: f64, close: f64, guards: &mut Vec<NumericGuard>) -> MaDistance {
    if value == 0.0 {
        note_guard(guards, NumericGuard::ZeroBase);
        return MaDistance {
            ma,
            value,
            distance_pct: 0.0,
            position: MaPosition::Unknown,
        };
    }
    let distance_pct = (close - value) / value * 100.0;
    MaDistance {
        ma,
        value,
        distance_pct,
        position: MaPosition::from_distance(distance_pct),
    }
}

/// Scans the monitored pairs for crosses in the trailing window.
#[must_use]
pub fn analyze_crossovers(series: &Series, config: &CrossoverConfig) -> CrossoverAnalysis {
    let closes = series.closes();
    let bars = series.bars();
    let n = closes.len();
    let current_price = series.last().close;
    let window_start = n.saturating_sub(config.lookback_days);
    let long_history = n >= config.long_pair_min_bars;
    let mut numeric_guards = Vec::new();

    let computed: Vec<(MovingAverage, Vec<f64>)> = TRACKED
        .iter()
        .filter(|ma| ma.period != 200 || long_history)
        .filter_map(|&ma| ma.compute(closes).map(|values| (ma, values)))
        .collect();
    let lookup = |ma: MovingAverage| computed.iter().find(|(m, _)| *m == ma).map(|(_, v)| v);

    let mut pairs = Vec::new();
    let mut events = Vec::new();
    for pair in CrossPair::ALL {
        let (fast_ma, slow_ma) = pair.averages();
        let (Some(fast), Some(slow)) = (lookup(fast_ma), lookup(slow_ma)) else {
            continue;
        };
        let fast_value = fast.last().copied().filter(|v| v.is_finite());
        let slow_value = slow.last().copied().filter(|v| v.is_finite());
        let alignment = match (fast_value, slow_value) {
            (Some(f), Some(s)) if f > s => Some(Direction::Bullish),
            (Some(_), Some(_)) => Some(Direction::Bearish),
            _ => None,
        };

        let pair_events: Vec<CrossEvent> = find_crosses(fast, slow, window_start)
            .into_iter()
            .map(|(index, direction)| CrossEvent {
                pair,
                fast_ma,
                slow_ma,
                kind: pair.event_kind(direction),
                index,
                timestamp: bars[index].timestamp,
                bars_ago: n - 1 - index,
                fast_value: fast[index],
                slow_value: slow[index],
            })
            .collect();

        pairs.push(PairState {
            pair,
            fast_value,
            slow_value,
            alignment,
            latest_cross: pair_events.last().cloned(),
        });
        events.extend(pair_events);
    }
    events.sort_by_key(|e| (e.index, e.pair));

    let distances: Vec<MaDistance> = computed
        .iter()
        .filter_map(|(ma, values)| {
            let value = values.last().copied().filter(|v| v.is_finite())?;
            Some(distance(*ma, value, current_price, &mut numeric_guards))
        })
        .collect();
    let sma200_distance = distances
        .iter()
        .find(|d| d.ma == MovingAverage::sma(200))
        .map(|d| d.distance_pct);

    let score = composite_score(&pairs, &events, sma200_distance);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let rounded = score.round() as u8;

    CrossoverAnalysis {
        current_price,
        lookback_days: config.lookback_days,
        insufficient_data: pairs.is_empty(),
        pairs,
        events,
        distances,
        score: rounded,
        rating: Rating::from_score(score),
        numeric_guards,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::all, clippy::pedantic, clippy::nursery)]
    use super::*;
    use crate::series::Bar;

    fn series_from_closes(closes: &[f64]) -> Series {
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar::new(i as i64 * 86_400, c, c * 1.01, c * 0.99, c, 1_000.0))
            .collect();
        Series::normalize(bars).unwrap()
    }

    // ==================== Cross Detection Tests ====================

    #[test]
    fn test_find_crosses_strict() {
        let fast = [1.0, 2.0, 4.0, 3.0, 1.0];
        let slow = [2.0, 3.0, 3.0, 3.0, 2.0];
        // 2→4 crosses up at 2; 4→3 touches (not a cross); 3→1 is not strict from equality
        assert_eq!(find_crosses(&fast, &slow, 0), vec![(2, Direction::Bullish)]);
    }

    #[test]
    fn test_find_crosses_skips_nan_and_window() {
        let fast = [f64::NAN, 1.0, 3.0, 1.0];
        let slow = [2.0, 2.0, 2.0, 2.0];
        assert_eq!(
            find_crosses(&fast, &slow, 0),
            vec![(2, Direction::Bullish), (3, Direction::Bearish)]
        );
        assert_eq!(find_crosses(&fast, &slow, 3), vec![(3, Direction::Bearish)]);
    }

    #[test]
    fn test_event_kind_by_pair() {
        assert_eq!(CrossPair::Sma50Sma200.event_kind(Direction::Bullish), CrossKind::GoldenCross);
        assert_eq!(CrossPair::Sma20Sma50.event_kind(Direction::Bearish), CrossKind::DeathCross);
        assert_eq!(CrossPair::Ema12Ema26.event_kind(Direction::Bullish), CrossKind::EmaCrossUp);
        assert_eq!(CrossPair::Ema9Ema21.event_kind(Direction::Bearish), CrossKind::EmaCrossDown);
    }

    // ==================== Decision Table Tests ====================

    #[test]
    fn test_distance_buckets() {
        assert_eq!(MaPosition::from_distance(12.0), MaPosition::FarAbove);
        assert_eq!(MaPosition::from_distance(10.0), MaPosition::Above);
        assert_eq!(MaPosition::from_distance(3.0), MaPosition::SlightlyAbove);
        assert_eq!(MaPosition::from_distance(0.0), MaPosition::SlightlyBelow);
        assert_eq!(MaPosition::from_distance(-5.0), MaPosition::Below);
        assert_eq!(MaPosition::from_distance(-10.0), MaPosition::FarBelow);
    }

    #[test]
    fn test_rating_buckets() {
        assert_eq!(Rating::from_score(70.0), Rating::StrongBuy);
        assert_eq!(Rating::from_score(69.9), Rating::Buy);
        assert_eq!(Rating::from_score(50.0), Rating::Neutral);
        assert_eq!(Rating::from_score(30.0), Rating::Sell);
        assert_eq!(Rating::from_score(29.0), Rating::StrongSell);
    }

    #[test]
    fn test_composite_score_components() {
        let state = |alignment| PairState {
            pair: CrossPair::Sma20Sma50,
            fast_value: Some(1.0),
            slow_value: Some(1.0),
            alignment: Some(alignment),
            latest_cross: None,
        };
        let pairs = vec![state(Direction::Bullish), state(Direction::Bearish)];
        assert_eq!(composite_score(&pairs, &[], None), 50.0);
        assert_eq!(composite_score(&pairs, &[], Some(5.0)), 60.0);
        assert_eq!(composite_score(&pairs, &[], Some(15.0)), 55.0);
        assert_eq!(composite_score(&pairs, &[], Some(-5.0)), 45.0);
        assert_eq!(composite_score(&pairs, &[], Some(0.0)), 40.0);
        assert_eq!(composite_score(&pairs, &[], Some(-20.0)), 40.0);
    }

    #[test]
    fn test_composite_score_caps_crosses() {
        let event = CrossEvent {
            pair: CrossPair::Ema9Ema21,
            fast_ma: MovingAverage::ema(9),
            slow_ma: MovingAverage::ema(21),
            kind: CrossKind::EmaCrossUp,
            index: 0,
            timestamp: 0,
            bars_ago: 0,
            fast_value: 1.0,
            slow_value: 1.0,
        };
        let events = vec![event.clone(), event.clone(), event];
        assert_eq!(composite_score(&[], &events, None), 70.0);
    }

    // ==================== Analyzer Tests ====================

    #[test]
    fn test_rising_series_fully_aligned() {
        let closes: Vec<f64> = (0..100).map(|i| 1000.0 + 5.0 * i as f64).collect();
        let analysis = analyze_crossovers(&series_from_closes(&closes), &CrossoverConfig::default());
        assert!(!analysis.insufficient_data);
        assert_eq!(analysis.pairs.len(), 3);
        assert!(analysis
            .pairs
            .iter()
            .all(|p| p.alignment == Some(Direction::Bullish) && p.latest_cross.is_none()));
        assert!(analysis.events.is_empty());
        assert_eq!(analysis.score, 70);
        assert_eq!(analysis.rating, Rating::StrongBuy);
        assert!(analysis.distances.iter().all(|d| d.distance_pct > 0.0));
        assert!(analysis.distances.iter().all(|d| d.ma.period != 200));
    }

    #[test]
    fn test_v_shape_emits_ema_cross_up() {
        let mut closes: Vec<f64> = (0..60).map(|i| 2000.0 - 10.0 * i as f64).collect();
        closes.extend((1..=40).map(|i| 1410.0 + 20.0 * i as f64));
        let config = CrossoverConfig {
            lookback_days: 60,
            ..CrossoverConfig::default()
        };
        let analysis = analyze_crossovers(&series_from_closes(&closes), &config);
        let ema_pair = analysis
            .pairs
            .iter()
            .find(|p| p.pair == CrossPair::Ema9Ema21)
            .unwrap();
        let cross = ema_pair.latest_cross.as_ref().expect("cross");
        assert_eq!(cross.kind, CrossKind::EmaCrossUp);
        assert!(cross.index > 60);
        assert_eq!(cross.bars_ago, 99 - cross.index);
        assert_eq!(cross.fast_ma.to_string(), "EMA9");
        assert!(analysis.events.windows(2).all(|w| w[0].index <= w[1].index));
    }

    #[test]
    fn test_short_series_insufficient() {
        let closes: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        let analysis = analyze_crossovers(&series_from_closes(&closes), &CrossoverConfig::default());
        assert!(analysis.insufficient_data);
        assert!(analysis.pairs.is_empty());
        assert_eq!(analysis.score, 50);
        assert_eq!(analysis.rating, Rating::Neutral);
    }

    #[test]
    fn test_long_pair_needs_long_history() {
        let closes: Vec<f64> = (0..220).map(|i| 5000.0 + i as f64).collect();
        let analysis = analyze_crossovers(&series_from_closes(&closes), &CrossoverConfig::default());
        assert_eq!(analysis.pairs.len(), 4);
        let sma200 = analysis
            .distances
            .iter()
            .find(|d| d.ma == MovingAverage::sma(200))
            .unwrap();
        // 5219 against 5119.5
        assert_eq!(sma200.position, MaPosition::SlightlyAbove);
        assert_eq!(analysis.score, 80);
    }
}
