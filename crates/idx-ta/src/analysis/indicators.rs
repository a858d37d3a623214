//! Indicator snapshot, support/resistance and an overall verdict.
//!
//! Every reading is taken at the latest bar and is optional: a series too
//! short for one kernel still gets the others. The verdict weighs the
//! readings that exist:
//!
//! | input | bullish | bearish |
//! |-------|---------|---------|
//! | MACD line vs signal | +1.5 above | +1.5 below |
//! | ADX strong / developing | +2 / +1 when +DI leads | +2 / +1 when −DI leads |
//! | share of MAs below price | +2 all, +1 ≥ 0.67 | +2 none, +1 ≤ 0.33 |
//!
//! One side must lead by more than a point. RSI does not vote; an extreme
//! reading only qualifies the verdict (`BULLISH_BUT_OVERBOUGHT`,
//! `BEARISH_BUT_OVERSOLD`), since momentum on IDX names often runs well past
//! the usual 70/30 bounds.

use serde::{Deserialize, Serialize};

use crate::config::{IndicatorsConfig, TrendStrengthConfig};
use crate::error::{Error, NumericGuard, Result};
use crate::indicators::{atr, bollinger, ema, macd, obv, rsi, sma, stochastic};
use crate::series::Series;
use crate::utils::last_finite;

use super::trend_strength::{analyze_trend_strength, TrendClass, TrendState};
use super::{note_guard, Direction};

/// Share of moving averages under the price that counts as a majority.
const MA_MAJORITY: f64 = 0.67;
/// Share at or below which the moving averages lean bearish.
const MA_MINORITY: f64 = 0.33;
/// Stochastic and Bollinger position bounds.
const BAND_OVERBOUGHT: f64 = 80.0;
const BAND_OVERSOLD: f64 = 20.0;

/// Turns a short-history error into a missing reading.
fn optional<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(Error::InsufficientData { .. }) => Ok(None),
        Err(other) => Err(other),
    }
}

/// Where an oscillator sits against its bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Zone {
    /// Above the upper bound.
    Overbought,
    /// Below the lower bound.
    Oversold,
    /// In between.
    Neutral,
}

impl Zone {
    /// Strict comparison against both bounds.
    #[must_use]
    pub fn classify(value: f64, overbought: f64, oversold: f64) -> Self {
        if value > overbought {
            Self::Overbought
        } else if value < oversold {
            Self::Oversold
        } else {
            Self::Neutral
        }
    }
}

/// Latest RSI.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RsiReading {
    /// RSI, 0 to 100.
    pub value: f64,
    /// Against the configured 70/30 bounds.
    pub zone: Zone,
}

/// Latest MACD.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdReading {
    /// Fast EMA minus slow EMA.
    pub macd_line: f64,
    /// EMA of the MACD line.
    pub signal_line: f64,
    /// Line minus signal.
    pub histogram: f64,
    /// Bullish when the line is above the signal.
    pub direction: Direction,
}

/// Moving-average flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaKind {
    /// Simple.
    Sma,
    /// Exponential.
    Ema,
}

/// One moving average against the latest close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaReading {
    /// Simple or exponential.
    pub kind: MaKind,
    /// Period in bars.
    pub period: usize,
    /// Average at the latest bar.
    pub value: f64,
    /// Latest close strictly above the average.
    pub price_above: bool,
}

/// Latest Bollinger Bands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerReading {
    /// Upper band.
    pub upper: f64,
    /// Middle band.
    pub middle: f64,
    /// Lower band.
    pub lower: f64,
    /// Upper minus lower.
    pub width: f64,
    /// Close position in the band: 0 at the lower band, 100 at the upper.
    pub position_pct: f64,
    /// Against 80/20.
    pub zone: Zone,
}

/// Latest slow stochastic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StochasticReading {
    /// Smoothed %K.
    pub k: f64,
    /// %D.
    pub d: f64,
    /// %K against 80/20.
    pub zone: Zone,
}

/// Combined verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallSignal {
    /// Bullish side leads.
    Bullish,
    /// Bullish side leads but RSI is extreme.
    BullishButOverbought,
    /// No clear lead.
    Neutral,
    /// Bearish side leads but RSI is oversold.
    BearishButOversold,
    /// Bearish side leads.
    Bearish,
}

/// Weighted tallies behind the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalScore {
    /// Bullish weight.
    pub bullish: f64,
    /// Bearish weight.
    pub bearish: f64,
    /// Resulting verdict.
    pub signal: OverallSignal,
}

/// Inputs to [`score_signal`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SignalInputs {
    /// Latest RSI.
    pub rsi: Option<f64>,
    /// MACD line against its signal.
    pub macd: Option<Direction>,
    /// ADX class and DI direction.
    pub adx: Option<(TrendClass, Direction)>,
    /// Moving averages under the close.
    pub ma_above: usize,
    /// Moving averages available.
    pub ma_total: usize,
}

fn add(score: &mut (f64, f64), direction: Direction, weight: f64) {
    match direction {
        Direction::Bullish => score.0 += weight,
        Direction::Bearish => score.1 += weight,
        Direction::Neutral => {}
    }
}

/// Weighs the readings into a verdict.
#[must_use]
pub fn score_signal(inputs: &SignalInputs, config: &IndicatorsConfig) -> SignalScore {
    let mut score = (0.0, 0.0);

    if let Some(direction) = inputs.macd {
        add(&mut score, direction, 1.5);
    }
    match inputs.adx {
        Some((TrendClass::Strong, direction)) => add(&mut score, direction, 2.0),
        Some((TrendClass::Developing, direction)) => add(&mut score, direction, 1.0),
        _ => {}
    }
    if inputs.ma_total > 0 {
        #[allow(clippy::cast_precision_loss)]
        let share = inputs.ma_above as f64 / inputs.ma_total as f64;
        if inputs.ma_above == inputs.ma_total {
            score.0 += 2.0;
        } else if share >= MA_MAJORITY {
            score.0 += 1.0;
        } else if inputs.ma_above == 0 {
            score.1 += 2.0;
        } else if share <= MA_MINORITY {
            score.1 += 1.0;
        }
    }

    let (bullish, bearish) = score;
    let signal = if bullish > bearish + 1.0 {
        if inputs.rsi.is_some_and(|r| r > config.rsi_extreme) {
            OverallSignal::BullishButOverbought
        } else {
            OverallSignal::Bullish
        }
    } else if bearish > bullish + 1.0 {
        if inputs.rsi.is_some_and(|r| r < config.rsi_oversold) {
            OverallSignal::BearishButOversold
        } else {
            OverallSignal::Bearish
        }
    } else {
        OverallSignal::Neutral
    };

    SignalScore {
        bullish,
        bearish,
        signal,
    }
}

/// Distinct extreme highs and lows of the trailing `window` bars.
///
/// Resistance is listed highest first, support lowest first. Repeated
/// prices collapse, so fewer than `count` levels can come back.
#[must_use]
pub fn support_resistance(series: &Series, window: usize, count: usize) -> (Vec<f64>, Vec<f64>) {
    let start = series.len().saturating_sub(window);
    let pick = |values: &[f64], descending: bool| {
        let mut sorted = values[start..].to_vec();
        sorted.sort_by(|a, b| {
            if descending {
                b.total_cmp(a)
            } else {
                a.total_cmp(b)
            }
        });
        sorted.truncate(count);
        sorted.dedup();
        sorted
    };
    (pick(series.lows(), false), pick(series.highs(), true))
}

/// Indicator readings at the latest bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    /// Latest close.
    pub current_price: f64,
    /// RSI reading.
    pub rsi: Option<RsiReading>,
    /// MACD reading.
    pub macd: Option<MacdReading>,
    /// Configured SMAs then EMAs, skipping periods longer than the series.
    pub moving_averages: Vec<MaReading>,
    /// Bollinger reading.
    pub bollinger: Option<BollingerReading>,
    /// Stochastic reading.
    pub stochastic: Option<StochasticReading>,
    /// Latest ATR.
    pub atr: Option<f64>,
    /// Latest on-balance volume.
    pub obv: f64,
    /// Volume-weighted typical price over the level window.
    pub vwap: Option<f64>,
    /// ADX reading.
    pub adx: Option<TrendState>,
    /// Support levels, lowest first.
    pub support_levels: Vec<f64>,
    /// Resistance levels, highest first.
    pub resistance_levels: Vec<f64>,
    /// Verdict and the weights behind it.
    pub score: SignalScore,
    /// True when RSI or MACD could not be computed.
    pub insufficient_data: bool,
    /// Zero-denominator cases resolved locally.
    pub numeric_guards: Vec<NumericGuard>,
}

fn moving_averages(series: &Series, config: &IndicatorsConfig) -> Result<Vec<MaReading>> {
    let closes = series.closes();
    let close = series.last().close;
    let requests = config
        .sma_periods
        .iter()
        .map(|&p| (MaKind::Sma, p))
        .chain(config.ema_periods.iter().map(|&p| (MaKind::Ema, p)));

    let mut readings = Vec::new();
    for (kind, period) in requests {
        let column = match kind {
            MaKind::Sma => optional(sma(closes, period))?,
            MaKind::Ema => optional(ema(closes, period))?,
        };
        if let Some(value) = column.as_deref().and_then(last_finite) {
            readings.push(MaReading {
                kind,
                period,
                value,
                price_above: close > value,
            });
        }
    }
    Ok(readings)
}

fn vwap(series: &Series, window: usize) -> Option<f64> {
    let start = series.len().saturating_sub(window);
    let (weighted, volume) = series.bars()[start..]
        .iter()
        .fold((0.0, 0.0), |(w, v), bar| {
            let typical = (bar.high + bar.low + bar.close) / 3.0;
            (w + typical * bar.volume, v + bar.volume)
        });
    (volume > 0.0).then(|| weighted / volume)
}

/// Takes every indicator reading at the latest bar and scores them.
///
/// # Errors
///
/// `Error::InvalidPeriod` or `Error::InvalidParameter` for unusable
/// parameters. Short history only leaves readings empty.
pub fn analyze_indicators(
    series: &Series,
    config: &IndicatorsConfig,
    trend: &TrendStrengthConfig,
) -> Result<IndicatorSnapshot> {
    let (highs, lows, closes) = (series.highs(), series.lows(), series.closes());
    let current_price = series.last().close;
    let mut numeric_guards = Vec::new();

    let rsi_reading = optional(rsi(closes, config.rsi_period))?
        .as_deref()
        .and_then(last_finite)
        .map(|value| RsiReading {
            value,
            zone: Zone::classify(value, config.rsi_overbought, config.rsi_oversold),
        });

    let macd_reading = optional(macd(closes, config.macd_fast, config.macd_slow, config.macd_signal))?
        .and_then(|out| {
            let line = last_finite(&out.macd_line)?;
            let signal = last_finite(&out.signal_line)?;
            let direction = if line > signal {
                Direction::Bullish
            } else if line < signal {
                Direction::Bearish
            } else {
                Direction::Neutral
            };
            Some(MacdReading {
                macd_line: line,
                signal_line: signal,
                histogram: line - signal,
                direction,
            })
        });

    let moving_averages = moving_averages(series, config)?;

    let bollinger_reading = optional(bollinger(closes, config.bollinger_period, config.bollinger_k))?
        .and_then(|bands| {
            let upper = last_finite(&bands.upper)?;
            let middle = last_finite(&bands.middle)?;
            let lower = last_finite(&bands.lower)?;
            Some((upper, middle, lower))
        })
        .map(|(upper, middle, lower)| {
            let width = upper - lower;
            let position_pct = if width > 0.0 {
                (current_price - lower) / width * 100.0
            } else {
                note_guard(&mut numeric_guards, NumericGuard::ZeroRange);
                50.0
            };
            BollingerReading {
                upper,
                middle,
                lower,
                width,
                position_pct,
                zone: Zone::classify(position_pct, BAND_OVERBOUGHT, BAND_OVERSOLD),
            }
        });

    let stochastic_reading = optional(stochastic(
        highs,
        lows,
        closes,
        config.stoch_k,
        config.stoch_smooth,
        config.stoch_d,
    ))?
    .and_then(|out| {
        let k = last_finite(&out.k)?;
        let d = last_finite(&out.d)?;
        Some(StochasticReading {
            k,
            d,
            zone: Zone::classify(k, BAND_OVERBOUGHT, BAND_OVERSOLD),
        })
    });

    let atr_value = optional(atr(highs, lows, closes, config.atr_period))?
        .as_deref()
        .and_then(last_finite);
    let obv_value = obv(closes, series.volumes())?
        .last()
        .copied()
        .unwrap_or(0.0);
    let vwap_value = vwap(series, config.level_window);
    if vwap_value.is_none() {
        note_guard(&mut numeric_guards, NumericGuard::ZeroAverageVolume);
    }
    let adx_reading = optional(analyze_trend_strength(series, trend))?;

    let (support_levels, resistance_levels) =
        support_resistance(series, config.level_window, config.level_count);

    let inputs = SignalInputs {
        rsi: rsi_reading.map(|r| r.value),
        macd: macd_reading.map(|m| m.direction),
        adx: adx_reading
            .as_ref()
            .map(|state| (state.strength_class, state.direction)),
        ma_above: moving_averages.iter().filter(|ma| ma.price_above).count(),
        ma_total: moving_averages.len(),
    };
    let score = score_signal(&inputs, config);

    Ok(IndicatorSnapshot {
        current_price,
        rsi: rsi_reading,
        macd: macd_reading,
        moving_averages,
        bollinger: bollinger_reading,
        stochastic: stochastic_reading,
        atr: atr_value,
        obv: obv_value,
        vwap: vwap_value,
        adx: adx_reading,
        support_levels,
        resistance_levels,
        score,
        insufficient_data: rsi_reading.is_none() || macd_reading.is_none(),
        numeric_guards,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::all, clippy::pedantic, clippy::nursery)]
    use super::*;
    use crate::series::Bar;

    /// Closes following `f(i)` with a ±10 bar range.
    fn curve(n: usize, f: impl Fn(f64) -> f64) -> Series {
        let bars = (0..n)
            .map(|i| {
                let c = f(i as f64);
                Bar::new(i as i64 * 86_400, c, c + 10.0, c - 10.0, c, 1_000_000.0)
            })
            .collect();
        Series::normalize(bars).unwrap()
    }

    fn analyze(series: &Series) -> IndicatorSnapshot {
        analyze_indicators(series, &IndicatorsConfig::default(), &TrendStrengthConfig::default())
            .unwrap()
    }

    // ==================== Scoring Tests ====================

    #[test]
    fn test_score_needs_a_clear_margin() {
        let config = IndicatorsConfig::default();
        let inputs = SignalInputs {
            macd: Some(Direction::Bullish),
            ..SignalInputs::default()
        };
        assert_eq!(score_signal(&inputs, &config).signal, OverallSignal::Bullish);

        let inputs = SignalInputs {
            macd: Some(Direction::Bullish),
            adx: Some((TrendClass::Developing, Direction::Bearish)),
            ..SignalInputs::default()
        };
        let score = score_signal(&inputs, &config);
        assert_eq!((score.bullish, score.bearish), (1.5, 1.0));
        assert_eq!(score.signal, OverallSignal::Neutral);
    }

    #[test]
    fn test_score_moving_average_shares() {
        let config = IndicatorsConfig::default();
        let with = |above, total| {
            score_signal(
                &SignalInputs {
                    ma_above: above,
                    ma_total: total,
                    ..SignalInputs::default()
                },
                &config,
            )
        };
        assert_eq!(with(3, 3).bullish, 2.0);
        assert_eq!(with(2, 3).bullish, 0.0);
        assert_eq!(with(3, 4).bullish, 1.0);
        assert_eq!(with(0, 3).bearish, 2.0);
        assert_eq!(with(1, 3).bearish, 1.0);
        assert_eq!((with(1, 2).bullish, with(1, 2).bearish), (0.0, 0.0));
    }

    #[test]
    fn test_score_rsi_only_qualifies() {
        let config = IndicatorsConfig::default();
        let bullish = SignalInputs {
            rsi: Some(85.0),
            macd: Some(Direction::Bullish),
            adx: Some((TrendClass::Strong, Direction::Bullish)),
            ..SignalInputs::default()
        };
        assert_eq!(
            score_signal(&bullish, &config).signal,
            OverallSignal::BullishButOverbought
        );
        let mild = SignalInputs {
            rsi: Some(75.0),
            ..bullish
        };
        assert_eq!(score_signal(&mild, &config).signal, OverallSignal::Bullish);

        let bearish = SignalInputs {
            rsi: Some(25.0),
            macd: Some(Direction::Bearish),
            ma_above: 0,
            ma_total: 2,
            ..SignalInputs::default()
        };
        assert_eq!(
            score_signal(&bearish, &config).signal,
            OverallSignal::BearishButOversold
        );
        let only_rsi = SignalInputs {
            rsi: Some(10.0),
            ..SignalInputs::default()
        };
        assert_eq!(score_signal(&only_rsi, &config).signal, OverallSignal::Neutral);
    }

    // ==================== Level Tests ====================

    #[test]
    fn test_support_resistance_distinct_extremes() {
        let bars = [
            (100.0, 90.0),
            (105.0, 95.0),
            (110.0, 92.0),
            (110.0, 90.0),
            (104.0, 96.0),
            (101.0, 93.0),
        ]
        .iter()
        .enumerate()
        .map(|(i, &(h, l))| Bar::new(i as i64, (h + l) / 2.0, h, l, (h + l) / 2.0, 10.0))
        .collect();
        let series = Series::normalize(bars).unwrap();
        let (support, resistance) = support_resistance(&series, 20, 3);
        // Top three highs are 110, 110, 105; the repeat collapses.
        assert_eq!(resistance, vec![110.0, 105.0]);
        assert_eq!(support, vec![90.0, 92.0]);

        let (support, resistance) = support_resistance(&series, 2, 3);
        assert_eq!(resistance, vec![104.0, 101.0]);
        assert_eq!(support, vec![93.0, 96.0]);
    }

    // ==================== Analyzer Tests ====================

    #[test]
    fn test_accelerating_uptrend() {
        let snapshot = analyze(&curve(120, |i| 1000.0 + 0.05 * i * i));
        let rsi = snapshot.rsi.unwrap();
        assert_eq!(rsi.value, 100.0);
        assert_eq!(rsi.zone, Zone::Overbought);
        assert_eq!(snapshot.macd.unwrap().direction, Direction::Bullish);
        assert_eq!(snapshot.moving_averages.len(), 3);
        assert!(snapshot.moving_averages.iter().all(|ma| ma.price_above));
        let adx = snapshot.adx.as_ref().unwrap();
        assert_eq!(adx.direction, Direction::Bullish);
        assert_eq!(snapshot.score.signal, OverallSignal::BullishButOverbought);
        assert!(!snapshot.insufficient_data);
        assert!(snapshot.bollinger.is_some());
        assert!(snapshot.stochastic.unwrap().k > 50.0);
        assert!(snapshot.atr.unwrap() > 0.0);
        assert_eq!(snapshot.obv, 120.0 * 1_000_000.0);
    }

    #[test]
    fn test_accelerating_downtrend() {
        let snapshot = analyze(&curve(120, |i| 5000.0 - 0.05 * i * i));
        assert_eq!(snapshot.rsi.unwrap().value, 0.0);
        assert_eq!(snapshot.macd.unwrap().direction, Direction::Bearish);
        assert!(snapshot.moving_averages.iter().all(|ma| !ma.price_above));
        assert_eq!(snapshot.score.signal, OverallSignal::BearishButOversold);
        assert!(snapshot.score.bearish > snapshot.score.bullish + 1.0);
    }

    #[test]
    fn test_short_series_leaves_readings_empty() {
        let snapshot = analyze(&curve(10, |i| 1000.0 + i));
        assert!(snapshot.insufficient_data);
        assert!(snapshot.rsi.is_none());
        assert!(snapshot.macd.is_none());
        assert!(snapshot.moving_averages.is_empty());
        assert!(snapshot.adx.is_none());
        assert_eq!(snapshot.score.signal, OverallSignal::Neutral);
        assert_eq!(snapshot.resistance_levels.len(), 3);
    }

    #[test]
    fn test_flat_series_guards() {
        let bars = (0..60)
            .map(|i| Bar::new(i, 500.0, 500.0, 500.0, 500.0, 0.0))
            .collect();
        let snapshot = analyze(&Series::normalize(bars).unwrap());
        let bands = snapshot.bollinger.unwrap();
        assert_eq!(bands.position_pct, 50.0);
        assert_eq!(snapshot.vwap, None);
        assert!(snapshot.numeric_guards.contains(&NumericGuard::ZeroRange));
        assert!(snapshot
            .numeric_guards
            .contains(&NumericGuard::ZeroAverageVolume));
    }

    #[test]
    fn test_vwap_weights_by_volume() {
        let bars = vec![
            Bar::new(1, 100.0, 100.0, 100.0, 100.0, 1.0),
            Bar::new(2, 200.0, 200.0, 200.0, 200.0, 3.0),
        ];
        let series = Series::normalize(bars).unwrap();
        assert_eq!(vwap(&series, 20), Some(175.0));
        assert_eq!(vwap(&series, 1), Some(200.0));
    }
}
