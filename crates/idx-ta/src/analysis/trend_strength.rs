//! ADX trend strength.
//!
//! Reads the latest Wilder ADX, +DI and −DI, clamps them to 0..=100 and
//! classifies the trend:
//!
//! | ADX | class |
//! |-----|-------|
//! | `> strong_above` (25) | `STRONG` |
//! | `≥ developing_from` (20) | `DEVELOPING` |
//! | otherwise | `WEAK` |
//!
//! Direction is bullish iff +DI > −DI.

use serde::{Deserialize, Serialize};

use crate::config::TrendStrengthConfig;
use crate::error::{Error, NumericGuard, Result};
use crate::indicators::{adx, adx_min_len};
use crate::series::Series;
use crate::traits::ValidatedInput;

use super::Direction;

/// ADX strength bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendClass {
    /// No clear trend.
    Weak,
    /// A trend is forming.
    Developing,
    /// Established trend.
    Strong,
}

impl TrendClass {
    /// Buckets an ADX reading.
    #[must_use]
    pub fn classify(adx: f64, config: &TrendStrengthConfig) -> Self {
        if adx > config.strong_above {
            Self::Strong
        } else if adx >= config.developing_from {
            Self::Developing
        } else {
            Self::Weak
        }
    }
}

/// Bullish iff +DI is strictly above −DI.
#[must_use]
pub fn di_direction(plus_di: f64, minus_di: f64) -> Direction {
    if plus_di > minus_di {
        Direction::Bullish
    } else {
        Direction::Bearish
    }
}

/// Latest ADX reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendState {
    /// ADX, 0 to 100.
    pub adx: f64,
    /// +DI, 0 to 100.
    pub plus_di: f64,
    /// −DI, 0 to 100.
    pub minus_di: f64,
    /// Strength bucket.
    pub strength_class: TrendClass,
    /// Bullish or bearish.
    pub direction: Direction,
    /// Zero-denominator cases resolved locally.
    pub numeric_guards: Vec<NumericGuard>,
}

/// Computes the trend state at the latest bar.
///
/// # Errors
///
/// - `Error::InsufficientData { required: 2 × period }` for short series
/// - `Error::InvalidPeriod` if the period is zero
pub fn analyze_trend_strength(series: &Series, config: &TrendStrengthConfig) -> Result<TrendState> {
    series.require(adx_min_len(config.period), "trend_strength")?;
    let out = adx(series.highs(), series.lows(), series.closes(), config.period)?;

    let latest = |values: &[f64]| values.last().copied().filter(|v| v.is_finite());
    let (Some(adx_value), Some(plus_di), Some(minus_di)) =
        (latest(&out.adx), latest(&out.plus_di), latest(&out.minus_di))
    else {
        return Err(Error::InsufficientData {
            required: adx_min_len(config.period),
            actual: series.len(),
            indicator: "trend_strength",
        });
    };

    let adx_value = adx_value.clamp(0.0, 100.0);
    let plus_di = plus_di.clamp(0.0, 100.0);
    let minus_di = minus_di.clamp(0.0, 100.0);

    let mut numeric_guards = Vec::new();
    if plus_di == 0.0 && minus_di == 0.0 {
        numeric_guards.push(NumericGuard::ZeroRange);
    }

    Ok(TrendState {
        adx: adx_value,
        plus_di,
        minus_di,
        strength_class: TrendClass::classify(adx_value, config),
        direction: di_direction(plus_di, minus_di),
        numeric_guards,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::all, clippy::pedantic, clippy::nursery)]
    use super::*;
    use crate::series::Bar;

    fn trending_series(n: usize, step: f64) -> Series {
        let bars = (0..n)
            .map(|i| {
                let base = 1000.0 + step * i as f64;
                Bar::new(i as i64, base, base + 10.0, base - 10.0, base + step / 2.0, 1000.0)
            })
            .collect();
        Series::normalize(bars).unwrap()
    }

    // ==================== Decision Table Tests ====================

    #[test]
    fn test_reference_reading() {
        let config = TrendStrengthConfig::default();
        assert_eq!(TrendClass::classify(28.5, &config), TrendClass::Strong);
        assert_eq!(di_direction(25.3, 18.7), Direction::Bullish);
    }

    #[test]
    fn test_class_boundaries() {
        let config = TrendStrengthConfig::default();
        assert_eq!(TrendClass::classify(25.0, &config), TrendClass::Developing);
        assert_eq!(TrendClass::classify(20.0, &config), TrendClass::Developing);
        assert_eq!(TrendClass::classify(19.99, &config), TrendClass::Weak);
        assert_eq!(TrendClass::classify(0.0, &config), TrendClass::Weak);
    }

    #[test]
    fn test_equal_di_is_bearish() {
        assert_eq!(di_direction(20.0, 20.0), Direction::Bearish);
    }

    // ==================== Analyzer Tests ====================

    #[test]
    fn test_insufficient_data_reports_required() {
        let err = analyze_trend_strength(&trending_series(27, 5.0), &TrendStrengthConfig::default())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientData {
                required: 28,
                actual: 27,
                ..
            }
        ));
    }

    #[test]
    fn test_uptrend_is_strong_bullish() {
        let state = analyze_trend_strength(&trending_series(60, 15.0), &TrendStrengthConfig::default())
            .unwrap();
        assert_eq!(state.strength_class, TrendClass::Strong);
        assert_eq!(state.direction, Direction::Bullish);
        assert!(state.plus_di > state.minus_di);
        assert!((0.0..=100.0).contains(&state.adx));
    }

    #[test]
    fn test_downtrend_is_bearish() {
        let state = analyze_trend_strength(&trending_series(60, -15.0), &TrendStrengthConfig::default())
            .unwrap();
        assert_eq!(state.direction, Direction::Bearish);
        assert_eq!(state.strength_class, TrendClass::Strong);
    }

    #[test]
    fn test_flat_series_is_weak() {
        let bars = (0..40)
            .map(|i| Bar::new(i, 100.0, 100.0, 100.0, 100.0, 10.0))
            .collect();
        let state =
            analyze_trend_strength(&Series::normalize(bars).unwrap(), &TrendStrengthConfig::default())
                .unwrap();
        assert_eq!(state.adx, 0.0);
        assert_eq!(state.strength_class, TrendClass::Weak);
        assert_eq!(state.numeric_guards, vec![NumericGuard::ZeroRange]);
    }
}
