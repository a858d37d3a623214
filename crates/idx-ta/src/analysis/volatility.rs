//! Historical volatility, ATR-based volatility and a risk bucket.
//!
//! Returns are close-to-close percentage changes. Annualized volatility is
//! the sample standard deviation of returns scaled by √`trading_days`, in
//! percent. A window longer than the available returns is still reported
//! when at least half of it is covered, using every return, with
//! `full_window` cleared.

use serde::{Deserialize, Serialize};

use crate::config::VolatilityConfig;
use crate::error::{Error, NumericGuard, Result};
use crate::indicators::atr;
use crate::series::Series;
use crate::traits::ValidatedInput;
use crate::utils::{last_finite, mean, pct_change, sample_std_dev};

use super::note_guard;

/// Volatility bucket of the overall annualized figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    /// Below `low_below`.
    Low,
    /// Below `moderate_below`.
    Moderate,
    /// Below `high_below`.
    High,
    /// Everything above.
    VeryHigh,
}

impl RiskLevel {
    /// Buckets an annualized volatility in percent.
    #[must_use]
    pub fn classify(volatility: f64, config: &VolatilityConfig) -> Self {
        if volatility < config.low_below {
            Self::Low
        } else if volatility < config.moderate_below {
            Self::Moderate
        } else if volatility < config.high_below {
            Self::High
        } else {
            Self::VeryHigh
        }
    }

    /// Score from 1 (low) to 4 (very high).
    #[must_use]
    pub const fn score(self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Moderate => 2,
            Self::High => 3,
            Self::VeryHigh => 4,
        }
    }
}

/// Annualized volatility over one window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowVolatility {
    /// Requested window in returns.
    pub window: usize,
    /// Annualized volatility in percent.
    pub volatility_pct: f64,
    /// False when fewer than `window` returns were available.
    pub full_window: bool,
}

/// ATR against the latest close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AtrVolatility {
    /// Latest ATR.
    pub atr: f64,
    /// Mean of every defined ATR value.
    pub atr_avg: f64,
    /// Latest ATR as a percentage of the close.
    pub atr_pct: f64,
    /// Average ATR as a percentage of the close.
    pub atr_avg_pct: f64,
}

/// Volatility profile of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilityReport {
    /// Latest close.
    pub current_price: f64,
    /// One entry per configured window with enough history.
    pub windows: Vec<WindowVolatility>,
    /// Annualized volatility over every return.
    pub overall_pct: f64,
    /// ATR block, absent when the series is shorter than the ATR warmup.
    pub atr: Option<AtrVolatility>,
    /// Bucket of `overall_pct`.
    pub risk_level: RiskLevel,
    /// 1 to 4.
    pub risk_score: u8,
    /// Zero-denominator cases resolved locally.
    pub numeric_guards: Vec<NumericGuard>,
}

/// Close-to-close returns as fractions.
fn daily_returns(closes: &[f64]) -> Vec<f64> {
    closes
        .windows(2)
        .filter_map(|pair| pct_change(pair[0], pair[1]))
        .map(|pct| pct / 100.0)
        .collect()
}

fn annualize(returns: &[f64], trading_days: usize) -> Option<f64> {
    #[allow(clippy::cast_precision_loss)]
    let scale = (trading_days as f64).sqrt() * 100.0;
    sample_std_dev(returns).map(|sd| sd * scale)
}

fn window_volatility(
    returns: &[f64],
    window: usize,
    trading_days: usize,
) -> Option<WindowVolatility> {
    let (sample, full_window) = if returns.len() >= window {
        (&returns[returns.len() - window..], true)
    } else if returns.len() >= window / 2 {
        (returns, false)
    } else {
        return None;
    };
    Some(WindowVolatility {
        window,
        volatility_pct: annualize(sample, trading_days)?,
        full_window,
    })
}

fn atr_volatility(
    series: &Series,
    period: usize,
    guards: &mut Vec<NumericGuard>,
) -> Result<Option<AtrVolatility>> {
    let column = match atr(series.highs(), series.lows(), series.closes(), period) {
        Ok(column) => column,
        Err(Error::InsufficientData { .. }) => return Ok(None),
        Err(other) => return Err(other),
    };
    let defined: Vec<f64> = column.iter().copied().filter(|v| v.is_finite()).collect();
    let (Some(latest), Some(avg)) = (last_finite(&column), mean(&defined)) else {
        return Ok(None);
    };
    let close = series.last().close;
    let mut pct = |value: f64| {
        if close > 0.0 {
            value / close * 100.0
        } else {
            note_guard(guards, NumericGuard::ZeroBase);
            0.0
        }
    };
    Ok(Some(AtrVolatility {
        atr: latest,
        atr_avg: avg,
        atr_pct: pct(latest),
        atr_avg_pct: pct(avg),
    }))
}

/// Measures how much the series moves and buckets the result.
///
/// # Errors
///
/// - `Error::InsufficientData` below `min_bars` bars
/// - `Error::InvalidPeriod` for a zero ATR period
pub fn analyze_volatility(series: &Series, config: &VolatilityConfig) -> Result<VolatilityReport> {
    series.require(config.min_bars.max(3), "volatility")?;

    let returns = daily_returns(series.closes());
    let Some(overall_pct) = annualize(&returns, config.trading_days) else {
        return Err(Error::InsufficientData {
            required: config.min_bars.max(3),
            actual: series.len(),
            indicator: "volatility",
        });
    };

    let windows = config
        .windows
        .iter()
        .filter_map(|&w| window_volatility(&returns, w, config.trading_days))
        .collect();

    let mut numeric_guards = Vec::new();
    let atr = atr_volatility(series, config.atr_period, &mut numeric_guards)?;
    let risk_level = RiskLevel::classify(overall_pct, config);

    Ok(VolatilityReport {
        current_price: series.last().close,
        windows,
        overall_pct,
        atr,
        risk_level,
        risk_score: risk_level.score(),
        numeric_guards,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::all, clippy::pedantic, clippy::nursery)]
    use super::*;
    use crate::series::Bar;
    use approx::assert_abs_diff_eq;

    fn from_closes(closes: &[f64]) -> Series {
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar::new(i as i64 * 86_400, c, c * 1.01, c * 0.99, c, 1_000.0))
            .collect();
        Series::normalize(bars).unwrap()
    }

    /// Closes alternating between 1000 and 1000 × (1 + `step`).
    fn zigzag(n: usize, step: f64) -> Vec<f64> {
        (0..n)
            .map(|i| if i % 2 == 0 { 1000.0 } else { 1000.0 * (1.0 + step) })
            .collect()
    }

    // ==================== Risk Bucket Tests ====================

    #[test]
    fn test_risk_buckets() {
        let config = VolatilityConfig::default();
        assert_eq!(RiskLevel::classify(14.9, &config), RiskLevel::Low);
        assert_eq!(RiskLevel::classify(15.0, &config), RiskLevel::Moderate);
        assert_eq!(RiskLevel::classify(49.9, &config), RiskLevel::High);
        assert_eq!(RiskLevel::classify(50.0, &config), RiskLevel::VeryHigh);
        assert_eq!(RiskLevel::VeryHigh.score(), 4);
    }

    // ==================== Volatility Tests ====================

    #[test]
    fn test_overall_matches_direct_computation() {
        let closes: Vec<f64> = (0..60)
            .map(|i| 2000.0 + (i as f64 * 0.9).sin() * 40.0)
            .collect();
        let report = analyze_volatility(&from_closes(&closes), &VolatilityConfig::default()).unwrap();

        let returns: Vec<f64> = closes.windows(2).map(|w| w[1] / w[0] - 1.0).collect();
        let m = returns.iter().sum::<f64>() / returns.len() as f64;
        let var = returns.iter().map(|r| (r - m).powi(2)).sum::<f64>() / (returns.len() - 1) as f64;
        assert_abs_diff_eq!(report.overall_pct, var.sqrt() * 252f64.sqrt() * 100.0, epsilon = 1e-9);
        assert_eq!(report.risk_score, report.risk_level.score());
    }

    #[test]
    fn test_window_coverage() {
        // 60 bars give 59 returns: 30 is full, 90 is partial, 252 is skipped.
        let report =
            analyze_volatility(&from_closes(&zigzag(60, 0.02)), &VolatilityConfig::default()).unwrap();
        let windows: Vec<(usize, bool)> = report.windows.iter().map(|w| (w.window, w.full_window)).collect();
        assert_eq!(windows, vec![(30, true), (90, false)]);
        assert_abs_diff_eq!(report.windows[1].volatility_pct, report.overall_pct, epsilon = 1e-12);
    }

    #[test]
    fn test_calm_and_wild_series() {
        let config = VolatilityConfig::default();
        let calm = analyze_volatility(&from_closes(&zigzag(40, 0.001)), &config).unwrap();
        assert_eq!(calm.risk_level, RiskLevel::Low);
        let wild = analyze_volatility(&from_closes(&zigzag(40, 0.08)), &config).unwrap();
        assert_eq!(wild.risk_level, RiskLevel::VeryHigh);
        assert_eq!(wild.risk_score, 4);
    }

    #[test]
    fn test_atr_block() {
        let report = analyze_volatility(&from_closes(&[1000.0; 40]), &VolatilityConfig::default()).unwrap();
        let atr = report.atr.unwrap();
        // Each bar spans 2% of a flat 1000 close.
        assert_abs_diff_eq!(atr.atr, 20.0, epsilon = 1e-9);
        assert_abs_diff_eq!(atr.atr_pct, 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(atr.atr_avg_pct, 2.0, epsilon = 1e-9);
        assert_eq!(report.overall_pct, 0.0);
        assert_eq!(report.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_short_series_is_rejected() {
        let err = analyze_volatility(&from_closes(&[1000.0; 20]), &VolatilityConfig::default()).unwrap_err();
        assert!(matches!(err, Error::InsufficientData { required: 30, actual: 20, .. }));
    }
}
