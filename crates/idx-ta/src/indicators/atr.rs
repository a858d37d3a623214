//! True range and Wilder's Average True Range.
//!
//! The breakout analyzer sizes its "testing" band and wick threshold in ATR
//! units, so a 25-rupiah tick stock and a 1-rupiah tick stock are judged on
//! their own volatility.

use crate::error::Result;
use crate::traits::{validate_period, validate_same_length, SeriesElement, ValidatedInput};

/// Leading NaN count of [`atr`]: the first bar has no previous close.
#[inline]
#[must_use]
pub const fn atr_lookback(period: usize) -> usize {
    period
}

/// Bars needed for one ATR value.
#[inline]
#[must_use]
pub const fn atr_min_len(period: usize) -> usize {
    period + 1
}

/// Rejects empty or misaligned high/low/close columns.
pub(crate) fn check_hlc<T: SeriesElement>(high: &[T], low: &[T], close: &[T]) -> Result<()> {
    high.require_non_empty()?;
    validate_same_length(&[("high", high), ("low", low), ("close", close)])
}

/// Widest of the bar's own range and its gaps from the previous close.
#[inline]
pub(crate) fn bar_true_range<T: SeriesElement>(high: T, low: T, prev_close: T) -> T {
    (high - low)
        .max((high - prev_close).abs())
        .max((low - prev_close).abs())
}

/// True range per bar; index 0 is NaN.
///
/// # Errors
///
/// `EmptyInput` or `LengthMismatch` for bad columns.
pub fn true_range<T: SeriesElement>(high: &[T], low: &[T], close: &[T]) -> Result<Vec<T>> {
    check_hlc(high, low, close)?;
    let tail = (1..high.len()).map(|i| bar_true_range(high[i], low[i], close[i - 1]));
    Ok(std::iter::once(T::nan()).chain(tail).collect())
}

/// Average True Range, seeded with the mean of the first `period` true
/// ranges and smoothed with `α = 1 / period` afterwards.
///
/// # Errors
///
/// - `Error::InvalidPeriod` for a zero period
/// - `Error::EmptyInput` / `Error::LengthMismatch` for bad columns
/// - `Error::InsufficientData` below `period + 1` bars
#[must_use = "the ATR column is the only output"]
pub fn atr<T: SeriesElement>(high: &[T], low: &[T], close: &[T], period: usize) -> Result<Vec<T>> {
    validate_period(period)?;
    let ranges = true_range(high, low, close)?;
    ranges.require(atr_min_len(period), "atr")?;

    let p = T::from_usize(period)?;
    let keep = T::from_usize(period - 1)?;
    let seed = ranges[1..=period].iter().fold(T::zero(), |acc, &tr| acc + tr) / p;

    let mut output = vec![T::nan(); ranges.len()];
    output[period] = seed;
    let mut prev = seed;
    for (slot, &tr) in output[period + 1..].iter_mut().zip(&ranges[period + 1..]) {
        prev = (prev * keep + tr) / p;
        *slot = prev;
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::all, clippy::pedantic, clippy::nursery)]
    use super::*;
    use crate::error::Error;
    use approx::assert_abs_diff_eq;

    // ==================== True Range Tests ====================

    #[test]
    fn test_true_range_uses_previous_close() {
        // Gap up from 8950 to a 9000..9050 bar.
        let tr = true_range(&[9000.0_f64, 9050.0], &[8900.0, 9000.0], &[8950.0, 9025.0]).unwrap();
        assert!(tr[0].is_nan());
        assert_abs_diff_eq!(tr[1], 100.0, epsilon = 1e-10);
    }

    #[test]
    fn test_true_range_gap_down() {
        let tr = true_range(&[520.0_f64, 480.0], &[500.0, 470.0], &[510.0, 475.0]).unwrap();
        assert_abs_diff_eq!(tr[1], 40.0, epsilon = 1e-10);
    }

    // ==================== ATR Tests ====================

    #[test]
    fn test_atr_flat_range() {
        let n = 30;
        let out = atr(&vec![1010.0_f64; n], &vec![990.0; n], &vec![1000.0; n], 14).unwrap();
        assert_eq!(out.iter().take_while(|v| v.is_nan()).count(), atr_lookback(14));
        assert_abs_diff_eq!(out[14], 20.0, epsilon = 1e-10);
        assert_abs_diff_eq!(out[29], 20.0, epsilon = 1e-10);
    }

    #[test]
    fn test_atr_reacts_to_wide_bar() {
        let mut high = vec![105.0_f64; 20];
        let low = vec![95.0_f64; 20];
        let close = vec![100.0_f64; 20];
        high[19] = 125.0;
        let out = atr(&high, &low, &close, 5).unwrap();
        // (10 * 4 + 30) / 5
        assert_abs_diff_eq!(out[19], 14.0, epsilon = 1e-10);
    }

    #[test]
    fn test_atr_errors() {
        let v = vec![1.0_f64; 14];
        assert!(matches!(
            atr(&v, &v, &v, 14),
            Err(Error::InsufficientData { required: 15, actual: 14, .. })
        ));
        assert!(matches!(
            atr(&[1.0_f64, 2.0], &[1.0], &[1.0, 2.0], 1),
            Err(Error::LengthMismatch { .. })
        ));
        assert!(matches!(atr::<f64>(&[], &[], &[], 3), Err(Error::EmptyInput)));
        assert!(matches!(atr(&v, &v, &v, 0), Err(Error::InvalidPeriod { .. })));
    }
}
