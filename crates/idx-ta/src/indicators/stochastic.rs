//! Slow stochastic oscillator.
//!
//! Raw %K places the close inside the `k_period` high/low range on a 0..=100
//! scale. %K is the SMA of raw %K over `smooth_k` bars and %D the SMA of %K
//! over `d_period` bars. A window with no range reads 50.

use crate::error::Result;
use crate::kernels::{rolling_max, rolling_min};
use crate::traits::{validate_period, validate_same_length, SeriesElement, ValidatedInput};

/// %K and %D lines, aligned with the input.
#[derive(Debug, Clone)]
pub struct StochasticOutput<T: SeriesElement> {
    /// Smoothed %K.
    pub k: Vec<T>,
    /// SMA of %K.
    pub d: Vec<T>,
}

/// Index of the first valid %D value.
#[inline]
#[must_use]
pub const fn stochastic_lookback(k_period: usize, smooth_k: usize, d_period: usize) -> usize {
    (k_period + smooth_k + d_period).saturating_sub(3)
}

/// Minimum input length that yields one %D value.
#[inline]
#[must_use]
pub const fn stochastic_min_len(k_period: usize, smooth_k: usize, d_period: usize) -> usize {
    stochastic_lookback(k_period, smooth_k, d_period) + 1
}

/// SMA of `values[first..]` written back into a NaN-prefixed column.
fn smooth<T: SeriesElement>(values: &[T], first: usize, period: usize) -> Result<Vec<T>> {
    let p = T::from_usize(period)?;
    let mut out = vec![T::nan(); values.len()];
    let mut sum = T::zero();
    for i in first..values.len() {
        sum = sum + values[i];
        if i >= first + period {
            sum = sum - values[i - period];
        }
        if i + 1 >= first + period {
            out[i] = sum / p;
        }
    }
    Ok(out)
}

/// Computes the slow stochastic.
///
/// # Errors
///
/// - `Error::InvalidPeriod` if any period is zero
/// - `Error::EmptyInput` / `Error::LengthMismatch` for bad columns
/// - `Error::InsufficientData` below [`stochastic_min_len`] bars
#[must_use = "this returns a Result with the %K and %D lines, which should be used"]
pub fn stochastic<T: SeriesElement>(
    high: &[T],
    low: &[T],
    close: &[T],
    k_period: usize,
    smooth_k: usize,
    d_period: usize,
) -> Result<StochasticOutput<T>> {
    validate_period(k_period)?;
    validate_period(smooth_k)?;
    validate_period(d_period)?;
    close.require_non_empty()?;
    validate_same_length(&[("high", high), ("low", low), ("close", close)])?;
    close.require(stochastic_min_len(k_period, smooth_k, d_period), "stochastic")?;

    let highest = rolling_max(high, k_period)?;
    let lowest = rolling_min(low, k_period)?;
    let raw: Vec<T> = close
        .iter()
        .zip(highest.iter().zip(&lowest))
        .map(|(&c, (&hh, &ll))| {
            let range = hh - ll;
            if hh.is_nan() || ll.is_nan() {
                T::nan()
            } else if range > T::zero() {
                T::hundred() * (c - ll) / range
            } else {
                T::fifty()
            }
        })
        .collect();

    let k = smooth(&raw, k_period - 1, smooth_k)?;
    let d = smooth(&k, k_period + smooth_k - 2, d_period)?;
    Ok(StochasticOutput { k, d })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::all, clippy::pedantic, clippy::nursery)]
    use super::*;
    use crate::error::Error;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_close_at_high_reads_100() {
        let high: Vec<f64> = (0..30).map(|i| 110.0 + i as f64).collect();
        let low: Vec<f64> = (0..30).map(|i| 90.0 + i as f64).collect();
        let out = stochastic(&high, &low, &high, 14, 3, 3).unwrap();
        assert_abs_diff_eq!(out.k[29], 100.0, epsilon = 1e-9);
        assert_abs_diff_eq!(out.d[29], 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_lookbacks() {
        let high = vec![12.0_f64; 20];
        let low = vec![8.0_f64; 20];
        let close = vec![10.0_f64; 20];
        let out = stochastic(&high, &low, &close, 14, 3, 3).unwrap();
        assert!(out.k[14].is_nan());
        assert_abs_diff_eq!(out.k[15], 50.0, epsilon = 1e-9);
        assert!(out.d[16].is_nan());
        assert_abs_diff_eq!(out.d[17], 50.0, epsilon = 1e-9);
        assert_eq!(stochastic_lookback(14, 3, 3), 17);
    }

    #[test]
    fn test_flat_window_reads_fifty() {
        let flat = vec![100.0_f64; 20];
        let out = stochastic(&flat, &flat, &flat, 5, 1, 1).unwrap();
        assert_eq!(out.k[19], 50.0);
    }

    #[test]
    fn test_short_input() {
        let v = vec![1.0_f64; 10];
        assert!(matches!(
            stochastic(&v, &v, &v, 14, 3, 3),
            Err(Error::InsufficientData { required: 18, .. })
        ));
    }
}
