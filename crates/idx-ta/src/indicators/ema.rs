//! Exponential Moving Average (EMA).
//!
//! Seeded with the SMA of the first `period` values, then
//! `EMA[i] = α × x[i] + (1 − α) × EMA[i−1]`. Standard smoothing uses
//! `α = 2 / (period + 1)`.
//!
//! ```
//! use idx_ta::indicators::ema;
//!
//! let closes = vec![10.0_f64, 11.0, 12.0, 13.0, 14.0, 15.0];
//! let result = ema(&closes, 3).unwrap();
//! assert!(result[1].is_nan());
//! assert!((result[2] - 11.0).abs() < 1e-10);
//! ```

use crate::error::Result;
use crate::traits::{validate_indicator_input, validate_period, SeriesElement};

/// Number of leading NaN values in the EMA output.
#[inline]
#[must_use]
pub const fn ema_lookback(period: usize) -> usize {
    period.saturating_sub(1)
}

/// Minimum input length that yields one EMA value.
#[inline]
#[must_use]
pub const fn ema_min_len(period: usize) -> usize {
    period
}

/// Computes the EMA with standard smoothing `α = 2 / (period + 1)`.
///
/// # Errors
///
/// - `Error::InvalidPeriod` if `period` is zero
/// - `Error::EmptyInput` if `data` is empty
/// - `Error::InsufficientData` if `data` is shorter than `period`
#[must_use = "this returns a Result with the EMA values, which should be used"]
pub fn ema<T: SeriesElement>(data: &[T], period: usize) -> Result<Vec<T>> {
    validate_period(period)?;
    let alpha = T::two() / T::from_usize(period + 1)?;
    ema_with_alpha(data, period, alpha)
}

/// Computes an EMA with an explicit smoothing factor.
///
/// # Errors
///
/// Same as [`ema`].
pub fn ema_with_alpha<T: SeriesElement>(data: &[T], period: usize, alpha: T) -> Result<Vec<T>> {
    validate_indicator_input(data, period, "ema")?;
    let mut output = vec![T::nan(); data.len()];
    compute_ema_core(data, period, alpha, &mut output)?;
    Ok(output)
}

/// Fills `output` from index `period - 1`. A NaN input poisons the rest of the run.
fn compute_ema_core<T: SeriesElement>(
    data: &[T],
    period: usize,
    alpha: T,
    output: &mut [T],
) -> Result<()> {
    let one_minus_alpha = T::one() - alpha;
    let period_t = T::from_usize(period)?;

    let seed_window = &data[..period];
    let mut ema_prev = if seed_window.iter().any(|v| v.is_nan()) {
        T::nan()
    } else {
        seed_window.iter().fold(T::zero(), |acc, &x| acc + x) / period_t
    };
    output[period - 1] = ema_prev;

    for i in period..data.len() {
        let value = data[i];
        ema_prev = if ema_prev.is_nan() || value.is_nan() {
            T::nan()
        } else {
            alpha * value + one_minus_alpha * ema_prev
        };
        output[i] = ema_prev;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::all, clippy::pedantic, clippy::nursery)]
    use super::*;
    use crate::error::Error;
    use approx::assert_abs_diff_eq;

    // ==================== Standard EMA Tests ====================

    #[test]
    fn test_ema_known_values() {
        // alpha = 0.5 for period 3
        let result = ema(&[2.0_f64, 4.0, 6.0, 8.0, 10.0], 3).unwrap();
        assert_abs_diff_eq!(result[2], 4.0, epsilon = 1e-10);
        assert_abs_diff_eq!(result[3], 6.0, epsilon = 1e-10);
        assert_abs_diff_eq!(result[4], 8.0, epsilon = 1e-10);
    }

    #[test]
    fn test_ema_constant_values() {
        let result = ema(&[5.0_f64; 20], 9).unwrap();
        assert!(result[9..].iter().all(|v| (v - 5.0).abs() < 1e-10));
    }

    #[test]
    fn test_ema_nan_propagates() {
        let result = ema(&[1.0_f64, 2.0, 3.0, f64::NAN, 5.0], 2).unwrap();
        assert!(!result[2].is_nan());
        assert!(result[3].is_nan());
        assert!(result[4].is_nan());
    }

    #[test]
    fn test_ema_with_alpha_one_tracks_input() {
        let data = [3.0_f64, 5.0, 8.0, 13.0];
        let result = ema_with_alpha(&data, 2, 1.0).unwrap();
        assert_abs_diff_eq!(result[1], 4.0, epsilon = 1e-10);
        assert_abs_diff_eq!(result[3], 13.0, epsilon = 1e-10);
    }

    // ==================== Error Tests ====================

    #[test]
    fn test_ema_errors() {
        assert!(matches!(ema(&[1.0_f64], 0), Err(Error::InvalidPeriod { .. })));
        assert!(matches!(ema::<f64>(&[], 3), Err(Error::EmptyInput)));
        assert!(matches!(
            ema(&[1.0_f64, 2.0], 5),
            Err(Error::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_ema_lookback() {
        assert_eq!(ema_lookback(12), 11);
        assert_eq!(ema_lookback(0), 0);
        assert_eq!(ema_min_len(26), 26);
    }
}
