//! Relative Strength Index (RSI) with Wilder smoothing.
//!
//! The first average gain/loss is the mean of the first `period` changes; later
//! averages use `(prev × (period − 1) + current) / period`. Boundary cases:
//! no losses gives 100, no gains gives 0, no movement gives 50.
//!
//! ```
//! use idx_ta::indicators::rsi;
//!
//! let closes = vec![44.0_f64, 44.25, 44.5, 43.75, 44.5, 44.25, 44.0, 43.5];
//! let result = rsi(&closes, 5).unwrap();
//! assert!(result[4].is_nan());
//! assert!(!result[5].is_nan());
//! ```

use crate::error::Result;
use crate::traits::{validate_period, SeriesElement, ValidatedInput};

/// Minimum input length that yields one RSI value.
#[inline]
#[must_use]
pub const fn rsi_min_len(period: usize) -> usize {
    period + 1
}

/// Computes the RSI.
///
/// # Errors
///
/// - `Error::InvalidPeriod` if `period` is zero
/// - `Error::EmptyInput` if `data` is empty
/// - `Error::InsufficientData` if `data` has fewer than `period + 1` values
#[must_use = "this returns a Result with the RSI values, which should be used"]
pub fn rsi<T: SeriesElement>(data: &[T], period: usize) -> Result<Vec<T>> {
    validate_period(period)?;
    data.require_non_empty()?;
    data.require(rsi_min_len(period), "rsi")?;

    let mut output = vec![T::nan(); data.len()];
    compute_rsi_core(data, period, &mut output)?;
    Ok(output)
}

fn compute_rsi_core<T: SeriesElement>(data: &[T], period: usize, output: &mut [T]) -> Result<()> {
    let period_t = T::from_usize(period)?;
    let period_minus_one_t = T::from_usize(period - 1)?;

    let mut sum_gain = T::zero();
    let mut sum_loss = T::zero();
    for i in 1..=period {
        let (gain, loss) = split_change(data[i] - data[i - 1]);
        sum_gain = sum_gain + gain;
        sum_loss = sum_loss + loss;
    }

    let mut avg_gain = sum_gain / period_t;
    let mut avg_loss = sum_loss / period_t;
    output[period] = compute_rsi_value(avg_gain, avg_loss);

    for i in (period + 1)..data.len() {
        let (gain, loss) = split_change(data[i] - data[i - 1]);
        avg_gain = (avg_gain * period_minus_one_t + gain) / period_t;
        avg_loss = (avg_loss * period_minus_one_t + loss) / period_t;
        output[i] = compute_rsi_value(avg_gain, avg_loss);
    }
    Ok(())
}

#[inline]
fn split_change<T: SeriesElement>(change: T) -> (T, T) {
    if change > T::zero() {
        (change, T::zero())
    } else if change < T::zero() {
        (T::zero(), -change)
    } else {
        (T::zero(), T::zero())
    }
}

#[inline]
fn compute_rsi_value<T: SeriesElement>(avg_gain: T, avg_loss: T) -> T {
    let zero = T::zero();
    if avg_loss == zero {
        if avg_gain == zero {
            T::fifty()
        } else {
            T::hundred()
        }
    } else if avg_gain == zero {
        zero
    } else {
        let rs = avg_gain / avg_loss;
        T::hundred() - T::hundred() / (T::one() + rs)
    }
}
