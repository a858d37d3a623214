//! Simple Moving Average (SMA).
//!
//! Rolling arithmetic mean with an O(n) running sum. The first `period - 1`
//! outputs are NaN.
//!
//! ```
//! use idx_ta::indicators::sma;
//!
//! let closes = vec![8500.0_f64, 8600.0, 8700.0, 8800.0];
//! let result = sma(&closes, 3).unwrap();
//! assert!(result[1].is_nan());
//! assert!((result[2] - 8600.0).abs() < 1e-10);
//! ```

use crate::error::Result;
use crate::traits::{validate_indicator_input, SeriesElement};

/// Number of leading NaN values in the SMA output.
#[inline]
#[must_use]
pub const fn sma_lookback(period: usize) -> usize {
    period.saturating_sub(1)
}

/// Minimum input length that yields one SMA value.
#[inline]
#[must_use]
pub const fn sma_min_len(period: usize) -> usize {
    period
}

/// Computes the Simple Moving Average.
///
/// # Errors
///
/// - `Error::InvalidPeriod` if `period` is zero
/// - `Error::EmptyInput` if `data` is empty
/// - `Error::InsufficientData` if `data` is shorter than `period`
#[must_use = "this returns a Result with the SMA values, which should be used"]
pub fn sma<T: SeriesElement>(data: &[T], period: usize) -> Result<Vec<T>> {
    validate_indicator_input(data, period, "sma")?;

    let period_t = T::from_usize(period)?;
    let mut result = vec![T::nan(); data.len()];

    let mut sum = data[..period].iter().fold(T::zero(), |acc, &x| acc + x);
    result[period - 1] = sum / period_t;

    for i in period..data.len() {
        sum = sum + data[i] - data[i - period];
        result[i] = sum / period_t;
    }

    Ok(result)
}
