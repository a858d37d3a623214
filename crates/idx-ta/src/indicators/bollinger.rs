//! Bollinger Bands.
//!
//! Middle band is the SMA of `period` closes; the outer bands sit `k`
//! population standard deviations away. Running sums keep the scan O(n).
//!
//! ```
//! use idx_ta::indicators::bollinger;
//!
//! let closes = vec![10.0_f64, 12.0, 10.0, 12.0];
//! let bands = bollinger(&closes, 2, 2.0).unwrap();
//! assert!(bands.middle[0].is_nan());
//! assert!((bands.upper[1] - 13.0).abs() < 1e-10);
//! assert!((bands.lower[1] - 9.0).abs() < 1e-10);
//! ```

use crate::error::{Error, Result};
use crate::traits::{validate_indicator_input, SeriesElement};

/// Upper, middle and lower band, aligned with the input.
#[derive(Debug, Clone)]
pub struct BollingerOutput<T: SeriesElement> {
    /// Middle plus `k` deviations.
    pub upper: Vec<T>,
    /// Simple moving average.
    pub middle: Vec<T>,
    /// Middle minus `k` deviations.
    pub lower: Vec<T>,
}

/// Minimum input length that yields one band value.
#[inline]
#[must_use]
pub const fn bollinger_min_len(period: usize) -> usize {
    period
}

/// Computes Bollinger Bands.
///
/// # Errors
///
/// - `Error::InvalidPeriod` if `period` is zero
/// - `Error::InvalidParameter` if `k` is negative or not finite
/// - `Error::EmptyInput` if `data` is empty
/// - `Error::InsufficientData` if `data` is shorter than `period`
#[must_use = "this returns a Result with the band values, which should be used"]
pub fn bollinger<T: SeriesElement>(data: &[T], period: usize, k: T) -> Result<BollingerOutput<T>> {
    validate_indicator_input(data, period, "bollinger")?;
    if !k.is_finite() || k < T::zero() {
        return Err(Error::InvalidParameter {
            name: "k",
            reason: "deviation multiplier must be a non-negative number".to_string(),
        });
    }

    let n = data.len();
    let p = T::from_usize(period)?;
    let mut upper = vec![T::nan(); n];
    let mut middle = vec![T::nan(); n];
    let mut lower = vec![T::nan(); n];

    let mut sum = T::zero();
    let mut sum_sq = T::zero();
    for (i, &x) in data.iter().enumerate() {
        sum = sum + x;
        sum_sq = sum_sq + x * x;
        if i >= period {
            let old = data[i - period];
            sum = sum - old;
            sum_sq = sum_sq - old * old;
        }
        if i + 1 >= period {
            let mean = sum / p;
            // Cancellation can leave a tiny negative variance on flat windows.
            let variance = (sum_sq / p - mean * mean).max(T::zero());
            let width = k * variance.sqrt();
            middle[i] = mean;
            upper[i] = mean + width;
            lower[i] = mean - width;
        }
    }

    Ok(BollingerOutput {
        upper,
        middle,
        lower,
    })
}
