//! Numeric element trait and the length checks shared by kernels and analyzers.
//!
//! Kernels are generic over [`SeriesElement`] so they run on `f32` as well as
//! the `f64` columns a [`Series`](crate::series::Series) exposes. Both slices
//! and whole series implement [`ValidatedInput`], which turns a short history
//! into the same `InsufficientData` error wherever it is detected.
//!
//! ```
//! use idx_ta::traits::{validate_indicator_input, SeriesElement};
//!
//! fn last_window_mean<T: SeriesElement>(data: &[T], period: usize) -> idx_ta::Result<T> {
//!     validate_indicator_input(data, period, "last_window_mean")?;
//!     let sum = data[data.len() - period..].iter().fold(T::zero(), |acc, &x| acc + x);
//!     Ok(sum / T::from_usize(period)?)
//! }
//!
//! let closes = [8500.0_f64, 8600.0, 8700.0, 8800.0];
//! assert!((last_window_mean(&closes, 2).unwrap() - 8750.0).abs() < 1e-10);
//! ```

use num_traits::{Float, NumCast};

use crate::error::{Error, Result};
use crate::series::Series;

/// Floating-point type a kernel can compute in.
///
/// `Send + Sync` lets columns cross rayon workers in batch runs.
pub trait SeriesElement: Float + NumCast + Copy + Default + Send + Sync + 'static {
    /// Converts a bar count or period.
    ///
    /// # Errors
    ///
    /// Returns `Error::NumericConversion` when the count is not representable.
    #[inline]
    fn from_usize(value: usize) -> Result<Self> {
        <Self as NumCast>::from(value).ok_or(Error::NumericConversion {
            context: "bar count to series element",
        })
    }

    /// 2, for EMA smoothing and midpoints.
    #[inline]
    #[must_use]
    fn two() -> Self {
        Self::one() + Self::one()
    }

    /// 100, for percentage oscillators.
    #[inline]
    #[must_use]
    fn hundred() -> Self {
        let five = Self::two() + Self::two() + Self::one();
        let twenty = five * (Self::two() + Self::two());
        twenty * five
    }

    /// 50, the neutral RSI reading.
    #[inline]
    #[must_use]
    fn fifty() -> Self {
        Self::hundred() / Self::two()
    }
}

impl<T: Float + NumCast + Copy + Default + Send + Sync + 'static> SeriesElement for T {}

/// Anything with a bar count that an analyzer or kernel may reject as too short.
pub trait ValidatedInput {
    /// Number of bars or values.
    fn len(&self) -> usize;

    /// True when there is nothing to analyze.
    #[inline]
    #[must_use]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fails unless at least `required` values are present.
    ///
    /// # Errors
    ///
    /// Returns `Error::InsufficientData` naming `consumer`.
    #[inline]
    fn require(&self, required: usize, consumer: &'static str) -> Result<()> {
        let actual = self.len();
        if actual >= required {
            return Ok(());
        }
        Err(Error::InsufficientData {
            required,
            actual,
            indicator: consumer,
        })
    }

    /// Fails on empty input.
    ///
    /// # Errors
    ///
    /// Returns `Error::EmptyInput`.
    #[inline]
    fn require_non_empty(&self) -> Result<()> {
        if self.is_empty() {
            return Err(Error::EmptyInput);
        }
        Ok(())
    }
}

impl<T: SeriesElement> ValidatedInput for [T] {
    #[inline]
    fn len(&self) -> usize {
        <[T]>::len(self)
    }
}

impl ValidatedInput for Series {
    #[inline]
    fn len(&self) -> usize {
        self.bars().len()
    }
}

/// Rejects a zero lookback period.
///
/// # Errors
///
/// Returns `Error::InvalidPeriod`.
#[inline]
pub const fn validate_period(period: usize) -> Result<()> {
    match period {
        0 => Err(Error::InvalidPeriod {
            period,
            reason: "period must be at least 1",
        }),
        _ => Ok(()),
    }
}

/// Checks the period, then emptiness, then that one full window fits.
///
/// # Errors
///
/// `InvalidPeriod`, `EmptyInput` or `InsufficientData`, in that order.
#[inline]
pub fn validate_indicator_input<T: SeriesElement>(
    data: &[T],
    period: usize,
    indicator: &'static str,
) -> Result<()> {
    validate_period(period)?;
    data.require_non_empty()?;
    data.require(period, indicator)
}

/// Checks that parallel OHLCV columns line up.
///
/// # Errors
///
/// Returns `Error::LengthMismatch` for the first column whose length differs
/// from the first one.
pub fn validate_same_length<T: SeriesElement>(columns: &[(&'static str, &[T])]) -> Result<()> {
    let Some(((first_name, first), rest)) = columns.split_first() else {
        return Ok(());
    };
    match rest.iter().find(|(_, col)| col.len() != first.len()) {
        Some((name, col)) => Err(Error::LengthMismatch {
            description: format!(
                "{name} has {} values but {first_name} has {}",
                col.len(),
                first.len()
            ),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::all, clippy::pedantic, clippy::nursery)]
    use super::*;
    use crate::series::Bar;

    // ==================== SeriesElement Tests ====================

    #[test]
    fn test_from_usize_both_widths() {
        let wide: f64 = SeriesElement::from_usize(250).unwrap();
        let narrow: f32 = SeriesElement::from_usize(250).unwrap();
        assert_eq!(wide, 250.0);
        assert_eq!(narrow, 250.0);
    }

    #[test]
    fn test_constants() {
        assert_eq!(<f64 as SeriesElement>::two(), 2.0);
        assert_eq!(<f64 as SeriesElement>::hundred(), 100.0);
        assert_eq!(<f32 as SeriesElement>::fifty(), 50.0);
    }

    // ==================== ValidatedInput Tests ====================

    #[test]
    fn test_slice_require() {
        let closes = [9000.0_f64, 9025.0, 9050.0];
        assert!(closes.require(3, "sma").is_ok());
        match closes.require(20, "sma") {
            Err(Error::InsufficientData {
                required: 20,
                actual: 3,
                indicator: "sma",
            }) => {}
            other => panic!("expected InsufficientData, got {other:?}"),
        }
        let empty: [f64; 0] = [];
        assert!(matches!(empty.require_non_empty(), Err(Error::EmptyInput)));
    }

    #[test]
    fn test_series_require_names_analyzer() {
        let series = Series::normalize(vec![
            Bar::new(0, 100.0, 101.0, 99.0, 100.0, 1.0),
            Bar::new(86_400, 100.0, 102.0, 99.0, 101.0, 1.0),
        ])
        .unwrap();
        assert!(series.require(2, "volume").is_ok());
        let err = series.require(26, "cloud").unwrap_err();
        assert!(err.to_string().contains("cloud"));
    }

    // ==================== Validation Helper Tests ====================

    #[test]
    fn test_validate_period_zero() {
        assert!(matches!(
            validate_period(0),
            Err(Error::InvalidPeriod { period: 0, .. })
        ));
        assert!(validate_period(14).is_ok());
    }

    #[test]
    fn test_validate_indicator_input_order() {
        assert!(matches!(
            validate_indicator_input::<f64>(&[], 0, "ema"),
            Err(Error::InvalidPeriod { .. })
        ));
        assert!(matches!(
            validate_indicator_input::<f64>(&[], 3, "ema"),
            Err(Error::EmptyInput)
        ));
        assert!(matches!(
            validate_indicator_input(&[1.0_f64, 2.0], 3, "ema"),
            Err(Error::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_validate_same_length() {
        let highs = [102.0_f64, 104.0];
        let lows = [98.0_f64];
        assert!(validate_same_length(&[("high", &highs[..]), ("low", &highs[..])]).is_ok());
        let err = validate_same_length(&[("high", &highs[..]), ("low", &lows[..])]).unwrap_err();
        assert!(err.to_string().contains("low has 1 values but high has 2"));
    }
}
