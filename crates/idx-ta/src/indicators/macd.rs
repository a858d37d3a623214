//! Moving Average Convergence Divergence (MACD).
//!
//! MACD line = EMA(fast) − EMA(slow). The signal line is an EMA of the MACD
//! line seeded with the SMA of its first `signal_period` valid values, and the
//! histogram is MACD − signal. The divergence detector reads the histogram.

use crate::error::{Error, Result};
use crate::indicators::ema::ema;
use crate::traits::{validate_period, SeriesElement, ValidatedInput};

/// MACD line, signal line and histogram, aligned with the input.
#[derive(Debug, Clone)]
pub struct MacdOutput<T: SeriesElement> {
    /// Fast EMA minus slow EMA; first `slow - 1` values are NaN.
    pub macd_line: Vec<T>,
    /// EMA of the MACD line; first `slow + signal - 2` values are NaN.
    pub signal_line: Vec<T>,
    /// MACD line minus signal line.
    pub histogram: Vec<T>,
}

/// Index of the first valid MACD line value.
#[inline]
#[must_use]
pub const fn macd_line_lookback(slow_period: usize) -> usize {
    slow_period.saturating_sub(1)
}

/// Index of the first valid signal and histogram value.
#[inline]
#[must_use]
pub const fn macd_signal_lookback(slow_period: usize, signal_period: usize) -> usize {
    (slow_period + signal_period).saturating_sub(2)
}

/// Minimum input length that yields one histogram value.
#[inline]
#[must_use]
pub const fn macd_min_len(slow_period: usize, signal_period: usize) -> usize {
    slow_period + signal_period - 1
}

/// Computes MACD with standard EMA smoothing.
///
/// # Errors
///
/// - `Error::InvalidPeriod` if a period is zero or `fast_period >= slow_period`
/// - `Error::EmptyInput` if `data` is empty
/// - `Error::InsufficientData` if `data` is shorter than [`macd_min_len`]
#[must_use = "this returns a Result with the MACD output, which should be used"]
pub fn macd<T: SeriesElement>(
    data: &[T],
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
) -> Result<MacdOutput<T>> {
    validate_macd_inputs(data, fast_period, slow_period, signal_period)?;

    let fast = ema(data, fast_period)?;
    let slow = ema(data, slow_period)?;
    let macd_line: Vec<T> = fast.iter().zip(&slow).map(|(&f, &s)| f - s).collect();

    let signal_line =
        compute_signal_line(&macd_line, signal_period, macd_line_lookback(slow_period))?;
    let histogram = macd_line
        .iter()
        .zip(&signal_line)
        .map(|(&m, &s)| m - s)
        .collect();

    Ok(MacdOutput {
        macd_line,
        signal_line,
        histogram,
    })
}

fn validate_macd_inputs<T: SeriesElement>(
    data: &[T],
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
) -> Result<()> {
    validate_period(fast_period)?;
    validate_period(slow_period)?;
    validate_period(signal_period)?;
    if fast_period >= slow_period {
        return Err(Error::InvalidPeriod {
            period: fast_period,
            reason: "fast_period must be less than slow_period",
        });
    }
    data.require_non_empty()?;
    data.require(macd_min_len(slow_period, signal_period), "macd")
}

fn compute_signal_line<T: SeriesElement>(
    macd_line: &[T],
    signal_period: usize,
    first_valid_macd: usize,
) -> Result<Vec<T>> {
    let n = macd_line.len();
    let mut signal_line = vec![T::nan(); n];
    let first_valid_signal = first_valid_macd + signal_period - 1;
    if first_valid_signal >= n {
        return Ok(signal_line);
    }

    let alpha = T::two() / T::from_usize(signal_period + 1)?;
    let one_minus_alpha = T::one() - alpha;
    let seed = macd_line[first_valid_macd..=first_valid_signal]
        .iter()
        .fold(T::zero(), |acc, &x| acc + x)
        / T::from_usize(signal_period)?;
    signal_line[first_valid_signal] = seed;

    let mut ema_prev = seed;
    for i in (first_valid_signal + 1)..n {
        if !macd_line[i].is_nan() {
            ema_prev = alpha * macd_line[i] + one_minus_alpha * ema_prev;
            signal_line[i] = ema_prev;
        }
    }
    Ok(signal_line)
}
