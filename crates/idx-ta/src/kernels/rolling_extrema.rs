//! Rolling extrema using a monotonic deque.
//!
//! The deque holds indices whose values are monotonically ordered (decreasing
//! for max, increasing for min), so the front is always the window extremum.
//! Equal values do not evict earlier ones: the front is the *earliest* index
//! holding the extremum. The swing detector relies on that tie rule.
//!
//! ```
//! use idx_ta::kernels::rolling_extrema::{rolling_argmax, rolling_max};
//!
//! let highs = vec![3.0_f64, 5.0, 4.0, 5.0, 2.0];
//! let max = rolling_max(&highs, 3).unwrap();
//! assert_eq!(max[2], 5.0);
//! let arg = rolling_argmax(&highs, 3).unwrap();
//! assert_eq!(arg[3], Some(1)); // window [5, 4, 5]: earliest 5 wins
//! ```

use std::collections::VecDeque;

use crate::error::Result;
use crate::traits::{validate_indicator_input, SeriesElement};

/// A monotonic deque tracking the extremum of a sliding window.
#[derive(Debug, Clone)]
pub struct MonotonicDeque<T> {
    deque: VecDeque<usize>,
    period: usize,
    _phantom: std::marker::PhantomData<T>,
}

impl<T: SeriesElement> MonotonicDeque<T> {
    /// Creates a deque for windows of `period` elements.
    #[must_use]
    pub fn new(period: usize) -> Self {
        Self {
            deque: VecDeque::with_capacity(period),
            period,
            _phantom: std::marker::PhantomData,
        }
    }

    /// Returns the window size.
    #[must_use]
    pub const fn period(&self) -> usize {
        self.period
    }

    /// Returns true if no index is tracked.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deque.is_empty()
    }

    /// Pushes `data[index]` for a rolling maximum. NaN values are skipped.
    #[inline]
    pub fn push_max(&mut self, index: usize, data: &[T]) {
        self.push_by(index, data, |new, back| new > back);
    }

    /// Pushes `data[index]` for a rolling minimum. NaN values are skipped.
    #[inline]
    pub fn push_min(&mut self, index: usize, data: &[T]) {
        self.push_by(index, data, |new, back| new < back);
    }

    #[inline]
    fn push_by(&mut self, index: usize, data: &[T], evicts: impl Fn(T, T) -> bool) {
        let value = data[index];
        if !value.is_nan() {
            while let Some(&back) = self.deque.back() {
                if evicts(value, data[back]) {
                    self.deque.pop_back();
                } else {
                    break;
                }
            }
            self.deque.push_back(index);
        }
        self.remove_expired(index);
    }

    #[inline]
    fn remove_expired(&mut self, current_index: usize) {
        if current_index + 1 >= self.period {
            let window_start = current_index + 1 - self.period;
            while let Some(&front) = self.deque.front() {
                if front < window_start {
                    self.deque.pop_front();
                } else {
                    break;
                }
            }
        }
    }

    /// Index of the current extremum, `None` if the window holds only NaN.
    #[inline]
    #[must_use]
    pub fn front_index(&self) -> Option<usize> {
        self.deque.front().copied()
    }

    /// Current extremum, NaN if the window holds only NaN.
    #[inline]
    pub fn get_extremum(&self, data: &[T]) -> T {
        self.front_index().map_or_else(T::nan, |idx| data[idx])
    }
}

/// Number of leading NaN values in rolling extrema output.
#[inline]
#[must_use]
pub const fn rolling_extrema_lookback(period: usize) -> usize {
    period.saturating_sub(1)
}

fn rolling_index<T: SeriesElement>(
    data: &[T],
    period: usize,
    indicator: &'static str,
    push: fn(&mut MonotonicDeque<T>, usize, &[T]),
) -> Result<Vec<Option<usize>>> {
    validate_indicator_input(data, period, indicator)?;
    let mut result = vec![None; data.len()];
    let mut deque = MonotonicDeque::new(period);
    for i in 0..data.len() {
        push(&mut deque, i, data);
        if i + 1 >= period {
            result[i] = deque.front_index();
        }
    }
    Ok(result)
}

/// Position of the window maximum ending at each index (earliest on ties).
///
/// # Errors
///
/// - `Error::InvalidPeriod` if `period` is zero
/// - `Error::EmptyInput` if `data` is empty
/// - `Error::InsufficientData` if `data` is shorter than `period`
pub fn rolling_argmax<T: SeriesElement>(data: &[T], period: usize) -> Result<Vec<Option<usize>>> {
    rolling_index(data, period, "rolling_argmax", MonotonicDeque::push_max)
}

/// Position of the window minimum ending at each index (earliest on ties).
///
/// # Errors
///
/// Same as [`rolling_argmax`].
pub fn rolling_argmin<T: SeriesElement>(data: &[T], period: usize) -> Result<Vec<Option<usize>>> {
    rolling_index(data, period, "rolling_argmin", MonotonicDeque::push_min)
}

/// Rolling maximum; the first `period - 1` values are NaN.
///
/// # Errors
///
/// Same as [`rolling_argmax`].
pub fn rolling_max<T: SeriesElement>(data: &[T], period: usize) -> Result<Vec<T>> {
    Ok(rolling_argmax(data, period)?
        .into_iter()
        .map(|idx| idx.map_or_else(T::nan, |i| data[i]))
        .collect())
}

/// Rolling minimum; the first `period - 1` values are NaN.
///
/// # Errors
///
/// Same as [`rolling_argmax`].
pub fn rolling_min<T: SeriesElement>(data: &[T], period: usize) -> Result<Vec<T>> {
    Ok(rolling_argmin(data, period)?
        .into_iter()
        .map(|idx| idx.map_or_else(T::nan, |i| data[i]))
        .collect())
}

/// `(highest high + lowest low) / 2` over each window, as used by Ichimoku lines.
///
/// # Errors
///
/// Same as [`rolling_argmax`]; `high` and `low` must have equal length.
pub fn rolling_midpoint<T: SeriesElement>(high: &[T], low: &[T], period: usize) -> Result<Vec<T>> {
    crate::traits::validate_same_length(&[("high", high), ("low", low)])?;
    let hi = rolling_max(high, period)?;
    let lo = rolling_min(low, period)?;
    Ok(hi
        .iter()
        .zip(&lo)
        .map(|(&h, &l)| (h + l) / T::two())
        .collect())
}
