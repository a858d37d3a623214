//! On-Balance Volume.
//!
//! The running total starts at the first bar's volume. Each later bar adds its
//! volume on an up close, subtracts it on a down close and leaves the total
//! alone on an unchanged close. IDX prices move in whole ticks, so unchanged
//! closes are common on thinly traded names.

use std::cmp::Ordering;

use crate::error::Result;
use crate::traits::{validate_same_length, SeriesElement, ValidatedInput};

/// OBV is defined from the first bar.
#[inline]
#[must_use]
pub const fn obv_lookback() -> usize {
    0
}

/// Cumulative on-balance volume aligned with `close`.
///
/// # Errors
///
/// - `Error::EmptyInput` for an empty close column
/// - `Error::LengthMismatch` when volume is misaligned
#[must_use = "the OBV column is the only output"]
pub fn obv<T: SeriesElement>(close: &[T], volume: &[T]) -> Result<Vec<T>> {
    close.require_non_empty()?;
    validate_same_length(&[("close", close), ("volume", volume)])?;

    let steps = close.windows(2).zip(&volume[1..]).map(|(pair, &vol)| {
        match pair[1].partial_cmp(&pair[0]) {
            Some(Ordering::Greater) => vol,
            Some(Ordering::Less) => -vol,
            _ => T::zero(),
        }
    });
    let output = std::iter::once(volume[0])
        .chain(steps)
        .scan(T::zero(), |total, delta| {
            *total = *total + delta;
            Some(*total)
        })
        .collect();
    Ok(output)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::all, clippy::pedantic, clippy::nursery)]
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_obv_tick_moves() {
        let close = [500.0_f64, 505.0, 500.0, 500.0, 510.0];
        let volume = [1e6_f64, 2e6, 1.5e6, 3e6, 2.5e6];
        let result = obv(&close, &volume).unwrap();
        assert_eq!(result, vec![1e6, 3e6, 1.5e6, 1.5e6, 4e6]);
        assert_eq!(obv_lookback(), 0);
    }

    #[test]
    fn test_obv_single_bar() {
        assert_eq!(obv(&[9000.0_f64], &[42.0]).unwrap(), vec![42.0]);
    }

    #[test]
    fn test_obv_errors() {
        assert!(matches!(obv::<f64>(&[], &[]), Err(Error::EmptyInput)));
        assert!(matches!(
            obv(&[1.0_f64, 2.0], &[1.0]),
            Err(Error::LengthMismatch { .. })
        ));
    }
}
