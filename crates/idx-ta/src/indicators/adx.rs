//! Average Directional Index (ADX) with +DI and −DI.
//!
//! Wilder's construction:
//!
//! ```text
//! +DM = up_move   if up_move > down_move and up_move > 0, else 0
//! −DM = down_move if down_move > up_move and down_move > 0, else 0
//! smoothed = prev − prev / period + current        (seeded with the first sum)
//! ±DI = 100 × smoothed ±DM / smoothed TR
//! DX  = 100 × |+DI − −DI| / (+DI + −DI)
//! ADX[2p−1] = mean(DX[p..2p−1]);  ADX[i] = (ADX[i−1] × (p − 1) + DX[i]) / p
//! ```
//!
//! Zero denominators yield 0 rather than NaN.
//!
//! ```
//! use idx_ta::indicators::adx;
//!
//! let high: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
//! let low: Vec<f64> = high.iter().map(|h| h - 2.0).collect();
//! let close: Vec<f64> = high.iter().map(|h| h - 1.0).collect();
//! let out = adx(&high, &low, &close, 14).unwrap();
//! assert!(out.adx[26].is_nan());
//! assert!(out.adx[27] > 25.0);
//! ```

use crate::error::{Error, Result};
use crate::indicators::atr::{bar_true_range, check_hlc};
use crate::traits::{validate_period, SeriesElement};

/// ADX, +DI and −DI aligned with the input.
#[derive(Debug, Clone)]
pub struct AdxOutput<T> {
    /// Average Directional Index (0–100).
    pub adx: Vec<T>,
    /// Positive Directional Indicator (0–100).
    pub plus_di: Vec<T>,
    /// Negative Directional Indicator (0–100).
    pub minus_di: Vec<T>,
}

/// Number of leading NaN values in the ADX line: `2 × period − 1`.
#[inline]
#[must_use]
pub const fn adx_lookback(period: usize) -> usize {
    (2 * period).saturating_sub(1)
}

/// Minimum input length that yields one ADX value: `2 × period`.
#[inline]
#[must_use]
pub const fn adx_min_len(period: usize) -> usize {
    2 * period
}

/// Number of leading NaN values in the DI lines.
#[inline]
#[must_use]
pub const fn di_lookback(period: usize) -> usize {
    period
}

/// Computes ADX with +DI and −DI.
///
/// # Errors
///
/// - `Error::InvalidPeriod` if `period` is zero
/// - `Error::EmptyInput` / `Error::LengthMismatch` for malformed columns
/// - `Error::InsufficientData` if fewer than `2 × period` bars are given
#[must_use = "this returns a Result with the ADX output, which should be used"]
pub fn adx<T: SeriesElement>(
    high: &[T],
    low: &[T],
    close: &[T],
    period: usize,
) -> Result<AdxOutput<T>> {
    validate_period(period)?;
    check_hlc(high, low, close)?;
    if high.len() < adx_min_len(period) {
        return Err(Error::InsufficientData {
            required: adx_min_len(period),
            actual: high.len(),
            indicator: "adx",
        });
    }

    let n = high.len();
    let mut out = AdxOutput {
        adx: vec![T::nan(); n],
        plus_di: vec![T::nan(); n],
        minus_di: vec![T::nan(); n],
    };
    compute_adx_core(high, low, close, period, &mut out)?;
    Ok(out)
}

#[inline]
fn compute_directional_movement<T: SeriesElement>(
    high: T,
    prev_high: T,
    low: T,
    prev_low: T,
) -> (T, T) {
    let up_move = high - prev_high;
    let down_move = prev_low - low;
    let plus_dm = if up_move > down_move && up_move > T::zero() {
        up_move
    } else {
        T::zero()
    };
    let minus_dm = if down_move > up_move && down_move > T::zero() {
        down_move
    } else {
        T::zero()
    };
    (plus_dm, minus_dm)
}

#[inline]
fn ratio_pct<T: SeriesElement>(num: T, den: T) -> T {
    if den > T::zero() {
        T::hundred() * num / den
    } else {
        T::zero()
    }
}

struct Smoothed<T> {
    tr: T,
    plus_dm: T,
    minus_dm: T,
}

impl<T: SeriesElement> Smoothed<T> {
    fn di(&self) -> (T, T) {
        (
            ratio_pct(self.plus_dm, self.tr),
            ratio_pct(self.minus_dm, self.tr),
        )
    }
}

fn compute_adx_core<T: SeriesElement>(
    high: &[T],
    low: &[T],
    close: &[T],
    period: usize,
    out: &mut AdxOutput<T>,
) -> Result<()> {
    let n = high.len();
    let period_t = T::from_usize(period)?;
    let period_minus_one_t = T::from_usize(period - 1)?;

    let bar = |i: usize| {
        let tr = bar_true_range(high[i], low[i], close[i - 1]);
        let (p, m) = compute_directional_movement(high[i], high[i - 1], low[i], low[i - 1]);
        (tr, p, m)
    };

    let mut sm = Smoothed {
        tr: T::zero(),
        plus_dm: T::zero(),
        minus_dm: T::zero(),
    };
    for i in 1..=period {
        let (tr, p, m) = bar(i);
        sm.tr = sm.tr + tr;
        sm.plus_dm = sm.plus_dm + p;
        sm.minus_dm = sm.minus_dm + m;
    }

    let (plus_di, minus_di) = sm.di();
    out.plus_di[period] = plus_di;
    out.minus_di[period] = minus_di;
    let mut dx_sum = ratio_pct((plus_di - minus_di).abs(), plus_di + minus_di);

    let mut prev_adx = T::nan();
    if period == 1 {
        // The seed DX alone forms the first ADX.
        prev_adx = dx_sum;
        out.adx[1] = prev_adx;
    }
    for i in (period + 1)..n {
        let (tr, p, m) = bar(i);
        sm.tr = sm.tr - sm.tr / period_t + tr;
        sm.plus_dm = sm.plus_dm - sm.plus_dm / period_t + p;
        sm.minus_dm = sm.minus_dm - sm.minus_dm / period_t + m;

        let (plus_di, minus_di) = sm.di();
        out.plus_di[i] = plus_di;
        out.minus_di[i] = minus_di;
        let dx = ratio_pct((plus_di - minus_di).abs(), plus_di + minus_di);

        if i < 2 * period - 1 {
            dx_sum = dx_sum + dx;
        } else if i == 2 * period - 1 {
            prev_adx = (dx_sum + dx) / period_t;
            out.adx[i] = prev_adx;
        } else {
            prev_adx = (prev_adx * period_minus_one_t + dx) / period_t;
            out.adx[i] = prev_adx;
        }
    }

    Ok(())
}
