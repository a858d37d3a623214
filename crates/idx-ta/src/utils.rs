//! Small numeric helpers shared by the analyzers.
//!
//! Everything here operates on `f64` columns already cleaned by the
//! normalizer. Functions that can divide by zero return `Option` so the caller
//! decides how to record the guard.
//!
//! ```
//! use idx_ta::utils::{pct_change, round2};
//!
//! assert_eq!(round2(8767.4000001), 8767.4);
//! assert!((pct_change(100.0, 110.0).unwrap() - 10.0).abs() < 1e-9);
//! assert_eq!(pct_change(0.0, 5.0), None);
//! ```

/// Rounds to two decimals, the precision prices are reported at.
#[inline]
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Percentage change from `from` to `to`, `None` when `from` is zero.
#[inline]
#[must_use]
pub fn pct_change(from: f64, to: f64) -> Option<f64> {
    if from == 0.0 {
        None
    } else {
        Some((to - from) / from * 100.0)
    }
}

/// Arithmetic mean, `None` for an empty slice.
#[must_use]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = values.len() as f64;
    Some(values.iter().sum::<f64>() / n)
}

/// Population standard deviation, `None` for an empty slice.
#[must_use]
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    #[allow(clippy::cast_precision_loss)]
    let n = values.len() as f64;
    Some((values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n).sqrt())
}

/// Sample standard deviation (n − 1), `None` below two values.
#[must_use]
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    #[allow(clippy::cast_precision_loss)]
    let dof = (values.len() - 1) as f64;
    Some((values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / dof).sqrt())
}

/// Mean of the last `window` values, or of all values when fewer exist.
#[must_use]
pub fn trailing_mean(values: &[f64], window: usize) -> Option<f64> {
    let start = values.len().saturating_sub(window);
    mean(&values[start..])
}

/// Pearson correlation of two equally long samples.
///
/// Returns `None` when the samples differ in length, have fewer than two
/// points, or one of them has zero variance.
#[must_use]
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let mx = mean(xs)?;
    let my = mean(ys)?;
    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mx;
        let dy = y - my;
        cov += dx * dy;
        vx += dx * dx;
        vy += dy * dy;
    }
    if vx == 0.0 || vy == 0.0 {
        return None;
    }
    Some((cov / (vx.sqrt() * vy.sqrt())).clamp(-1.0, 1.0))
}

/// Converts a NaN-prefixed indicator value into an `Option`.
#[inline]
#[must_use]
pub fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// Last finite value of an indicator column.
#[must_use]
pub fn last_finite(values: &[f64]) -> Option<f64> {
    values.last().copied().and_then(finite)
}
