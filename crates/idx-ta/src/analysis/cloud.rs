//! Ichimoku cloud classification.
//!
//! The leading spans are plotted `displacement` bars ahead, so the cloud under
//! the latest bar is built from values computed `displacement` bars earlier.
//! When the series is too short for either span the price is placed against
//! the kijun instead and the state is marked incomplete.

use serde::{Deserialize, Serialize};

use crate::config::CloudConfig;
use crate::error::{Error, Result};
use crate::kernels::rolling_midpoint;
use crate::series::Series;
use crate::traits::ValidatedInput;

use super::{Direction, Signal};

/// Color of the cloud under the latest bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CloudColor {
    /// Span A above span B.
    Bullish,
    /// Span A at or below span B.
    Bearish,
    /// A span is unavailable.
    Unknown,
}

/// Latest close relative to the cloud (or to the kijun when incomplete).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CloudPosition {
    /// Above the top.
    Above,
    /// Between the spans, or exactly on the kijun.
    Inside,
    /// Below the bottom.
    Below,
}

/// Ichimoku reading at the latest bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudState {
    /// Conversion line.
    pub tenkan: f64,
    /// Base line.
    pub kijun: f64,
    /// Leading span A under the latest bar.
    pub senkou_a: Option<f64>,
    /// Leading span B under the latest bar.
    pub senkou_b: Option<f64>,
    /// Lagging span: the latest close.
    pub chikou: f64,
    /// Close `displacement` bars back, which the lagging span is compared with.
    pub chikou_reference: Option<f64>,
    /// Cloud color.
    pub cloud_color: CloudColor,
    /// Where the close sits.
    pub price_vs_cloud: CloudPosition,
    /// Bullish when tenkan is above kijun.
    pub tk_cross: Direction,
    /// Combined signal.
    pub signal: Signal,
    /// Both leading spans were available.
    pub data_complete: bool,
}

/// Position of `price` against a `[bottom, top]` band.
#[must_use]
pub fn position(price: f64, top: f64, bottom: f64) -> CloudPosition {
    if price > top {
        CloudPosition::Above
    } else if price < bottom {
        CloudPosition::Below
    } else {
        CloudPosition::Inside
    }
}

/// Signal table for a complete cloud.
#[must_use]
pub fn cloud_signal(tk_cross: Direction, position: CloudPosition, color: CloudColor) -> Signal {
    match (tk_cross, position, color) {
        (Direction::Bullish, CloudPosition::Above, CloudColor::Bullish) => Signal::StrongBullish,
        (Direction::Bearish, CloudPosition::Below, CloudColor::Bearish) => Signal::StrongBearish,
        (_, CloudPosition::Above, _) => Signal::Bullish,
        (_, CloudPosition::Below, _) => Signal::Bearish,
        _ => Signal::Neutral,
    }
}

/// Signal when only tenkan and kijun are known.
#[must_use]
pub fn partial_signal(tk_cross: Direction, position: CloudPosition) -> Signal {
    match (tk_cross, position) {
        (Direction::Bullish, CloudPosition::Above) => Signal::Bullish,
        (Direction::Bearish, CloudPosition::Below) => Signal::Bearish,
        _ => Signal::Neutral,
    }
}

fn value_at(values: &[f64], idx: Option<usize>) -> Option<f64> {
    values.get(idx?).copied().filter(|v| v.is_finite())
}

/// Classifies the latest bar against the cloud.
///
/// # Errors
///
/// - `Error::InsufficientData` when the series is shorter than the kijun window
/// - `Error::InvalidPeriod` if a window is zero
pub fn analyze_cloud(series: &Series, config: &CloudConfig) -> Result<CloudState> {
    let required = config.kijun.max(config.tenkan);
    series.require(required, "cloud")?;

    let highs = series.highs();
    let lows = series.lows();
    let closes = series.closes();
    let n = series.len();
    let last = n - 1;

    let tenkan_line = rolling_midpoint(highs, lows, config.tenkan)?;
    let kijun_line = rolling_midpoint(highs, lows, config.kijun)?;
    let span_b_line = match rolling_midpoint(highs, lows, config.senkou_b) {
        Ok(values) => Some(values),
        Err(Error::InsufficientData { .. }) => None,
        Err(other) => return Err(other),
    };

    let (Some(tenkan), Some(kijun)) = (
        value_at(&tenkan_line, Some(last)),
        value_at(&kijun_line, Some(last)),
    ) else {
        return Err(Error::InsufficientData {
            required,
            actual: n,
            indicator: "cloud",
        });
    };

    let source = last.checked_sub(config.displacement);
    let senkou_a = value_at(&tenkan_line, source)
        .zip(value_at(&kijun_line, source))
        .map(|(t, k)| (t + k) / 2.0);
    let senkou_b = span_b_line.and_then(|line| value_at(&line, source));

    let chikou = closes[last];
    let chikou_reference = source.map(|i| closes[i]);
    let tk_cross = if tenkan > kijun {
        Direction::Bullish
    } else if tenkan < kijun {
        Direction::Bearish
    } else {
        Direction::Neutral
    };

    let (cloud_color, price_vs_cloud, signal, data_complete) = match (senkou_a, senkou_b) {
        (Some(a), Some(b)) => {
            let color = if a > b {
                CloudColor::Bullish
            } else {
                CloudColor::Bearish
            };
            let pos = position(chikou, a.max(b), a.min(b));
            (color, pos, cloud_signal(tk_cross, pos, color), true)
        }
        _ => {
            let pos = position(chikou, kijun, kijun);
            (CloudColor::Unknown, pos, partial_signal(tk_cross, pos), false)
        }
    };

    Ok(CloudState {
        tenkan,
        kijun,
        senkou_a,
        senkou_b,
        chikou,
        chikou_reference,
        cloud_color,
        price_vs_cloud,
        tk_cross,
        signal,
        data_complete,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::all, clippy::pedantic, clippy::nursery)]
    use super::*;
    use crate::series::Bar;
    use approx::assert_relative_eq;

    fn linear(n: usize, start: f64, step: f64) -> Series {
        let bars = (0..n)
            .map(|i| {
                let c = start + step * i as f64;
                Bar::new(i as i64, c, c + 2.0, c - 2.0, c, 1000.0)
            })
            .collect();
        Series::normalize(bars).unwrap()
    }

    // ==================== Decision Table Tests ====================

    #[test]
    fn test_cloud_signal_table() {
        use CloudColor as C;
        use CloudPosition as P;
        use Direction as D;
        assert_eq!(cloud_signal(D::Bullish, P::Above, C::Bullish), Signal::StrongBullish);
        assert_eq!(cloud_signal(D::Bearish, P::Above, C::Bullish), Signal::Bullish);
        assert_eq!(cloud_signal(D::Bullish, P::Above, C::Bearish), Signal::Bullish);
        assert_eq!(cloud_signal(D::Bearish, P::Below, C::Bearish), Signal::StrongBearish);
        assert_eq!(cloud_signal(D::Bullish, P::Below, C::Bearish), Signal::Bearish);
        assert_eq!(cloud_signal(D::Bullish, P::Inside, C::Bullish), Signal::Neutral);
    }

    #[test]
    fn test_partial_signal_table() {
        assert_eq!(partial_signal(Direction::Bullish, CloudPosition::Above), Signal::Bullish);
        assert_eq!(partial_signal(Direction::Bearish, CloudPosition::Above), Signal::Neutral);
        assert_eq!(partial_signal(Direction::Bearish, CloudPosition::Below), Signal::Bearish);
        assert_eq!(partial_signal(Direction::Bullish, CloudPosition::Inside), Signal::Neutral);
    }

    #[test]
    fn test_position_boundaries() {
        assert_eq!(position(11.0, 10.0, 5.0), CloudPosition::Above);
        assert_eq!(position(10.0, 10.0, 5.0), CloudPosition::Inside);
        assert_eq!(position(5.0, 10.0, 5.0), CloudPosition::Inside);
        assert_eq!(position(4.0, 10.0, 5.0), CloudPosition::Below);
    }

    // ==================== Analyzer Tests ====================

    #[test]
    fn test_flat_series_has_neutral_tk_cross() {
        let state = analyze_cloud(&linear(120, 100.0, 0.0), &CloudConfig::default()).unwrap();
        assert_eq!(state.tenkan, state.kijun);
        assert_eq!(state.tk_cross, Direction::Neutral);
        assert_eq!(state.price_vs_cloud, CloudPosition::Inside);
        assert_eq!(state.signal, Signal::Neutral);
    }

    #[test]
    fn test_short_series_is_an_error() {
        let err = analyze_cloud(&linear(25, 100.0, 1.0), &CloudConfig::default()).unwrap_err();
        assert!(matches!(err, Error::InsufficientData { required: 26, actual: 25, .. }));
    }

    #[test]
    fn test_partial_data_uses_kijun() {
        let state = analyze_cloud(&linear(40, 100.0, 1.0), &CloudConfig::default()).unwrap();
        assert!(!state.data_complete);
        assert_eq!(state.senkou_b, None);
        assert_eq!(state.cloud_color, CloudColor::Unknown);
        assert_eq!(state.price_vs_cloud, CloudPosition::Above);
        assert_eq!(state.tk_cross, Direction::Bullish);
        assert_eq!(state.signal, Signal::Bullish);
    }

    #[test]
    fn test_uptrend_full_cloud() {
        let state = analyze_cloud(&linear(120, 100.0, 1.0), &CloudConfig::default()).unwrap();
        assert!(state.data_complete);
        assert_eq!(state.cloud_color, CloudColor::Bullish);
        assert_eq!(state.price_vs_cloud, CloudPosition::Above);
        assert_eq!(state.signal, Signal::StrongBullish);
        // Spans come from bar 119 - 26 = 93.
        // tenkan(93) = midpoint of highs/lows over 85..=93 = 189; kijun(93) = 180.5
        assert_relative_eq!(state.senkou_a.unwrap(), (189.0 + 180.5) / 2.0, epsilon = 1e-9);
        // senkou_b(93) = midpoint over 42..=93 = 167.5
        assert_relative_eq!(state.senkou_b.unwrap(), 167.5, epsilon = 1e-9);
        assert_eq!(state.chikou_reference, Some(193.0));
    }

    #[test]
    fn test_downtrend_full_cloud() {
        let state = analyze_cloud(&linear(120, 500.0, -1.0), &CloudConfig::default()).unwrap();
        assert_eq!(state.cloud_color, CloudColor::Bearish);
        assert_eq!(state.price_vs_cloud, CloudPosition::Below);
        assert_eq!(state.signal, Signal::StrongBearish);
    }
}
