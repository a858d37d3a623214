//! Volume profile: averages, spikes, trend, price-volume correlation and
//! unusual activity.

use serde::{Deserialize, Serialize};

use crate::config::VolumeConfig;
use crate::error::{NumericGuard, Result};
use crate::series::Series;
use crate::traits::ValidatedInput;
use crate::utils::{mean, pearson, std_dev, trailing_mean};

use super::note_guard;

const SHORT_WINDOW: usize = 7;
const MEDIUM_WINDOW: usize = 30;
const LONG_WINDOW: usize = 90;
const HIGH_SPIKE: f64 = 3.0;
const EXTREME_SPIKE: f64 = 5.0;
const TREND_BAND: f64 = 0.10;
/// Valid change pairs needed for a correlation.
pub const MIN_CORRELATION_POINTS: usize = 5;

/// How far the latest volume exceeds its averages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpikeSeverity {
    /// Below the spike ratio.
    None,
    /// At or above the spike ratio.
    Moderate,
    /// At least 3×.
    High,
    /// At least 5×.
    Extreme,
}

/// Short average against the medium average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VolumeTrend {
    /// More than 10 % above.
    Increasing,
    /// Within 10 %.
    Stable,
    /// More than 10 % below.
    Decreasing,
}

/// Bucketed price-volume correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CorrelationStrength {
    /// ≥ 0.7
    StrongPositive,
    /// ≥ 0.3
    ModeratePositive,
    /// > 0
    WeakPositive,
    /// ≥ −0.3
    WeakNegative,
    /// ≥ −0.7
    ModerateNegative,
    /// < −0.7
    StrongNegative,
    /// Not enough valid points.
    NoCorrelation,
}

impl CorrelationStrength {
    /// Buckets a coefficient.
    #[must_use]
    pub fn from_coefficient(coefficient: Option<f64>) -> Self {
        match coefficient {
            None => Self::NoCorrelation,
            Some(c) if c >= 0.7 => Self::StrongPositive,
            Some(c) if c >= 0.3 => Self::ModeratePositive,
            Some(c) if c > 0.0 => Self::WeakPositive,
            Some(c) if c >= -0.3 => Self::WeakNegative,
            Some(c) if c >= -0.7 => Self::ModerateNegative,
            Some(_) => Self::StrongNegative,
        }
    }
}

/// Latest volume against the whole-series distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnusualVolume {
    /// z ≥ threshold.
    High,
    /// |z| below threshold.
    Normal,
    /// z ≤ −threshold.
    Low,
}

/// Volume profile of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeProfile {
    /// Latest volume.
    pub current_volume: f64,
    /// Mean of the last 7 bars (fewer if unavailable).
    pub avg_7: f64,
    /// Mean of the last 30 bars.
    pub avg_30: f64,
    /// Mean of the last 90 bars.
    pub avg_90: f64,
    /// Latest volume over `avg_30`, 0 when the average is 0.
    pub ratio_30: f64,
    /// Largest ratio across the three averages.
    pub max_ratio: f64,
    /// Spike grade from `max_ratio`.
    pub spike: SpikeSeverity,
    /// `avg_7` against `avg_30`.
    pub trend: VolumeTrend,
    /// Pearson coefficient of close changes and volume changes.
    pub price_volume_correlation: Option<f64>,
    /// Bucketed coefficient.
    pub correlation_strength: CorrelationStrength,
    /// Standard score of the latest volume.
    pub z_score: f64,
    /// Unusual volume reading.
    pub unusual: UnusualVolume,
    /// Zero-denominator cases resolved locally.
    pub numeric_guards: Vec<NumericGuard>,
}

/// Pearson correlation between close %changes and volume %changes.
///
/// Volume changes divide by `max(previous, 1)` so zero-volume bars stay
/// finite. Returns `None` with fewer than [`MIN_CORRELATION_POINTS`] finite
/// pairs or when either side has no variance.
#[must_use]
pub fn price_volume_correlation(closes: &[f64], volumes: &[f64]) -> Option<f64> {
    let (price_changes, volume_changes): (Vec<f64>, Vec<f64>) = closes
        .windows(2)
        .zip(volumes.windows(2))
        .map(|(c, v)| ((c[1] - c[0]) / c[0], (v[1] - v[0]) / v[0].max(1.0)))
        .filter(|(p, v)| p.is_finite() && v.is_finite())
        .unzip();
    if price_changes.len() < MIN_CORRELATION_POINTS {
        return None;
    }
    pearson(&price_changes, &volume_changes)
}

/// Grades the largest volume ratio.
#[must_use]
pub fn spike_severity(max_ratio: f64, spike_ratio: f64) -> SpikeSeverity {
    if max_ratio < spike_ratio {
        SpikeSeverity::None
    } else if max_ratio >= EXTREME_SPIKE {
        SpikeSeverity::Extreme
    } else if max_ratio >= HIGH_SPIKE {
        SpikeSeverity::High
    } else {
        SpikeSeverity::Moderate
    }
}

/// Builds the volume profile.
///
/// # Errors
///
/// `Error::InsufficientData` for fewer than two bars.
pub fn analyze_volume(series: &Series, config: &VolumeConfig) -> Result<VolumeProfile> {
    series.require(2, "volume")?;
    let volumes = series.volumes();
    let current_volume = series.last().volume;
    let mut numeric_guards = Vec::new();

    let avg_7 = trailing_mean(volumes, SHORT_WINDOW).unwrap_or(0.0);
    let avg_30 = trailing_mean(volumes, MEDIUM_WINDOW).unwrap_or(0.0);
    let avg_90 = trailing_mean(volumes, LONG_WINDOW).unwrap_or(0.0);

    let mut ratio = |avg: f64| {
        if avg > 0.0 {
            current_volume / avg
        } else {
            note_guard(&mut numeric_guards, NumericGuard::ZeroAverageVolume);
            0.0
        }
    };
    let ratios = [ratio(avg_7), ratio(avg_30), ratio(avg_90)];
    let max_ratio = ratios.iter().copied().fold(0.0, f64::max);

    let trend = if avg_30 > 0.0 {
        let change = avg_7 / avg_30 - 1.0;
        if change > TREND_BAND {
            VolumeTrend::Increasing
        } else if change < -TREND_BAND {
            VolumeTrend::Decreasing
        } else {
            VolumeTrend::Stable
        }
    } else {
        VolumeTrend::Stable
    };

    let correlation = price_volume_correlation(series.closes(), volumes);

    let avg_all = mean(volumes).unwrap_or(0.0);
    let z_score = match std_dev(volumes) {
        Some(sd) if sd > 0.0 => (current_volume - avg_all) / sd,
        _ => {
            note_guard(&mut numeric_guards, NumericGuard::ZeroVariance);
            0.0
        }
    };
    let unusual = if z_score >= config.unusual_z {
        UnusualVolume::High
    } else if z_score <= -config.unusual_z {
        UnusualVolume::Low
    } else {
        UnusualVolume::Normal
    };

    Ok(VolumeProfile {
        current_volume,
        avg_7,
        avg_30,
        avg_90,
        ratio_30: ratios[1],
        max_ratio,
        spike: spike_severity(max_ratio, config.spike_ratio),
        trend,
        price_volume_correlation: correlation,
        correlation_strength: CorrelationStrength::from_coefficient(correlation),
        z_score,
        unusual,
        numeric_guards,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::all, clippy::pedantic, clippy::nursery)]
    use super::*;
    use crate::error::Error;
    use crate::series::Bar;
    use approx::assert_relative_eq;

    fn series(closes: &[f64], volumes: &[f64]) -> Series {
        let bars = closes
            .iter()
            .zip(volumes)
            .enumerate()
            .map(|(i, (&c, &v))| Bar::new(i as i64, c, c + 1.0, c - 1.0, c, v))
            .collect();
        Series::normalize(bars).unwrap()
    }

    // ==================== Classification Tests ====================

    #[test]
    fn test_spike_grades() {
        assert_eq!(spike_severity(1.99, 2.0), SpikeSeverity::None);
        assert_eq!(spike_severity(2.0, 2.0), SpikeSeverity::Moderate);
        assert_eq!(spike_severity(3.0, 2.0), SpikeSeverity::High);
        assert_eq!(spike_severity(5.0, 2.0), SpikeSeverity::Extreme);
    }

    #[test]
    fn test_correlation_buckets() {
        use CorrelationStrength as C;
        assert_eq!(C::from_coefficient(Some(0.7)), C::StrongPositive);
        assert_eq!(C::from_coefficient(Some(0.3)), C::ModeratePositive);
        assert_eq!(C::from_coefficient(Some(0.01)), C::WeakPositive);
        assert_eq!(C::from_coefficient(Some(0.0)), C::WeakNegative);
        assert_eq!(C::from_coefficient(Some(-0.5)), C::ModerateNegative);
        assert_eq!(C::from_coefficient(Some(-0.71)), C::StrongNegative);
        assert_eq!(C::from_coefficient(None), C::NoCorrelation);
    }

    // ==================== Correlation Tests ====================

    #[test]
    fn test_correlation_needs_five_points() {
        let closes = [100.0, 101.0, 100.0, 102.0, 101.0];
        let volumes = [10.0, 20.0, 10.0, 30.0, 10.0];
        assert_eq!(price_volume_correlation(&closes, &volumes), None);
    }

    #[test]
    fn test_volume_rising_with_price_is_positive() {
        let closes = [100.0, 102.0, 101.0, 104.0, 103.0, 106.0, 105.0];
        let volumes = [100.0, 200.0, 100.0, 200.0, 100.0, 200.0, 100.0];
        let corr = price_volume_correlation(&closes, &volumes).unwrap();
        assert!(corr > 0.9);
    }

    #[test]
    fn test_zero_volume_denominator_stays_finite() {
        let closes = [100.0, 101.0, 102.0, 101.0, 100.0, 101.0];
        let volumes = [0.0, 10.0, 0.0, 10.0, 0.0, 10.0];
        assert!(price_volume_correlation(&closes, &volumes).is_some());
    }

    // ==================== Analyzer Tests ====================

    #[test]
    fn test_spike_on_last_bar() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + (i % 3) as f64).collect();
        let mut volumes = vec![1000.0; 40];
        volumes[39] = 3500.0;
        let profile = analyze_volume(&series(&closes, &volumes), &VolumeConfig::default()).unwrap();
        // avg_30 = (29 * 1000 + 3500) / 30
        assert_relative_eq!(profile.avg_30, 32500.0 / 30.0, epsilon = 1e-9);
        assert_eq!(profile.spike, SpikeSeverity::High);
        assert_eq!(profile.unusual, UnusualVolume::High);
        assert_eq!(profile.trend, VolumeTrend::Increasing);
    }

    #[test]
    fn test_quiet_series() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let volumes = vec![500.0; 20];
        let profile = analyze_volume(&series(&closes, &volumes), &VolumeConfig::default()).unwrap();
        assert_eq!(profile.spike, SpikeSeverity::None);
        assert_eq!(profile.trend, VolumeTrend::Stable);
        assert_eq!(profile.z_score, 0.0);
        assert_eq!(profile.unusual, UnusualVolume::Normal);
        assert!(profile.numeric_guards.contains(&NumericGuard::ZeroVariance));
        assert_eq!(profile.price_volume_correlation, None);
    }

    #[test]
    fn test_all_zero_volume() {
        let closes = vec![100.0; 10];
        let volumes = vec![0.0; 10];
        let profile = analyze_volume(&series(&closes, &volumes), &VolumeConfig::default()).unwrap();
        assert_eq!(profile.ratio_30, 0.0);
        assert_eq!(profile.spike, SpikeSeverity::None);
        assert!(profile.numeric_guards.contains(&NumericGuard::ZeroAverageVolume));
    }

    #[test]
    fn test_single_bar_is_insufficient() {
        let err = analyze_volume(&series(&[100.0], &[10.0]), &VolumeConfig::default()).unwrap_err();
        assert!(matches!(err, Error::InsufficientData { required: 2, actual: 1, .. }));
    }
}
