//! OHLCV bars and the normalized, immutable [`Series`] every analyzer reads.
//!
//! [`Series::normalize`] is the only place ordering and positivity are
//! checked. Once a `Series` exists it is ascending by timestamp with strictly
//! increasing timestamps, strictly positive prices, non-negative volume and
//! `high >= low` on every bar. No analyzer re-sorts or re-validates.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::traits::validate_same_length;

/// One trading period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Period start as unix seconds.
    pub timestamp: i64,
    /// Opening price.
    pub open: f64,
    /// Highest traded price.
    pub high: f64,
    /// Lowest traded price.
    pub low: f64,
    /// Closing price.
    pub close: f64,
    /// Traded volume in shares.
    pub volume: f64,
}

impl Bar {
    /// Creates a bar from its fields.
    #[must_use]
    pub const fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    fn is_finite(&self) -> bool {
        self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite()
    }

    fn check(&self, index: usize) -> Result<()> {
        let prices = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ];
        for (name, value) in prices {
            if value <= 0.0 {
                return Err(Error::InvalidSeries {
                    index,
                    reason: format!("{name} must be positive, got {value}"),
                });
            }
        }
        if self.volume < 0.0 {
            return Err(Error::InvalidSeries {
                index,
                reason: format!("volume must be non-negative, got {}", self.volume),
            });
        }
        if self.high < self.low {
            return Err(Error::InvalidSeries {
                index,
                reason: format!("high {} is below low {}", self.high, self.low),
            });
        }
        Ok(())
    }
}

/// A normalized OHLCV series.
///
/// Column vectors are materialized once so the indicator kernels can borrow
/// plain slices.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    bars: Vec<Bar>,
    #[serde(skip)]
    opens: Vec<f64>,
    #[serde(skip)]
    highs: Vec<f64>,
    #[serde(skip)]
    lows: Vec<f64>,
    #[serde(skip)]
    closes: Vec<f64>,
    #[serde(skip)]
    volumes: Vec<f64>,
    dropped: usize,
}

impl Series {
    /// Normalizes raw bars into a validated series.
    ///
    /// Bars with a NaN or infinite field are dropped and counted in
    /// [`dropped`](Self::dropped). The rest are stably sorted by timestamp.
    ///
    /// # Errors
    ///
    /// - `Error::EmptyInput` if no bar survives
    /// - `Error::InvalidSeries` for a repeated timestamp, a non-positive price,
    ///   negative volume or `high < low`
    pub fn normalize(raw: Vec<Bar>) -> Result<Self> {
        let before = raw.len();
        let mut bars: Vec<Bar> = raw.into_iter().filter(Bar::is_finite).collect();
        let dropped = before - bars.len();
        if bars.is_empty() {
            return Err(Error::EmptyInput);
        }

        bars.sort_by_key(|b| b.timestamp);

        for (i, bar) in bars.iter().enumerate() {
            if i > 0 && bar.timestamp <= bars[i - 1].timestamp {
                return Err(Error::InvalidSeries {
                    index: i,
                    reason: format!("duplicate timestamp {}", bar.timestamp),
                });
            }
            bar.check(i)?;
        }

        Ok(Self::from_sorted(bars, dropped))
    }

    /// Builds bars from parallel columns and normalizes them.
    ///
    /// # Errors
    ///
    /// Returns `Error::LengthMismatch` when the columns differ in length, then
    /// anything [`normalize`](Self::normalize) returns.
    pub fn from_columns(
        timestamps: &[i64],
        open: &[f64],
        high: &[f64],
        low: &[f64],
        close: &[f64],
        volume: &[f64],
    ) -> Result<Self> {
        validate_same_length(&[
            ("open", open),
            ("high", high),
            ("low", low),
            ("close", close),
            ("volume", volume),
        ])?;
        if timestamps.len() != open.len() {
            return Err(Error::LengthMismatch {
                description: format!(
                    "timestamps has {} values but open has {}",
                    timestamps.len(),
                    open.len()
                ),
            });
        }
        let bars = timestamps
            .iter()
            .enumerate()
            .map(|(i, &ts)| Bar::new(ts, open[i], high[i], low[i], close[i], volume[i]))
            .collect();
        Self::normalize(bars)
    }

    fn from_sorted(bars: Vec<Bar>, dropped: usize) -> Self {
        let opens = bars.iter().map(|b| b.open).collect();
        let highs = bars.iter().map(|b| b.high).collect();
        let lows = bars.iter().map(|b| b.low).collect();
        let closes = bars.iter().map(|b| b.close).collect();
        let volumes = bars.iter().map(|b| b.volume).collect();
        Self {
            bars,
            opens,
            highs,
            lows,
            closes,
            volumes,
            dropped,
        }
    }

    /// The most recent `n` bars as a new series (all bars if fewer exist).
    #[must_use]
    pub fn tail(&self, n: usize) -> Self {
        let start = self.bars.len().saturating_sub(n);
        Self::from_sorted(self.bars[start..].to_vec(), 0)
    }

    /// Number of bars.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Always false; a normalized series has at least one bar.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Bars in ascending timestamp order.
    #[must_use]
    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    /// The latest bar.
    #[must_use]
    pub fn last(&self) -> &Bar {
        // Non-empty by construction.
        &self.bars[self.bars.len() - 1]
    }

    /// Number of non-finite bars discarded by normalization.
    #[must_use]
    pub const fn dropped(&self) -> usize {
        self.dropped
    }

    /// Open prices.
    #[must_use]
    pub fn opens(&self) -> &[f64] {
        &self.opens
    }

    /// High prices.
    #[must_use]
    pub fn highs(&self) -> &[f64] {
        &self.highs
    }

    /// Low prices.
    #[must_use]
    pub fn lows(&self) -> &[f64] {
        &self.lows
    }

    /// Close prices.
    #[must_use]
    pub fn closes(&self) -> &[f64] {
        &self.closes
    }

    /// Volumes.
    #[must_use]
    pub fn volumes(&self) -> &[f64] {
        &self.volumes
    }
}
