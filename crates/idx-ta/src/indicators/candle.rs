//! Single-candle geometry.
//!
//! [`Candle`] is a copyable view over one bar's OHLC prices with the body and
//! shadow measurements every pattern rule is written in terms of.

use crate::series::Bar;
use crate::traits::SeriesElement;

/// OHLC prices of one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle<T> {
    /// Opening price.
    pub open: T,
    /// Highest price.
    pub high: T,
    /// Lowest price.
    pub low: T,
    /// Closing price.
    pub close: T,
}

impl From<&Bar> for Candle<f64> {
    fn from(bar: &Bar) -> Self {
        Self {
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
        }
    }
}

impl<T: SeriesElement> Candle<T> {
    /// Creates a candle.
    #[must_use]
    pub const fn new(open: T, high: T, low: T, close: T) -> Self {
        Self {
            open,
            high,
            low,
            close,
        }
    }

    /// Absolute open-to-close distance.
    #[inline]
    #[must_use]
    pub fn body(&self) -> T {
        (self.close - self.open).abs()
    }

    /// High minus low.
    #[inline]
    #[must_use]
    pub fn range(&self) -> T {
        self.high - self.low
    }

    /// Higher of open and close.
    #[inline]
    #[must_use]
    pub fn body_top(&self) -> T {
        self.open.max(self.close)
    }

    /// Lower of open and close.
    #[inline]
    #[must_use]
    pub fn body_bottom(&self) -> T {
        self.open.min(self.close)
    }

    /// Wick above the body.
    #[inline]
    #[must_use]
    pub fn upper_shadow(&self) -> T {
        self.high - self.body_top()
    }

    /// Wick below the body.
    #[inline]
    #[must_use]
    pub fn lower_shadow(&self) -> T {
        self.body_bottom() - self.low
    }

    /// Midpoint of the body.
    #[inline]
    #[must_use]
    pub fn body_midpoint(&self) -> T {
        (self.open + self.close) / T::two()
    }

    /// Close above open.
    #[inline]
    #[must_use]
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Close below open.
    #[inline]
    #[must_use]
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Body as a fraction of the range, `None` for a zero-range bar.
    #[must_use]
    pub fn body_ratio(&self) -> Option<T> {
        let range = self.range();
        (range > T::zero()).then(|| self.body() / range)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::all, clippy::pedantic, clippy::nursery)]
    use super::*;

    #[test]
    fn test_bullish_geometry() {
        let c = Candle::new(100.0_f64, 110.0, 95.0, 105.0);
        assert_eq!(c.body(), 5.0);
        assert_eq!(c.range(), 15.0);
        assert_eq!(c.upper_shadow(), 5.0);
        assert_eq!(c.lower_shadow(), 5.0);
        assert_eq!(c.body_midpoint(), 102.5);
        assert!(c.is_bullish());
        assert!(!c.is_bearish());
    }

    #[test]
    fn test_bearish_geometry() {
        let c = Candle::new(105.0_f64, 110.0, 95.0, 100.0);
        assert_eq!(c.body_top(), 105.0);
        assert_eq!(c.body_bottom(), 100.0);
        assert_eq!(c.upper_shadow(), 5.0);
        assert_eq!(c.lower_shadow(), 5.0);
        assert!(c.is_bearish());
    }

    #[test]
    fn test_body_ratio() {
        let doji = Candle::new(100.0_f64, 102.0, 98.0, 100.05);
        assert!((doji.body_ratio().unwrap() - 0.0125).abs() < 1e-9);
        let flat = Candle::new(100.0_f64, 100.0, 100.0, 100.0);
        assert_eq!(flat.body_ratio(), None);
    }

    #[test]
    fn test_f32_candle() {
        let c = Candle::new(10.0_f32, 12.0, 9.0, 11.0);
        assert_eq!(c.body(), 1.0);
        assert_eq!(c.lower_shadow(), 1.0);
    }

    #[test]
    fn test_from_bar() {
        let bar = Bar::new(1, 1.0, 3.0, 0.5, 2.0, 10.0);
        let c = Candle::from(&bar);
        assert_eq!(c, Candle::new(1.0, 3.0, 0.5, 2.0));
    }
}
