//! Batch processing across many tickers.
//!
//! The unit of parallel work is one ticker with its analyzer set. With the
//! `parallel` feature (on by default) batches at or above the threshold are
//! spread over rayon's global pool; smaller batches, or builds without the
//! feature, run sequentially. Output order always matches input order.
//!
//! # Example
//!
//! ```
//! use idx_ta::batch::{BatchProcessor, TickerSeries};
//! use idx_ta::engine::{AnalyzerKind, Engine};
//! use idx_ta::series::{Bar, Series};
//!
//! let make = |base: f64| {
//!     let bars = (0..30)
//!         .map(|i| Bar::new(i64::from(i), base, base + 5.0, base - 5.0, base, 1e5))
//!         .collect();
//!     Series::normalize(bars).unwrap()
//! };
//! let inputs = vec![
//!     TickerSeries::new("BBCA", make(9000.0)),
//!     TickerSeries::new("TLKM", make(3000.0)),
//! ];
//!
//! let engine = Engine::new(Default::default()).unwrap();
//! let kinds = [AnalyzerKind::Volume].into();
//! let reports = BatchProcessor::new().analyze(&engine, &inputs, &kinds, None);
//! assert_eq!(reports[1].ticker, "TLKM");
//! ```

use std::collections::BTreeSet;
use std::time::Instant;

use crate::engine::{AnalyzerKind, Engine, Report};
use crate::error::Result;
use crate::series::Series;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// A normalized series with the ticker it belongs to.
#[derive(Debug, Clone)]
pub struct TickerSeries {
    /// Instrument code.
    pub ticker: String,
    /// Its bars.
    pub series: Series,
}

impl TickerSeries {
    /// Pairs a ticker with its series.
    #[must_use]
    pub fn new(ticker: impl Into<String>, series: Series) -> Self {
        Self {
            ticker: ticker.into(),
            series,
        }
    }
}

/// Batch processor for per-ticker work.
#[derive(Debug, Default, Clone)]
pub struct BatchProcessor {
    /// Batches smaller than this run sequentially.
    min_parallel_threshold: usize,
}

impl BatchProcessor {
    /// Creates a processor that parallelizes batches of 4 or more.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            min_parallel_threshold: 4,
        }
    }

    /// Sets the batch size from which work is spread across threads.
    #[must_use]
    pub const fn min_parallel_threshold(mut self, threshold: usize) -> Self {
        self.min_parallel_threshold = threshold;
        self
    }

    /// Applies a fallible function to every item, stopping at the first error.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `f` (in parallel mode, whichever
    /// error rayon observes first).
    #[cfg(feature = "parallel")]
    pub fn process<T, F, R>(&self, items: &[T], f: F) -> Result<Vec<R>>
    where
        T: Sync,
        F: Fn(&T) -> Result<R> + Send + Sync,
        R: Send,
    {
        if items.len() < self.min_parallel_threshold {
            items.iter().map(f).collect()
        } else {
            tracing::debug!(items = items.len(), "processing batch in parallel");
            items.par_iter().map(f).collect()
        }
    }

    /// Sequential version when parallel feature is disabled.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `f`.
    #[cfg(not(feature = "parallel"))]
    pub fn process<T, F, R>(&self, items: &[T], f: F) -> Result<Vec<R>>
    where
        F: Fn(&T) -> Result<R>,
    {
        items.iter().map(f).collect()
    }

    /// Runs the engine over every ticker. Analyzer failures stay inside each
    /// report, so this never fails as a whole.
    #[cfg(feature = "parallel")]
    pub fn analyze(
        &self,
        engine: &Engine,
        inputs: &[TickerSeries],
        kinds: &BTreeSet<AnalyzerKind>,
        deadline: Option<Instant>,
    ) -> Vec<Report> {
        let run = |input: &TickerSeries| engine.run(&input.ticker, &input.series, kinds, deadline);
        if inputs.len() < self.min_parallel_threshold {
            inputs.iter().map(run).collect()
        } else {
            tracing::debug!(tickers = inputs.len(), "analyzing batch in parallel");
            inputs.par_iter().map(run).collect()
        }
    }

    /// Sequential version when parallel feature is disabled.
    #[cfg(not(feature = "parallel"))]
    pub fn analyze(
        &self,
        engine: &Engine,
        inputs: &[TickerSeries],
        kinds: &BTreeSet<AnalyzerKind>,
        deadline: Option<Instant>,
    ) -> Vec<Report> {
        inputs
            .iter()
            .map(|input| engine.run(&input.ticker, &input.series, kinds, deadline))
            .collect()
    }
}

/// Runs the engine over every ticker with default batch settings.
#[must_use]
pub fn analyze_batch(
    engine: &Engine,
    inputs: &[TickerSeries],
    kinds: &BTreeSet<AnalyzerKind>,
) -> Vec<Report> {
    BatchProcessor::new().analyze(engine, inputs, kinds, None)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::all, clippy::pedantic, clippy::nursery)]
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::error::Error;
    use crate::series::Bar;

    fn flat(ticker: &str, n: i64, price: f64) -> TickerSeries {
        let bars = (0..n)
            .map(|i| Bar::new(i, price, price * 1.01, price * 0.99, price, 1000.0 + i as f64))
            .collect();
        TickerSeries::new(ticker, Series::normalize(bars).unwrap())
    }

    #[test]
    fn test_sequential_keeps_order() {
        let inputs = vec![flat("AAAA", 30, 100.0), flat("BBBB", 30, 200.0)];
        let engine = Engine::new(AnalysisConfig::default()).unwrap();
        let kinds = [AnalyzerKind::Volume].into();
        let reports = BatchProcessor::new()
            .min_parallel_threshold(100)
            .analyze(&engine, &inputs, &kinds, None);
        let tickers: Vec<_> = reports.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(tickers, ["AAAA", "BBBB"]);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let inputs: Vec<_> = (0..12)
            .map(|i| flat(&format!("T{i:03}"), 40 + i, 100.0 + i as f64 * 50.0))
            .collect();
        let engine = Engine::new(AnalysisConfig::default()).unwrap();
        let kinds = [
            AnalyzerKind::TrendStrength,
            AnalyzerKind::Breakout,
            AnalyzerKind::Phase,
            AnalyzerKind::Volume,
            AnalyzerKind::PriceLimit,
        ]
        .into();
        let sequential = BatchProcessor::new()
            .min_parallel_threshold(1000)
            .analyze(&engine, &inputs, &kinds, None);
        let parallel = BatchProcessor::new()
            .min_parallel_threshold(2)
            .analyze(&engine, &inputs, &kinds, None);
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_process_propagates_errors() {
        let items = vec![Vec::new(), vec![Bar::new(0, 1.0, 1.0, 1.0, 1.0, 0.0)]];
        let result = BatchProcessor::new()
            .min_parallel_threshold(1)
            .process(&items, |bars| Series::normalize(bars.clone()));
        assert_eq!(result.unwrap_err(), Error::EmptyInput);
    }

    #[test]
    fn test_process_collects_in_order() {
        let items = vec![3_i64, 5, 7];
        let lens = BatchProcessor::new()
            .process(&items, |&n| {
                let bars = (0..n).map(|i| Bar::new(i, 10.0, 10.0, 10.0, 10.0, 1.0)).collect();
                Series::normalize(bars).map(|s| s.len())
            })
            .unwrap();
        assert_eq!(lens, vec![3, 5, 7]);
    }

    #[test]
    fn test_analyze_batch_convenience() {
        let inputs = vec![flat("ASII", 25, 5000.0)];
        let engine = Engine::new(AnalysisConfig::default()).unwrap();
        let reports = analyze_batch(&engine, &inputs, &[AnalyzerKind::PriceLimit].into());
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].succeeded(), 1);
    }
}
