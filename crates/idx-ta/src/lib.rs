//! idx-ta: technical-analysis signal engine for IDX equities
//!
//! Turns a raw OHLCV series into structured trading signals: swing points and
//! Fibonacci levels, candlestick patterns, moving-average crossovers, ADX
//! trend strength, the Ichimoku cloud, price/oscillator divergence,
//! consolidation breakouts, a volume/price phase classifier, a volume
//! profile, an indicator snapshot with an overall verdict and a volatility
//! risk bucket, all aware of the exchange's tick-size and daily price-limit
//! rules.
//!
//! # Features
//!
//! - **Deterministic**: every analyzer is a pure function of the series and
//!   its configuration; identical input serializes to identical JSON
//! - **Validated once**: [`Series::normalize`] is the only place ordering and
//!   positivity are checked
//! - **Partial results**: the [`Engine`] reports each analyzer's failure next
//!   to the others' results instead of failing the whole run
//! - **Parallel**: [`batch`] spreads tickers over rayon's pool (feature
//!   `parallel`, on by default)
//!
//! # Quick Start
//!
//! ```
//! use idx_ta::prelude::*;
//!
//! let bars = (0..60)
//!     .map(|i| {
//!         let close = 8500.0 + 10.0 * f64::from(i);
//!         Bar::new(1_700_000_000 + 86_400 * i64::from(i), close, close + 25.0, close - 25.0, close, 2e6)
//!     })
//!     .collect();
//! let series = Series::normalize(bars).unwrap();
//!
//! let trend = analyze_trend_strength(&series, &AnalysisConfig::default().trend).unwrap();
//! assert_eq!(trend.direction, Direction::Bullish);
//! ```
//!
//! # Error Handling
//!
//! Analyzers return [`Result<T, Error>`] for conditions the caller must act on
//! (too little data, a degenerate swing range) and record zero-denominator
//! cases they resolved themselves as [`NumericGuard`]s inside the result:
//!
//! ```
//! use idx_ta::prelude::*;
//!
//! let bars = (0..5).map(|i| Bar::new(i, 100.0, 101.0, 99.0, 100.0, 0.0)).collect();
//! let series = Series::normalize(bars).unwrap();
//! let result = analyze_cloud(&series, &AnalysisConfig::default().cloud);
//! assert!(matches!(result, Err(Error::InsufficientData { required: 26, .. })));
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::perf)]
#![warn(clippy::nursery)]
#![warn(clippy::needless_collect)]
#![warn(clippy::or_fun_call)]
#![warn(clippy::inefficient_to_string)]
#![warn(clippy::useless_conversion)]
#![allow(clippy::module_name_repetitions)]

pub mod analysis;
pub mod batch;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod indicators;
pub mod kernels;
pub mod prelude;
pub mod series;
pub mod traits;
pub mod utils;

// Re-export commonly used types at crate root
pub use config::AnalysisConfig;
pub use engine::{AnalyzerKind, Engine, Report};
pub use error::{Error, NumericGuard, Result};
pub use series::{Bar, Series};
pub use traits::{SeriesElement, ValidatedInput};
