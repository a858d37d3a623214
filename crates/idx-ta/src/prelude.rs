//! Commonly used types and functions for convenient importing.
//!
//! ```
//! use idx_ta::prelude::*;
//!
//! let bars = (0..30)
//!     .map(|i| Bar::new(i, 300.0, 310.0, 290.0, 300.0 + f64::from(i as i32 % 3), 1e6))
//!     .collect();
//! let series = Series::normalize(bars).unwrap();
//! let limits = analyze_price_limits(&series, &PriceLimitConfig::default());
//! assert_eq!(limits.tick_size, 2.0);
//! ```
//!
//! # Contents
//!
//! - Input: [`Bar`], [`Series`]
//! - Errors: [`Error`], [`Result`], [`NumericGuard`]
//! - Configuration: [`AnalysisConfig`] and its per-analyzer sections
//! - Every `analyze_*` entry point with its result type
//! - Orchestration: [`Engine`], [`AnalyzerKind`], [`Report`], [`BatchProcessor`]

// Errors
pub use crate::error::{Error, NumericGuard, Result};

// Input
pub use crate::series::{Bar, Series};

// Configuration
pub use crate::config::{
    AnalysisConfig, BreakoutConfig, CacheConfig, CandlestickConfig, CloudConfig, CrossoverConfig,
    DivergenceConfig, IndicatorsConfig, PhaseConfig, PriceLimitConfig, SwingConfig,
    TrendStrengthConfig, VolatilityConfig, VolumeConfig,
};

// Shared vocabulary
pub use crate::analysis::{Direction, Signal, Strength};

// Analyzers
pub use crate::analysis::breakout::{analyze_breakout, BreakoutEvent, BreakoutKind};
pub use crate::analysis::candlestick::{analyze_candlesticks, CandlestickAnalysis, PatternKind};
pub use crate::analysis::cloud::{analyze_cloud, CloudState};
pub use crate::analysis::crossover::{analyze_crossovers, CrossoverAnalysis};
pub use crate::analysis::divergence::{analyze_divergence, DivergenceAnalysis, Oscillator};
pub use crate::analysis::fibonacci::{analyze_fibonacci, FibonacciAnalysis};
pub use crate::analysis::indicators::{analyze_indicators, IndicatorSnapshot, OverallSignal};
pub use crate::analysis::phase::{analyze_phase, Phase, PhaseState, VolumeRegime};
pub use crate::analysis::price_limit::{analyze_price_limits, AutoReject, Board, PriceLimitReport};
pub use crate::analysis::swing::{analyze_swings, SwingAnalysis};
pub use crate::analysis::trend_strength::{analyze_trend_strength, TrendClass, TrendState};
pub use crate::analysis::volatility::{analyze_volatility, RiskLevel, VolatilityReport};
pub use crate::analysis::volume::{analyze_volume, VolumeProfile};

// Orchestration
pub use crate::batch::{BatchProcessor, TickerSeries};
pub use crate::cache::TtlCache;
pub use crate::engine::{AnalyzerKind, AnalyzerResult, Engine, Outcome, Report};
