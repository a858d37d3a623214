use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::analysis::breakout::{analyze_breakout, BreakoutEvent};
use crate::analysis::candlestick::{analyze_candlesticks, CandlestickAnalysis};
use crate::analysis::cloud::{analyze_cloud, CloudState};
use crate::analysis::crossover::{analyze_crossovers, CrossoverAnalysis};
use crate::analysis::divergence::{analyze_divergence, DivergenceAnalysis};
use crate::analysis::fibonacci::{analyze_fibonacci, FibonacciAnalysis};
use crate::analysis::indicators::{analyze_indicators, IndicatorSnapshot};
use crate::analysis::phase::{analyze_phase, PhaseState};
use crate::analysis::price_limit::{analyze_price_limits, PriceLimitReport};
use crate::analysis::swing::{analyze_swings, SwingAnalysis};
use crate::analysis::trend_strength::{analyze_trend_strength, TrendState};
use crate::analysis::volatility::{analyze_volatility, VolatilityReport};
use crate::analysis::volume::{analyze_volume, VolumeProfile};
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::series::Series;

use super::AnalyzerKind;

/// The result of any analyzer.
///
/// Serializes as the inner result; the surrounding report keys it by kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnalyzerResult {
    /// See [`AnalyzerKind::Swing`].
    Swing(SwingAnalysis),
    /// See [`AnalyzerKind::Fibonacci`].
    Fibonacci(FibonacciAnalysis),
    /// See [`AnalyzerKind::Candlestick`].
    Candlestick(CandlestickAnalysis),
    /// See [`AnalyzerKind::Crossover`].
    Crossover(CrossoverAnalysis),
    /// See [`AnalyzerKind::TrendStrength`].
    TrendStrength(TrendState),
    /// See [`AnalyzerKind::Cloud`].
    Cloud(CloudState),
    /// See [`AnalyzerKind::Divergence`].
    Divergence(DivergenceAnalysis),
    /// See [`AnalyzerKind::Breakout`].
    Breakout(BreakoutEvent),
    /// See [`AnalyzerKind::Phase`].
    Phase(PhaseState),
    /// See [`AnalyzerKind::Volume`].
    Volume(VolumeProfile),
    /// See [`AnalyzerKind::PriceLimit`].
    PriceLimit(PriceLimitReport),
    /// See [`AnalyzerKind::Indicators`].
    Indicators(IndicatorSnapshot),
    /// See [`AnalyzerKind::Volatility`].
    Volatility(VolatilityReport),
}

impl AnalyzerResult {
    /// Kind of analyzer that produced this result.
    #[must_use]
    pub const fn kind(&self) -> AnalyzerKind {
        match self {
            Self::Swing(_) => AnalyzerKind::Swing,
            Self::Fibonacci(_) => AnalyzerKind::Fibonacci,
            Self::Candlestick(_) => AnalyzerKind::Candlestick,
            Self::Crossover(_) => AnalyzerKind::Crossover,
            Self::TrendStrength(_) => AnalyzerKind::TrendStrength,
            Self::Cloud(_) => AnalyzerKind::Cloud,
            Self::Divergence(_) => AnalyzerKind::Divergence,
            Self::Breakout(_) => AnalyzerKind::Breakout,
            Self::Phase(_) => AnalyzerKind::Phase,
            Self::Volume(_) => AnalyzerKind::Volume,
            Self::PriceLimit(_) => AnalyzerKind::PriceLimit,
            Self::Indicators(_) => AnalyzerKind::Indicators,
            Self::Volatility(_) => AnalyzerKind::Volatility,
        }
    }
}

/// Signature every registered analyzer has.
pub type AnalyzerFn = fn(&Series, &AnalysisConfig) -> Result<AnalyzerResult>;

fn swing(series: &Series, config: &AnalysisConfig) -> Result<AnalyzerResult> {
    analyze_swings(series, &config.swing).map(AnalyzerResult::Swing)
}

fn fibonacci(series: &Series, config: &AnalysisConfig) -> Result<AnalyzerResult> {
    analyze_fibonacci(series, &config.swing).map(AnalyzerResult::Fibonacci)
}

fn candlestick(series: &Series, config: &AnalysisConfig) -> Result<AnalyzerResult> {
    Ok(AnalyzerResult::Candlestick(analyze_candlesticks(
        series,
        &config.candlestick,
    )))
}

fn crossover(series: &Series, config: &AnalysisConfig) -> Result<AnalyzerResult> {
    Ok(AnalyzerResult::Crossover(analyze_crossovers(
        series,
        &config.crossover,
    )))
}

fn trend_strength(series: &Series, config: &AnalysisConfig) -> Result<AnalyzerResult> {
    analyze_trend_strength(series, &config.trend).map(AnalyzerResult::TrendStrength)
}

fn cloud(series: &Series, config: &AnalysisConfig) -> Result<AnalyzerResult> {
    analyze_cloud(series, &config.cloud).map(AnalyzerResult::Cloud)
}

fn divergence(series: &Series, config: &AnalysisConfig) -> Result<AnalyzerResult> {
    analyze_divergence(series, &config.divergence).map(AnalyzerResult::Divergence)
}

fn breakout(series: &Series, config: &AnalysisConfig) -> Result<AnalyzerResult> {
    analyze_breakout(series, &config.breakout).map(AnalyzerResult::Breakout)
}

fn phase(series: &Series, config: &AnalysisConfig) -> Result<AnalyzerResult> {
    analyze_phase(series, &config.phase, &config.price_limit).map(AnalyzerResult::Phase)
}

fn volume(series: &Series, config: &AnalysisConfig) -> Result<AnalyzerResult> {
    analyze_volume(series, &config.volume).map(AnalyzerResult::Volume)
}

fn price_limit(series: &Series, config: &AnalysisConfig) -> Result<AnalyzerResult> {
    Ok(AnalyzerResult::PriceLimit(analyze_price_limits(
        series,
        &config.price_limit,
    )))
}

fn indicators(series: &Series, config: &AnalysisConfig) -> Result<AnalyzerResult> {
    analyze_indicators(series, &config.indicators, &config.trend).map(AnalyzerResult::Indicators)
}

fn volatility(series: &Series, config: &AnalysisConfig) -> Result<AnalyzerResult> {
    analyze_volatility(series, &config.volatility).map(AnalyzerResult::Volatility)
}

/// Dispatch table from [`AnalyzerKind`] to analyzer function.
#[derive(Clone, Default)]
pub struct Registry {
    table: BTreeMap<AnalyzerKind, AnalyzerFn>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.table.keys()).finish()
    }
}

impl Registry {
    /// A table with no analyzers.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            table: BTreeMap::new(),
        }
    }

    /// A table with every built-in analyzer.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        let entries: [(AnalyzerKind, AnalyzerFn); 13] = [
            (AnalyzerKind::Swing, swing),
            (AnalyzerKind::Fibonacci, fibonacci),
            (AnalyzerKind::Candlestick, candlestick),
            (AnalyzerKind::Crossover, crossover),
            (AnalyzerKind::TrendStrength, trend_strength),
            (AnalyzerKind::Cloud, cloud),
            (AnalyzerKind::Divergence, divergence),
            (AnalyzerKind::Breakout, breakout),
            (AnalyzerKind::Phase, phase),
            (AnalyzerKind::Volume, volume),
            (AnalyzerKind::PriceLimit, price_limit),
            (AnalyzerKind::Indicators, indicators),
            (AnalyzerKind::Volatility, volatility),
        ];
        for (kind, analyzer) in entries {
            registry.register(kind, analyzer);
        }
        registry
    }

    /// Adds or replaces an analyzer, returning the one it replaced.
    pub fn register(&mut self, kind: AnalyzerKind, analyzer: AnalyzerFn) -> Option<AnalyzerFn> {
        self.table.insert(kind, analyzer)
    }

    /// Looks up an analyzer.
    #[must_use]
    pub fn get(&self, kind: AnalyzerKind) -> Option<AnalyzerFn> {
        self.table.get(&kind).copied()
    }

    /// Registered kinds in run order.
    pub fn kinds(&self) -> impl Iterator<Item = AnalyzerKind> + '_ {
        self.table.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::all, clippy::pedantic, clippy::nursery)]
    use super::*;

    #[test]
    fn test_standard_covers_every_kind() {
        let registry = Registry::standard();
        assert_eq!(registry.kinds().collect::<Vec<_>>(), AnalyzerKind::ALL.to_vec());
    }

    #[test]
    fn test_register_replaces() {
        fn stub(_: &Series, _: &AnalysisConfig) -> Result<AnalyzerResult> {
            Err(crate::error::Error::EmptyInput)
        }
        let mut registry = Registry::standard();
        assert!(registry.register(AnalyzerKind::Cloud, stub).is_some());
        assert!(Registry::empty().get(AnalyzerKind::Cloud).is_none());
    }
}
