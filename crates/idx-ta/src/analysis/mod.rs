//! Signal analyzers.
//!
//! Every analyzer is a pure function of `(&Series, &config)` returning a fresh,
//! serializable result. Expected degradations (short history, zero
//! denominators) are reported inside the result through `insufficient_data`
//! and `numeric_guards`; only the conditions the caller must act on are
//! returned as [`Error`](crate::Error).
//!
//! | module | entry point | result |
//! |--------|-------------|--------|
//! | [`swing`] | [`swing::analyze_swings`] | [`swing::SwingAnalysis`] |
//! | [`fibonacci`] | [`fibonacci::analyze_fibonacci`] | [`fibonacci::FibonacciAnalysis`] |
//! | [`candlestick`] | [`candlestick::analyze_candlesticks`] | [`candlestick::CandlestickAnalysis`] |
//! | [`crossover`] | [`crossover::analyze_crossovers`] | [`crossover::CrossoverAnalysis`] |
//! | [`trend_strength`] | [`trend_strength::analyze_trend_strength`] | [`trend_strength::TrendState`] |
//! | [`cloud`] | [`cloud::analyze_cloud`] | [`cloud::CloudState`] |
//! | [`divergence`] | [`divergence::analyze_divergence`] | [`divergence::DivergenceAnalysis`] |
//! | [`breakout`] | [`breakout::analyze_breakout`] | [`breakout::BreakoutEvent`] |
//! | [`phase`] | [`phase::analyze_phase`] | [`phase::PhaseState`] |
//! | [`volume`] | [`volume::analyze_volume`] | [`volume::VolumeProfile`] |
//! | [`price_limit`] | [`price_limit::analyze_price_limits`] | [`price_limit::PriceLimitReport`] |
//! | [`indicators`] | [`indicators::analyze_indicators`] | [`indicators::IndicatorSnapshot`] |
//! | [`volatility`] | [`volatility::analyze_volatility`] | [`volatility::VolatilityReport`] |

use serde::{Deserialize, Serialize};

use crate::error::NumericGuard;

pub mod breakout;
pub mod candlestick;
pub mod cloud;
pub mod crossover;
pub mod divergence;
pub mod fibonacci;
pub mod indicators;
pub mod phase;
pub mod price_limit;
pub mod swing;
pub mod trend_strength;
pub mod volatility;
pub mod volume;

/// Directional bias of a pattern, event or reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    /// Expect higher prices.
    Bullish,
    /// Expect lower prices.
    Bearish,
    /// No directional bias.
    Neutral,
}

impl Direction {
    /// Sign as `+1`, `-1` or `0`.
    #[must_use]
    pub const fn sign(self) -> i32 {
        match self {
            Self::Bullish => 1,
            Self::Bearish => -1,
            Self::Neutral => 0,
        }
    }
}

/// Three-step strength grade shared by divergence and breakout events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Strength {
    /// Marginal.
    Weak,
    /// Worth watching.
    Moderate,
    /// Actionable.
    Strong,
}

/// Five-level composite signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    /// All components agree upward.
    StrongBullish,
    /// Leaning upward.
    Bullish,
    /// Components disagree or are flat.
    Neutral,
    /// Leaning downward.
    Bearish,
    /// All components agree downward.
    StrongBearish,
}

/// Records a guard once, keeping first-seen order.
pub(crate) fn note_guard(guards: &mut Vec<NumericGuard>, guard: NumericGuard) {
    if !guards.contains(&guard) {
        guards.push(guard);
    }
}
