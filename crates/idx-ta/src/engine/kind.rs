use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Identifies one analyzer in the dispatch table.
///
/// Ordering follows declaration order, which is also the order analyzers run
/// in and appear in a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzerKind {
    /// Swing highs and lows.
    Swing,
    /// Fibonacci retracements and extensions.
    Fibonacci,
    /// Candlestick patterns.
    Candlestick,
    /// Moving-average crossovers.
    Crossover,
    /// ADX trend strength.
    TrendStrength,
    /// Ichimoku cloud.
    Cloud,
    /// Price/oscillator divergence.
    Divergence,
    /// Consolidation breakout.
    Breakout,
    /// Volume/price phase.
    Phase,
    /// Volume profile.
    Volume,
    /// Tick size and daily price limits.
    PriceLimit,
    /// Indicator snapshot and overall verdict.
    Indicators,
    /// Historical volatility and risk bucket.
    Volatility,
}

impl AnalyzerKind {
    /// Every analyzer, in run order.
    pub const ALL: [Self; 13] = [
        Self::Swing,
        Self::Fibonacci,
        Self::Candlestick,
        Self::Crossover,
        Self::TrendStrength,
        Self::Cloud,
        Self::Divergence,
        Self::Breakout,
        Self::Phase,
        Self::Volume,
        Self::PriceLimit,
        Self::Indicators,
        Self::Volatility,
    ];

    /// Canonical snake-case name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Swing => "swing",
            Self::Fibonacci => "fibonacci",
            Self::Candlestick => "candlestick",
            Self::Crossover => "crossover",
            Self::TrendStrength => "trend_strength",
            Self::Cloud => "cloud",
            Self::Divergence => "divergence",
            Self::Breakout => "breakout",
            Self::Phase => "phase",
            Self::Volume => "volume",
            Self::PriceLimit => "price_limit",
            Self::Indicators => "indicators",
            Self::Volatility => "volatility",
        }
    }

    /// Results that move with the latest price expire on the short TTL.
    #[must_use]
    pub const fn is_price_sensitive(self) -> bool {
        matches!(self, Self::PriceLimit)
    }

    /// Parses `all` or a comma-separated list of names.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidParameter` for an unknown name or an empty list.
    pub fn parse_set(list: &str) -> Result<BTreeSet<Self>> {
        if list.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::ALL.into_iter().collect());
        }
        let set = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .collect::<Result<BTreeSet<Self>>>()?;
        if set.is_empty() {
            return Err(Error::InvalidParameter {
                name: "analyzers",
                reason: "no analyzer named".to_string(),
            });
        }
        Ok(set)
    }
}

impl fmt::Display for AnalyzerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AnalyzerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let kind = match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "swing" | "swings" => Self::Swing,
            "fibonacci" | "fib" => Self::Fibonacci,
            "candlestick" | "candlesticks" | "candles" => Self::Candlestick,
            "crossover" | "ma_crossover" => Self::Crossover,
            "trend_strength" | "trend" | "adx" => Self::TrendStrength,
            "cloud" | "ichimoku" => Self::Cloud,
            "divergence" => Self::Divergence,
            "breakout" => Self::Breakout,
            "phase" => Self::Phase,
            "volume" => Self::Volume,
            "price_limit" | "limits" | "ara_arb" => Self::PriceLimit,
            "indicators" | "snapshot" => Self::Indicators,
            "volatility" | "risk" => Self::Volatility,
            _ => {
                return Err(Error::InvalidParameter {
                    name: "analyzer",
                    reason: format!("unknown analyzer '{s}'"),
                })
            }
        };
        Ok(kind)
    }
}
