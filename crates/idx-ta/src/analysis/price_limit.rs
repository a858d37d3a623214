//! Exchange tick sizes and auto-rejection (ARA/ARB) limits.
//!
//! The exchange rejects orders priced outside a daily band around the
//! previous close. The upper bound (ARA) is the raw band price rounded down
//! to a valid tick and the lower bound (ARB) the raw price rounded up, never
//! below the board's floor. Tick sizes step up with the price level.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::{lookup_step, PriceLimitConfig};
use crate::error::{Error, NumericGuard, Result};
use crate::series::Series;

use super::note_guard;

/// Slack when snapping a computed price onto the tick grid.
const TICK_EPSILON: f64 = 1e-9;

/// Listing board, which decides the limit band and the floor price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Board {
    /// Main and development boards under normal trading.
    #[default]
    Regular,
    /// Special monitoring board traded by full call auction.
    Fca,
    /// Development board instruments allowed to trade below the regular floor.
    Ppk,
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Regular => "regular",
            Self::Fca => "fca",
            Self::Ppk => "ppk",
        };
        f.write_str(name)
    }
}

impl FromStr for Board {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "regular" | "reguler" => Ok(Self::Regular),
            "fca" | "special" | "monitoring" => Ok(Self::Fca),
            "ppk" | "development" => Ok(Self::Ppk),
            other => Err(Error::InvalidParameter {
                name: "board",
                reason: format!("unknown board '{other}', expected regular, fca or ppk"),
            }),
        }
    }
}

/// How to snap a price onto the tick grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundDirection {
    /// Smallest valid tick at or above the price.
    Up,
    /// Largest valid tick at or below the price.
    Down,
    /// Closest valid tick.
    Nearest,
}

/// Tick size for a price level on the configured board. The FCA board trades
/// on a flat tick.
#[must_use]
pub fn tick_size(price: f64, config: &PriceLimitConfig) -> f64 {
    match config.board {
        Board::Fca => config.fca_tick,
        Board::Regular | Board::Ppk => lookup_step(&config.tick_schedule, price).unwrap_or(1.0),
    }
}

/// Minimum tradable price on the configured board.
#[must_use]
pub const fn floor_price(config: &PriceLimitConfig) -> f64 {
    match config.board {
        Board::Regular => config.floor,
        Board::Fca => config.fca_floor,
        Board::Ppk => config.ppk_floor,
    }
}

/// Snaps `price` to a multiple of `tick`. A non-positive tick leaves the price untouched.
#[must_use]
pub fn round_to_tick(price: f64, tick: f64, direction: RoundDirection) -> f64 {
    if tick <= 0.0 {
        return price;
    }
    let steps = price / tick;
    let snapped = match direction {
        RoundDirection::Up => (steps - TICK_EPSILON).ceil(),
        RoundDirection::Down => (steps + TICK_EPSILON).floor(),
        RoundDirection::Nearest => steps.round(),
    };
    snapped * tick
}

/// Daily price band around a reference price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLimits {
    /// Previous close the band is computed from.
    pub reference: f64,
    /// Highest accepted price (ARA).
    pub upper_limit: f64,
    /// Lowest accepted price (ARB).
    pub lower_limit: f64,
    /// Band width as a percentage of the reference.
    pub band_pct: f64,
    /// Tick size at the upper limit.
    pub upper_tick: f64,
    /// Tick size at the lower limit.
    pub lower_tick: f64,
    /// Minimum tradable price on this board.
    pub floor: f64,
    /// Board the band was computed for.
    pub board: Board,
}

/// Band fraction applied to `reference` on the configured board.
#[must_use]
pub fn band_fraction(reference: f64, config: &PriceLimitConfig) -> f64 {
    match config.board {
        Board::Fca => config.fca_band,
        Board::Regular | Board::Ppk => lookup_step(&config.regular_bands, reference).unwrap_or(0.0),
    }
}

/// Computes the ARA/ARB limits for the next session after `reference`.
#[must_use]
pub fn price_limits(reference: f64, config: &PriceLimitConfig) -> PriceLimits {
    let band = band_fraction(reference, config);
    let floor = floor_price(config);

    let raw_upper = reference * (1.0 + band);
    let raw_lower = reference * (1.0 - band);
    let upper_tick = tick_size(raw_upper, config);
    let lower_tick = tick_size(raw_lower, config);

    PriceLimits {
        reference,
        upper_limit: round_to_tick(raw_upper, upper_tick, RoundDirection::Down),
        lower_limit: round_to_tick(raw_lower, lower_tick, RoundDirection::Up).max(floor),
        band_pct: band * 100.0,
        upper_tick,
        lower_tick,
        floor,
        board: config.board,
    }
}

/// A close pinned at one of the daily limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AutoReject {
    /// Closed at the upper limit.
    Up,
    /// Closed at the lower limit.
    Down,
}

/// Checks whether `close` sits on a limit computed from `prev_close`.
#[must_use]
pub fn auto_reject(prev_close: f64, close: f64, config: &PriceLimitConfig) -> Option<AutoReject> {
    let limits = price_limits(prev_close, config);
    if close >= limits.upper_limit - TICK_EPSILON {
        Some(AutoReject::Up)
    } else if close <= limits.lower_limit + TICK_EPSILON && limits.lower_limit < prev_close {
        Some(AutoReject::Down)
    } else {
        None
    }
}

/// Auto-rejection flag per bar, aligned with the series. The first bar has no
/// previous close and is never flagged.
#[must_use]
pub fn auto_reject_flags(series: &Series, config: &PriceLimitConfig) -> Vec<Option<AutoReject>> {
    let closes = series.closes();
    let mut flags = Vec::with_capacity(closes.len());
    flags.push(None);
    for pair in closes.windows(2) {
        flags.push(auto_reject(pair[0], pair[1], config));
    }
    flags
}

/// Summary label for the limit-hit history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LimitPattern {
    /// Three or more upper-limit hits.
    StrongMomentum,
    /// At least one upper-limit hit.
    BullishMomentum,
    /// Two or more lower-limit hits.
    PanicSelling,
    /// One lower-limit hit.
    Bearish,
    /// Repeated intraday approaches to the upper limit.
    NearAra,
    /// Repeated intraday approaches to the lower limit.
    NearArb,
    /// Nothing remarkable.
    Normal,
}

impl LimitPattern {
    /// Decision table over the hit counters, first match wins.
    #[must_use]
    pub const fn classify(ara: usize, arb: usize, near_ara: usize, near_arb: usize) -> Self {
        if ara >= 3 {
            Self::StrongMomentum
        } else if ara >= 1 {
            Self::BullishMomentum
        } else if arb >= 2 {
            Self::PanicSelling
        } else if arb >= 1 {
            Self::Bearish
        } else if near_ara >= 2 {
            Self::NearAra
        } else if near_arb >= 2 {
            Self::NearArb
        } else {
            Self::Normal
        }
    }
}

/// Counts of intraday moves reaching the daily band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitHitStats {
    /// Sessions whose high reached the upper band.
    pub ara_hits: usize,
    /// Sessions whose low reached the lower band.
    pub arb_hits: usize,
    /// Sessions whose high came close to the upper band.
    pub near_ara: usize,
    /// Sessions whose low came close to the lower band.
    pub near_arb: usize,
    /// Label derived from the counters.
    pub pattern: LimitPattern,
    /// Two or more hits in either direction.
    pub is_volatile: bool,
}

/// Tallies band hits using each session's high/low against the previous close.
#[must_use]
pub fn limit_hit_stats(series: &Series, config: &PriceLimitConfig) -> LimitHitStats {
    let bars = series.bars();
    let (mut ara, mut arb, mut near_ara, mut near_arb) = (0, 0, 0, 0);

    for pair in bars.windows(2) {
        let prev_close = pair[0].close;
        let band_pct = band_fraction(prev_close, config) * 100.0;
        let high_pct = (pair[1].high - prev_close) / prev_close * 100.0;
        let low_pct = (pair[1].low - prev_close) / prev_close * 100.0;

        if high_pct >= band_pct * config.hit_ratio {
            ara += 1;
        } else if high_pct >= band_pct * config.near_ratio {
            near_ara += 1;
        }
        if low_pct <= -band_pct * config.hit_ratio {
            arb += 1;
        } else if low_pct <= -band_pct * config.near_ratio {
            near_arb += 1;
        }
    }

    LimitHitStats {
        ara_hits: ara,
        arb_hits: arb,
        near_ara,
        near_arb,
        pattern: LimitPattern::classify(ara, arb, near_ara, near_arb),
        is_volatile: ara + arb >= 2,
    }
}

/// A bar that closed on a limit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutoRejectEvent {
    /// Bar position in the series.
    pub index: usize,
    /// Bar timestamp.
    pub timestamp: i64,
    /// Which limit.
    pub kind: AutoReject,
    /// Closing price.
    pub close: f64,
}

/// Price-limit view of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceLimitReport {
    /// Board the limits were computed for.
    pub board: Board,
    /// Latest close.
    pub last_close: f64,
    /// Tick size at the latest close.
    pub tick_size: f64,
    /// Limits for the next session.
    pub next_session: PriceLimits,
    /// Band hit history.
    pub hits: LimitHitStats,
    /// Bars that closed on a limit, oldest first.
    pub auto_rejections: Vec<AutoRejectEvent>,
    /// True when the series has a single bar and no history could be scanned.
    pub insufficient_data: bool,
    /// Zero-denominator cases resolved locally.
    pub numeric_guards: Vec<NumericGuard>,
}

/// Computes next-session limits, band hit statistics and auto-rejected bars.
#[must_use]
pub fn analyze_price_limits(series: &Series, config: &PriceLimitConfig) -> PriceLimitReport {
    let last = series.last();
    let mut numeric_guards = Vec::new();
    if band_fraction(last.close, config) <= 0.0 {
        note_guard(&mut numeric_guards, NumericGuard::ZeroRange);
    }

    let auto_rejections = auto_reject_flags(series, config)
        .into_iter()
        .zip(series.bars())
        .enumerate()
        .filter_map(|(index, (flag, bar))| {
            flag.map(|kind| AutoRejectEvent {
                index,
                timestamp: bar.timestamp,
                kind,
                close: bar.close,
            })
        })
        .collect();

    PriceLimitReport {
        board: config.board,
        last_close: last.close,
        tick_size: tick_size(last.close, config),
        next_session: price_limits(last.close, config),
        hits: limit_hit_stats(series, config),
        auto_rejections,
        insufficient_data: series.len() < 2,
        numeric_guards,
    }
}
