//! Volume/price phase classification.
//!
//! Each bar of the recent window is tagged with a volume regime (its volume
//! against the trailing average) and scored toward four phases. Scores are
//! summed, trend bonuses and the price-volume overlay are added, and the
//! highest score wins with ties resolved in the order accumulation, markup,
//! distribution, markdown.
//!
//! A phase is *decisive* when its score is at least 2 and it leads the
//! runner-up by 2 points or by 25 % of the total.
//!
//! Confidence blends the absolute price-volume correlation, the persistence
//! of the dominant volume regime and the winner's share of its own score
//! held as margin. Closes pinned at the daily price limits then nudge it:
//! limits hit in the phase's direction raise it, against it lower it. They
//! never change the phase itself.

use serde::{Deserialize, Serialize};

use crate::config::{PhaseConfig, PriceLimitConfig};
use crate::error::{Error, NumericGuard, Result};
use crate::series::Series;
use crate::traits::ValidatedInput;
use crate::utils::{mean, pct_change};

use super::price_limit::{auto_reject_flags, AutoReject};
use super::volume::price_volume_correlation;
use super::{note_guard, Direction};

/// Bars needed before any scoring.
pub const MIN_BARS: usize = 20;
const MIN_SCORED_BARS: usize = 5;
const MIN_PERIODS: usize = 3;
const SLOPE_LAG: usize = 5;
/// Price change below which the window counts as flat, in percent.
const FLAT_BAND_PCT: f64 = 2.0;
const TREND_BONUS_PCT: f64 = 5.0;
const OVERLAY_WEIGHT: f64 = 1.0;
const AUTO_REJECT_STEP: f64 = 0.05;

/// Market phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// Quiet buying after a decline.
    Accumulation,
    /// Rising prices on rising participation.
    Markup,
    /// Selling into strength.
    Distribution,
    /// Falling prices.
    Markdown,
}

impl Phase {
    /// Accumulation and markup are bullish, the others bearish.
    #[must_use]
    pub const fn direction(self) -> Direction {
        match self {
            Self::Accumulation | Self::Markup => Direction::Bullish,
            Self::Distribution | Self::Markdown => Direction::Bearish,
        }
    }
}

/// Volume of a bar against its trailing average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VolumeRegime {
    /// Ratio below `low_ratio`.
    Low,
    /// Between the ratios, or no usable average.
    Neutral,
    /// Ratio above `high_ratio`.
    High,
}

impl VolumeRegime {
    /// Buckets a volume ratio.
    #[must_use]
    pub fn classify(ratio: f64, config: &PhaseConfig) -> Self {
        if ratio > config.high_ratio {
            Self::High
        } else if ratio < config.low_ratio {
            Self::Low
        } else {
            Self::Neutral
        }
    }

    const fn weight(self) -> f64 {
        match self {
            Self::High => 1.0,
            Self::Low => 0.5,
            Self::Neutral => 0.35,
        }
    }
}

/// Accumulated score per phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseScores {
    /// Accumulation score.
    pub accumulation: f64,
    /// Markup score.
    pub markup: f64,
    /// Distribution score.
    pub distribution: f64,
    /// Markdown score.
    pub markdown: f64,
}

impl PhaseScores {
    fn ranked(&self) -> [(Phase, f64); 4] {
        [
            (Phase::Accumulation, self.accumulation),
            (Phase::Markup, self.markup),
            (Phase::Distribution, self.distribution),
            (Phase::Markdown, self.markdown),
        ]
    }

    fn add(&mut self, phase: Phase, amount: f64) {
        match phase {
            Phase::Accumulation => self.accumulation += amount,
            Phase::Markup => self.markup += amount,
            Phase::Distribution => self.distribution += amount,
            Phase::Markdown => self.markdown += amount,
        }
    }

    /// Highest-scoring phase; earlier phases win ties.
    #[must_use]
    pub fn winner(&self) -> (Phase, f64) {
        self.ranked()
            .into_iter()
            .fold((Phase::Accumulation, f64::NEG_INFINITY), |best, (phase, score)| {
                if score > best.1 {
                    (phase, score)
                } else {
                    best
                }
            })
    }

    /// Winner's lead over the runner-up.
    #[must_use]
    pub fn margin(&self) -> f64 {
        let mut values = self.ranked().map(|(_, s)| s);
        values.sort_by(|a, b| b.total_cmp(a));
        values[0] - values[1]
    }

    /// Sum of all scores.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.accumulation + self.markup + self.distribution + self.markdown
    }

    /// Whether the winner leads clearly enough to be acted on.
    #[must_use]
    pub fn is_decisive(&self) -> bool {
        let (_, max) = self.winner();
        let margin = self.margin();
        let total = self.total();
        let margin_pct = if total > 0.0 { margin / total * 100.0 } else { 0.0 };
        !(max < 2.0 || (margin < 2.0 && margin_pct < 25.0))
    }

    fn rounded(self) -> Self {
        let r = |v: f64| (v * 10.0).round() / 10.0;
        Self {
            accumulation: r(self.accumulation),
            markup: r(self.markup),
            distribution: r(self.distribution),
            markdown: r(self.markdown),
        }
    }
}

/// Bars per volume regime in the scored window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegimeCounts {
    /// High-volume bars.
    pub high: usize,
    /// Neutral-volume bars.
    pub neutral: usize,
    /// Low-volume bars.
    pub low: usize,
}

impl RegimeCounts {
    fn record(&mut self, regime: VolumeRegime) {
        match regime {
            VolumeRegime::High => self.high += 1,
            VolumeRegime::Neutral => self.neutral += 1,
            VolumeRegime::Low => self.low += 1,
        }
    }

    /// Most frequent regime; neutral wins ties, then high.
    #[must_use]
    pub fn dominant(&self) -> VolumeRegime {
        if self.neutral >= self.high && self.neutral >= self.low {
            VolumeRegime::Neutral
        } else if self.high >= self.low {
            VolumeRegime::High
        } else {
            VolumeRegime::Low
        }
    }

    /// Share of bars in the dominant regime.
    #[must_use]
    pub fn persistence(&self) -> f64 {
        let total = self.high + self.neutral + self.low;
        if total == 0 {
            return 0.0;
        }
        let modal = match self.dominant() {
            VolumeRegime::High => self.high,
            VolumeRegime::Neutral => self.neutral,
            VolumeRegime::Low => self.low,
        };
        #[allow(clippy::cast_precision_loss)]
        let share = modal as f64 / total as f64;
        share
    }
}

/// Phase reading for the recent window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseState {
    /// Winning phase.
    pub phase: Phase,
    /// 0 to 1.
    pub confidence: f64,
    /// Regime of the latest bar.
    pub volume_regime: VolumeRegime,
    /// Winner leads clearly.
    pub decisive: bool,
    /// Scores rounded to one decimal.
    pub scores: PhaseScores,
    /// Regime tally over the scored window.
    pub regime_counts: RegimeCounts,
    /// Close change across the scored window, in percent.
    pub price_trend_pct: f64,
    /// Last five bars' mean volume against the first five, in percent.
    pub volume_trend_pct: f64,
    /// Price-volume correlation over the scored window.
    pub price_volume_correlation: Option<f64>,
    /// Upper-limit closes in the scored window.
    pub auto_reject_up: usize,
    /// Lower-limit closes in the scored window.
    pub auto_reject_down: usize,
    /// Bars scored.
    pub scored_bars: usize,
    /// Trailing average window used.
    pub ma_window: usize,
    /// Zero-denominator cases resolved locally.
    pub numeric_guards: Vec<NumericGuard>,
}

#[derive(Debug, Clone, Copy)]
struct BarContext {
    returns_pct: f64,
    regime: VolumeRegime,
    close_position: f64,
    daily_range: f64,
    avg_range: f64,
    above_ma: bool,
}

#[allow(clippy::cast_precision_loss)]
fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, value) in values.iter().enumerate() {
        sum += value;
        if i >= window {
            sum -= values[i - window];
        }
        let count = (i + 1).min(window);
        out.push((count >= MIN_PERIODS).then(|| sum / count as f64));
    }
    out
}

fn score_bars(bars: &[BarContext], ma_slope_pct: f64) -> PhaseScores {
    let mut scores = PhaseScores::default();
    let mut consecutive_down = 0usize;

    for bar in bars {
        let r = bar.returns_pct;
        let weight = bar.regime.weight();
        let high = bar.regime == VolumeRegime::High;
        let neutral = bar.regime == VolumeRegime::Neutral;
        let low = bar.regime == VolumeRegime::Low;

        if high && r > -2.0 && r < 2.0 {
            scores.accumulation += 1.0;
        } else if neutral && bar.daily_range < bar.avg_range && bar.close_position > 0.6 && r > -1.0 {
            scores.accumulation += 0.5;
        } else if !low && r > -3.0 && r < 0.0 && bar.close_position > 0.7 {
            scores.accumulation += weight * 0.7;
        }

        if high && r > 2.0 {
            scores.markup += 1.0;
        } else if neutral && r > 1.5 {
            scores.markup += 0.4;
        } else if r > 0.5 && bar.close_position > 0.8 {
            scores.markup += weight * 0.5;
        }

        if high && r < -2.0 && bar.above_ma {
            scores.distribution += 1.0;
        } else if high && bar.close_position < 0.3 {
            scores.distribution += 0.7;
        } else if neutral && bar.close_position < 0.3 && bar.above_ma {
            scores.distribution += 0.3;
        }

        if r < -0.5 {
            consecutive_down += 1;
        } else {
            consecutive_down = 0;
        }
        if low && r < -2.0 && !bar.above_ma {
            scores.markdown += 1.0;
        } else if high && r < -3.0 && !bar.above_ma {
            scores.markdown += 1.2;
        } else if consecutive_down >= 2 && !bar.above_ma {
            scores.markdown += 0.6;
        } else if consecutive_down >= 3 {
            scores.markdown += 0.8;
        } else if !bar.above_ma && ma_slope_pct < -0.5 && r < -1.0 {
            scores.markdown += 0.5;
        }
        if bar.close_position < 0.2 && r < 0.0 {
            scores.markdown += 0.3;
        }
    }
    scores
}

/// Confidence change from limit closes: `+step` per close in the phase's
/// direction, `−step` per close against it.
#[must_use]
pub fn auto_reject_adjustment(phase: Phase, up: usize, down: usize) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let (up, down) = (up as f64, down as f64);
    match phase.direction() {
        Direction::Bullish => (up - down) * AUTO_REJECT_STEP,
        _ => (down - up) * AUTO_REJECT_STEP,
    }
}

/// Classifies the recent window.
///
/// # Errors
///
/// `Error::InsufficientData` for fewer than 20 bars, or when the configured
/// window leaves fewer than 5 bars to score.
#[allow(clippy::too_many_lines)]
pub fn analyze_phase(
    series: &Series,
    config: &PhaseConfig,
    limits: &PriceLimitConfig,
) -> Result<PhaseState> {
    series.require(MIN_BARS, "phase")?;
    let n = series.len();
    let ma_window = config.volume_ma_window.min((n / 2).max(5));
    let scored_bars = config.window.min(n - ma_window);
    if scored_bars < MIN_SCORED_BARS {
        return Err(Error::InsufficientData {
            required: ma_window + MIN_SCORED_BARS,
            actual: n,
            indicator: "phase",
        });
    }

    let closes = series.closes();
    let highs = series.highs();
    let lows = series.lows();
    let volumes = series.volumes();
    let mut numeric_guards = Vec::new();

    let volume_ma = rolling_mean(volumes, ma_window);
    let price_ma = rolling_mean(closes, ma_window);
    let daily_range: Vec<f64> = (0..n)
        .map(|i| (highs[i] - lows[i]) / closes[i] * 100.0)
        .collect();
    let avg_range = rolling_mean(&daily_range, ma_window);

    let start = n - scored_bars;
    let mut regime_counts = RegimeCounts::default();
    let mut contexts = Vec::with_capacity(scored_bars);
    for i in start..n {
        let regime = match volume_ma[i] {
            Some(avg) if avg > 0.0 => VolumeRegime::classify(volumes[i] / avg, config),
            Some(_) => {
                note_guard(&mut numeric_guards, NumericGuard::ZeroAverageVolume);
                VolumeRegime::Neutral
            }
            None => VolumeRegime::Neutral,
        };
        regime_counts.record(regime);
        let range = highs[i] - lows[i];
        contexts.push(BarContext {
            returns_pct: if i == 0 {
                0.0
            } else {
                pct_change(closes[i - 1], closes[i]).unwrap_or(0.0)
            },
            regime,
            close_position: if range > 0.0 {
                (closes[i] - lows[i]) / range
            } else {
                0.5
            },
            daily_range: daily_range[i],
            avg_range: avg_range[i].unwrap_or(daily_range[i]),
            above_ma: price_ma[i].map_or(true, |ma| closes[i] > ma),
        });
    }

    let last = n - 1;
    let ma_slope_pct = match (price_ma[last], last.checked_sub(SLOPE_LAG).and_then(|i| price_ma[i])) {
        (Some(now), Some(then)) => pct_change(then, now).unwrap_or(0.0),
        _ => 0.0,
    };
    let current_above_ma = price_ma[last].map_or(true, |ma| closes[last] > ma);
    let price_trend_pct = pct_change(closes[start], closes[last]).unwrap_or(0.0);

    let head = mean(&volumes[start..start + MIN_SCORED_BARS]).unwrap_or(0.0);
    let tail = mean(&volumes[n - MIN_SCORED_BARS..]).unwrap_or(0.0);
    let volume_trend_pct = pct_change(head, tail).unwrap_or_else(|| {
        note_guard(&mut numeric_guards, NumericGuard::ZeroBase);
        0.0
    });

    let mut scores = score_bars(&contexts, ma_slope_pct);
    if !current_above_ma && price_trend_pct < -TREND_BONUS_PCT && ma_slope_pct < 0.0 {
        scores.markdown += 2.0;
    }
    if current_above_ma && price_trend_pct > TREND_BONUS_PCT && ma_slope_pct > 0.0 {
        scores.markup += 1.5;
    }

    let window_closes = &closes[start..];
    let window_volumes = &volumes[start..];
    let correlation = price_volume_correlation(window_closes, window_volumes);
    let half = scored_bars / 2;
    let weakening = match (
        price_volume_correlation(&window_closes[..half], &window_volumes[..half]),
        price_volume_correlation(&window_closes[half..], &window_volumes[half..]),
    ) {
        (Some(early), Some(late)) => late < early,
        _ => correlation.is_some_and(|c| c < 0.3),
    };
    let prior_start = start.saturating_sub(ma_window);
    let declined_before = pct_change(closes[prior_start], closes[start])
        .is_some_and(|change| change < -FLAT_BAND_PCT);

    let rising = price_trend_pct > FLAT_BAND_PCT;
    let declining = price_trend_pct < -FLAT_BAND_PCT;
    let flat = !rising && !declining;
    let dominant = regime_counts.dominant();
    if rising && dominant == VolumeRegime::High && correlation.is_some_and(|c| c > 0.0) {
        scores.add(Phase::Markup, OVERLAY_WEIGHT);
    }
    if !rising && dominant == VolumeRegime::High && weakening {
        scores.add(Phase::Distribution, OVERLAY_WEIGHT);
    }
    if flat && declined_before && dominant != VolumeRegime::High {
        scores.add(Phase::Accumulation, OVERLAY_WEIGHT);
    }
    if declining && dominant == VolumeRegime::High {
        scores.add(Phase::Markdown, OVERLAY_WEIGHT);
    }

    let scores = scores.rounded();
    let (phase, max_score) = scores.winner();
    let margin_share = if max_score > 0.0 {
        scores.margin() / max_score
    } else {
        0.0
    };

    let flags = auto_reject_flags(series, limits);
    let auto_reject_up = flags[start..]
        .iter()
        .filter(|f| **f == Some(AutoReject::Up))
        .count();
    let auto_reject_down = flags[start..]
        .iter()
        .filter(|f| **f == Some(AutoReject::Down))
        .count();

    let blended = 0.4 * correlation.map_or(0.0, f64::abs)
        + 0.3 * regime_counts.persistence()
        + 0.3 * margin_share;
    let confidence =
        (blended + auto_reject_adjustment(phase, auto_reject_up, auto_reject_down)).clamp(0.0, 1.0);

    let volume_regime = contexts
        .last()
        .map_or(VolumeRegime::Neutral, |bar| bar.regime);

    Ok(PhaseState {
        phase,
        confidence,
        volume_regime,
        decisive: scores.is_decisive(),
        scores,
        regime_counts,
        price_trend_pct,
        volume_trend_pct,
        price_volume_correlation: correlation,
        auto_reject_up,
        auto_reject_down,
        scored_bars,
        ma_window,
        numeric_guards,
    })
}
