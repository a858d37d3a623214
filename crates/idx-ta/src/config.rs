//! Per-analyzer parameters and cache policy.
//!
//! [`AnalysisConfig`] is built once (from defaults, a JSON file or the
//! environment) and passed by reference into every analyzer call. Every
//! threshold the analyzers use lives here so deployments can tune them.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::analysis::divergence::Oscillator;
use crate::analysis::price_limit::Board;
use crate::analysis::swing::TrendHint;
use crate::error::{Error, Result};

/// Top-level configuration for one engine instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Swing detection and Fibonacci levels.
    pub swing: SwingConfig,
    /// Candlestick recognizer.
    pub candlestick: CandlestickConfig,
    /// Moving-average crossover detector.
    pub crossover: CrossoverConfig,
    /// ADX trend strength.
    pub trend: TrendStrengthConfig,
    /// Ichimoku cloud.
    pub cloud: CloudConfig,
    /// Price/oscillator divergence.
    pub divergence: DivergenceConfig,
    /// Consolidation breakout.
    pub breakout: BreakoutConfig,
    /// Volume/price phase classifier.
    pub phase: PhaseConfig,
    /// Volume profile.
    pub volume: VolumeConfig,
    /// Indicator snapshot and overall signal.
    pub indicators: IndicatorsConfig,
    /// Historical and ATR volatility.
    pub volatility: VolatilityConfig,
    /// Exchange tick and price-limit rules.
    pub price_limit: PriceLimitConfig,
    /// Result cache lifetimes.
    pub cache: CacheConfig,
}

/// Swing detection and Fibonacci parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwingConfig {
    /// Half-width of the confirmation window.
    pub window: usize,
    /// Number of trailing bars searched for the swing pair.
    pub lookback: usize,
    /// Trend used to orient the Fibonacci levels.
    pub trend: TrendHint,
}

impl Default for SwingConfig {
    fn default() -> Self {
        Self {
            window: 5,
            lookback: 60,
            trend: TrendHint::Auto,
        }
    }
}

/// Candlestick recognizer parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandlestickConfig {
    /// Number of trailing bars scanned for patterns.
    pub lookback: usize,
    /// Body/range ratio below which a bar is a doji.
    pub doji_threshold: f64,
    /// Use a looser doji threshold for low-priced stocks.
    pub adaptive_doji: bool,
    /// Long shadow must exceed this multiple of the body.
    pub shadow_multiplier: f64,
    /// Middle star body must be below this fraction of the first body.
    pub star_body_ratio: f64,
    /// Marubozu shadows must each be below this fraction of the body.
    pub marubozu_shadow_ratio: f64,
    /// Bars in the trailing volume average.
    pub volume_window: usize,
    /// Volume must exceed the average times this to confirm a pattern.
    pub volume_multiplier: f64,
    /// Closes examined before a bar to judge its short-term trend.
    pub trend_window: usize,
}

impl Default for CandlestickConfig {
    fn default() -> Self {
        Self {
            lookback: 10,
            doji_threshold: 0.1,
            adaptive_doji: false,
            shadow_multiplier: 2.0,
            star_body_ratio: 0.3,
            marubozu_shadow_ratio: 0.02,
            volume_window: 20,
            volume_multiplier: 1.0,
            trend_window: 5,
        }
    }
}

/// Crossover detector parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossoverConfig {
    /// Trailing bars searched for sign changes.
    pub lookback_days: usize,
    /// Bars required before the SMA50/SMA200 pair is evaluated.
    pub long_pair_min_bars: usize,
}

impl Default for CrossoverConfig {
    fn default() -> Self {
        Self {
            lookback_days: 30,
            long_pair_min_bars: 200,
        }
    }
}

/// ADX parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendStrengthConfig {
    /// Wilder smoothing period.
    pub period: usize,
    /// ADX above this is a strong trend.
    pub strong_above: f64,
    /// ADX at or above this is a developing trend.
    pub developing_from: f64,
}

impl Default for TrendStrengthConfig {
    fn default() -> Self {
        Self {
            period: 14,
            strong_above: 25.0,
            developing_from: 20.0,
        }
    }
}

/// Ichimoku windows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    /// Conversion line window.
    pub tenkan: usize,
    /// Base line window.
    pub kijun: usize,
    /// Leading span B window.
    pub senkou_b: usize,
    /// Forward shift of the leading spans and backward shift of the lagging span.
    pub displacement: usize,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            tenkan: 9,
            kijun: 26,
            senkou_b: 52,
            displacement: 26,
        }
    }
}

/// Divergence detector parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DivergenceConfig {
    /// Oscillators compared with price; empty means all of them.
    pub indicators: Vec<Oscillator>,
    /// Trailing bars searched for pivots, clamped to 15..=60.
    pub lookback: usize,
    /// Bars on each side a pivot must dominate.
    pub pivot_order: usize,
    /// A divergence ending within this many bars of the latest is active.
    pub recency_bars: usize,
    /// RSI period.
    pub rsi_period: usize,
    /// MACD fast EMA period.
    pub macd_fast: usize,
    /// MACD slow EMA period.
    pub macd_slow: usize,
    /// MACD signal EMA period.
    pub macd_signal: usize,
}

impl Default for DivergenceConfig {
    fn default() -> Self {
        Self {
            indicators: Oscillator::ALL.to_vec(),
            lookback: 30,
            pivot_order: 3,
            recency_bars: 5,
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
        }
    }
}

/// Breakout detector parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakoutConfig {
    /// Bars forming the consolidation range, clamped to 10..=60.
    pub lookback: usize,
    /// Volume must reach this multiple of the range average to confirm.
    pub volume_threshold: f64,
    /// ATR period.
    pub atr_period: usize,
    /// Testing band as a multiple of ATR.
    pub testing_band_atr: f64,
    /// Testing band as a percentage of the level when ATR is unavailable.
    pub testing_band_pct: f64,
    /// Bars scanned for rejection wicks.
    pub wick_scan_bars: usize,
}

impl Default for BreakoutConfig {
    fn default() -> Self {
        Self {
            lookback: 20,
            volume_threshold: 1.5,
            atr_period: 14,
            testing_band_atr: 0.5,
            testing_band_pct: 1.0,
            wick_scan_bars: 5,
        }
    }
}

/// Phase classifier parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseConfig {
    /// Recent bars scored.
    pub window: usize,
    /// Upper bound of the trailing volume average window.
    pub volume_ma_window: usize,
    /// Volume ratio above which the regime is high.
    pub high_ratio: f64,
    /// Volume ratio below which the regime is low.
    pub low_ratio: f64,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            window: 20,
            volume_ma_window: 20,
            high_ratio: 1.2,
            low_ratio: 0.8,
        }
    }
}

/// Volume profile parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    /// Ratio to the 30-bar average that counts as a spike.
    pub spike_ratio: f64,
    /// Z-score at which volume is unusual.
    pub unusual_z: f64,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            spike_ratio: 2.0,
            unusual_z: 2.0,
        }
    }
}

/// Indicator snapshot parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorsConfig {
    /// RSI period.
    pub rsi_period: usize,
    /// RSI above this reads overbought.
    pub rsi_overbought: f64,
    /// RSI below this reads oversold.
    pub rsi_oversold: f64,
    /// RSI above this turns a bullish verdict into a cautious one.
    pub rsi_extreme: f64,
    /// MACD fast EMA period.
    pub macd_fast: usize,
    /// MACD slow EMA period.
    pub macd_slow: usize,
    /// MACD signal period.
    pub macd_signal: usize,
    /// SMA periods compared against the latest close.
    pub sma_periods: Vec<usize>,
    /// EMA periods compared against the latest close.
    pub ema_periods: Vec<usize>,
    /// Bollinger period.
    pub bollinger_period: usize,
    /// Bollinger deviation multiplier.
    pub bollinger_k: f64,
    /// Stochastic %K range.
    pub stoch_k: usize,
    /// Stochastic %K smoothing.
    pub stoch_smooth: usize,
    /// Stochastic %D period.
    pub stoch_d: usize,
    /// ATR period.
    pub atr_period: usize,
    /// Trailing bars searched for support and resistance.
    pub level_window: usize,
    /// Support and resistance levels reported on each side.
    pub level_count: usize,
}

impl Default for IndicatorsConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            rsi_overbought: 70.0,
            rsi_oversold: 30.0,
            rsi_extreme: 80.0,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            sma_periods: vec![20, 50],
            ema_periods: vec![20],
            bollinger_period: 20,
            bollinger_k: 2.0,
            stoch_k: 14,
            stoch_smooth: 3,
            stoch_d: 3,
            atr_period: 14,
            level_window: 20,
            level_count: 3,
        }
    }
}

/// Volatility analyzer parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolatilityConfig {
    /// Return windows, in bars, for historical volatility.
    pub windows: Vec<usize>,
    /// Bars per year used to annualize.
    pub trading_days: usize,
    /// ATR period.
    pub atr_period: usize,
    /// Fewest bars the analyzer accepts.
    pub min_bars: usize,
    /// Annualized volatility (%) below which risk is low.
    pub low_below: f64,
    /// Annualized volatility (%) below which risk is moderate.
    pub moderate_below: f64,
    /// Annualized volatility (%) below which risk is high.
    pub high_below: f64,
}

impl Default for VolatilityConfig {
    fn default() -> Self {
        Self {
            windows: vec![30, 90, 252],
            trading_days: 252,
            atr_period: 14,
            min_bars: 30,
            low_below: 15.0,
            moderate_below: 30.0,
            high_below: 50.0,
        }
    }
}

/// One step of a piecewise price schedule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceStep {
    /// Upper bound of the step, `None` for the last step.
    pub below: Option<f64>,
    /// Whether a price equal to `below` still belongs to this step.
    #[serde(default)]
    pub inclusive: bool,
    /// Value for prices in this step.
    pub value: f64,
}

impl PriceStep {
    const fn new(below: Option<f64>, value: f64) -> Self {
        Self {
            below,
            inclusive: false,
            value,
        }
    }

    const fn through(limit: f64, value: f64) -> Self {
        Self {
            below: Some(limit),
            inclusive: true,
            value,
        }
    }

    /// Whether `price` falls in this step (assuming earlier steps did not match).
    #[must_use]
    pub fn contains(&self, price: f64) -> bool {
        match self.below {
            None => true,
            Some(limit) if self.inclusive => price <= limit,
            Some(limit) => price < limit,
        }
    }
}

/// Looks `price` up in a piecewise schedule; the last step catches everything.
#[must_use]
pub fn lookup_step(schedule: &[PriceStep], price: f64) -> Option<f64> {
    schedule
        .iter()
        .find(|step| step.contains(price))
        .or_else(|| schedule.last())
        .map(|step| step.value)
}

/// Exchange tick-size and auto-rejection rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceLimitConfig {
    /// Listing board of the instrument.
    pub board: Board,
    /// Tick size by price level.
    pub tick_schedule: Vec<PriceStep>,
    /// Regular-board limit fraction by reference price.
    pub regular_bands: Vec<PriceStep>,
    /// Limit fraction on the full-call-auction (special monitoring) board.
    pub fca_band: f64,
    /// Minimum price on the regular board.
    pub floor: f64,
    /// Minimum price on the development (PPK) board.
    pub ppk_floor: f64,
    /// Minimum price on the FCA board.
    pub fca_floor: f64,
    /// Flat tick size on the FCA board.
    pub fca_tick: f64,
    /// Fraction of the band at which a move counts as a limit hit.
    pub hit_ratio: f64,
    /// Fraction of the band at which a move counts as near the limit.
    pub near_ratio: f64,
}

impl Default for PriceLimitConfig {
    fn default() -> Self {
        Self {
            board: Board::Regular,
            tick_schedule: vec![
                PriceStep::new(Some(200.0), 1.0),
                PriceStep::new(Some(500.0), 2.0),
                PriceStep::new(Some(2000.0), 5.0),
                PriceStep::new(Some(5000.0), 10.0),
                PriceStep::new(None, 25.0),
            ],
            regular_bands: vec![
                PriceStep::new(Some(200.0), 0.35),
                PriceStep::through(5000.0, 0.25),
                PriceStep::new(None, 0.20),
            ],
            fca_band: 0.10,
            floor: 50.0,
            ppk_floor: 1.0,
            fca_floor: 1.0,
            fca_tick: 1.0,
            hit_ratio: 0.99,
            near_ratio: 0.95,
        }
    }
}

/// Result cache lifetimes per analyzer family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether the engine consults the cache at all.
    pub enabled: bool,
    /// Lifetime of price-limit results, which move with the last close.
    pub price_ttl: Duration,
    /// Lifetime of daily-bar analyses.
    pub daily_ttl: Duration,
    /// Entries kept before the oldest are evicted.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            price_ttl: Duration::from_secs(60),
            daily_ttl: Duration::from_secs(3600),
            max_entries: 1024,
        }
    }
}

fn env_override<T: std::str::FromStr>(key: &str, slot: &mut T) {
    if let Ok(val) = std::env::var(key) {
        if let Ok(parsed) = val.parse() {
            *slot = parsed;
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from `IDX_TA_*` environment variables with fallback to defaults.
    ///
    /// Unparseable values are ignored.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        env_override("IDX_TA_SWING_WINDOW", &mut config.swing.window);
        env_override("IDX_TA_SWING_LOOKBACK", &mut config.swing.lookback);
        env_override("IDX_TA_CANDLE_LOOKBACK", &mut config.candlestick.lookback);
        env_override("IDX_TA_DOJI_THRESHOLD", &mut config.candlestick.doji_threshold);
        env_override("IDX_TA_SHADOW_MULTIPLIER", &mut config.candlestick.shadow_multiplier);
        env_override("IDX_TA_CROSSOVER_LOOKBACK", &mut config.crossover.lookback_days);
        env_override("IDX_TA_ADX_PERIOD", &mut config.trend.period);
        env_override("IDX_TA_DIVERGENCE_LOOKBACK", &mut config.divergence.lookback);
        env_override("IDX_TA_BREAKOUT_LOOKBACK", &mut config.breakout.lookback);
        env_override("IDX_TA_VOLUME_THRESHOLD", &mut config.breakout.volume_threshold);

        if let Ok(val) = std::env::var("IDX_TA_BOARD") {
            if let Ok(board) = val.parse() {
                config.price_limit.board = board;
            }
        }
        if let Ok(val) = std::env::var("IDX_TA_CACHE_TTL_SECS") {
            if let Ok(secs) = val.parse() {
                config.cache.daily_ttl = Duration::from_secs(secs);
            }
        }
        env_override("IDX_TA_CACHE_ENABLED", &mut config.cache.enabled);

        config
    }

    /// Parses a JSON document; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidParameter` if the JSON is malformed or a value
    /// fails [`validate`](Self::validate).
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| Error::InvalidParameter {
            name: "config",
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every parameter is in its accepted range.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidParameter` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("swing.window", self.swing.window),
            ("swing.lookback", self.swing.lookback),
            ("candlestick.lookback", self.candlestick.lookback),
            ("candlestick.volume_window", self.candlestick.volume_window),
            ("crossover.lookback_days", self.crossover.lookback_days),
            ("trend.period", self.trend.period),
            ("cloud.tenkan", self.cloud.tenkan),
            ("cloud.kijun", self.cloud.kijun),
            ("cloud.senkou_b", self.cloud.senkou_b),
            ("divergence.pivot_order", self.divergence.pivot_order),
            ("divergence.rsi_period", self.divergence.rsi_period),
            ("breakout.atr_period", self.breakout.atr_period),
            ("phase.window", self.phase.window),
            ("indicators.rsi_period", self.indicators.rsi_period),
            ("indicators.macd_fast", self.indicators.macd_fast),
            ("indicators.macd_signal", self.indicators.macd_signal),
            ("indicators.bollinger_period", self.indicators.bollinger_period),
            ("indicators.stoch_k", self.indicators.stoch_k),
            ("indicators.stoch_smooth", self.indicators.stoch_smooth),
            ("indicators.stoch_d", self.indicators.stoch_d),
            ("indicators.atr_period", self.indicators.atr_period),
            ("indicators.level_window", self.indicators.level_window),
            ("volatility.trading_days", self.volatility.trading_days),
            ("volatility.atr_period", self.volatility.atr_period),
            ("volatility.min_bars", self.volatility.min_bars),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(Error::InvalidParameter {
                    name,
                    reason: "must be at least 1".to_string(),
                });
            }
        }

        let doji = self.candlestick.doji_threshold;
        if !(doji > 0.0 && doji < 1.0) {
            return Err(Error::InvalidParameter {
                name: "candlestick.doji_threshold",
                reason: format!("must be in (0, 1), got {doji}"),
            });
        }
        if self.divergence.macd_fast >= self.divergence.macd_slow {
            return Err(Error::InvalidParameter {
                name: "divergence.macd_fast",
                reason: "fast period must be below slow period".to_string(),
            });
        }
        if self.phase.low_ratio >= self.phase.high_ratio {
            return Err(Error::InvalidParameter {
                name: "phase.low_ratio",
                reason: "low ratio must be below high ratio".to_string(),
            });
        }
        if self.breakout.volume_threshold <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "breakout.volume_threshold",
                reason: "must be positive".to_string(),
            });
        }
        if self.trend.developing_from > self.trend.strong_above {
            return Err(Error::InvalidParameter {
                name: "trend.developing_from",
                reason: "must not exceed trend.strong_above".to_string(),
            });
        }
        if self.indicators.macd_fast >= self.indicators.macd_slow {
            return Err(Error::InvalidParameter {
                name: "indicators.macd_fast",
                reason: "must be below indicators.macd_slow".to_string(),
            });
        }
        if self.indicators.sma_periods.contains(&0)
            || self.indicators.ema_periods.contains(&0)
            || self.volatility.windows.contains(&0)
        {
            return Err(Error::InvalidParameter {
                name: "periods",
                reason: "moving-average and volatility windows must be at least 1".to_string(),
            });
        }
        let v = &self.volatility;
        if !(v.low_below <= v.moderate_below && v.moderate_below <= v.high_below) {
            return Err(Error::InvalidParameter {
                name: "volatility.low_below",
                reason: "risk thresholds must be ascending".to_string(),
            });
        }
        if self.price_limit.tick_schedule.is_empty() || self.price_limit.regular_bands.is_empty() {
            return Err(Error::InvalidParameter {
                name: "price_limit",
                reason: "tick schedule and bands must not be empty".to_string(),
            });
        }
        if self.price_limit.tick_schedule.iter().any(|s| s.value <= 0.0)
            || self.price_limit.fca_tick <= 0.0
        {
            return Err(Error::InvalidParameter {
                name: "price_limit.tick_schedule",
                reason: "tick sizes must be positive".to_string(),
            });
        }
        Ok(())
    }
}
