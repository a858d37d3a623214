//! Indicator kernels consumed by the analyzers.
//!
//! Every kernel is generic over [`SeriesElement`](crate::traits::SeriesElement),
//! returns output aligned with its input (NaN over the lookback prefix) and
//! validates its arguments up front:
//!
//! - empty input → [`EmptyInput`](crate::error::Error::EmptyInput)
//! - zero period → [`InvalidPeriod`](crate::error::Error::InvalidPeriod)
//! - too few values → [`InsufficientData`](crate::error::Error::InsufficientData)
//!
//! | kernel | lookback | used by |
//! |--------|----------|---------|
//! | [`sma`] | `p − 1` | crossover, indicators |
//! | [`ema`] | `p − 1` | crossover, MACD, indicators |
//! | [`rsi`] | `p` | divergence, indicators |
//! | [`macd`] | `slow + signal − 2` | divergence, indicators |
//! | [`obv`] | 0 | divergence, indicators |
//! | [`atr`] | `p` | breakout, indicators, volatility |
//! | [`adx`] | `2p − 1` | trend strength, indicators |
//! | [`bollinger`] | `p − 1` | indicators |
//! | [`stochastic`] | `k + smooth + d − 3` | indicators |
//!
//! [`Candle`] holds the body/shadow geometry used by the pattern recognizer.

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod candle;
pub mod ema;
pub mod macd;
pub mod obv;
pub mod rsi;
pub mod sma;
pub mod stochastic;

pub use adx::{adx, adx_lookback, adx_min_len, di_lookback, AdxOutput};
pub use atr::{atr, atr_lookback, atr_min_len, true_range};
pub use bollinger::{bollinger, bollinger_min_len, BollingerOutput};
pub use candle::Candle;
pub use ema::{ema, ema_lookback, ema_min_len, ema_with_alpha};
pub use macd::{macd, macd_line_lookback, macd_min_len, macd_signal_lookback, MacdOutput};
pub use obv::{obv, obv_lookback};
pub use rsi::{rsi, rsi_min_len};
pub use sma::{sma, sma_lookback, sma_min_len};
pub use stochastic::{stochastic, stochastic_lookback, stochastic_min_len, StochasticOutput};
