//! Sliding-window kernels shared by indicators and analyzers.
//!
//! - [`rolling_extrema`]: monotonic deque for O(n) rolling max/min, their
//!   positions (earliest index wins ties) and high/low midpoints

pub mod rolling_extrema;

pub use rolling_extrema::{
    rolling_argmax, rolling_argmin, rolling_extrema_lookback, rolling_max, rolling_midpoint,
    rolling_min, MonotonicDeque,
};
