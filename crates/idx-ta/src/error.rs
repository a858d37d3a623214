//! Error types for idx-ta.
//!
//! This module defines the errors raised by the normalizer, the indicator
//! kernels and the analyzers, plus [`NumericGuard`], the non-fatal record of a
//! zero-denominator case an analyzer resolved locally.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures of normalization, kernels, analyzers and configuration.
///
/// [`code`](Self::code) gives each variant a stable name for JSON reports.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The raw series violates an ordering or positivity invariant.
    ///
    /// Returned by the normalizer only. `index` refers to the position of the
    /// offending bar after sorting by timestamp.
    #[error("invalid series at bar {index}: {reason}")]
    InvalidSeries {
        /// Position of the offending bar.
        index: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// Too few bars for a kernel or analyzer. Engine runs record this per
    /// analyzer and carry on with the rest.
    #[error("insufficient data for {indicator}: required {required} bars, got {actual}")]
    InsufficientData {
        /// Minimum bar count.
        required: usize,
        /// Bars supplied.
        actual: usize,
        /// Name of the indicator or analyzer that needed the data.
        indicator: &'static str,
    },

    /// The selected swing high and swing low have the same price.
    #[error("degenerate range: swing high equals swing low at {price}")]
    DegenerateRange {
        /// The shared price of both swings.
        price: f64,
    },

    /// A bar count could not be represented in the kernel's float type.
    #[error("numeric conversion failed: {context}")]
    NumericConversion {
        /// What was being converted.
        context: &'static str,
    },

    /// No bars, or no values in a column.
    #[error("empty input: no data provided")]
    EmptyInput,

    /// A lookback window of zero bars.
    #[error("invalid period {period}: {reason}")]
    InvalidPeriod {
        /// Rejected window.
        period: usize,
        /// Why.
        reason: &'static str,
    },

    /// A configuration value is out of its accepted range.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Name of the parameter.
        name: &'static str,
        /// Description of why it was rejected.
        reason: String,
    },

    /// Parallel input columns have different lengths.
    #[error("length mismatch: {description}")]
    LengthMismatch {
        /// Which columns disagreed and how.
        description: String,
    },

    /// The caller's deadline passed before the analyzer was started.
    #[error("deadline exceeded before {analyzer} could run")]
    DeadlineExceeded {
        /// Name of the analyzer that was skipped.
        analyzer: &'static str,
    },
}

impl Error {
    /// Stable machine-readable name of the variant.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidSeries { .. } => "INVALID_SERIES",
            Self::InsufficientData { .. } => "INSUFFICIENT_DATA",
            Self::DegenerateRange { .. } => "DEGENERATE_RANGE",
            Self::NumericConversion { .. } => "NUMERIC_CONVERSION",
            Self::EmptyInput => "EMPTY_INPUT",
            Self::InvalidPeriod { .. } => "INVALID_PERIOD",
            Self::InvalidParameter { .. } => "INVALID_PARAMETER",
            Self::LengthMismatch { .. } => "LENGTH_MISMATCH",
            Self::DeadlineExceeded { .. } => "DEADLINE_EXCEEDED",
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// A zero-denominator case an analyzer resolved without failing.
///
/// Guards are attached to analyzer results so a caller can tell a genuine
/// neutral reading from one produced by a degenerate input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NumericGuard {
    /// The trailing average volume was zero.
    ZeroAverageVolume,
    /// A bar or window had zero high-low range.
    ZeroRange,
    /// A percentage change was taken from a zero base.
    ZeroBase,
    /// The risk side of a risk/reward ratio was zero or missing.
    ZeroRisk,
    /// A correlation had zero variance in one of its inputs.
    ZeroVariance,
}
