//! Runs a set of analyzers over one series and collects their outcomes.
//!
//! Analyzers are looked up in a [`Registry`] and run in [`AnalyzerKind`]
//! order. A failing analyzer is recorded as an error outcome next to the
//! successful ones; it never aborts the report. When a deadline is given it is
//! checked before each analyzer starts, and analyzers that did not start in
//! time are recorded as [`Error::DeadlineExceeded`].
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeSet;
//! use idx_ta::engine::{AnalyzerKind, Engine};
//! use idx_ta::series::{Bar, Series};
//!
//! let bars = (0..40)
//!     .map(|i| {
//!         let c = 1000.0 + 5.0 * f64::from(i);
//!         Bar::new(i64::from(i) * 86_400, c, c + 10.0, c - 10.0, c, 1e6)
//!     })
//!     .collect();
//! let series = Series::normalize(bars).unwrap();
//!
//! let engine = Engine::new(Default::default()).unwrap();
//! let kinds: BTreeSet<_> = [AnalyzerKind::TrendStrength, AnalyzerKind::Cloud].into();
//! let report = engine.run("BBCA", &series, &kinds, None);
//! assert_eq!(report.outcomes.len(), 2);
//! assert!(report.outcomes[&AnalyzerKind::TrendStrength].is_ok());
//! ```

mod kind;
mod registry;

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Instant;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::cache::TtlCache;
use crate::config::AnalysisConfig;
use crate::error::{Error, Result};
use crate::series::{Bar, Series};

pub use kind::AnalyzerKind;
pub use registry::{AnalyzerFn, AnalyzerResult, Registry};

/// Identifies one cached analyzer result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Instrument code.
    pub ticker: String,
    /// Analyzer.
    pub kind: AnalyzerKind,
    /// Timestamp of the latest bar.
    pub last_timestamp: i64,
    /// Number of bars.
    pub bars: usize,
    /// Hash of every bar's timestamp and OHLCV values.
    pub content_hash: u64,
    /// Hash of the configuration the result was computed with.
    pub config_hash: u64,
}

/// Cache of analyzer results shared across engine runs.
pub type ResultCache = TtlCache<CacheKey, AnalyzerResult>;

/// What happened to one requested analyzer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The analyzer produced a result.
    Ok(AnalyzerResult),
    /// The analyzer failed or was skipped.
    Error(#[serde(serialize_with = "serialize_annotation")] Error),
}

impl Outcome {
    /// Whether a result is present.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// The result, if any.
    #[must_use]
    pub const fn result(&self) -> Option<&AnalyzerResult> {
        match self {
            Self::Ok(result) => Some(result),
            Self::Error(_) => None,
        }
    }

    /// The error, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&Error> {
        match self {
            Self::Ok(_) => None,
            Self::Error(error) => Some(error),
        }
    }
}

fn serialize_annotation<S: Serializer>(
    error: &Error,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    let mut state = serializer.serialize_struct("Annotation", 2)?;
    state.serialize_field("code", error.code())?;
    state.serialize_field("message", &error.to_string())?;
    state.end()
}

/// All outcomes for one ticker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    /// Instrument code.
    pub ticker: String,
    /// Bars in the analyzed series.
    pub bars: usize,
    /// Timestamp of the latest bar.
    pub last_timestamp: i64,
    /// One entry per requested analyzer.
    pub outcomes: BTreeMap<AnalyzerKind, Outcome>,
}

impl Report {
    /// Number of analyzers that produced a result.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_ok()).count()
    }

    /// Number of analyzers that failed or were skipped.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

/// Analyzer runner bound to one configuration.
#[derive(Debug, Clone)]
pub struct Engine {
    config: AnalysisConfig,
    registry: Registry,
    cache: Option<Arc<ResultCache>>,
    config_hash: u64,
}

impl Engine {
    /// Creates an engine with the standard registry and no cache.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidParameter` if the configuration does not validate.
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        let config_hash = fingerprint(&config);
        Ok(Self {
            config,
            registry: Registry::standard(),
            cache: None,
            config_hash,
        })
    }

    /// Replaces the dispatch table.
    #[must_use]
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    /// Attaches a result cache. Ignored when caching is disabled in the
    /// configuration.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<ResultCache>) -> Self {
        if self.config.cache.enabled {
            self.cache = Some(cache);
        }
        self
    }

    /// The configuration analyzers run with.
    #[must_use]
    pub const fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Normalizes raw bars and runs the requested analyzers.
    ///
    /// # Errors
    ///
    /// Anything [`Series::normalize`] returns. Analyzer failures are reported
    /// inside the [`Report`].
    pub fn run_bars(
        &self,
        ticker: &str,
        bars: Vec<Bar>,
        kinds: &BTreeSet<AnalyzerKind>,
        deadline: Option<Instant>,
    ) -> Result<Report> {
        let series = Series::normalize(bars)?;
        Ok(self.run(ticker, &series, kinds, deadline))
    }

    /// Runs the requested analyzers over `series`.
    pub fn run(
        &self,
        ticker: &str,
        series: &Series,
        kinds: &BTreeSet<AnalyzerKind>,
        deadline: Option<Instant>,
    ) -> Report {
        let last_timestamp = series.last().timestamp;
        let mut outcomes = BTreeMap::new();

        for &kind in kinds {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                tracing::warn!(ticker, analyzer = %kind, "deadline passed, skipping");
                outcomes.insert(
                    kind,
                    Outcome::Error(Error::DeadlineExceeded {
                        analyzer: kind.name(),
                    }),
                );
                continue;
            }
            let outcome = self.run_one(ticker, series, kind);
            if let Outcome::Error(error) = &outcome {
                tracing::debug!(ticker, analyzer = %kind, %error, "analyzer failed");
            }
            outcomes.insert(kind, outcome);
        }

        let report = Report {
            ticker: ticker.to_string(),
            bars: series.len(),
            last_timestamp,
            outcomes,
        };
        tracing::info!(
            ticker,
            bars = report.bars,
            succeeded = report.succeeded(),
            failed = report.failed(),
            "analysis complete"
        );
        report
    }

    fn run_one(&self, ticker: &str, series: &Series, kind: AnalyzerKind) -> Outcome {
        let Some(analyzer) = self.registry.get(kind) else {
            return Outcome::Error(Error::InvalidParameter {
                name: "analyzer",
                reason: format!("{kind} is not registered"),
            });
        };

        let key = self.cache.as_ref().map(|_| CacheKey {
            ticker: ticker.to_string(),
            kind,
            last_timestamp: series.last().timestamp,
            bars: series.len(),
            content_hash: series_fingerprint(series),
            config_hash: self.config_hash,
        });
        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            if let Some(hit) = cache.get(key) {
                tracing::debug!(ticker, analyzer = %kind, "cache hit");
                return Outcome::Ok((*hit).clone());
            }
        }

        match analyzer(series, &self.config) {
            Ok(result) => {
                if let (Some(cache), Some(key)) = (&self.cache, key) {
                    let ttl = if kind.is_price_sensitive() {
                        self.config.cache.price_ttl
                    } else {
                        self.config.cache.daily_ttl
                    };
                    cache.insert(key, result.clone(), ttl);
                }
                Outcome::Ok(result)
            }
            Err(error) => Outcome::Error(error),
        }
    }
}

fn fingerprint(config: &AnalysisConfig) -> u64 {
    let mut hasher = DefaultHasher::new();
    serde_json::to_string(config)
        .unwrap_or_default()
        .hash(&mut hasher);
    hasher.finish()
}

fn series_fingerprint(series: &Series) -> u64 {
    let mut hasher = DefaultHasher::new();
    for bar in series.bars() {
        bar.timestamp.hash(&mut hasher);
        for value in [bar.open, bar.high, bar.low, bar.close, bar.volume] {
            value.to_bits().hash(&mut hasher);
        }
    }
    hasher.finish()
}
