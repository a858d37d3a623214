//! Executes a parsed command.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use idx_ta::batch::{BatchProcessor, TickerSeries};
use idx_ta::config::AnalysisConfig;
use idx_ta::engine::{AnalyzerKind, Engine, Registry, Report};
use serde::Serialize;

use crate::args::{parse_analyzers, parse_deadline, Args, Command, InputArgs};
use crate::csv_parser::{load_series, ticker_from_path};
use crate::error::{CliError, Result};
use crate::output::{write_json, OutputDest};

/// Runs the command in `args` and writes its JSON output.
///
/// # Errors
///
/// Any error from loading the configuration or input, from the analyzer of
/// a single-analyzer command, or from writing the output.
pub fn run(args: &Args) -> Result<()> {
    let config = args.load_config()?;
    let dest = OutputDest::from_option(args.output_path().map(PathBuf::as_path));

    match &args.command {
        Command::Normalize(io) => {
            let series = load_series(&io.input)?;
            write_json(&series, &dest)
        }
        Command::Analyze {
            io,
            analyzers,
            deadline_ms,
        } => {
            let kinds = parse_analyzers(analyzers)?;
            let deadline = deadline_from_now(parse_deadline(*deadline_ms)?);
            let report = analyze_file(&Engine::new(config)?, io, &kinds, deadline)?;
            write_json(&report, &dest)
        }
        Command::Batch {
            inputs,
            analyzers,
            deadline_ms,
            ..
        } => {
            let kinds = parse_analyzers(analyzers)?;
            let deadline = deadline_from_now(parse_deadline(*deadline_ms)?);
            let entries = analyze_files(&Engine::new(config)?, inputs, &kinds, deadline);
            write_json(&entries, &dest)
        }
        single => {
            let (Some(kind), Some(io)) = (single.analyzer(), single.io()) else {
                return Err(CliError::InvalidArgument {
                    argument: "command".to_string(),
                    reason: "not a single-analyzer command".to_string(),
                    suggestion: None,
                });
            };
            run_single(kind, &config, io, &dest)
        }
    }
}

fn deadline_from_now(budget: Option<Duration>) -> Option<Instant> {
    budget.map(|b| Instant::now() + b)
}

fn ticker_for(io: &InputArgs) -> String {
    io.ticker
        .clone()
        .unwrap_or_else(|| ticker_from_path(&io.input))
}

/// Runs one analyzer directly; its error fails the command.
fn run_single(
    kind: AnalyzerKind,
    config: &AnalysisConfig,
    io: &InputArgs,
    dest: &OutputDest,
) -> Result<()> {
    config.validate()?;
    let analyzer = Registry::standard()
        .get(kind)
        .ok_or_else(|| CliError::InvalidArgument {
            argument: "analyzer".to_string(),
            reason: format!("{kind} is not registered"),
            suggestion: None,
        })?;
    let series = load_series(&io.input)?;
    tracing::info!(ticker = %ticker_for(io), analyzer = %kind, bars = series.len(), "running");
    let result = analyzer(&series, config)?;
    write_json(&result, dest)
}

/// Runs the engine over one file.
///
/// # Errors
///
/// Returns an error only if the file cannot be loaded; analyzer failures
/// are recorded in the report.
pub fn analyze_file(
    engine: &Engine,
    io: &InputArgs,
    kinds: &BTreeSet<AnalyzerKind>,
    deadline: Option<Instant>,
) -> Result<Report> {
    let series = load_series(&io.input)?;
    Ok(engine.run(&ticker_for(io), &series, kinds, deadline))
}

/// One input of a batch run.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchEntry {
    /// The file loaded and the engine produced a report.
    Ok(Report),
    /// The file could not be loaded or normalized.
    Error {
        /// Ticker derived from the file name.
        ticker: String,
        /// Input path as given.
        path: String,
        /// Why the file was skipped.
        error: Annotation,
    },
}

impl BatchEntry {
    /// The report, if the file was analyzed.
    #[must_use]
    pub const fn report(&self) -> Option<&Report> {
        match self {
            Self::Ok(report) => Some(report),
            Self::Error { .. } => None,
        }
    }
}

/// Error code and message of a skipped input.
#[derive(Debug, Serialize)]
pub struct Annotation {
    /// Stable code, see [`CliError::code`].
    pub code: &'static str,
    /// Human-readable description.
    pub message: String,
}

impl From<&CliError> for Annotation {
    fn from(err: &CliError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

/// Loads every file, then runs the engine over the loaded ones in parallel.
///
/// A file that fails to load becomes an error entry in its input position;
/// the rest of the batch still runs.
pub fn analyze_files<P: AsRef<Path>>(
    engine: &Engine,
    paths: &[P],
    kinds: &BTreeSet<AnalyzerKind>,
    deadline: Option<Instant>,
) -> Vec<BatchEntry> {
    let mut slots: Vec<Option<BatchEntry>> = Vec::with_capacity(paths.len());
    let mut positions = Vec::new();
    let mut inputs = Vec::new();

    for (position, path) in paths.iter().enumerate() {
        let path: &Path = path.as_ref();
        let ticker = ticker_from_path(path);
        match load_series(path) {
            Ok(series) => {
                positions.push(position);
                inputs.push(TickerSeries::new(ticker, series));
                slots.push(None);
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "skipping input");
                slots.push(Some(BatchEntry::Error {
                    ticker,
                    path: path.display().to_string(),
                    error: Annotation::from(&err),
                }));
            }
        }
    }

    tracing::info!(
        tickers = inputs.len(),
        skipped = paths.len() - inputs.len(),
        analyzers = kinds.len(),
        "starting batch"
    );
    let reports = BatchProcessor::new().analyze(engine, &inputs, kinds, deadline);
    for (position, report) in positions.into_iter().zip(reports) {
        slots[position] = Some(BatchEntry::Ok(report));
    }
    slots.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_fixture(name: &str, rows: usize) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("idx_ta_cmd_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let mut csv = String::from("date,open,high,low,close,volume\n");
        for i in 0..rows {
            let close = 1000.0 + (i as f64 * 0.3).sin() * 50.0 + i as f64;
            csv.push_str(&format!(
                "{},{},{},{},{},{}\n",
                1_700_000_000 + 86_400 * i as i64,
                close - 2.0,
                close + 10.0,
                close - 10.0,
                close,
                1_000_000 + (i % 7) * 50_000
            ));
        }
        fs::write(&path, csv).unwrap();
        path
    }

    #[test]
    fn test_analyze_file_uses_stem_as_ticker() {
        let path = write_fixture("asii.csv", 80);
        let io = InputArgs {
            input: path,
            output: None,
            ticker: None,
        };
        let engine = Engine::new(AnalysisConfig::default()).unwrap();
        let kinds = [AnalyzerKind::Volume, AnalyzerKind::PriceLimit].into();
        let report = analyze_file(&engine, &io, &kinds, None).unwrap();
        assert_eq!(report.ticker, "ASII");
        assert_eq!(report.succeeded(), 2);
    }

    #[test]
    fn test_analyze_files_keeps_order() {
        let paths = vec![write_fixture("bbri.csv", 60), write_fixture("bmri.csv", 70)];
        let engine = Engine::new(AnalysisConfig::default()).unwrap();
        let kinds = [AnalyzerKind::Breakout].into();
        let entries = analyze_files(&engine, &paths, &kinds, None);
        assert_eq!(entries[0].report().unwrap().ticker, "BBRI");
        assert_eq!(entries[1].report().unwrap().bars, 70);
    }

    #[test]
    fn test_analyze_files_missing_file_is_annotated() {
        let good = write_fixture("unvr.csv", 60);
        let paths = vec![PathBuf::from("/no/such/ggrm.csv"), good];
        let engine = Engine::new(AnalysisConfig::default()).unwrap();
        let kinds = [AnalyzerKind::Volume].into();
        let entries = analyze_files(&engine, &paths, &kinds, None);
        assert_eq!(entries.len(), 2);
        match &entries[0] {
            BatchEntry::Error { ticker, error, .. } => {
                assert_eq!(ticker, "GGRM");
                assert_eq!(error.code, "IO_ERROR");
            }
            BatchEntry::Ok(_) => panic!("missing file should not produce a report"),
        }
        assert_eq!(entries[1].report().unwrap().ticker, "UNVR");
    }
}
