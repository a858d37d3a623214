//! CLI argument parsing.
//!
//! The CLI follows the pattern `idx-ta <command> <input.csv> [options] [-o out.json]`.
//!
//! # Examples
//!
//! ```bash
//! # Validated, sorted bars
//! idx-ta normalize bbca.csv
//!
//! # One analyzer
//! idx-ta fibonacci bbca.csv -o fib.json
//! idx-ta limits tlkm.csv --board fca
//!
//! # Several analyzers with partial results and a time budget
//! idx-ta analyze bbca.csv --analyzers trend,cloud,breakout --deadline-ms 500
//!
//! # Many tickers at once, ticker taken from the file name
//! idx-ta batch data/*.csv --analyzers all
//! ```

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args as ClapArgs, Parser, Subcommand};
use idx_ta::config::AnalysisConfig;
use idx_ta::engine::AnalyzerKind;

use crate::error::{CliError, Result};

/// idx-ta: technical-analysis signals for IDX equities
#[derive(Parser, Debug)]
#[command(name = "idx-ta")]
#[command(author, version, about = "Technical-analysis signal engine for IDX equities")]
#[command(long_about = "idx-ta reads daily OHLCV bars from CSV files and reports swing \
    levels, candlestick patterns, crossovers, trend strength, the Ichimoku cloud, \
    divergences, breakouts, volume phases and ARA/ARB price limits as JSON.")]
pub struct Args {
    /// What to compute
    #[command(subcommand)]
    pub command: Command,

    /// JSON file with analyzer parameters (defaults plus IDX_TA_* variables otherwise)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Listing board used for tick and price-limit rules (regular, fca, ppk)
    #[arg(long, global = true)]
    pub board: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Input and output shared by every single-file command.
#[derive(ClapArgs, Debug, Clone)]
pub struct InputArgs {
    /// Input CSV file
    pub input: PathBuf,

    /// Output JSON file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Ticker reported in the output (defaults to the file name)
    #[arg(short, long)]
    pub ticker: Option<String>,
}

/// Available commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Validate and sort the bars, reporting dropped rows
    Normalize(InputArgs),
    /// Swing highs and lows with the trend they imply
    Swing(InputArgs),
    /// Fibonacci retracement and extension levels
    #[command(alias = "fib")]
    Fibonacci(InputArgs),
    /// Candlestick patterns over the recent bars
    Candles(InputArgs),
    /// Moving-average crossovers and composite score
    Crossover(InputArgs),
    /// ADX trend strength and direction
    #[command(alias = "adx")]
    Trend(InputArgs),
    /// Ichimoku cloud state
    #[command(alias = "ichimoku")]
    Cloud(InputArgs),
    /// Price versus RSI/MACD/OBV divergences
    Divergence(InputArgs),
    /// Consolidation range breakout
    Breakout(InputArgs),
    /// Accumulation, markup, distribution or markdown phase
    Phase(InputArgs),
    /// Volume averages, spikes and price-volume correlation
    Volume(InputArgs),
    /// Tick size, ARA/ARB limits and auto-rejection history
    Limits(InputArgs),
    /// RSI, MACD, moving averages, bands, support/resistance and a verdict
    #[command(alias = "snapshot")]
    Indicators(InputArgs),
    /// Annualized volatility, ATR and risk level
    #[command(alias = "risk")]
    Volatility(InputArgs),
    /// Run several analyzers on one file
    Analyze {
        /// Input and output
        #[command(flatten)]
        io: InputArgs,

        /// Comma-separated analyzer names, or "all"
        #[arg(short, long, default_value = "all")]
        analyzers: String,

        /// Skip analyzers that have not started within this many milliseconds
        #[arg(long)]
        deadline_ms: Option<u64>,
    },
    /// Run several analyzers on many files in parallel
    Batch {
        /// Input CSV files, one ticker each
        #[arg(required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,

        /// Output JSON file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Comma-separated analyzer names, or "all"
        #[arg(short, long, default_value = "all")]
        analyzers: String,

        /// Skip analyzers that have not started within this many milliseconds
        #[arg(long)]
        deadline_ms: Option<u64>,
    },
}

impl Command {
    /// The analyzer a single-analyzer command runs.
    #[must_use]
    pub const fn analyzer(&self) -> Option<AnalyzerKind> {
        match self {
            Self::Swing(_) => Some(AnalyzerKind::Swing),
            Self::Fibonacci(_) => Some(AnalyzerKind::Fibonacci),
            Self::Candles(_) => Some(AnalyzerKind::Candlestick),
            Self::Crossover(_) => Some(AnalyzerKind::Crossover),
            Self::Trend(_) => Some(AnalyzerKind::TrendStrength),
            Self::Cloud(_) => Some(AnalyzerKind::Cloud),
            Self::Divergence(_) => Some(AnalyzerKind::Divergence),
            Self::Breakout(_) => Some(AnalyzerKind::Breakout),
            Self::Phase(_) => Some(AnalyzerKind::Phase),
            Self::Volume(_) => Some(AnalyzerKind::Volume),
            Self::Limits(_) => Some(AnalyzerKind::PriceLimit),
            Self::Indicators(_) => Some(AnalyzerKind::Indicators),
            Self::Volatility(_) => Some(AnalyzerKind::Volatility),
            Self::Normalize(_) | Self::Analyze { .. } | Self::Batch { .. } => None,
        }
    }

    /// Input and output of the single-file commands.
    #[must_use]
    pub const fn io(&self) -> Option<&InputArgs> {
        match self {
            Self::Normalize(io)
            | Self::Swing(io)
            | Self::Fibonacci(io)
            | Self::Candles(io)
            | Self::Crossover(io)
            | Self::Trend(io)
            | Self::Cloud(io)
            | Self::Divergence(io)
            | Self::Breakout(io)
            | Self::Phase(io)
            | Self::Volume(io)
            | Self::Limits(io)
            | Self::Indicators(io)
            | Self::Volatility(io)
            | Self::Analyze { io, .. } => Some(io),
            Self::Batch { .. } => None,
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Output file path, if one was given.
    #[must_use]
    pub fn output_path(&self) -> Option<&PathBuf> {
        match &self.command {
            Command::Batch { output, .. } => output.as_ref(),
            other => other.io().and_then(|io| io.output.as_ref()),
        }
    }

    /// Builds the analysis configuration: the `--config` file if given,
    /// otherwise defaults with `IDX_TA_*` overrides, then `--board`.
    ///
    /// # Errors
    ///
    /// Returns `CliError::IoError` if the config file cannot be read and
    /// `CliError::InvalidArgument` if it or `--board` does not parse.
    pub fn load_config(&self) -> Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let json = std::fs::read_to_string(path).map_err(|e| CliError::IoError {
                    source: e,
                    path: Some(path.display().to_string()),
                })?;
                AnalysisConfig::from_json(&json)?
            }
            None => AnalysisConfig::from_env(),
        };
        if let Some(board) = &self.board {
            config.price_limit.board = board.parse().map_err(|_| CliError::InvalidArgument {
                argument: "board".to_string(),
                reason: format!("unknown board '{board}'"),
                suggestion: Some("Use regular, fca or ppk".to_string()),
            })?;
        }
        Ok(config)
    }
}

/// Parses an analyzer list such as `trend,cloud` or `all`.
///
/// # Errors
///
/// Returns `CliError::InvalidArgument` for an unknown name or an empty list.
pub fn parse_analyzers(list: &str) -> Result<BTreeSet<AnalyzerKind>> {
    AnalyzerKind::parse_set(list).map_err(|e| CliError::InvalidArgument {
        argument: "analyzers".to_string(),
        reason: e.to_string(),
        suggestion: Some(format!(
            "Use \"all\" or a comma list of: {}",
            AnalyzerKind::ALL.map(AnalyzerKind::name).join(", ")
        )),
    })
}

/// Converts `--deadline-ms` into a duration.
///
/// # Errors
///
/// Returns `CliError::InvalidArgument` for zero.
pub fn parse_deadline(millis: Option<u64>) -> Result<Option<Duration>> {
    match millis {
        Some(0) => Err(CliError::InvalidArgument {
            argument: "deadline-ms".to_string(),
            reason: "must be positive".to_string(),
            suggestion: Some("Omit it to run without a deadline".to_string()),
        }),
        other => Ok(other.map(Duration::from_millis)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==========================================================================
    // Command Parsing Tests
    // ==========================================================================

    #[test]
    fn test_parse_single_analyzer() {
        let args = Args::try_parse_from(["idx-ta", "fibonacci", "bbca.csv"]).unwrap();
        assert_eq!(args.command.analyzer(), Some(AnalyzerKind::Fibonacci));
        let io = args.command.io().unwrap();
        assert_eq!(io.input, PathBuf::from("bbca.csv"));
        assert!(io.output.is_none());
    }

    #[test]
    fn test_parse_alias() {
        let args = Args::try_parse_from(["idx-ta", "adx", "bbca.csv"]).unwrap();
        assert_eq!(args.command.analyzer(), Some(AnalyzerKind::TrendStrength));
    }

    #[test]
    fn test_parse_volatility_alias() {
        let args = Args::try_parse_from(["idx-ta", "risk", "bbca.csv"]).unwrap();
        assert_eq!(args.command.analyzer(), Some(AnalyzerKind::Volatility));
        assert!(args.command.io().is_some());
    }

    #[test]
    fn test_parse_output_and_ticker() {
        let args = Args::try_parse_from([
            "idx-ta", "limits", "x.csv", "-o", "out.json", "--ticker", "TLKM",
        ])
        .unwrap();
        assert_eq!(args.output_path(), Some(&PathBuf::from("out.json")));
        assert_eq!(args.command.io().unwrap().ticker.as_deref(), Some("TLKM"));
    }

    #[test]
    fn test_parse_analyze_defaults() {
        let args = Args::try_parse_from(["idx-ta", "analyze", "bbca.csv"]).unwrap();
        match args.command {
            Command::Analyze {
                analyzers,
                deadline_ms,
                ..
            } => {
                assert_eq!(analyzers, "all");
                assert!(deadline_ms.is_none());
            }
            _ => panic!("Expected Analyze command"),
        }
    }

    #[test]
    fn test_parse_batch_inputs() {
        let args = Args::try_parse_from([
            "idx-ta", "batch", "a.csv", "b.csv", "c.csv", "--analyzers", "volume",
        ])
        .unwrap();
        match &args.command {
            Command::Batch { inputs, analyzers, .. } => {
                assert_eq!(inputs.len(), 3);
                assert_eq!(analyzers, "volume");
            }
            _ => panic!("Expected Batch command"),
        }
        assert!(args.command.io().is_none());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args =
            Args::try_parse_from(["idx-ta", "limits", "x.csv", "--board", "fca", "-vv"]).unwrap();
        assert_eq!(args.board.as_deref(), Some("fca"));
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_parse_help() {
        assert!(Args::try_parse_from(["idx-ta", "--help"]).is_err());
    }

    #[test]
    fn test_error_missing_command() {
        assert!(Args::try_parse_from(["idx-ta"]).is_err());
    }

    #[test]
    fn test_error_missing_input_file() {
        assert!(Args::try_parse_from(["idx-ta", "swing"]).is_err());
        assert!(Args::try_parse_from(["idx-ta", "batch"]).is_err());
    }

    // ==========================================================================
    // Value Parsing Tests
    // ==========================================================================

    #[test]
    fn test_parse_analyzers_list() {
        let kinds = parse_analyzers("trend, cloud").unwrap();
        assert_eq!(
            kinds.into_iter().collect::<Vec<_>>(),
            vec![AnalyzerKind::TrendStrength, AnalyzerKind::Cloud]
        );
        assert_eq!(parse_analyzers("all").unwrap().len(), AnalyzerKind::ALL.len());
    }

    #[test]
    fn test_parse_analyzers_unknown() {
        let err = parse_analyzers("trend,bogus").unwrap_err();
        match err {
            CliError::InvalidArgument { argument, suggestion, .. } => {
                assert_eq!(argument, "analyzers");
                assert!(suggestion.unwrap().contains("fibonacci"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_parse_deadline() {
        assert_eq!(parse_deadline(None).unwrap(), None);
        assert_eq!(
            parse_deadline(Some(250)).unwrap(),
            Some(Duration::from_millis(250))
        );
        assert!(parse_deadline(Some(0)).is_err());
    }

    #[test]
    fn test_load_config_board_override() {
        let args = Args::try_parse_from(["idx-ta", "limits", "x.csv", "--board", "ppk"]).unwrap();
        let config = args.load_config().unwrap();
        assert_eq!(config.price_limit.board, idx_ta::analysis::price_limit::Board::Ppk);

        let bad = Args::try_parse_from(["idx-ta", "limits", "x.csv", "--board", "nasdaq"]).unwrap();
        assert!(matches!(bad.load_config(), Err(CliError::InvalidArgument { .. })));
    }

    #[test]
    fn test_load_config_missing_file() {
        let args =
            Args::try_parse_from(["idx-ta", "swing", "x.csv", "--config", "/no/such/file.json"])
                .unwrap();
        assert!(matches!(args.load_config(), Err(CliError::IoError { .. })));
    }
}
