//! CLI error types for file I/O, CSV parsing, analysis and argument errors.
//!
//! Messages say what went wrong and, where there is one, how to fix it.

use std::fmt;
use std::io;

/// Every error the CLI can report.
#[derive(Debug)]
pub enum CliError {
    /// Reading or writing a file failed.
    IoError {
        /// The underlying I/O error.
        source: io::Error,
        /// Path involved, if known.
        path: Option<String>,
    },
    /// The input CSV could not be turned into bars.
    CsvParseError {
        /// Description of the problem.
        message: String,
        /// 1-based line number (the header is line 1), if known.
        line: Option<usize>,
    },
    /// The library rejected the series or an analyzer failed.
    AnalysisError {
        /// The underlying idx-ta error.
        source: idx_ta::Error,
    },
    /// Results could not be serialized.
    JsonError {
        /// The underlying serde error.
        source: serde_json::Error,
    },
    /// An argument value is unusable.
    InvalidArgument {
        /// Name of the argument.
        argument: String,
        /// Why it was rejected.
        reason: String,
        /// A valid alternative, when one can be suggested.
        suggestion: Option<String>,
    },
}

impl CliError {
    /// Process exit code for this error: 2 for usage errors, 1 otherwise.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidArgument { .. } => 2,
            _ => 1,
        }
    }

    /// Stable machine-readable code, used when an error is reported inside
    /// JSON output instead of failing the command.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::IoError { .. } => "IO_ERROR",
            Self::CsvParseError { .. } => "CSV_PARSE_ERROR",
            Self::AnalysisError { source } => source.code(),
            Self::JsonError { .. } => "JSON_ERROR",
            Self::InvalidArgument { .. } => "INVALID_ARGUMENT",
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IoError { source, path } => {
                if let Some(p) = path {
                    write!(f, "I/O error with file '{p}': {source}. ")?;
                    write!(f, "Check that the path exists and is readable.")
                } else {
                    write!(f, "I/O error: {source}")
                }
            }
            Self::CsvParseError { message, line } => {
                if let Some(l) = line {
                    write!(f, "CSV parse error on line {l}: {message}. ")?;
                } else {
                    write!(f, "CSV parse error: {message}. ")?;
                }
                write!(
                    f,
                    "Expected a header with date, open, high, low, close and volume columns."
                )
            }
            Self::AnalysisError { source } => match source {
                idx_ta::Error::InsufficientData { .. } => {
                    write!(f, "{source}. Supply a longer history.")
                }
                _ => write!(f, "Analysis error [{}]: {source}", source.code()),
            },
            Self::JsonError { source } => write!(f, "Failed to serialize results: {source}"),
            Self::InvalidArgument {
                argument,
                reason,
                suggestion,
            } => {
                write!(f, "Invalid argument '{argument}': {reason}")?;
                if let Some(s) = suggestion {
                    write!(f, ". {s}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::IoError { source, .. } => Some(source),
            Self::AnalysisError { source } => Some(source),
            Self::JsonError { source } => Some(source),
            Self::CsvParseError { .. } | Self::InvalidArgument { .. } => None,
        }
    }
}

impl From<io::Error> for CliError {
    fn from(err: io::Error) -> Self {
        Self::IoError {
            source: err,
            path: None,
        }
    }
}

impl From<idx_ta::Error> for CliError {
    fn from(err: idx_ta::Error) -> Self {
        match err {
            idx_ta::Error::InvalidParameter { name, reason } => Self::InvalidArgument {
                argument: name.to_string(),
                reason,
                suggestion: None,
            },
            other => Self::AnalysisError { source: other },
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError { source: err }
    }
}

impl From<csv::Error> for CliError {
    fn from(err: csv::Error) -> Self {
        let line = err
            .position()
            .and_then(|p| usize::try_from(p.line()).ok());
        Self::CsvParseError {
            message: err.to_string(),
            line,
        }
    }
}

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    // ==========================================================================
    // Display Tests
    // ==========================================================================

    #[test]
    fn test_io_error_mentions_path() {
        let err = CliError::IoError {
            source: io::Error::new(io::ErrorKind::NotFound, "not found"),
            path: Some("bbca.csv".to_string()),
        };
        let msg = err.to_string();
        assert!(msg.contains("bbca.csv"));
        assert!(msg.contains("readable"));
    }

    #[test]
    fn test_csv_error_with_line() {
        let err = CliError::CsvParseError {
            message: "cannot parse 'abc' as number".to_string(),
            line: Some(7),
        };
        assert!(err.to_string().starts_with("CSV parse error on line 7"));
    }

    #[test]
    fn test_insufficient_data_suggests_longer_history() {
        let err = CliError::from(idx_ta::Error::InsufficientData {
            required: 26,
            actual: 10,
            indicator: "cloud",
        });
        assert!(err.to_string().contains("longer history"));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_analysis_error_carries_code() {
        let err = CliError::from(idx_ta::Error::EmptyInput);
        assert!(err.to_string().contains("EMPTY_INPUT"));
        assert!(err.source().is_some());
        assert_eq!(err.code(), "EMPTY_INPUT");
    }

    #[test]
    fn test_codes_for_cli_errors() {
        let io = CliError::from(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert_eq!(io.code(), "IO_ERROR");
        let csv = CliError::CsvParseError {
            message: "bad".to_string(),
            line: None,
        };
        assert_eq!(csv.code(), "CSV_PARSE_ERROR");
    }

    #[test]
    fn test_invalid_parameter_becomes_usage_error() {
        let err = CliError::from(idx_ta::Error::InvalidParameter {
            name: "analyzer",
            reason: "unknown analyzer 'foo'".to_string(),
        });
        assert!(matches!(err, CliError::InvalidArgument { .. }));
        assert_eq!(err.exit_code(), 2);
        assert_eq!(err.to_string(), "Invalid argument 'analyzer': unknown analyzer 'foo'");
    }

    #[test]
    fn test_invalid_argument_with_suggestion() {
        let err = CliError::InvalidArgument {
            argument: "deadline-ms".to_string(),
            reason: "must be positive".to_string(),
            suggestion: Some("Use a value like 500".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Invalid argument 'deadline-ms': must be positive. Use a value like 500"
        );
        assert!(err.source().is_none());
    }

    // ==========================================================================
    // Conversion Tests
    // ==========================================================================

    #[test]
    fn test_from_io_error() {
        let err: CliError = io::Error::new(io::ErrorKind::PermissionDenied, "denied").into();
        assert!(matches!(err, CliError::IoError { path: None, .. }));
    }

    #[test]
    fn test_from_json_error() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: CliError = source.into();
        assert!(err.to_string().starts_with("Failed to serialize"));
    }
}
