//! Reads OHLCV bars from CSV files.
//!
//! # Column Detection
//!
//! Columns are matched on header names (case-insensitive, surrounding spaces
//! ignored):
//! - `date`, `time`, `datetime`, `timestamp`, `dt` → bar timestamp
//! - `open`, `high`, `low` → prices
//! - `close`, `price`, `adj close`, `adjusted close` → close
//! - `volume`, `vol` → volume (optional, missing means 0)
//!
//! Timestamps may be `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS`, RFC 3339 or integer
//! unix seconds. Without a date column the row number is used. Empty numeric
//! cells become NaN so the normalizer drops and counts those rows.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use idx_ta::series::{Bar, Series};

use crate::error::{CliError, Result};

/// Positions of the recognized columns in a header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    /// Date/time column.
    pub timestamp: Option<usize>,
    /// Open price column.
    pub open: usize,
    /// High price column.
    pub high: usize,
    /// Low price column.
    pub low: usize,
    /// Close price column.
    pub close: usize,
    /// Volume column.
    pub volume: Option<usize>,
}

impl ColumnMap {
    /// Locates the columns in `headers`.
    ///
    /// # Errors
    ///
    /// Returns `CliError::CsvParseError` naming the first missing price column.
    pub fn detect<S: AsRef<str>>(headers: &[S]) -> Result<Self> {
        let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h.as_ref())).collect();
        let find = |names: &[&str]| {
            names
                .iter()
                .find_map(|name| normalized.iter().position(|h| h == name))
        };
        let require = |names: &[&str]| {
            find(names).ok_or_else(|| CliError::CsvParseError {
                message: format!("no '{}' column found", names[0]),
                line: Some(1),
            })
        };

        Ok(Self {
            timestamp: find(&["date", "time", "datetime", "timestamp", "dt"]),
            open: require(&["open"])?,
            high: require(&["high"])?,
            low: require(&["low"])?,
            close: require(&["close", "price", "adj close", "adjusted close"])?,
            volume: find(&["volume", "vol"]),
        })
    }
}

/// Normalize a column header name for matching.
fn normalize_header(header: &str) -> String {
    header.trim().trim_start_matches('\u{feff}').to_lowercase()
}

/// Parse a string value to f64, treating empty as NaN.
fn parse_value(value: &str, line: usize) -> Result<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Ok(f64::NAN)
    } else {
        trimmed.parse::<f64>().map_err(|_| CliError::CsvParseError {
            message: format!("cannot parse '{trimmed}' as number"),
            line: Some(line),
        })
    }
}

/// Parses a timestamp cell into unix seconds.
///
/// # Errors
///
/// Returns `CliError::CsvParseError` when no accepted format matches.
pub fn parse_timestamp(value: &str, line: usize) -> Result<i64> {
    let trimmed = value.trim();
    if let Ok(secs) = trimmed.parse::<i64>() {
        return Ok(secs);
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc().timestamp());
        }
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt.and_utc().timestamp());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.timestamp());
    }
    Err(CliError::CsvParseError {
        message: format!("cannot parse '{trimmed}' as a date"),
        line: Some(line),
    })
}

/// Reads bars from any reader with a header row.
///
/// # Errors
///
/// Returns `CliError::CsvParseError` if the header lacks a price column, a
/// row is malformed, or a cell does not parse.
pub fn parse_bars_from_reader<R: Read>(reader: R) -> Result<Vec<Bar>> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()
        .map_err(|e| CliError::CsvParseError {
            message: e.to_string(),
            line: Some(1),
        })?
        .iter()
        .map(String::from)
        .collect();
    let columns = ColumnMap::detect(&headers)?;
    if columns.volume.is_none() {
        tracing::warn!("no volume column, using 0 for every bar");
    }

    let mut bars = Vec::new();
    for (row, result) in csv_reader.records().enumerate() {
        // +2 for the header and 1-based lines
        let line = row + 2;
        let record = result.map_err(|e| CliError::CsvParseError {
            message: e.to_string(),
            line: Some(line),
        })?;
        let cell = |idx: usize| record.get(idx).unwrap_or("");

        let timestamp = match columns.timestamp {
            Some(idx) => parse_timestamp(cell(idx), line)?,
            None => i64::try_from(row).map_err(|_| CliError::CsvParseError {
                message: "too many rows".to_string(),
                line: Some(line),
            })?,
        };
        let volume = match columns.volume {
            Some(idx) => parse_value(cell(idx), line)?,
            None => 0.0,
        };
        bars.push(Bar::new(
            timestamp,
            parse_value(cell(columns.open), line)?,
            parse_value(cell(columns.high), line)?,
            parse_value(cell(columns.low), line)?,
            parse_value(cell(columns.close), line)?,
            volume,
        ));
    }

    tracing::debug!(rows = bars.len(), "parsed csv");
    Ok(bars)
}

/// Reads bars from a CSV file.
///
/// # Errors
///
/// Returns `CliError::IoError` if the file cannot be opened, otherwise
/// anything [`parse_bars_from_reader`] returns.
pub fn parse_bars<P: AsRef<Path>>(path: P) -> Result<Vec<Bar>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| CliError::IoError {
        source: e,
        path: Some(path.display().to_string()),
    })?;
    parse_bars_from_reader(BufReader::new(file))
}

/// Reads and normalizes a CSV file.
///
/// # Errors
///
/// Anything [`parse_bars`] or `Series::normalize` returns.
pub fn load_series<P: AsRef<Path>>(path: P) -> Result<Series> {
    let path = path.as_ref();
    let series = Series::normalize(parse_bars(path)?)?;
    if series.dropped() > 0 {
        tracing::warn!(
            file = %path.display(),
            dropped = series.dropped(),
            "dropped rows with missing or non-finite values"
        );
    }
    Ok(series)
}

/// Ticker implied by a file name: its stem in upper case.
#[must_use]
pub fn ticker_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_uppercase())
        .unwrap_or_default()
}
