//! JSON output to stdout or a file.
//!
//! Results are pretty-printed with a trailing newline. Field order follows
//! the result structs and reports key analyzers in a fixed order, so the same
//! input always produces byte-identical output.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{CliError, Result};

/// Output destination: either stdout or a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputDest {
    /// Write to stdout.
    Stdout,
    /// Write to a file at the given path.
    File(PathBuf),
}

impl OutputDest {
    /// A file destination when a path is given, stdout otherwise.
    #[must_use]
    pub fn from_option(path: Option<&Path>) -> Self {
        path.map_or(Self::Stdout, |p| Self::File(p.to_path_buf()))
    }

    /// Create a writer for this output destination.
    ///
    /// # Errors
    ///
    /// Returns `CliError::IoError` if the file cannot be created.
    pub fn writer(&self) -> Result<Box<dyn Write>> {
        match self {
            Self::Stdout => Ok(Box::new(io::stdout().lock())),
            Self::File(path) => {
                let file = File::create(path).map_err(|e| CliError::IoError {
                    source: e,
                    path: Some(path.display().to_string()),
                })?;
                Ok(Box::new(BufWriter::new(file)))
            }
        }
    }
}

/// Serializes `value` as pretty JSON into `writer`.
///
/// # Errors
///
/// Returns `CliError::JsonError` or `CliError::IoError`.
pub fn write_json_to<T: Serialize + ?Sized, W: Write>(value: &T, mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, value)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Serializes `value` as pretty JSON to `dest`.
///
/// # Errors
///
/// Anything [`OutputDest::writer`] or [`write_json_to`] returns.
pub fn write_json<T: Serialize + ?Sized>(value: &T, dest: &OutputDest) -> Result<()> {
    write_json_to(value, dest.writer()?)
}
