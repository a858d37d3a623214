//! idx-ta CLI library
//!
//! Exposes the CLI components for testing and reuse.

pub mod args;
pub mod commands;
pub mod csv_parser;
pub mod error;
pub mod output;

pub use error::{CliError, Result};
