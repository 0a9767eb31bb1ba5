//! CLI command implementations.

pub mod apply;
pub mod fixture;
pub mod plan;
pub mod show;

use cellsync_core::CoreError;
use serde::Serialize;
use std::io::Write;
use thiserror::Error;

/// How command results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable lines.
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Errors from running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// A file could not be read or output could not be written.
    #[error("i/o error on {path}: {source}")]
    Io {
        /// File or stream involved.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// A JSON file did not parse.
    #[error("invalid json in {path}: {source}")]
    Json {
        /// File involved.
        path: String,
        /// Underlying error.
        source: serde_json::Error,
    },

    /// The configuration service rejected the request.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for commands.
pub type CommandResult<T> = Result<T, CommandError>;

impl CommandError {
    fn stdout(source: std::io::Error) -> Self {
        Self::Io {
            path: "<output>".into(),
            source,
        }
    }
}

pub(crate) fn write_json<T: Serialize>(out: &mut dyn Write, value: &T) -> CommandResult<()> {
    let json = serde_json::to_string_pretty(value).map_err(|source| CommandError::Json {
        path: "<output>".into(),
        source,
    })?;
    writeln!(out, "{json}").map_err(CommandError::stdout)
}

pub(crate) fn write_line(out: &mut dyn Write, line: impl std::fmt::Display) -> CommandResult<()> {
    writeln!(out, "{line}").map_err(CommandError::stdout)
}
