//! # CLI Errors
//!
//! Everything that can stop a `pointpath` command.

use pointpath_core::{GraphError, PathError};
use thiserror::Error;

/// Errors surfaced by the command-line application.
#[derive(Debug, Error)]
pub enum CliError {
    /// Reading or writing a file failed.
    #[error("I/O error: {0}")]
    Io(String),

    /// The map file is not valid TOML for the map schema.
    #[error("Invalid map file: {0}")]
    Map(#[from] toml::de::Error),

    /// Building or decoding the graph failed.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// A path query failed.
    #[error(transparent)]
    Path(#[from] PathError),

    /// A command argument or map entry is out of range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
