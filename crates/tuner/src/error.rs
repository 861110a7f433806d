//! Error types for the tuner CLI.

use std::path::PathBuf;

use thiserror::Error;

/// Input and output errors surfaced to the user.
#[derive(Error, Debug)]
pub enum TunerError {
    #[error("Input file not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("Invalid input file {}: {reason}", path.display())]
    InvalidInput { path: PathBuf, reason: String },

    #[error("Unrecognized JSON document: {0}")]
    UnknownDocument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TunerError {
    pub fn invalid_input(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::InvalidInput {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
