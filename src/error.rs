// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Failures of the history and diff sources.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("{} is not a valid directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("{} is not inside a git repository", .0.display())]
    NotARepository(PathBuf),

    #[error("invalid commit identifier: {0}")]
    InvalidIdentifier(String),

    #[error("git error: {0}")]
    Git(#[from] git2::Error),
}

/// Errors surfaced at the binary boundary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    History(#[from] HistoryError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = HistoryError> = std::result::Result<T, E>;
