//! Error types for `beads-view`.
//!
//! These only surface through the `try_*` readers. The public snapshot
//! readers log them and fall back to an empty source.

use std::path::PathBuf;
use thiserror::Error;

/// Error raised while reading a beads store.
#[derive(Error, Debug)]
pub enum ViewError {
    // === Source Errors ===
    /// The store file does not exist.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// A line of the JSONL file is not a valid issue record.
    #[error("JSONL parse error at line {line}: {reason}")]
    JsonlParse { line: usize, reason: String },

    // === Backend Errors ===
    /// SQLite open or query failure.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ViewError {
    /// Map an open error, turning `NotFound` into [`ViewError::FileNotFound`].
    #[must_use]
    pub fn from_open(err: std::io::Error, path: &std::path::Path) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::FileNotFound(path.to_path_buf())
        } else {
            Self::Io(err)
        }
    }
}

/// Result type using `ViewError`.
pub type Result<T> = std::result::Result<T, ViewError>;
