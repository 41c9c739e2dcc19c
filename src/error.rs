//! Error types for `abacus`.

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for dashboard operations.
#[derive(Error, Debug)]
pub enum AbacusError {
    // === Project Errors ===
    /// Project with the specified ID is not registered.
    #[error("Project not found: {id}")]
    ProjectNotFound { id: u64 },

    /// Issue ID is not in the project's current snapshot.
    #[error("Issue not found: {id}")]
    IssueNotFound { id: String },

    /// Path given for a project does not exist.
    #[error("Path does not exist: {}", .0.display())]
    PathNotFound(PathBuf),

    /// Path exists but holds neither `issues.jsonl` nor `beads.db`.
    #[error("Path does not contain a beads project (.beads/issues.jsonl or .beads/beads.db): {}", .0.display())]
    NotBeadsProject(PathBuf),

    /// Path is already in the registry.
    #[error("Project already registered: {}", .0.display())]
    AlreadyRegistered(PathBuf),

    // === Configuration Errors ===
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Config file is not valid YAML for [`crate::config::FileConfig`].
    #[error("Invalid config file {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    // === Watch Errors ===
    /// File watcher could not be created or attached.
    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    // === I/O Errors ===
    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type using `AbacusError`.
pub type Result<T> = std::result::Result<T, AbacusError>;
