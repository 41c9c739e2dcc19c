//! Dual-source reading.
//!
//! A project can hold its issues in a JSONL file, a SQLite database, or
//! both. Only one of them is being written at any moment, so when both
//! have data the one with the most recent `updated_at` is returned whole.
//! The two lists are never merged.
//!
//! # Submodules
//!
//! - [`jsonl`] - `.beads/issues.jsonl`
//! - [`sqlite`] - `.beads/beads.db`

pub mod jsonl;
pub mod sqlite;

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::model::Issue;
use crate::util::newest_update;

pub const BEADS_DIR: &str = ".beads";
pub const JSONL_FILE: &str = "issues.jsonl";
pub const DB_FILE: &str = "beads.db";

/// Well-known store locations for one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeadsPaths {
    pub dir: PathBuf,
    pub jsonl: PathBuf,
    pub db: PathBuf,
}

impl BeadsPaths {
    #[must_use]
    pub fn new(project_path: &Path) -> Self {
        let dir = project_path.join(BEADS_DIR);
        Self {
            jsonl: dir.join(JSONL_FILE),
            db: dir.join(DB_FILE),
            dir,
        }
    }

    /// The database plus its `-wal` and `-shm` companions.
    #[must_use]
    pub fn db_file_set(&self) -> [PathBuf; 3] {
        let db = self.db.as_os_str();
        let with_suffix = |suffix: &str| {
            let mut name = db.to_os_string();
            name.push(suffix);
            PathBuf::from(name)
        };
        [self.db.clone(), with_suffix("-wal"), with_suffix("-shm")]
    }

    /// A directory is a beads project if either store exists.
    #[must_use]
    pub fn is_beads_project(&self) -> bool {
        self.dir.is_dir() && (self.jsonl.exists() || self.db.exists())
    }
}

/// Which store a snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Jsonl,
    Sqlite,
    /// Neither store had any issues.
    Empty,
}

/// Pick the authoritative list.
///
/// One non-empty side wins as-is. With both non-empty the strictly newer
/// `updated_at` wins; ties and missing timestamps go to SQLite.
#[must_use]
pub fn resolve_sources(jsonl: Vec<Issue>, sqlite: Vec<Issue>) -> (SourceKind, Vec<Issue>) {
    match (jsonl.is_empty(), sqlite.is_empty()) {
        (true, true) => (SourceKind::Empty, Vec::new()),
        (false, true) => (SourceKind::Jsonl, jsonl),
        (true, false) => (SourceKind::Sqlite, sqlite),
        (false, false) => {
            // None sorts below Some, so a side with no timestamps only
            // wins if the other has none either, and then SQLite wins.
            if newest_update(&jsonl) > newest_update(&sqlite) {
                (SourceKind::Jsonl, jsonl)
            } else {
                (SourceKind::Sqlite, sqlite)
            }
        }
    }
}

/// Read both stores and return the resolved source with its issues.
#[must_use]
pub fn read_resolved(project_path: &Path) -> (SourceKind, Vec<Issue>) {
    let paths = BeadsPaths::new(project_path);
    let from_jsonl = jsonl::read(&paths.jsonl);
    let from_sqlite = sqlite::read(&paths.db);
    let (kind, issues) = resolve_sources(from_jsonl, from_sqlite);
    debug!(
        project = %project_path.display(),
        source = ?kind,
        count = issues.len(),
        "Read issues"
    );
    (kind, issues)
}

/// Current snapshot of a project's issues. Never fails.
#[must_use]
pub fn read_issues(project_path: &Path) -> Vec<Issue> {
    read_resolved(project_path).1
}
