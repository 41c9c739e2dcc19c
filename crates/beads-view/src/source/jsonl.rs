//! JSONL log-file source (`.beads/issues.jsonl`).
//!
//! Each line is a complete issue with embedded labels and dependencies.
//! The file may be rewritten underneath us at any time, so a bad line
//! (including a half-written last line) is skipped on its own.
//!
//! The log is append-style: a later line for an id replaces the earlier
//! one, and a later tombstone removes it.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{Result, ViewError};
use crate::model::Issue;

/// Issues parsed from a JSONL file plus the lines that were rejected.
#[derive(Debug, Default)]
pub struct JsonlLoad {
    pub issues: Vec<Issue>,
    pub skipped: Vec<ViewError>,
}

/// Parse JSONL content.
///
/// Blank lines are ignored. Lines that are not valid UTF-8 or not a valid
/// issue are collected in `skipped`. Each id keeps the position of its
/// first line and the content of its last. Tombstoned records are dropped.
#[must_use]
pub fn parse(content: &[u8]) -> JsonlLoad {
    let mut load = JsonlLoad::default();
    let mut records: Vec<Issue> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (idx, raw) in content.split(|b| *b == b'\n').enumerate() {
        let line_num = idx + 1;
        let line = match std::str::from_utf8(raw) {
            Ok(line) => line.trim(),
            Err(e) => {
                load.skipped.push(ViewError::JsonlParse {
                    line: line_num,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }

        match Issue::from_json_line(line) {
            Ok(mut issue) => {
                issue.dedup_labels();
                if let Some(&pos) = index.get(&issue.id) {
                    debug!(id = %issue.id, line = line_num, "Later JSONL record replaces earlier one");
                    records[pos] = issue;
                } else {
                    index.insert(issue.id.clone(), records.len());
                    records.push(issue);
                }
            }
            Err(e) => load.skipped.push(ViewError::JsonlParse {
                line: line_num,
                reason: e.to_string(),
            }),
        }
    }

    load.issues = records
        .into_iter()
        .filter(|issue| {
            let dead = issue.is_tombstoned();
            if dead {
                debug!(id = %issue.id, "Skipping tombstoned JSONL record");
            }
            !dead
        })
        .collect();
    load
}

/// Load a JSONL file.
///
/// # Errors
///
/// Returns `FileNotFound` if the file is missing, or `Io` if it cannot be read.
/// Malformed lines are not errors; see [`JsonlLoad::skipped`].
pub fn try_load(path: &Path) -> Result<JsonlLoad> {
    let content = fs::read(path).map_err(|e| ViewError::from_open(e, path))?;
    Ok(parse(&content))
}

/// Read issues from a JSONL file, degrading to an empty list.
#[must_use]
pub fn read(path: &Path) -> Vec<Issue> {
    if !path.exists() {
        return Vec::new();
    }
    match try_load(path) {
        Ok(load) => {
            for err in &load.skipped {
                warn!(path = %path.display(), "Skipping bad JSONL line: {err}");
            }
            load.issues
        }
        Err(e) => {
            warn!(path = %path.display(), "Error reading JSONL file: {e}");
            Vec::new()
        }
    }
}
