//! SQLite database source (`.beads/beads.db`).
//!
//! Opened read-only: the beads tool owns the file and may be writing to
//! it (WAL mode) while we read. Labels and dependencies are joined in
//! per issue.

use std::path::Path;
use std::time::Duration;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Row};
use tracing::warn;

use crate::error::{Result, ViewError};
use crate::model::{Dependency, Issue, Priority};
use crate::util::parse_timestamp;

const ISSUES_SQL: &str = r"
    SELECT id, title, description, status, priority,
           issue_type, assignee, created_at, updated_at
    FROM issues
    WHERE status != 'tombstone'
      AND (deleted_at IS NULL OR deleted_at = '')
    ORDER BY priority ASC, created_at DESC
";

const DEPENDENCIES_SQL: &str =
    "SELECT depends_on_id AS target, type FROM dependencies WHERE issue_id = ?";

const LABELS_SQL: &str = "SELECT label FROM labels WHERE issue_id = ?";

/// Open the database without write access or file creation.
///
/// # Errors
///
/// Returns `FileNotFound` if the file is missing, or `Sqlite` if it cannot be opened.
pub fn open_read_only(path: &Path) -> Result<Connection> {
    if !path.exists() {
        return Err(ViewError::FileNotFound(path.to_path_buf()));
    }
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    conn.busy_timeout(Duration::from_millis(1000))?;
    Ok(conn)
}

/// Load all live issues with their labels and dependencies.
///
/// # Errors
///
/// Returns `FileNotFound` if the file is missing, or `Sqlite` on any
/// open or query failure (missing tables included).
pub fn try_load(path: &Path) -> Result<Vec<Issue>> {
    let conn = open_read_only(path)?;

    let mut stmt = conn.prepare(ISSUES_SQL)?;
    let mut issues = stmt
        .query_map([], issue_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut deps_stmt = conn.prepare(DEPENDENCIES_SQL)?;
    let mut labels_stmt = conn.prepare(LABELS_SQL)?;
    for issue in &mut issues {
        issue.dependencies = deps_stmt
            .query_map([&issue.id], |row| {
                let target = text(row, 0)?.unwrap_or_default();
                let dep_type = text(row, 1)?.unwrap_or_default();
                Ok(Dependency {
                    dep_type: dep_type.parse().unwrap_or_default(),
                    target,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        issue.labels = labels_stmt
            .query_map([&issue.id], |row| text(row, 0))?
            .filter_map(|label| label.transpose())
            .collect::<rusqlite::Result<Vec<_>>>()?;
        issue.dedup_labels();
    }

    Ok(issues)
}

/// Read issues from the database, degrading to an empty list.
#[must_use]
pub fn read(path: &Path) -> Vec<Issue> {
    if !path.exists() {
        return Vec::new();
    }
    match try_load(path) {
        Ok(issues) => issues,
        Err(e) => {
            warn!(path = %path.display(), "Error reading beads from SQLite: {e}");
            Vec::new()
        }
    }
}

fn issue_from_row(row: &Row<'_>) -> rusqlite::Result<Issue> {
    let updated_text = text(row, 8)?.filter(|s| !s.trim().is_empty());
    let updated_at = updated_text.as_deref().and_then(parse_timestamp);
    Ok(Issue {
        id: text(row, 0)?.unwrap_or_default(),
        title: text(row, 1)?.unwrap_or_default(),
        description: text(row, 2)?.filter(|s| !s.is_empty()),
        status: text(row, 3)?.unwrap_or_default().parse().unwrap_or_default(),
        priority: row
            .get::<_, Option<i32>>(4)
            .ok()
            .flatten()
            .map_or_else(Priority::default, Priority),
        issue_type: text(row, 5)?.unwrap_or_default().parse().unwrap_or_default(),
        assignee: text(row, 6)?.filter(|s| !s.is_empty()),
        created_at: text(row, 7)?.as_deref().and_then(parse_timestamp),
        unparsed_updated_at: updated_text.filter(|_| updated_at.is_none()),
        updated_at,
        ..Issue::default()
    })
}

/// Column as text, whatever its storage class. SQLite's type affinity
/// does not stop writers from storing numbers in `TEXT` columns.
fn text(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<String>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null => None,
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::{DependencyType, IssueType, Status};
    use std::path::PathBuf;

    const SCHEMA: &str = r"
        CREATE TABLE issues (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT 'open',
            priority INTEGER NOT NULL DEFAULT 2,
            issue_type TEXT NOT NULL DEFAULT 'task',
            assignee TEXT,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            deleted_at DATETIME
        );
        CREATE TABLE dependencies (
            issue_id TEXT NOT NULL,
            depends_on_id TEXT NOT NULL,
            type TEXT NOT NULL DEFAULT 'blocks',
            PRIMARY KEY (issue_id, depends_on_id)
        );
        CREATE TABLE labels (
            issue_id TEXT NOT NULL,
            label TEXT NOT NULL,
            PRIMARY KEY (issue_id, label)
        );
    ";

    /// Create a beads-style database at `path`.
    pub(crate) fn create_db(path: &Path) -> Connection {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        conn
    }

    pub(crate) fn insert_issue(conn: &Connection, id: &str, status: &str, updated_at: &str) {
        conn.execute(
            "INSERT INTO issues (id, title, status, updated_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![id, format!("Title {id}"), status, updated_at],
        )
        .unwrap();
    }

    fn db_path(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("beads.db")
    }

    #[test]
    fn test_load_issues_with_relations() {
        let dir = tempfile::tempdir().unwrap();
        let path = db_path(&dir);
        let conn = create_db(&path);
        insert_issue(&conn, "bd-1", "open", "2024-01-01 10:00:00");
        insert_issue(&conn, "bd-2", "in_progress", "2024-01-02 10:00:00");
        conn.execute(
            "UPDATE issues SET issue_type = 'bug', priority = 0, assignee = 'ann' WHERE id = 'bd-1'",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO dependencies (issue_id, depends_on_id, type) VALUES ('bd-1', 'bd-2', 'blocks')",
            [],
        )
        .unwrap();
        conn.execute("INSERT INTO labels VALUES ('bd-1', 'ui')", [])
            .unwrap();
        drop(conn);

        let issues = try_load(&path).unwrap();
        assert_eq!(issues.len(), 2);

        let first = &issues[0];
        assert_eq!(first.id, "bd-1");
        assert_eq!(first.issue_type, IssueType::Bug);
        assert_eq!(first.priority, Priority::CRITICAL);
        assert_eq!(first.assignee.as_deref(), Some("ann"));
        assert!(first.description.is_none());
        assert_eq!(first.labels, vec!["ui".to_string()]);
        assert_eq!(first.dependencies.len(), 1);
        assert_eq!(first.dependencies[0].target, "bd-2");
        assert_eq!(first.dependencies[0].dep_type, DependencyType::Blocks);
        assert!(first.updated_at.is_some());

        assert_eq!(issues[1].status, Status::InProgress);
    }

    #[test]
    fn test_load_excludes_deleted_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = db_path(&dir);
        let conn = create_db(&path);
        insert_issue(&conn, "bd-1", "open", "2024-01-01 10:00:00");
        insert_issue(&conn, "bd-2", "tombstone", "2024-01-01 10:00:00");
        insert_issue(&conn, "bd-3", "closed", "2024-01-01 10:00:00");
        conn.execute(
            "UPDATE issues SET deleted_at = '2024-02-01 00:00:00' WHERE id = 'bd-3'",
            [],
        )
        .unwrap();
        drop(conn);

        let ids: Vec<String> = try_load(&path).unwrap().into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["bd-1"]);
    }

    #[test]
    fn test_missing_db_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = db_path(&dir);
        assert!(matches!(try_load(&path), Err(ViewError::FileNotFound(_))));
        assert!(read(&path).is_empty());
        assert!(!path.exists(), "read-only open must not create the file");
    }

    #[test]
    fn test_corrupt_db_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = db_path(&dir);
        std::fs::write(&path, b"this is not a database").unwrap();
        assert!(try_load(&path).is_err());
        assert!(read(&path).is_empty());
    }

    #[test]
    fn test_db_without_schema_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = db_path(&dir);
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE unrelated (x INTEGER);")
            .unwrap();
        assert!(read(&path).is_empty());
    }
}
