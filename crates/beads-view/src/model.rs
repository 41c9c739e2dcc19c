//! Core data types for beads-view.
//!
//! Same serde field names as the beads JSONL export, so records can be
//! read from either store and re-serialized for dashboard clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Label that hides an issue from the board without deleting it.
pub const ARCHIVED_LABEL: &str = "archived";

/// Issue lifecycle status.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Open,
    InProgress,
    Blocked,
    Closed,
    /// Deletion sentinel. Never part of a snapshot.
    Tombstone,
    #[serde(untagged)]
    Custom(String),
}

impl Status {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Blocked => "blocked",
            Self::Closed => "closed",
            Self::Tombstone => "tombstone",
            Self::Custom(value) => value,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Status {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "open" | "" => Self::Open,
            "in_progress" | "inprogress" => Self::InProgress,
            "blocked" => Self::Blocked,
            "closed" => Self::Closed,
            "tombstone" => Self::Tombstone,
            other => Self::Custom(other.to_string()),
        })
    }
}

/// Issue priority (0=Critical, 4=Backlog).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct Priority(pub i32);

impl Priority {
    pub const CRITICAL: Self = Self(0);
    pub const HIGH: Self = Self(1);
    pub const MEDIUM: Self = Self(2);
    pub const LOW: Self = Self(3);
    pub const BACKLOG: Self = Self(4);
}

impl Default for Priority {
    fn default() -> Self {
        Self::MEDIUM
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Issue type category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    #[default]
    Task,
    Bug,
    Feature,
    Epic,
    Chore,
    #[serde(untagged)]
    Custom(String),
}

impl IssueType {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Task => "task",
            Self::Bug => "bug",
            Self::Feature => "feature",
            Self::Epic => "epic",
            Self::Chore => "chore",
            Self::Custom(value) => value,
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for IssueType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "task" | "" => Self::Task,
            "bug" => Self::Bug,
            "feature" => Self::Feature,
            "epic" => Self::Epic,
            "chore" => Self::Chore,
            other => Self::Custom(other.to_string()),
        })
    }
}

/// Dependency edge type.
///
/// Only `blocks` edges take part in chain traversal; `blocked_by` is the
/// same relation seen from the other endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DependencyType {
    #[default]
    #[serde(rename = "blocks")]
    Blocks,
    #[serde(rename = "blocked_by", alias = "blocked-by")]
    BlockedBy,
    #[serde(untagged)]
    Custom(String),
}

impl DependencyType {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Blocks => "blocks",
            Self::BlockedBy => "blocked_by",
            Self::Custom(value) => value,
        }
    }
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DependencyType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "blocks" | "" => Self::Blocks,
            "blocked_by" | "blocked-by" => Self::BlockedBy,
            other => Self::Custom(other.to_string()),
        })
    }
}

/// A typed edge from the owning issue to `target`.
///
/// JSONL records name the target `depends_on_id`; the database reader
/// selects it as `target`. Both land here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dependency {
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub dep_type: DependencyType,

    #[serde(alias = "depends_on_id")]
    pub target: String,
}

impl Dependency {
    #[must_use]
    pub fn blocks(target: impl Into<String>) -> Self {
        Self {
            dep_type: DependencyType::Blocks,
            target: target.into(),
        }
    }
}

/// The primary issue entity ("bead").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Issue {
    /// Unique ID within the project (e.g., "bd-abc123").
    pub id: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub status: Status,

    #[serde(default, deserialize_with = "null_as_default")]
    pub priority: Priority,

    #[serde(
        rename = "issue_type",
        alias = "type",
        default,
        deserialize_with = "null_as_default"
    )]
    pub issue_type: IssueType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,

    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub labels: Vec<String>,

    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub dependencies: Vec<Dependency>,

    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<DateTime<Utc>>,

    /// Stored `updated_at` text that did not parse as a timestamp.
    #[serde(skip)]
    pub unparsed_updated_at: Option<String>,

    /// Fields this view does not model, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Issue {
    fn default() -> Self {
        Self {
            id: String::new(),
            title: String::new(),
            description: None,
            status: Status::default(),
            priority: Priority::default(),
            issue_type: IssueType::default(),
            assignee: None,
            labels: Vec::new(),
            dependencies: Vec::new(),
            created_at: None,
            updated_at: None,
            unparsed_updated_at: None,
            extra: Map::new(),
        }
    }
}

impl Issue {
    /// Parse one JSONL record, keeping an unparseable `updated_at` as text.
    ///
    /// # Errors
    ///
    /// Returns an error if the line is not a JSON issue object.
    pub fn from_json_line(line: &str) -> serde_json::Result<Self> {
        let value: Value = serde_json::from_str(line)?;
        let raw_updated = value
            .get("updated_at")
            .and_then(Value::as_str)
            .map(str::to_string);
        let mut issue = Self::deserialize(value)?;
        if issue.updated_at.is_none() {
            issue.unparsed_updated_at = raw_updated.filter(|s| !s.trim().is_empty());
        }
        Ok(issue)
    }

    /// `updated_at` as fingerprint text: RFC 3339 when parsed, the stored
    /// text otherwise, empty when absent.
    #[must_use]
    pub fn updated_at_text(&self) -> String {
        self.updated_at.map_or_else(
            || self.unparsed_updated_at.clone().unwrap_or_default(),
            |ts| ts.to_rfc3339(),
        )
    }

    /// True when the record is deleted: tombstone status or a non-empty
    /// `deleted_at`.
    #[must_use]
    pub fn is_tombstoned(&self) -> bool {
        if self.status == Status::Tombstone {
            return true;
        }
        match self.extra.get("deleted_at") {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(_) => true,
        }
    }

    /// True when the issue carries the `archived` label.
    #[must_use]
    pub fn is_archived(&self) -> bool {
        self.labels.iter().any(|l| l == ARCHIVED_LABEL)
    }

    /// Targets of this issue's `blocks` edges, in declaration order.
    pub fn blocks_targets(&self) -> impl Iterator<Item = &str> {
        self.dependencies
            .iter()
            .filter(|d| d.dep_type == DependencyType::Blocks)
            .map(|d| d.target.as_str())
    }

    /// Drop duplicate labels, keeping first-seen order.
    pub fn dedup_labels(&mut self) {
        let mut seen = std::collections::HashSet::new();
        self.labels.retain(|l| seen.insert(l.clone()));
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Text(String),
    Other(serde::de::IgnoredAny),
}

/// An explicit `null` reads as the field's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Timestamps that fail to parse are treated as absent rather than
/// failing the whole record.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<RawTimestamp>::deserialize(deserializer)? {
        Some(RawTimestamp::Text(s)) => crate::util::parse_timestamp(&s),
        Some(RawTimestamp::Other(_)) | None => None,
    })
}
