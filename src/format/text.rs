//! Plain text (non-ANSI) formatting for terminal output:
//! - Status icons (○ ◐ ● ✓ ✗)
//! - Priority labels (P0-P4)
//! - Type badges ([bug], [feature], etc.)
//! - Issue and chain lines

use std::fmt::Write as _;

use beads_view::{ChainNode, DependencyChain, Issue, IssueType, Status};

use crate::registry::Project;

/// Status icon characters.
pub mod icons {
    /// Open issue - available to work (hollow circle).
    pub const OPEN: &str = "○";
    /// In progress - active work (half-filled).
    pub const IN_PROGRESS: &str = "◐";
    /// Blocked - needs attention (filled circle).
    pub const BLOCKED: &str = "●";
    /// Closed - completed (checkmark).
    pub const CLOSED: &str = "✓";
    /// Tombstone - soft deleted (X mark).
    pub const TOMBSTONE: &str = "✗";
    /// Unknown status.
    pub const UNKNOWN: &str = "?";
}

#[must_use]
pub const fn format_status_icon(status: &Status) -> &'static str {
    match status {
        Status::Open => icons::OPEN,
        Status::InProgress => icons::IN_PROGRESS,
        Status::Blocked => icons::BLOCKED,
        Status::Closed => icons::CLOSED,
        Status::Tombstone => icons::TOMBSTONE,
        Status::Custom(_) => icons::UNKNOWN,
    }
}

#[must_use]
pub fn format_type_badge(issue_type: &IssueType) -> String {
    format!("[{}]", issue_type.as_str())
}

/// Format: `{icon} {id} [{priority}] [{type}] {title}`
#[must_use]
pub fn format_issue_line(issue: &Issue) -> String {
    let mut line = format!(
        "{} {} [{}] {} {}",
        format_status_icon(&issue.status),
        issue.id,
        issue.priority,
        format_type_badge(&issue.issue_type),
        issue.title,
    );
    if issue.is_archived() {
        line.push_str(" (archived)");
    }
    line
}

/// Format: `{id:>4}  {name}  {path}`
#[must_use]
pub fn format_project_line(project: &Project) -> String {
    format!(
        "{:>4}  {}  {}",
        project.id,
        project.name,
        project.path.display()
    )
}

fn format_chain_node(node: &ChainNode) -> String {
    format!(
        "{}{} {} [{}] {}",
        "  ".repeat(node.depth),
        format_status_icon(&node.status),
        node.id,
        node.priority,
        node.title,
    )
}

/// Multi-line rendering: ancestors, the root, then descendants, each
/// indented by depth.
#[must_use]
pub fn format_chain(chain: &DependencyChain) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Blocked by ({}):", chain.ancestors.len());
    for node in &chain.ancestors {
        let _ = writeln!(out, "{}", format_chain_node(node));
    }
    if chain.truncated.ancestors {
        out.push_str("  ...\n");
    }

    let _ = writeln!(out, "{}", format_chain_node(&chain.root));

    let _ = writeln!(out, "Blocks ({}):", chain.descendants.len());
    for node in &chain.descendants {
        let _ = writeln!(out, "{}", format_chain_node(node));
    }
    if chain.truncated.descendants {
        out.push_str("  ...\n");
    }

    if chain.has_cycle {
        out.push_str("(cycle detected)\n");
    }
    out
}
