//! Issues command implementation.

use beads_view::BeadsPaths;
use beads_view::source::read_resolved;

use crate::cli::IssuesArgs;
use crate::error::{AbacusError, Result};
use crate::format::{format_issue_line, print_json};

/// Execute the issues command.
///
/// # Errors
///
/// Returns an error if the path is not a beads project.
pub fn execute(args: &IssuesArgs, json: bool) -> Result<()> {
    if !args.path.exists() {
        return Err(AbacusError::PathNotFound(args.path.clone()));
    }
    if !BeadsPaths::new(&args.path).is_beads_project() {
        return Err(AbacusError::NotBeadsProject(args.path.clone()));
    }

    let (source, issues) = read_resolved(&args.path);

    if json {
        print_json(&issues)?;
    } else if issues.is_empty() {
        println!("No issues found.");
    } else {
        for issue in &issues {
            println!("{}", format_issue_line(issue));
        }
        println!("\n{} issue(s) from {source:?}", issues.len());
    }

    Ok(())
}
