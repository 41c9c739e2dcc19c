//! Chain command implementation.

use beads_view::{BeadsPaths, chain, read_issues};

use crate::cli::ChainArgs;
use crate::error::{AbacusError, Result};
use crate::format::{format_chain, print_json};

/// Execute the chain command.
///
/// # Errors
///
/// Returns `IssueNotFound` if the issue is not in the project's current
/// snapshot, or `NotBeadsProject` if the path has no beads store.
pub fn execute(args: &ChainArgs, json: bool) -> Result<()> {
    if !BeadsPaths::new(&args.path).is_beads_project() {
        return Err(AbacusError::NotBeadsProject(args.path.clone()));
    }

    let issues = read_issues(&args.path);
    let chain = chain::resolve(&issues, &args.id, args.max_depth).ok_or_else(|| {
        AbacusError::IssueNotFound {
            id: args.id.clone(),
        }
    })?;

    if json {
        print_json(&chain)?;
    } else {
        print!("{}", format_chain(&chain));
    }
    Ok(())
}
