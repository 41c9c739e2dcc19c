//! Projects command implementation.

use crate::cli::ProjectsCommand;
use crate::config::{Config, Overrides};
use crate::error::{AbacusError, Result};
use crate::format::{format_project_line, print_json};
use crate::registry::Registry;

/// Execute a projects subcommand against the configured registry.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the path cannot be
/// registered, the ID is unknown, or the registry cannot be saved.
pub fn execute(command: &ProjectsCommand, overrides: &Overrides, json: bool) -> Result<()> {
    let config = Config::load(overrides)?;
    let mut registry = Registry::load(&config.projects_file());

    match command {
        ProjectsCommand::List => {
            let projects = registry.all();
            if json {
                print_json(&projects)?;
            } else if projects.is_empty() {
                println!("No projects registered.");
            } else {
                for project in projects {
                    println!("{}", format_project_line(project));
                }
            }
        }
        ProjectsCommand::Add { path } => {
            let project = registry.add(path)?;
            if json {
                print_json(&project)?;
            } else {
                println!(
                    "Added project {}: {} ({})",
                    project.id,
                    project.name,
                    project.path.display()
                );
            }
        }
        ProjectsCommand::Remove { id } => {
            if !registry.remove(*id)? {
                return Err(AbacusError::ProjectNotFound { id: *id });
            }
            if json {
                print_json(&serde_json::json!({ "removed": id }))?;
            } else {
                println!("Removed project {id}");
            }
        }
    }

    Ok(())
}
