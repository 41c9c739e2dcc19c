//! Command-line interface for `abacus`.
//!
//! This module provides the CLI parsing and command routing using clap.

pub mod commands;

use std::path::PathBuf;

use anyhow::Result;
use beads_view::chain::DEFAULT_MAX_DEPTH;
use clap::{Args, Parser, Subcommand};

use crate::config::Overrides;
use crate::logging::{self, LogFormat};

/// `abacus` - live dashboard for beads issue trackers.
#[derive(Parser, Debug)]
#[command(name = "abacus")]
#[command(
    author,
    version,
    about = "Live dashboard for beads issue trackers (SQLite + JSONL)",
    long_about = None,
    args_conflicts_with_subcommands = true,
    after_help = "Read-only: never writes to the beads stores it watches."
)]
pub struct Cli {
    /// Output format: text (default) or json
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log line format
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Directory holding config.yaml and projects.json (default: ~/.abacus)
    #[arg(long, global = true, env = "ABACUS_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    /// Server options when no command is given
    #[command(flatten)]
    pub serve: ServeArgs,

    /// The command to run (default: serve)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the dashboard server
    Serve(ServeArgs),

    /// Manage registered projects
    #[command(subcommand)]
    Projects(ProjectsCommand),

    /// Print the current issue snapshot of a project
    Issues(IssuesArgs),

    /// Print the dependency chain around one issue
    Chain(ChainArgs),

    /// Show version information
    Version,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Address to bind
    #[arg(long, env = "ABACUS_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,
}

#[derive(Subcommand, Debug)]
pub enum ProjectsCommand {
    /// List registered projects
    List,

    /// Register a project directory
    Add {
        /// Directory containing `.beads/`
        path: PathBuf,
    },

    /// Unregister a project
    Remove {
        /// Project ID (see `projects list`)
        id: u64,
    },
}

#[derive(Args, Debug)]
pub struct IssuesArgs {
    /// Project directory
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

#[derive(Args, Debug)]
pub struct ChainArgs {
    /// Project directory
    pub path: PathBuf,

    /// Issue ID at the center of the chain
    pub id: String,

    /// Levels to walk in each direction
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,
}

impl Cli {
    fn overrides(&self, serve: &ServeArgs) -> Overrides {
        Overrides {
            host: serve.host.clone(),
            port: serve.port,
            config_dir: self.config_dir.clone(),
        }
    }
}

/// Run the CLI.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose, cli.quiet, cli.log_format)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;

    match &cli.command {
        None => commands::serve::execute(&cli.overrides(&cli.serve))?,
        Some(Commands::Serve(args)) => commands::serve::execute(&cli.overrides(args))?,
        Some(Commands::Projects(command)) => {
            commands::projects::execute(command, &cli.overrides(&ServeArgs::default()), cli.json)?;
        }
        Some(Commands::Issues(args)) => commands::issues::execute(args, cli.json)?,
        Some(Commands::Chain(args)) => commands::chain::execute(args, cli.json)?,
        Some(Commands::Version) => commands::version::execute(cli.json)?,
    }

    Ok(())
}
