//! `abacus` - live dashboard for beads issue trackers
//!
//! Watches registered beads projects (SQLite and/or JSONL stores), serves
//! their issues over a small HTTP API and pushes snapshot updates to
//! browsers over Server-Sent Events. Reading and chain resolution live in
//! the `beads-view` crate.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`config`] - Layered configuration (defaults, `config.yaml`, env, flags)
//! - [`registry`] - Registered projects (`projects.json`)
//! - [`live`] - File watching, debounce/dedup and subscriber fan-out
//! - [`server`] - HTTP API and event stream (axum)
//! - [`format`] - Text and JSON output for CLI commands
//! - [`logging`] - tracing subscriber setup
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod live;
pub mod logging;
pub mod registry;
pub mod server;

pub use error::{AbacusError, Result};

/// Run the CLI application.
///
/// This is the main entry point called from `main()`.
///
/// # Errors
///
/// Returns an error if command execution fails.
pub fn run() -> anyhow::Result<()> {
    cli::run()
}
