//! Serve command implementation.

use tracing::debug;

use crate::config::{Config, Overrides};
use crate::error::Result;
use crate::server;

/// Execute the serve command. Blocks until Ctrl-C.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the server cannot start.
pub fn execute(overrides: &Overrides) -> Result<()> {
    let config = Config::load(overrides)?;
    debug!(?config, "Resolved configuration");
    server::run(config)
}
