//! Output formatting for `abacus`.
//!
//! Commands print either human-readable text or, with `--json`, the same
//! shapes the HTTP API returns.

mod text;

pub use text::{
    format_chain, format_issue_line, format_project_line, format_status_icon, format_type_badge,
};

use serde::Serialize;

use crate::error::Result;

/// Print `value` as pretty JSON on stdout.
///
/// # Errors
///
/// Returns `Json` if serialization fails.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let output = serde_json::to_string_pretty(value)?;
    println!("{output}");
    Ok(())
}
