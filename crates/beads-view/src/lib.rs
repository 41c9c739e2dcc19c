//! `beads-view` — read-only view over a project's beads stores.
//!
//! A beads project keeps its issues under `.beads/` in one or both of:
//!
//! - `issues.jsonl`, one issue per line (see [`source::jsonl`])
//! - `beads.db`, a SQLite database (see [`source::sqlite`])
//!
//! [`read_issues`] reads both and returns the one that is current.
//! [`chain::resolve`] answers "what blocks / is blocked by this issue"
//! over the result.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::Path;
//!
//! let issues = beads_view::read_issues(Path::new("/work/my-project"));
//! if let Some(chain) = beads_view::chain::resolve(&issues, "bd-1", 3) {
//!     println!("{} ancestors", chain.ancestors.len());
//! }
//! ```

pub mod chain;
pub mod error;
pub mod model;
pub mod source;
pub mod util;

pub use chain::{ChainNode, DependencyChain, Truncation};
pub use error::{Result, ViewError};
pub use model::{Dependency, DependencyType, Issue, IssueType, Priority, Status};
pub use source::{BeadsPaths, SourceKind, read_issues, resolve_sources};
pub use util::snapshot_fingerprint;
