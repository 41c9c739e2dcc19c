//! File watch subscriptions.
//!
//! The coordinator only needs "call me when one of these files changes";
//! [`WatchBackend`] is that seam. [`NotifyBackend`] implements it with
//! `notify`, and tests substitute a recording fake.

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Event, EventKind, PollWatcher, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, trace, warn};

use crate::error::{AbacusError, Result};

/// Invoked from the watcher thread with the path that changed.
pub type ChangeHandler = Arc<dyn Fn(&Path) + Send + Sync + 'static>;

/// How a set of files is observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchStrategy {
    /// OS change notifications.
    Native,
    /// Metadata polling at a fixed period. Used for SQLite files, whose
    /// in-place page writes are not reliably reported by every platform.
    Poll(Duration),
}

/// An active subscription. Dropping it stops delivery.
pub struct WatchHandle {
    _guard: Box<dyn Send>,
}

impl WatchHandle {
    pub fn new<G: Send + 'static>(guard: G) -> Self {
        Self {
            _guard: Box::new(guard),
        }
    }

    /// Stop watching.
    pub fn close(self) {
        drop(self);
    }
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("WatchHandle")
    }
}

/// Source of file change notifications.
pub trait WatchBackend: Send + 'static {
    /// Call `on_change` whenever any of `files` is modified or replaced.
    ///
    /// Files that do not exist yet are picked up once they appear.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription cannot be established.
    fn watch(
        &self,
        files: &[PathBuf],
        strategy: WatchStrategy,
        on_change: ChangeHandler,
    ) -> Result<WatchHandle>;
}

/// [`WatchBackend`] backed by `notify`.
///
/// The parent directories of the requested files are watched rather than
/// the files themselves, so writers that replace a file by rename are
/// still observed.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotifyBackend;

impl WatchBackend for NotifyBackend {
    fn watch(
        &self,
        files: &[PathBuf],
        strategy: WatchStrategy,
        on_change: ChangeHandler,
    ) -> Result<WatchHandle> {
        let names: HashSet<OsString> = files
            .iter()
            .filter_map(|f| f.file_name().map(OsString::from))
            .collect();
        let dirs: HashSet<&Path> = files.iter().filter_map(|f| f.parent()).collect();
        if dirs.is_empty() {
            return Err(AbacusError::Config("no files to watch".to_string()));
        }

        let handler = move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if !is_content_change(&event.kind) {
                    return;
                }
                for path in &event.paths {
                    if path.file_name().is_some_and(|n| names.contains(n)) {
                        trace!(path = %path.display(), kind = ?event.kind, "File changed");
                        on_change(path);
                        break;
                    }
                }
            }
            Err(e) => warn!("Watch error: {e}"),
        };

        match strategy {
            WatchStrategy::Native => {
                let mut watcher: RecommendedWatcher = notify::recommended_watcher(handler)?;
                for dir in &dirs {
                    watcher.watch(dir, RecursiveMode::NonRecursive)?;
                    debug!(dir = %dir.display(), "Native watch attached");
                }
                Ok(WatchHandle::new(watcher))
            }
            WatchStrategy::Poll(interval) => {
                let config = notify::Config::default().with_poll_interval(interval);
                let mut watcher = PollWatcher::new(handler, config)?;
                for dir in &dirs {
                    watcher.watch(dir, RecursiveMode::NonRecursive)?;
                    debug!(dir = %dir.display(), ?interval, "Poll watch attached");
                }
                Ok(WatchHandle::new(watcher))
            }
        }
    }
}

fn is_content_change(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Modify(_))
}
