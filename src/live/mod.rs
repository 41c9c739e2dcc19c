//! Live updates: file watching, debouncing and fan-out.
//!
//! ```text
//! notify thread ──► WatchCoordinator task ──► read_issues ──► Hub ──► SSE clients
//! ```
//!
//! - [`backend`] - file watch subscriptions (`notify`)
//! - [`coordinator`] - per-project watch state, debounce, dedup
//! - [`broadcast`] - connected subscribers and keep-alives

pub mod backend;
pub mod broadcast;
pub mod coordinator;

use std::time::Duration;

pub use backend::{ChangeHandler, NotifyBackend, WatchBackend, WatchHandle, WatchStrategy};
pub use broadcast::{ChannelEvent, Hub, Outbound, SubscriberId, Subscription};
pub use coordinator::WatchCoordinator;

/// Timing and sizing knobs for the live pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveSettings {
    /// Quiet period after the last database event before reading.
    pub debounce: Duration,
    /// Poll period for the database file set.
    pub poll_interval: Duration,
    /// Interval between keep-alive comments on idle subscriptions.
    pub keep_alive: Duration,
    /// Queued messages per subscriber before it is dropped as stalled.
    pub subscriber_capacity: usize,
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            poll_interval: Duration::from_millis(500),
            keep_alive: Duration::from_secs(30),
            subscriber_capacity: 64,
        }
    }
}
