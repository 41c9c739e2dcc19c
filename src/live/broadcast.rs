//! Fan-out of snapshot events to connected subscribers.
//!
//! Every subscriber gets a bounded queue. A send that fails because the
//! queue is closed or full drops that subscriber and leaves the others
//! alone. Each [`Subscription`] also produces its own keep-alive ticks.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use beads_view::Issue;
use futures_util::Stream;
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, warn};

use super::LiveSettings;

/// Event payloads pushed to subscribers, one JSON object per message.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelEvent<'a> {
    Connected,
    Update {
        project: &'a str,
        name: &'a str,
        issues: &'a [Issue],
    },
}

impl ChannelEvent<'_> {
    fn to_payload(&self) -> serde_json::Result<Arc<str>> {
        serde_json::to_string(self).map(Arc::from)
    }
}

/// What a subscription yields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// A serialized [`ChannelEvent`].
    Data(Arc<str>),
    /// Idle tick; carries no data.
    KeepAlive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

struct HubInner {
    subscribers: Mutex<HashMap<SubscriberId, mpsc::Sender<Arc<str>>>>,
    next_id: AtomicU64,
    keep_alive: Duration,
    capacity: usize,
}

impl HubInner {
    fn subscribers(&self) -> MutexGuard<'_, HashMap<SubscriberId, mpsc::Sender<Arc<str>>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn remove(&self, id: SubscriberId) -> bool {
        let removed = self.subscribers().remove(&id).is_some();
        if removed {
            debug!(subscriber = %id, "Subscriber removed");
        }
        removed
    }
}

/// The set of connected live-update subscribers.
#[derive(Clone)]
pub struct Hub {
    inner: Arc<HubInner>,
}

impl Hub {
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(keep_alive: Duration, capacity: usize) -> Self {
        assert!(capacity > 0, "subscriber capacity must be non-zero");
        Self {
            inner: Arc::new(HubInner {
                subscribers: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                keep_alive,
                capacity,
            }),
        }
    }

    #[must_use]
    pub fn from_settings(settings: &LiveSettings) -> Self {
        Self::new(settings.keep_alive, settings.subscriber_capacity)
    }

    /// Add a subscriber. Its first message is `{"type":"connected"}`.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        let id = SubscriberId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.inner.capacity);

        match ChannelEvent::Connected.to_payload() {
            Ok(payload) => {
                // Fresh queue with capacity >= 1, cannot be full.
                let _ = tx.try_send(payload);
            }
            Err(e) => warn!("Failed to serialize connected event: {e}"),
        }
        self.inner.subscribers().insert(id, tx);
        debug!(subscriber = %id, "Subscriber added");

        let period = self.inner.keep_alive;
        let mut keep_alive = tokio::time::interval_at(Instant::now() + period, period);
        keep_alive.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Subscription {
            id,
            rx,
            keep_alive,
            hub: Arc::downgrade(&self.inner),
        }
    }

    /// Remove a subscriber. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.inner.remove(id)
    }

    /// Drop every subscriber. Their streams end once drained.
    pub fn close_all(&self) {
        let closed = {
            let mut subscribers = self.inner.subscribers();
            let n = subscribers.len();
            subscribers.clear();
            n
        };
        debug!(closed, "Closed all subscribers");
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers().len()
    }

    /// Push an update for `project` to every subscriber.
    ///
    /// Returns how many subscribers accepted it.
    pub fn broadcast(&self, project: &Path, issues: &[Issue]) -> usize {
        let project_str = project.to_string_lossy();
        let name = project
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        let event = ChannelEvent::Update {
            project: &project_str,
            name: &name,
            issues,
        };
        match event.to_payload() {
            Ok(payload) => self.send_payload(&payload),
            Err(e) => {
                warn!(project = %project.display(), "Failed to serialize update: {e}");
                0
            }
        }
    }

    fn send_payload(&self, payload: &Arc<str>) -> usize {
        let mut subscribers = self.inner.subscribers();
        let mut delivered = 0;
        subscribers.retain(|id, tx| match tx.try_send(Arc::clone(payload)) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                debug!(subscriber = %id, "Subscriber queue full, dropping");
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(subscriber = %id, "Subscriber gone, dropping");
                false
            }
        });
        delivered
    }
}

/// One connected subscriber.
///
/// Dropping it unsubscribes immediately and stops its keep-alive timer.
pub struct Subscription {
    id: SubscriberId,
    rx: mpsc::Receiver<Arc<str>>,
    keep_alive: Interval,
    hub: Weak<HubInner>,
}

impl Subscription {
    #[must_use]
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Next message, or `None` once the hub has dropped this subscriber.
    pub async fn next(&mut self) -> Option<Outbound> {
        tokio::select! {
            biased;
            msg = self.rx.recv() => msg.map(Outbound::Data),
            _ = self.keep_alive.tick() => Some(Outbound::KeepAlive),
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = Outbound> + Send {
        futures_util::stream::unfold(self, |mut sub| async move {
            let item = sub.next().await?;
            Some((item, sub))
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.hub.upgrade() {
            inner.remove(self.id);
        }
    }
}
