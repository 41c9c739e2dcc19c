//! Per-project watch state.
//!
//! All state lives in one task that owns the watch subscriptions, pending
//! debounce timers and last-broadcast fingerprints. Watcher threads, timers
//! and API handlers talk to it through a command channel. Store reads run
//! on the blocking pool and report back as commands, so a slow read of one
//! project never holds up another. Results are applied in the order the
//! reads were started; a read that finishes after a newer one is dropped.
//!
//! Log-file events trigger an immediate read. Database events are
//! debounced: each one restarts the project's quiet period, and only the
//! final one leads to a read. Either way a snapshot identical to the last
//! one broadcast for that project is not sent again. An explicit
//! [`WatchCoordinator::notify_changed`] always sends.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use beads_view::{BeadsPaths, Issue, read_issues, snapshot_fingerprint};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::backend::{ChangeHandler, WatchBackend, WatchHandle, WatchStrategy};
use super::broadcast::Hub;
use super::LiveSettings;

enum Command {
    Watch {
        project: PathBuf,
        done: oneshot::Sender<bool>,
    },
    Unwatch {
        project: PathBuf,
        done: oneshot::Sender<()>,
    },
    NotifyChanged {
        project: PathBuf,
    },
    LogChanged {
        project: PathBuf,
    },
    DatabaseChanged {
        project: PathBuf,
    },
    DebounceElapsed {
        project: PathBuf,
        generation: u64,
    },
    Watched {
        reply: oneshot::Sender<Vec<PathBuf>>,
    },
    ReadDone {
        project: PathBuf,
        reason: ReadReason,
        seq: u64,
        issues: Vec<Issue>,
    },
}

/// What a read was started for, which decides how its result is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadReason {
    /// Explicit refresh: always broadcast.
    Requested,
    /// Log file changed: broadcast unless unchanged.
    Log,
    /// Debounced database change: skip empty snapshots, then as `Log`.
    Database,
}

/// Handle to the coordinator task. Cheap to clone.
///
/// The task exits once every handle is dropped, closing all watches.
#[derive(Clone)]
pub struct WatchCoordinator {
    tx: mpsc::UnboundedSender<Command>,
}

impl WatchCoordinator {
    /// Start the coordinator on the current Tokio runtime.
    #[must_use]
    pub fn spawn<B: WatchBackend>(backend: B, hub: Hub, settings: LiveSettings) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let actor = Coordinator {
            backend,
            hub,
            settings,
            tx: tx.downgrade(),
            projects: HashMap::new(),
            fingerprints: HashMap::new(),
            next_generation: 0,
            next_read: 0,
            applied: HashMap::new(),
        };
        tokio::spawn(actor.run(rx));
        Self { tx }
    }

    /// Start watching `project`. Watching an already-watched project is a
    /// no-op.
    ///
    /// Returns `true` if the project is watched afterwards. A project with
    /// neither store, or whose watches all fail to attach, is not.
    pub async fn watch(&self, project: impl Into<PathBuf>) -> bool {
        let (done, rx) = oneshot::channel();
        let project = project.into();
        if self.tx.send(Command::Watch { project, done }).is_err() {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    /// Stop watching `project` and cancel its pending timer. Unknown
    /// projects are ignored.
    pub async fn unwatch(&self, project: impl Into<PathBuf>) {
        let (done, rx) = oneshot::channel();
        let project = project.into();
        if self.tx.send(Command::Unwatch { project, done }).is_ok() {
            let _ = rx.await;
        }
    }

    /// Read `project` now and broadcast the result, even if it is unchanged.
    ///
    /// Fire-and-forget: returns before the read happens.
    pub fn notify_changed(&self, project: impl Into<PathBuf>) {
        let project = project.into();
        let _ = self.tx.send(Command::NotifyChanged { project });
    }

    /// Projects currently watched, sorted.
    pub async fn watched(&self) -> Vec<PathBuf> {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Command::Watched { reply }).is_err() {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }
}

struct PendingRead {
    generation: u64,
    timer: JoinHandle<()>,
}

struct ProjectWatch {
    log: Option<WatchHandle>,
    database: Option<WatchHandle>,
    pending: Option<PendingRead>,
}

impl ProjectWatch {
    fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.timer.abort();
        }
    }
}

struct Coordinator<B> {
    backend: B,
    hub: Hub,
    settings: LiveSettings,
    tx: mpsc::WeakUnboundedSender<Command>,
    projects: HashMap<PathBuf, ProjectWatch>,
    fingerprints: HashMap<PathBuf, String>,
    next_generation: u64,
    next_read: u64,
    /// Sequence number of the newest read applied per project.
    applied: HashMap<PathBuf, u64>,
}

impl<B: WatchBackend> Coordinator<B> {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        debug!("Watch coordinator started");
        while let Some(command) = rx.recv().await {
            match command {
                Command::Watch { project, done } => {
                    let _ = done.send(self.watch(project));
                }
                Command::Unwatch { project, done } => {
                    self.unwatch(&project);
                    let _ = done.send(());
                }
                Command::NotifyChanged { project } => {
                    self.start_read(project, ReadReason::Requested);
                }
                Command::LogChanged { project } => self.log_changed(project),
                Command::DatabaseChanged { project } => self.database_changed(project),
                Command::DebounceElapsed {
                    project,
                    generation,
                } => self.debounce_elapsed(project, generation),
                Command::Watched { reply } => {
                    let mut watched: Vec<PathBuf> = self.projects.keys().cloned().collect();
                    watched.sort();
                    let _ = reply.send(watched);
                }
                Command::ReadDone {
                    project,
                    reason,
                    seq,
                    issues,
                } => self.read_done(project, reason, seq, &issues),
            }
        }
        for (_, mut watch) in self.projects.drain() {
            watch.cancel_pending();
        }
        debug!("Watch coordinator stopped");
    }

    fn watch(&mut self, project: PathBuf) -> bool {
        if self.projects.contains_key(&project) {
            debug!(project = %project.display(), "Already watching");
            return true;
        }

        let paths = BeadsPaths::new(&project);
        let log = if paths.jsonl.exists() {
            let handler = self.handler(&project, |project| Command::LogChanged { project });
            self.attach(
                &project,
                "log",
                &[paths.jsonl.clone()],
                WatchStrategy::Native,
                handler,
            )
        } else {
            None
        };
        let database = if paths.db.exists() {
            let handler = self.handler(&project, |project| Command::DatabaseChanged { project });
            self.attach(
                &project,
                "database",
                &paths.db_file_set(),
                WatchStrategy::Poll(self.settings.poll_interval),
                handler,
            )
        } else {
            None
        };

        if log.is_none() && database.is_none() {
            warn!(project = %project.display(), "Nothing to watch");
            return false;
        }

        // Reads started before this watch must not fill the new baseline.
        self.applied.insert(project.clone(), self.next_read);
        info!(
            project = %project.display(),
            log = log.is_some(),
            database = database.is_some(),
            "Watching project"
        );
        self.projects.insert(
            project,
            ProjectWatch {
                log,
                database,
                pending: None,
            },
        );
        true
    }

    fn attach(
        &self,
        project: &Path,
        store: &str,
        files: &[PathBuf],
        strategy: WatchStrategy,
        handler: ChangeHandler,
    ) -> Option<WatchHandle> {
        match self.backend.watch(files, strategy, handler) {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(project = %project.display(), store, "Failed to watch: {e}");
                None
            }
        }
    }

    /// Handler that forwards file events for `project` into the command
    /// channel as `make(project)`.
    fn handler(&self, project: &Path, make: fn(PathBuf) -> Command) -> ChangeHandler {
        let tx = self.tx.clone();
        let project = project.to_path_buf();
        Arc::new(move |changed: &Path| {
            debug!(file = %changed.display(), "Change detected");
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(make(project.clone()));
            }
        })
    }

    fn unwatch(&mut self, project: &Path) {
        self.fingerprints.remove(project);
        self.applied.remove(project);
        let Some(mut watch) = self.projects.remove(project) else {
            return;
        };
        watch.cancel_pending();
        if let Some(handle) = watch.log.take() {
            handle.close();
        }
        if let Some(handle) = watch.database.take() {
            handle.close();
        }
        info!(project = %project.display(), "Stopped watching project");
    }

    fn log_changed(&mut self, project: PathBuf) {
        if self.projects.contains_key(&project) {
            self.start_read(project, ReadReason::Log);
        }
    }

    fn database_changed(&mut self, project: PathBuf) {
        let Some(watch) = self.projects.get_mut(&project) else {
            return;
        };
        watch.cancel_pending();

        self.next_generation += 1;
        let generation = self.next_generation;
        let delay = self.settings.debounce;
        let tx = self.tx.clone();
        let target = project.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(Command::DebounceElapsed {
                    project: target,
                    generation,
                });
            }
        });
        watch.pending = Some(PendingRead { generation, timer });
    }

    fn debounce_elapsed(&mut self, project: PathBuf, generation: u64) {
        let Some(watch) = self.projects.get_mut(&project) else {
            return;
        };
        if watch
            .pending
            .as_ref()
            .is_none_or(|p| p.generation != generation)
        {
            // Superseded by a later event.
            return;
        }
        watch.pending = None;
        self.start_read(project, ReadReason::Database);
    }

    fn start_read(&mut self, project: PathBuf, reason: ReadReason) {
        self.next_read += 1;
        let seq = self.next_read;
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let Some(issues) = read(&project).await else {
                return;
            };
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(Command::ReadDone {
                    project,
                    reason,
                    seq,
                    issues,
                });
            }
        });
    }

    fn read_done(&mut self, project: PathBuf, reason: ReadReason, seq: u64, issues: &[Issue]) {
        if self.applied.get(&project).is_some_and(|&last| last >= seq) {
            if reason == ReadReason::Requested {
                // Overtaken by a newer read that may not have been sent.
                self.start_read(project, reason);
            } else {
                debug!(project = %project.display(), seq, "Stale read, discarding");
            }
            return;
        }

        match reason {
            ReadReason::Requested => {
                self.applied.insert(project.clone(), seq);
                self.fingerprints
                    .insert(project.clone(), snapshot_fingerprint(issues));
                let delivered = self.hub.broadcast(&project, issues);
                info!(
                    project = %project.display(),
                    issues = issues.len(),
                    delivered,
                    "Broadcast on request"
                );
            }
            ReadReason::Log | ReadReason::Database => {
                if !self.projects.contains_key(&project) {
                    return;
                }
                self.applied.insert(project.clone(), seq);
                if reason == ReadReason::Database && issues.is_empty() {
                    debug!(project = %project.display(), "Empty snapshot after database change, skipping");
                    return;
                }
                self.broadcast_if_changed(&project, issues);
            }
        }
    }

    fn broadcast_if_changed(&mut self, project: &Path, issues: &[Issue]) -> bool {
        let fingerprint = snapshot_fingerprint(issues);
        if self.fingerprints.get(project) == Some(&fingerprint) {
            debug!(project = %project.display(), "Snapshot unchanged, skipping");
            return false;
        }
        self.fingerprints.insert(project.to_path_buf(), fingerprint);
        let delivered = self.hub.broadcast(project, issues);
        info!(
            project = %project.display(),
            issues = issues.len(),
            delivered,
            "Broadcast update"
        );
        true
    }
}

async fn read(project: &Path) -> Option<Vec<Issue>> {
    let project = project.to_path_buf();
    match tokio::task::spawn_blocking(move || read_issues(&project)).await {
        Ok(issues) => Some(issues),
        Err(e) => {
            warn!("Issue read task failed: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AbacusError;
    use crate::live::broadcast::Subscription;
    use crate::live::{NotifyBackend, Outbound};
    use std::fs;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::{Instant, sleep, timeout};

    const DEBOUNCE: Duration = Duration::from_millis(50);
    const QUIET: Duration = Duration::from_millis(250);

    struct Registration {
        files: Vec<PathBuf>,
        strategy: WatchStrategy,
        handler: ChangeHandler,
        active: Arc<AtomicBool>,
    }

    struct ActiveGuard(Arc<AtomicBool>);

    impl Drop for ActiveGuard {
        fn drop(&mut self) {
            self.0.store(false, Ordering::SeqCst);
        }
    }

    /// Records subscriptions and lets tests fire them by hand.
    #[derive(Clone, Default)]
    struct FakeBackend {
        registrations: Arc<Mutex<Vec<Registration>>>,
        fail_containing: Option<&'static str>,
    }

    impl FakeBackend {
        fn count(&self) -> usize {
            self.registrations.lock().unwrap().len()
        }

        fn fire(&self, project: &Path, strategy_is_poll: bool) {
            let handlers: Vec<(ChangeHandler, PathBuf)> = self
                .registrations
                .lock()
                .unwrap()
                .iter()
                .filter(|r| {
                    r.active.load(Ordering::SeqCst)
                        && r.files[0].starts_with(project)
                        && matches!(r.strategy, WatchStrategy::Poll(_)) == strategy_is_poll
                })
                .map(|r| (Arc::clone(&r.handler), r.files[0].clone()))
                .collect();
            for (handler, file) in handlers {
                handler(&file);
            }
        }

        fn fire_log(&self, project: &Path) {
            self.fire(project, false);
        }

        fn fire_db(&self, project: &Path) {
            self.fire(project, true);
        }

        fn all_inactive(&self, project: &Path) -> bool {
            self.registrations
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.files[0].starts_with(project))
                .all(|r| !r.active.load(Ordering::SeqCst))
        }
    }

    impl WatchBackend for FakeBackend {
        fn watch(
            &self,
            files: &[PathBuf],
            strategy: WatchStrategy,
            on_change: ChangeHandler,
        ) -> crate::error::Result<WatchHandle> {
            if let Some(needle) = self.fail_containing {
                if files[0].to_string_lossy().contains(needle) {
                    return Err(AbacusError::Config("refused".to_string()));
                }
            }
            let active = Arc::new(AtomicBool::new(true));
            self.registrations.lock().unwrap().push(Registration {
                files: files.to_vec(),
                strategy,
                handler: on_change,
                active: Arc::clone(&active),
            });
            Ok(WatchHandle::new(ActiveGuard(active)))
        }
    }

    fn settings() -> LiveSettings {
        LiveSettings {
            debounce: DEBOUNCE,
            poll_interval: Duration::from_millis(10),
            keep_alive: Duration::from_secs(3600),
            subscriber_capacity: 64,
        }
    }

    fn issue_line(id: &str, updated_at: &str) -> String {
        format!(
            r#"{{"id":"{id}","title":"Issue {id}","status":"open","priority":2,"issue_type":"task","updated_at":"{updated_at}"}}"#
        )
    }

    /// Project with a JSONL log and a placeholder database file.
    fn project(root: &Path, name: &str, lines: &[String]) -> PathBuf {
        let dir = root.join(name);
        fs::create_dir_all(dir.join(".beads")).unwrap();
        write_log(&dir, lines);
        fs::write(dir.join(".beads/beads.db"), b"").unwrap();
        dir
    }

    fn write_log(project: &Path, lines: &[String]) {
        let mut content = lines.join("\n");
        content.push('\n');
        fs::write(project.join(".beads/issues.jsonl"), content).unwrap();
    }

    fn start(backend: &FakeBackend) -> (WatchCoordinator, Hub, Subscription) {
        let hub = Hub::from_settings(&settings());
        let coordinator = WatchCoordinator::spawn(backend.clone(), hub.clone(), settings());
        let sub = hub.subscribe();
        (coordinator, hub, sub)
    }

    /// Next update event, skipping connected and keep-alive messages.
    async fn next_update(sub: &mut Subscription, within: Duration) -> Option<serde_json::Value> {
        let deadline = Instant::now() + within;
        loop {
            let msg = timeout(deadline.saturating_duration_since(Instant::now()), sub.next())
                .await
                .ok()??;
            if let Outbound::Data(payload) = msg {
                let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
                if value["type"] == "update" {
                    return Some(value);
                }
            }
        }
    }

    #[tokio::test]
    async fn test_watch_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = project(tmp.path(), "alpha", &[issue_line("bd-1", "2024-01-01T00:00:00Z")]);
        let backend = FakeBackend::default();
        let (coordinator, _hub, _sub) = start(&backend);

        assert!(coordinator.watch(&dir).await);
        assert!(coordinator.watch(&dir).await);
        assert_eq!(backend.count(), 2);
        assert_eq!(coordinator.watched().await, vec![dir]);
    }

    #[tokio::test]
    async fn test_log_store_uses_native_and_database_polls() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = project(tmp.path(), "alpha", &[issue_line("bd-1", "2024-01-01T00:00:00Z")]);
        let backend = FakeBackend::default();
        let (coordinator, _hub, _sub) = start(&backend);
        assert!(coordinator.watch(&dir).await);

        let regs = backend.registrations.lock().unwrap();
        let log = regs
            .iter()
            .find(|r| r.strategy == WatchStrategy::Native)
            .unwrap();
        assert_eq!(log.files, vec![dir.join(".beads/issues.jsonl")]);
        let db = regs
            .iter()
            .find(|r| matches!(r.strategy, WatchStrategy::Poll(_)))
            .unwrap();
        assert_eq!(db.files.len(), 3);
        assert_eq!(db.files[0], dir.join(".beads/beads.db"));
    }

    #[tokio::test]
    async fn test_project_without_stores_not_watched() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = FakeBackend::default();
        let (coordinator, _hub, _sub) = start(&backend);

        assert!(!coordinator.watch(tmp.path()).await);
        assert!(coordinator.watched().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_watch_does_not_affect_other_projects() {
        let tmp = tempfile::tempdir().unwrap();
        let bad = project(tmp.path(), "refuse-me", &[issue_line("bd-1", "2024-01-01T00:00:00Z")]);
        let good = project(tmp.path(), "good", &[issue_line("bd-2", "2024-01-01T00:00:00Z")]);
        let backend = FakeBackend {
            fail_containing: Some("refuse-me"),
            ..Default::default()
        };
        let (coordinator, _hub, mut sub) = start(&backend);

        assert!(!coordinator.watch(&bad).await);
        assert!(coordinator.watch(&good).await);
        assert_eq!(coordinator.watched().await, vec![good.clone()]);

        backend.fire_log(&good);
        let update = next_update(&mut sub, QUIET).await.unwrap();
        assert_eq!(update["name"], "good");
    }

    #[tokio::test]
    async fn test_database_burst_collapses_to_one_read() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = project(tmp.path(), "alpha", &[issue_line("bd-1", "2024-01-01T00:00:00Z")]);
        let backend = FakeBackend::default();
        let (coordinator, _hub, mut sub) = start(&backend);
        assert!(coordinator.watch(&dir).await);

        for _ in 0..5 {
            backend.fire_db(&dir);
            sleep(Duration::from_millis(10)).await;
        }
        let last_event = Instant::now();

        let update = next_update(&mut sub, QUIET * 2).await.unwrap();
        assert!(last_event.elapsed() >= DEBOUNCE - Duration::from_millis(10));
        assert_eq!(update["issues"][0]["id"], "bd-1");
        assert!(next_update(&mut sub, QUIET).await.is_none());
    }

    #[tokio::test]
    async fn test_unchanged_snapshot_not_rebroadcast() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = project(tmp.path(), "alpha", &[issue_line("bd-1", "2024-01-01T00:00:00Z")]);
        let backend = FakeBackend::default();
        let (coordinator, _hub, mut sub) = start(&backend);
        assert!(coordinator.watch(&dir).await);

        backend.fire_log(&dir);
        assert!(next_update(&mut sub, QUIET).await.is_some());

        backend.fire_log(&dir);
        assert!(next_update(&mut sub, QUIET).await.is_none());

        write_log(&dir, &[issue_line("bd-1", "2024-01-02T00:00:00Z")]);
        backend.fire_log(&dir);
        let update = next_update(&mut sub, QUIET).await.unwrap();
        assert_eq!(update["issues"][0]["updated_at"], "2024-01-02T00:00:00Z");
    }

    #[tokio::test]
    async fn test_notify_changed_always_broadcasts() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = project(tmp.path(), "alpha", &[issue_line("bd-1", "2024-01-01T00:00:00Z")]);
        let backend = FakeBackend::default();
        let (coordinator, _hub, mut sub) = start(&backend);
        assert!(coordinator.watch(&dir).await);

        coordinator.notify_changed(&dir);
        assert!(next_update(&mut sub, QUIET).await.is_some());
        coordinator.notify_changed(&dir);
        assert!(next_update(&mut sub, QUIET).await.is_some());

        // The forced send also counts as the last broadcast.
        backend.fire_log(&dir);
        assert!(next_update(&mut sub, QUIET).await.is_none());
    }

    #[tokio::test]
    async fn test_notify_changed_for_unwatched_project() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = project(tmp.path(), "alpha", &[issue_line("bd-1", "2024-01-01T00:00:00Z")]);
        let backend = FakeBackend::default();
        let (coordinator, _hub, mut sub) = start(&backend);

        coordinator.notify_changed(&dir);
        let update = next_update(&mut sub, QUIET).await.unwrap();
        assert_eq!(update["project"], dir.to_string_lossy().into_owned());
    }

    #[tokio::test]
    async fn test_unwatch_closes_and_cancels_pending() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = project(tmp.path(), "alpha", &[issue_line("bd-1", "2024-01-01T00:00:00Z")]);
        let backend = FakeBackend::default();
        let (coordinator, _hub, mut sub) = start(&backend);
        assert!(coordinator.watch(&dir).await);

        backend.fire_db(&dir);
        coordinator.unwatch(&dir).await;
        assert!(backend.all_inactive(&dir));
        assert!(coordinator.watched().await.is_empty());
        assert!(next_update(&mut sub, QUIET).await.is_none());

        // Unknown projects are a no-op.
        coordinator.unwatch(tmp.path().join("missing")).await;
    }

    #[tokio::test]
    async fn test_empty_database_snapshot_not_broadcast() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = project(tmp.path(), "alpha", &[]);
        fs::write(dir.join(".beads/issues.jsonl"), b"").unwrap();
        let backend = FakeBackend::default();
        let (coordinator, _hub, mut sub) = start(&backend);
        assert!(coordinator.watch(&dir).await);

        backend.fire_db(&dir);
        assert!(next_update(&mut sub, QUIET).await.is_none());

        // The log path does send an empty snapshot.
        backend.fire_log(&dir);
        let update = next_update(&mut sub, QUIET).await.unwrap();
        assert_eq!(update["issues"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_slow_read_does_not_block_other_projects() {
        let tmp = tempfile::tempdir().unwrap();
        let locked = tmp.path().join("locked");
        fs::create_dir_all(locked.join(".beads")).unwrap();
        let conn = rusqlite::Connection::open(locked.join(".beads/beads.db")).unwrap();
        conn.execute_batch("CREATE TABLE issues (id TEXT); BEGIN EXCLUSIVE;")
            .unwrap();
        let other = project(tmp.path(), "other", &[issue_line("bd-1", "2024-01-01T00:00:00Z")]);
        let backend = FakeBackend::default();
        let (coordinator, _hub, mut sub) = start(&backend);

        // This read waits out the database busy timeout.
        coordinator.notify_changed(&locked);
        sleep(Duration::from_millis(20)).await;

        let started = Instant::now();
        assert!(coordinator.watch(&other).await);
        backend.fire_log(&other);
        let update = next_update(&mut sub, QUIET).await.unwrap();
        assert_eq!(update["name"], "other");
        assert!(started.elapsed() < Duration::from_millis(500));

        conn.execute_batch("COMMIT;").unwrap();
        let update = next_update(&mut sub, Duration::from_secs(5)).await.unwrap();
        assert_eq!(update["name"], "locked");
    }

    #[tokio::test]
    async fn test_log_edit_seen_by_notify_backend() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = project(tmp.path(), "alpha", &[issue_line("bd-1", "2024-01-01T00:00:00Z")]);
        let hub = Hub::from_settings(&settings());
        let coordinator = WatchCoordinator::spawn(NotifyBackend, hub.clone(), settings());
        let mut sub = hub.subscribe();
        assert!(coordinator.watch(&dir).await);
        sleep(Duration::from_millis(100)).await;

        write_log(&dir, &[issue_line("bd-1", "2024-01-02T00:00:00Z")]);

        // A read can land between truncate and write, so wait for the new content.
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let update = next_update(&mut sub, deadline.saturating_duration_since(Instant::now()))
                .await
                .expect("log edit was not broadcast");
            if update["issues"][0]["updated_at"] == "2024-01-02T00:00:00Z" {
                assert_eq!(update["name"], "alpha");
                break;
            }
        }
    }

    #[tokio::test]
    async fn test_rewatch_after_unwatch_resets_dedup() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = project(tmp.path(), "alpha", &[issue_line("bd-1", "2024-01-01T00:00:00Z")]);
        let backend = FakeBackend::default();
        let (coordinator, _hub, mut sub) = start(&backend);

        assert!(coordinator.watch(&dir).await);
        backend.fire_log(&dir);
        assert!(next_update(&mut sub, QUIET).await.is_some());

        coordinator.unwatch(&dir).await;
        assert!(coordinator.watch(&dir).await);
        backend.fire_log(&dir);
        assert!(next_update(&mut sub, QUIET).await.is_some());
    }
}
