use std::collections::BTreeMap;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::debug;
use tracing::info;
use tracing::info_span;
use tracing::warn;
use tracing::Instrument;

use super::watcher::Watcher;
use crate::Connectivity;
use crate::ConnectivityState;
use crate::RegistryConfig;
use crate::RegistryError;
use crate::Result;

/// Record kept for every live registration
pub(super) struct ConnectionEntry<C> {
    /// Registration id, distinguishes re-registrations under the same name
    pub(super) id: u64,
    pub(super) handle: Arc<C>,
    /// Last state observed by the watcher
    pub(super) state: ConnectivityState,
    pub(super) cancel: CancellationToken,
    /// None only while the record is being set up
    pub(super) task: Option<JoinHandle<()>>,
}

pub(super) struct RegistryInner<C> {
    pub(super) entries: DashMap<String, ConnectionEntry<C>>,

    /// Next registration id (monotonically increasing)
    next_id: AtomicU64,

    /// Tracks every watcher, including those of removed entries
    tracker: TaskTracker,

    /// Abort handle of every live watcher by registration id, removed
    /// entries included. A watcher drops its own handle when it exits.
    pub(super) watchers: DashMap<u64, AbortHandle>,

    /// Parent of every watcher's cancel token
    shutdown: CancellationToken,

    config: RegistryConfig,
}

impl<C> Drop for RegistryInner<C> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl<C> std::fmt::Debug for RegistryInner<C> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("RegistryInner")
            .field("connections", &self.entries.len())
            .field("next_id", &self.next_id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Concurrent registry of named connections, one watcher task per entry
///
/// # Thread Safety
///
/// All methods are thread-safe. `register` and `remove` are synchronous and
/// only hold a map shard lock for the duration of the access; the watchers'
/// blocking waits happen outside of any lock.
///
/// `register` spawns onto the current Tokio runtime. Called from a thread
/// without one it returns [`RegistryError::NoRuntime`] and leaves the registry
/// untouched.
///
/// # Example
///
/// ```ignore
/// let registry = ConnectionRegistry::new(RegistryConfig::default());
/// let cell = Arc::new(ConnectivityCell::new(ConnectivityState::Idle));
///
/// registry.register("db1", cell.clone())?;
/// cell.set_state(ConnectivityState::Ready); // logged by the watcher
///
/// registry.remove("db1");
/// registry.shutdown().await?;
/// ```
#[derive(Debug)]
pub struct ConnectionRegistry<C: Connectivity> {
    inner: Arc<RegistryInner<C>>,
}

impl<C: Connectivity> Clone for ConnectionRegistry<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Connectivity> Default for ConnectionRegistry<C> {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl<C: Connectivity> ConnectionRegistry<C> {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                entries: DashMap::new(),
                next_id: AtomicU64::new(1),
                tracker: TaskTracker::new(),
                watchers: DashMap::new(),
                shutdown: CancellationToken::new(),
                config,
            }),
        }
    }

    /// Registers `handle` under `name` and starts its watcher.
    ///
    /// The existence check and the insert are a single atomic operation on the
    /// map entry: of several concurrent registrations of one name exactly one
    /// succeeds and the others get [`RegistryError::AlreadyExists`].
    ///
    /// On success the current state of `handle` is recorded before the watcher
    /// can observe the entry, and a registration line is logged.
    pub fn register(
        &self,
        name: impl Into<String>,
        handle: Arc<C>,
    ) -> Result<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(RegistryError::EmptyName.into());
        }
        if self.inner.shutdown.is_cancelled() {
            return Err(RegistryError::Closed.into());
        }
        let runtime = Handle::try_current().map_err(|_| RegistryError::NoRuntime)?;

        let state = match self.inner.entries.entry(name.clone()) {
            Entry::Occupied(_) => {
                debug!(%name, "Connection already registered");
                return Err(RegistryError::AlreadyExists(name).into());
            }
            Entry::Vacant(slot) => {
                // Checked again under the shard lock: once `shutdown` has
                // cancelled, its removal pass cannot miss this entry.
                if self.inner.shutdown.is_cancelled() {
                    return Err(RegistryError::Closed.into());
                }
                let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
                let state = handle.current_state();
                let cancel = self.inner.shutdown.child_token();
                let watcher = Watcher::new(
                    id,
                    name.clone(),
                    Arc::clone(&handle),
                    cancel.clone(),
                    Arc::downgrade(&self.inner),
                    self.inner.config.component.clone(),
                );

                let mut entry = slot.insert(ConnectionEntry {
                    id,
                    handle,
                    state,
                    cancel,
                    task: None,
                });
                // The shard stays locked until `entry` drops, so the watcher's
                // first lookup sees the complete record.
                let span = info_span!("watch", %name, id);
                let task = self
                    .inner
                    .tracker
                    .spawn_on(watcher.run().instrument(span), &runtime);
                self.inner.watchers.insert(id, task.abort_handle());
                entry.task = Some(task);
                state
            }
        };

        info!(
            "{}: connection for {} is being logged. current state {}",
            self.inner.config.component, name, state
        );
        Ok(())
    }

    /// Removes `name` and cancels its watcher. No-op for unknown names.
    ///
    /// The watcher stays owned by the registry until it exits, so `shutdown`
    /// still waits for it and aborts it on timeout.
    pub fn remove(
        &self,
        name: &str,
    ) {
        if let Some((_, entry)) = self.inner.entries.remove(name) {
            entry.cancel.cancel();
            debug!(name, id = entry.id, "Connection removed, watcher cancelled");
        }
    }

    /// Last recorded state of `name`
    pub fn state(
        &self,
        name: &str,
    ) -> Option<ConnectivityState> {
        self.inner.entries.get(name).map(|entry| entry.state)
    }

    pub fn handle(
        &self,
        name: &str,
    ) -> Option<Arc<C>> {
        self.inner.entries.get(name).map(|entry| Arc::clone(&entry.handle))
    }

    pub fn contains(
        &self,
        name: &str,
    ) -> bool {
        self.inner.entries.contains_key(name)
    }

    /// Whether `name` is registered and its watcher task is still running
    pub fn is_watching(
        &self,
        name: &str,
    ) -> bool {
        self.inner
            .entries
            .get(name)
            .and_then(|entry| entry.task.as_ref().map(|task| !task.is_finished()))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> =
            self.inner.entries.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    /// Last recorded state of every registered connection
    pub fn snapshot(&self) -> BTreeMap<String, ConnectivityState> {
        self.inner
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().state))
            .collect()
    }

    /// Stops accepting registrations, cancels every watcher and waits for all
    /// of them, removed ones included, to finish.
    ///
    /// Watchers still running after `registry.shutdown_timeout_in_ms` are
    /// aborted and [`RegistryError::ShutdownTimeout`] is returned.
    pub async fn shutdown(&self) -> Result<()> {
        self.inner.shutdown.cancel();

        let names: Vec<String> = self.inner.entries.iter().map(|entry| entry.key().clone()).collect();
        let drained = names
            .iter()
            .filter_map(|name| self.inner.entries.remove(name))
            .count();

        self.inner.tracker.close();

        let window = self.inner.config.shutdown_timeout();
        match tokio::time::timeout(window, self.inner.tracker.wait()).await {
            Ok(()) => {
                info!(
                    connections = drained,
                    "{}: all watchers stopped", self.inner.config.component
                );
                Ok(())
            }
            Err(_) => {
                warn!(
                    remaining = self.inner.tracker.len(),
                    "{}: watchers did not stop within {:?}, aborting",
                    self.inner.config.component,
                    window
                );
                for watcher in self.inner.watchers.iter() {
                    watcher.value().abort();
                }
                self.inner.watchers.clear();
                Err(RegistryError::ShutdownTimeout(window).into())
            }
        }
    }

    /// Number of watcher tasks still alive, removed connections included
    pub fn active_watchers(&self) -> usize {
        self.inner.tracker.len()
    }

    /// Inserts a record for `name` without spawning its watcher and hands the
    /// watcher back, so tests can drive it one iteration at a time.
    #[cfg(test)]
    pub(super) fn attach_unspawned(
        &self,
        name: &str,
        handle: Arc<C>,
    ) -> Watcher<C> {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let cancel = self.inner.shutdown.child_token();
        self.inner.entries.insert(
            name.to_string(),
            ConnectionEntry {
                id,
                handle: Arc::clone(&handle),
                state: handle.current_state(),
                cancel: cancel.clone(),
                task: None,
            },
        );
        Watcher::new(
            id,
            name.to_string(),
            handle,
            cancel,
            Arc::downgrade(&self.inner),
            self.inner.config.component.clone(),
        )
    }
}
