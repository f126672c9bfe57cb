use crate::state::view_state::{ViewState, ViewUpdate};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use tracing::{debug, error};

/// Callback invoked with every new [`ViewState`]
pub type Listener = Arc<dyn Fn(&Arc<ViewState>) + Send + Sync>;

/// Handle returned by [`ViewStateStore::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

struct StoreInner {
    current: Arc<ViewState>,
    version: u64,
}

/// Single source of truth for the current [`ViewState`].
///
/// Every `replace` builds a new value and notifies subscribers synchronously
/// while holding the publish lock, so each notification sees one complete
/// state and notifications never interleave. Listeners may read `current()`
/// but must not call `replace` themselves. A panicking listener is logged and
/// skipped; the remaining listeners still run.
pub struct ViewStateStore {
    publish: Mutex<()>,
    inner: RwLock<StoreInner>,
    listeners: DashMap<SubscriptionId, Listener>,
    next_id: AtomicU64,
}

impl ViewStateStore {
    pub fn new() -> Self {
        Self::with_state(ViewState::initial())
    }

    pub fn with_state(state: ViewState) -> Self {
        Self {
            publish: Mutex::new(()),
            inner: RwLock::new(StoreInner {
                current: Arc::new(state),
                version: 0,
            }),
            listeners: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Latest state; cheap to call
    pub fn current(&self) -> Arc<ViewState> {
        Arc::clone(&self.read().current)
    }

    /// Number of replacements applied so far
    pub fn version(&self) -> u64 {
        self.read().version
    }

    /// Merges `update` into a new state, publishes it, and returns it
    pub fn replace(&self, update: ViewUpdate) -> Arc<ViewState> {
        let _publishing = self.lock_publish();
        self.publish_locked(update)
    }

    /// Like [`replace`](Self::replace), but `admit` is consulted under the
    /// publish lock and a `false` drops the update.
    pub fn replace_if(&self, update: ViewUpdate, admit: impl FnOnce() -> bool) -> Option<Arc<ViewState>> {
        let _publishing = self.lock_publish();
        admit().then(|| self.publish_locked(update))
    }

    /// Waits until no replacement is being published
    pub fn quiesce(&self) {
        drop(self.lock_publish());
    }

    fn lock_publish(&self) -> MutexGuard<'_, ()> {
        self.publish.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish_locked(&self, update: ViewUpdate) -> Arc<ViewState> {
        let (next, version) = {
            let mut inner = self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner());
            let next = Arc::new(inner.current.merged(update));
            inner.current = Arc::clone(&next);
            inner.version += 1;
            (next, inner.version)
        };
        debug!(
            "View state v{}: connected={} gainers={} losers={} top24h={} banner={}",
            version,
            next.is_connected,
            next.gainers.len(),
            next.losers.len(),
            next.top24h.len(),
            next.banner.len()
        );

        // Collected first so listeners may (un)subscribe without holding a shard lock
        let mut listeners: Vec<(SubscriptionId, Listener)> = self
            .listeners
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();
        listeners.sort_by_key(|(id, _)| *id);

        for (id, listener) in listeners {
            // a faulty subscriber must not take the publisher down with it
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| listener(&next))) {
                error!("View state listener {:?} panicked: {}", id, panic_message(payload.as_ref()));
            }
        }

        next
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&Arc<ViewState>) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.insert(id, Arc::new(listener));
        id
    }

    /// Returns false when `id` was not subscribed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

impl Default for ViewStateStore {
    fn default() -> Self {
        Self::new()
    }
}
