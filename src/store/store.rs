use super::backend::{MemoryBackend, StorageBackend};
use crate::error::StorageError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::debug;

/// Identifies one execution context sharing a [`Store`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

/// Handle returned by [`StoreContext::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// A change made to the store by some execution context.
///
/// `key` is `None` when the whole store was cleared. `new_value` is `None`
/// when the key was removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEvent {
    pub key: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

impl StoreEvent {
    pub fn changed(key: impl Into<String>, old_value: Option<String>, new_value: Option<String>) -> Self {
        Self {
            key: Some(key.into()),
            old_value,
            new_value,
        }
    }
}

type Listener = Arc<dyn Fn(&StoreEvent) + Send + Sync>;

struct ListenerEntry {
    id: ListenerId,
    context: ContextId,
    listener: Listener,
}

struct Shared {
    backend: Box<dyn StorageBackend>,
    // serializes read-old-value + write so events carry the right old value
    write_lock: Mutex<()>,
    listeners: RwLock<Vec<ListenerEntry>>,
    next_listener: AtomicU64,
    next_context: AtomicU64,
}

/// A key-value store shared by several execution contexts, with a change
/// channel that tells every context about writes made by the others.
///
/// This mirrors how browser storage behaves across tabs: a write made through
/// one [`StoreContext`] is delivered to listeners registered by every other
/// context, never back to the writer's own listeners.
///
/// # Examples
///
/// ```
/// use tether::store::Store;
/// use std::sync::{Arc, Mutex};
///
/// let store = Store::memory();
/// let tab_a = store.context();
/// let tab_b = store.context();
///
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let sink = Arc::clone(&seen);
/// let _id = tab_b.add_listener(move |event| {
///     sink.lock().unwrap().push(event.new_value.clone());
/// });
///
/// tab_a.set_item("theme", "\"dark\"").unwrap();
/// assert_eq!(*seen.lock().unwrap(), vec![Some("\"dark\"".to_string())]);
/// ```
#[derive(Clone)]
pub struct Store {
    shared: Arc<Shared>,
}

impl Store {
    pub fn new(backend: impl StorageBackend + 'static) -> Self {
        Self {
            shared: Arc::new(Shared {
                backend: Box::new(backend),
                write_lock: Mutex::new(()),
                listeners: RwLock::new(Vec::new()),
                next_listener: AtomicU64::new(0),
                next_context: AtomicU64::new(0),
            }),
        }
    }

    /// A store backed by an unbounded [`MemoryBackend`].
    pub fn memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    /// Open a new execution context on this store.
    pub fn context(&self) -> StoreContext {
        let id = ContextId(self.shared.next_context.fetch_add(1, Ordering::SeqCst));
        StoreContext {
            id,
            store: self.clone(),
        }
    }

    /// Number of registered listeners across all contexts.
    pub fn listener_count(&self) -> usize {
        self.listeners().len()
    }

    /// Deliver `event` to every listener not registered by `origin`.
    ///
    /// Listeners run on the calling thread, against a snapshot of the
    /// registry, so a listener may unsubscribe itself while being called.
    pub fn dispatch(&self, origin: Option<ContextId>, event: &StoreEvent) {
        let targets: Vec<Listener> = self
            .listeners()
            .iter()
            .filter(|entry| Some(entry.context) != origin)
            .map(|entry| Arc::clone(&entry.listener))
            .collect();

        debug!(key = ?event.key, listeners = targets.len(), "dispatching store event");
        for listener in targets {
            listener(event);
        }
    }

    fn listeners(&self) -> std::sync::RwLockReadGuard<'_, Vec<ListenerEntry>> {
        self.shared
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn listeners_mut(&self) -> std::sync::RwLockWriteGuard<'_, Vec<ListenerEntry>> {
        self.shared
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn backend(&self) -> &dyn StorageBackend {
        self.shared.backend.as_ref()
    }
}

/// One execution context's view of a [`Store`].
#[derive(Clone)]
pub struct StoreContext {
    id: ContextId,
    store: Store,
}

impl StoreContext {
    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.store.backend().get(key)
    }

    /// Store `value` under `key` and notify the other contexts.
    ///
    /// Writing the value already stored is a no-op and dispatches nothing.
    pub fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let event = {
            let _write = self.write_guard();
            let old_value = self.store.backend().get(key)?;
            if old_value.as_deref() == Some(value) {
                return Ok(());
            }
            self.store.backend().set(key, value)?;
            StoreEvent::changed(key, old_value, Some(value.to_string()))
        };
        self.store.dispatch(Some(self.id), &event);
        Ok(())
    }

    /// Remove `key` and notify the other contexts if it existed.
    pub fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let event = {
            let _write = self.write_guard();
            let Some(old_value) = self.store.backend().get(key)? else {
                return Ok(());
            };
            self.store.backend().remove(key)?;
            StoreEvent::changed(key, Some(old_value), None)
        };
        self.store.dispatch(Some(self.id), &event);
        Ok(())
    }

    /// Remove every key and notify the other contexts.
    pub fn clear(&self) -> Result<(), StorageError> {
        {
            let _write = self.write_guard();
            self.store.backend().clear()?;
        }
        let event = StoreEvent {
            key: None,
            old_value: None,
            new_value: None,
        };
        self.store.dispatch(Some(self.id), &event);
        Ok(())
    }

    pub fn keys(&self) -> Result<Vec<String>, StorageError> {
        self.store.backend().keys()
    }

    /// Subscribe to changes made by other contexts.
    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&StoreEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.store.shared.next_listener.fetch_add(1, Ordering::SeqCst));
        self.store.listeners_mut().push(ListenerEntry {
            id,
            context: self.id,
            listener: Arc::new(listener),
        });
        id
    }

    /// Unsubscribe. Returns `false` if `id` was not registered, which is
    /// harmless.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.store.listeners_mut();
        let before = listeners.len();
        listeners.retain(|entry| entry.id != id);
        listeners.len() != before
    }

    fn write_guard(&self) -> std::sync::MutexGuard<'_, ()> {
        self.store
            .shared
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
