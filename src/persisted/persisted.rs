use crate::signal::Signal;
use crate::store::{ListenerId, StoreContext, StoreEvent};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::{debug, error, warn};

/// Values that can be mirrored into storage.
pub trait Persistable: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

impl<T> Persistable for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

pub(super) struct Inner<T> {
    key: String,
    default: T,
    context: StoreContext,
    value: Signal<T>,
    // JSON text of the last mirror value known to match storage
    synced: Mutex<Option<String>>,
}

impl<T: Persistable> Inner<T> {
    fn read(context: &StoreContext, key: &str, default: &T) -> T {
        match context.get_item(key) {
            Ok(Some(raw)) if !raw.is_empty() => match serde_json::from_str(&raw) {
                Ok(value) => value,
                Err(err) => {
                    warn!(key, error = %err, "stored value is not valid JSON, using default");
                    default.clone()
                }
            },
            Ok(_) => default.clone(),
            Err(err) => {
                warn!(key, error = %err, "failed to read stored value, using default");
                default.clone()
            }
        }
    }

    fn synced(&self) -> MutexGuard<'_, Option<String>> {
        self.synced.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the mirror with a value storage already agrees with.
    ///
    /// Write-through skips exactly this value. Any other value written by an
    /// observer while the change is delivered is still persisted.
    fn write_mirror(&self, value: T) {
        *self.synced() = serde_json::to_string(&value).ok();
        self.value.set(value);
    }

    /// Persist `value` unless it is the value storage already holds.
    pub(super) fn write_through(&self, value: &T) {
        let text = match serde_json::to_string(value) {
            Ok(text) => text,
            Err(err) => {
                error!(key = %self.key, error = %err, "failed to serialize value");
                return;
            }
        };
        {
            let mut synced = self.synced();
            if synced.as_deref() == Some(text.as_str()) {
                return;
            }
            *synced = Some(text.clone());
        }
        self.store_text(&text);
    }

    /// Serialize and store `value`. Failures are logged, never returned.
    fn persist(&self, value: &T) {
        match serde_json::to_string(value) {
            Ok(text) => self.store_text(&text),
            Err(err) => error!(key = %self.key, error = %err, "failed to serialize value"),
        }
    }

    fn store_text(&self, text: &str) {
        if let Err(err) = self.context.set_item(&self.key, text) {
            error!(key = %self.key, error = %err, "failed to persist value");
        }
    }

    fn on_store_event(&self, event: &StoreEvent) {
        if event.key.as_deref() != Some(self.key.as_str()) {
            return;
        }
        let Some(raw) = event.new_value.as_deref() else {
            return;
        };
        match serde_json::from_str::<T>(raw) {
            Ok(value) => {
                debug!(key = %self.key, "applying external change");
                self.write_mirror(value);
            }
            Err(err) => {
                error!(key = %self.key, error = %err, "dropping malformed external value");
            }
        }
    }
}

/// One storage key mirrored into a reactive [`Signal`].
///
/// The mirror is loaded from storage on construction and kept in step with
/// writes made by other execution contexts on the same
/// [`Store`](crate::store::Store). Local writes go through
/// [`set_value`](Self::set_value) / [`update_value`](Self::update_value),
/// which update the mirror first and then persist.
///
/// A failed write is logged and leaves the mirror holding the new value
/// while storage keeps the previous one.
///
/// The change listener is released by [`stop`](Self::stop) or on drop.
///
/// # Examples
///
/// ```
/// use tether::persisted::use_local_storage;
/// use tether::store::Store;
///
/// let store = Store::memory();
/// let tab = store.context();
///
/// let theme = use_local_storage(&tab, "theme", "light".to_string());
/// assert_eq!(theme.get(), "light");
///
/// theme.set_value("dark".to_string());
/// assert_eq!(tab.get_item("theme").unwrap().as_deref(), Some("\"dark\""));
/// ```
pub struct PersistedKeyState<T> {
    inner: Arc<Inner<T>>,
    listener: Mutex<Option<ListenerId>>,
}

impl<T: Persistable> PersistedKeyState<T> {
    pub fn new(context: &StoreContext, key: impl Into<String>, default: T) -> Self {
        let key = key.into();
        let initial = Inner::read(context, &key, &default);
        let synced = serde_json::to_string(&initial).ok();
        let inner = Arc::new(Inner {
            value: Signal::new(initial),
            key,
            default,
            context: context.clone(),
            synced: Mutex::new(synced),
        });

        let weak: Weak<Inner<T>> = Arc::downgrade(&inner);
        let listener = context.add_listener(move |event| {
            if let Some(inner) = weak.upgrade() {
                inner.on_store_event(event);
            }
        });

        Self {
            inner,
            listener: Mutex::new(Some(listener)),
        }
    }

    pub fn key(&self) -> &str {
        &self.inner.key
    }

    pub fn default_value(&self) -> &T {
        &self.inner.default
    }

    /// The reactive mirror.
    pub fn value(&self) -> Signal<T> {
        self.inner.value.clone()
    }

    /// Current mirror value, tracked by the running effect.
    pub fn get(&self) -> T {
        self.inner.value.get()
    }

    /// Replace the value and persist it.
    pub fn set_value(&self, value: T) {
        self.inner.write_mirror(value.clone());
        self.inner.persist(&value);
    }

    /// Compute the next value from the current one and persist it.
    pub fn update_value(&self, f: impl FnOnce(&T) -> T) {
        let next = self.inner.value.with(f);
        self.set_value(next);
    }

    /// Delete the key from storage and reset the mirror to the default.
    ///
    /// If storage refuses the removal the mirror is left as it is.
    pub fn remove_value(&self) {
        match self.inner.context.remove_item(&self.inner.key) {
            Ok(()) => self.inner.write_mirror(self.inner.default.clone()),
            Err(err) => error!(key = %self.inner.key, error = %err, "failed to remove value"),
        }
    }

    /// Stop following external changes. Calling it again does nothing.
    pub fn stop(&self) {
        let taken = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(id) = taken {
            self.inner.context.remove_listener(id);
            debug!(key = %self.inner.key, "stopped listening for external changes");
        }
    }

    pub(super) fn inner(&self) -> Weak<Inner<T>> {
        Arc::downgrade(&self.inner)
    }
}

impl<T> Drop for PersistedKeyState<T> {
    fn drop(&mut self) {
        let taken = self
            .listener
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(id) = taken {
            self.inner.context.remove_listener(id);
        }
    }
}

/// Mirror `key` of the given context's store into a signal.
pub fn use_local_storage<T: Persistable>(
    context: &StoreContext,
    key: impl Into<String>,
    default: T,
) -> PersistedKeyState<T> {
    PersistedKeyState::new(context, key, default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryBackend, Store};
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Prefs {
        font_size: u8,
        tags: Vec<String>,
    }

    #[test]
    fn loads_existing_value() {
        let store = Store::memory();
        let ctx = store.context();
        ctx.set_item("count", "41").unwrap();

        let count = use_local_storage(&ctx, "count", 0u32);
        assert_eq!(count.get(), 41);
    }

    #[test]
    fn malformed_or_empty_value_falls_back_to_default() {
        let store = Store::memory();
        let ctx = store.context();
        ctx.set_item("bad", "{oops").unwrap();
        ctx.set_item("empty", "").unwrap();

        assert_eq!(use_local_storage(&ctx, "bad", 7u32).get(), 7);
        assert_eq!(use_local_storage(&ctx, "empty", 9u32).get(), 9);
    }

    #[test]
    fn update_value_uses_previous_value() {
        let store = Store::memory();
        let ctx = store.context();
        let prefs = use_local_storage(
            &ctx,
            "prefs",
            Prefs {
                font_size: 12,
                tags: vec![],
            },
        );

        prefs.update_value(|p| Prefs {
            font_size: p.font_size + 2,
            tags: vec!["bold".into()],
        });

        assert_eq!(prefs.get().font_size, 14);
        let stored: Prefs = serde_json::from_str(&ctx.get_item("prefs").unwrap().unwrap()).unwrap();
        assert_eq!(stored, prefs.get());
    }

    #[test]
    fn failed_persist_keeps_new_mirror_value() {
        let store = Store::new(MemoryBackend::with_quota(16));
        let ctx = store.context();
        let note = use_local_storage(&ctx, "note", String::new());
        note.set_value("short".into());

        note.set_value("this will not fit in the quota".into());

        assert_eq!(note.get(), "this will not fit in the quota");
        assert_eq!(ctx.get_item("note").unwrap().as_deref(), Some("\"short\""));
    }

    #[test]
    fn remove_value_resets_to_default() {
        let store = Store::memory();
        let ctx = store.context();
        let flag = use_local_storage(&ctx, "flag", false);
        flag.set_value(true);

        flag.remove_value();

        assert!(!flag.get());
        assert_eq!(ctx.get_item("flag").unwrap(), None);
    }

    #[test]
    fn external_removal_and_clear_are_ignored() {
        let store = Store::memory();
        let here = store.context();
        let there = store.context();
        let flag = use_local_storage(&here, "flag", false);
        there.set_item("flag", "true").unwrap();
        assert!(flag.get());

        there.remove_item("flag").unwrap();
        there.clear().unwrap();
        assert!(flag.get());
    }

    #[test]
    fn malformed_external_value_is_dropped() {
        let store = Store::memory();
        let here = store.context();
        let there = store.context();
        let count = use_local_storage(&here, "count", 1u32);

        there.set_item("count", "not a number").unwrap();
        assert_eq!(count.get(), 1);

        there.set_item("count", "5").unwrap();
        assert_eq!(count.get(), 5);
    }

    #[test]
    fn drop_releases_listener() {
        let store = Store::memory();
        let ctx = store.context();
        let state = use_local_storage(&ctx, "k", 0u8);
        assert_eq!(store.listener_count(), 1);

        state.stop();
        state.stop();
        assert_eq!(store.listener_count(), 0);

        let other = use_local_storage(&ctx, "k", 0u8);
        drop(other);
        assert_eq!(store.listener_count(), 0);
    }
}
