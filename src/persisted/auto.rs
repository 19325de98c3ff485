use super::persisted::{Persistable, PersistedKeyState};
use crate::signal::{Signal, WatchGuard};
use crate::store::StoreContext;
use std::ops::Deref;

/// A persisted signal that writes through on every change.
///
/// Any `set` or in-place `update` on the signal is persisted immediately,
/// including mutations deep inside composite values. Changes that come from
/// other contexts are applied to the signal without being written back.
///
/// Derefs to the underlying [`Signal`].
///
/// # Examples
///
/// ```
/// use tether::persisted::use_storage;
/// use tether::store::Store;
///
/// let store = Store::memory();
/// let tab = store.context();
///
/// let todos = use_storage(&tab, "todos", Vec::<String>::new());
/// todos.update(|list| list.push("write docs".into()));
///
/// assert_eq!(
///     tab.get_item("todos").unwrap().as_deref(),
///     Some("[\"write docs\"]")
/// );
/// ```
pub struct AutoPersisted<T> {
    value: Signal<T>,
    state: PersistedKeyState<T>,
    _watch: WatchGuard,
}

impl<T: Persistable> AutoPersisted<T> {
    pub fn new(context: &StoreContext, key: impl Into<String>, default: T) -> Self {
        let state = PersistedKeyState::new(context, key, default);
        let inner = state.inner();
        let watch = state.value().on_change(move |value| {
            if let Some(inner) = inner.upgrade() {
                inner.write_through(&value);
            }
        });

        Self {
            value: state.value(),
            state,
            _watch: watch,
        }
    }

    /// The explicit-write state underneath.
    pub fn state(&self) -> &PersistedKeyState<T> {
        &self.state
    }

    pub fn signal(&self) -> &Signal<T> {
        &self.value
    }

    /// Stop following external changes. Local changes are still persisted.
    pub fn stop(&self) {
        self.state.stop();
    }
}

impl<T> Deref for AutoPersisted<T> {
    type Target = Signal<T>;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

/// Mirror `key` into a signal that persists every change by itself.
pub fn use_storage<T: Persistable>(
    context: &StoreContext,
    key: impl Into<String>,
    default: T,
) -> AutoPersisted<T> {
    AutoPersisted::new(context, key, default)
}
