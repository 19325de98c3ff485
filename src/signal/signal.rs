use crate::runtime::{untrack, ReactiveRuntime};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// A reactive signal that holds a value and notifies subscribers when changed.
///
/// Cloning a signal yields another handle to the same value.
pub struct Signal<T> {
    value: Arc<RwLock<T>>,
    id: usize,
    runtime: Arc<ReactiveRuntime>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            id: self.id,
            runtime: Arc::clone(&self.runtime),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.id)
            .field("value", &*read(&self.value))
            .finish()
    }
}

impl<T: Clone + Send + Sync + 'static> Signal<T> {
    /// Create a new signal in the current runtime.
    pub fn new(initial: T) -> Self {
        let runtime = ReactiveRuntime::current();
        let id = runtime.next_id();

        Self {
            value: Arc::new(RwLock::new(initial)),
            id,
            runtime,
        }
    }

    /// Get the current value, registering a dependency for the running effect.
    pub fn get(&self) -> T {
        self.runtime.track_read(self.id);
        read(&self.value).clone()
    }

    /// Get the current value without registering a dependency.
    pub fn get_untracked(&self) -> T {
        read(&self.value).clone()
    }

    /// Set a new value and notify observers.
    pub fn set(&self, new_value: T) {
        *write(&self.value) = new_value;
        self.runtime.notify(self.id);
    }

    /// Mutate the value in place and notify observers.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        {
            let mut value = write(&self.value);
            f(&mut value);
        }
        self.runtime.notify(self.id);
    }

    /// Read the value with a function without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.runtime.track_read(self.id);
        let value = read(&self.value);
        f(&value)
    }

    /// Get the signal's unique ID within its runtime.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Watch this signal: `callback` runs now with the current value and
    /// again after every change, until the guard is dropped.
    pub fn watch<F>(&self, callback: F) -> WatchGuard
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let callback: Arc<dyn Fn(T) + Send + Sync> = Arc::new(callback);
        let guard = self.on_change_arc(Arc::clone(&callback));
        callback(self.get_untracked());
        guard
    }

    /// Like [`watch`](Self::watch) but only runs `callback` on changes made
    /// after this call.
    pub fn on_change<F>(&self, callback: F) -> WatchGuard
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        self.on_change_arc(Arc::new(callback))
    }

    fn on_change_arc(&self, callback: Arc<dyn Fn(T) + Send + Sync>) -> WatchGuard {
        let observer_id = self.runtime.next_id();
        let value = Arc::clone(&self.value);

        self.runtime.register_observer(
            observer_id,
            Arc::new(move || {
                let current = read(&value).clone();
                untrack(|| callback(current));
            }),
        );
        self.runtime.subscribe(self.id, observer_id);

        WatchGuard {
            observer_id,
            runtime: Arc::downgrade(&self.runtime),
        }
    }

    /// Split into read-only and write-only handles.
    pub fn split(self) -> (ReadSignal<T>, WriteSignal<T>) {
        (
            ReadSignal {
                inner: self.clone(),
            },
            WriteSignal { inner: self },
        )
    }

    /// A read-only handle to this signal.
    pub fn read_only(&self) -> ReadSignal<T> {
        ReadSignal {
            inner: self.clone(),
        }
    }
}

/// Read half of a signal.
#[derive(Clone, Debug)]
pub struct ReadSignal<T> {
    inner: Signal<T>,
}

impl<T: Clone + Send + Sync + 'static> ReadSignal<T> {
    pub fn get(&self) -> T {
        self.inner.get()
    }

    pub fn get_untracked(&self) -> T {
        self.inner.get_untracked()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.with(f)
    }

    pub fn id(&self) -> usize {
        self.inner.id()
    }

    pub fn watch<F>(&self, callback: F) -> WatchGuard
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        self.inner.watch(callback)
    }

    pub fn on_change<F>(&self, callback: F) -> WatchGuard
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        self.inner.on_change(callback)
    }
}

/// Write half of a signal.
#[derive(Clone, Debug)]
pub struct WriteSignal<T> {
    inner: Signal<T>,
}

impl<T: Clone + Send + Sync + 'static> WriteSignal<T> {
    pub fn set(&self, new_value: T) {
        self.inner.set(new_value)
    }

    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.inner.update(f)
    }
}

/// Create a signal and return its read and write halves.
///
/// # Example
///
/// ```
/// use tether::create_signal;
///
/// let (count, set_count) = create_signal(0);
/// set_count.update(|n| *n += 2);
/// assert_eq!(count.get(), 2);
/// ```
pub fn create_signal<T: Clone + Send + Sync + 'static>(initial: T) -> (ReadSignal<T>, WriteSignal<T>) {
    Signal::new(initial).split()
}

/// RAII guard for signal watchers. Dropping it unsubscribes the callback.
#[must_use = "the watcher is removed when the guard is dropped"]
pub struct WatchGuard {
    observer_id: usize,
    runtime: Weak<ReactiveRuntime>,
}

impl WatchGuard {
    /// Unsubscribe now.
    pub fn stop(self) {}
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.upgrade() {
            runtime.remove_observer(self.observer_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn watch_fires_immediately_and_on_change() {
        ReactiveRuntime::scope(|| {
            let signal = Signal::new(1);
            let seen = Arc::new(Mutex::new(Vec::new()));
            let seen_clone = Arc::clone(&seen);

            let _guard = signal.watch(move |v| seen_clone.lock().unwrap().push(v));
            signal.set(2);
            signal.update(|v| *v += 1);

            assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
        });
    }

    #[test]
    fn on_change_skips_current_value() {
        ReactiveRuntime::scope(|| {
            let signal = Signal::new("a".to_string());
            let seen = Arc::new(Mutex::new(Vec::new()));
            let seen_clone = Arc::clone(&seen);

            let _guard = signal.on_change(move |v| seen_clone.lock().unwrap().push(v));
            assert!(seen.lock().unwrap().is_empty());

            signal.set("b".to_string());
            assert_eq!(*seen.lock().unwrap(), vec!["b".to_string()]);
        });
    }

    #[test]
    fn dropping_guard_stops_watching() {
        ReactiveRuntime::scope(|| {
            let signal = Signal::new(0);
            let seen = Arc::new(Mutex::new(Vec::new()));
            let seen_clone = Arc::clone(&seen);

            let guard = signal.on_change(move |v| seen_clone.lock().unwrap().push(v));
            signal.set(1);
            guard.stop();
            signal.set(2);

            assert_eq!(*seen.lock().unwrap(), vec![1]);
        });
    }

    #[test]
    fn split_halves_share_state() {
        let (read, write) = create_signal(vec![1]);
        write.update(|v| v.push(2));
        assert_eq!(read.get(), vec![1, 2]);
        assert_eq!(read.with(|v| v.len()), 2);
    }

    #[test]
    fn writes_from_another_thread_notify_owning_runtime() {
        let runtime = ReactiveRuntime::new();
        let (signal, seen, _guard) = ReactiveRuntime::with_runtime(Arc::clone(&runtime), || {
            let signal = Signal::new(0);
            let seen = Arc::new(Mutex::new(Vec::new()));
            let seen_clone = Arc::clone(&seen);
            let guard = signal.on_change(move |v| seen_clone.lock().unwrap().push(v));
            (signal, seen, guard)
        });

        let writer = signal.clone();
        std::thread::spawn(move || writer.set(7)).join().unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![7]);
    }
}
