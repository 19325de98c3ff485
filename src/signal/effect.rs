use crate::runtime::{ObserverFn, ReactiveRuntime};
use std::sync::{Arc, Weak};

/// A side effect that re-runs when the signals it reads change.
///
/// The effect runs once on creation to collect its dependencies and stays
/// subscribed until it is dropped.
///
/// # Examples
///
/// ```
/// use tether::{Effect, Signal};
/// use std::sync::{Arc, atomic::{AtomicBool, Ordering}};
///
/// let loading = Signal::new(false);
/// let spinner = Arc::new(AtomicBool::new(false));
///
/// let _effect = Effect::new({
///     let loading = loading.clone();
///     let spinner = Arc::clone(&spinner);
///     move || spinner.store(loading.get(), Ordering::SeqCst)
/// });
///
/// loading.set(true);
/// assert!(spinner.load(Ordering::SeqCst));
/// ```
#[must_use = "the effect is unsubscribed when dropped"]
pub struct Effect {
    id: usize,
    run: ObserverFn,
    runtime: Weak<ReactiveRuntime>,
}

impl Effect {
    pub fn new<F>(effect: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let runtime = ReactiveRuntime::current();
        let id = runtime.next_id();
        let run: ObserverFn = Arc::new(effect);

        runtime.register_observer(id, Arc::clone(&run));
        runtime.with_observer(id, || run());

        Self {
            id,
            run,
            runtime: Arc::downgrade(&runtime),
        }
    }

    /// Run the effect manually, outside change notification.
    pub fn run(&self) {
        (self.run)();
    }
}

impl Drop for Effect {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.upgrade() {
            runtime.remove_observer(self.id);
        }
    }
}

/// Create a new effect that runs when dependencies change.
pub fn create_effect<F>(effect: F) -> Effect
where
    F: Fn() + Send + Sync + 'static,
{
    Effect::new(effect)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::Signal;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn effect_runs_immediately() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();

        let _effect = create_effect(move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn effect_reruns_on_dependency_change() {
        ReactiveRuntime::scope(|| {
            let signal = Signal::new(0);
            let counter = Arc::new(AtomicUsize::new(0));

            let _effect = create_effect({
                let signal = signal.clone();
                let counter = Arc::clone(&counter);
                move || {
                    let _ = signal.get();
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            });

            signal.set(1);
            signal.set(2);
            assert_eq!(counter.load(Ordering::SeqCst), 3);
        });
    }

    #[test]
    fn dropped_effect_stops_running() {
        ReactiveRuntime::scope(|| {
            let signal = Signal::new(0);
            let counter = Arc::new(AtomicUsize::new(0));

            let effect = create_effect({
                let signal = signal.clone();
                let counter = Arc::clone(&counter);
                move || {
                    let _ = signal.get();
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            });
            drop(effect);

            signal.set(1);
            assert_eq!(counter.load(Ordering::SeqCst), 1);
        });
    }
}
