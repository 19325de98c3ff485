use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

/// Callback run when one of an observer's sources changes.
pub(crate) type ObserverFn = Arc<dyn Fn() + Send + Sync>;

/// Dependency graph between reactive sources (signals) and observers
/// (effects and watchers).
#[derive(Default)]
struct Graph {
    // source id -> observers that depend on it
    subscribers: HashMap<usize, HashSet<usize>>,
    // observer id -> sources it has read
    sources: HashMap<usize, HashSet<usize>>,
    observers: HashMap<usize, ObserverFn>,
}

impl Graph {
    fn unlink(&mut self, observer_id: usize) {
        if let Some(sources) = self.sources.remove(&observer_id) {
            for source_id in sources {
                if let Some(subs) = self.subscribers.get_mut(&source_id) {
                    subs.remove(&observer_id);
                    if subs.is_empty() {
                        self.subscribers.remove(&source_id);
                    }
                }
            }
        }
    }
}

// Observer currently collecting reads on this thread: (runtime address, observer id).
thread_local! {
    static CURRENT_OBSERVER: Cell<Option<(usize, usize)>> = const { Cell::new(None) };
    static RUNTIME_STACK: RefCell<Vec<Arc<ReactiveRuntime>>> = const { RefCell::new(Vec::new()) };
}

/// Reactive runtime owning the dependency graph for the primitives created
/// inside it.
///
/// A process-wide runtime is used by default. Scoped runtimes isolate a
/// group of signals, which is mostly useful in tests.
///
/// Every signal remembers the runtime it was created in, so writes made from
/// other threads (for example a tokio worker settling a request) notify the
/// right observers.
///
/// # Examples
///
/// ```
/// use tether::runtime::ReactiveRuntime;
/// use tether::Signal;
///
/// ReactiveRuntime::scope(|| {
///     let signal = Signal::new(0);
///     assert_eq!(signal.get(), 0);
/// });
/// ```
pub struct ReactiveRuntime {
    next_id: AtomicUsize,
    graph: Mutex<Graph>,
}

struct StackGuard;

impl Drop for StackGuard {
    fn drop(&mut self) {
        RUNTIME_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

struct ObserverGuard(Option<(usize, usize)>);

impl Drop for ObserverGuard {
    fn drop(&mut self) {
        CURRENT_OBSERVER.with(|current| current.set(self.0));
    }
}

impl ReactiveRuntime {
    /// Create a new isolated runtime.
    pub fn new() -> Arc<Self> {
        Arc::new(ReactiveRuntime {
            next_id: AtomicUsize::new(0),
            graph: Mutex::new(Graph::default()),
        })
    }

    /// Run a function with a fresh isolated runtime.
    pub fn scope<F, R>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        Self::with_runtime(Self::new(), f)
    }

    /// The process-wide runtime used when no scoped runtime is active.
    pub fn global() -> Arc<Self> {
        static RUNTIME: OnceLock<Arc<ReactiveRuntime>> = OnceLock::new();
        Arc::clone(RUNTIME.get_or_init(Self::new))
    }

    /// The innermost scoped runtime on this thread, or the global one.
    pub fn current() -> Arc<Self> {
        RUNTIME_STACK.with(|stack| stack.borrow().last().cloned().unwrap_or_else(Self::global))
    }

    /// Run a function with `runtime` as the current runtime on this thread.
    pub fn with_runtime<F, R>(runtime: Arc<Self>, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        RUNTIME_STACK.with(|stack| stack.borrow_mut().push(runtime));
        let _guard = StackGuard;
        f()
    }

    /// Drop every observer and dependency edge.
    ///
    /// The id counter keeps running, so signals created before the call
    /// never share an id with ones created after it.
    pub fn clear(&self) {
        let mut graph = self.graph();
        graph.subscribers.clear();
        graph.sources.clear();
        graph.observers.clear();
    }

    /// Number of live observers (effects and watchers).
    pub fn observer_count(&self) -> usize {
        self.graph().observers.len()
    }

    pub(crate) fn next_id(&self) -> usize {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn address(&self) -> usize {
        self as *const Self as usize
    }

    fn graph(&self) -> MutexGuard<'_, Graph> {
        self.graph.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record that the observer running on this thread read `source_id`.
    pub(crate) fn track_read(&self, source_id: usize) {
        let Some((runtime, observer_id)) = CURRENT_OBSERVER.with(Cell::get) else {
            return;
        };
        if runtime != self.address() {
            return;
        }
        self.subscribe(source_id, observer_id);
    }

    /// Subscribe `observer_id` to `source_id` explicitly.
    pub(crate) fn subscribe(&self, source_id: usize, observer_id: usize) {
        let mut graph = self.graph();
        graph.subscribers.entry(source_id).or_default().insert(observer_id);
        graph.sources.entry(observer_id).or_default().insert(source_id);
    }

    /// Re-run every observer subscribed to `source_id`.
    ///
    /// The graph lock is released before any observer runs so observers may
    /// read and write signals freely.
    pub(crate) fn notify(&self, source_id: usize) {
        let observers: Vec<(usize, ObserverFn)> = {
            let graph = self.graph();
            let Some(subs) = graph.subscribers.get(&source_id) else {
                return;
            };
            subs.iter()
                .filter_map(|id| graph.observers.get(id).map(|f| (*id, Arc::clone(f))))
                .collect()
        };

        for (observer_id, run) in observers {
            self.with_observer(observer_id, || run());
        }
    }

    /// Register (or replace) the callback for `observer_id`.
    pub(crate) fn register_observer(&self, observer_id: usize, run: ObserverFn) {
        let mut graph = self.graph();
        graph.unlink(observer_id);
        graph.observers.insert(observer_id, run);
    }

    pub(crate) fn remove_observer(&self, observer_id: usize) {
        let mut graph = self.graph();
        graph.observers.remove(&observer_id);
        graph.unlink(observer_id);
    }

    /// Run `f` with `observer_id` collecting the reads it makes.
    pub(crate) fn with_observer<F, R>(&self, observer_id: usize, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let previous =
            CURRENT_OBSERVER.with(|current| current.replace(Some((self.address(), observer_id))));
        let _guard = ObserverGuard(previous);
        f()
    }
}

/// Run `f` without recording its signal reads against the observer that is
/// currently running on this thread.
pub fn untrack<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    let previous = CURRENT_OBSERVER.with(|current| current.replace(None));
    let _guard = ObserverGuard(previous);
    f()
}
