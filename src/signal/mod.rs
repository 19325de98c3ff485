//! Fine-grained reactive primitives.
//!
//! - Signals: reactive state containers, with read/write halves
//! - Watchers: callbacks bound to one signal, released by a guard
//! - Effects: side effects that re-run when the signals they read change

mod effect;
mod signal;

pub use effect::{create_effect, Effect};
pub use signal::{create_signal, ReadSignal, Signal, WatchGuard, WriteSignal};
