//! Runtime support for reactive primitives.
//!
//! This module owns dependency tracking: which observers (effects and
//! watchers) depend on which signals, and re-running them on change.

mod context;

pub(crate) use context::ObserverFn;
pub use context::{untrack, ReactiveRuntime};
