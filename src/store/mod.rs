//! Shared key-value storage with cross-context change notification.
//!
//! A [`Store`] wraps one [`StorageBackend`] and hands out [`StoreContext`]s,
//! each standing for one execution context (a window, a tab, a worker).
//! Writes through one context are announced to listeners of the others.

mod backend;
mod store;

pub use backend::{FileBackend, MemoryBackend, StorageBackend};
pub use store::{ContextId, ListenerId, Store, StoreContext, StoreEvent};
