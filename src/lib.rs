//! # Tether
//!
//! Reactive state helpers for Rust applications that talk to HTTP services
//! and keep state in durable key-value storage.
//!
//! ## Signals (reactive primitives)
//!
//! - `Signal<T>` - reactive values that notify dependents when changed
//! - `Effect` - side effects that re-run when the signals they read change
//! - `WatchGuard` - a callback bound to one signal, released on drop
//!
//! ## Helpers
//!
//! - [`fetch::RemoteFetchState`] - a JSON request with `data`, `error` and
//!   `loading` signals
//! - [`persisted::PersistedKeyState`] - one storage key mirrored into a
//!   signal, kept in sync with other execution contexts
//! - [`operator::OperatorClient`] - typed client for the operator admin API

pub mod error;
pub mod fetch;
pub mod operator;
pub mod persisted;
pub mod runtime;
pub mod signal;
pub mod store;

// Re-export main types for convenience
pub use error::{Error, Result, StorageError};
pub use fetch::{use_delete, use_fetch, use_post, use_put, FetchOptions, RemoteFetchState};
pub use persisted::{use_local_storage, use_storage, AutoPersisted, PersistedKeyState};
pub use signal::{create_effect, create_signal, Effect, ReadSignal, Signal, WatchGuard, WriteSignal};
pub use store::{Store, StoreContext};
