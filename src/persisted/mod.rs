//! Storage-backed reactive state.
//!
//! - [`PersistedKeyState`] / [`use_local_storage`]: explicit `set_value`,
//!   `remove_value` and `stop`
//! - [`AutoPersisted`] / [`use_storage`]: every change to the signal is
//!   written through

mod auto;
mod persisted;

pub use auto::{use_storage, AutoPersisted};
pub use persisted::{use_local_storage, Persistable, PersistedKeyState};
