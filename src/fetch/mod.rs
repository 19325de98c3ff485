//! Reactive HTTP requests.
//!
//! [`RemoteFetchState`] wraps one JSON endpoint and exposes `data`, `error`
//! and `loading` as signals. [`use_post`], [`use_put`] and [`use_delete`] are
//! the same state pre-set to a verb and never run on creation.

mod fetch;
mod options;

pub use fetch::{use_delete, use_fetch, use_post, use_put, RemoteFetchState, RequestState};
pub use options::{
    ErrorCallback, FetchOptions, FetchTarget, RequestOverrides, SuccessCallback,
    DEFAULT_CONTENT_TYPE,
};
