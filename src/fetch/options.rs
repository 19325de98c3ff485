use crate::error::Error;
use crate::signal::{ReadSignal, Signal};
use reqwest::Method;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub type SuccessCallback<T> = Arc<dyn Fn(&T) + Send + Sync>;
pub type ErrorCallback = Arc<dyn Fn(&Error) + Send + Sync>;

/// Header applied before instance and per-call headers.
pub const DEFAULT_CONTENT_TYPE: (&str, &str) = ("content-type", "application/json");

/// Construction-time options for a [`RemoteFetchState`](super::RemoteFetchState).
///
/// Header names are case-insensitive and stored lowercased.
pub struct FetchOptions<T> {
    pub method: Method,
    pub headers: BTreeMap<String, String>,
    pub body: Option<serde_json::Value>,
    /// Run one request as soon as the state is created.
    pub immediate: bool,
    pub on_success: Option<SuccessCallback<T>>,
    pub on_error: Option<ErrorCallback>,
}

impl<T> Default for FetchOptions<T> {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: BTreeMap::new(),
            body: None,
            immediate: true,
            on_success: None,
            on_error: None,
        }
    }
}

impl<T> Clone for FetchOptions<T> {
    fn clone(&self) -> Self {
        Self {
            method: self.method.clone(),
            headers: self.headers.clone(),
            body: self.body.clone(),
            immediate: self.immediate,
            on_success: self.on_success.clone(),
            on_error: self.on_error.clone(),
        }
    }
}

impl<T> fmt::Debug for FetchOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchOptions")
            .field("method", &self.method)
            .field("headers", &self.headers)
            .field("body", &self.body)
            .field("immediate", &self.immediate)
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

impl<T> FetchOptions<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }

    pub fn on_success(mut self, f: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&Error) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    /// Headers for one call: defaults, then these options, then `overrides`.
    pub fn merged_headers(&self, overrides: &RequestOverrides) -> BTreeMap<String, String> {
        let mut headers = BTreeMap::new();
        headers.insert(
            DEFAULT_CONTENT_TYPE.0.to_string(),
            DEFAULT_CONTENT_TYPE.1.to_string(),
        );
        headers.extend(self.headers.clone());
        headers.extend(overrides.headers.clone());
        headers
    }
}

/// Per-call overlay passed to `execute`. Unset fields fall back to the
/// construction-time [`FetchOptions`].
#[derive(Debug, Clone, Default)]
pub struct RequestOverrides {
    pub method: Option<Method>,
    pub headers: BTreeMap<String, String>,
    pub body: Option<serde_json::Value>,
    pub query: Vec<(String, String)>,
}

impl RequestOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }
}

/// Where a request goes: a fixed URL or one read from a signal at each call.
#[derive(Debug, Clone)]
pub enum FetchTarget {
    Fixed(String),
    Reactive(ReadSignal<String>),
}

impl FetchTarget {
    pub fn resolve(&self) -> String {
        match self {
            Self::Fixed(url) => url.clone(),
            Self::Reactive(url) => url.get_untracked(),
        }
    }
}

impl From<&str> for FetchTarget {
    fn from(url: &str) -> Self {
        Self::Fixed(url.to_string())
    }
}

impl From<String> for FetchTarget {
    fn from(url: String) -> Self {
        Self::Fixed(url)
    }
}

impl From<ReadSignal<String>> for FetchTarget {
    fn from(url: ReadSignal<String>) -> Self {
        Self::Reactive(url)
    }
}

impl From<Signal<String>> for FetchTarget {
    fn from(url: Signal<String>) -> Self {
        Self::Reactive(url.read_only())
    }
}
