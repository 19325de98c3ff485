use super::options::{FetchOptions, FetchTarget, RequestOverrides};
use crate::error::{Error, Result};
use crate::signal::{ReadSignal, Signal};
use reqwest::Method;
use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Snapshot of a [`RemoteFetchState`]'s fields.
#[derive(Debug, Clone)]
pub struct RequestState<T> {
    pub data: Option<T>,
    pub error: Option<Error>,
    pub loading: bool,
}

// Resets `loading` on every exit from `execute`, including a dropped future.
struct LoadingGuard(Signal<bool>);

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

struct FetchInner<T> {
    client: reqwest::Client,
    target: FetchTarget,
    options: FetchOptions<T>,
    data: Signal<Option<T>>,
    error: Signal<Option<Error>>,
    loading: Signal<bool>,
    initial: Mutex<Option<JoinHandle<Result<T>>>>,
}

/// A JSON request whose lifecycle is exposed as signals.
///
/// `loading` is true from the start of [`execute`](Self::execute) until it
/// settles. On success `data` holds the decoded body; on failure `error`
/// holds the error and `data` keeps its previous value. Calls are not
/// de-duplicated: concurrent calls race and the last to settle wins.
///
/// Cloning yields another handle to the same state.
pub struct RemoteFetchState<T> {
    inner: Arc<FetchInner<T>>,
}

impl<T> Clone for RemoteFetchState<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> RemoteFetchState<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Create the state. With `options.immediate` set, one request is spawned
    /// on the current tokio runtime; see [`take_initial`](Self::take_initial).
    pub fn new(
        client: reqwest::Client,
        target: impl Into<FetchTarget>,
        options: FetchOptions<T>,
    ) -> Self {
        let immediate = options.immediate;
        let state = Self {
            inner: Arc::new(FetchInner {
                client,
                target: target.into(),
                options,
                data: Signal::new(None),
                error: Signal::new(None),
                loading: Signal::new(false),
                initial: Mutex::new(None),
            }),
        };

        if immediate {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let this = state.clone();
                    let task = handle.spawn(async move { this.refetch().await });
                    *state.initial_slot() = Some(task);
                }
                Err(_) => {
                    warn!(url = %state.inner.target.resolve(), "no tokio runtime, skipping immediate fetch");
                }
            }
        }

        state
    }

    /// Run the request.
    ///
    /// `target` replaces the configured URL for this call only; `overrides`
    /// is laid over the construction-time options.
    pub async fn execute(
        &self,
        target: Option<&str>,
        overrides: Option<RequestOverrides>,
    ) -> Result<T> {
        let inner = &self.inner;
        inner.loading.set(true);
        inner.error.set(None);
        let _loading = LoadingGuard(inner.loading.clone());

        let url = match target {
            Some(url) => url.to_string(),
            None => inner.target.resolve(),
        };
        let overrides = overrides.unwrap_or_default();

        match self.send(&url, &overrides).await {
            Ok(value) => {
                inner.data.set(Some(value.clone()));
                if let Some(on_success) = &inner.options.on_success {
                    on_success(&value);
                }
                Ok(value)
            }
            Err(err) => {
                error!(url = %url, status = ?err.status(), error = %err, "fetch failed");
                inner.error.set(Some(err.clone()));
                if let Some(on_error) = &inner.options.on_error {
                    on_error(&err);
                }
                Err(err)
            }
        }
    }

    /// Run the request again with the configured URL and options.
    pub async fn refetch(&self) -> Result<T> {
        self.execute(None, None).await
    }

    async fn send(&self, url: &str, overrides: &RequestOverrides) -> Result<T> {
        let options = &self.inner.options;
        let method = overrides
            .method
            .clone()
            .unwrap_or_else(|| options.method.clone());

        let mut request = self.inner.client.request(method.clone(), url);
        for (name, value) in options.merged_headers(overrides) {
            request = request.header(name, value);
        }
        if !overrides.query.is_empty() {
            request = request.query(&overrides.query);
        }
        if let Some(body) = overrides.body.as_ref().or(options.body.as_ref()) {
            request = request.json(body);
        }

        debug!(%method, url, "sending request");
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::RequestFailed {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(Error::decode)
    }

    /// The task spawned for an immediate fetch, once.
    pub fn take_initial(&self) -> Option<JoinHandle<Result<T>>> {
        self.initial_slot().take()
    }

    fn initial_slot(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<Result<T>>>> {
        self.inner
            .initial
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn data(&self) -> ReadSignal<Option<T>> {
        self.inner.data.read_only()
    }

    pub fn error(&self) -> ReadSignal<Option<Error>> {
        self.inner.error.read_only()
    }

    pub fn loading(&self) -> ReadSignal<bool> {
        self.inner.loading.read_only()
    }

    pub fn snapshot(&self) -> RequestState<T> {
        RequestState {
            data: self.inner.data.get_untracked(),
            error: self.inner.error.get_untracked(),
            loading: self.inner.loading.get_untracked(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.inner.options.method
    }
}

fn shared_client() -> reqwest::Client {
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT.get_or_init(reqwest::Client::new).clone()
}

/// Fetch state on a process-wide client.
pub fn use_fetch<T>(target: impl Into<FetchTarget>, options: FetchOptions<T>) -> RemoteFetchState<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    RemoteFetchState::new(shared_client(), target, options)
}

fn use_method<T>(method: Method, target: impl Into<FetchTarget>, options: FetchOptions<T>) -> RemoteFetchState<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    use_fetch(target, options.method(method).immediate(false))
}

/// `use_fetch` fixed to POST; never runs immediately.
pub fn use_post<T>(target: impl Into<FetchTarget>, options: FetchOptions<T>) -> RemoteFetchState<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    use_method(Method::POST, target, options)
}

/// `use_fetch` fixed to PUT; never runs immediately.
pub fn use_put<T>(target: impl Into<FetchTarget>, options: FetchOptions<T>) -> RemoteFetchState<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    use_method(Method::PUT, target, options)
}

/// `use_fetch` fixed to DELETE; never runs immediately.
pub fn use_delete<T>(target: impl Into<FetchTarget>, options: FetchOptions<T>) -> RemoteFetchState<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    use_method(Method::DELETE, target, options)
}
