//! Crate-wide error types.
//!
//! [`Error`] is `Clone` so a failure can be kept in a [`Signal`](crate::Signal)
//! and handed to callbacks while also being returned to the caller.

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Errors produced by fetch state, the operator client and storage.
#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("request failed: {0}")]
    Transport(#[source] Arc<reqwest::Error>),

    /// The server answered with a non-success status code.
    #[error("HTTP error! status: {status}")]
    RequestFailed { status: u16 },

    #[error("failed to decode response body: {0}")]
    Decode(#[source] Arc<serde_json::Error>),

    #[error("failed to encode value: {0}")]
    Encode(#[source] Arc<serde_json::Error>),

    /// The API envelope carried a non-success business code.
    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl Error {
    pub fn decode(err: serde_json::Error) -> Self {
        Self::Decode(Arc::new(err))
    }

    pub fn encode(err: serde_json::Error) -> Self {
        Self::Encode(Arc::new(err))
    }

    /// HTTP status carried by a [`Error::RequestFailed`], if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RequestFailed { status } => Some(*status),
            Self::Transport(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(Arc::new(err))
    }
}

/// Failures of a [`StorageBackend`](crate::store::StorageBackend).
#[derive(Error, Debug, Clone)]
pub enum StorageError {
    #[error("storage quota exceeded: limit {limit} bytes, needed {needed} bytes")]
    QuotaExceeded { limit: usize, needed: usize },

    #[error("storage I/O error: {0}")]
    Io(#[source] Arc<std::io::Error>),

    #[error("corrupt storage file {}: {message}", .path.display())]
    Corrupt { path: PathBuf, message: String },
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

/// Result alias using the crate [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
