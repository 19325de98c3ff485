use crate::error::StorageError;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Raw string key-value storage.
///
/// Backends store text only. Encoding values (JSON) is the caller's job, so
/// a backend never needs to know about serde.
///
/// Implementations: [`MemoryBackend`], [`FileBackend`].
pub trait StorageBackend: Send + Sync {
    /// Read the value stored under `key`, `None` if absent.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`. On failure the previous value is kept.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Remove every key.
    fn clear(&self) -> Result<(), StorageError>;

    /// All stored keys in ascending order.
    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

type Entries = BTreeMap<String, String>;

fn lock(entries: &Mutex<Entries>) -> MutexGuard<'_, Entries> {
    entries.lock().unwrap_or_else(PoisonError::into_inner)
}

// Keys and values both count against the quota.
fn usage(entries: &Entries) -> usize {
    entries.iter().map(|(k, v)| k.len() + v.len()).sum()
}

fn check_quota(quota: Option<usize>, entries: &Entries) -> Result<(), StorageError> {
    match quota {
        Some(limit) => {
            let needed = usage(entries);
            if needed > limit {
                Err(StorageError::QuotaExceeded { limit, needed })
            } else {
                Ok(())
            }
        }
        None => Ok(()),
    }
}

/// In-process backend, optionally bounded by a byte quota.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<Entries>,
    quota: Option<usize>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject writes that would grow keys plus values past `bytes`.
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: Mutex::default(),
            quota: Some(bytes),
        }
    }
}

impl StorageBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = lock(&self.entries);
        let previous = entries.insert(key.to_string(), value.to_string());
        if let Err(err) = check_quota(self.quota, &entries) {
            match previous {
                Some(previous) => entries.insert(key.to_string(), previous),
                None => entries.remove(key),
            };
            return Err(err);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        lock(&self.entries).remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        lock(&self.entries).clear();
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(lock(&self.entries).keys().cloned().collect())
    }
}

/// Durable backend keeping every entry in a single JSON document.
///
/// Each mutation rewrites the document through a sibling temp file and a
/// rename, so a crash leaves either the old or the new document on disk.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    entries: Mutex<Entries>,
    quota: Option<usize>,
}

impl FileBackend {
    /// Open the document at `path`, starting empty if it does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => Entries::new(),
            Ok(text) => serde_json::from_str(&text).map_err(|e| StorageError::Corrupt {
                path: path.clone(),
                message: e.to_string(),
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Entries::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), entries = entries.len(), "opened storage file");

        Ok(Self {
            path,
            entries: Mutex::new(entries),
            quota: None,
        })
    }

    pub fn with_quota(mut self, bytes: usize) -> Self {
        self.quota = Some(bytes);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `change` to a copy of the entries, write it out, and only then
    /// make it current.
    fn commit(&self, change: impl FnOnce(&mut Entries)) -> Result<(), StorageError> {
        let mut entries = lock(&self.entries);
        let mut next = entries.clone();
        change(&mut next);
        check_quota(self.quota, &next)?;

        let text = serde_json::to_string_pretty(&next).map_err(|e| StorageError::Corrupt {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        let tmp = self.path.with_extension("tmp");
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.path)?;

        *entries = next;
        Ok(())
    }
}

impl StorageBackend for FileBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.commit(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        if !lock(&self.entries).contains_key(key) {
            return Ok(());
        }
        self.commit(|entries| {
            entries.remove(key);
        })
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.commit(Entries::clear)
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(lock(&self.entries).keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_quota_keeps_previous_value() {
        let backend = MemoryBackend::with_quota(12);
        backend.set("k", "small").unwrap();

        let err = backend.set("k", "much too large").unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { limit: 12, .. }));
        assert_eq!(backend.get("k").unwrap().as_deref(), Some("small"));
    }

    #[test]
    fn memory_quota_rejects_new_key() {
        let backend = MemoryBackend::with_quota(3);
        assert!(backend.set("key", "value").is_err());
        assert!(backend.keys().unwrap().is_empty());
    }

    #[test]
    fn file_backend_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let backend = FileBackend::open(&path).unwrap();
        backend.set("theme", "\"dark\"").unwrap();
        backend.set("count", "3").unwrap();
        backend.remove("count").unwrap();
        drop(backend);

        let reopened = FileBackend::open(&path).unwrap();
        assert_eq!(reopened.get("theme").unwrap().as_deref(), Some("\"dark\""));
        assert_eq!(reopened.keys().unwrap(), vec!["theme".to_string()]);
    }

    #[test]
    fn file_backend_rejects_corrupt_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json").unwrap();

        let err = FileBackend::open(&path).unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { .. }));
    }

    #[test]
    fn file_quota_leaves_disk_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let backend = FileBackend::open(&path).unwrap().with_quota(16);
        backend.set("a", "1").unwrap();
        assert!(backend.set("b", "0123456789abcdef").is_err());
        drop(backend);

        let reopened = FileBackend::open(&path).unwrap();
        assert_eq!(reopened.keys().unwrap(), vec!["a".to_string()]);
    }
}
