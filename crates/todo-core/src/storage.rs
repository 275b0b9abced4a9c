use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};

pub const TASKS_KEY: &str = "tasks";
/// Copy of a stored task list that could not be read at all.
pub const UNREADABLE_TASKS_KEY: &str = "tasks-unreadable";
pub const LANGUAGE_KEY: &str = "language";
pub const THEME_KEY: &str = "theme";
/// Written by older builds as `"true"`/`"false"`; read-only now.
pub const LEGACY_DARK_MODE_KEY: &str = "darkMode";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage quota exceeded: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded { needed: usize, quota: usize },

    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),

    #[error("failed to access {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Synchronous string key/value storage scoped to this device.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }
}

/// In-memory store. An optional quota bounds the total size of keys plus
/// values, the way browser storage does.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            quota: Some(quota),
        }
    }

    pub fn with_entry(mut self, key: &str, value: &str) -> Self {
        self.entries.insert(key.to_string(), value.to_string());
        self
    }

    pub fn raw(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    fn used_without(&self, key: &str) -> usize {
        self.entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Some(quota) = self.quota {
            let needed = self.used_without(key) + key.len() + value.len();
            if needed > quota {
                return Err(StorageError::QuotaExceeded { needed, quota });
            }
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One file per key inside a data directory, replaced atomically on write.
#[derive(Debug)]
pub struct FileStore {
    pub data_dir: PathBuf,
}

impl FileStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> Result<Self, StorageError> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir).map_err(|source| StorageError::Io {
            path: data_dir.clone(),
            source,
        })?;

        info!(data_dir = %data_dir.display(), "opened file store");
        Ok(Self { data_dir })
    }

    pub fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.data_dir.join(format!("{key}.data")))
    }
}

impl KeyValueStore for FileStore {
    #[tracing::instrument(skip(self))]
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(text) => {
                debug!(file = %path.display(), bytes = text.len(), "read key");
                Ok(Some(text))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    #[tracing::instrument(skip(self, value), fields(bytes = value.len()))]
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        write_atomic(&path, value).map_err(|source| StorageError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(file = %path.display(), "wrote key");
        Ok(())
    }
}

fn write_atomic(path: &Path, value: &str) -> io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(value.as_bytes())?;
    temp.flush()?;
    temp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_enforces_quota() {
        let mut store = MemoryStore::with_quota(16);
        store.set("tasks", "[]").unwrap();
        let err = store.set("tasks", "[\"0123456789\"]").unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { .. }));
        assert_eq!(store.raw("tasks"), Some("[]"));
    }

    #[test]
    fn memory_store_replaces_values() {
        let mut store = MemoryStore::new().with_entry("theme", "light");
        store.set("theme", "dark").unwrap();
        assert_eq!(store.get("theme").unwrap().as_deref(), Some("dark"));
        assert_eq!(store.get("missing").unwrap(), None);
    }

    #[test]
    fn file_store_round_trips_and_rejects_bad_keys() {
        let temp = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(temp.path()).unwrap();

        assert_eq!(store.get("tasks").unwrap(), None);
        store.set("tasks", "[1,2,3]").unwrap();
        assert_eq!(store.get("tasks").unwrap().as_deref(), Some("[1,2,3]"));
        assert!(temp.path().join("tasks.data").exists());

        assert!(matches!(
            store.set("../escape", "x"),
            Err(StorageError::InvalidKey(_))
        ));
    }
}
