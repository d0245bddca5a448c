//! Durable key-value storage backing the session.
//!
//! DESIGN
//! ======
//! `KeyValueStore` is the seam between the session layer and wherever the
//! two session keys actually live. Mutations take several entries at once so
//! a store can apply them as one write: the session always writes or removes
//! its token and user together.
//!
//! `FileStore` keeps every key in one JSON object document and replaces it
//! via a fresh temp file plus rename, so readers never observe half a mutation.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tempfile::NamedTempFile;

/// Errors produced by storage backends.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("storage io failed: {0}")]
    Io(#[from] std::io::Error),

    /// The backing document is not a JSON object of strings.
    #[error("storage document invalid: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// String key-value storage with multi-entry mutations.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write every entry in one mutation.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend cannot be written.
    fn set_all(&self, entries: &[(&str, &str)]) -> Result<(), StorageError>;

    /// Remove every key in one mutation. Missing keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend cannot be written.
    fn remove_all(&self, keys: &[&str]) -> Result<(), StorageError>;
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// Process-local store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with existing entries.
    #[must_use]
    pub fn with_entries(entries: &[(&str, &str)]) -> Self {
        let map = entries
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        Self { entries: Mutex::new(map) }
    }

    /// Snapshot of every stored entry.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set_all(&self, entries: &[(&str, &str)]) -> Result<(), StorageError> {
        let mut map = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        for (key, value) in entries {
            map.insert((*key).to_owned(), (*value).to_owned());
        }
        Ok(())
    }

    fn remove_all(&self, keys: &[&str]) -> Result<(), StorageError> {
        let mut map = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        for key in keys {
            map.remove(*key);
        }
        Ok(())
    }
}

// =============================================================================
// FILE STORE
// =============================================================================

/// Single-document JSON store on disk.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<BTreeMap<String, String>, StorageError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    /// Each write goes through its own uniquely named temp file in the
    /// target directory, so concurrent writers (other processes included)
    /// never share a staging path. The last rename wins.
    fn write_document(&self, document: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;
        let rendered = serde_json::to_string_pretty(document)?;
        let mut staged = NamedTempFile::new_in(dir)?;
        staged.write_all(rendered.as_bytes())?;
        staged.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Read-modify-write under the store's lock. A corrupt document is
    /// replaced rather than blocking every later write.
    fn mutate<F>(&self, apply: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut document = match self.read_document() {
            Ok(document) => document,
            Err(StorageError::Serialization(e)) => {
                tracing::warn!(path = %self.path.display(), error = %e, "replacing unreadable storage document");
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        apply(&mut document);
        self.write_document(&document)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut document = self.read_document()?;
        Ok(document.remove(key))
    }

    fn set_all(&self, entries: &[(&str, &str)]) -> Result<(), StorageError> {
        self.mutate(|document| {
            for (key, value) in entries {
                document.insert((*key).to_owned(), (*value).to_owned());
            }
        })
    }

    fn remove_all(&self, keys: &[&str]) -> Result<(), StorageError> {
        if !self.path.exists() {
            return Ok(());
        }
        self.mutate(|document| {
            for key in keys {
                document.remove(*key);
            }
        })
    }
}

#[cfg(test)]
#[path = "storage_test.rs"]
mod tests;
