//! Durable storage backends for the cache snapshot.
//!
//! The cache persists two string blobs: the serialized snapshot and the
//! session identifier. `StorageBackend` abstracts where those blobs live
//! so tests (and storage-less environments) can swap in `MemoryStorage`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::debug;

/// String-keyed blob store holding the cache snapshot and session id.
///
/// Write failures are reported so callers can log them, but the cache
/// treats persistence as best-effort and never propagates them further.
pub trait StorageBackend: Send + Sync {
    /// Read a blob. Missing keys and read errors both yield `None`.
    fn load(&self, key: &str) -> Option<String>;

    /// Write a blob, replacing any previous value.
    fn store(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a blob. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// File-backed storage: one JSON file per storage key under a directory.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create storage directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl StorageBackend for FileStorage {
    fn load(&self, key: &str) -> Option<String> {
        let path = self.path(key);
        match std::fs::read_to_string(&path) {
            Ok(contents) => Some(contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                debug!(key, error = %e, "Failed to read storage blob");
                None
            }
        }
    }

    fn store(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path(key);
        std::fs::write(&path, value)
            .with_context(|| format!("Failed to write storage blob {}", path.display()))
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove storage blob {}", path.display())),
        }
    }
}

/// In-memory storage, used by tests and as a degraded mode when no
/// durable storage is available.
#[derive(Default)]
pub struct MemoryStorage {
    blobs: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryStorage {
    fn load(&self, key: &str) -> Option<String> {
        self.blobs.lock().unwrap().get(key).cloned()
    }

    fn store(&self, key: &str, value: &str) -> Result<()> {
        self.blobs
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.blobs.lock().unwrap().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_round_trip() {
        let storage = MemoryStorage::new();
        assert!(storage.load("missing").is_none());

        storage.store("blob", "{\"a\":1}").unwrap();
        assert_eq!(storage.load("blob").as_deref(), Some("{\"a\":1}"));

        storage.remove("blob").unwrap();
        assert!(storage.load("blob").is_none());
        // Removing again is fine
        storage.remove("blob").unwrap();
    }

    #[test]
    fn test_file_storage_round_trip() {
        let dir = std::env::temp_dir().join(format!("foliocache-test-{:08x}", rand::random::<u32>()));
        let storage = FileStorage::new(dir.clone()).unwrap();

        assert!(storage.load("cache").is_none());
        storage.store("cache", "hello").unwrap();
        assert_eq!(storage.load("cache").as_deref(), Some("hello"));
        storage.remove("cache").unwrap();
        assert!(storage.load("cache").is_none());

        let _ = std::fs::remove_dir_all(dir);
    }
}
