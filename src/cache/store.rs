//! TTL cache store with durable snapshot persistence.
//!
//! Entries live in memory and are mirrored to a single JSON blob in the
//! storage backend on every mutation. Expired entries are never removed
//! proactively; they are simply treated as absent on read. Every read and
//! mutation first re-validates the persisted session identity.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::session;

use super::keys;
use super::storage::StorageBackend;

// ============================================================================
// Constants
// ============================================================================

/// Cache schema version. Bump to invalidate persisted entries across
/// deployments that change the stored shapes.
pub const CACHE_VERSION: &str = "1";

/// Storage key holding the serialized snapshot blob.
const SNAPSHOT_STORAGE_KEY: &str = "content_cache";

/// TTL applied when `set` is called without one.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

/// Project lists refresh every 30 minutes.
pub const PROJECTS_TTL: Duration = Duration::from_secs(30 * 60);

/// Skill lists change rarely; refresh every 60 minutes.
pub const SKILLS_TTL: Duration = Duration::from_secs(60 * 60);

/// Category lists share the skills cadence.
pub const CATEGORIES_TTL: Duration = Duration::from_secs(60 * 60);

/// Project details expire faster than lists.
pub const PROJECT_DETAIL_TTL: Duration = Duration::from_secs(10 * 60);

// ============================================================================
// Entries
// ============================================================================

/// A single cached payload with its expiry window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    data: serde_json::Value,
    /// Creation time, epoch milliseconds.
    timestamp: i64,
    /// Milliseconds until expiry.
    ttl: i64,
    version: String,
}

impl CacheEntry {
    fn new(data: serde_json::Value, ttl: Duration) -> Self {
        Self {
            data,
            timestamp: Utc::now().timestamp_millis(),
            ttl: ttl.as_millis() as i64,
            version: CACHE_VERSION.to_string(),
        }
    }

    /// An entry is valid iff it has not outlived its TTL and was written
    /// by the current cache schema.
    pub fn is_valid(&self) -> bool {
        self.version == CACHE_VERSION
            && Utc::now().timestamp_millis() - self.timestamp <= self.ttl
    }

    fn age_display(&self) -> String {
        let minutes = (Utc::now().timestamp_millis() - self.timestamp) / 60_000;
        if minutes < 1 {
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            format!("{}h ago", minutes / 60)
        } else {
            format!("{}d ago", minutes / 1440)
        }
    }
}

/// Persistence format: one JSON blob holding all entries plus the session
/// identity and schema version they belong to.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheSnapshot {
    entries: HashMap<String, CacheEntry>,
    project_details: Vec<(i64, CacheEntry)>,
    session_id: String,
    version: String,
    /// Write time, epoch milliseconds.
    timestamp: i64,
}

// ============================================================================
// Store
// ============================================================================

struct StoreInner {
    session_id: String,
    entries: HashMap<String, CacheEntry>,
    project_details: HashMap<i64, CacheEntry>,
}

/// Key/value cache with expiry, mirrored to durable storage.
///
/// Project details live in their own map keyed by numeric id because they
/// are numerous and expire independently of the list-level resources.
pub struct CacheStore {
    storage: Arc<dyn StorageBackend>,
    inner: Mutex<StoreInner>,
}

impl CacheStore {
    /// Build a store over the given storage backend, adopting any
    /// persisted entries that are still valid, schema-matching, and owned
    /// by the current session.
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        let session_id = session::load_or_create(storage.as_ref());
        let mut entries = HashMap::new();
        let mut project_details = HashMap::new();

        if let Some(raw) = storage.load(SNAPSHOT_STORAGE_KEY) {
            match serde_json::from_str::<CacheSnapshot>(&raw) {
                Ok(snapshot)
                    if snapshot.session_id == session_id
                        && snapshot.version == CACHE_VERSION =>
                {
                    for (key, entry) in snapshot.entries {
                        if entry.is_valid() {
                            entries.insert(key, entry);
                        }
                    }
                    for (id, entry) in snapshot.project_details {
                        if entry.is_valid() {
                            project_details.insert(id, entry);
                        }
                    }
                    debug!(
                        entries = entries.len(),
                        project_details = project_details.len(),
                        "Adopted persisted cache snapshot"
                    );
                }
                Ok(_) => {
                    debug!("Discarding cache snapshot from another session or schema");
                }
                Err(e) => {
                    debug!(error = %e, "Failed to parse cache snapshot");
                }
            }
        }

        Self {
            storage,
            inner: Mutex::new(StoreInner {
                session_id,
                entries,
                project_details,
            }),
        }
    }

    /// The session identity this store currently trusts.
    pub fn session_id(&self) -> String {
        self.inner.lock().unwrap().session_id.clone()
    }

    /// Store a payload under `key`. Best-effort: serialization and
    /// persistence failures are logged, never propagated.
    pub fn set<T: Serialize>(&self, key: &str, data: &T, ttl: Option<Duration>) {
        let mut inner = self.inner.lock().unwrap();
        self.ensure_session(&mut inner);

        let value = match serde_json::to_value(data) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Failed to serialize cache entry");
                return;
            }
        };

        inner
            .entries
            .insert(key.to_string(), CacheEntry::new(value, ttl.unwrap_or(DEFAULT_TTL)));
        self.persist(&inner);
    }

    /// Read a payload. Never-set, expired, schema-mismatched, and
    /// wrong-session entries all collapse to `None`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut inner = self.inner.lock().unwrap();
        self.ensure_session(&mut inner);

        let entry = inner.entries.get(key)?;
        if !entry.is_valid() {
            return None;
        }
        match serde_json::from_value(entry.data.clone()) {
            Ok(data) => Some(data),
            Err(e) => {
                debug!(key, error = %e, "Cached entry failed to deserialize");
                None
            }
        }
    }

    pub fn has(&self, key: &str) -> bool {
        let mut inner = self.inner.lock().unwrap();
        self.ensure_session(&mut inner);
        inner.entries.get(key).is_some_and(|e| e.is_valid())
    }

    /// Store a project-detail payload under its numeric id.
    pub fn set_project_detail<T: Serialize>(&self, id: i64, data: &T, ttl: Option<Duration>) {
        let mut inner = self.inner.lock().unwrap();
        self.ensure_session(&mut inner);

        let value = match serde_json::to_value(data) {
            Ok(value) => value,
            Err(e) => {
                warn!(id, error = %e, "Failed to serialize project-detail entry");
                return;
            }
        };

        inner
            .project_details
            .insert(id, CacheEntry::new(value, ttl.unwrap_or(PROJECT_DETAIL_TTL)));
        self.persist(&inner);
    }

    pub fn get_project_detail<T: DeserializeOwned>(&self, id: i64) -> Option<T> {
        let mut inner = self.inner.lock().unwrap();
        self.ensure_session(&mut inner);

        let entry = inner.project_details.get(&id)?;
        if !entry.is_valid() {
            return None;
        }
        match serde_json::from_value(entry.data.clone()) {
            Ok(data) => Some(data),
            Err(e) => {
                debug!(id, error = %e, "Cached project detail failed to deserialize");
                None
            }
        }
    }

    pub fn has_project_detail(&self, id: i64) -> bool {
        let mut inner = self.inner.lock().unwrap();
        self.ensure_session(&mut inner);
        inner.project_details.get(&id).is_some_and(|e| e.is_valid())
    }

    /// Drop everything, in memory and in durable storage. Idempotent.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.entries.clear();
        inner.project_details.clear();
        if let Err(e) = self.storage.remove(SNAPSHOT_STORAGE_KEY) {
            warn!(error = %e, "Failed to remove persisted cache snapshot");
        }
    }

    /// Remove one project-detail entry and re-persist.
    pub fn clear_project_detail(&self, id: i64) {
        let mut inner = self.inner.lock().unwrap();
        self.ensure_session(&mut inner);
        inner.project_details.remove(&id);
        self.persist(&inner);
    }

    /// Diagnostic snapshot of per-key validity and entry ages.
    pub fn get_stats(&self) -> CacheStats {
        let mut inner = self.inner.lock().unwrap();
        self.ensure_session(&mut inner);

        let mut keys_stats = HashMap::new();
        for key in keys::ALL {
            let stat = match inner.entries.get(key) {
                Some(entry) => KeyStat {
                    valid: entry.is_valid(),
                    age: Some(entry.age_display()),
                },
                None => KeyStat {
                    valid: false,
                    age: None,
                },
            };
            keys_stats.insert(key.to_string(), stat);
        }

        CacheStats {
            session_id: inner.session_id.clone(),
            keys: keys_stats,
            project_details: inner.project_details.len(),
            valid_project_details: inner
                .project_details
                .values()
                .filter(|e| e.is_valid())
                .count(),
        }
    }

    /// Placeholder hook for server-driven cache warming. Does nothing.
    pub fn warm_cache(&self) {
        debug!("Cache warming requested; nothing to do");
    }

    /// Re-validate the persisted session identity, discarding the
    /// in-memory cache when another session has taken over the storage.
    fn ensure_session(&self, inner: &mut StoreInner) {
        match session::current(self.storage.as_ref()) {
            Some(live) if live != inner.session_id => {
                debug!(
                    old = %inner.session_id,
                    new = %live,
                    "Session id changed, dropping in-memory cache"
                );
                inner.entries.clear();
                inner.project_details.clear();
                inner.session_id = live;
            }
            Some(_) => {}
            None => {
                // A missing id means storage was cleared or is unreadable.
                // Keep the in-memory identity and re-assert it best-effort
                // rather than discarding a healthy cache.
                if let Err(e) = self
                    .storage
                    .store(session::SESSION_STORAGE_KEY, &inner.session_id)
                {
                    debug!(error = %e, "Could not re-assert session id");
                }
            }
        }
    }

    fn persist(&self, inner: &StoreInner) {
        let snapshot = CacheSnapshot {
            entries: inner.entries.clone(),
            project_details: inner
                .project_details
                .iter()
                .map(|(id, entry)| (*id, entry.clone()))
                .collect(),
            session_id: inner.session_id.clone(),
            version: CACHE_VERSION.to_string(),
            timestamp: Utc::now().timestamp_millis(),
        };

        match serde_json::to_string(&snapshot) {
            Ok(raw) => {
                if let Err(e) = self.storage.store(SNAPSHOT_STORAGE_KEY, &raw) {
                    warn!(error = %e, "Failed to persist cache snapshot, continuing memory-only");
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to serialize cache snapshot");
            }
        }
    }
}

/// Validity and age for one resource key.
#[derive(Debug, Clone)]
pub struct KeyStat {
    pub valid: bool,
    /// Human-readable entry age, `None` when the key was never set.
    pub age: Option<String>,
}

/// Read-only diagnostic snapshot of the cache.
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub session_id: String,
    pub keys: HashMap<String, KeyStat>,
    pub project_details: usize,
    pub valid_project_details: usize,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::super::storage::MemoryStorage;
    use super::*;

    fn memory_store() -> (Arc<MemoryStorage>, CacheStore) {
        let storage = Arc::new(MemoryStorage::new());
        let store = CacheStore::new(storage.clone());
        (storage, store)
    }

    fn backdate(store: &CacheStore, key: &str, millis: i64) {
        let mut inner = store.inner.lock().unwrap();
        inner.entries.get_mut(key).unwrap().timestamp -= millis;
    }

    #[test]
    fn test_set_get_round_trip() {
        let (_, store) = memory_store();
        store.set(keys::PROJECTS, &vec![1, 2, 3], None);
        assert_eq!(store.get::<Vec<i32>>(keys::PROJECTS), Some(vec![1, 2, 3]));
        assert!(store.has(keys::PROJECTS));
    }

    #[test]
    fn test_ttl_expiry_masks_entry() {
        let (_, store) = memory_store();
        store.set(keys::SKILLS, &"data", Some(Duration::from_millis(100)));
        assert_eq!(store.get::<String>(keys::SKILLS).as_deref(), Some("data"));

        backdate(&store, keys::SKILLS, 200);
        assert_eq!(store.get::<String>(keys::SKILLS), None);
        assert!(!store.has(keys::SKILLS));
    }

    #[test]
    fn test_version_mismatch_is_a_miss() {
        let (_, store) = memory_store();
        store.set(keys::PROJECTS, &"data", None);
        store
            .inner
            .lock()
            .unwrap()
            .entries
            .get_mut(keys::PROJECTS)
            .unwrap()
            .version = "0".to_string();
        assert_eq!(store.get::<String>(keys::PROJECTS), None);
    }

    #[test]
    fn test_session_change_invalidates_memory() {
        let (storage, store) = memory_store();
        store.set(keys::PROJECTS, &"data", None);

        storage
            .store(session::SESSION_STORAGE_KEY, "someone-else")
            .unwrap();

        assert_eq!(store.get::<String>(keys::PROJECTS), None);
        assert_eq!(store.session_id(), "someone-else");
    }

    #[test]
    fn test_clear_is_idempotent() {
        let (_, store) = memory_store();
        store.set(keys::PROJECTS, &"data", None);
        store.set_project_detail(1, &"detail", None);

        store.clear();
        assert_eq!(store.get::<String>(keys::PROJECTS), None);
        assert_eq!(store.get_project_detail::<String>(1), None);

        store.clear();
        assert_eq!(store.get::<String>(keys::PROJECTS), None);
    }

    #[test]
    fn test_snapshot_round_trip_across_instances() {
        let (storage, store) = memory_store();
        store.set(keys::PROJECTS, &vec!["a", "b"], None);
        store.set_project_detail(42, &"detail", None);
        drop(store);

        let reloaded = CacheStore::new(storage);
        assert_eq!(
            reloaded.get::<Vec<String>>(keys::PROJECTS),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(
            reloaded.get_project_detail::<String>(42).as_deref(),
            Some("detail")
        );
    }

    #[test]
    fn test_expired_persisted_entries_are_not_adopted() {
        let (storage, store) = memory_store();
        store.set(keys::SKILLS, &"stale", Some(Duration::from_millis(50)));
        backdate(&store, keys::SKILLS, 1_000);
        // Re-persist with the backdated timestamp
        store.set(keys::PROJECTS, &"fresh", None);
        drop(store);

        let reloaded = CacheStore::new(storage);
        assert_eq!(reloaded.get::<String>(keys::SKILLS), None);
        assert_eq!(reloaded.get::<String>(keys::PROJECTS).as_deref(), Some("fresh"));
    }

    #[test]
    fn test_snapshot_from_other_session_is_discarded() {
        let storage = Arc::new(MemoryStorage::new());
        let store = CacheStore::new(storage.clone());
        store.set(keys::PROJECTS, &"data", None);
        drop(store);

        // Another session takes over the same storage
        storage
            .store(session::SESSION_STORAGE_KEY, "other-session")
            .unwrap();
        let reloaded = CacheStore::new(storage);
        assert_eq!(reloaded.get::<String>(keys::PROJECTS), None);
    }

    #[test]
    fn test_project_details_are_independent() {
        let (_, store) = memory_store();
        store.set_project_detail(1, &"one", None);
        store.set_project_detail(2, &"two", None);

        store.clear_project_detail(1);
        assert_eq!(store.get_project_detail::<String>(1), None);
        assert_eq!(store.get_project_detail::<String>(2).as_deref(), Some("two"));
        assert!(store.has_project_detail(2));
    }

    #[test]
    fn test_stats_reports_validity_and_counts() {
        let (_, store) = memory_store();
        store.set(keys::PROJECTS, &"data", None);
        store.set(keys::SKILLS, &"old", Some(Duration::from_millis(10)));
        backdate(&store, keys::SKILLS, 1_000);
        store.set_project_detail(1, &"one", None);

        let stats = store.get_stats();
        assert!(stats.keys[keys::PROJECTS].valid);
        assert!(!stats.keys[keys::SKILLS].valid);
        assert!(!stats.keys[keys::PROJECT_CATEGORIES].valid);
        assert_eq!(stats.keys[keys::PROJECT_CATEGORIES].age, None);
        assert_eq!(stats.project_details, 1);
        assert_eq!(stats.valid_project_details, 1);
        assert!(!stats.session_id.is_empty());
    }
}
