//! Session identity persisted alongside the cache.
//!
//! A session identifier is created once per storage lineage and reused
//! across restarts. The cache store compares the live persisted id with
//! the id it captured at construction; a mismatch means another session
//! now owns the storage, so the in-memory cache can no longer be trusted.

use chrono::Utc;
use tracing::{debug, warn};

use crate::cache::StorageBackend;

/// Storage key holding the session identifier, separate from the snapshot.
pub(crate) const SESSION_STORAGE_KEY: &str = "session_id";

/// Read the persisted session id, creating and persisting a fresh one if
/// none exists. Persistence failures degrade to a memory-only id.
pub fn load_or_create(storage: &dyn StorageBackend) -> String {
    if let Some(id) = current(storage) {
        return id;
    }

    let id = generate_session_id();
    if let Err(e) = storage.store(SESSION_STORAGE_KEY, &id) {
        warn!(error = %e, "Failed to persist session id, continuing memory-only");
    } else {
        debug!(session_id = %id, "Created new session id");
    }
    id
}

/// Read the persisted session id, if any.
pub fn current(storage: &dyn StorageBackend) -> Option<String> {
    storage
        .load(SESSION_STORAGE_KEY)
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
}

fn generate_session_id() -> String {
    // Millisecond timestamp plus a random nonce keeps ids unique across
    // concurrent first-run sessions without coordination.
    format!(
        "{:x}-{:08x}",
        Utc::now().timestamp_millis(),
        rand::random::<u32>()
    )
}
