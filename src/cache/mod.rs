//! Local caching module for offline content access.
//!
//! This module provides the `CacheStore`, a TTL key/value cache held in
//! memory and mirrored to a durable storage backend as a single JSON
//! snapshot. Entries carry a schema version and belong to a session
//! identity; expired entries are masked on read rather than evicted.
//!
//! Cached resource families:
//! - Project and skill lists, category lists
//! - Per-id project details (independent TTL window)

pub mod keys;
pub mod storage;
pub mod store;

pub use storage::{FileStorage, MemoryStorage, StorageBackend};
pub use store::{
    CacheEntry, CacheStats, CacheStore, KeyStat, CACHE_VERSION, CATEGORIES_TTL, DEFAULT_TTL,
    PROJECTS_TTL, PROJECT_DETAIL_TTL, SKILLS_TTL,
};
