//! foliocache - an offline-resilient data layer for a portfolio site.
//!
//! The backend content API serves projects, skills, and categories; this
//! crate keeps that content usable when the API is unreachable:
//!
//! - [`cache`]: TTL key/value cache, held in memory and mirrored to a
//!   durable storage backend, with schema versioning and session-identity
//!   validation.
//! - [`retry`]: per-resource failure counting with exponential backoff,
//!   and a fallback mode that stops network attempts until reset.
//! - [`dedup`]: in-flight request registries so concurrent callers share
//!   one network request per resource.
//! - [`resources`]: the fixed load procedure every resource goes through
//!   (fallback gate, cache, fetch, backoff, bundled content).
//! - [`fallback`]: bundled datasets served once the network gives up.
//! - [`services`]: the injectable handle wiring all of the above.
//!
//! Expected failures (network, storage) never escape this crate as
//! errors: loaders always resolve to a usable [`resources::ResourceState`]
//! carrying data plus an out-of-band error description.

pub mod api;
pub mod cache;
pub mod config;
pub mod dedup;
pub mod fallback;
pub mod models;
pub mod notify;
pub mod resources;
pub mod retry;
pub mod services;
pub mod session;

pub use api::{ApiClient, ApiError};
pub use cache::{CacheStats, CacheStore, FileStorage, MemoryStorage, StorageBackend};
pub use config::Config;
pub use models::{Project, ProjectCategory, Skill, SkillCategory, SkillWithProjects};
pub use notify::{FallbackNotice, NotificationBus};
pub use resources::{DataSource, ResourceState};
pub use retry::{RetryManager, RetryState};
pub use services::Services;
