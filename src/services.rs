//! Service handle wiring the data layer together.
//!
//! `Services` owns the API client, cache store, retry manager, fetch
//! coordinators, and notification bus, and exposes one async loader per
//! resource family. It replaces module-level singletons with an explicit
//! construction lifecycle: build one handle at startup, share it (it is
//! internally reference-counted where needed), and every consumer sees
//! the same cache and retry state.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::broadcast;
use tracing::info;

use crate::api::ApiClient;
use crate::cache::{
    keys, CacheStats, CacheStore, FileStorage, StorageBackend, PROJECTS_TTL, SKILLS_TTL,
    CATEGORIES_TTL,
};
use crate::config::Config;
use crate::dedup::{CategoryCoordinator, ProjectDetailCoordinator, ProjectSource};
use crate::fallback;
use crate::models::{Project, ProjectCategory, Skill, SkillCategory, SkillWithProjects};
use crate::notify::{FallbackNotice, NotificationBus};
use crate::resources::{load_with_retry, ResourceState};
use crate::retry::RetryManager;

pub struct Services {
    api: ApiClient,
    cache: Arc<CacheStore>,
    retry: RetryManager,
    notifier: NotificationBus,
    details: ProjectDetailCoordinator,
    categories: CategoryCoordinator,
}

impl Services {
    /// Build services with file-backed storage at the configured location.
    pub fn new(config: &Config) -> Result<Self> {
        let storage: Arc<dyn StorageBackend> = Arc::new(FileStorage::new(config.storage_dir()?)?);
        Self::with_storage(config, storage)
    }

    /// Build services over an explicit storage backend. Used by tests and
    /// by environments without a writable cache directory.
    pub fn with_storage(config: &Config, storage: Arc<dyn StorageBackend>) -> Result<Self> {
        let api = ApiClient::new(config.api_base_url.as_str())?;
        let cache = Arc::new(CacheStore::new(storage));
        let source: Arc<dyn ProjectSource> = Arc::new(api.clone());
        let details = ProjectDetailCoordinator::new(Arc::clone(&source), Arc::clone(&cache));
        let categories = CategoryCoordinator::new(source, Arc::clone(&cache));

        info!(base_url = %api.base_url(), "Content data layer initialized");

        Ok(Self {
            api,
            cache,
            retry: RetryManager::new(),
            notifier: NotificationBus::new(),
            details,
            categories,
        })
    }

    // ===== Resource Loaders =====

    pub async fn projects(&self) -> ResourceState<Vec<Project>> {
        load_with_retry(
            &self.retry,
            &self.notifier,
            keys::PROJECTS,
            || self.cache.get(keys::PROJECTS),
            || async move {
                let projects = self.api.fetch_projects().await?;
                self.cache.set(keys::PROJECTS, &projects, Some(PROJECTS_TTL));
                Ok(projects)
            },
            || Some(fallback::projects()),
        )
        .await
    }

    pub async fn skills(&self) -> ResourceState<Vec<Skill>> {
        load_with_retry(
            &self.retry,
            &self.notifier,
            keys::SKILLS,
            || self.cache.get(keys::SKILLS),
            || async move {
                let skills = self.api.fetch_skills().await?;
                self.cache.set(keys::SKILLS, &skills, Some(SKILLS_TTL));
                Ok(skills)
            },
            || Some(fallback::skills()),
        )
        .await
    }

    pub async fn skill_categories(&self) -> ResourceState<Vec<SkillCategory>> {
        load_with_retry(
            &self.retry,
            &self.notifier,
            keys::SKILL_CATEGORIES,
            || self.cache.get(keys::SKILL_CATEGORIES),
            || async move {
                let categories = self.api.fetch_skill_categories().await?;
                self.cache
                    .set(keys::SKILL_CATEGORIES, &categories, Some(CATEGORIES_TTL));
                Ok(categories)
            },
            || Some(fallback::skill_categories()),
        )
        .await
    }

    /// Loads through the singleton coordinator so independent callers
    /// share one in-flight request.
    pub async fn project_categories(&self) -> ResourceState<Vec<ProjectCategory>> {
        load_with_retry(
            &self.retry,
            &self.notifier,
            keys::PROJECT_CATEGORIES,
            || self.cache.get(keys::PROJECT_CATEGORIES),
            || async move {
                self.categories
                    .fetch()
                    .await
                    .ok_or_else(|| anyhow::anyhow!("project categories request failed"))
            },
            || Some(fallback::project_categories()),
        )
        .await
    }

    pub async fn skills_with_projects(&self) -> ResourceState<Vec<SkillWithProjects>> {
        load_with_retry(
            &self.retry,
            &self.notifier,
            keys::SKILLS_WITH_PROJECTS,
            || self.cache.get(keys::SKILLS_WITH_PROJECTS),
            || async move {
                let joined = self.api.fetch_skills_with_projects().await?;
                self.cache
                    .set(keys::SKILLS_WITH_PROJECTS, &joined, Some(SKILLS_TTL));
                Ok(joined)
            },
            || Some(fallback::skills_with_projects()),
        )
        .await
    }

    /// Load one project detail through the deduplicating coordinator.
    /// `data: None` means "not found or unreachable"; callers should
    /// redirect to a list view rather than surface a hard error.
    pub async fn project_detail(&self, id: i64) -> ResourceState<Project> {
        let key = keys::project_detail(id);
        load_with_retry(
            &self.retry,
            &self.notifier,
            &key,
            || self.cache.get_project_detail(id),
            || async move {
                self.details
                    .fetch(id)
                    .await
                    .project
                    .ok_or_else(|| anyhow::anyhow!("project {} is unavailable", id))
            },
            || fallback::project_by_id(id),
        )
        .await
    }

    // ===== Control Surface =====

    /// Duration of the most recent project-detail network fetch, for
    /// callers that synchronize a minimum perceived loading time.
    pub fn last_detail_fetch_duration(&self) -> Option<Duration> {
        self.details.last_fetch_duration()
    }

    /// Subscribe to fallback notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<FallbackNotice> {
        self.notifier.subscribe()
    }

    /// User-triggered "retry connection": clears all retry state so the
    /// next loads attempt the network again. Callers that scheduled
    /// their own delayed retries should abandon them.
    pub fn retry_connection(&self) {
        info!("Manual retry requested, clearing retry state");
        self.retry.reset_all();
    }

    pub fn reset_retry(&self, key: &str) {
        self.retry.reset_retry_state(key);
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.get_stats()
    }

    pub fn warm_cache(&self) {
        self.cache.warm_cache();
    }

    pub fn retry_manager(&self) -> &RetryManager {
        &self.retry
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStorage;
    use crate::resources::DataSource;
    use crate::retry::MAX_RETRIES;

    fn services() -> Services {
        let config = Config::default();
        Services::with_storage(&config, Arc::new(MemoryStorage::new())).unwrap()
    }

    fn engage_fallback(services: &Services, key: &str) {
        for _ in 0..MAX_RETRIES {
            services.retry_manager().record_failure(key);
        }
        assert!(!services.retry_manager().should_retry(key));
    }

    #[tokio::test]
    async fn test_cached_projects_are_served_without_network() {
        let services = services();
        let seeded = fallback::projects();
        services.cache().set(keys::PROJECTS, &seeded, None);

        let state = services.projects().await;
        assert_eq!(state.source, DataSource::Cache);
        assert_eq!(state.data.unwrap(), seeded);
        // Serving cache never touches retry state
        assert_eq!(services.retry_manager().get_retry_count(keys::PROJECTS), 0);
    }

    #[tokio::test]
    async fn test_fallback_mode_serves_bundled_projects() {
        let services = services();
        engage_fallback(&services, keys::PROJECTS);

        let state = services.projects().await;
        assert_eq!(state.source, DataSource::Fallback);
        assert_eq!(state.data.unwrap(), fallback::projects());
        assert!(state.error.is_some());
    }

    #[tokio::test]
    async fn test_fallback_mode_detail_uses_bundled_record() {
        let services = services();
        let bundled = fallback::projects().remove(0);
        let key = keys::project_detail(bundled.id);
        engage_fallback(&services, &key);

        let state = services.project_detail(bundled.id).await;
        assert_eq!(state.source, DataSource::Fallback);
        assert_eq!(state.data.unwrap(), bundled);
    }

    #[tokio::test]
    async fn test_fallback_mode_detail_missing_id_resolves_none() {
        let services = services();
        let key = keys::project_detail(999_999);
        engage_fallback(&services, &key);

        let state = services.project_detail(999_999).await;
        assert!(state.data.is_none());
        assert_eq!(state.source, DataSource::Missing);
    }

    #[tokio::test]
    async fn test_retry_connection_clears_all_keys() {
        let services = services();
        engage_fallback(&services, keys::PROJECTS);
        engage_fallback(&services, keys::SKILLS);

        services.retry_connection();
        assert!(services.retry_manager().should_retry(keys::PROJECTS));
        assert!(services.retry_manager().should_retry(keys::SKILLS));
    }

    #[tokio::test]
    async fn test_clear_cache_and_stats() {
        let services = services();
        services.cache().set(keys::SKILLS, &fallback::skills(), None);
        assert!(services.cache_stats().keys[keys::SKILLS].valid);

        services.clear_cache();
        assert!(!services.cache_stats().keys[keys::SKILLS].valid);
        services.warm_cache();
    }
}
