//! Request deduplication for concurrent fetches of the same resource.
//!
//! Project details keep an in-flight registry keyed by id: the first
//! caller starts the network request, later callers join the same shared
//! future and observe the identical resolved value. Project categories
//! use the same pattern with a single shared slot for the whole resource.
//!
//! Fetches resolve to `None` instead of erroring; callers treat `None`
//! as "not found or unreachable". The registry entry is removed when the
//! request settles, success or failure, so one failed attempt never
//! blocks future fetches.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::api::ApiClient;
use crate::cache::{keys, CacheStore, CATEGORIES_TTL};
use crate::models::{Project, ProjectCategory};

type SharedFetch<T> = Shared<BoxFuture<'static, T>>;

/// The slice of the content API the coordinators consume. `ApiClient`
/// implements it; tests substitute scripted sources.
pub trait ProjectSource: Send + Sync {
    fn project_detail(&self, id: i64) -> BoxFuture<'static, Result<Project>>;
    fn project_categories(&self) -> BoxFuture<'static, Result<Vec<ProjectCategory>>>;
}

impl ProjectSource for ApiClient {
    fn project_detail(&self, id: i64) -> BoxFuture<'static, Result<Project>> {
        let client = self.clone();
        async move { client.fetch_project(id).await }.boxed()
    }

    fn project_categories(&self) -> BoxFuture<'static, Result<Vec<ProjectCategory>>> {
        let client = self.clone();
        async move { client.fetch_project_categories().await }.boxed()
    }
}

/// Resolution of a project-detail fetch. `elapsed` is the wall-clock
/// fetch duration, for callers that synchronize a minimum perceived
/// loading time; it is zero on cache hits.
#[derive(Debug, Clone)]
pub struct DetailOutcome {
    pub project: Option<Project>,
    pub elapsed: Duration,
}

/// Deduplicating fetcher for the parametric project-detail family.
pub struct ProjectDetailCoordinator {
    source: Arc<dyn ProjectSource>,
    cache: Arc<CacheStore>,
    in_flight: Arc<Mutex<HashMap<i64, SharedFetch<DetailOutcome>>>>,
    last_fetch: Mutex<Option<Duration>>,
}

impl ProjectDetailCoordinator {
    pub fn new(source: Arc<dyn ProjectSource>, cache: Arc<CacheStore>) -> Self {
        Self {
            source,
            cache,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            last_fetch: Mutex::new(None),
        }
    }

    /// Fetch one project detail: cache first, then join any in-flight
    /// request for the same id, then start a new one.
    pub async fn fetch(&self, id: i64) -> DetailOutcome {
        if let Some(project) = self.cache.get_project_detail::<Project>(id) {
            return DetailOutcome {
                project: Some(project),
                elapsed: Duration::ZERO,
            };
        }

        let fut = {
            let mut in_flight = self.in_flight.lock().unwrap();
            if let Some(existing) = in_flight.get(&id) {
                debug!(id, "Joining in-flight project detail request");
                existing.clone()
            } else {
                let source = Arc::clone(&self.source);
                let cache = Arc::clone(&self.cache);
                let registry = Arc::clone(&self.in_flight);
                let fut = async move {
                    let started = Instant::now();
                    let result = source.project_detail(id).await;
                    // Deregister on settlement, success or failure, so a
                    // failed attempt never blocks future fetches.
                    registry.lock().unwrap().remove(&id);
                    match result {
                        Ok(project) => {
                            cache.set_project_detail(id, &project, None);
                            DetailOutcome {
                                project: Some(project),
                                elapsed: started.elapsed(),
                            }
                        }
                        Err(e) => {
                            warn!(id, error = %e, "Project detail fetch failed");
                            DetailOutcome {
                                project: None,
                                elapsed: started.elapsed(),
                            }
                        }
                    }
                }
                .boxed()
                .shared();
                in_flight.insert(id, fut.clone());
                fut
            }
        };

        let outcome = fut.await;
        *self.last_fetch.lock().unwrap() = Some(outcome.elapsed);
        outcome
    }

    /// Duration of the most recent network fetch, if any completed.
    pub fn last_fetch_duration(&self) -> Option<Duration> {
        *self.last_fetch.lock().unwrap()
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().unwrap().len()
    }
}

/// Singleton fetch coordinator for the project-category list: one shared
/// in-flight request for the whole resource.
pub struct CategoryCoordinator {
    source: Arc<dyn ProjectSource>,
    cache: Arc<CacheStore>,
    in_flight: Arc<Mutex<Option<SharedFetch<Option<Vec<ProjectCategory>>>>>>,
}

impl CategoryCoordinator {
    pub fn new(source: Arc<dyn ProjectSource>, cache: Arc<CacheStore>) -> Self {
        Self {
            source,
            cache,
            in_flight: Arc::new(Mutex::new(None)),
        }
    }

    /// Fetch the category list, joining any request already in flight.
    /// Resolves to `None` when the network attempt fails.
    pub async fn fetch(&self) -> Option<Vec<ProjectCategory>> {
        if let Some(categories) = self.cache.get::<Vec<ProjectCategory>>(keys::PROJECT_CATEGORIES) {
            return Some(categories);
        }

        let fut = {
            let mut slot = self.in_flight.lock().unwrap();
            if let Some(existing) = slot.as_ref() {
                debug!("Joining in-flight project categories request");
                existing.clone()
            } else {
                let source = Arc::clone(&self.source);
                let cache = Arc::clone(&self.cache);
                let registry = Arc::clone(&self.in_flight);
                let fut = async move {
                    let result = source.project_categories().await;
                    registry.lock().unwrap().take();
                    match result {
                        Ok(categories) => {
                            cache.set(keys::PROJECT_CATEGORIES, &categories, Some(CATEGORIES_TTL));
                            Some(categories)
                        }
                        Err(e) => {
                            warn!(error = %e, "Project categories fetch failed");
                            None
                        }
                    }
                }
                .boxed()
                .shared();
                *slot = Some(fut.clone());
                fut
            }
        };

        fut.await
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.lock().unwrap().is_some()
    }
}

// ============================================================================
// Tests
// ============================================================================
