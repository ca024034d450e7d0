//! Resource loading orchestration.
//!
//! Every resource family loads through the same fixed procedure:
//!
//! 1. In fallback mode, serve valid cache if present, else bundled data.
//!    No network is touched until an explicit reset.
//! 2. Serve valid cache. A cache hit is not a network success and must
//!    not reset retry state; the backend may still be down.
//! 3. Ask the retry manager for permission. A refusal here means the key
//!    just transitioned into fallback mode: serve fallback and notify.
//! 4. Fetch. Success caches (inside the fetcher), records the success,
//!    and returns fresh data.
//! 5. Failure records the failure, then either sleeps out the backoff
//!    delay and re-enters the procedure from the top, or, when retries
//!    are exhausted, serves cache-if-valid else bundled data and
//!    notifies.
//!
//! Fetchers are closures so callers decide what a "fetch" is (plain API
//! call, deduplicated coordinator, test script) and own the cache write.

use std::future::Future;

use tracing::debug;

use crate::notify::NotificationBus;
use crate::retry::RetryManager;

/// Where the data in a `ResourceState` came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    /// Fresh data from the network.
    Network,
    /// A valid cached entry.
    Cache,
    /// Bundled fallback content.
    Fallback,
    /// Nothing available: no network, no cache, no bundled record.
    Missing,
}

/// UI-facing result of loading one resource.
#[derive(Debug, Clone)]
pub struct ResourceState<T> {
    pub data: Option<T>,
    /// Descriptive error for optional display; set whenever the data is
    /// not fresh from the network or a cache hit.
    pub error: Option<String>,
    pub is_fetching: bool,
    pub has_fetched: bool,
    pub source: DataSource,
}

impl<T> ResourceState<T> {
    fn from_network(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            is_fetching: false,
            has_fetched: true,
            source: DataSource::Network,
        }
    }

    fn from_cache(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            is_fetching: false,
            has_fetched: true,
            source: DataSource::Cache,
        }
    }

    /// Cached data served because the network is unavailable.
    fn degraded(data: T, error: String) -> Self {
        Self {
            data: Some(data),
            error: Some(error),
            is_fetching: false,
            has_fetched: true,
            source: DataSource::Cache,
        }
    }

    fn fallback(data: Option<T>, error: String) -> Self {
        let source = if data.is_some() {
            DataSource::Fallback
        } else {
            DataSource::Missing
        };
        Self {
            data,
            error: Some(error),
            is_fetching: false,
            has_fetched: true,
            source,
        }
    }
}

fn fallback_error(key: &str) -> String {
    format!("{} is temporarily served from bundled content", key)
}

/// Run the fixed load procedure for one resource key.
///
/// `probe` reads the cache, `fetch` performs the network call (and owns
/// the cache write on success), `fallback_data` produces the bundled
/// dataset. The future completes only once a final state is reached;
/// backoff delays are slept inline between attempts.
pub async fn load_with_retry<T, P, F, Fut, B>(
    retry: &RetryManager,
    notifier: &NotificationBus,
    key: &str,
    probe: P,
    fetch: F,
    fallback_data: B,
) -> ResourceState<T>
where
    P: Fn() -> Option<T>,
    F: Fn() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
    B: Fn() -> Option<T>,
{
    loop {
        if retry.is_in_fallback_mode(key) {
            if let Some(cached) = probe() {
                return ResourceState::degraded(cached, fallback_error(key));
            }
            return ResourceState::fallback(fallback_data(), fallback_error(key));
        }

        if let Some(cached) = probe() {
            return ResourceState::from_cache(cached);
        }

        if !retry.should_retry(key) {
            // The gate just performed the Fresh -> Fallback transition
            notifier.notify_fallback(key);
            return ResourceState::fallback(fallback_data(), fallback_error(key));
        }

        match fetch().await {
            Ok(data) => {
                retry.record_success(key);
                return ResourceState::from_network(data);
            }
            Err(e) => {
                retry.record_failure(key);
                if retry.should_retry(key) {
                    let delay = retry.get_retry_delay(key);
                    debug!(
                        key,
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "Fetch failed, retrying after backoff"
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }

                notifier.notify_fallback(key);
                if let Some(cached) = probe() {
                    return ResourceState::degraded(
                        cached,
                        format!("{} request failed: {}", key, e),
                    );
                }
                return ResourceState::fallback(
                    fallback_data(),
                    format!("{} request failed: {}", key, e),
                );
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
