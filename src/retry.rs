//! Per-resource retry and fallback state machine.
//!
//! Each resource key tracks a failure count and a fallback flag. Failures
//! only increment the count; the transition into fallback mode happens on
//! the next `should_retry` call once the count reaches `MAX_RETRIES`.
//! Call sites rely on that one-call grace window, so `record_failure`
//! must never engage fallback itself.
//!
//! The manager owns no timers. Callers schedule their own retry delays
//! and are responsible for abandoning them after `reset_retry_state`.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use rand::Rng;
use tracing::debug;

// ============================================================================
// Constants
// ============================================================================

/// Failures tolerated per key before fallback mode engages.
pub const MAX_RETRIES: u32 = 3;

/// First backoff delay in milliseconds; doubles per recorded failure.
const BASE_DELAY_MS: u64 = 1000;

/// Ceiling for the computed delay, jitter included.
const MAX_DELAY_MS: u64 = 10_000;

/// Upper bound (exclusive) of the uniform jitter added to each delay.
const JITTER_MS: u64 = 1000;

/// Retry bookkeeping for one resource key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryState {
    pub retry_count: u32,
    pub in_fallback_mode: bool,
}

/// Tracks failure counts and fallback mode per resource key.
pub struct RetryManager {
    states: Mutex<HashMap<String, RetryState>>,
}

impl RetryManager {
    pub fn new() -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Whether a network attempt is permitted for this key.
    ///
    /// Returns false once in fallback mode, and performs the transition
    /// into fallback mode when the failure count has reached the limit.
    pub fn should_retry(&self, key: &str) -> bool {
        let mut states = self.states.lock().unwrap();
        let state = states.entry(key.to_string()).or_default();

        if state.in_fallback_mode {
            return false;
        }
        if state.retry_count >= MAX_RETRIES {
            state.in_fallback_mode = true;
            debug!(key, retries = state.retry_count, "Entering fallback mode");
            return false;
        }
        true
    }

    /// Record a failed network attempt. Only increments the count; the
    /// fallback decision belongs to the next `should_retry` call.
    pub fn record_failure(&self, key: &str) {
        let mut states = self.states.lock().unwrap();
        let state = states.entry(key.to_string()).or_default();
        state.retry_count += 1;
        debug!(key, retries = state.retry_count, "Recorded fetch failure");
    }

    /// Record a genuine network success, resetting the key to fresh.
    /// Cache hits must not be recorded here: serving stale cache says
    /// nothing about whether the backend has recovered.
    pub fn record_success(&self, key: &str) {
        let mut states = self.states.lock().unwrap();
        if states.remove(key).is_some() {
            debug!(key, "Recorded fetch success, retry state reset");
        }
    }

    /// Exponential backoff with jitter for the next attempt on this key.
    pub fn get_retry_delay(&self, key: &str) -> Duration {
        let retry_count = self.get_retry_count(key);
        // 2^(n-1) with the exponent capped well below overflow
        let exponent = retry_count.saturating_sub(1).min(10);
        let base = BASE_DELAY_MS.saturating_mul(1 << exponent);
        let jitter = rand::thread_rng().gen_range(0..JITTER_MS);
        Duration::from_millis((base + jitter).min(MAX_DELAY_MS))
    }

    pub fn is_in_fallback_mode(&self, key: &str) -> bool {
        self.states
            .lock()
            .unwrap()
            .get(key)
            .map(|s| s.in_fallback_mode)
            .unwrap_or(false)
    }

    /// Manual reset to fresh, for user-triggered "retry connection"
    /// actions. Does not cancel retry timers owned by callers.
    pub fn reset_retry_state(&self, key: &str) {
        if self.states.lock().unwrap().remove(key).is_some() {
            debug!(key, "Retry state manually reset");
        }
    }

    /// Reset every tracked key at once.
    pub fn reset_all(&self) {
        let mut states = self.states.lock().unwrap();
        if !states.is_empty() {
            debug!(keys = states.len(), "All retry state reset");
            states.clear();
        }
    }

    pub fn get_retry_count(&self, key: &str) -> u32 {
        self.states
            .lock()
            .unwrap()
            .get(key)
            .map(|s| s.retry_count)
            .unwrap_or(0)
    }

    /// Snapshot of all tracked states, for diagnostics and tests.
    pub fn get_retry_states(&self) -> HashMap<String, RetryState> {
        self.states.lock().unwrap().clone()
    }
}

impl Default for RetryManager {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_key_may_retry() {
        let manager = RetryManager::new();
        assert!(manager.should_retry("projects"));
        assert!(!manager.is_in_fallback_mode("projects"));
        assert_eq!(manager.get_retry_count("projects"), 0);
    }

    #[test]
    fn test_three_failures_then_fallback() {
        let manager = RetryManager::new();
        for _ in 0..MAX_RETRIES {
            manager.record_failure("projects");
        }
        // The transition is lazy: recording the third failure does not
        // engage fallback until should_retry observes the count.
        assert!(!manager.is_in_fallback_mode("projects"));
        assert!(!manager.should_retry("projects"));
        assert!(manager.is_in_fallback_mode("projects"));
        // Still refused afterwards
        assert!(!manager.should_retry("projects"));
    }

    #[test]
    fn test_success_resets_state() {
        let manager = RetryManager::new();
        manager.record_failure("skills");
        manager.record_failure("skills");
        manager.record_success("skills");
        assert_eq!(manager.get_retry_count("skills"), 0);
        assert!(!manager.is_in_fallback_mode("skills"));
        assert!(manager.should_retry("skills"));
    }

    #[test]
    fn test_success_clears_fallback_mode() {
        let manager = RetryManager::new();
        for _ in 0..MAX_RETRIES {
            manager.record_failure("skills");
        }
        assert!(!manager.should_retry("skills"));
        manager.record_success("skills");
        assert!(manager.should_retry("skills"));
    }

    #[test]
    fn test_keys_are_independent() {
        let manager = RetryManager::new();
        for _ in 0..MAX_RETRIES {
            manager.record_failure("projects");
        }
        assert!(!manager.should_retry("projects"));
        assert!(manager.should_retry("skills"));
        assert_eq!(manager.get_retry_states().len(), 2);
    }

    #[test]
    fn test_delay_bounds() {
        let manager = RetryManager::new();
        for n in 1..=MAX_RETRIES {
            manager.reset_retry_state("projects");
            for _ in 0..n {
                manager.record_failure("projects");
            }
            let base = BASE_DELAY_MS * 2u64.pow(n - 1);
            for _ in 0..50 {
                let delay = manager.get_retry_delay("projects").as_millis() as u64;
                assert!(delay >= base, "delay {} below base {}", delay, base);
                assert!(delay < base + JITTER_MS, "delay {} above jitter bound", delay);
            }
        }
    }

    #[test]
    fn test_delay_clamped_at_max() {
        let manager = RetryManager::new();
        for _ in 0..5 {
            manager.record_failure("projects");
        }
        // base = 1000 * 2^4 = 16000, always clamped
        for _ in 0..10 {
            assert_eq!(
                manager.get_retry_delay("projects"),
                Duration::from_millis(MAX_DELAY_MS)
            );
        }
    }

    #[test]
    fn test_manual_reset() {
        let manager = RetryManager::new();
        for _ in 0..MAX_RETRIES {
            manager.record_failure("projects");
        }
        assert!(!manager.should_retry("projects"));
        manager.reset_retry_state("projects");
        assert!(manager.should_retry("projects"));
        assert_eq!(manager.get_retry_count("projects"), 0);
    }

    #[test]
    fn test_reset_all() {
        let manager = RetryManager::new();
        manager.record_failure("projects");
        manager.record_failure("projectDetail:7");
        manager.reset_all();
        assert!(manager.get_retry_states().is_empty());
    }
}
