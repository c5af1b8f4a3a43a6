//! Core rate limit decision engine.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::store::{CounterStore, StoreError};

/// Key namespace for window counters in the shared store.
///
/// The prefix partitions the gate's keys from unrelated keys when the store
/// is shared with other tenants.
const KEY_PREFIX: &str = "rate_limit:";

/// The outcome of a single admission check.
///
/// Produced fresh per request; never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The request is within the limit and may proceed.
    Allowed,
    /// The request exceeds the limit and must wait.
    Denied {
        /// Time until the identity's window resets.
        retry_after: Duration,
    },
}

impl Decision {
    /// Whether the request may proceed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }
}

/// The core decision engine: a fixed-window counter over a shared store.
///
/// The engine holds no mutable state of its own; all coordination between
/// concurrent requests, whether in this process or any other, is delegated
/// to the store's atomic increment. One instance serves any number of
/// concurrent checks.
pub struct RateLimitEngine<S: CounterStore> {
    store: Arc<S>,
    limit: u64,
    window: Duration,
    store_timeout: Duration,
}

impl<S: CounterStore> RateLimitEngine<S> {
    /// Create a new engine.
    ///
    /// `limit` and `window` are validated by the gate's configuration before
    /// this is called.
    pub fn new(store: Arc<S>, limit: u64, window: Duration, store_timeout: Duration) -> Self {
        Self {
            store,
            limit,
            window,
            store_timeout,
        }
    }

    /// Check whether a request from `identity` may be admitted.
    ///
    /// Makes exactly one atomic round trip to the store: increment the
    /// identity's window counter, starting the window if this increment
    /// created it, and read the remaining TTL. A round trip that times out
    /// is a store error like any other, so a slow store can never admit a
    /// request the policy would reject.
    pub async fn check(&self, identity: &str) -> Result<Decision, StoreError> {
        let key = format!("{}{}", KEY_PREFIX, identity);

        trace!(key = %key, "Checking rate limit");

        let state = tokio::time::timeout(self.store_timeout, self.store.increment(&key, self.window))
            .await
            .map_err(|_| StoreError::Timeout)??;

        if state.count <= self.limit {
            return Ok(Decision::Allowed);
        }

        let retry_after = match state.ttl {
            Some(ttl) if !ttl.is_zero() => ttl,
            _ => {
                // A counted key with no expiry should not exist; the window
                // length is the safest hint we can give the caller.
                warn!(key = %key, "Counter has no TTL, substituting full window");
                self.window
            }
        };

        debug!(
            key = %key,
            count = state.count,
            limit = self.limit,
            retry_after_secs = retry_after.as_secs(),
            "Rate limit exceeded"
        );

        Ok(Decision::Denied { retry_after })
    }

    /// The configured limit.
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// The configured window length.
    pub fn window(&self) -> Duration {
        self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryCounterStore, WindowState};
    use async_trait::async_trait;

    const WINDOW: Duration = Duration::from_secs(60);
    const TIMEOUT: Duration = Duration::from_secs(1);

    fn test_engine(limit: u64) -> (Arc<MemoryCounterStore>, RateLimitEngine<MemoryCounterStore>) {
        let store = Arc::new(MemoryCounterStore::new());
        let engine = RateLimitEngine::new(store.clone(), limit, WINDOW, TIMEOUT);
        (store, engine)
    }

    /// A store whose every operation fails.
    struct FailingStore;

    #[async_trait]
    impl CounterStore for FailingStore {
        async fn increment(&self, _key: &str, _window: Duration) -> Result<WindowState, StoreError> {
            Err(StoreError::Connection("connection refused".to_string()))
        }

        async fn time_to_live(&self, _key: &str) -> Result<Option<Duration>, StoreError> {
            Err(StoreError::Connection("connection refused".to_string()))
        }
    }

    /// A store that answers slower than any reasonable timeout.
    struct SlowStore;

    #[async_trait]
    impl CounterStore for SlowStore {
        async fn increment(&self, _key: &str, _window: Duration) -> Result<WindowState, StoreError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(WindowState {
                count: 1,
                ttl: Some(WINDOW),
            })
        }

        async fn time_to_live(&self, _key: &str) -> Result<Option<Duration>, StoreError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(None)
        }
    }

    /// A store that reports counts without ever setting an expiry.
    struct NoTtlStore(MemoryCounterStore);

    #[async_trait]
    impl CounterStore for NoTtlStore {
        async fn increment(&self, key: &str, window: Duration) -> Result<WindowState, StoreError> {
            let state = self.0.increment(key, window).await?;
            Ok(WindowState {
                count: state.count,
                ttl: None,
            })
        }

        async fn time_to_live(&self, _key: &str) -> Result<Option<Duration>, StoreError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_checks_up_to_limit_allowed() {
        let (_, engine) = test_engine(5);

        for i in 1..=5 {
            let decision = engine.check("A").await.unwrap();
            assert!(decision.is_allowed(), "check {} should be allowed", i);
        }
    }

    #[tokio::test]
    async fn test_check_over_limit_denied_with_retry_hint() {
        let (_, engine) = test_engine(5);

        for _ in 0..5 {
            engine.check("A").await.unwrap();
        }

        match engine.check("A").await.unwrap() {
            Decision::Denied { retry_after } => {
                assert!(retry_after > Duration::ZERO);
                assert!(retry_after <= WINDOW);
            }
            Decision::Allowed => panic!("6th check should be denied"),
        }
    }

    #[tokio::test]
    async fn test_window_restart_after_eviction() {
        let (store, engine) = test_engine(5);

        for _ in 0..6 {
            engine.check("A").await.unwrap();
        }
        assert!(!engine.check("A").await.unwrap().is_allowed());

        // Simulate the store expiring the key at the window boundary.
        store.remove("rate_limit:A");

        assert!(engine.check("A").await.unwrap().is_allowed());
        assert_eq!(store.current_count("rate_limit:A"), Some(1));
    }

    #[tokio::test]
    async fn test_identities_have_independent_budgets() {
        let (_, engine) = test_engine(5);

        for _ in 0..6 {
            engine.check("A").await.unwrap();
        }
        assert!(!engine.check("A").await.unwrap().is_allowed());

        for i in 1..=5 {
            let decision = engine.check("B").await.unwrap();
            assert!(decision.is_allowed(), "B's check {} should be allowed", i);
        }
    }

    #[tokio::test]
    async fn test_store_failure_surfaces_as_error() {
        let store = Arc::new(FailingStore);
        let engine = RateLimitEngine::new(store, 5, WINDOW, TIMEOUT);

        let result = engine.check("A").await;
        assert!(matches!(result, Err(StoreError::Connection(_))));
    }

    #[tokio::test]
    async fn test_store_timeout_surfaces_as_error() {
        let store = Arc::new(SlowStore);
        let engine = RateLimitEngine::new(store, 5, WINDOW, Duration::from_millis(20));

        let result = engine.check("A").await;
        assert!(matches!(result, Err(StoreError::Timeout)));
    }

    #[tokio::test]
    async fn test_missing_ttl_falls_back_to_window() {
        let store = Arc::new(NoTtlStore(MemoryCounterStore::new()));
        let engine = RateLimitEngine::new(store, 1, WINDOW, TIMEOUT);

        engine.check("A").await.unwrap();

        match engine.check("A").await.unwrap() {
            Decision::Denied { retry_after } => assert_eq!(retry_after, WINDOW),
            Decision::Allowed => panic!("2nd check should be denied"),
        }
    }

    #[tokio::test]
    async fn test_concurrent_checks_admit_at_most_limit() {
        let (_, engine) = test_engine(5);
        let engine = Arc::new(engine);

        let checks = (0..20).map(|_| {
            let engine = engine.clone();
            tokio::spawn(async move { engine.check("A").await.unwrap() })
        });

        let decisions = futures::future::join_all(checks).await;
        let allowed = decisions
            .into_iter()
            .filter(|d| d.as_ref().unwrap().is_allowed())
            .count();

        assert_eq!(allowed, 5);
    }
}
