//! In-process counter store.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use super::{CounterStore, StoreError, WindowState};

/// A window counter held in process memory.
#[derive(Debug, Clone, Copy)]
struct WindowEntry {
    count: u64,
    expires_at: Instant,
}

/// A counter store held entirely in process memory.
///
/// Counters are not shared across processes, so this store is only suitable
/// for single-process deployments and tests. Expired windows are reset lazily
/// on the next increment for the same key.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    counters: DashMap<String, WindowEntry>,
}

impl MemoryCounterStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            counters: DashMap::new(),
        }
    }

    /// Get the current counter value for a key.
    ///
    /// Returns `None` if no live window exists for the key.
    pub fn current_count(&self, key: &str) -> Option<u64> {
        let entry = self.counters.get(key)?;
        if entry.expires_at <= Instant::now() {
            return None;
        }
        Some(entry.count)
    }

    /// Evict a single key, as Redis would on expiry.
    pub fn remove(&self, key: &str) {
        self.counters.remove(key);
    }

    /// Clear all counters.
    ///
    /// This is primarily useful for testing.
    pub fn clear(&self) {
        self.counters.clear();
    }

    /// Get the number of tracked counters, live or expired.
    pub fn counter_count(&self) -> usize {
        self.counters.len()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn increment(&self, key: &str, window: Duration) -> Result<WindowState, StoreError> {
        let now = Instant::now();

        // The map's per-key lock serializes concurrent increments for the
        // same key, giving each caller a unique successor value.
        let mut entry = self
            .counters
            .entry(key.to_string())
            .or_insert(WindowEntry {
                count: 0,
                expires_at: now + window,
            });

        if entry.expires_at <= now {
            entry.count = 0;
            entry.expires_at = now + window;
        }
        entry.count += 1;

        Ok(WindowState {
            count: entry.count,
            ttl: Some(entry.expires_at.saturating_duration_since(now)),
        })
    }

    async fn time_to_live(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        let ttl = self.counters.get(key).and_then(|entry| {
            let remaining = entry.expires_at.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                None
            } else {
                Some(remaining)
            }
        });

        Ok(ttl)
    }
}
