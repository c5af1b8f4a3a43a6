//! Shared counter store abstraction and implementations.

mod memory;
mod redis;

pub use memory::MemoryCounterStore;
pub use redis::RedisCounterStore;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by a counter store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("store connection error: {0}")]
    Connection(String),

    /// The store answered, but not in a way the client understood.
    #[error("store protocol error: {0}")]
    Protocol(String),

    /// The store did not answer in time.
    #[error("store operation timed out")]
    Timeout,
}

/// Post-increment state of a window counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    /// The counter value after this increment.
    pub count: u64,
    /// Remaining lifetime of the window, if the key carries an expiry.
    pub ttl: Option<Duration>,
}

/// Trait for shared counter store implementations.
///
/// This trait abstracts over the Redis-backed `RedisCounterStore` and the
/// in-process `MemoryCounterStore` to allow the engine to work with either.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically increment the counter at `key` and report the result.
    ///
    /// The increment that creates the key starts a new window: the key's
    /// expiry is set to `window` as part of the same atomic operation.
    /// Concurrent increments for the same key observe a total order of
    /// successor values.
    async fn increment(&self, key: &str, window: Duration) -> Result<WindowState, StoreError>;

    /// Remaining lifetime of `key`.
    ///
    /// Returns `None` if the key does not exist or carries no expiry.
    async fn time_to_live(&self, key: &str) -> Result<Option<Duration>, StoreError>;
}
