//! Redis-backed counter store.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, Script};
use tracing::{debug, trace};

use super::{CounterStore, StoreError, WindowState};

/// Increment the key, start the window on creation, and read the remaining
/// TTL, all in one atomic server-side unit. Splitting the INCR from the
/// EXPIRE would leave a key with no expiry if the client died between the
/// two calls, locking the identity out permanently.
const INCREMENT_SCRIPT: &str = r#"
local count = redis.call("INCR", KEYS[1])
if count == 1 then
    redis.call("PEXPIRE", KEYS[1], ARGV[1])
end
return {count, redis.call("PTTL", KEYS[1])}
"#;

/// A counter store backed by a shared Redis instance.
///
/// All gate processes pointing at the same Redis see the same counters, which
/// is what makes the admission decision consistent across a fleet. The
/// underlying `ConnectionManager` reconnects on its own; this store never
/// retries an operation itself.
pub struct RedisCounterStore {
    connection: ConnectionManager,
    increment_script: Script,
}

impl RedisCounterStore {
    /// Create a store from an existing Redis client.
    pub async fn connect(client: Client) -> Result<Self, StoreError> {
        let connection = client
            .get_connection_manager()
            .await
            .map_err(StoreError::from)?;

        debug!("Connected to Redis counter store");

        Ok(Self {
            connection,
            increment_script: Script::new(INCREMENT_SCRIPT),
        })
    }

    /// Create a store from a Redis connection URL.
    pub async fn from_url(url: &str) -> Result<Self, StoreError> {
        let client = Client::open(url).map_err(StoreError::from)?;
        Self::connect(client).await
    }

    /// Probe the store.
    ///
    /// Useful from a health endpoint to report store reachability.
    pub async fn ping(&self) -> Result<(), StoreError> {
        let mut connection = self.connection.clone();
        let () = redis::cmd("PING")
            .query_async(&mut connection)
            .await
            .map_err(StoreError::from)?;
        Ok(())
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn increment(&self, key: &str, window: Duration) -> Result<WindowState, StoreError> {
        let mut connection = self.connection.clone();

        let (count, ttl_ms): (u64, i64) = self
            .increment_script
            .key(key)
            .arg(window.as_millis() as u64)
            .invoke_async(&mut connection)
            .await
            .map_err(StoreError::from)?;

        trace!(key = %key, count = count, ttl_ms = ttl_ms, "Incremented counter");

        Ok(WindowState {
            count,
            ttl: ttl_from_millis(ttl_ms),
        })
    }

    async fn time_to_live(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        let mut connection = self.connection.clone();

        let ttl_ms: i64 = redis::cmd("PTTL")
            .arg(key)
            .query_async(&mut connection)
            .await
            .map_err(StoreError::from)?;

        Ok(ttl_from_millis(ttl_ms))
    }
}

/// PTTL reports -2 for a missing key and -1 for a key with no expiry.
fn ttl_from_millis(ttl_ms: i64) -> Option<Duration> {
    if ttl_ms >= 0 {
        Some(Duration::from_millis(ttl_ms as u64))
    } else {
        None
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_timeout() {
            StoreError::Timeout
        } else if err.is_io_error() || err.is_connection_refusal() || err.is_connection_dropped() {
            StoreError::Connection(err.to_string())
        } else {
            StoreError::Protocol(err.to_string())
        }
    }
}
