//! Shared counter store behind the sliding-window rate limiter.
//!
//! # Redis Key Patterns
//!
//! ```text
//! {prefix}:{operation}:{discriminator}   → sorted set of request timestamps (ms)
//! ```
//!
//! The trim, count, record and expire steps run inside one Lua script, so two
//! instances racing on the same key can never both take the last slot.

use std::{
    collections::{HashMap, VecDeque},
    time::Duration,
};

use async_trait::async_trait;
use tokio::{sync::Mutex, time::timeout};

#[derive(Debug, thiserror::Error)]
pub enum CounterStoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("counter store timed out after {0:?}")]
    Timeout(Duration),
}

/// Outcome of one sliding-window round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowReply {
    /// Entries inside the window before this request was considered
    pub count: u64,
    /// Whether this request was recorded (i.e. it fit under the limit)
    pub recorded: bool,
    /// Timestamp of the oldest entry still inside the window, if any
    pub oldest_ms: Option<i64>,
}

#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically drops entries at or before `now_ms - window_ms`, counts the
    /// rest, and records `now_ms` when the count is below `limit`.
    async fn sliding_window(
        &self,
        key: &str,
        now_ms: i64,
        window_ms: i64,
        limit: u64,
    ) -> Result<WindowReply, CounterStoreError>;

    async fn ping(&self) -> Result<(), CounterStoreError>;

    fn backend_type(&self) -> &'static str;
}

const SLIDING_WINDOW_SCRIPT: &str = r#"
local key = KEYS[1]
local now = tonumber(ARGV[1])
local window = tonumber(ARGV[2])
local limit = tonumber(ARGV[3])
local member = ARGV[4]

redis.call('ZREMRANGEBYSCORE', key, '-inf', now - window)
local count = redis.call('ZCARD', key)
local recorded = 0
if count < limit then
  redis.call('ZADD', key, now, member)
  redis.call('PEXPIRE', key, window)
  recorded = 1
end

local oldest = -1
local first = redis.call('ZRANGE', key, 0, 0, 'WITHSCORES')
if first[2] then
  oldest = tonumber(first[2])
end
return {count, recorded, oldest}
"#;

/// Redis sorted-set counters, shared by every instance of the service.
pub struct RedisCounterStore {
    client: redis::Client,
    prefix: String,
    timeout: Duration,
    script: redis::Script,
}

impl RedisCounterStore {
    /// Opening the client does not connect; connections are made per call so
    /// an unreachable Redis at startup only degrades the limiter.
    pub fn new(url: &str, prefix: &str, timeout: Duration) -> Result<Self, CounterStoreError> {
        let client = redis::Client::open(url)?;
        Ok(Self {
            client,
            prefix: prefix.to_string(),
            timeout,
            script: redis::Script::new(SLIDING_WINDOW_SCRIPT),
        })
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}:{key}", self.prefix)
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn sliding_window(
        &self,
        key: &str,
        now_ms: i64,
        window_ms: i64,
        limit: u64,
    ) -> Result<WindowReply, CounterStoreError> {
        let redis_key = self.namespaced(key);
        // Unique member so concurrent requests in the same millisecond all count
        let member = format!("{now_ms}-{:016x}", rand::random::<u64>());

        let round_trip = async {
            let mut conn = self.client.get_multiplexed_async_connection().await?;
            let reply: (i64, i64, i64) = self
                .script
                .key(&redis_key)
                .arg(now_ms)
                .arg(window_ms)
                .arg(limit)
                .arg(&member)
                .invoke_async(&mut conn)
                .await?;
            Ok::<_, CounterStoreError>(reply)
        };

        let (count, recorded, oldest) = timeout(self.timeout, round_trip)
            .await
            .map_err(|_| CounterStoreError::Timeout(self.timeout))??;

        Ok(WindowReply {
            count: u64::try_from(count).unwrap_or(0),
            recorded: recorded == 1,
            oldest_ms: (oldest >= 0).then_some(oldest),
        })
    }

    async fn ping(&self) -> Result<(), CounterStoreError> {
        let round_trip = async {
            let mut conn = self.client.get_multiplexed_async_connection().await?;
            let _pong: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok::<_, CounterStoreError>(())
        };

        timeout(self.timeout, round_trip)
            .await
            .map_err(|_| CounterStoreError::Timeout(self.timeout))?
    }

    fn backend_type(&self) -> &'static str {
        "redis"
    }
}

/// Per-process counters with the same window semantics as the Redis script.
///
/// Each instance grants its own quota, so this is only correct for a single
/// process (local development and tests).
#[derive(Default)]
pub struct MemoryCounterStore {
    windows: Mutex<HashMap<String, VecDeque<i64>>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn sliding_window(
        &self,
        key: &str,
        now_ms: i64,
        window_ms: i64,
        limit: u64,
    ) -> Result<WindowReply, CounterStoreError> {
        let mut windows = self.windows.lock().await;
        let entries = windows.entry(key.to_string()).or_default();

        let cutoff = now_ms - window_ms;
        while entries.front().is_some_and(|ts| *ts <= cutoff) {
            entries.pop_front();
        }

        let count = entries.len() as u64;
        let recorded = count < limit;
        if recorded {
            entries.push_back(now_ms);
        }
        let oldest_ms = entries.front().copied();

        if entries.is_empty() {
            windows.remove(key);
        }

        Ok(WindowReply {
            count,
            recorded,
            oldest_ms,
        })
    }

    async fn ping(&self) -> Result<(), CounterStoreError> {
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}
