//! Sliding-window rate limiting.
//!
//! The limiter asks a [`CounterStore`] for one atomic trim/count/record round
//! trip per request. When the store is unreachable it fails open: the request
//! is let through with a [`RateLimitOutcome::Degraded`] decision and the error
//! is logged, so an outage of the counter store never becomes an outage of
//! ingestion.

use std::{sync::Arc, time::Duration};

use axum::http::{HeaderMap, HeaderValue};
use chrono::Utc;

use crate::store::counter::CounterStore;

pub const HEADER_LIMIT: &str = "x-ratelimit-limit";
pub const HEADER_REMAINING: &str = "x-ratelimit-remaining";
pub const HEADER_RESET: &str = "x-ratelimit-reset";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitOutcome {
    /// Counted against the window and under the limit
    Allowed,
    /// The window is full
    Denied,
    /// The counter store failed; let through without being counted
    Degraded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub outcome: RateLimitOutcome,
    pub limit: u32,
    pub remaining: u32,
    /// Milliseconds until the oldest entry leaves the window
    pub reset_ms: u64,
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        !matches!(self.outcome, RateLimitOutcome::Denied)
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.outcome, RateLimitOutcome::Degraded)
    }

    /// `Retry-After` value in whole seconds, rounded up.
    pub fn retry_after_secs(&self) -> u64 {
        self.reset_ms.div_ceil(1000)
    }

    /// Adds the `X-RateLimit-*` telemetry headers.
    pub fn apply_headers(&self, headers: &mut HeaderMap) {
        headers.insert(HEADER_LIMIT, HeaderValue::from(self.limit));
        headers.insert(HEADER_REMAINING, HeaderValue::from(self.remaining));
        headers.insert(HEADER_RESET, HeaderValue::from(self.reset_ms));
    }
}

/// Cheap to clone; all clones share one counter store.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self { store }
    }

    pub fn backend_type(&self) -> &'static str {
        self.store.backend_type()
    }

    /// Whether the counter store currently answers.
    pub async fn store_reachable(&self) -> bool {
        match self.store.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(backend = self.store.backend_type(), error = %e, "rate limit store ping failed");
                false
            }
        }
    }

    pub async fn check(&self, key: &str, limit: u32, window: Duration) -> RateLimitDecision {
        self.check_at(key, limit, window, Utc::now().timestamp_millis())
            .await
    }

    /// Same as [`RateLimiter::check`] with an explicit clock reading.
    pub async fn check_at(&self, key: &str, limit: u32, window: Duration, now_ms: i64) -> RateLimitDecision {
        let window_ms = i64::try_from(window.as_millis()).unwrap_or(i64::MAX);

        let reply = match self
            .store
            .sliding_window(key, now_ms, window_ms, u64::from(limit))
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(
                    key,
                    backend = self.store.backend_type(),
                    error = %e,
                    "rate limit store unavailable, failing open"
                );
                return RateLimitDecision {
                    outcome: RateLimitOutcome::Degraded,
                    limit,
                    remaining: limit.saturating_sub(1),
                    reset_ms: window_ms.max(0) as u64,
                };
            }
        };

        let reset_ms = reply
            .oldest_ms
            .map(|oldest| (oldest + window_ms - now_ms).max(0) as u64)
            .unwrap_or(window_ms.max(0) as u64);

        if reply.recorded {
            let used = u32::try_from(reply.count).unwrap_or(u32::MAX);
            RateLimitDecision {
                outcome: RateLimitOutcome::Allowed,
                limit,
                remaining: limit.saturating_sub(used).saturating_sub(1),
                reset_ms,
            }
        } else {
            tracing::debug!(key, limit, "rate limit exceeded");
            RateLimitDecision {
                outcome: RateLimitOutcome::Denied,
                limit,
                remaining: 0,
                reset_ms,
            }
        }
    }
}
