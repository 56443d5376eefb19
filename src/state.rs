//! Shared application state.

use std::{sync::Arc, time::Duration};

use crate::{
    services::{
        api_keys::KeyHasher, leaderboard_service::LeaderboardHandle, rate_limiter::RateLimiter,
    },
    store::Repository,
};

/// Quota for one group of routes, counted per client IP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Namespace of the counter key, e.g. `ingest`
    pub scope: &'static str,
    pub limit: u32,
    pub window: Duration,
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimits {
    pub ingest: RateLimitPolicy,
    pub management: RateLimitPolicy,
    pub leaderboard: RateLimitPolicy,
}

impl RateLimits {
    pub fn new(ingest: (u32, Duration), management: (u32, Duration)) -> Self {
        Self {
            ingest: RateLimitPolicy {
                scope: "ingest",
                limit: ingest.0,
                window: ingest.1,
            },
            management: RateLimitPolicy {
                scope: "mgmt",
                limit: management.0,
                window: management.1,
            },
            // Public reads share the ingestion quota size
            leaderboard: RateLimitPolicy {
                scope: "leaderboard",
                limit: ingest.0,
                window: ingest.1,
            },
        }
    }
}

/// Everything a handler or middleware needs, built once in `main`.
///
/// Cloning is cheap: every field is a handle or an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repository>,
    pub rate_limiter: RateLimiter,
    pub hasher: KeyHasher,
    pub leaderboard: LeaderboardHandle,
    pub limits: RateLimits,
    /// Key rate limits on proxy headers instead of the peer address
    pub trust_proxy_headers: bool,
    /// `None` disables the management routes
    pub admin_token: Option<Arc<str>>,
}
