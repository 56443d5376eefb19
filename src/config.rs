//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use std::time::Duration;

use serde::Deserialize;

/// Which counter store backs the rate limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitBackend {
    /// Shared Redis sorted sets. Required when more than one instance runs.
    Redis,
    /// Per-process counters, for local development only.
    Memory,
}

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `DATABASE_MAX_CONNECTIONS` (optional): pool size, defaults to 5
/// - `REDIS_URL` (optional): counter store for rate limiting
/// - `RATE_LIMIT_BACKEND` (optional): `redis` or `memory`, defaults to `redis`
/// - `RATE_LIMIT_PREFIX` (optional): prefix for every Redis key
/// - `REDIS_TIMEOUT_MS` (optional): upper bound for one rate-limit round trip
/// - `INGEST_RATE_LIMIT` / `INGEST_RATE_WINDOW_MS` (optional): ingestion quota per IP
/// - `MANAGEMENT_RATE_LIMIT` / `MANAGEMENT_RATE_WINDOW_MS` (optional): management quota per IP
/// - `TRUST_PROXY_HEADERS` (optional): key rate limits on `x-forwarded-for` / `x-real-ip`; only
///   enable behind a proxy that overwrites them. Defaults to false (peer address)
/// - `ADMIN_TOKEN` (optional): bearer token for the management routes; unset disables them
/// - `LEADERBOARD_REFRESH_SECS` (optional): periodic leaderboard recompute interval
/// - `ARGON2_MEMORY_KIB` / `ARGON2_ITERATIONS` / `ARGON2_PARALLELISM` (optional): key hashing cost
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,

    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    #[serde(default = "default_rate_limit_backend")]
    pub rate_limit_backend: RateLimitBackend,

    #[serde(default = "default_rate_limit_prefix")]
    pub rate_limit_prefix: String,

    #[serde(default = "default_redis_timeout_ms")]
    pub redis_timeout_ms: u64,

    #[serde(default = "default_ingest_rate_limit")]
    pub ingest_rate_limit: u32,

    #[serde(default = "default_window_ms")]
    pub ingest_rate_window_ms: u64,

    #[serde(default = "default_management_rate_limit")]
    pub management_rate_limit: u32,

    #[serde(default = "default_window_ms")]
    pub management_rate_window_ms: u64,

    #[serde(default)]
    pub trust_proxy_headers: bool,

    #[serde(default)]
    pub admin_token: Option<String>,

    #[serde(default = "default_leaderboard_refresh_secs")]
    pub leaderboard_refresh_secs: u64,

    #[serde(default)]
    pub argon2_memory_kib: Option<u32>,

    #[serde(default)]
    pub argon2_iterations: Option<u32>,

    #[serde(default)]
    pub argon2_parallelism: Option<u32>,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

fn default_max_connections() -> u32 {
    5
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_rate_limit_backend() -> RateLimitBackend {
    RateLimitBackend::Redis
}

fn default_rate_limit_prefix() -> String {
    "swip:rl".to_string()
}

fn default_redis_timeout_ms() -> u64 {
    250
}

fn default_ingest_rate_limit() -> u32 {
    60
}

fn default_management_rate_limit() -> u32 {
    20
}

fn default_window_ms() -> u64 {
    60_000
}

fn default_leaderboard_refresh_secs() -> u64 {
    300
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    pub fn from_env() -> Result<Self, envy::Error> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Field names are automatically converted: database_url -> DATABASE_URL
        envy::from_env::<Config>()
    }

    pub fn redis_timeout(&self) -> Duration {
        Duration::from_millis(self.redis_timeout_ms)
    }

    pub fn leaderboard_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.leaderboard_refresh_secs.max(1))
    }
}
