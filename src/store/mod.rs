//! Storage seams.
//!
//! - [`Repository`]: the relational store (apps, keys, sessions, leaderboard)
//! - [`counter::CounterStore`]: the shared counter store behind the rate limiter
//!
//! Both are trait objects constructed once in `main` and injected through
//! [`crate::state::AppState`], so handlers never reach for a global client.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    api_key::{ApiKey, NewApiKey},
    app::App,
    leaderboard::{AppScoreStats, LeaderboardSnapshot},
    session::{NewSession, Session},
};

pub mod counter;
pub mod memory;
pub mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PgRepository;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Relational store used by the ingestion path, the aggregator and the
/// management routes.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Cheap connectivity check for `/health`.
    async fn ping(&self) -> Result<(), StoreError>;

    async fn create_app(&self, name: &str, owner_id: &str) -> Result<App, StoreError>;

    async fn app_exists(&self, app_id: &str) -> Result<bool, StoreError>;

    async fn insert_api_key(&self, new_key: NewApiKey) -> Result<ApiKey, StoreError>;

    async fn list_api_keys(&self, app_id: &str) -> Result<Vec<ApiKey>, StoreError>;

    /// The at-most-one non-revoked key whose lookup digest equals `digest`.
    async fn find_active_key_by_digest(&self, digest: &str) -> Result<Option<ApiKey>, StoreError>;

    async fn touch_api_key(&self, key_id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Marks the key revoked and returns it, or `None` if it does not exist.
    async fn revoke_api_key(&self, key_id: Uuid) -> Result<Option<ApiKey>, StoreError>;

    /// Returns whether a row was deleted.
    async fn delete_api_key(&self, key_id: Uuid) -> Result<bool, StoreError>;

    async fn insert_session(&self, new_session: NewSession) -> Result<Session, StoreError>;

    /// Average score and session count per app over sessions created at or after `since`.
    async fn session_score_stats(&self, since: DateTime<Utc>) -> Result<Vec<AppScoreStats>, StoreError>;

    /// Inserts or replaces the snapshot keyed by `(app_id, window_label)`.
    async fn upsert_leaderboard_snapshot(&self, snapshot: &LeaderboardSnapshot) -> Result<(), StoreError>;

    /// Snapshots of one window, best first.
    async fn leaderboard(&self, window_label: &str, limit: i64) -> Result<Vec<LeaderboardSnapshot>, StoreError>;
}
