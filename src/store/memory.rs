//! In-process [`Repository`] used by tests and local experiments.
//!
//! Mirrors the Postgres semantics closely enough for the aggregator and the
//! router tests: digest lookups skip revoked keys, sessions are append-only and
//! snapshots are keyed by `(app_id, window_label)`.

use std::{
    collections::{BTreeMap, HashMap},
    sync::atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Repository, StoreError};
use crate::models::{
    api_key::{ApiKey, NewApiKey},
    app::App,
    leaderboard::{AppScoreStats, LeaderboardSnapshot},
    session::{NewSession, Session},
};

#[derive(Default)]
struct Tables {
    apps: HashMap<String, App>,
    api_keys: HashMap<Uuid, ApiKey>,
    sessions: Vec<Session>,
    snapshots: BTreeMap<(String, String), LeaderboardSnapshot>,
}

#[derive(Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
    fail_writes: AtomicBool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every session insert and snapshot upsert fail with
    /// [`StoreError::Unavailable`] until switched off again.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Inserts a session with an explicit arrival time.
    pub async fn insert_session_at(&self, new_session: NewSession, created_at: DateTime<Utc>) -> Result<Session, StoreError> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        if !tables.apps.contains_key(&new_session.app_id) {
            return Err(StoreError::Unavailable(format!(
                "app {} does not exist",
                new_session.app_id
            )));
        }
        let session = Session {
            id: Uuid::new_v4(),
            app_id: new_session.app_id,
            session_id: new_session.session_id,
            swip_score: i32::from(new_session.swip_score),
            hr: new_session.hr.map(Json),
            rr: new_session.rr.map(Json),
            sdnn: new_session.sdnn,
            rmssd: new_session.rmssd,
            emotion: new_session.emotion,
            captured_at: new_session.captured_at,
            created_at,
        };
        tables.sessions.push(session.clone());
        Ok(session)
    }

    pub async fn sessions(&self) -> Vec<Session> {
        self.tables.read().await.sessions.clone()
    }

    pub async fn snapshots(&self) -> Vec<LeaderboardSnapshot> {
        self.tables.read().await.snapshots.values().cloned().collect()
    }

    pub async fn api_key(&self, key_id: Uuid) -> Option<ApiKey> {
        self.tables.read().await.api_keys.get(&key_id).cloned()
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn create_app(&self, name: &str, owner_id: &str) -> Result<App, StoreError> {
        let app = App {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.tables
            .write()
            .await
            .apps
            .insert(app.id.clone(), app.clone());
        Ok(app)
    }

    async fn app_exists(&self, app_id: &str) -> Result<bool, StoreError> {
        Ok(self.tables.read().await.apps.contains_key(app_id))
    }

    async fn insert_api_key(&self, new_key: NewApiKey) -> Result<ApiKey, StoreError> {
        let mut tables = self.tables.write().await;
        if tables
            .api_keys
            .values()
            .any(|k| k.lookup_digest == new_key.lookup_digest)
        {
            return Err(StoreError::Unavailable(
                "duplicate lookup digest".to_string(),
            ));
        }
        let key = ApiKey {
            id: Uuid::new_v4(),
            app_id: new_key.app_id,
            key_hash: new_key.key_hash,
            lookup_digest: new_key.lookup_digest,
            revoked: false,
            created_at: Utc::now(),
            last_used_at: None,
        };
        tables.api_keys.insert(key.id, key.clone());
        Ok(key)
    }

    async fn list_api_keys(&self, app_id: &str) -> Result<Vec<ApiKey>, StoreError> {
        let tables = self.tables.read().await;
        let mut keys: Vec<ApiKey> = tables
            .api_keys
            .values()
            .filter(|k| k.app_id == app_id)
            .cloned()
            .collect();
        keys.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(keys)
    }

    async fn find_active_key_by_digest(&self, digest: &str) -> Result<Option<ApiKey>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .api_keys
            .values()
            .find(|k| k.lookup_digest == digest && !k.revoked)
            .cloned())
    }

    async fn touch_api_key(&self, key_id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        if let Some(key) = self.tables.write().await.api_keys.get_mut(&key_id) {
            key.last_used_at = Some(at);
        }
        Ok(())
    }

    async fn revoke_api_key(&self, key_id: Uuid) -> Result<Option<ApiKey>, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables.api_keys.get_mut(&key_id).map(|key| {
            key.revoked = true;
            key.clone()
        }))
    }

    async fn delete_api_key(&self, key_id: Uuid) -> Result<bool, StoreError> {
        Ok(self
            .tables
            .write()
            .await
            .api_keys
            .remove(&key_id)
            .is_some())
    }

    async fn insert_session(&self, new_session: NewSession) -> Result<Session, StoreError> {
        self.insert_session_at(new_session, Utc::now()).await
    }

    async fn session_score_stats(&self, since: DateTime<Utc>) -> Result<Vec<AppScoreStats>, StoreError> {
        let tables = self.tables.read().await;
        let mut totals: BTreeMap<&str, (i64, i64)> = BTreeMap::new();
        for session in tables.sessions.iter().filter(|s| s.created_at >= since) {
            let entry = totals.entry(session.app_id.as_str()).or_default();
            entry.0 += i64::from(session.swip_score);
            entry.1 += 1;
        }
        Ok(totals
            .into_iter()
            .map(|(app_id, (sum, count))| AppScoreStats {
                app_id: app_id.to_string(),
                avg_score: sum as f64 / count as f64,
                session_count: count,
            })
            .collect())
    }

    async fn upsert_leaderboard_snapshot(&self, snapshot: &LeaderboardSnapshot) -> Result<(), StoreError> {
        self.check_writable()?;
        self.tables.write().await.snapshots.insert(
            (snapshot.app_id.clone(), snapshot.window_label.clone()),
            snapshot.clone(),
        );
        Ok(())
    }

    async fn leaderboard(&self, window_label: &str, limit: i64) -> Result<Vec<LeaderboardSnapshot>, StoreError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<LeaderboardSnapshot> = tables
            .snapshots
            .values()
            .filter(|s| s.window_label == window_label)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.avg_score
                .total_cmp(&a.avg_score)
                .then(b.session_count.cmp(&a.session_count))
                .then(a.app_id.cmp(&b.app_id))
        });
        rows.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(rows)
    }
}
