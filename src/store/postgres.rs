//! PostgreSQL implementation of [`Repository`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use super::{Repository, StoreError};
use crate::{
    db::DbPool,
    models::{
        api_key::{ApiKey, NewApiKey},
        app::App,
        leaderboard::{AppScoreStats, LeaderboardSnapshot},
        session::{NewSession, Session},
    },
};

#[derive(Clone)]
pub struct PgRepository {
    pool: DbPool,
}

impl PgRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PgRepository {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn create_app(&self, name: &str, owner_id: &str) -> Result<App, StoreError> {
        let app = sqlx::query_as::<_, App>(
            r#"
            INSERT INTO apps (name, owner_id)
            VALUES ($1, $2)
            RETURNING id, owner_id, name, created_at
            "#,
        )
        .bind(name)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(app)
    }

    async fn app_exists(&self, app_id: &str) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM apps WHERE id = $1)")
            .bind(app_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    async fn insert_api_key(&self, new_key: NewApiKey) -> Result<ApiKey, StoreError> {
        let key = sqlx::query_as::<_, ApiKey>(
            r#"
            INSERT INTO api_keys (app_id, key_hash, lookup_digest)
            VALUES ($1, $2, $3)
            RETURNING id, app_id, key_hash, lookup_digest, revoked, created_at, last_used_at
            "#,
        )
        .bind(&new_key.app_id)
        .bind(&new_key.key_hash)
        .bind(&new_key.lookup_digest)
        .fetch_one(&self.pool)
        .await?;

        Ok(key)
    }

    async fn list_api_keys(&self, app_id: &str) -> Result<Vec<ApiKey>, StoreError> {
        let keys = sqlx::query_as::<_, ApiKey>(
            r#"
            SELECT id, app_id, key_hash, lookup_digest, revoked, created_at, last_used_at
            FROM api_keys
            WHERE app_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(app_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(keys)
    }

    async fn find_active_key_by_digest(&self, digest: &str) -> Result<Option<ApiKey>, StoreError> {
        let key = sqlx::query_as::<_, ApiKey>(
            r#"
            SELECT id, app_id, key_hash, lookup_digest, revoked, created_at, last_used_at
            FROM api_keys
            WHERE lookup_digest = $1 AND revoked = false
            "#,
        )
        .bind(digest)
        .fetch_optional(&self.pool)
        .await?;

        Ok(key)
    }

    async fn touch_api_key(&self, key_id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query("UPDATE api_keys SET last_used_at = $1 WHERE id = $2")
            .bind(at)
            .bind(key_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn revoke_api_key(&self, key_id: Uuid) -> Result<Option<ApiKey>, StoreError> {
        let key = sqlx::query_as::<_, ApiKey>(
            r#"
            UPDATE api_keys SET revoked = true
            WHERE id = $1
            RETURNING id, app_id, key_hash, lookup_digest, revoked, created_at, last_used_at
            "#,
        )
        .bind(key_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(key)
    }

    async fn delete_api_key(&self, key_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM api_keys WHERE id = $1")
            .bind(key_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_session(&self, new_session: NewSession) -> Result<Session, StoreError> {
        // Single statement, so the row is either fully written or not at all
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (
                app_id,
                session_id,
                swip_score,
                hr,
                rr,
                sdnn,
                rmssd,
                emotion,
                captured_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(&new_session.app_id)
        .bind(&new_session.session_id)
        .bind(i32::from(new_session.swip_score))
        .bind(new_session.hr.map(Json))
        .bind(new_session.rr.map(Json))
        .bind(new_session.sdnn)
        .bind(new_session.rmssd)
        .bind(new_session.emotion)
        .bind(new_session.captured_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(session)
    }

    async fn session_score_stats(&self, since: DateTime<Utc>) -> Result<Vec<AppScoreStats>, StoreError> {
        let stats = sqlx::query_as::<_, AppScoreStats>(
            r#"
            SELECT
                app_id,
                AVG(swip_score)::DOUBLE PRECISION AS avg_score,
                COUNT(*) AS session_count
            FROM sessions
            WHERE created_at >= $1
            GROUP BY app_id
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(stats)
    }

    async fn upsert_leaderboard_snapshot(&self, snapshot: &LeaderboardSnapshot) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO leaderboard_snapshots (app_id, window_label, avg_score, session_count, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (app_id, window_label) DO UPDATE
            SET avg_score = EXCLUDED.avg_score,
                session_count = EXCLUDED.session_count,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&snapshot.app_id)
        .bind(&snapshot.window_label)
        .bind(snapshot.avg_score)
        .bind(snapshot.session_count)
        .bind(snapshot.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn leaderboard(&self, window_label: &str, limit: i64) -> Result<Vec<LeaderboardSnapshot>, StoreError> {
        let rows = sqlx::query_as::<_, LeaderboardSnapshot>(
            r#"
            SELECT app_id, window_label, avg_score, session_count, updated_at
            FROM leaderboard_snapshots
            WHERE window_label = $1
            ORDER BY avg_score DESC, session_count DESC, app_id ASC
            LIMIT $2
            "#,
        )
        .bind(window_label)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
