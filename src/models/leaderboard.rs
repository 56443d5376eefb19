//! Leaderboard snapshot models.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Trailing window a snapshot is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaderboardWindow {
    ThirtyDays,
}

impl LeaderboardWindow {
    /// Label stored in `leaderboard_snapshots.window_label`.
    pub fn label(self) -> &'static str {
        match self {
            LeaderboardWindow::ThirtyDays => "30d",
        }
    }

    pub fn duration(self) -> Duration {
        match self {
            LeaderboardWindow::ThirtyDays => Duration::days(30),
        }
    }

    /// Earliest `created_at` that still qualifies at `now`.
    pub fn start(self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.duration()
    }
}

/// Per-app aggregate over the qualifying sessions of one window.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct AppScoreStats {
    pub app_id: String,
    pub avg_score: f64,
    pub session_count: i64,
}

/// Materialized leaderboard row, keyed by `(app_id, window_label)`.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
pub struct LeaderboardSnapshot {
    pub app_id: String,
    pub window_label: String,
    pub avg_score: f64,
    pub session_count: i64,
    pub updated_at: DateTime<Utc>,
}

impl LeaderboardSnapshot {
    pub fn from_stats(stats: AppScoreStats, window: LeaderboardWindow, now: DateTime<Utc>) -> Self {
        Self {
            app_id: stats.app_id,
            window_label: window.label().to_string(),
            avg_score: stats.avg_score,
            session_count: stats.session_count,
            updated_at: now,
        }
    }
}

/// Query string for `GET /api/v1/leaderboard`.
#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<i64>,
}

/// Ranked row returned to clients. Ranks are assigned at read time.
#[derive(Debug, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub app_id: String,
    pub avg_score: f64,
    pub session_count: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub window: &'static str,
    pub entries: Vec<LeaderboardEntry>,
}
