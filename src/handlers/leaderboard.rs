//! Leaderboard read handler.

use axum::{Json, extract::State};

use crate::{
    error::AppError,
    extract::ApiQuery,
    models::leaderboard::{
        LeaderboardEntry, LeaderboardQuery, LeaderboardResponse, LeaderboardWindow,
    },
    state::AppState,
};

const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 100;

/// Current 30-day ranking.
///
/// # Endpoint
///
/// `GET /api/v1/leaderboard?limit=N`
///
/// `limit` defaults to 10 and is clamped to 1..=100; a non-numeric value is
/// a 400. Rows are ordered by
/// average score, then session count, then app id, and ranked from 1.
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "window": "30d",
///   "entries": [
///     { "rank": 1, "app_id": "app_1", "avg_score": 71.5, "session_count": 12,
///       "updated_at": "2025-01-15T10:30:00Z" }
///   ]
/// }
/// ```
pub async fn get_leaderboard(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<LeaderboardQuery>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    let window = LeaderboardWindow::ThirtyDays;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let rows = state.repo.leaderboard(window.label(), limit).await?;
    let entries = rows
        .into_iter()
        .enumerate()
        .map(|(index, row)| LeaderboardEntry {
            rank: index + 1,
            app_id: row.app_id,
            avg_score: row.avg_score,
            session_count: row.session_count,
            updated_at: row.updated_at,
        })
        .collect();

    Ok(Json(LeaderboardResponse {
        window: window.label(),
        entries,
    }))
}
