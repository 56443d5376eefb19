//! Health check endpoint for service monitoring.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{error::AppError, state::AppState};

/// Health check response.
///
/// Returns service status, database connectivity and the state of the
/// rate-limit counter store.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy`, or `degraded` while the counter store is unreachable
    pub status: String,

    /// Database connection status
    pub database: String,

    /// Counter store status, e.g. `redis: connected`
    pub rate_limit_store: String,

    /// Current server timestamp
    pub timestamp: DateTime<Utc>,
}

/// Health check handler.
///
/// # Checks
///
/// - Database connectivity (executes simple query)
/// - Counter store connectivity (rate limiting fails open while it is down)
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "status": "healthy",
///   "database": "connected",
///   "rate_limit_store": "redis: connected",
///   "timestamp": "2025-12-21T19:00:00Z"
/// }
/// ```
///
/// # Response (500 Internal Server Error)
///
/// If database is unreachable, returns standard error response.
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    state.repo.ping().await?;

    let backend = state.rate_limiter.backend_type();
    let (status, store) = if state.rate_limiter.store_reachable().await {
        ("healthy", "connected")
    } else {
        ("degraded", "unreachable")
    };

    Ok(Json(HealthResponse {
        status: status.to_string(),
        database: "connected".to_string(),
        rate_limit_store: format!("{backend}: {store}"),
        timestamp: Utc::now(),
    }))
}
