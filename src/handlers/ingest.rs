//! Ingestion HTTP handler.

use axum::{Extension, Json, extract::State};

use crate::{
    error::AppError,
    extract::ValidatedJson,
    middleware::auth::AuthContext,
    models::ingest::{IngestPayload, IngestResponse},
    services::ingestion_service,
    state::AppState,
};

/// Score and record one session.
///
/// # Endpoint
///
/// `POST /api/v1/ingest`
///
/// # Authentication
///
/// Requires a valid API key in `x-api-key`. Rate limiting and key
/// resolution run in middleware before the body is read.
///
/// # Response
///
/// - **Success (200 OK)**: `{ "ok": true, "swip_score": 68 }`
/// - **Error (400)**: Body does not parse or fails validation
/// - **Error (401)**: Missing key, invalid key, or `app_id` of another app
/// - **Error (429)**: Rate limit exceeded
/// - **Error (500)**: Session could not be stored
pub async fn ingest(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidatedJson(payload): ValidatedJson<IngestPayload>,
) -> Result<Json<IngestResponse>, AppError> {
    let swip_score =
        ingestion_service::ingest(state.repo.as_ref(), &state.leaderboard, &auth, payload).await?;

    Ok(Json(IngestResponse::new(swip_score)))
}
