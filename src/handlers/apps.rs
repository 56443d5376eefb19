//! App registration handler.

use axum::{Json, extract::State, http::StatusCode};

use crate::{
    error::AppError,
    extract::ValidatedJson,
    models::app::{App, CreateAppRequest},
    state::AppState,
};

/// Register a new app.
///
/// # Endpoint
///
/// `POST /api/v1/apps`
///
/// # Authentication
///
/// Requires `Authorization: Bearer <ADMIN_TOKEN>`.
///
/// # Request Body
///
/// ```json
/// { "name": "Breathing Coach", "owner_id": "dev_42" }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: The created app
/// - **Error (400)**: Missing or oversized `name` / `owner_id`
pub async fn create_app(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateAppRequest>,
) -> Result<(StatusCode, Json<App>), AppError> {
    let app = state
        .repo
        .create_app(request.name.trim(), request.owner_id.trim())
        .await?;

    tracing::info!(app_id = %app.id, owner_id = %app.owner_id, "app registered");
    Ok((StatusCode::CREATED, Json(app)))
}
