//! API key management handlers.
//!
//! - POST /api/v1/apps/{app_id}/keys - Issue a key (secret shown once)
//! - GET /api/v1/apps/{app_id}/keys - List key metadata
//! - POST /api/v1/keys/{key_id}/revoke - Revoke a key
//! - DELETE /api/v1/keys/{key_id} - Delete a key

use axum::{Json, extract::State, http::StatusCode};
use uuid::Uuid;

use crate::{
    error::AppError,
    extract::ApiPath,
    models::api_key::{ApiKeyResponse, CreatedApiKeyResponse},
    services::api_keys,
    state::AppState,
};

/// Issue a new key for an app.
///
/// # Response
///
/// - **Success (201 Created)**: `{ id, app_id, key, created_at }`
/// - **Error (404)**: Unknown app
pub async fn create_key(
    State(state): State<AppState>,
    ApiPath(app_id): ApiPath<String>,
) -> Result<(StatusCode, Json<CreatedApiKeyResponse>), AppError> {
    let (key, secret) = api_keys::issue_api_key(state.repo.as_ref(), &state.hasher, &app_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedApiKeyResponse::new(key, secret)),
    ))
}

/// List an app's keys, newest first. Secrets and hashes are never included.
pub async fn list_keys(
    State(state): State<AppState>,
    ApiPath(app_id): ApiPath<String>,
) -> Result<Json<Vec<ApiKeyResponse>>, AppError> {
    if !state.repo.app_exists(&app_id).await? {
        return Err(AppError::AppNotFound);
    }

    let keys = state.repo.list_api_keys(&app_id).await?;
    Ok(Json(keys.into_iter().map(ApiKeyResponse::from).collect()))
}

/// Revoke a key. Revoking twice is harmless.
///
/// A `key_id` that is not a UUID is a 400, not a 404.
pub async fn revoke_key(
    State(state): State<AppState>,
    ApiPath(key_id): ApiPath<Uuid>,
) -> Result<Json<ApiKeyResponse>, AppError> {
    let key = state
        .repo
        .revoke_api_key(key_id)
        .await?
        .ok_or(AppError::ApiKeyNotFound)?;

    tracing::info!(app_id = %key.app_id, key_id = %key.id, "api key revoked");
    Ok(Json(key.into()))
}

pub async fn delete_key(
    State(state): State<AppState>,
    ApiPath(key_id): ApiPath<Uuid>,
) -> Result<StatusCode, AppError> {
    if !state.repo.delete_api_key(key_id).await? {
        return Err(AppError::ApiKeyNotFound);
    }

    tracing::info!(key_id = %key_id, "api key deleted");
    Ok(StatusCode::NO_CONTENT)
}
