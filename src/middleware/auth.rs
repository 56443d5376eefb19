//! Authentication middleware.
//!
//! Two guards live here:
//! - [`api_key_middleware`] for ingestion: resolves a `swip_` key to its app
//!   and injects an [`AuthContext`]
//! - [`admin_middleware`] for the management routes: a static bearer token

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{error::AppError, services::api_keys, state::AppState};

/// Header carrying the API key on ingestion requests.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Authentication context attached to authenticated requests.
///
/// Inserted into the request's extension map; handlers extract it with
/// `Extension<AuthContext>`.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// ID of the authenticated API key
    pub api_key_id: Uuid,

    /// App the key belongs to. Payloads must name this app.
    pub app_id: String,
}

/// Presented credential: `x-api-key`, falling back to `Authorization: Bearer`.
fn presented_api_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .or_else(|| bearer_token(headers))
        .map(str::trim)
        .filter(|key| !key.is_empty())
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

/// API key authentication middleware function.
///
/// # Flow
///
/// 1. Extract the key from `x-api-key` (or `Authorization: Bearer <key>`)
/// 2. Resolve it: format check, digest lookup, Argon2id verification
/// 3. Inject `AuthContext` into the request and call the next handler
///
/// # Returns
///
/// - `Err(AppError::MissingApiKey)` if no key was sent (401)
/// - `Err(AppError::InvalidApiKey)` if the key is unknown, revoked or forged (401)
pub async fn api_key_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Step 1: Extract the presented key
    let presented = presented_api_key(request.headers())
        .ok_or(AppError::MissingApiKey)?
        .to_string();

    // Step 2: Resolve and verify against the stored hash
    let record = api_keys::resolve_api_key(state.repo.clone(), &state.hasher, &presented).await?;

    // Step 3: Inject context into request extensions
    request.extensions_mut().insert(AuthContext {
        api_key_id: record.id,
        app_id: record.app_id,
    });

    Ok(next.run(request).await)
}

/// Management guard: `Authorization: Bearer <ADMIN_TOKEN>`.
///
/// Digests of both tokens are compared so the comparison time does not depend
/// on how much of the token matched. Without a configured token every request
/// is rejected.
pub async fn admin_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let expected = state.admin_token.as_deref().ok_or_else(|| {
        tracing::warn!("management request rejected: ADMIN_TOKEN is not configured");
        AppError::Unauthorized
    })?;

    let presented = bearer_token(request.headers()).ok_or(AppError::Unauthorized)?;

    if Sha256::digest(presented.as_bytes()) != Sha256::digest(expected.as_bytes()) {
        return Err(AppError::Unauthorized);
    }

    Ok(next.run(request).await)
}
