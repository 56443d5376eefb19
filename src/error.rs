//! Error types and HTTP error response handling.
//!
//! Every error leaves the service in the same envelope:
//!
//! ```json
//! { "ok": false, "error": "Human-readable error message" }
//! ```
//!
//! Validation failures carry a structured error instead:
//!
//! ```json
//! {
//!   "ok": false,
//!   "error": {
//!     "message": "Validation failed",
//!     "field_errors": { "metrics.hrv.rmssd": ["rmssd must be non-negative"] }
//!   }
//! }
//! ```

use std::collections::BTreeMap;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::{
    services::{api_keys::KeyHashError, rate_limiter::RateLimitDecision},
    store::StoreError,
};

/// Application-wide error type.
///
/// # Status Code Mapping
///
/// - `Validation` → 400 Bad Request
/// - `MissingApiKey`, `InvalidApiKey`, `Unauthorized` → 401 Unauthorized
/// - `AppNotFound`, `ApiKeyNotFound` → 404 Not Found
/// - `RateLimitExceeded` → 429 Too Many Requests
/// - `Persistence`, `Hashing`, `Internal` → 500 (details are logged, not returned)
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Rate limit exceeded")]
    RateLimitExceeded(RateLimitDecision),

    #[error("Missing API key")]
    MissingApiKey,

    /// Unknown, revoked, forged, or bound to a different app.
    #[error("Invalid API key")]
    InvalidApiKey,

    /// Management credentials are missing or wrong.
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Validation failed")]
    Validation(ValidationFailure),

    #[error("App not found")]
    AppNotFound,

    #[error("API key not found")]
    ApiKeyNotFound,

    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),

    #[error("Key hashing error: {0}")]
    Hashing(#[from] KeyHashError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Field path (`metrics.hrv.rmssd`, `metrics.hr[3]`) to messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationFailure {
    pub message: String,
    pub field_errors: BTreeMap<String, Vec<String>>,
}

impl ValidationFailure {
    /// A failure that is not tied to a field, e.g. a body that is not JSON.
    pub fn form(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field_errors: BTreeMap::new(),
        }
    }
}

impl From<ValidationErrors> for ValidationFailure {
    fn from(errors: ValidationErrors) -> Self {
        let mut field_errors = BTreeMap::new();
        collect_field_errors(&errors, None, &mut field_errors);
        Self {
            message: "Validation failed".to_string(),
            field_errors,
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(errors.into())
    }
}

fn collect_field_errors(
    errors: &ValidationErrors,
    parent: Option<&str>,
    out: &mut BTreeMap<String, Vec<String>>,
) {
    for (field, kind) in errors.errors() {
        let path = match parent {
            Some(parent) => format!("{parent}.{field}"),
            None => field.to_string(),
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                let messages = out.entry(path).or_default();
                for error in list {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{field} is invalid ({})", error.code));
                    messages.push(message);
                }
            }
            ValidationErrorsKind::Struct(nested) => {
                collect_field_errors(nested, Some(&path), out);
            }
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_field_errors(nested, Some(&format!("{path}[{index}]")), out);
                }
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::MissingApiKey | AppError::InvalidApiKey | AppError::Unauthorized => {
                StatusCode::UNAUTHORIZED
            }
            AppError::AppNotFound | AppError::ApiKeyNotFound => StatusCode::NOT_FOUND,
            AppError::RateLimitExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Persistence(_) | AppError::Hashing(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        match self {
            AppError::Validation(failure) => {
                (status, Json(json!({ "ok": false, "error": failure }))).into_response()
            }
            AppError::RateLimitExceeded(decision) => {
                let mut response = (
                    status,
                    Json(json!({ "ok": false, "error": "Rate limit exceeded" })),
                )
                    .into_response();
                let headers = response.headers_mut();
                decision.apply_headers(headers);
                headers.insert(
                    axum::http::header::RETRY_AFTER,
                    decision.retry_after_secs().into(),
                );
                response
            }
            error @ (AppError::Persistence(_) | AppError::Hashing(_) | AppError::Internal(_)) => {
                // Hide internals from the client
                tracing::error!(error = %error, "request failed");
                (
                    status,
                    Json(json!({ "ok": false, "error": "Internal server error" })),
                )
                    .into_response()
            }
            other => {
                (status, Json(json!({ "ok": false, "error": other.to_string() }))).into_response()
            }
        }
    }
}
