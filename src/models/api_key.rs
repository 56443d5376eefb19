//! API Key model for authentication.
//!
//! API keys authenticate client apps posting session data. The plaintext key
//! is never stored: each row carries a slow Argon2id hash used for
//! verification and a fast SHA-256 digest used as an index.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Represents an API key record from the database.
///
/// # Database Table
///
/// Maps to the `api_keys` table with columns:
/// - `id`: Unique identifier (UUID)
/// - `app_id`: App this key authenticates
/// - `key_hash`: Argon2id PHC string of the secret
/// - `lookup_digest`: SHA-256 hex of the secret (unique index)
/// - `revoked`: Whether the key has been revoked
/// - `created_at` / `last_used_at`: Timestamps
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApiKey {
    pub id: Uuid,

    pub app_id: String,

    /// Argon2id hash of the secret, including its salt and parameters
    ///
    /// When a request comes in with a key, we:
    /// 1. Find the row by `lookup_digest`
    /// 2. Verify the presented key against this hash
    /// 3. Only then treat the request as authenticated
    pub key_hash: String,

    /// SHA-256 hex digest of the secret (64 characters)
    ///
    /// Narrows the search to one row. Matching it is not proof of possession.
    pub lookup_digest: String,

    /// Revoked keys are never returned by the ingestion lookup.
    pub revoked: bool,

    pub created_at: DateTime<Utc>,

    pub last_used_at: Option<DateTime<Utc>>,
}

/// Values needed to insert a key. The secret itself is not part of it.
#[derive(Debug, Clone)]
pub struct NewApiKey {
    pub app_id: String,
    pub key_hash: String,
    pub lookup_digest: String,
}

/// Key metadata returned by the management endpoints.
///
/// Neither the hash nor the digest leave the service.
#[derive(Debug, Serialize)]
pub struct ApiKeyResponse {
    pub id: Uuid,
    pub app_id: String,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl From<ApiKey> for ApiKeyResponse {
    fn from(key: ApiKey) -> Self {
        Self {
            id: key.id,
            app_id: key.app_id,
            revoked: key.revoked,
            created_at: key.created_at,
            last_used_at: key.last_used_at,
        }
    }
}

/// Response when a key is created. This is the only time `key` is shown.
///
/// # Example
///
/// ```json
/// {
///   "id": "550e8400-e29b-41d4-a716-446655440000",
///   "app_id": "app_1",
///   "key": "swip_3f1c...",
///   "created_at": "2025-01-15T10:30:00Z"
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct CreatedApiKeyResponse {
    pub id: Uuid,
    pub app_id: String,
    pub key: String,
    pub created_at: DateTime<Utc>,
}

impl CreatedApiKeyResponse {
    pub fn new(key: ApiKey, secret: String) -> Self {
        Self {
            id: key.id,
            app_id: key.app_id,
            key: secret,
            created_at: key.created_at,
        }
    }
}
