//! App model.
//!
//! An app is the unit that owns API keys, sessions and a leaderboard entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Represents an app record from the database.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct App {
    pub id: String,

    /// Identifier of the developer account that registered the app
    pub owner_id: String,

    pub name: String,

    pub created_at: DateTime<Utc>,
}

/// Request body for registering a new app.
///
/// # JSON Example
///
/// ```json
/// {
///   "name": "Breathing Coach",
///   "owner_id": "dev_42"
/// }
/// ```
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAppRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 128, message = "name must be 1-128 characters"))]
    pub name: String,

    #[serde(default)]
    #[validate(length(min = 1, max = 128, message = "owner_id must be 1-128 characters"))]
    pub owner_id: String,
}
