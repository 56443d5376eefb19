//! Session model.
//!
//! Sessions form an append-only log: one row per successful ingestion call,
//! never updated afterwards.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::types::Json;
use uuid::Uuid;

use crate::models::ingest::Metrics;

/// Represents a scored session from the database.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Session {
    pub id: Uuid,

    pub app_id: String,

    /// Identifier supplied by the client app
    pub session_id: String,

    /// Always within 0..=100 (CHECK constraint)
    pub swip_score: i32,

    pub hr: Option<Json<Vec<f64>>>,

    pub rr: Option<Json<Vec<f64>>>,

    pub sdnn: Option<f64>,

    pub rmssd: Option<f64>,

    pub emotion: Option<String>,

    /// Capture time reported by the client, if any
    pub captured_at: Option<DateTime<Utc>>,

    /// Server-side arrival time; the leaderboard window is measured on it
    pub created_at: DateTime<Utc>,
}

/// Values needed to insert a session.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub app_id: String,
    pub session_id: String,
    pub swip_score: u8,
    pub hr: Option<Vec<f64>>,
    pub rr: Option<Vec<f64>>,
    pub sdnn: Option<f64>,
    pub rmssd: Option<f64>,
    pub emotion: Option<String>,
    pub captured_at: Option<DateTime<Utc>>,
}

impl NewSession {
    pub fn from_metrics(app_id: String, session_id: String, swip_score: u8, metrics: Metrics) -> Self {
        let sdnn = metrics.sdnn();
        let rmssd = metrics.rmssd();
        let captured_at = metrics.captured_at();
        Self {
            app_id,
            session_id,
            swip_score,
            hr: metrics.hr,
            rr: metrics.rr,
            sdnn,
            rmssd,
            emotion: metrics.emotion,
            captured_at,
        }
    }
}
