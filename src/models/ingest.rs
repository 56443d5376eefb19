//! Ingestion request/response types.
//!
//! Optional metric fields stay `None` when absent; they are never defaulted to
//! zero, because a zero RMSSD and a missing RMSSD score differently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Upper bound on the length of each raw series.
pub const MAX_SERIES_LEN: usize = 100_000;

/// Request body for `POST /api/v1/ingest`.
///
/// # JSON Example
///
/// ```json
/// {
///   "app_id": "app_1",
///   "session_id": "sess-2025-001",
///   "metrics": {
///     "hr": [72, 75, 71],
///     "rr": [833, 800, 845],
///     "hrv": { "sdnn": 55.2, "rmssd": 48.1 },
///     "emotion": "calm",
///     "timestamp": "2025-01-15T10:30:00Z"
///   }
/// }
/// ```
///
/// `app_id` and `session_id` default to empty so a missing field is reported
/// as a field error rather than a parse error.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct IngestPayload {
    #[serde(default)]
    #[validate(length(min = 1, max = 128, message = "app_id is required"))]
    pub app_id: String,

    #[serde(default)]
    #[validate(length(min = 1, max = 256, message = "session_id is required"))]
    pub session_id: String,

    #[validate(required(message = "metrics is required"), nested)]
    pub metrics: Option<Metrics>,
}

/// Biosignal bundle for one session.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct Metrics {
    /// Heart-rate samples in beats per minute
    #[validate(custom(function = "validate_series"))]
    pub hr: Option<Vec<f64>>,

    /// RR intervals (time between beats)
    #[validate(custom(function = "validate_series"))]
    pub rr: Option<Vec<f64>>,

    #[validate(nested)]
    pub hrv: Option<Hrv>,

    #[validate(length(max = 64, message = "emotion must be at most 64 characters"))]
    pub emotion: Option<String>,

    /// RFC 3339 capture time reported by the client
    #[validate(custom(function = "validate_timestamp"))]
    pub timestamp: Option<String>,
}

/// Summary heart-rate-variability statistics, in milliseconds.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct Hrv {
    #[validate(range(min = 0.0, message = "sdnn must be non-negative"))]
    pub sdnn: Option<f64>,

    #[validate(range(min = 0.0, message = "rmssd must be non-negative"))]
    pub rmssd: Option<f64>,
}

impl Metrics {
    pub fn sdnn(&self) -> Option<f64> {
        self.hrv.as_ref().and_then(|hrv| hrv.sdnn)
    }

    pub fn rmssd(&self) -> Option<f64> {
        self.hrv.as_ref().and_then(|hrv| hrv.rmssd)
    }

    /// Parsed capture time. Validation has already rejected malformed values.
    pub fn captured_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp
            .as_deref()
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|ts| ts.with_timezone(&Utc))
    }
}

fn validate_series(series: &[f64]) -> Result<(), ValidationError> {
    if series.len() > MAX_SERIES_LEN {
        let mut err = ValidationError::new("length");
        err.message = Some(format!("at most {MAX_SERIES_LEN} samples are accepted").into());
        return Err(err);
    }
    if series.iter().any(|v| !v.is_finite() || *v <= 0.0) {
        let mut err = ValidationError::new("positive");
        err.message = Some("samples must be positive numbers".into());
        return Err(err);
    }
    Ok(())
}

fn validate_timestamp(value: &str) -> Result<(), ValidationError> {
    DateTime::parse_from_rfc3339(value).map(|_| ()).map_err(|_| {
        let mut err = ValidationError::new("timestamp");
        err.message = Some("timestamp must be an RFC 3339 date-time".into());
        err
    })
}

/// Success body for an ingestion call.
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub ok: bool,
    pub swip_score: u8,
}

impl IngestResponse {
    pub fn new(swip_score: u8) -> Self {
        Self {
            ok: true,
            swip_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> IngestPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn accepts_minimal_payload() {
        let payload = parse(json!({
            "app_id": "app_1",
            "session_id": "s1",
            "metrics": {}
        }));

        assert!(payload.validate().is_ok());
        let metrics = payload.metrics.unwrap();
        assert!(metrics.hr.is_none());
        assert!(metrics.rmssd().is_none());
    }

    #[test]
    fn missing_session_id_is_a_field_error() {
        let payload = parse(json!({ "app_id": "app_1", "metrics": {} }));

        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().keys().any(|k| k.to_string() == "session_id"));
    }

    #[test]
    fn missing_metrics_is_a_field_error() {
        let payload = parse(json!({ "app_id": "app_1", "session_id": "s1" }));

        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().keys().any(|k| k.to_string() == "metrics"));
    }

    #[test]
    fn present_metrics_are_validated_as_nested_struct() {
        let payload = parse(json!({
            "app_id": "app_1",
            "session_id": "s1",
            "metrics": { "hrv": { "sdnn": -1.0 } }
        }));

        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().is_empty());
        assert!(errors.errors().contains_key("metrics"));
    }

    #[test]
    fn metrics_serialize_with_absent_fields_as_null() {
        let metrics = Metrics {
            hrv: Some(Hrv {
                sdnn: None,
                rmssd: Some(42.0),
            }),
            ..Metrics::default()
        };

        let value = serde_json::to_value(&metrics).unwrap();
        assert_eq!(value["hrv"]["rmssd"], 42.0);
        assert!(value["hr"].is_null());
    }

    #[test]
    fn rejects_non_positive_samples() {
        let payload = parse(json!({
            "app_id": "app_1",
            "session_id": "s1",
            "metrics": { "hr": [70.0, 0.0] }
        }));

        assert!(payload.validate().is_err());
    }

    #[test]
    fn rejects_malformed_timestamp() {
        let payload = parse(json!({
            "app_id": "app_1",
            "session_id": "s1",
            "metrics": { "timestamp": "yesterday" }
        }));

        assert!(payload.validate().is_err());
    }

    #[test]
    fn parses_capture_time() {
        let payload = parse(json!({
            "app_id": "app_1",
            "session_id": "s1",
            "metrics": { "timestamp": "2025-01-15T10:30:00+02:00" }
        }));

        let captured = payload.metrics.unwrap().captured_at().unwrap();
        assert_eq!(captured.to_rfc3339(), "2025-01-15T08:30:00+00:00");
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let payload = parse(json!({
            "app_id": "app_1",
            "session_id": "s1",
            "device": "watch",
            "metrics": { "spo2": 97 }
        }));

        assert!(payload.validate().is_ok());
    }
}
