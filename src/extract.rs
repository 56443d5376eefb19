//! Request extractors.

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::{AppError, ValidationFailure};

/// JSON body that has been deserialized and then validated.
///
/// Both failure kinds become `AppError::Validation` (400): a body that does
/// not parse is reported as a form error, a body that parses but breaks a
/// rule carries per-field messages.
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::Validation(ValidationFailure::form(rejection.body_text())))?;

        value.validate()?;

        Ok(Self(value))
    }
}

/// `Path` whose parse failures use the JSON error envelope.
pub struct ApiPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::Validation(ValidationFailure::form(rejection.body_text())))?;

        Ok(Self(value))
    }
}

/// `Query` whose parse failures use the JSON error envelope.
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::Validation(ValidationFailure::form(rejection.body_text())))?;

        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ingest::IngestPayload, leaderboard::LeaderboardQuery};
    use axum::body::Body;

    fn json_request(body: &str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn accepts_valid_body() {
        let req = json_request(r#"{"app_id":"a","session_id":"s","metrics":{}}"#);

        let ValidatedJson(payload) = ValidatedJson::<IngestPayload>::from_request(req, &())
            .await
            .unwrap_or_else(|_| panic!("valid body rejected"));

        assert_eq!(payload.app_id, "a");
    }

    #[tokio::test]
    async fn malformed_json_is_a_form_error() {
        let req = json_request("{not json");

        match ValidatedJson::<IngestPayload>::from_request(req, &()).await {
            Err(AppError::Validation(failure)) => {
                assert!(!failure.message.is_empty());
                assert!(failure.field_errors.is_empty());
            }
            _ => panic!("expected a validation error"),
        }
    }

    #[tokio::test]
    async fn rule_violations_carry_field_paths() {
        let req = json_request(
            r#"{"app_id":"a","session_id":"s","metrics":{"hrv":{"rmssd":-1}}}"#,
        );

        match ValidatedJson::<IngestPayload>::from_request(req, &()).await {
            Err(AppError::Validation(failure)) => {
                assert!(failure.field_errors.contains_key("metrics.hrv.rmssd"));
            }
            _ => panic!("expected a validation error"),
        }
    }

    #[tokio::test]
    async fn non_numeric_query_is_a_form_error() {
        let (mut parts, _) = Request::builder()
            .uri("/?limit=abc")
            .body(Body::empty())
            .unwrap()
            .into_parts();

        match ApiQuery::<LeaderboardQuery>::from_request_parts(&mut parts, &()).await {
            Err(AppError::Validation(failure)) => {
                assert!(!failure.message.is_empty());
                assert!(failure.field_errors.is_empty());
            }
            _ => panic!("expected a validation error"),
        }
    }
}
