//! Ingestion service - scores and records one session.
//!
//! By the time a payload reaches [`ingest`] the request has been rate limited,
//! its API key resolved and its body validated. What is left is binding the
//! payload to the key's app, scoring, persisting, and poking the leaderboard.

use crate::{
    error::AppError,
    middleware::auth::AuthContext,
    models::{ingest::IngestPayload, session::NewSession},
    services::{leaderboard_service::LeaderboardHandle, scoring},
    store::Repository,
};

/// Score and store a validated payload for the authenticated app.
///
/// # Errors
///
/// - `InvalidApiKey`: `payload.app_id` is not the app the key belongs to
/// - `Persistence`: the session insert failed (nothing was stored)
pub async fn ingest(
    repo: &dyn Repository,
    leaderboard: &LeaderboardHandle,
    auth: &AuthContext,
    payload: IngestPayload,
) -> Result<u8, AppError> {
    if payload.app_id != auth.app_id {
        tracing::warn!(
            key_id = %auth.api_key_id,
            key_app_id = %auth.app_id,
            app_id = %payload.app_id,
            "api key used for a different app"
        );
        return Err(AppError::InvalidApiKey);
    }

    // Presence is enforced by validation
    let metrics = payload
        .metrics
        .ok_or_else(|| AppError::Internal("metrics missing after validation".to_string()))?;

    let swip_score = scoring::compute_score(&metrics);
    let session = repo
        .insert_session(NewSession::from_metrics(
            payload.app_id,
            payload.session_id,
            swip_score,
            metrics,
        ))
        .await?;

    tracing::info!(
        app_id = %session.app_id,
        session_id = %session.session_id,
        swip_score,
        "session ingested"
    );

    leaderboard.trigger();
    Ok(swip_score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::ingest::{Hrv, Metrics},
        services::leaderboard_service::LeaderboardWorker,
        store::MemoryRepository,
    };
    use std::{sync::Arc, time::Duration};
    use uuid::Uuid;

    fn payload(app_id: &str) -> IngestPayload {
        IngestPayload {
            app_id: app_id.to_string(),
            session_id: "sess-1".to_string(),
            metrics: Some(Metrics {
                hrv: Some(Hrv {
                    sdnn: Some(60.0),
                    rmssd: Some(50.0),
                }),
                emotion: Some("calm".to_string()),
                ..Metrics::default()
            }),
        }
    }

    async fn setup() -> (Arc<MemoryRepository>, LeaderboardWorker, AuthContext) {
        let repo = Arc::new(MemoryRepository::new());
        let app = repo.create_app("demo", "owner").await.unwrap();
        let worker = LeaderboardWorker::spawn(repo.clone(), Duration::from_secs(3600));
        let auth = AuthContext {
            api_key_id: Uuid::new_v4(),
            app_id: app.id,
        };
        (repo, worker, auth)
    }

    #[tokio::test]
    async fn stores_scored_session() {
        let (repo, worker, auth) = setup().await;

        let score = ingest(repo.as_ref(), &worker.handle(), &auth, payload(&auth.app_id))
            .await
            .unwrap();

        assert_eq!(score, 68);
        let sessions = repo.sessions().await;
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].swip_score, 68);
        assert_eq!(sessions[0].rmssd, Some(50.0));
        assert_eq!(sessions[0].emotion.as_deref(), Some("calm"));
        worker.shutdown().await;
    }

    #[tokio::test]
    async fn rejects_payload_for_another_app() {
        let (repo, worker, auth) = setup().await;

        let result = ingest(repo.as_ref(), &worker.handle(), &auth, payload("someone-else")).await;

        assert!(matches!(result, Err(AppError::InvalidApiKey)));
        assert!(repo.sessions().await.is_empty());
        worker.shutdown().await;
    }

    #[tokio::test]
    async fn store_failure_is_persistence_error() {
        let (repo, worker, auth) = setup().await;
        repo.set_fail_writes(true);

        let result = ingest(repo.as_ref(), &worker.handle(), &auth, payload(&auth.app_id)).await;

        assert!(matches!(result, Err(AppError::Persistence(_))));
        worker.shutdown().await;
    }

    #[tokio::test]
    async fn duplicate_session_ids_are_stored_separately() {
        let (repo, worker, auth) = setup().await;
        let handle = worker.handle();

        ingest(repo.as_ref(), &handle, &auth, payload(&auth.app_id)).await.unwrap();
        ingest(repo.as_ref(), &handle, &auth, payload(&auth.app_id)).await.unwrap();

        assert_eq!(repo.sessions().await.len(), 2);
        worker.shutdown().await;
    }
}
