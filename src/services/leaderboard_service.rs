//! Leaderboard aggregation.
//!
//! [`update_leaderboard`] recomputes the trailing-window snapshot of every app
//! that has qualifying sessions. It is run by a single [`LeaderboardWorker`]
//! task, either on a fixed interval or when ingestion pokes it through a
//! [`LeaderboardHandle`].
//!
//! # Coalescing
//!
//! The trigger channel holds one message. While a run is pending, further
//! triggers are dropped: the pending run reads the sessions table after they
//! were written, so nothing is lost.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::MissedTickBehavior,
};

use crate::{
    models::leaderboard::{LeaderboardSnapshot, LeaderboardWindow},
    store::{Repository, StoreError},
};

/// Recompute and upsert the 30-day snapshot of every app with sessions in the
/// window. Returns the number of snapshots written.
///
/// There is no transaction around the batch: the first failing upsert aborts
/// the run and earlier upserts stay. Apps without qualifying sessions keep
/// whatever snapshot they already had.
pub async fn update_leaderboard(repo: &dyn Repository, now: DateTime<Utc>) -> Result<usize, StoreError> {
    let window = LeaderboardWindow::ThirtyDays;
    let stats = repo.session_score_stats(window.start(now)).await?;

    let mut written = 0;
    for row in stats {
        let snapshot = LeaderboardSnapshot::from_stats(row, window, now);
        repo.upsert_leaderboard_snapshot(&snapshot).await?;
        written += 1;
    }

    tracing::debug!(window = window.label(), written, "leaderboard updated");
    Ok(written)
}

/// Non-blocking trigger for the leaderboard worker.
#[derive(Clone)]
pub struct LeaderboardHandle {
    tx: mpsc::Sender<()>,
}

impl LeaderboardHandle {
    /// Ask for a recompute without waiting for it.
    pub fn trigger(&self) {
        match self.tx.try_send(()) {
            Ok(()) | Err(mpsc::error::TrySendError::Full(())) => {}
            Err(mpsc::error::TrySendError::Closed(())) => {
                tracing::warn!("leaderboard worker is not running, refresh dropped");
            }
        }
    }
}

pub struct LeaderboardWorker {
    handle: LeaderboardHandle,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl LeaderboardWorker {
    /// Spawn the worker on the current runtime.
    pub fn spawn(repo: Arc<dyn Repository>, interval: Duration) -> Self {
        let (tx, mut rx) = mpsc::channel::<()>(1);
        let (shutdown, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    trigger = rx.recv() => {
                        if trigger.is_none() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {}
                }

                if let Err(e) = update_leaderboard(repo.as_ref(), Utc::now()).await {
                    tracing::error!(error = %e, "leaderboard update failed");
                }
            }

            tracing::info!("leaderboard worker stopped");
        });

        Self {
            handle: LeaderboardHandle { tx },
            shutdown,
            task,
        }
    }

    pub fn handle(&self) -> LeaderboardHandle {
        self.handle.clone()
    }

    /// Stop the worker and wait for an in-flight run to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "leaderboard worker panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::session::NewSession, store::MemoryRepository};
    use chrono::Duration as ChronoDuration;

    fn session(app_id: &str, score: u8) -> NewSession {
        NewSession {
            app_id: app_id.to_string(),
            session_id: format!("s-{score}"),
            swip_score: score,
            hr: None,
            rr: None,
            sdnn: None,
            rmssd: None,
            emotion: None,
            captured_at: None,
        }
    }

    async fn repo_with_apps(names: &[&str]) -> (Arc<MemoryRepository>, Vec<String>) {
        let repo = Arc::new(MemoryRepository::new());
        let mut ids = Vec::new();
        for name in names {
            ids.push(repo.create_app(name, "owner").await.unwrap().id);
        }
        (repo, ids)
    }

    #[tokio::test]
    async fn snapshots_average_recent_sessions() {
        let (repo, ids) = repo_with_apps(&["a", "b"]).await;
        let now = Utc::now();
        for score in [60, 70, 80] {
            repo.insert_session_at(session(&ids[0], score), now).await.unwrap();
        }
        repo.insert_session_at(session(&ids[1], 40), now).await.unwrap();

        let written = update_leaderboard(repo.as_ref(), now).await.unwrap();
        assert_eq!(written, 2);

        let board = repo.leaderboard("30d", 10).await.unwrap();
        assert_eq!(board[0].app_id, ids[0]);
        assert_eq!(board[0].avg_score, 70.0);
        assert_eq!(board[0].session_count, 3);
        assert_eq!(board[1].app_id, ids[1]);
        assert_eq!(board[1].avg_score, 40.0);
    }

    #[tokio::test]
    async fn sessions_outside_window_are_ignored() {
        let (repo, ids) = repo_with_apps(&["a"]).await;
        let now = Utc::now();
        repo.insert_session_at(session(&ids[0], 90), now - ChronoDuration::days(31))
            .await
            .unwrap();
        repo.insert_session_at(session(&ids[0], 50), now - ChronoDuration::days(29))
            .await
            .unwrap();

        update_leaderboard(repo.as_ref(), now).await.unwrap();

        let snapshots = repo.snapshots().await;
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].avg_score, 50.0);
        assert_eq!(snapshots[0].session_count, 1);
    }

    #[tokio::test]
    async fn running_twice_is_idempotent() {
        let (repo, ids) = repo_with_apps(&["a"]).await;
        let now = Utc::now();
        repo.insert_session_at(session(&ids[0], 55), now).await.unwrap();

        update_leaderboard(repo.as_ref(), now).await.unwrap();
        let first = repo.snapshots().await;
        update_leaderboard(repo.as_ref(), now).await.unwrap();

        assert_eq!(first, repo.snapshots().await);
    }

    #[tokio::test]
    async fn apps_without_recent_sessions_keep_stale_snapshot() {
        let (repo, ids) = repo_with_apps(&["a"]).await;
        let earlier = Utc::now() - ChronoDuration::days(20);
        repo.insert_session_at(session(&ids[0], 77), earlier).await.unwrap();
        update_leaderboard(repo.as_ref(), earlier).await.unwrap();

        // 40 days later the only session has left the window
        let written = update_leaderboard(repo.as_ref(), earlier + ChronoDuration::days(40))
            .await
            .unwrap();

        assert_eq!(written, 0);
        let snapshots = repo.snapshots().await;
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].avg_score, 77.0);
        assert_eq!(snapshots[0].updated_at, earlier);
    }

    #[tokio::test]
    async fn failing_upsert_aborts_the_run() {
        let (repo, ids) = repo_with_apps(&["a"]).await;
        repo.insert_session(session(&ids[0], 50)).await.unwrap();
        repo.set_fail_writes(true);

        let result = update_leaderboard(repo.as_ref(), Utc::now()).await;

        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert!(repo.snapshots().await.is_empty());
    }

    #[tokio::test]
    async fn trigger_refreshes_in_background() {
        let (repo, ids) = repo_with_apps(&["a"]).await;
        let worker = LeaderboardWorker::spawn(repo.clone(), Duration::from_secs(3600));
        repo.insert_session(session(&ids[0], 66)).await.unwrap();

        let handle = worker.handle();
        for _ in 0..5 {
            handle.trigger();
        }

        let mut found = false;
        for _ in 0..100 {
            if repo
                .snapshots()
                .await
                .iter()
                .any(|s| s.app_id == ids[0] && s.session_count == 1)
            {
                found = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(found, "snapshot was never written");

        worker.shutdown().await;
    }

    #[tokio::test]
    async fn trigger_after_shutdown_is_harmless() {
        let repo: Arc<dyn Repository> = Arc::new(MemoryRepository::new());
        let worker = LeaderboardWorker::spawn(repo, Duration::from_secs(3600));
        let handle = worker.handle();

        worker.shutdown().await;
        handle.trigger();
    }
}
