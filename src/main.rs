//! SWIP Ingestion Service - Main Application Entry Point
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool and run migrations
//! 3. Build the rate-limit counter store and the key hasher
//! 4. Start the leaderboard worker
//! 5. Serve HTTP until Ctrl-C / SIGTERM, then stop the worker

use std::{net::SocketAddr, sync::Arc, time::Duration};

use swip_server::{
    build_router,
    config::{Config, RateLimitBackend},
    db,
    services::{
        api_keys::{HashParams, KeyHasher},
        leaderboard_service::LeaderboardWorker,
        rate_limiter::RateLimiter,
    },
    state::{AppState, RateLimits},
    store::{
        PgRepository, Repository,
        counter::{CounterStore, MemoryCounterStore, RedisCounterStore},
    },
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Create database pool
    let pool = db::create_pool(&config.database_url, config.database_max_connections).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let repo: Arc<dyn Repository> = Arc::new(PgRepository::new(pool));

    let counter_store: Arc<dyn CounterStore> = match config.rate_limit_backend {
        RateLimitBackend::Redis => Arc::new(RedisCounterStore::new(
            &config.redis_url,
            &config.rate_limit_prefix,
            config.redis_timeout(),
        )?),
        RateLimitBackend::Memory => {
            tracing::warn!("Using in-memory rate limiting; quotas are per process");
            Arc::new(MemoryCounterStore::new())
        }
    };
    tracing::info!(backend = counter_store.backend_type(), "Rate limit store ready");

    let hasher = KeyHasher::new(HashParams {
        memory_kib: config.argon2_memory_kib,
        iterations: config.argon2_iterations,
        parallelism: config.argon2_parallelism,
    })?;

    if config.admin_token.is_none() {
        tracing::warn!("ADMIN_TOKEN is not set; management routes will reject every request");
    }

    // Start the leaderboard worker
    let worker = LeaderboardWorker::spawn(repo.clone(), config.leaderboard_refresh_interval());

    let state = AppState {
        repo,
        rate_limiter: RateLimiter::new(counter_store),
        hasher,
        leaderboard: worker.handle(),
        limits: RateLimits::new(
            (
                config.ingest_rate_limit,
                Duration::from_millis(config.ingest_rate_window_ms),
            ),
            (
                config.management_rate_limit,
                Duration::from_millis(config.management_rate_window_ms),
            ),
        ),
        trust_proxy_headers: config.trust_proxy_headers,
        admin_token: config.admin_token.as_deref().map(Arc::from),
    };

    let app = build_router(state);

    // Bind to network address and start server
    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Peer addresses key the per-IP rate limit unless proxy headers are trusted
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped, shutting down leaderboard worker");
    worker.shutdown().await;

    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
