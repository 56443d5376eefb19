//! SWIP ingestion service.
//!
//! Client apps post biometric session data, the service scores each session
//! with the SWIP wellness score, stores it, and keeps a per-app 30-day
//! leaderboard.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx, behind the [`store::Repository`] trait
//! - **Rate limiting**: sliding window over Redis sorted sets, failing open
//! - **Authentication**: `swip_` API keys, SHA-256 lookup plus Argon2id verification
//! - **Format**: JSON requests/responses

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod state;
pub mod store;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the HTTP router.
///
/// Within each group the rate limit runs before authentication, so rejected
/// credentials still spend quota.
pub fn build_router(state: AppState) -> Router {
    let limits = state.limits;

    // Ingestion: rate limit → API key → handler
    let ingest_routes = Router::new()
        .route("/api/v1/ingest", post(handlers::ingest::ingest))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::api_key_middleware,
        ))
        .route_layer(axum_middleware::from_fn_with_state(
            (state.clone(), limits.ingest),
            middleware::rate_limit::rate_limit_middleware,
        ));

    // Management: rate limit → admin token → handler
    let management_routes = Router::new()
        .route("/api/v1/apps", post(handlers::apps::create_app))
        .route(
            "/api/v1/apps/{app_id}/keys",
            post(handlers::keys::create_key).get(handlers::keys::list_keys),
        )
        .route(
            "/api/v1/keys/{key_id}/revoke",
            post(handlers::keys::revoke_key),
        )
        .route(
            "/api/v1/keys/{key_id}",
            axum::routing::delete(handlers::keys::delete_key),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::admin_middleware,
        ))
        .route_layer(axum_middleware::from_fn_with_state(
            (state.clone(), limits.management),
            middleware::rate_limit::rate_limit_middleware,
        ));

    let leaderboard_routes = Router::new()
        .route(
            "/api/v1/leaderboard",
            get(handlers::leaderboard::get_leaderboard),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            (state.clone(), limits.leaderboard),
            middleware::rate_limit::rate_limit_middleware,
        ));

    Router::new()
        // Public routes (no authentication required)
        .route("/health", get(handlers::health::health_check))
        .merge(ingest_routes)
        .merge(management_routes)
        .merge(leaderboard_routes)
        // Add distributed tracing middleware for observability
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
