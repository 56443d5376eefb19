//! Data models representing database entities and API bodies.

/// API key authentication model
pub mod api_key;
/// Registered client apps
pub mod app;
/// Ingestion request/response bodies
pub mod ingest;
/// Leaderboard snapshots
pub mod leaderboard;
/// Persisted scored sessions
pub mod session;
