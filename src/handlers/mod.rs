//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, etc.)
//! 2. Delegates to the store or a service
//! 3. Returns HTTP response (JSON, status code)

/// App registration
pub mod apps;
/// Service health
pub mod health;
/// Session ingestion
pub mod ingest;
/// API key management
pub mod keys;
/// Leaderboard reads
pub mod leaderboard;
