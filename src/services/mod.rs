//! Business logic services.
//!
//! Services contain the core logic separated from HTTP handlers: key
//! issuance and verification, scoring, rate limiting, ingestion and the
//! leaderboard aggregator.

pub mod api_keys;
pub mod ingestion_service;
pub mod leaderboard_service;
pub mod rate_limiter;
pub mod scoring;
