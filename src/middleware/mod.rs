//! HTTP middleware components.
//!
//! Middleware run before route handlers. They can:
//! - Rate limit requests per client IP
//! - Authenticate requests (API key or admin token)
//! - Short-circuit requests (reject unauthorized or over-quota ones)

/// API key and admin token authentication
pub mod auth;

/// Sliding-window rate limiting
pub mod rate_limit;
