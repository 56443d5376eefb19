//! Per-IP rate limiting middleware.
//!
//! Counter keys look like `ingest:POST /api/v1/ingest:203.0.113.7`, so each
//! route has its own quota per client.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, MatchedPath, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::{error::AppError, state::{AppState, RateLimitPolicy}};

/// Best-effort client address.
///
/// # Order
///
/// 1. First hop of `x-forwarded-for`, when `trust_proxy` is set
/// 2. `x-real-ip`, when `trust_proxy` is set
/// 3. Peer address of the connection
/// 4. `unknown`, which puts every such client in one bucket
///
/// Only trust the headers behind a proxy that overwrites them.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy: bool) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|h| h.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
    };

    trust_proxy
        .then(|| header("x-forwarded-for").or_else(|| header("x-real-ip")))
        .flatten()
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Rate limiting middleware function.
///
/// Allowed (and degraded) requests proceed and get the `X-RateLimit-*`
/// headers on their response, whatever its status. Denied requests stop here
/// with 429.
pub async fn rate_limit_middleware(
    State((state, policy)): State<(AppState, RateLimitPolicy)>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip = client_ip(request.headers(), peer, state.trust_proxy_headers);
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let key = format!("{}:{} {route}:{ip}", policy.scope, request.method());

    let decision = state
        .rate_limiter
        .check(&key, policy.limit, policy.window)
        .await;

    if !decision.is_allowed() {
        tracing::info!(key = %key, "request rate limited");
        return Err(AppError::RateLimitExceeded(decision));
    }

    let mut response = next.run(request).await;
    decision.apply_headers(response.headers_mut());
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn proxy_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        headers
    }

    #[test]
    fn forwarded_for_first_hop_wins_when_trusted() {
        let peer = Some(SocketAddr::from(([127, 0, 0, 1], 4000)));

        assert_eq!(client_ip(&proxy_headers(), peer, true), "203.0.113.7");
    }

    #[test]
    fn proxy_headers_ignored_when_untrusted() {
        let peer = Some(SocketAddr::from(([192, 168, 1, 5], 4000)));

        assert_eq!(client_ip(&proxy_headers(), peer, false), "192.168.1.5");
        assert_eq!(client_ip(&proxy_headers(), None, false), "unknown");
    }

    #[test]
    fn falls_back_to_real_ip_then_peer() {
        let mut headers = HeaderMap::new();
        let peer = Some(SocketAddr::from(([192, 168, 1, 5], 4000)));
        assert_eq!(client_ip(&headers, peer, true), "192.168.1.5");

        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(client_ip(&headers, peer, true), "10.0.0.2");
    }

    #[test]
    fn unknown_without_any_source() {
        assert_eq!(client_ip(&HeaderMap::new(), None, true), "unknown");
    }
}
