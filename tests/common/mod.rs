#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response},
};
use serde_json::Value;
use swip_server::{
    build_router,
    services::{
        api_keys::{self, HashParams, KeyHasher},
        leaderboard_service::LeaderboardWorker,
        rate_limiter::RateLimiter,
    },
    state::{AppState, RateLimits},
    store::{MemoryRepository, Repository, counter::MemoryCounterStore},
};
use tower::ServiceExt;

pub const ADMIN_TOKEN: &str = "test-admin-token";

pub struct TestApp {
    pub router: Router,
    pub repo: Arc<MemoryRepository>,
    pub hasher: KeyHasher,
    pub worker: LeaderboardWorker,
}

pub struct Limits {
    pub ingest: u32,
    pub management: u32,
    pub trust_proxy_headers: bool,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            ingest: 1_000,
            management: 1_000,
            trust_proxy_headers: false,
        }
    }
}

pub fn cheap_hasher() -> KeyHasher {
    KeyHasher::new(HashParams {
        memory_kib: Some(1024),
        iterations: Some(1),
        parallelism: Some(1),
    })
    .unwrap()
}

pub fn spawn_app() -> TestApp {
    spawn_app_with(Limits::default())
}

pub fn spawn_app_with(limits: Limits) -> TestApp {
    let repo = Arc::new(MemoryRepository::new());
    let hasher = cheap_hasher();
    let worker = LeaderboardWorker::spawn(repo.clone(), Duration::from_secs(3600));
    let window = Duration::from_secs(60);

    let state = AppState {
        repo: repo.clone(),
        rate_limiter: RateLimiter::new(Arc::new(MemoryCounterStore::new())),
        hasher: hasher.clone(),
        leaderboard: worker.handle(),
        limits: RateLimits::new((limits.ingest, window), (limits.management, window)),
        trust_proxy_headers: limits.trust_proxy_headers,
        admin_token: Some(Arc::from(ADMIN_TOKEN)),
    };

    TestApp {
        router: build_router(state),
        repo,
        hasher,
        worker,
    }
}

impl TestApp {
    /// Registers an app and issues one key for it, bypassing HTTP.
    pub async fn app_with_key(&self) -> (String, String) {
        let app = self.repo.create_app("demo", "owner").await.unwrap();
        let (_, secret) = api_keys::issue_api_key(self.repo.as_ref(), &self.hasher, &app.id)
            .await
            .unwrap();
        (app.id, secret)
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

pub fn ingest_request(key: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/v1/ingest")
        .header("content-type", "application/json")
        .header("x-forwarded-for", "203.0.113.7");
    if let Some(key) = key {
        builder = builder.header("x-api-key", key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn admin_request(method: &str, uri: &str, body: Option<&Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {ADMIN_TOKEN}"))
        .header("content-type", "application/json");
    let body = body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty);
    builder.body(body).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap()
}
