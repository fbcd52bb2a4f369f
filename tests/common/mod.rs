// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request, Response};
use lingo_progress::config::Config;
use lingo_progress::db::{FirestoreDb, MemoryStore};
use lingo_progress::middleware::auth::create_jwt;
use lingo_progress::routes::create_router;
use lingo_progress::services::CurriculumService;
use lingo_progress::AppState;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// The sample curriculum shipped in `data/`.
#[allow(dead_code)]
pub fn test_curriculum() -> CurriculumService {
    CurriculumService::load_from_file("data/curriculum.json")
        .expect("Failed to load sample curriculum")
}

/// Create a test app backed by an in-memory store.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState<MemoryStore>>) {
    let state = Arc::new(AppState::new(
        Config::test_default(),
        MemoryStore::new(),
        test_curriculum(),
    ));
    (create_router(state.clone()), state)
}

/// Create a test app with a custom frontend URL.
#[allow(dead_code)]
pub fn create_test_app_with_frontend_url(
    frontend_url: &str,
) -> (axum::Router, Arc<AppState<MemoryStore>>) {
    let mut config = Config::test_default();
    config.frontend_url = frontend_url.to_string();

    let state = Arc::new(AppState::new(config, MemoryStore::new(), test_curriculum()));
    (create_router(state.clone()), state)
}

/// Bearer token for `uid` signed with the test key.
#[allow(dead_code)]
pub fn bearer(uid: &str) -> String {
    let token = create_jwt(
        uid,
        Some(&format!("{}@example.com", uid)),
        Some("Test Learner"),
        &Config::test_default().jwt_signing_key,
    )
    .expect("Failed to mint test token");
    format!("Bearer {}", token)
}

/// Authenticated JSON request.
#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, uid: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, bearer(uid))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Authenticated request without a body.
#[allow(dead_code)]
pub fn empty_request(method: &str, uri: &str, uid: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, bearer(uid))
        .body(Body::empty())
        .unwrap()
}

/// Collect a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}
