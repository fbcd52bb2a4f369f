// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API authentication and CORS tests.
//!
//! These tests verify that:
//! 1. Protected routes reject requests without valid tokens
//! 2. Protected routes accept tokens from the header or the session cookie
//! 3. CORS preflight requests return correct headers

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use lingo_progress::config::Config;
use lingo_progress::middleware::auth::{create_jwt, SESSION_COOKIE};
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};
use tower::ServiceExt;

mod common;
use common::{body_json, create_test_app};

/// Create a test JWT with an arbitrary expiry offset (seconds from now).
fn create_test_jwt(uid: &str, expires_in: i64, signing_key: &[u8]) -> String {
    #[derive(Serialize)]
    struct Claims {
        sub: String,
        exp: usize,
        iat: usize,
    }

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;

    let claims = Claims {
        sub: uid.to_string(),
        exp: (now + expires_in) as usize,
        iat: now as usize,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )
    .unwrap()
}

#[tokio::test]
async fn test_protected_route_without_token() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/session")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Should return 401 Unauthorized without token
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_with_invalid_token() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/progress/last")
                .header(header::AUTHORIZATION, "Bearer invalid.token.here")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_token_rejected() {
    let (app, _) = create_test_app();
    let key = Config::test_default().jwt_signing_key;
    let token = create_test_jwt("learner-1", -3600, &key);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/progress/last")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_signed_with_other_key_rejected() {
    let (app, _) = create_test_app();
    let token = create_test_jwt("learner-1", 3600, b"some_other_key_that_is_long_enough");

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/session")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_with_valid_token() {
    let (app, _) = create_test_app();
    let key = Config::test_default().jwt_signing_key;
    let token = create_test_jwt("learner-1", 3600, &key);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/session")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["user"]["uid"], "learner-1");
    // No name or email claim
    assert_eq!(body["user"]["display_name"], "Learner");
}

#[tokio::test]
async fn test_session_cookie_accepted() {
    let (app, _) = create_test_app();
    let key = Config::test_default().jwt_signing_key;
    let token = create_jwt("learner-2", None, Some("Bea"), &key).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/session")
                .header(header::COOKIE, format!("{}={}", SESSION_COOKIE, token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["user"]["display_name"], "Bea");
}

#[tokio::test]
async fn test_logout_expires_cookie() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/logout")
                .header(header::COOKIE, format!("{}=whatever", SESSION_COOKIE))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("Logout should set a removal cookie")
        .to_str()
        .unwrap();
    assert!(set_cookie.starts_with(&format!("{}=", SESSION_COOKIE)));
    assert!(set_cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_cors_preflight() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/progress/1/1/checkpoint")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PUT")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // OPTIONS should return 200 (CORS preflight success)
    assert_eq!(response.status(), StatusCode::OK);

    // Should have CORS headers
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
}

#[tokio::test]
async fn test_public_route_no_auth_required() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Health should be accessible without auth
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("X-Content-Type-Options").unwrap(),
        "nosniff"
    );
}
