// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! End-to-end gamification scenarios: streaks, diamonds, badges, rankings.

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use lingo_progress::db::ProgressStore;
use lingo_progress::models::{ContentId, User, UserStatus};
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::{body_json, create_test_app, empty_request, json_request};

/// Seed a learner who was active yesterday with the given streak.
async fn seed_learner<S: ProgressStore>(store: &S, uid: &str, streak: u32) {
    let mut user = User::new(uid, None, "Seeded", Utc::now() - Duration::days(30));
    user.streak = streak;
    user.last_activity = Some(Utc::now() - Duration::days(1));
    store.create_user(&user).await.unwrap();
}

#[tokio::test]
async fn test_diamond_scenario_end_to_end() {
    let (app, state) = create_test_app();
    seed_learner(&state.store, "learner-1", 5).await;

    let response = app
        .clone()
        .oneshot(empty_request("POST", "/api/session", "learner-1"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["user"]["streak"], 6);
    assert_eq!(body["streak_changed"], true);
    assert_eq!(body["badge"]["id"], "streak_3");

    // First attempts on each of the three coffee shop episodes
    for (episode, score) in [(1, 100), (2, 96), (3, 94)] {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/api/progress/1/{}/dictation", episode),
                "learner-1",
                json!({"score": score}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["first_attempt"], true);
        assert_eq!(body["diamond_earned"], false);
    }

    for episode in [1, 2] {
        let response = app
            .clone()
            .oneshot(empty_request(
                "POST",
                &format!("/api/progress/1/{}/complete", episode),
                "learner-1",
            ))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["diamond_earned"], false);
    }

    // Final episode: average 96.67 earns the diamond and its badge wins
    let response = app
        .clone()
        .oneshot(empty_request("POST", "/api/progress/1/3/complete", "learner-1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["series_completed"], true);
    assert_eq!(body["diamond_earned"], true);
    assert_eq!(body["badge"]["id"], "first_diamond");
    assert_eq!(body["badge"]["epic"], true);

    let user = state.store.get_user("learner-1").await.unwrap().unwrap();
    assert!(user.diamond_series_ids.contains(&ContentId(1)));
    assert!(user.completed_series_ids.contains(&ContentId(1)));
    assert_eq!(user.series_with_diamond, 1);
    assert_eq!(user.total_series_completed, 1);
    assert!(!user.badges.contains("first_series"));
    assert!((user.dictation_accuracy() - 96.666).abs() < 0.01);

    let response = app
        .oneshot(empty_request("GET", "/api/progress/1", "learner-1"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["has_diamond"], true);
    assert_eq!(body["completed_episodes"], 3);
    assert_eq!(body["total_episodes"], 3);
}

#[tokio::test]
async fn test_incomplete_series_reports_no_diamond() {
    let (app, _) = create_test_app();

    for episode in [1, 2] {
        app.clone()
            .oneshot(json_request(
                "POST",
                &format!("/api/progress/1/{}/dictation", episode),
                "learner-1",
                json!({"score": 100}),
            ))
            .await
            .unwrap();
        app.clone()
            .oneshot(empty_request(
                "POST",
                &format!("/api/progress/1/{}/complete", episode),
                "learner-1",
            ))
            .await
            .unwrap();
    }

    let response = app
        .oneshot(empty_request("GET", "/api/progress/1", "learner-1"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["has_diamond"], false);
    assert_eq!(body["completed_episodes"], 2);
}

#[tokio::test]
async fn test_badges_endpoint_marks_earned() {
    let (app, _) = create_test_app();

    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/progress/2/1/dictation",
            "learner-1",
            json!({"score": 100}),
        ))
        .await
        .unwrap();

    let response = app
        .oneshot(empty_request("GET", "/api/badges", "learner-1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    assert_eq!(body["earned_count"], 1);
    let badges = body["badges"].as_array().unwrap();
    assert_eq!(badges[0]["id"], "first_diamond");
    let perfect_ear = badges.iter().find(|b| b["id"] == "perfect_ear").unwrap();
    assert_eq!(perfect_ear["earned"], true);
    assert_eq!(perfect_ear["requirement"]["type"], "perfect_dictations");
}

#[tokio::test]
async fn test_me_requires_hydrated_user() {
    let (app, _) = create_test_app();

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/api/me", "learner-9"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    app.clone()
        .oneshot(empty_request("POST", "/api/session", "learner-9"))
        .await
        .unwrap();

    let response = app
        .oneshot(empty_request("GET", "/api/me", "learner-9"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["email"], "learner-9@example.com");
    assert_eq!(body["streak"], 1);
}

#[tokio::test]
async fn test_recalculate_repairs_counters() {
    let (app, state) = create_test_app();

    for episode in [1, 2] {
        app.clone()
            .oneshot(empty_request(
                "POST",
                &format!("/api/progress/2/{}/complete", episode),
                "learner-1",
            ))
            .await
            .unwrap();
    }

    // Simulate lost counter writes
    let mut user = state.store.get_user("learner-1").await.unwrap().unwrap();
    user.total_episodes_completed = 0;
    user.total_series_completed = 0;
    state.store.update_user_scalars(&user).await.unwrap();

    let response = app
        .oneshot(empty_request("POST", "/api/stats/recalculate", "learner-1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total_episodes_completed"], 2);
    assert_eq!(body["total_series_completed"], 1);
    assert_eq!(body["completed_series_ids"], json!([2]));
}

#[tokio::test]
async fn test_xp_ranking() {
    let (app, state) = create_test_app();

    for (uid, xp, status) in [
        ("alice", 900, UserStatus::Active),
        ("bob", 300, UserStatus::Active),
        ("carol", 300, UserStatus::Active),
        ("mallory", 9000, UserStatus::Suspended),
    ] {
        let mut user = User::new(uid, None, uid, Utc::now());
        user.xp = xp;
        user.status = status;
        state.store.create_user(&user).await.unwrap();
    }

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/api/ranking?kind=xp&limit=10", "carol"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let entries = body["entries"].as_array().unwrap();

    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["display_name"], "alice");
    assert_eq!(entries[1]["rank"], 2);
    assert_eq!(entries[2]["rank"], 2);
    assert!(entries
        .iter()
        .any(|e| e["display_name"] == "carol" && e["is_viewer"] == true));

    let response = app
        .oneshot(empty_request("GET", "/api/ranking?limit=0", "carol"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_weekly_ranking_counts_only_current_week() {
    let (app, _) = create_test_app();

    app.clone()
        .oneshot(json_request(
            "PUT",
            "/api/progress/1/1/checkpoint",
            "learner-1",
            json!({"audio_time": 120.0, "elapsed_seconds": 120}),
        ))
        .await
        .unwrap();

    let response = app
        .oneshot(empty_request(
            "GET",
            "/api/ranking?kind=weekly_time",
            "learner-1",
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["kind"], "weekly_time");
    let entries = body["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["value"], 120);
    assert_eq!(entries[0]["is_viewer"], true);
}
