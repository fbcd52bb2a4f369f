// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::db::ProgressStore;
use crate::error::Result;
use crate::models::{BadgeDefinition, User, BADGES};
use crate::services::{RankingEntry, RankingKind, Session, StreakUpdate};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes<S: ProgressStore>() -> Router<Arc<AppState<S>>> {
    Router::new()
        .route("/api/session", post(start_session::<S>))
        .route("/api/me", get(get_me::<S>))
        .route("/api/badges", get(get_badges::<S>))
        .route("/api/stats/recalculate", post(recalculate::<S>))
        .route("/api/ranking", get(get_ranking::<S>))
}

// ─── User Profile ────────────────────────────────────────────

/// Current user response.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserResponse {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub xp: u64,
    pub streak: u32,
    pub last_activity: Option<String>,
    pub badges: Vec<String>,
    pub completed_series_ids: Vec<u32>,
    pub diamond_series_ids: Vec<u32>,
    pub total_episodes_completed: u32,
    pub total_series_completed: u32,
    pub series_with_diamond: u32,
    /// Average first-attempt dictation score (0-100)
    pub dictation_accuracy: f64,
    pub perfect_dictation_count: u32,
    pub perfect_quiz_count: u32,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub weekly_time_spent: u64,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        let dictation_accuracy = user.dictation_accuracy();
        Self {
            uid: user.uid,
            email: user.email,
            display_name: user.display_name,
            xp: user.xp,
            streak: user.streak,
            last_activity: user.last_activity.map(format_utc_rfc3339),
            badges: user.badges.into_iter().collect(),
            completed_series_ids: user.completed_series_ids.iter().map(|id| id.0).collect(),
            diamond_series_ids: user.diamond_series_ids.iter().map(|id| id.0).collect(),
            total_episodes_completed: user.total_episodes_completed,
            total_series_completed: user.total_series_completed,
            series_with_diamond: user.series_with_diamond,
            dictation_accuracy,
            perfect_dictation_count: user.perfect_dictation_count,
            perfect_quiz_count: user.perfect_quiz_count,
            weekly_time_spent: user.weekly_time_spent,
        }
    }
}

/// Get current user profile.
async fn get_me<S: ProgressStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(session): Extension<Session>,
) -> Result<Json<UserResponse>> {
    let user = state.gamification.get_user(&session).await?;
    Ok(Json(user.into()))
}

// ─── Session Hydration ───────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionResponse {
    pub user: UserResponse,
    /// The streak moved during this hydration
    pub streak_changed: bool,
    pub badge: Option<BadgeDefinition>,
}

/// Hydrate the session after sign-in: create the user on first visit and
/// count today's activity towards the streak.
async fn start_session<S: ProgressStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(session): Extension<Session>,
) -> Result<Json<SessionResponse>> {
    let snapshot = state.gamification.start_session(&session).await?;

    tracing::info!(
        uid = %session.uid,
        streak = snapshot.user.streak,
        badge = snapshot.badge.map(|b| b.id),
        "Session started"
    );

    Ok(Json(SessionResponse {
        user: snapshot.user.into(),
        streak_changed: matches!(snapshot.streak, StreakUpdate::Changed(_)),
        badge: snapshot.badge.copied(),
    }))
}

// ─── Badges ──────────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct BadgeStatus {
    #[serde(flatten)]
    pub badge: BadgeDefinition,
    pub earned: bool,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct BadgesResponse {
    pub badges: Vec<BadgeStatus>,
    pub earned_count: u32,
}

/// Full badge catalogue with the viewer's earned flags, in catalogue order.
async fn get_badges<S: ProgressStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(session): Extension<Session>,
) -> Result<Json<BadgesResponse>> {
    let user = state.gamification.get_user(&session).await?;

    let badges: Vec<BadgeStatus> = BADGES
        .iter()
        .map(|b| BadgeStatus {
            badge: *b,
            earned: user.badges.contains(b.id),
        })
        .collect();
    let earned_count = badges.iter().filter(|b| b.earned).count() as u32;

    Ok(Json(BadgesResponse {
        badges,
        earned_count,
    }))
}

// ─── Stats Repair ────────────────────────────────────────────

/// Rebuild the caller's derived counters from their progress records.
async fn recalculate<S: ProgressStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(session): Extension<Session>,
) -> Result<Json<UserResponse>> {
    tracing::info!(uid = %session.uid, "User-initiated stats recalculation");
    let user = state.gamification.recalculate(&session).await?;
    Ok(Json(user.into()))
}

// ─── Ranking ─────────────────────────────────────────────────

#[derive(Deserialize, Validate)]
struct RankingQuery {
    #[serde(default)]
    kind: RankingKind,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100))]
    limit: u32,
}

fn default_limit() -> u32 {
    20
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RankingResponse {
    pub kind: RankingKind,
    pub entries: Vec<RankingEntry>,
}

async fn get_ranking<S: ProgressStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(session): Extension<Session>,
    Query(params): Query<RankingQuery>,
) -> Result<Json<RankingResponse>> {
    params.validate()?;

    let entries = state
        .ranking
        .leaderboard(params.kind, params.limit, &session.uid)
        .await?;

    Ok(Json(RankingResponse {
        kind: params.kind,
        entries,
    }))
}
