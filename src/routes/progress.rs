// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Episode progress routes.
//!
//! Series and episode ids in the path are parsed into [`ContentId`], so
//! `/api/progress/01/2` and `/api/progress/1/2` address the same record.

use crate::db::ProgressStore;
use crate::error::{AppError, Result};
use crate::models::{BadgeDefinition, ContentId, EpisodeProgress, EpisodeState};
use crate::services::Session;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// Longest listening interval a single checkpoint may report.
const MAX_CHECKPOINT_SECONDS: u64 = 3600;

pub fn routes<S: ProgressStore>() -> Router<Arc<AppState<S>>> {
    Router::new()
        .route("/api/progress/last", get(get_last_progress::<S>))
        .route("/api/progress/{series}", get(get_series_progress::<S>))
        .route(
            "/api/progress/{series}/{episode}",
            get(get_episode_progress::<S>),
        )
        .route(
            "/api/progress/{series}/{episode}/checkpoint",
            put(checkpoint::<S>),
        )
        .route(
            "/api/progress/{series}/{episode}/answer",
            post(answer_question::<S>),
        )
        .route(
            "/api/progress/{series}/{episode}/complete",
            post(complete_episode::<S>),
        )
        .route(
            "/api/progress/{series}/{episode}/dictation",
            post(submit_dictation::<S>),
        )
}

fn parse_ids(series: &str, episode: &str) -> Result<(ContentId, ContentId)> {
    Ok((series.parse()?, episode.parse()?))
}

// ─── Responses ───────────────────────────────────────────────

#[derive(Serialize, Clone, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ProgressResponse {
    pub series_id: u32,
    pub episode_id: u32,
    pub state: EpisodeState,
    pub current_question_index: u32,
    pub score: u32,
    pub audio_time: f64,
    pub completed: bool,
    pub dictation_best_score: u8,
    pub last_access: String,
}

impl From<EpisodeProgress> for ProgressResponse {
    fn from(record: EpisodeProgress) -> Self {
        Self {
            state: record.state(),
            series_id: record.series_id.0,
            episode_id: record.episode_id.0,
            current_question_index: record.current_question_index,
            score: record.score,
            audio_time: record.audio_time,
            completed: record.completed,
            dictation_best_score: record.dictation_best_score,
            last_access: format_utc_rfc3339(record.last_access),
        }
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SeriesProgressResponse {
    pub series_id: u32,
    pub total_episodes: u32,
    pub completed_episodes: u32,
    pub has_diamond: bool,
    pub episodes: Vec<ProgressResponse>,
}

// ─── Reads ───────────────────────────────────────────────────

/// Most recently touched episode, for "continue where you left off".
async fn get_last_progress<S: ProgressStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(session): Extension<Session>,
) -> Result<Json<Option<ProgressResponse>>> {
    let last = state
        .gamification
        .progress()
        .get_last_progress(&session.uid)
        .await?;
    Ok(Json(last.map(Into::into)))
}

async fn get_series_progress<S: ProgressStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(session): Extension<Session>,
    Path(series): Path<String>,
) -> Result<Json<SeriesProgressResponse>> {
    let series_id: ContentId = series.parse()?;
    let series = state
        .curriculum
        .series(series_id)
        .ok_or_else(|| AppError::NotFound(format!("Series {}", series_id)))?;

    let records = state
        .gamification
        .progress()
        .get_series_progress(&session.uid, series_id)
        .await?;
    let has_diamond = crate::services::diamond::has_diamond(series, &records);

    Ok(Json(SeriesProgressResponse {
        series_id: series_id.0,
        total_episodes: series.episode_count() as u32,
        completed_episodes: series.completed_records(&records).count() as u32,
        has_diamond,
        episodes: records.into_iter().map(Into::into).collect(),
    }))
}

/// Point lookup; `null` when the episode was never started.
async fn get_episode_progress<S: ProgressStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(session): Extension<Session>,
    Path((series, episode)): Path<(String, String)>,
) -> Result<Json<Option<ProgressResponse>>> {
    let (series_id, episode_id) = parse_ids(&series, &episode)?;
    let record = state
        .gamification
        .progress()
        .get_progress(&session.uid, series_id, episode_id)
        .await?;
    Ok(Json(record.map(Into::into)))
}

// ─── Writes ──────────────────────────────────────────────────

#[derive(Deserialize, Validate)]
struct CheckpointRequest {
    #[validate(range(min = 0.0))]
    audio_time: f64,
    /// Seconds listened since the previous checkpoint
    #[serde(default)]
    #[validate(range(max = MAX_CHECKPOINT_SECONDS))]
    elapsed_seconds: u64,
}

async fn checkpoint<S: ProgressStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(session): Extension<Session>,
    Path((series, episode)): Path<(String, String)>,
    Json(body): Json<CheckpointRequest>,
) -> Result<Json<ProgressResponse>> {
    body.validate()?;
    let (series_id, episode_id) = parse_ids(&series, &episode)?;

    let record = state
        .gamification
        .checkpoint(
            &session,
            series_id,
            episode_id,
            body.audio_time,
            body.elapsed_seconds,
        )
        .await?;
    Ok(Json(record.into()))
}

#[derive(Deserialize)]
struct AnswerRequest {
    question_index: u32,
    selected_option: usize,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AnswerResponse {
    pub correct: bool,
    pub scored: bool,
    pub progress: ProgressResponse,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub xp: u64,
    pub badge: Option<BadgeDefinition>,
}

async fn answer_question<S: ProgressStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(session): Extension<Session>,
    Path((series, episode)): Path<(String, String)>,
    Json(body): Json<AnswerRequest>,
) -> Result<Json<AnswerResponse>> {
    let (series_id, episode_id) = parse_ids(&series, &episode)?;

    let outcome = state
        .gamification
        .answer_question(
            &session,
            series_id,
            episode_id,
            body.question_index,
            body.selected_option,
        )
        .await?;

    Ok(Json(AnswerResponse {
        correct: outcome.correct,
        scored: outcome.scored,
        progress: outcome.progress.into(),
        xp: outcome.xp,
        badge: outcome.badge.copied(),
    }))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CompletionResponse {
    pub progress: ProgressResponse,
    pub first_completion: bool,
    pub perfect_quiz: bool,
    pub series_completed: bool,
    pub diamond_earned: bool,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub xp: u64,
    /// At most one badge per action
    pub badge: Option<BadgeDefinition>,
}

async fn complete_episode<S: ProgressStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(session): Extension<Session>,
    Path((series, episode)): Path<(String, String)>,
) -> Result<Json<CompletionResponse>> {
    let (series_id, episode_id) = parse_ids(&series, &episode)?;

    let result = state
        .gamification
        .complete_episode(&session, series_id, episode_id)
        .await?;

    Ok(Json(CompletionResponse {
        progress: result.progress.into(),
        first_completion: result.first_completion,
        perfect_quiz: result.perfect_quiz,
        series_completed: result.series_completed,
        diamond_earned: result.diamond_earned,
        xp: result.xp,
        badge: result.badge.copied(),
    }))
}

#[derive(Deserialize, Validate)]
struct DictationRequest {
    #[validate(range(max = 100))]
    score: u32,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DictationResponse {
    pub best: u8,
    pub improved: bool,
    pub first_attempt: bool,
    pub new_perfect: bool,
    pub diamond_earned: bool,
    pub badge: Option<BadgeDefinition>,
}

async fn submit_dictation<S: ProgressStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(session): Extension<Session>,
    Path((series, episode)): Path<(String, String)>,
    Json(body): Json<DictationRequest>,
) -> Result<Json<DictationResponse>> {
    body.validate()?;
    let (series_id, episode_id) = parse_ids(&series, &episode)?;
    // Bounded by validation above
    let score = u8::try_from(body.score).unwrap_or(u8::MAX);

    let result = state
        .gamification
        .submit_dictation(&session, series_id, episode_id, score)
        .await?;

    Ok(Json(DictationResponse {
        best: result.outcome.best,
        improved: result.outcome.improved,
        first_attempt: result.outcome.first_attempt,
        new_perfect: result.outcome.new_perfect,
        diamond_earned: result.diamond_earned,
        badge: result.badge.copied(),
    }))
}
