// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-episode progress records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ContentId;

/// Highest possible dictation score.
pub const PERFECT_SCORE: u8 = 100;

/// Stored progress for one (user, series, episode).
///
/// Stored at: `episode_progress/{uid}_{series_id}_{episode_id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeProgress {
    /// Owner uid
    pub uid: String,
    pub series_id: ContentId,
    pub episode_id: ContentId,
    /// Next question to answer (0-based)
    #[serde(default)]
    pub current_question_index: u32,
    /// Number of correctly answered questions
    #[serde(default)]
    pub score: u32,
    /// Playback position (seconds)
    #[serde(default)]
    pub audio_time: f64,
    /// Once true, never reverts
    #[serde(default)]
    pub completed: bool,
    /// Best dictation score (0-100), never decreases
    #[serde(default)]
    pub dictation_best_score: u8,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub last_access: DateTime<Utc>,
}

/// Partial update applied on top of an existing record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressPatch {
    pub current_question_index: Option<u32>,
    pub score: Option<u32>,
    pub audio_time: Option<f64>,
    pub completed: Option<bool>,
    pub dictation_best_score: Option<u8>,
}

/// Lifecycle of an episode for one learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(ts_rs::TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeState {
    NotStarted,
    InProgress,
    Completed,
}

impl EpisodeState {
    pub fn of(record: Option<&EpisodeProgress>) -> Self {
        match record {
            None => EpisodeState::NotStarted,
            Some(r) if r.completed => EpisodeState::Completed,
            Some(_) => EpisodeState::InProgress,
        }
    }
}

impl EpisodeProgress {
    /// An empty record, as if the episode had never been opened.
    pub fn empty(
        uid: impl Into<String>,
        series_id: ContentId,
        episode_id: ContentId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            uid: uid.into(),
            series_id,
            episode_id,
            current_question_index: 0,
            score: 0,
            audio_time: 0.0,
            completed: false,
            dictation_best_score: 0,
            last_access: now,
        }
    }

    /// Merge a patch into this record and stamp `last_access`.
    ///
    /// `completed` and `dictation_best_score` are ratchets: a patch can set
    /// them forward but never back.
    pub fn apply(&mut self, patch: &ProgressPatch, now: DateTime<Utc>) {
        if let Some(index) = patch.current_question_index {
            self.current_question_index = index;
        }
        if let Some(score) = patch.score {
            self.score = score;
        }
        if let Some(audio_time) = patch.audio_time {
            self.audio_time = audio_time.max(0.0);
        }
        if patch.completed == Some(true) {
            self.completed = true;
        }
        if let Some(best) = patch.dictation_best_score {
            self.dictation_best_score = self.dictation_best_score.max(best.min(PERFECT_SCORE));
        }
        self.last_access = now;
    }

    pub fn state(&self) -> EpisodeState {
        EpisodeState::of(Some(self))
    }
}
