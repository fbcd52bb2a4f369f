// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::models::ContentId;

/// Account status. Suspended users keep their data but drop out of rankings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Suspended,
}

/// User profile and aggregate stats stored in Firestore.
///
/// Stored at: `users/{uid}`
///
/// The set fields (`badges`, `completed_series_ids`, `diamond_series_ids`)
/// are only written through the store's atomic append-unique primitive.
/// Progression stats are written with [`SCALAR_FIELDS`] as the field mask,
/// so scalar writes never clobber a concurrent set append. Profile fields
/// and `status` are set when the document is created and are outside the
/// mask; a stale in-flight copy can never revert a suspension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Identity provider uid (also used as document ID)
    pub uid: String,
    pub email: Option<String>,
    pub display_name: String,
    #[serde(default)]
    pub status: UserStatus,

    // ─── Progression ─────────────────────────────────────────────
    #[serde(default)]
    pub xp: u64,
    /// Consecutive calendar days with activity
    #[serde(default)]
    pub streak: u32,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub last_activity: Option<DateTime<Utc>>,

    // ─── Sets (append-only) ──────────────────────────────────────
    #[serde(default)]
    pub badges: BTreeSet<String>,
    #[serde(default)]
    pub completed_series_ids: BTreeSet<ContentId>,
    /// Always a subset of `completed_series_ids`
    #[serde(default)]
    pub diamond_series_ids: BTreeSet<ContentId>,

    // ─── Cached counters (rebuildable from progress records) ─────
    #[serde(default)]
    pub total_episodes_completed: u32,
    #[serde(default)]
    pub total_series_completed: u32,
    #[serde(default)]
    pub series_with_diamond: u32,
    /// Sum of first-attempt dictation scores
    #[serde(default)]
    pub total_dictation_score: u64,
    /// Number of episodes with at least one dictation attempt
    #[serde(default)]
    pub total_dictation_count: u32,
    #[serde(default)]
    pub perfect_dictation_count: u32,
    #[serde(default)]
    pub perfect_quiz_count: u32,

    // ─── Weekly bucket ───────────────────────────────────────────
    /// Seconds of listening in the week named by `weekly_time_start`
    #[serde(default)]
    pub weekly_time_spent: u64,
    /// ISO week key ("2026-W42")
    #[serde(default)]
    pub weekly_time_start: String,

    #[serde(with = "firestore::serialize_as_timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Fields written by a scalar update. Never includes the set fields or the
/// profile and `status` fields.
pub const SCALAR_FIELDS: [&str; 12] = [
    "xp",
    "streak",
    "last_activity",
    "total_episodes_completed",
    "total_series_completed",
    "series_with_diamond",
    "total_dictation_score",
    "total_dictation_count",
    "perfect_dictation_count",
    "perfect_quiz_count",
    "weekly_time_spent",
    "weekly_time_start",
];

impl User {
    /// A fresh user with zeroed stats.
    pub fn new(
        uid: impl Into<String>,
        email: Option<String>,
        display_name: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            uid: uid.into(),
            email,
            display_name: display_name.into(),
            status: UserStatus::Active,
            xp: 0,
            streak: 0,
            last_activity: None,
            badges: BTreeSet::new(),
            completed_series_ids: BTreeSet::new(),
            diamond_series_ids: BTreeSet::new(),
            total_episodes_completed: 0,
            total_series_completed: 0,
            series_with_diamond: 0,
            total_dictation_score: 0,
            total_dictation_count: 0,
            perfect_dictation_count: 0,
            perfect_quiz_count: 0,
            weekly_time_spent: 0,
            weekly_time_start: String::new(),
            created_at: now,
        }
    }

    /// Overall dictation accuracy (0-100), 0 when nothing was dictated yet.
    pub fn dictation_accuracy(&self) -> f64 {
        if self.total_dictation_count == 0 {
            0.0
        } else {
            self.total_dictation_score as f64 / f64::from(self.total_dictation_count)
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.status == UserStatus::Suspended
    }

    /// Copy the scalar fields of `other` onto `self`, leaving the sets alone.
    ///
    /// Mirrors what a masked write with [`SCALAR_FIELDS`] does in Firestore.
    pub fn apply_scalars(&mut self, other: &User) {
        self.xp = other.xp;
        self.streak = other.streak;
        self.last_activity = other.last_activity;
        self.total_episodes_completed = other.total_episodes_completed;
        self.total_series_completed = other.total_series_completed;
        self.series_with_diamond = other.series_with_diamond;
        self.total_dictation_score = other.total_dictation_score;
        self.total_dictation_count = other.total_dictation_count;
        self.perfect_dictation_count = other.perfect_dictation_count;
        self.perfect_quiz_count = other.perfect_quiz_count;
        self.weekly_time_spent = other.weekly_time_spent;
        self.weekly_time_start = other.weekly_time_start.clone();
    }
}
