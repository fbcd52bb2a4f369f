// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer.
//!
//! [`ProgressStore`] is the document-store interface the services depend on.
//! [`FirestoreDb`] implements it for production and [`MemoryStore`] for tests
//! and offline development.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use std::future::Future;

use crate::error::AppError;
use crate::models::{ContentId, EpisodeProgress, User};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Per-episode progress records (keyed by uid, series and episode)
    pub const EPISODE_PROGRESS: &str = "episode_progress";
}

/// Array fields on the user document with set semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserSetField {
    Badges,
    CompletedSeries,
    DiamondSeries,
}

impl UserSetField {
    pub fn field_name(self) -> &'static str {
        match self {
            UserSetField::Badges => "badges",
            UserSetField::CompletedSeries => "completed_series_ids",
            UserSetField::DiamondSeries => "diamond_series_ids",
        }
    }
}

/// Value appended to a [`UserSetField`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetValue {
    Badge(String),
    Series(ContentId),
}

/// Numeric user field a ranking is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankField {
    Xp,
    Streak,
    WeeklyTimeSpent,
}

impl RankField {
    pub fn field_name(self) -> &'static str {
        match self {
            RankField::Xp => "xp",
            RankField::Streak => "streak",
            RankField::WeeklyTimeSpent => "weekly_time_spent",
        }
    }

    pub fn value_of(self, user: &User) -> u64 {
        match self {
            RankField::Xp => user.xp,
            RankField::Streak => u64::from(user.streak),
            RankField::WeeklyTimeSpent => user.weekly_time_spent,
        }
    }
}

/// Document id for a progress record.
///
/// Ids are already canonical numbers, so "1" and 1 share a document.
pub fn progress_doc_id(uid: &str, series_id: ContentId, episode_id: ContentId) -> String {
    format!("{}_{}_{}", urlencoding::encode(uid), series_id, episode_id)
}

/// Keyed document store holding users and their progress records.
///
/// Missing documents are `Ok(None)`, never an error.
pub trait ProgressStore: Clone + Send + Sync + 'static {
    fn get_user(&self, uid: &str) -> impl Future<Output = Result<Option<User>, AppError>> + Send;

    /// Write a new user document (all fields).
    fn create_user(&self, user: &User) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Merge the scalar fields of `user` into the stored document.
    ///
    /// Set fields are left untouched.
    fn update_user_scalars(&self, user: &User)
        -> impl Future<Output = Result<(), AppError>> + Send;

    /// Atomically add `value` to a set field if it is not already present.
    fn append_to_user_set(
        &self,
        uid: &str,
        field: UserSetField,
        value: SetValue,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    fn get_progress(
        &self,
        uid: &str,
        series_id: ContentId,
        episode_id: ContentId,
    ) -> impl Future<Output = Result<Option<EpisodeProgress>, AppError>> + Send;

    fn put_progress(
        &self,
        record: &EpisodeProgress,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    fn list_series_progress(
        &self,
        uid: &str,
        series_id: ContentId,
    ) -> impl Future<Output = Result<Vec<EpisodeProgress>, AppError>> + Send;

    /// Most recently accessed records first.
    fn list_recent_progress(
        &self,
        uid: &str,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<EpisodeProgress>, AppError>> + Send;

    fn list_all_progress(
        &self,
        uid: &str,
    ) -> impl Future<Output = Result<Vec<EpisodeProgress>, AppError>> + Send;

    /// Active users ordered by `field`, highest first.
    ///
    /// With `week_key`, only users whose weekly bucket belongs to that ISO
    /// week are returned.
    fn list_ranked_users(
        &self,
        field: RankField,
        week_key: Option<&str>,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<User>, AppError>> + Send;
}
