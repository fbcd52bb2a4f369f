// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process progress store.
//!
//! Behaves like the Firestore collections: scalar writes are masked, set
//! appends are atomic per user document (a DashMap entry lock), and missing
//! documents come back as `None`. Used by tests and `STORE=memory`.

use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::db::{progress_doc_id, ProgressStore, RankField, SetValue, UserSetField};
use crate::error::AppError;
use crate::models::{ContentId, EpisodeProgress, User};

#[derive(Clone, Default)]
pub struct MemoryStore {
    users: Arc<DashMap<String, User>>,
    progress: Arc<DashMap<String, EpisodeProgress>>,
    offline: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail, as if the backend were unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), AppError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(AppError::Database("Store unavailable (offline)".to_string()))
        } else {
            Ok(())
        }
    }

    fn user_records(&self, uid: &str) -> Vec<EpisodeProgress> {
        self.progress
            .iter()
            .filter(|entry| entry.uid == uid)
            .map(|entry| entry.value().clone())
            .collect()
    }
}

impl ProgressStore for MemoryStore {
    async fn get_user(&self, uid: &str) -> Result<Option<User>, AppError> {
        self.check_online()?;
        Ok(self.users.get(uid).map(|u| u.value().clone()))
    }

    async fn create_user(&self, user: &User) -> Result<(), AppError> {
        self.check_online()?;
        self.users.insert(user.uid.clone(), user.clone());
        Ok(())
    }

    async fn update_user_scalars(&self, user: &User) -> Result<(), AppError> {
        self.check_online()?;
        self.users
            .entry(user.uid.clone())
            .and_modify(|stored| stored.apply_scalars(user))
            .or_insert_with(|| user.clone());
        Ok(())
    }

    async fn append_to_user_set(
        &self,
        uid: &str,
        field: UserSetField,
        value: SetValue,
    ) -> Result<(), AppError> {
        self.check_online()?;
        let mut user = self
            .users
            .get_mut(uid)
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", uid)))?;

        match (field, value) {
            (UserSetField::Badges, SetValue::Badge(id)) => {
                user.badges.insert(id);
            }
            (UserSetField::CompletedSeries, SetValue::Series(id)) => {
                user.completed_series_ids.insert(id);
            }
            (UserSetField::DiamondSeries, SetValue::Series(id)) => {
                user.diamond_series_ids.insert(id);
            }
            (field, value) => {
                return Err(AppError::BadRequest(format!(
                    "Value {:?} does not belong in {}",
                    value,
                    field.field_name()
                )))
            }
        }
        Ok(())
    }

    async fn get_progress(
        &self,
        uid: &str,
        series_id: ContentId,
        episode_id: ContentId,
    ) -> Result<Option<EpisodeProgress>, AppError> {
        self.check_online()?;
        let doc_id = progress_doc_id(uid, series_id, episode_id);
        Ok(self.progress.get(&doc_id).map(|r| r.value().clone()))
    }

    async fn put_progress(&self, record: &EpisodeProgress) -> Result<(), AppError> {
        self.check_online()?;
        let doc_id = progress_doc_id(&record.uid, record.series_id, record.episode_id);
        self.progress.insert(doc_id, record.clone());
        Ok(())
    }

    async fn list_series_progress(
        &self,
        uid: &str,
        series_id: ContentId,
    ) -> Result<Vec<EpisodeProgress>, AppError> {
        self.check_online()?;
        let mut records: Vec<_> = self
            .user_records(uid)
            .into_iter()
            .filter(|r| r.series_id == series_id)
            .collect();
        records.sort_by_key(|r| r.episode_id);
        Ok(records)
    }

    async fn list_recent_progress(
        &self,
        uid: &str,
        limit: u32,
    ) -> Result<Vec<EpisodeProgress>, AppError> {
        self.check_online()?;
        let mut records = self.user_records(uid);
        records.sort_by(|a, b| b.last_access.cmp(&a.last_access));
        records.truncate(limit as usize);
        Ok(records)
    }

    async fn list_all_progress(&self, uid: &str) -> Result<Vec<EpisodeProgress>, AppError> {
        self.check_online()?;
        Ok(self.user_records(uid))
    }

    async fn list_ranked_users(
        &self,
        field: RankField,
        week_key: Option<&str>,
        limit: u32,
    ) -> Result<Vec<User>, AppError> {
        self.check_online()?;
        let mut users: Vec<User> = self
            .users
            .iter()
            .filter(|u| !u.is_suspended())
            .filter(|u| week_key.is_none_or(|key| u.weekly_time_start == key))
            .map(|u| u.value().clone())
            .collect();
        users.sort_by(|a, b| {
            field
                .value_of(b)
                .cmp(&field.value_of(a))
                .then_with(|| a.uid.cmp(&b.uid))
        });
        users.truncate(limit as usize);
        Ok(users)
    }
}
