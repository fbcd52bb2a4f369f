// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Progress store adapter.
//!
//! Reads and writes per-episode progress records and keeps the derived
//! counters on the user document. Nothing here is transactional: the counters
//! are caches of [`ProgressService::recalculate_all`] over the raw records, so
//! a lost counter write is repaired by the next recompute.

use chrono::{DateTime, FixedOffset, Utc};
use std::collections::BTreeMap;

use crate::db::{ProgressStore, SetValue, UserSetField};
use crate::error::Result;
use crate::models::{ContentId, EpisodeProgress, ProgressPatch, Series, User, PERFECT_SCORE};
use crate::services::diamond;
use crate::services::CurriculumService;
use crate::time_utils::{local_day, week_key};

/// How many recent records `get_last_progress` looks at.
const LAST_PROGRESS_SCAN: u32 = 5;

/// Result of a dictation submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DictationOutcome {
    /// Stored best score after this submission
    pub best: u8,
    /// The submission raised the stored best
    pub improved: bool,
    /// No scored attempt existed before (previous best was 0)
    pub first_attempt: bool,
    /// First 100 on this episode
    pub new_perfect: bool,
}

/// Result of updating completion counters for a series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompletionOutcome {
    /// The series was added to `completed_series_ids` by this call
    pub series_completed_now: bool,
}

#[derive(Clone)]
pub struct ProgressService<S> {
    store: S,
    curriculum: CurriculumService,
    tz: FixedOffset,
}

impl<S: ProgressStore> ProgressService<S> {
    pub fn new(store: S, curriculum: CurriculumService, tz: FixedOffset) -> Self {
        Self {
            store,
            curriculum,
            tz,
        }
    }

    /// Merge `patch` into the stored record (creating it if needed) and save.
    pub async fn save_episode_progress(
        &self,
        uid: &str,
        series_id: ContentId,
        episode_id: ContentId,
        patch: &ProgressPatch,
    ) -> Result<EpisodeProgress> {
        let now = Utc::now();
        let mut record = self
            .store
            .get_progress(uid, series_id, episode_id)
            .await?
            .unwrap_or_else(|| EpisodeProgress::empty(uid, series_id, episode_id, now));

        record.apply(patch, now);
        self.store.put_progress(&record).await?;

        tracing::debug!(
            uid,
            series = %series_id,
            episode = %episode_id,
            state = ?record.state(),
            "Saved episode progress"
        );
        Ok(record)
    }

    pub async fn get_progress(
        &self,
        uid: &str,
        series_id: ContentId,
        episode_id: ContentId,
    ) -> Result<Option<EpisodeProgress>> {
        self.store.get_progress(uid, series_id, episode_id).await
    }

    pub async fn get_series_progress(
        &self,
        uid: &str,
        series_id: ContentId,
    ) -> Result<Vec<EpisodeProgress>> {
        self.store.list_series_progress(uid, series_id).await
    }

    /// Most recently touched record, for "continue where you left off".
    ///
    /// A completed tutorial episode never hides real progress: it is skipped
    /// in favour of the next most recent record.
    pub async fn get_last_progress(&self, uid: &str) -> Result<Option<EpisodeProgress>> {
        let recent = self
            .store
            .list_recent_progress(uid, LAST_PROGRESS_SCAN)
            .await?;
        Ok(pick_last_progress(recent))
    }

    /// Save a dictation score and update the running accuracy counters.
    ///
    /// Only the first scored attempt on an episode feeds the accuracy
    /// average, so retries cannot inflate it. Counter writes are best-effort.
    pub async fn save_dictation_score(
        &self,
        user: &mut User,
        series_id: ContentId,
        episode_id: ContentId,
        score: u8,
    ) -> Result<DictationOutcome> {
        let score = score.min(PERFECT_SCORE);
        let previous_best = self
            .store
            .get_progress(&user.uid, series_id, episode_id)
            .await?
            .map(|r| r.dictation_best_score)
            .unwrap_or(0);

        let record = self
            .save_episode_progress(
                &user.uid,
                series_id,
                episode_id,
                &ProgressPatch {
                    dictation_best_score: Some(score),
                    ..Default::default()
                },
            )
            .await?;

        let outcome = DictationOutcome {
            best: record.dictation_best_score,
            improved: score > previous_best,
            first_attempt: previous_best == 0,
            new_perfect: score == PERFECT_SCORE && previous_best < PERFECT_SCORE,
        };

        if outcome.first_attempt {
            user.total_dictation_score += u64::from(score);
            user.total_dictation_count += 1;
        }
        if outcome.new_perfect {
            user.perfect_dictation_count += 1;
        }

        if outcome.first_attempt || outcome.new_perfect {
            if let Err(e) = self.store.update_user_scalars(user).await {
                tracing::warn!(uid = %user.uid, error = %e, "Failed to update dictation counters");
            }
        }

        tracing::info!(
            uid = %user.uid,
            series = %series_id,
            episode = %episode_id,
            score,
            best = outcome.best,
            first_attempt = outcome.first_attempt,
            "Dictation scored"
        );
        Ok(outcome)
    }

    /// Recompute completion counters after an episode completes.
    ///
    /// The series is recorded as completed the first time every one of its
    /// episodes has a completed record. Writes the user's scalars.
    pub async fn record_completion(
        &self,
        user: &mut User,
        series_id: ContentId,
    ) -> Result<CompletionOutcome> {
        let records = self.store.list_all_progress(&user.uid).await?;
        user.total_episodes_completed = self.count_completed_episodes(&records);

        let mut outcome = CompletionOutcome::default();
        let series_done = self
            .curriculum
            .series(series_id)
            .is_some_and(|series| series_fully_completed(series, &records));

        if series_done && !user.completed_series_ids.contains(&series_id) {
            self.store
                .append_to_user_set(
                    &user.uid,
                    UserSetField::CompletedSeries,
                    SetValue::Series(series_id),
                )
                .await?;
            user.completed_series_ids.insert(series_id);
            outcome.series_completed_now = true;
            tracing::info!(uid = %user.uid, series = %series_id, "Series completed");
        }

        user.total_series_completed = user.completed_series_ids.len() as u32;
        self.store.update_user_scalars(user).await?;
        Ok(outcome)
    }

    /// Rebuild every derived counter from the raw progress records.
    ///
    /// Sets only grow: a series or diamond already recorded stays recorded.
    /// XP is not derivable from progress records and is left alone.
    pub async fn recalculate_all(&self, user: &mut User) -> Result<()> {
        let records = self.store.list_all_progress(&user.uid).await?;

        let mut by_series: BTreeMap<ContentId, Vec<EpisodeProgress>> = BTreeMap::new();
        for record in &records {
            by_series
                .entry(record.series_id)
                .or_default()
                .push(record.clone());
        }

        for (series_id, series_records) in &by_series {
            let Some(series) = self.curriculum.series(*series_id) else {
                continue;
            };

            if series_fully_completed(series, series_records)
                && !user.completed_series_ids.contains(series_id)
            {
                self.store
                    .append_to_user_set(
                        &user.uid,
                        UserSetField::CompletedSeries,
                        SetValue::Series(*series_id),
                    )
                    .await?;
                user.completed_series_ids.insert(*series_id);
            }

            if diamond::has_diamond(series, series_records)
                && !user.diamond_series_ids.contains(series_id)
            {
                self.store
                    .append_to_user_set(
                        &user.uid,
                        UserSetField::DiamondSeries,
                        SetValue::Series(*series_id),
                    )
                    .await?;
                user.diamond_series_ids.insert(*series_id);
            }
        }

        let dictated: Vec<&EpisodeProgress> = records
            .iter()
            .filter(|r| r.dictation_best_score > 0)
            .collect();

        user.total_episodes_completed = self.count_completed_episodes(&records);
        user.total_series_completed = user.completed_series_ids.len() as u32;
        user.series_with_diamond = user.diamond_series_ids.len() as u32;
        user.total_dictation_score = dictated
            .iter()
            .map(|r| u64::from(r.dictation_best_score))
            .sum();
        user.total_dictation_count = dictated.len() as u32;
        user.perfect_dictation_count = dictated
            .iter()
            .filter(|r| r.dictation_best_score == PERFECT_SCORE)
            .count() as u32;
        user.perfect_quiz_count = records
            .iter()
            .filter(|r| r.completed && self.is_perfect_quiz(r))
            .count() as u32;

        self.store.update_user_scalars(user).await?;

        tracing::info!(
            uid = %user.uid,
            records = records.len(),
            episodes = user.total_episodes_completed,
            series = user.total_series_completed,
            diamonds = user.series_with_diamond,
            "Recalculated user stats"
        );
        Ok(())
    }

    /// Add listening time to the user's weekly bucket.
    ///
    /// The bucket restarts whenever the ISO week changes.
    pub async fn record_time_spent(
        &self,
        user: &mut User,
        seconds: u64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let key = week_key(local_day(now, &self.tz));
        if user.weekly_time_start != key {
            user.weekly_time_start = key;
            user.weekly_time_spent = 0;
        }
        user.weekly_time_spent = user.weekly_time_spent.saturating_add(seconds);
        self.store.update_user_scalars(user).await
    }

    /// Completed non-tutorial episodes the curriculum still lists.
    fn count_completed_episodes(&self, records: &[EpisodeProgress]) -> u32 {
        records
            .iter()
            .filter(|r| r.completed && !r.series_id.is_tutorial())
            .filter(|r| self.curriculum.episode(r.series_id, r.episode_id).is_some())
            .count() as u32
    }

    /// Every question of the episode answered correctly.
    pub fn is_perfect_quiz(&self, record: &EpisodeProgress) -> bool {
        self.curriculum
            .episode(record.series_id, record.episode_id)
            .is_some_and(|e| !e.questions.is_empty() && record.score as usize >= e.questions.len())
    }
}

fn pick_last_progress(recent: Vec<EpisodeProgress>) -> Option<EpisodeProgress> {
    let hidden = |r: &EpisodeProgress| r.series_id.is_tutorial() && r.completed;
    match recent.iter().position(|r| !hidden(r)) {
        Some(i) => recent.into_iter().nth(i),
        None => recent.into_iter().next(),
    }
}

fn series_fully_completed(series: &Series, records: &[EpisodeProgress]) -> bool {
    let total = series.episode_count();
    if series.id.is_tutorial() || total == 0 {
        return false;
    }
    series.completed_records(records).count() >= total
}
