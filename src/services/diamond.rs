// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Diamond tier evaluation.
//!
//! A series earns its diamond when every episode is completed and the average
//! best dictation score is at least [`DIAMOND_THRESHOLD`]. The average divides
//! by the series' total episode count, not by the number of completed records,
//! and only records for episodes the curriculum lists are counted.

use crate::db::{ProgressStore, SetValue, UserSetField};
use crate::error::Result;
use crate::models::{ContentId, EpisodeProgress, Series, User};
use crate::services::CurriculumService;

/// Minimum average dictation score (percent) for the diamond tier.
pub const DIAMOND_THRESHOLD: f64 = 95.0;

/// Whether `records` qualify `series` for the diamond tier.
pub fn has_diamond(series: &Series, records: &[EpisodeProgress]) -> bool {
    let total_episodes = series.episode_count();
    if series.id.is_tutorial() || total_episodes == 0 {
        return false;
    }

    let completed: Vec<&EpisodeProgress> = series.completed_records(records).collect();
    if completed.len() < total_episodes {
        return false;
    }

    let sum: u64 = completed
        .iter()
        .map(|r| u64::from(r.dictation_best_score))
        .sum();
    let average = sum as f64 / total_episodes as f64;
    average >= DIAMOND_THRESHOLD
}

/// Result of evaluating one series for a user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiamondOutcome {
    pub qualifies: bool,
    /// True only on the evaluation that first recorded the diamond
    pub newly_earned: bool,
}

#[derive(Clone)]
pub struct DiamondEvaluator<S> {
    store: S,
    curriculum: CurriculumService,
}

impl<S: ProgressStore> DiamondEvaluator<S> {
    pub fn new(store: S, curriculum: CurriculumService) -> Self {
        Self { store, curriculum }
    }

    /// Read-only check used for display.
    pub async fn has_diamond(&self, uid: &str, series_id: ContentId) -> Result<bool> {
        if series_id.is_tutorial() {
            return Ok(false);
        }
        let Some(series) = self.curriculum.series(series_id) else {
            return Ok(false);
        };
        let records = self.store.list_series_progress(uid, series_id).await?;
        Ok(has_diamond(series, &records))
    }

    /// Evaluate a series and record a first-time diamond on the user.
    ///
    /// Re-evaluating an already-diamonded series writes nothing.
    pub async fn evaluate(&self, user: &mut User, series_id: ContentId) -> Result<DiamondOutcome> {
        let Some(series) = self.curriculum.series(series_id) else {
            tracing::warn!(uid = %user.uid, series = %series_id, "Diamond check for unknown series");
            return Ok(DiamondOutcome::default());
        };
        if series_id.is_tutorial() {
            return Ok(DiamondOutcome::default());
        }

        let records = self.store.list_series_progress(&user.uid, series_id).await?;
        let qualifies = has_diamond(series, &records);

        if !qualifies || user.diamond_series_ids.contains(&series_id) {
            return Ok(DiamondOutcome {
                qualifies,
                newly_earned: false,
            });
        }

        // Keep diamond ⊆ completed even if the completion write was lost.
        if !user.completed_series_ids.contains(&series_id) {
            self.store
                .append_to_user_set(
                    &user.uid,
                    UserSetField::CompletedSeries,
                    SetValue::Series(series_id),
                )
                .await?;
            user.completed_series_ids.insert(series_id);
            user.total_series_completed = user.completed_series_ids.len() as u32;
        }

        self.store
            .append_to_user_set(
                &user.uid,
                UserSetField::DiamondSeries,
                SetValue::Series(series_id),
            )
            .await?;
        user.diamond_series_ids.insert(series_id);
        user.series_with_diamond = user.diamond_series_ids.len() as u32;
        self.store.update_user_scalars(user).await?;

        tracing::info!(
            uid = %user.uid,
            series = %series_id,
            diamonds = user.series_with_diamond,
            "Diamond earned"
        );

        Ok(DiamondOutcome {
            qualifies: true,
            newly_earned: true,
        })
    }
}
