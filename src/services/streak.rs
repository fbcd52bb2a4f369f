// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Daily activity streak.
//!
//! Runs once per session hydration, before any progress operation, so the
//! streak a session sees is never stale.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

use crate::db::ProgressStore;
use crate::error::Result;
use crate::models::User;
use crate::time_utils::{days_between, local_day};

/// Outcome of a streak evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakUpdate {
    /// Already counted today
    Unchanged,
    Changed(u32),
}

/// Compute the next streak from the last activity day and today.
///
/// A last activity in the future (clock skew) counts as today.
pub fn next_streak(current: u32, last_activity: Option<NaiveDate>, today: NaiveDate) -> StreakUpdate {
    let Some(last) = last_activity else {
        return StreakUpdate::Changed(1);
    };

    match days_between(last, today) {
        1 => StreakUpdate::Changed(current.saturating_add(1)),
        d if d > 1 => StreakUpdate::Changed(1),
        _ if current == 0 => StreakUpdate::Changed(1),
        _ => StreakUpdate::Unchanged,
    }
}

/// Applies [`next_streak`] to a stored user.
#[derive(Clone)]
pub struct StreakService<S> {
    store: S,
    tz: FixedOffset,
}

impl<S: ProgressStore> StreakService<S> {
    pub fn new(store: S, tz: FixedOffset) -> Self {
        Self { store, tz }
    }

    /// Refresh the user's streak at `now`.
    ///
    /// On change, persists `streak` and `last_activity = now` and updates
    /// `user` in place. Returns the update so callers can check streak badges.
    pub async fn refresh(&self, user: &mut User, now: DateTime<Utc>) -> Result<StreakUpdate> {
        let today = local_day(now, &self.tz);
        let last_day = user.last_activity.map(|t| local_day(t, &self.tz));
        let update = next_streak(user.streak, last_day, today);

        if let StreakUpdate::Changed(streak) = update {
            let previous = user.streak;
            user.streak = streak;
            user.last_activity = Some(now);
            self.store.update_user_scalars(user).await?;
            tracing::info!(uid = %user.uid, previous, streak, "Streak updated");
        } else {
            tracing::debug!(uid = %user.uid, streak = user.streak, "Streak already counted today");
        }

        Ok(update)
    }
}
