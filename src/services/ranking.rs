// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Leaderboards over the users collection.

use chrono::{FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{ProgressStore, RankField};
use crate::error::Result;
use crate::models::User;
use crate::time_utils::{local_day, week_key};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(ts_rs::TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum RankingKind {
    #[default]
    Xp,
    Streak,
    WeeklyTime,
}

impl RankingKind {
    fn field(self) -> RankField {
        match self {
            RankingKind::Xp => RankField::Xp,
            RankingKind::Streak => RankField::Streak,
            RankingKind::WeeklyTime => RankField::WeeklyTimeSpent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(ts_rs::TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RankingEntry {
    /// 1-based; tied values share a rank
    pub rank: u32,
    pub display_name: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub value: u64,
    pub is_viewer: bool,
}

#[derive(Clone)]
pub struct RankingService<S> {
    store: S,
    tz: FixedOffset,
}

impl<S: ProgressStore> RankingService<S> {
    pub fn new(store: S, tz: FixedOffset) -> Self {
        Self { store, tz }
    }

    /// Top `limit` active users for `kind`, marking the viewer's entry.
    pub async fn leaderboard(
        &self,
        kind: RankingKind,
        limit: u32,
        viewer_uid: &str,
    ) -> Result<Vec<RankingEntry>> {
        let field = kind.field();
        // A stale bucket only resets on that user's next checkpoint, so the
        // week has to be part of the query rather than a post-filter.
        let current_week = match kind {
            RankingKind::WeeklyTime => Some(week_key(local_day(Utc::now(), &self.tz))),
            _ => None,
        };
        let users = self
            .store
            .list_ranked_users(field, current_week.as_deref(), limit)
            .await?;

        let entries = rank_users(users, field, limit as usize, viewer_uid);
        tracing::debug!(kind = ?kind, entries = entries.len(), "Built leaderboard");
        Ok(entries)
    }
}

/// Assign standard competition ranks (1, 1, 3) to users already sorted by
/// `field`, highest first.
fn rank_users(users: Vec<User>, field: RankField, limit: usize, viewer_uid: &str) -> Vec<RankingEntry> {
    let mut entries: Vec<RankingEntry> = Vec::with_capacity(users.len().min(limit));
    for (position, user) in users.into_iter().filter(|u| !u.is_suspended()).take(limit).enumerate() {
        let value = field.value_of(&user);
        let rank = match entries.last() {
            Some(prev) if prev.value == value => prev.rank,
            _ => position as u32 + 1,
        };
        entries.push(RankingEntry {
            rank,
            display_name: user.display_name,
            value,
            is_viewer: user.uid == viewer_uid,
        });
    }
    entries
}
