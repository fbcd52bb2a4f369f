// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Badge rule engine.
//!
//! Pure functions over a [`BadgeContext`] snapshot. At most one badge is
//! returned per call (first match in catalogue order) so that a single user
//! action never triggers more than one celebration.

use std::collections::BTreeSet;

use crate::models::{BadgeDefinition, RequirementKind, User, BADGES};

/// Counters the badge predicates look at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BadgeContext {
    pub diamonds: u64,
    pub perfect_dictations: u64,
    pub series_completed: u64,
    pub perfect_quizzes: u64,
    pub streak: u64,
    pub xp: u64,
}

impl BadgeContext {
    /// Snapshot of a user's current aggregates.
    ///
    /// Set sizes are used rather than the cached counters, which may lag.
    pub fn from_user(user: &User) -> Self {
        Self {
            diamonds: user.diamond_series_ids.len() as u64,
            perfect_dictations: u64::from(user.perfect_dictation_count),
            series_completed: user.completed_series_ids.len() as u64,
            perfect_quizzes: u64::from(user.perfect_quiz_count),
            streak: u64::from(user.streak),
            xp: user.xp,
        }
    }

    pub fn with_streak(mut self, streak: u32) -> Self {
        self.streak = u64::from(streak);
        self
    }

    pub fn with_xp(mut self, xp: u64) -> Self {
        self.xp = xp;
        self
    }

    fn value(&self, kind: RequirementKind) -> u64 {
        match kind {
            RequirementKind::Diamonds => self.diamonds,
            RequirementKind::PerfectDictations => self.perfect_dictations,
            RequirementKind::SeriesCompleted => self.series_completed,
            RequirementKind::PerfectQuizzes => self.perfect_quizzes,
            RequirementKind::Streak => self.streak,
            RequirementKind::Xp => self.xp,
        }
    }
}

fn is_satisfied(badge: &BadgeDefinition, ctx: &BadgeContext) -> bool {
    badge
        .requirement
        .is_some_and(|req| ctx.value(req.kind) >= req.count)
}

fn first_match<'a>(
    candidates: impl Iterator<Item = &'a BadgeDefinition>,
    ctx: &BadgeContext,
    owned: &BTreeSet<String>,
) -> Option<&'a BadgeDefinition> {
    candidates
        .filter(|b| !owned.contains(b.id))
        .find(|b| is_satisfied(b, ctx))
}

/// First unowned badge whose requirement holds, in catalogue order.
pub fn check_for_new_badge(
    ctx: &BadgeContext,
    owned: &BTreeSet<String>,
) -> Option<&'static BadgeDefinition> {
    first_match(BADGES.iter(), ctx, owned)
}

/// Like [`check_for_new_badge`], restricted to one requirement kind.
pub fn check_for_new_badge_of(
    kind: RequirementKind,
    ctx: &BadgeContext,
    owned: &BTreeSet<String>,
) -> Option<&'static BadgeDefinition> {
    first_match(
        BADGES
            .iter()
            .filter(|b| b.requirement.is_some_and(|r| r.kind == kind)),
        ctx,
        owned,
    )
}
