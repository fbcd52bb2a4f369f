// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Badge catalogue.
//!
//! The order of [`BADGES`] matters: the rule engine awards the first unowned
//! badge whose requirement is met, so earlier entries win when several become
//! eligible from the same action.

use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// What a badge requirement counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum RequirementKind {
    Diamonds,
    PerfectDictations,
    SeriesCompleted,
    PerfectQuizzes,
    Streak,
    Xp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Requirement {
    #[serde(rename = "type")]
    pub kind: RequirementKind,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub count: u64,
}

/// Static badge definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct BadgeDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    /// Epic badges get the big celebration
    pub epic: bool,
    pub requirement: Option<Requirement>,
}

const fn badge(
    id: &'static str,
    name: &'static str,
    description: &'static str,
    icon: &'static str,
    epic: bool,
    kind: RequirementKind,
    count: u64,
) -> BadgeDefinition {
    BadgeDefinition {
        id,
        name,
        description,
        icon,
        epic,
        requirement: Some(Requirement { kind, count }),
    }
}

pub const BADGES: &[BadgeDefinition] = &[
    badge(
        "first_diamond",
        "Diamond Ear",
        "Earn the diamond tier on a series.",
        "💎",
        true,
        RequirementKind::Diamonds,
        1,
    ),
    badge(
        "diamond_collector",
        "Diamond Collector",
        "Earn the diamond tier on 5 series.",
        "👑",
        true,
        RequirementKind::Diamonds,
        5,
    ),
    badge(
        "perfect_ear",
        "Perfect Ear",
        "Score 100% on a dictation.",
        "🎧",
        false,
        RequirementKind::PerfectDictations,
        1,
    ),
    badge(
        "dictation_master",
        "Dictation Master",
        "Score 100% on 10 dictations.",
        "✍️",
        true,
        RequirementKind::PerfectDictations,
        10,
    ),
    badge(
        "first_series",
        "Series Finisher",
        "Complete every episode of a series.",
        "🏁",
        false,
        RequirementKind::SeriesCompleted,
        1,
    ),
    badge(
        "series_veteran",
        "Series Veteran",
        "Complete 5 series.",
        "🎖️",
        true,
        RequirementKind::SeriesCompleted,
        5,
    ),
    badge(
        "quiz_ace",
        "Quiz Ace",
        "Answer every question of an episode correctly.",
        "🎯",
        false,
        RequirementKind::PerfectQuizzes,
        1,
    ),
    badge(
        "quiz_master",
        "Quiz Master",
        "Get a perfect quiz on 10 episodes.",
        "🧠",
        false,
        RequirementKind::PerfectQuizzes,
        10,
    ),
    badge(
        "streak_3",
        "Warming Up",
        "Practice 3 days in a row.",
        "🔥",
        false,
        RequirementKind::Streak,
        3,
    ),
    badge(
        "streak_7",
        "One Week Strong",
        "Practice 7 days in a row.",
        "📅",
        false,
        RequirementKind::Streak,
        7,
    ),
    badge(
        "streak_30",
        "Unstoppable",
        "Practice 30 days in a row.",
        "🚀",
        true,
        RequirementKind::Streak,
        30,
    ),
    badge(
        "rising_star",
        "Rising Star",
        "Reach 1000 XP.",
        "⭐",
        false,
        RequirementKind::Xp,
        1000,
    ),
];

/// Look up a badge definition by id.
pub fn find_badge(id: &str) -> Option<&'static BadgeDefinition> {
    BADGES.iter().find(|b| b.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_badge_ids_are_unique() {
        let ids: HashSet<_> = BADGES.iter().map(|b| b.id).collect();
        assert_eq!(ids.len(), BADGES.len());
    }

    #[test]
    fn test_find_badge() {
        assert_eq!(find_badge("streak_7").map(|b| b.name), Some("One Week Strong"));
        assert!(find_badge("nope").is_none());
    }

    #[test]
    fn test_requirement_serializes_as_type_and_count() {
        let json = serde_json::to_value(find_badge("first_diamond").unwrap()).unwrap();
        assert_eq!(json["requirement"]["type"], "diamonds");
        assert_eq!(json["requirement"]["count"], 1);
    }
}
