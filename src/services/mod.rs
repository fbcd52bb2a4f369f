// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod badges;
pub mod curriculum;
pub mod diamond;
pub mod gamification;
pub mod progress;
pub mod ranking;
pub mod streak;

pub use badges::{check_for_new_badge, check_for_new_badge_of, BadgeContext};
pub use curriculum::{CurriculumError, CurriculumService};
pub use diamond::{DiamondEvaluator, DiamondOutcome};
pub use gamification::{Gamification, Session};
pub use progress::{CompletionOutcome, DictationOutcome, ProgressService};
pub use ranking::{RankingEntry, RankingKind, RankingService};
pub use streak::{StreakService, StreakUpdate};
