// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod badge;
pub mod curriculum;
pub mod ids;
pub mod progress;
pub mod user;

pub use badge::{BadgeDefinition, Requirement, RequirementKind, BADGES};
pub use curriculum::{Episode, Question, Series};
pub use ids::{ContentId, TUTORIAL_SERIES_ID};
pub use progress::{EpisodeProgress, EpisodeState, ProgressPatch, PERFECT_SCORE};
pub use user::{User, UserStatus};
