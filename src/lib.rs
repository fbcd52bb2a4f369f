// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Lingo-Progress: progression and gamification backend for a listening course
//!
//! This crate provides the backend API that tracks episode progress, daily
//! streaks, diamond-tier series and badges for learners.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::ProgressStore;
use services::{CurriculumService, Gamification, RankingService};

/// Shared application state.
pub struct AppState<S> {
    pub config: Config,
    pub store: S,
    pub curriculum: CurriculumService,
    pub gamification: Gamification<S>,
    pub ranking: RankingService<S>,
}

impl<S: ProgressStore> AppState<S> {
    pub fn new(config: Config, store: S, curriculum: CurriculumService) -> Self {
        let tz = config.learner_timezone();
        Self {
            gamification: Gamification::new(store.clone(), curriculum.clone(), tz),
            ranking: RankingService::new(store.clone(), tz),
            config,
            store,
            curriculum,
        }
    }
}
