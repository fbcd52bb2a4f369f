// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Curriculum loading and lookup.
//!
//! The curriculum is static content. It is loaded once at startup and only
//! read afterwards; the gamification core needs episode counts, episode ids
//! and the correct answer of each question.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::models::{ContentId, Episode, Series};

#[derive(Deserialize)]
struct CurriculumFile {
    series: Vec<Series>,
}

/// Read-only mapping from series id to series.
#[derive(Default, Clone)]
pub struct CurriculumService {
    series: Arc<BTreeMap<ContentId, Series>>,
}

impl CurriculumService {
    /// Load the curriculum from a JSON file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CurriculumError> {
        let json_data = fs::read_to_string(path.as_ref())
            .map_err(|e| CurriculumError::IoError(e.to_string()))?;
        Self::load_from_json(&json_data)
    }

    /// Load the curriculum from a JSON string.
    pub fn load_from_json(json_data: &str) -> Result<Self, CurriculumError> {
        let file: CurriculumFile = serde_json::from_str(json_data)
            .map_err(|e| CurriculumError::ParseError(e.to_string()))?;
        Self::from_series(file.series)
    }

    /// Build from already-parsed series, rejecting duplicate ids.
    pub fn from_series(list: Vec<Series>) -> Result<Self, CurriculumError> {
        let mut series = BTreeMap::new();
        for s in list {
            let mut seen = std::collections::HashSet::new();
            for episode in &s.episodes {
                if !seen.insert(episode.id) {
                    return Err(CurriculumError::DuplicateEpisode(s.id, episode.id));
                }
                if let Some(q) = episode
                    .questions
                    .iter()
                    .find(|q| q.correct_index >= q.options.len())
                {
                    return Err(CurriculumError::InvalidQuestion(
                        s.id,
                        episode.id,
                        q.prompt.clone(),
                    ));
                }
            }
            let id = s.id;
            if series.insert(id, s).is_some() {
                return Err(CurriculumError::DuplicateSeries(id));
            }
        }

        tracing::info!(count = series.len(), "Loaded curriculum");
        Ok(Self {
            series: Arc::new(series),
        })
    }

    pub fn series(&self, id: ContentId) -> Option<&Series> {
        self.series.get(&id)
    }

    pub fn episode(&self, series_id: ContentId, episode_id: ContentId) -> Option<&Episode> {
        self.series(series_id)?.episode(episode_id)
    }
}

/// Errors from curriculum loading.
#[derive(Debug, thiserror::Error)]
pub enum CurriculumError {
    #[error("Failed to read file: {0}")]
    IoError(String),

    #[error("Failed to parse curriculum: {0}")]
    ParseError(String),

    #[error("Duplicate series id {0}")]
    DuplicateSeries(ContentId),

    #[error("Duplicate episode id {1} in series {0}")]
    DuplicateEpisode(ContentId, ContentId),

    #[error("Question {2:?} in series {0} episode {1} has an out-of-range answer")]
    InvalidQuestion(ContentId, ContentId, String),
}
