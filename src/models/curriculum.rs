// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Read-only curriculum content (series, episodes, questions).

use serde::{Deserialize, Serialize};

use crate::models::{ContentId, EpisodeProgress};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Series {
    pub id: ContentId,
    pub title: String,
    #[serde(default)]
    pub level: String,
    pub episodes: Vec<Episode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub id: ContentId,
    pub title: String,
    #[serde(default)]
    pub audio_url: String,
    #[serde(default)]
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_index: usize,
}

impl Series {
    pub fn episode(&self, id: ContentId) -> Option<&Episode> {
        self.episodes.iter().find(|e| e.id == id)
    }

    pub fn episode_count(&self) -> usize {
        self.episodes.len()
    }

    /// Completed records for episodes this series still lists.
    ///
    /// Records left behind by episodes removed from the curriculum are
    /// skipped, so they never count towards completion or the diamond.
    pub fn completed_records<'a>(
        &'a self,
        records: &'a [EpisodeProgress],
    ) -> impl Iterator<Item = &'a EpisodeProgress> + 'a {
        records.iter().filter(move |r| {
            r.completed && r.series_id == self.id && self.episode(r.episode_id).is_some()
        })
    }
}
