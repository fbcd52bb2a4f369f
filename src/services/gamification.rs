// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Gamification orchestrator.
//!
//! Sequences the progress store, the diamond evaluator and the badge rule
//! engine for each learner action. Every operation takes an explicit
//! [`Session`]; there is no ambient "current user".
//!
//! Persisting the episode record is the critical path and its errors are
//! returned. Everything after it (counters, XP, diamonds, badges) is a
//! best-effort side effect: failures are logged and the action still
//! succeeds, since those values can be rebuilt by [`Gamification::recalculate`].

use chrono::Utc;

use crate::db::{ProgressStore, SetValue, UserSetField};
use crate::error::{AppError, Result};
use crate::models::{
    BadgeDefinition, ContentId, Episode, EpisodeProgress, ProgressPatch, RequirementKind, User,
};
use crate::services::badges::{check_for_new_badge, check_for_new_badge_of, BadgeContext};
use crate::services::diamond::{DiamondEvaluator, DiamondOutcome};
use crate::services::progress::{DictationOutcome, ProgressService};
use crate::services::streak::{StreakService, StreakUpdate};
use crate::services::CurriculumService;

/// XP for the first correct answer to a question.
pub const XP_PER_CORRECT_ANSWER: u64 = 10;
/// XP for the first completion of an episode.
pub const XP_EPISODE_COMPLETE: u64 = 50;

/// Authenticated learner, created by the auth middleware for each request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: String,
}

/// Result of hydrating a session.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub user: User,
    pub streak: StreakUpdate,
    pub badge: Option<&'static BadgeDefinition>,
}

#[derive(Debug, Clone)]
pub struct AnswerOutcome {
    pub correct: bool,
    /// The answer counted towards the quiz score
    pub scored: bool,
    pub progress: EpisodeProgress,
    pub xp: u64,
    pub badge: Option<&'static BadgeDefinition>,
}

#[derive(Debug, Clone)]
pub struct CompletionResult {
    pub progress: EpisodeProgress,
    pub first_completion: bool,
    pub perfect_quiz: bool,
    pub series_completed: bool,
    pub diamond_earned: bool,
    pub xp: u64,
    pub badge: Option<&'static BadgeDefinition>,
}

#[derive(Debug, Clone)]
pub struct DictationResult {
    pub outcome: DictationOutcome,
    pub diamond_earned: bool,
    pub badge: Option<&'static BadgeDefinition>,
}

#[derive(Clone)]
pub struct Gamification<S> {
    store: S,
    curriculum: CurriculumService,
    progress: ProgressService<S>,
    diamonds: DiamondEvaluator<S>,
    streaks: StreakService<S>,
}

impl<S: ProgressStore> Gamification<S> {
    pub fn new(store: S, curriculum: CurriculumService, tz: chrono::FixedOffset) -> Self {
        Self {
            progress: ProgressService::new(store.clone(), curriculum.clone(), tz),
            diamonds: DiamondEvaluator::new(store.clone(), curriculum.clone()),
            streaks: StreakService::new(store.clone(), tz),
            store,
            curriculum,
        }
    }

    pub fn progress(&self) -> &ProgressService<S> {
        &self.progress
    }

    pub fn diamonds(&self) -> &DiamondEvaluator<S> {
        &self.diamonds
    }

    /// Stored user for the session, or `NotFound` before the first hydration.
    pub async fn get_user(&self, session: &Session) -> Result<User> {
        self.store
            .get_user(&session.uid)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {}", session.uid)))
    }

    /// Get or create the user document with zeroed stats.
    pub async fn ensure_user(&self, session: &Session) -> Result<User> {
        if let Some(user) = self.store.get_user(&session.uid).await? {
            return Ok(user);
        }

        let user = User::new(
            session.uid.clone(),
            session.email.clone(),
            session.display_name.clone(),
            Utc::now(),
        );
        self.store.create_user(&user).await?;
        tracing::info!(uid = %user.uid, "Created user");
        Ok(user)
    }

    /// Hydrate a session: load the user and count today's activity.
    pub async fn start_session(&self, session: &Session) -> Result<SessionSnapshot> {
        let mut user = self.ensure_user(session).await?;

        let streak = match self.streaks.refresh(&mut user, Utc::now()).await {
            Ok(update) => update,
            Err(e) => {
                tracing::warn!(uid = %user.uid, error = %e, "Streak refresh failed");
                StreakUpdate::Unchanged
            }
        };

        let candidate = match streak {
            StreakUpdate::Changed(value) => check_for_new_badge_of(
                RequirementKind::Streak,
                &BadgeContext::from_user(&user).with_streak(value),
                &user.badges,
            ),
            StreakUpdate::Unchanged => None,
        };
        let badge = self.grant_badge(&mut user, candidate).await;

        Ok(SessionSnapshot {
            user,
            streak,
            badge,
        })
    }

    fn require_episode(&self, series_id: ContentId, episode_id: ContentId) -> Result<&Episode> {
        self.curriculum
            .episode(series_id, episode_id)
            .ok_or_else(|| AppError::NotFound(format!("Episode {}/{}", series_id, episode_id)))
    }

    /// Grade an answer against the curriculum and update the quiz record.
    ///
    /// Only the first answer to the current question counts; replaying an
    /// earlier question is graded but changes nothing. `completed` is never
    /// touched here.
    pub async fn answer_question(
        &self,
        session: &Session,
        series_id: ContentId,
        episode_id: ContentId,
        question_index: u32,
        selected_option: usize,
    ) -> Result<AnswerOutcome> {
        let episode = self.require_episode(series_id, episode_id)?;
        let question = episode
            .questions
            .get(question_index as usize)
            .ok_or_else(|| {
                AppError::BadRequest(format!("Question index {} out of range", question_index))
            })?;

        let correct = selected_option == question.correct_index;
        let existing = self
            .progress
            .get_progress(&session.uid, series_id, episode_id)
            .await?;
        let (current, score) = existing
            .as_ref()
            .map(|r| (r.current_question_index, r.score))
            .unwrap_or((0, 0));

        let scored = question_index >= current;
        let patch = if scored {
            ProgressPatch {
                current_question_index: Some(question_index + 1),
                score: Some(if correct { score + 1 } else { score }),
                ..Default::default()
            }
        } else {
            ProgressPatch::default()
        };
        let progress = self
            .progress
            .save_episode_progress(&session.uid, series_id, episode_id, &patch)
            .await?;

        let mut user = self.ensure_user(session).await?;
        let mut badge = None;
        if scored && correct {
            user.xp += XP_PER_CORRECT_ANSWER;
            match self.store.update_user_scalars(&user).await {
                Ok(()) => {
                    let candidate = check_for_new_badge(&BadgeContext::from_user(&user), &user.badges);
                    badge = self.grant_badge(&mut user, candidate).await;
                }
                Err(e) => tracing::warn!(uid = %user.uid, error = %e, "Failed to award answer XP"),
            }
        }

        tracing::debug!(
            uid = %session.uid,
            series = %series_id,
            episode = %episode_id,
            question = question_index,
            correct,
            scored,
            "Answer graded"
        );

        Ok(AnswerOutcome {
            correct,
            scored,
            progress,
            xp: user.xp,
            badge,
        })
    }

    /// Save the audio position and add listening time to the weekly bucket.
    pub async fn checkpoint(
        &self,
        session: &Session,
        series_id: ContentId,
        episode_id: ContentId,
        audio_time: f64,
        elapsed_seconds: u64,
    ) -> Result<EpisodeProgress> {
        self.require_episode(series_id, episode_id)?;

        let progress = self
            .progress
            .save_episode_progress(
                &session.uid,
                series_id,
                episode_id,
                &ProgressPatch {
                    audio_time: Some(audio_time),
                    ..Default::default()
                },
            )
            .await?;

        if elapsed_seconds > 0 {
            let result = async {
                let mut user = self.ensure_user(session).await?;
                self.progress
                    .record_time_spent(&mut user, elapsed_seconds, Utc::now())
                    .await
            }
            .await;
            if let Err(e) = result {
                tracing::warn!(uid = %session.uid, error = %e, "Failed to record time spent");
            }
        }

        Ok(progress)
    }

    /// Complete an episode.
    ///
    /// Saves the record, updates completion counters (awarding XP and a
    /// perfect quiz only the first time), evaluates the diamond tier and
    /// returns at most one new badge.
    pub async fn complete_episode(
        &self,
        session: &Session,
        series_id: ContentId,
        episode_id: ContentId,
    ) -> Result<CompletionResult> {
        self.require_episode(series_id, episode_id)?;

        let first_completion = !self
            .progress
            .get_progress(&session.uid, series_id, episode_id)
            .await?
            .is_some_and(|r| r.completed);

        let progress = self
            .progress
            .save_episode_progress(
                &session.uid,
                series_id,
                episode_id,
                &ProgressPatch {
                    completed: Some(true),
                    ..Default::default()
                },
            )
            .await?;

        let mut user = self.ensure_user(session).await?;

        let series_completed = match self.progress.record_completion(&mut user, series_id).await {
            Ok(outcome) => outcome.series_completed_now,
            Err(e) => {
                tracing::warn!(uid = %user.uid, series = %series_id, error = %e, "Failed to update completion counters");
                false
            }
        };

        let mut perfect_quiz = false;
        if first_completion {
            perfect_quiz = self.progress.is_perfect_quiz(&progress);
            user.xp += XP_EPISODE_COMPLETE;
            if perfect_quiz {
                user.perfect_quiz_count += 1;
            }
            if let Err(e) = self.store.update_user_scalars(&user).await {
                tracing::warn!(uid = %user.uid, error = %e, "Failed to award completion XP");
            }
        }

        let diamond = self.evaluate_diamond(&mut user, series_id).await;
        let candidate = select_badge(&user, diamond.newly_earned);
        let badge = self.grant_badge(&mut user, candidate).await;

        tracing::info!(
            uid = %user.uid,
            series = %series_id,
            episode = %episode_id,
            first_completion,
            series_completed,
            diamond = diamond.newly_earned,
            badge = badge.map(|b| b.id),
            "Episode completed"
        );

        Ok(CompletionResult {
            progress,
            first_completion,
            perfect_quiz,
            series_completed,
            diamond_earned: diamond.newly_earned,
            xp: user.xp,
            badge,
        })
    }

    /// Record a dictation score, then run the diamond and badge checks.
    pub async fn submit_dictation(
        &self,
        session: &Session,
        series_id: ContentId,
        episode_id: ContentId,
        score: u8,
    ) -> Result<DictationResult> {
        self.require_episode(series_id, episode_id)?;

        let mut user = self.ensure_user(session).await?;
        let outcome = self
            .progress
            .save_dictation_score(&mut user, series_id, episode_id, score)
            .await?;

        let diamond = self.evaluate_diamond(&mut user, series_id).await;
        let candidate = select_badge(&user, diamond.newly_earned);
        let badge = self.grant_badge(&mut user, candidate).await;

        Ok(DictationResult {
            outcome,
            diamond_earned: diamond.newly_earned,
            badge,
        })
    }

    /// Rebuild the user's derived counters from their progress records.
    pub async fn recalculate(&self, session: &Session) -> Result<User> {
        let mut user = self.get_user(session).await?;
        self.progress.recalculate_all(&mut user).await?;
        Ok(user)
    }

    async fn evaluate_diamond(&self, user: &mut User, series_id: ContentId) -> DiamondOutcome {
        match self.diamonds.evaluate(user, series_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(uid = %user.uid, series = %series_id, error = %e, "Diamond evaluation failed");
                DiamondOutcome::default()
            }
        }
    }

    /// Persist a badge with the atomic set append. Best-effort.
    async fn grant_badge(
        &self,
        user: &mut User,
        badge: Option<&'static BadgeDefinition>,
    ) -> Option<&'static BadgeDefinition> {
        let badge = badge?;
        match self
            .store
            .append_to_user_set(
                &user.uid,
                UserSetField::Badges,
                SetValue::Badge(badge.id.to_string()),
            )
            .await
        {
            Ok(()) => {
                user.badges.insert(badge.id.to_string());
                tracing::info!(uid = %user.uid, badge = badge.id, epic = badge.epic, "Badge earned");
                Some(badge)
            }
            Err(e) => {
                tracing::warn!(uid = %user.uid, badge = badge.id, error = %e, "Failed to grant badge");
                None
            }
        }
    }
}

/// Pick the single badge to celebrate for this action.
///
/// A newly earned diamond takes priority: its badge is shown and any other
/// badge that would also fire is left for a later action.
fn select_badge(user: &User, diamond_earned: bool) -> Option<&'static BadgeDefinition> {
    let ctx = BadgeContext::from_user(user);
    let general = check_for_new_badge(&ctx, &user.badges);
    if !diamond_earned {
        return general;
    }

    match check_for_new_badge_of(RequirementKind::Diamonds, &ctx, &user.badges) {
        Some(diamond_badge) => {
            if let Some(other) = general.filter(|b| b.id != diamond_badge.id) {
                tracing::debug!(uid = %user.uid, suppressed = other.id, "Badge deferred for diamond");
            }
            Some(diamond_badge)
        }
        None => general,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{Episode, Question, Series};
    use chrono::{Duration, FixedOffset};

    fn curriculum() -> CurriculumService {
        let question = |correct| Question {
            prompt: "?".to_string(),
            options: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            correct_index: correct,
        };
        let episode = |id| Episode {
            id: ContentId(id),
            title: format!("Episode {}", id),
            audio_url: String::new(),
            questions: vec![question(0), question(2)],
        };
        CurriculumService::from_series(vec![
            Series {
                id: ContentId(0),
                title: "Tutorial".to_string(),
                level: String::new(),
                episodes: vec![episode(1)],
            },
            Series {
                id: ContentId(1),
                title: "Coffee Shop".to_string(),
                level: "A2".to_string(),
                episodes: vec![episode(1), episode(2), episode(3)],
            },
        ])
        .unwrap()
    }

    fn session() -> Session {
        Session {
            uid: "u1".to_string(),
            email: Some("ana@example.com".to_string()),
            display_name: "Ana".to_string(),
        }
    }

    fn setup() -> (Gamification<MemoryStore>, MemoryStore) {
        let store = MemoryStore::new();
        let game = Gamification::new(store.clone(), curriculum(), FixedOffset::east_opt(0).unwrap());
        (game, store)
    }

    #[tokio::test]
    async fn test_first_session_creates_user_with_streak_one() {
        let (game, store) = setup();
        let snapshot = game.start_session(&session()).await.unwrap();

        assert_eq!(snapshot.streak, StreakUpdate::Changed(1));
        assert_eq!(snapshot.user.streak, 1);
        assert!(snapshot.badge.is_none());

        let stored = store.get_user("u1").await.unwrap().unwrap();
        assert_eq!(stored.email.as_deref(), Some("ana@example.com"));
        assert_eq!(stored.streak, 1);
    }

    #[tokio::test]
    async fn test_streak_badge_on_session_start() {
        let (game, store) = setup();
        let mut user = User::new("u1", None, "Ana", Utc::now());
        user.streak = 2;
        user.last_activity = Some(Utc::now() - Duration::days(1));
        store.create_user(&user).await.unwrap();

        let snapshot = game.start_session(&session()).await.unwrap();
        assert_eq!(snapshot.user.streak, 3);
        assert_eq!(snapshot.badge.map(|b| b.id), Some("streak_3"));

        let stored = store.get_user("u1").await.unwrap().unwrap();
        assert!(stored.badges.contains("streak_3"));
    }

    #[tokio::test]
    async fn test_only_first_answer_scores() {
        let (game, store) = setup();
        game.start_session(&session()).await.unwrap();

        let first = game
            .answer_question(&session(), ContentId(1), ContentId(1), 0, 0)
            .await
            .unwrap();
        assert!(first.correct);
        assert!(first.scored);
        assert_eq!(first.progress.score, 1);
        assert_eq!(first.progress.current_question_index, 1);
        assert_eq!(first.xp, XP_PER_CORRECT_ANSWER);

        // Replaying question 0 is graded but does not score again
        let replay = game
            .answer_question(&session(), ContentId(1), ContentId(1), 0, 0)
            .await
            .unwrap();
        assert!(replay.correct);
        assert!(!replay.scored);
        assert_eq!(replay.progress.score, 1);

        let wrong = game
            .answer_question(&session(), ContentId(1), ContentId(1), 1, 0)
            .await
            .unwrap();
        assert!(!wrong.correct);
        assert_eq!(wrong.progress.score, 1);
        assert_eq!(wrong.progress.current_question_index, 2);
        assert!(!wrong.progress.completed);

        let stored = store.get_user("u1").await.unwrap().unwrap();
        assert_eq!(stored.xp, XP_PER_CORRECT_ANSWER);
    }

    #[tokio::test]
    async fn test_answer_out_of_range_is_rejected() {
        let (game, _) = setup();
        let result = game
            .answer_question(&session(), ContentId(1), ContentId(1), 7, 0)
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));

        let result = game
            .answer_question(&session(), ContentId(9), ContentId(1), 0, 0)
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_completion_xp_awarded_once() {
        let (game, store) = setup();
        game.start_session(&session()).await.unwrap();

        let first = game
            .complete_episode(&session(), ContentId(1), ContentId(1))
            .await
            .unwrap();
        assert!(first.first_completion);
        assert!(!first.perfect_quiz);
        assert_eq!(first.xp, XP_EPISODE_COMPLETE);

        let again = game
            .complete_episode(&session(), ContentId(1), ContentId(1))
            .await
            .unwrap();
        assert!(!again.first_completion);
        assert_eq!(again.xp, XP_EPISODE_COMPLETE);

        let stored = store.get_user("u1").await.unwrap().unwrap();
        assert_eq!(stored.total_episodes_completed, 1);
    }

    #[tokio::test]
    async fn test_perfect_quiz_badge() {
        let (game, store) = setup();
        game.start_session(&session()).await.unwrap();

        game.answer_question(&session(), ContentId(1), ContentId(2), 0, 0)
            .await
            .unwrap();
        game.answer_question(&session(), ContentId(1), ContentId(2), 1, 2)
            .await
            .unwrap();
        let result = game
            .complete_episode(&session(), ContentId(1), ContentId(2))
            .await
            .unwrap();

        assert!(result.perfect_quiz);
        assert_eq!(result.badge.map(|b| b.id), Some("quiz_ace"));
        let stored = store.get_user("u1").await.unwrap().unwrap();
        assert_eq!(stored.perfect_quiz_count, 1);
    }

    #[tokio::test]
    async fn test_first_perfect_dictation_badge() {
        let (game, _) = setup();
        game.start_session(&session()).await.unwrap();

        let result = game
            .submit_dictation(&session(), ContentId(1), ContentId(1), 100)
            .await
            .unwrap();
        assert!(result.outcome.new_perfect);
        assert!(!result.diamond_earned);
        assert_eq!(result.badge.map(|b| b.id), Some("perfect_ear"));

        let again = game
            .submit_dictation(&session(), ContentId(1), ContentId(1), 100)
            .await
            .unwrap();
        assert!(again.badge.is_none());
    }

    #[tokio::test]
    async fn test_diamond_badge_suppresses_series_badge() {
        let (game, store) = setup();
        let mut user = User::new("u1", None, "Ana", Utc::now());
        user.streak = 5;
        user.last_activity = Some(Utc::now() - Duration::days(1));
        store.create_user(&user).await.unwrap();

        let snapshot = game.start_session(&session()).await.unwrap();
        assert_eq!(snapshot.user.streak, 6);

        for (episode, score) in [(1, 100), (2, 96), (3, 94)] {
            game.submit_dictation(&session(), ContentId(1), ContentId(episode), score)
                .await
                .unwrap();
        }
        for episode in [1, 2] {
            game.complete_episode(&session(), ContentId(1), ContentId(episode))
                .await
                .unwrap();
        }

        let result = game
            .complete_episode(&session(), ContentId(1), ContentId(3))
            .await
            .unwrap();
        assert!(result.series_completed);
        assert!(result.diamond_earned);
        assert_eq!(result.badge.map(|b| b.id), Some("first_diamond"));

        let stored = store.get_user("u1").await.unwrap().unwrap();
        assert!(stored.diamond_series_ids.contains(&ContentId(1)));
        assert!(stored.completed_series_ids.contains(&ContentId(1)));
        assert_eq!(stored.series_with_diamond, 1);
        assert!(stored.badges.contains("first_diamond"));
        assert!(!stored.badges.contains("first_series"));
    }

    #[tokio::test]
    async fn test_incomplete_series_has_no_diamond() {
        let (game, _) = setup();
        game.start_session(&session()).await.unwrap();

        for episode in [1, 2] {
            game.submit_dictation(&session(), ContentId(1), ContentId(episode), 100)
                .await
                .unwrap();
            let result = game
                .complete_episode(&session(), ContentId(1), ContentId(episode))
                .await
                .unwrap();
            assert!(!result.diamond_earned);
        }

        assert!(!game.diamonds().has_diamond("u1", ContentId(1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_offline_store_surfaces_database_error() {
        let (game, store) = setup();
        game.start_session(&session()).await.unwrap();

        store.set_offline(true);
        let result = game
            .submit_dictation(&session(), ContentId(1), ContentId(1), 80)
            .await;
        assert!(matches!(result, Err(AppError::Database(_))));
        store.set_offline(false);

        assert!(game
            .checkpoint(&session(), ContentId(1), ContentId(1), 12.5, 30)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_recalculate_requires_existing_user() {
        let (game, _) = setup();
        assert!(matches!(
            game.recalculate(&session()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_select_badge_diamond_first() {
        let mut user = User::new("u1", None, "Ana", Utc::now());
        user.completed_series_ids.insert(ContentId(1));
        user.diamond_series_ids.insert(ContentId(1));
        user.streak = 3;

        assert_eq!(select_badge(&user, true).map(|b| b.id), Some("first_diamond"));

        user.badges.insert("first_diamond".to_string());
        // No diamond badge left: falls back to the general check
        assert_eq!(select_badge(&user, true).map(|b| b.id), Some("first_series"));
    }
}
