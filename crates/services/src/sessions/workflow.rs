use std::sync::Arc;

use chrono::Duration;
use rand::rngs::StdRng;

use ear_core::model::{
    ExerciseType, FinishedSession, PracticeStreak, SessionRecordId, SessionSettings,
};
use storage::repository::{
    ErrorHistoryRepository, MAX_HISTORY_RECORDS, SessionHistoryRepository, StreakRepository,
};

use super::playback::{SilentToneGenerator, ToneGenerator};
use super::service::PracticeSession;
use crate::Clock;
use crate::config::DEFAULT_FEEDBACK_DELAY_MS;
use crate::error::{SaveSessionError, SessionError};
use crate::history::ErrorHistoryStore;
use crate::remote::SessionUploader;

/// What happened when an ended session was saved.
///
/// Local writes are best effort: a `None` id or streak means that write
/// failed and was logged.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedSession {
    pub session: FinishedSession,
    pub record_id: Option<SessionRecordId>,
    pub streak: Option<PracticeStreak>,
    pub uploaded: bool,
}

/// Orchestrates session start (with the stored error history) and saving.
#[derive(Clone)]
pub struct PracticeLoopService {
    clock: Clock,
    history: ErrorHistoryStore,
    sessions: Arc<dyn SessionHistoryRepository>,
    streak: Arc<dyn StreakRepository>,
    tone: Arc<dyn ToneGenerator>,
    uploader: Option<Arc<dyn SessionUploader>>,
    advance_delay: Duration,
}

impl PracticeLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        errors: Arc<dyn ErrorHistoryRepository>,
        sessions: Arc<dyn SessionHistoryRepository>,
        streak: Arc<dyn StreakRepository>,
    ) -> Self {
        Self {
            clock,
            history: ErrorHistoryStore::new(clock, errors),
            sessions,
            streak,
            tone: Arc::new(SilentToneGenerator),
            uploader: None,
            advance_delay: Duration::milliseconds(DEFAULT_FEEDBACK_DELAY_MS),
        }
    }

    #[must_use]
    pub fn with_tone(mut self, tone: Arc<dyn ToneGenerator>) -> Self {
        self.tone = tone;
        self
    }

    #[must_use]
    pub fn with_uploader(mut self, uploader: Arc<dyn SessionUploader>) -> Self {
        self.uploader = Some(uploader);
        self
    }

    #[must_use]
    pub fn with_advance_delay(mut self, delay: Duration) -> Self {
        self.advance_delay = delay;
        self
    }

    #[must_use]
    pub fn history(&self) -> &ErrorHistoryStore {
        &self.history
    }

    /// Start a session biased by the stored mistakes of its exercise.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the first question cannot be prepared.
    pub async fn start_session(
        &self,
        settings: SessionSettings,
    ) -> Result<PracticeSession, SessionError> {
        let errors = self.history.fetch(settings.exercise()).await;
        let session =
            PracticeSession::new(settings, Some(&errors), self.clock, self.tone.clone())?;
        self.begin(session)
    }

    /// Same as [`PracticeLoopService::start_session`] with a given random source.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the first question cannot be prepared.
    pub async fn start_session_with_rng(
        &self,
        settings: SessionSettings,
        rng: StdRng,
    ) -> Result<PracticeSession, SessionError> {
        let errors = self.history.fetch(settings.exercise()).await;
        let session = PracticeSession::with_rng(
            settings,
            Some(&errors),
            self.clock,
            self.tone.clone(),
            rng,
        )?;
        self.begin(session)
    }

    fn begin(&self, session: PracticeSession) -> Result<PracticeSession, SessionError> {
        let mut session = session.with_advance_delay(self.advance_delay);
        session.start()?;
        Ok(session)
    }

    /// Save an ended session: its mistakes, its result and the streak locally,
    /// then upload it when a remote store is configured.
    ///
    /// # Errors
    ///
    /// Returns `SaveSessionError::NotEnded` before the last answer,
    /// `SaveSessionError::Invalid` for an inconsistent result and
    /// `SaveSessionError::Remote` if the upload fails. Local storage failures
    /// are logged, not returned.
    pub async fn finish_session(
        &self,
        session: &PracticeSession,
    ) -> Result<SavedSession, SaveSessionError> {
        let finished = session.finished_session()?;
        let exercise = finished.exercise;

        self.history.append(exercise, session.errors()).await;

        let record_id = match self
            .sessions
            .append_session(&finished, MAX_HISTORY_RECORDS)
            .await
        {
            Ok(id) => Some(id),
            Err(err) => {
                tracing::warn!(%exercise, error = %err, "session history not saved");
                None
            }
        };

        let streak = self.bump_streak(&finished).await;

        let uploaded = match &self.uploader {
            Some(uploader) => {
                uploader.upload(&finished).await?;
                true
            }
            None => false,
        };

        tracing::info!(
            session = %session.id(),
            %exercise,
            score = finished.result.score,
            uploaded,
            "practice session saved"
        );
        Ok(SavedSession {
            session: finished,
            record_id,
            streak,
            uploaded,
        })
    }

    async fn bump_streak(&self, finished: &FinishedSession) -> Option<PracticeStreak> {
        let mut streak = match self.streak.get_streak().await {
            Ok(streak) => streak,
            Err(err) => {
                tracing::warn!(error = %err, "practice streak unavailable");
                return None;
            }
        };
        streak.record_practice(finished.completed_at.date_naive());
        match self.streak.save_streak(&streak).await {
            Ok(()) => Some(streak),
            Err(err) => {
                tracing::warn!(error = %err, "practice streak not saved");
                None
            }
        }
    }

    /// Forget stored mistakes and sessions of `exercise`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the session history cannot be cleared.
    pub async fn clear_history(&self, exercise: ExerciseType) -> Result<(), SessionError> {
        self.history.clear(exercise).await;
        let removed = self.sessions.clear_sessions(exercise).await?;
        tracing::info!(%exercise, removed, "session history cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rand::SeedableRng;
    use std::sync::Mutex;

    use ear_core::model::{QuestionValue, SessionRecord, SessionSettingsDraft};
    use ear_core::time::fixed_clock;
    use storage::repository::{InMemoryRepository, StorageError};

    use crate::sessions::machine::SessionPhase;
    use crate::error::RemoteSaveError;

    #[derive(Default)]
    struct CollectingUploader {
        uploaded: Mutex<Vec<FinishedSession>>,
    }

    #[async_trait]
    impl SessionUploader for CollectingUploader {
        async fn upload(&self, session: &FinishedSession) -> Result<(), RemoteSaveError> {
            session.validate()?;
            self.uploaded.lock().unwrap().push(session.clone());
            Ok(())
        }
    }

    struct RejectingUploader;

    #[async_trait]
    impl SessionUploader for RejectingUploader {
        async fn upload(&self, _session: &FinishedSession) -> Result<(), RemoteSaveError> {
            Err(RemoteSaveError::HttpStatus(reqwest::StatusCode::SERVICE_UNAVAILABLE))
        }
    }

    struct Offline;

    fn offline() -> StorageError {
        StorageError::Connection("offline".into())
    }

    #[async_trait]
    impl SessionHistoryRepository for Offline {
        async fn recent_sessions(
            &self,
            _exercise: ExerciseType,
            _limit: usize,
        ) -> Result<Vec<SessionRecord>, StorageError> {
            Err(offline())
        }

        async fn append_session(
            &self,
            _session: &FinishedSession,
            _retain: usize,
        ) -> Result<SessionRecordId, StorageError> {
            Err(offline())
        }

        async fn clear_sessions(&self, _exercise: ExerciseType) -> Result<u64, StorageError> {
            Err(offline())
        }
    }

    #[async_trait]
    impl StreakRepository for Offline {
        async fn get_streak(&self) -> Result<PracticeStreak, StorageError> {
            Err(offline())
        }

        async fn save_streak(&self, _streak: &PracticeStreak) -> Result<(), StorageError> {
            Err(offline())
        }
    }

    fn service(repo: &InMemoryRepository) -> PracticeLoopService {
        PracticeLoopService::new(
            fixed_clock(),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        )
    }

    fn settings(pool: &[&str]) -> SessionSettings {
        let mut draft = SessionSettingsDraft::new(
            ExerciseType::Interval,
            pool.iter().copied().map(QuestionValue::from).collect(),
        );
        draft.number_of_questions = 5;
        draft.auto_feedback = false;
        draft.validate().unwrap()
    }

    /// Answers every question with `given` until the session ends.
    fn play_through(session: &mut PracticeSession, given: &str) {
        while !session.session_ended() {
            session.advance_clock(Duration::seconds(5)).unwrap();
            session.answer(given, None).unwrap();
        }
    }

    #[tokio::test]
    async fn finishing_saves_history_streak_and_upload() {
        let repo = InMemoryRepository::new();
        let uploader = Arc::new(CollectingUploader::default());
        let svc = service(&repo).with_uploader(uploader.clone());

        let mut session = svc
            .start_session_with_rng(settings(&["P4", "P5"]), StdRng::seed_from_u64(4))
            .await
            .unwrap();
        play_through(&mut session, "P4");

        let saved = svc.finish_session(&session).await.unwrap();
        assert!(saved.record_id.is_some());
        assert!(saved.uploaded);
        assert_eq!(saved.streak.unwrap().current(), 1);
        assert_eq!(uploader.uploaded.lock().unwrap().len(), 1);

        let errors = svc.history().fetch(ExerciseType::Interval).await;
        let wrong = session.total_answered() - session.total_correct();
        assert_eq!(errors.values().map(Vec::len).sum::<usize>(), wrong);
        assert_eq!(
            repo.recent_sessions(ExerciseType::Interval, 10)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn failed_upload_is_returned_after_local_save() {
        let repo = InMemoryRepository::new();
        let svc = service(&repo).with_uploader(Arc::new(RejectingUploader));

        let mut session = svc
            .start_session_with_rng(settings(&["P4", "P5"]), StdRng::seed_from_u64(9))
            .await
            .unwrap();
        play_through(&mut session, "P4");

        let err = svc.finish_session(&session).await.unwrap_err();
        assert!(matches!(
            err,
            SaveSessionError::Remote(RemoteSaveError::HttpStatus(status))
                if status == reqwest::StatusCode::SERVICE_UNAVAILABLE
        ));
        assert!(err.to_string().starts_with("could not save practice session"));
        assert_eq!(session.phase(), &SessionPhase::Ended);
        assert!(session.session_ended());
        assert_eq!(
            repo.recent_sessions(ExerciseType::Interval, 10)
                .await
                .unwrap()
                .len(),
            1
        );
        assert_eq!(repo.get_streak().await.unwrap().current(), 1);
    }

    #[tokio::test]
    async fn local_storage_failures_still_save() {
        let errors = InMemoryRepository::new();
        let uploader = Arc::new(CollectingUploader::default());
        let svc = PracticeLoopService::new(
            fixed_clock(),
            Arc::new(errors),
            Arc::new(Offline),
            Arc::new(Offline),
        )
        .with_uploader(uploader.clone());

        let mut session = svc
            .start_session_with_rng(settings(&["M2", "M6"]), StdRng::seed_from_u64(11))
            .await
            .unwrap();
        play_through(&mut session, "M2");

        let saved = svc.finish_session(&session).await.unwrap();
        assert_eq!(saved.record_id, None);
        assert_eq!(saved.streak, None);
        assert!(saved.uploaded);
        assert_eq!(uploader.uploaded.lock().unwrap().len(), 1);
        assert_eq!(saved.session.result.question_count, 5);
    }

    #[tokio::test]
    async fn unfinished_sessions_are_not_saved() {
        let repo = InMemoryRepository::new();
        let svc = service(&repo);
        let session = svc.start_session(settings(&["m2", "M2"])).await.unwrap();

        let err = svc.finish_session(&session).await.unwrap_err();
        assert!(matches!(err, SaveSessionError::NotEnded));
        assert!(
            repo.recent_sessions(ExerciseType::Interval, 10)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn next_session_is_biased_by_saved_mistakes() {
        let repo = InMemoryRepository::new();
        let svc = service(&repo);
        let pool = ["P4", "P5", "M2", "M6"];

        let mut first = svc
            .start_session_with_rng(settings(&pool), StdRng::seed_from_u64(1))
            .await
            .unwrap();
        // m3 is a valid interval outside the pool, so every answer is wrong.
        play_through(&mut first, "m3");
        svc.finish_session(&first).await.unwrap();
        assert_eq!(first.total_correct(), 0);

        let second = svc
            .start_session_with_rng(settings(&pool), StdRng::seed_from_u64(2))
            .await
            .unwrap();
        let weights = second.selector().weights();
        for value in pool.map(QuestionValue::from) {
            let missed = first.errors().contains_key(&value);
            assert_eq!(weights.weight(&value) > 1.0, missed, "{value}");
        }

        svc.clear_history(ExerciseType::Interval).await.unwrap();
        assert!(svc.history().fetch(ExerciseType::Interval).await.is_empty());
    }
}
