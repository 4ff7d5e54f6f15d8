use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;

use ear_core::model::{ExerciseType, PracticeStreak, SessionRecord, SessionRecordId};
use storage::repository::{
    InMemoryRepository, MAX_HISTORY_RECORDS, SessionHistoryRepository, StreakRepository,
};

use crate::Clock;
use crate::error::SessionError;

/// Presentation-agnostic list item for a saved session.
///
/// Timestamps and scores are left unformatted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionHistoryItem {
    pub id: SessionRecordId,
    pub exercise: ExerciseType,
    pub completed_at: DateTime<Utc>,
    pub duration_secs: u64,
    pub score: f64,
    pub correct: u32,
    pub question_count: u32,
}

impl SessionHistoryItem {
    #[must_use]
    pub fn from_record(record: &SessionRecord) -> Self {
        let session = &record.session;
        Self {
            id: record.id,
            exercise: session.exercise,
            completed_at: session.completed_at,
            duration_secs: session.duration,
            score: session.result.score,
            correct: session.result.correct,
            question_count: session.result.question_count,
        }
    }
}

/// Read side of the local session history and practice streak.
#[derive(Clone)]
pub struct SessionHistoryService {
    clock: Clock,
    sessions: Arc<dyn SessionHistoryRepository>,
    streak: Arc<dyn StreakRepository>,
}

impl SessionHistoryService {
    #[must_use]
    pub fn new(
        clock: Clock,
        sessions: Arc<dyn SessionHistoryRepository>,
        streak: Arc<dyn StreakRepository>,
    ) -> Self {
        Self {
            clock,
            sessions,
            streak,
        }
    }

    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        let repo = InMemoryRepository::new();
        Self::new(clock, Arc::new(repo.clone()), Arc::new(repo))
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Sessions of `exercise` completed in the last `days` days, newest first.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn list_recent_sessions(
        &self,
        exercise: ExerciseType,
        days: i64,
    ) -> Result<Vec<SessionHistoryItem>, SessionError> {
        let since = self.clock.now() - Duration::days(days);
        let records = self
            .sessions
            .recent_sessions(exercise, MAX_HISTORY_RECORDS)
            .await?;
        Ok(records
            .iter()
            .rev()
            .filter(|record| record.session.completed_at >= since)
            .map(SessionHistoryItem::from_record)
            .collect())
    }

    /// The latest saved session of each exercise that has one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn list_latest_by_exercise(
        &self,
        exercises: &[ExerciseType],
    ) -> Result<Vec<SessionHistoryItem>, SessionError> {
        let mut items = Vec::with_capacity(exercises.len());
        for exercise in exercises {
            let records = self.sessions.recent_sessions(*exercise, 1).await?;
            items.extend(records.last().map(SessionHistoryItem::from_record));
        }
        Ok(items)
    }

    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn streak(&self) -> Result<PracticeStreak, SessionError> {
        Ok(self.streak.get_streak().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ear_core::model::{FinishedSession, QuestionValue, SessionResultGroup, SessionScore};
    use ear_core::time::fixed_now;

    fn finished(
        exercise: ExerciseType,
        completed_at: DateTime<Utc>,
        correct: u32,
    ) -> FinishedSession {
        FinishedSession {
            exercise,
            duration: 45,
            result: SessionScore {
                score: f64::from(correct) * 20.0,
                correct,
                incorrect: 5 - correct,
                question_count: 5,
            },
            statistics: vec![SessionResultGroup {
                question_type: QuestionValue::from("x"),
                correct,
                incorrect: 5 - correct,
                question_count: 5,
                score: f64::from(correct) * 20.0,
            }],
            completed_at,
        }
    }

    #[test]
    fn history_item_serializes_camel_case() {
        let record = SessionRecord {
            id: SessionRecordId::new(7),
            session: finished(ExerciseType::Mode, fixed_now(), 4),
        };
        let json = serde_json::to_value(SessionHistoryItem::from_record(&record)).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["exercise"], "mode");
        assert_eq!(json["durationSecs"], 45);
        assert_eq!(json["questionCount"], 5);
        assert_eq!(json["score"], 80.0);
    }

    #[tokio::test]
    async fn recent_sessions_are_filtered_and_newest_first() {
        let repo = InMemoryRepository::new();
        let now = fixed_now();
        repo.append_session(
            &finished(ExerciseType::Interval, now - Duration::days(9), 1),
            MAX_HISTORY_RECORDS,
        )
        .await
        .unwrap();
        repo.append_session(
            &finished(ExerciseType::Interval, now - Duration::days(2), 3),
            MAX_HISTORY_RECORDS,
        )
        .await
        .unwrap();
        let latest = repo
            .append_session(
                &finished(ExerciseType::Interval, now - Duration::days(1), 4),
                MAX_HISTORY_RECORDS,
            )
            .await
            .unwrap();

        let svc = SessionHistoryService::new(
            Clock::Fixed(now),
            Arc::new(repo.clone()),
            Arc::new(repo),
        );
        let items = svc
            .list_recent_sessions(ExerciseType::Interval, 7)
            .await
            .unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, latest);
        assert_eq!(items[0].correct, 4);
        assert_eq!(items[1].score, 60.0);
    }

    #[tokio::test]
    async fn latest_per_exercise_skips_unpracticed_ones() {
        let repo = InMemoryRepository::new();
        let now = fixed_now();
        repo.append_session(&finished(ExerciseType::Chord, now, 2), MAX_HISTORY_RECORDS)
            .await
            .unwrap();
        let newest = repo
            .append_session(
                &finished(ExerciseType::Chord, now + Duration::hours(1), 5),
                MAX_HISTORY_RECORDS,
            )
            .await
            .unwrap();

        let svc = SessionHistoryService::new(
            Clock::Fixed(now),
            Arc::new(repo.clone()),
            Arc::new(repo),
        );
        let items = svc.list_latest_by_exercise(&ExerciseType::ALL).await.unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, newest);
        assert_eq!(items[0].exercise, ExerciseType::Chord);
        assert_eq!(svc.streak().await.unwrap(), PracticeStreak::default());
    }
}
