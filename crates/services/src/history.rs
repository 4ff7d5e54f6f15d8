use std::sync::Arc;

use ear_core::Clock;
use ear_core::model::{ErrorMap, ErrorRecord, ExerciseType, merge_error_records};
use storage::repository::{ErrorHistoryRepository, MAX_HISTORY_RECORDS};

/// Error history as the session flow sees it.
///
/// Storage failures never surface here: reads degrade to an empty map and
/// writes are dropped, both with a warning.
#[derive(Clone)]
pub struct ErrorHistoryStore {
    clock: Clock,
    repo: Arc<dyn ErrorHistoryRepository>,
    retain: usize,
}

impl ErrorHistoryStore {
    #[must_use]
    pub fn new(clock: Clock, repo: Arc<dyn ErrorHistoryRepository>) -> Self {
        Self {
            clock,
            repo,
            retain: MAX_HISTORY_RECORDS,
        }
    }

    #[must_use]
    pub fn retain(&self) -> usize {
        self.retain
    }

    /// Mistakes from the retained sessions of `exercise`, merged oldest first.
    pub async fn fetch(&self, exercise: ExerciseType) -> ErrorMap {
        match self.repo.recent_error_records(exercise, self.retain).await {
            Ok(records) => merge_error_records(&records),
            Err(err) => {
                tracing::warn!(%exercise, error = %err, "error history unavailable");
                ErrorMap::new()
            }
        }
    }

    /// Stores one session's mistakes. Empty maps are not stored.
    pub async fn append(&self, exercise: ExerciseType, errors: &ErrorMap) {
        if errors.is_empty() {
            return;
        }
        let record = ErrorRecord::new(exercise, errors.clone(), self.clock.now());
        match self.repo.append_error_record(&record, self.retain).await {
            Ok(id) => {
                tracing::debug!(
                    %exercise,
                    %id,
                    mistakes = record.mistake_count(),
                    "error history saved"
                );
            }
            Err(err) => {
                tracing::warn!(%exercise, error = %err, "error history not saved");
            }
        }
    }

    /// Forgets every stored mistake for `exercise`.
    pub async fn clear(&self, exercise: ExerciseType) {
        match self.repo.clear_error_records(exercise).await {
            Ok(removed) => tracing::info!(%exercise, removed, "error history cleared"),
            Err(err) => tracing::warn!(%exercise, error = %err, "error history not cleared"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ear_core::model::{ErrorRecordId, QuestionValue, record_mistake};
    use ear_core::time::fixed_clock;
    use storage::repository::{InMemoryRepository, StorageError};

    struct Unavailable;

    #[async_trait]
    impl ErrorHistoryRepository for Unavailable {
        async fn recent_error_records(
            &self,
            _exercise: ExerciseType,
            _limit: usize,
        ) -> Result<Vec<ErrorRecord>, StorageError> {
            Err(StorageError::Connection("offline".into()))
        }

        async fn append_error_record(
            &self,
            _record: &ErrorRecord,
            _retain: usize,
        ) -> Result<ErrorRecordId, StorageError> {
            Err(StorageError::Connection("offline".into()))
        }

        async fn clear_error_records(&self, _exercise: ExerciseType) -> Result<u64, StorageError> {
            Err(StorageError::Connection("offline".into()))
        }
    }

    fn mistakes(asked: &str, answered: &str) -> ErrorMap {
        let mut errors = ErrorMap::new();
        record_mistake(
            &mut errors,
            &QuestionValue::from(asked),
            QuestionValue::from(answered),
        );
        errors
    }

    #[tokio::test]
    async fn fetch_merges_recent_sessions() {
        let store = ErrorHistoryStore::new(fixed_clock(), Arc::new(InMemoryRepository::new()));
        store.append(ExerciseType::Interval, &mistakes("P4", "P5")).await;
        store.append(ExerciseType::Interval, &mistakes("P4", "M2")).await;
        store.append(ExerciseType::Interval, &ErrorMap::new()).await;

        let merged = store.fetch(ExerciseType::Interval).await;
        assert_eq!(
            merged[&QuestionValue::from("P4")],
            vec![QuestionValue::from("P5"), QuestionValue::from("M2")]
        );
        assert!(store.fetch(ExerciseType::Mode).await.is_empty());

        store.clear(ExerciseType::Interval).await;
        assert!(store.fetch(ExerciseType::Interval).await.is_empty());
    }

    #[tokio::test]
    async fn storage_failures_are_swallowed() {
        let store = ErrorHistoryStore::new(fixed_clock(), Arc::new(Unavailable));
        assert!(store.fetch(ExerciseType::Chord).await.is_empty());
        store.append(ExerciseType::Chord, &mistakes("maj", "min")).await;
        store.clear(ExerciseType::Chord).await;
    }
}
