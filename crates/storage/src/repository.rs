use async_trait::async_trait;
use ear_core::model::{
    ErrorRecord, ErrorRecordId, ExerciseType, FinishedSession, PracticeStreak, SessionRecord,
    SessionRecordId,
};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Records kept per exercise type in each local history.
pub const MAX_HISTORY_RECORDS: usize = 10;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Number of oldest records to drop so that `retain` remain after one insert.
#[must_use]
pub fn eviction_count(existing: usize, retain: usize) -> usize {
    let retain = retain.max(1);
    if existing >= retain {
        existing - (retain - 1)
    } else {
        0
    }
}

/// Repository contract for the per-exercise error history.
#[async_trait]
pub trait ErrorHistoryRepository: Send + Sync {
    /// The most recent `limit` records for `exercise`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if records cannot be read or decoded.
    async fn recent_error_records(
        &self,
        exercise: ExerciseType,
        limit: usize,
    ) -> Result<Vec<ErrorRecord>, StorageError>;

    /// Stores a record, first evicting the oldest ones so that at most
    /// `retain` remain for its exercise.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored. Nothing is
    /// evicted when the insert fails.
    async fn append_error_record(
        &self,
        record: &ErrorRecord,
        retain: usize,
    ) -> Result<ErrorRecordId, StorageError>;

    /// Removes every record for `exercise`, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the records cannot be removed.
    async fn clear_error_records(&self, exercise: ExerciseType) -> Result<u64, StorageError>;
}

/// Repository contract for finished sessions.
#[async_trait]
pub trait SessionHistoryRepository: Send + Sync {
    /// The most recent `limit` sessions for `exercise`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if sessions cannot be read or decoded.
    async fn recent_sessions(
        &self,
        exercise: ExerciseType,
        limit: usize,
    ) -> Result<Vec<SessionRecord>, StorageError>;

    /// Stores a session with the same eviction rule as the error history.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the session cannot be stored.
    async fn append_session(
        &self,
        session: &FinishedSession,
        retain: usize,
    ) -> Result<SessionRecordId, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the sessions cannot be removed.
    async fn clear_sessions(&self, exercise: ExerciseType) -> Result<u64, StorageError>;
}

#[async_trait]
pub trait StreakRepository: Send + Sync {
    /// The stored streak, or an empty one if none was saved yet.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the streak cannot be read.
    async fn get_streak(&self) -> Result<PracticeStreak, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the streak cannot be stored.
    async fn save_streak(&self, streak: &PracticeStreak) -> Result<(), StorageError>;
}

//
// ─── IN MEMORY ─────────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct MemoryState {
    next_id: u64,
    error_records: Vec<ErrorRecord>,
    sessions: Vec<SessionRecord>,
    streak: Option<PracticeStreak>,
}

impl MemoryState {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

/// Keeps the newest `limit` entries of an oldest-first list.
fn newest<T: Clone>(items: &[&T], limit: usize) -> Vec<T> {
    let skip = items.len().saturating_sub(limit);
    items[skip..].iter().map(|item| (*item).clone()).collect()
}

#[async_trait]
impl ErrorHistoryRepository for InMemoryRepository {
    async fn recent_error_records(
        &self,
        exercise: ExerciseType,
        limit: usize,
    ) -> Result<Vec<ErrorRecord>, StorageError> {
        let guard = self.lock()?;
        let mut matching: Vec<&ErrorRecord> = guard
            .error_records
            .iter()
            .filter(|r| r.exercise == exercise)
            .collect();
        matching.sort_by_key(|r| (r.recorded_at, r.id));
        Ok(newest(&matching, limit))
    }

    async fn append_error_record(
        &self,
        record: &ErrorRecord,
        retain: usize,
    ) -> Result<ErrorRecordId, StorageError> {
        let mut guard = self.lock()?;

        let mut existing: Vec<(chrono::DateTime<chrono::Utc>, Option<ErrorRecordId>)> = guard
            .error_records
            .iter()
            .filter(|r| r.exercise == record.exercise)
            .map(|r| (r.recorded_at, r.id))
            .collect();
        existing.sort();
        let evict = eviction_count(existing.len(), retain);
        if evict > 0 {
            let doomed: Vec<_> = existing[..evict].iter().map(|(_, id)| *id).collect();
            guard
                .error_records
                .retain(|r| r.exercise != record.exercise || !doomed.contains(&r.id));
            tracing::debug!(
                exercise = %record.exercise,
                evicted = evict,
                "evicted old error records"
            );
        }

        let id = ErrorRecordId::new(guard.allocate_id());
        let mut stored = record.clone();
        stored.id = Some(id);
        guard.error_records.push(stored);
        Ok(id)
    }

    async fn clear_error_records(&self, exercise: ExerciseType) -> Result<u64, StorageError> {
        let mut guard = self.lock()?;
        let before = guard.error_records.len();
        guard.error_records.retain(|r| r.exercise != exercise);
        Ok((before - guard.error_records.len()) as u64)
    }
}

#[async_trait]
impl SessionHistoryRepository for InMemoryRepository {
    async fn recent_sessions(
        &self,
        exercise: ExerciseType,
        limit: usize,
    ) -> Result<Vec<SessionRecord>, StorageError> {
        let guard = self.lock()?;
        let mut matching: Vec<&SessionRecord> = guard
            .sessions
            .iter()
            .filter(|r| r.session.exercise == exercise)
            .collect();
        matching.sort_by_key(|r| (r.session.completed_at, r.id));
        Ok(newest(&matching, limit))
    }

    async fn append_session(
        &self,
        session: &FinishedSession,
        retain: usize,
    ) -> Result<SessionRecordId, StorageError> {
        let mut guard = self.lock()?;

        let mut existing: Vec<(chrono::DateTime<chrono::Utc>, SessionRecordId)> = guard
            .sessions
            .iter()
            .filter(|r| r.session.exercise == session.exercise)
            .map(|r| (r.session.completed_at, r.id))
            .collect();
        existing.sort();
        let evict = eviction_count(existing.len(), retain);
        if evict > 0 {
            let doomed: Vec<SessionRecordId> =
                existing[..evict].iter().map(|(_, id)| *id).collect();
            guard.sessions.retain(|r| !doomed.contains(&r.id));
            tracing::debug!(
                exercise = %session.exercise,
                evicted = evict,
                "evicted old sessions"
            );
        }

        let id = SessionRecordId::new(guard.allocate_id());
        guard.sessions.push(SessionRecord {
            id,
            session: session.clone(),
        });
        Ok(id)
    }

    async fn clear_sessions(&self, exercise: ExerciseType) -> Result<u64, StorageError> {
        let mut guard = self.lock()?;
        let before = guard.sessions.len();
        guard.sessions.retain(|r| r.session.exercise != exercise);
        Ok((before - guard.sessions.len()) as u64)
    }
}

#[async_trait]
impl StreakRepository for InMemoryRepository {
    async fn get_streak(&self) -> Result<PracticeStreak, StorageError> {
        Ok(self.lock()?.streak.unwrap_or_default())
    }

    async fn save_streak(&self, streak: &PracticeStreak) -> Result<(), StorageError> {
        self.lock()?.streak = Some(*streak);
        Ok(())
    }
}

/// Aggregates the history repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub errors: Arc<dyn ErrorHistoryRepository>,
    pub sessions: Arc<dyn SessionHistoryRepository>,
    pub streak: Arc<dyn StreakRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let errors: Arc<dyn ErrorHistoryRepository> = Arc::new(repo.clone());
        let sessions: Arc<dyn SessionHistoryRepository> = Arc::new(repo.clone());
        let streak: Arc<dyn StreakRepository> = Arc::new(repo);
        Self {
            errors,
            sessions,
            streak,
        }
    }
}
