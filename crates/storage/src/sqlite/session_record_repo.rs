use ear_core::model::{ExerciseType, FinishedSession, SessionRecord, SessionRecordId};

use super::{
    SqliteRepository,
    mapping::{conn, limit_i64, map_session_row, ser, session_payload_json},
};
use crate::repository::{SessionHistoryRepository, StorageError, eviction_count};

#[async_trait::async_trait]
impl SessionHistoryRepository for SqliteRepository {
    async fn recent_sessions(
        &self,
        exercise: ExerciseType,
        limit: usize,
    ) -> Result<Vec<SessionRecord>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, exercise, duration_secs, payload, completed_at
                FROM (
                    SELECT id, exercise, duration_secs, payload, completed_at
                    FROM session_records
                    WHERE exercise = ?1
                    ORDER BY completed_at DESC, id DESC
                    LIMIT ?2
                )
                ORDER BY completed_at ASC, id ASC
            ",
        )
        .bind(exercise.as_str())
        .bind(limit_i64(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_session_row(&row)?);
        }
        Ok(out)
    }

    async fn append_session(
        &self,
        session: &FinishedSession,
        retain: usize,
    ) -> Result<SessionRecordId, StorageError> {
        session.validate().map_err(ser)?;
        let payload = session_payload_json(session)?;
        let duration = i64::try_from(session.duration).map_err(ser)?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let existing: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM session_records WHERE exercise = ?1")
                .bind(session.exercise.as_str())
                .fetch_one(&mut *tx)
                .await
                .map_err(conn)?;
        let evict = eviction_count(usize::try_from(existing).map_err(ser)?, retain);
        if evict > 0 {
            sqlx::query(
                r"
                    DELETE FROM session_records
                    WHERE id IN (
                        SELECT id FROM session_records
                        WHERE exercise = ?1
                        ORDER BY completed_at ASC, id ASC
                        LIMIT ?2
                    )
                ",
            )
            .bind(session.exercise.as_str())
            .bind(limit_i64(evict))
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        let res = sqlx::query(
            r"
                INSERT INTO session_records (exercise, duration_secs, payload, completed_at)
                VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(session.exercise.as_str())
        .bind(duration)
        .bind(payload)
        .bind(session.completed_at)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        tx.commit().await.map_err(conn)?;

        let id = u64::try_from(res.last_insert_rowid()).map_err(ser)?;
        Ok(SessionRecordId::new(id))
    }

    async fn clear_sessions(&self, exercise: ExerciseType) -> Result<u64, StorageError> {
        let res = sqlx::query("DELETE FROM session_records WHERE exercise = ?1")
            .bind(exercise.as_str())
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(res.rows_affected())
    }
}
