use ear_core::model::{ErrorRecord, ErrorRecordId, ExerciseType};

use super::{
    SqliteRepository,
    mapping::{conn, errors_to_json, limit_i64, map_error_record_row, ser},
};
use crate::repository::{ErrorHistoryRepository, StorageError, eviction_count};

#[async_trait::async_trait]
impl ErrorHistoryRepository for SqliteRepository {
    async fn recent_error_records(
        &self,
        exercise: ExerciseType,
        limit: usize,
    ) -> Result<Vec<ErrorRecord>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, exercise, errors, recorded_at
                FROM (
                    SELECT id, exercise, errors, recorded_at
                    FROM error_records
                    WHERE exercise = ?1
                    ORDER BY recorded_at DESC, id DESC
                    LIMIT ?2
                )
                ORDER BY recorded_at ASC, id ASC
            ",
        )
        .bind(exercise.as_str())
        .bind(limit_i64(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_error_record_row(&row)?);
        }
        Ok(out)
    }

    async fn append_error_record(
        &self,
        record: &ErrorRecord,
        retain: usize,
    ) -> Result<ErrorRecordId, StorageError> {
        let errors = errors_to_json(&record.errors)?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let existing: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM error_records WHERE exercise = ?1")
                .bind(record.exercise.as_str())
                .fetch_one(&mut *tx)
                .await
                .map_err(conn)?;
        let existing = usize::try_from(existing).map_err(ser)?;
        let evict = eviction_count(existing, retain);
        if evict > 0 {
            sqlx::query(
                r"
                    DELETE FROM error_records
                    WHERE id IN (
                        SELECT id FROM error_records
                        WHERE exercise = ?1
                        ORDER BY recorded_at ASC, id ASC
                        LIMIT ?2
                    )
                ",
            )
            .bind(record.exercise.as_str())
            .bind(limit_i64(evict))
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
            tracing::debug!(
                exercise = %record.exercise,
                evicted = evict,
                "evicted old error records"
            );
        }

        let res = sqlx::query(
            r"
                INSERT INTO error_records (exercise, errors, recorded_at)
                VALUES (?1, ?2, ?3)
            ",
        )
        .bind(record.exercise.as_str())
        .bind(errors)
        .bind(record.recorded_at)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        tx.commit().await.map_err(conn)?;

        let id = u64::try_from(res.last_insert_rowid()).map_err(ser)?;
        Ok(ErrorRecordId::new(id))
    }

    async fn clear_error_records(&self, exercise: ExerciseType) -> Result<u64, StorageError> {
        let res = sqlx::query("DELETE FROM error_records WHERE exercise = ?1")
            .bind(exercise.as_str())
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(res.rows_affected())
    }
}
