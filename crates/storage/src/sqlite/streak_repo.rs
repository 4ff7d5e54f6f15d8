use chrono::NaiveDate;
use ear_core::model::PracticeStreak;
use sqlx::Row;

use super::{
    SqliteRepository,
    mapping::{conn, ser},
};
use crate::repository::{StorageError, StreakRepository};

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

#[async_trait::async_trait]
impl StreakRepository for SqliteRepository {
    async fn get_streak(&self) -> Result<PracticeStreak, StorageError> {
        let row = sqlx::query(
            r"
                SELECT current, best, last_practiced
                FROM practice_streak
                WHERE id = 1
            ",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;
        let Some(row) = row else {
            return Ok(PracticeStreak::default());
        };

        let current = u32_from_i64("current", row.try_get::<i64, _>("current").map_err(ser)?)?;
        let best = u32_from_i64("best", row.try_get::<i64, _>("best").map_err(ser)?)?;
        let last_practiced: Option<NaiveDate> = row.try_get("last_practiced").map_err(ser)?;
        Ok(PracticeStreak::from_persisted(current, best, last_practiced))
    }

    async fn save_streak(&self, streak: &PracticeStreak) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO practice_streak (id, current, best, last_practiced)
                VALUES (1, ?1, ?2, ?3)
                ON CONFLICT(id) DO UPDATE SET
                    current = excluded.current,
                    best = excluded.best,
                    last_practiced = excluded.last_practiced
            ",
        )
        .bind(i64::from(streak.current()))
        .bind(i64::from(streak.best()))
        .bind(streak.last_practiced())
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }
}
