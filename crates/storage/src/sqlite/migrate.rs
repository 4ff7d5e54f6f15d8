use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Applies every schema version that is not yet recorded in
/// `schema_migrations`, each inside its own transaction.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: error and session history.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS error_records (
                    id INTEGER PRIMARY KEY,
                    exercise TEXT NOT NULL CHECK (exercise IN ('interval', 'chord', 'mode')),
                    errors TEXT NOT NULL,
                    recorded_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS session_records (
                    id INTEGER PRIMARY KEY,
                    exercise TEXT NOT NULL CHECK (exercise IN ('interval', 'chord', 'mode')),
                    duration_secs INTEGER NOT NULL CHECK (duration_secs >= 0),
                    payload TEXT NOT NULL,
                    completed_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_error_records_exercise_recorded
                    ON error_records (exercise, recorded_at, id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_session_records_exercise_completed
                    ON session_records (exercise, completed_at, id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        record_version(&mut tx, 1).await?;
        tx.commit().await?;
    }

    // Version 2: practice streak, a single row.
    if !is_applied(pool, 2).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS practice_streak (
                    id INTEGER PRIMARY KEY CHECK (id = 1),
                    current INTEGER NOT NULL CHECK (current >= 0),
                    best INTEGER NOT NULL CHECK (best >= current),
                    last_practiced TEXT
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        record_version(&mut tx, 2).await?;
        tx.commit().await?;
    }

    Ok(())
}

async fn record_version(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    version: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r"
            INSERT INTO schema_migrations (version, applied_at)
            VALUES (?1, ?2)
            ON CONFLICT(version) DO NOTHING
        ",
    )
    .bind(version)
    .bind(Utc::now())
    .execute(&mut **tx)
    .await?;
    tracing::info!(version, "applied schema migration");
    Ok(())
}
