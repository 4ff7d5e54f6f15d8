use ear_core::model::{
    ErrorMap, ErrorRecord, ErrorRecordId, ExerciseType, FinishedSession, SessionRecord,
    SessionRecordId, SessionResultGroup, SessionScore,
};
use serde::{Deserialize, Serialize};
use sqlx::Row;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn limit_i64(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn parse_exercise(s: &str) -> Result<ExerciseType, StorageError> {
    s.parse::<ExerciseType>().map_err(ser)
}

pub(crate) fn errors_to_json(errors: &ErrorMap) -> Result<String, StorageError> {
    serde_json::to_string(errors).map_err(ser)
}

pub(crate) fn map_error_record_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<ErrorRecord, StorageError> {
    let id = i64_to_u64("id", row.try_get::<i64, _>("id").map_err(ser)?)?;
    let exercise = parse_exercise(&row.try_get::<String, _>("exercise").map_err(ser)?)?;
    let errors_json: String = row.try_get("errors").map_err(ser)?;
    let errors: ErrorMap = serde_json::from_str(&errors_json).map_err(ser)?;

    Ok(ErrorRecord {
        id: Some(ErrorRecordId::new(id)),
        exercise,
        errors,
        recorded_at: row.try_get("recorded_at").map_err(ser)?,
    })
}

/// Stored JSON body of a finished session.
#[derive(Serialize, Deserialize)]
struct SessionPayload {
    result: SessionScore,
    statistics: Vec<SessionResultGroup>,
}

pub(crate) fn session_payload_json(session: &FinishedSession) -> Result<String, StorageError> {
    let payload = SessionPayload {
        result: session.result.clone(),
        statistics: session.statistics.clone(),
    };
    serde_json::to_string(&payload).map_err(ser)
}

pub(crate) fn map_session_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<SessionRecord, StorageError> {
    let id = i64_to_u64("id", row.try_get::<i64, _>("id").map_err(ser)?)?;
    let exercise = parse_exercise(&row.try_get::<String, _>("exercise").map_err(ser)?)?;
    let duration = i64_to_u64(
        "duration_secs",
        row.try_get::<i64, _>("duration_secs").map_err(ser)?,
    )?;
    let payload_json: String = row.try_get("payload").map_err(ser)?;
    let payload: SessionPayload = serde_json::from_str(&payload_json).map_err(ser)?;

    let session = FinishedSession {
        exercise,
        duration,
        result: payload.result,
        statistics: payload.statistics,
        completed_at: row.try_get("completed_at").map_err(ser)?,
    };
    session.validate().map_err(ser)?;

    Ok(SessionRecord {
        id: SessionRecordId::new(id),
        session,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ear_core::model::QuestionValue;
    use ear_core::time::fixed_now;

    #[test]
    fn stored_payload_keeps_overall_result_and_grouped_statistics() {
        let session = FinishedSession {
            exercise: ExerciseType::Interval,
            duration: 12,
            result: SessionScore {
                score: 50.0,
                correct: 1,
                incorrect: 1,
                question_count: 2,
            },
            statistics: vec![SessionResultGroup {
                question_type: QuestionValue::from("m2"),
                correct: 1,
                incorrect: 1,
                question_count: 2,
                score: 50.0,
            }],
            completed_at: fixed_now(),
        };

        let json: serde_json::Value =
            serde_json::from_str(&session_payload_json(&session).unwrap()).unwrap();
        assert_eq!(json["result"]["questionCount"], 2);
        assert_eq!(json["statistics"][0]["questionType"], "m2");
    }
}
