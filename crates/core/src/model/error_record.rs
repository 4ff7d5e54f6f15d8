use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{ErrorRecordId, ExerciseType, QuestionValue};

/// Asked value mapped to the wrong answers given for it.
pub type ErrorMap = BTreeMap<QuestionValue, Vec<QuestionValue>>;

/// The mistakes of one finished session, as kept in local history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub id: Option<ErrorRecordId>,
    pub exercise: ExerciseType,
    pub errors: ErrorMap,
    pub recorded_at: DateTime<Utc>,
}

impl ErrorRecord {
    #[must_use]
    pub fn new(exercise: ExerciseType, errors: ErrorMap, recorded_at: DateTime<Utc>) -> Self {
        Self {
            id: None,
            exercise,
            errors,
            recorded_at,
        }
    }

    /// Total wrong answers across all asked values.
    #[must_use]
    pub fn mistake_count(&self) -> usize {
        self.errors.values().map(Vec::len).sum()
    }
}

/// Adds one wrong answer for `asked` to the map.
pub fn record_mistake(errors: &mut ErrorMap, asked: &QuestionValue, answered: QuestionValue) {
    errors.entry(asked.clone()).or_default().push(answered);
}

/// Concatenates the wrong-answer lists of several records key by key.
///
/// Records are expected oldest first; each list keeps that order.
#[must_use]
pub fn merge_error_records<'a, I>(records: I) -> ErrorMap
where
    I: IntoIterator<Item = &'a ErrorRecord>,
{
    let mut merged = ErrorMap::new();
    for record in records {
        for (asked, wrong) in &record.errors {
            merged
                .entry(asked.clone())
                .or_default()
                .extend(wrong.iter().cloned());
        }
    }
    merged
}
