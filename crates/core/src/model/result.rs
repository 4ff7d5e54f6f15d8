use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{ExerciseType, Question, QuestionValue, SessionRecordId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionResultError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("too many questions for a single session: {len}")]
    TooManyQuestions { len: usize },

    #[error("{scope}: correct + incorrect ({sum}) does not match question count ({total})")]
    CountMismatch {
        scope: String,
        total: u32,
        sum: u32,
    },
}

/// Score for one question value within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResultGroup {
    pub question_type: QuestionValue,
    pub correct: u32,
    pub incorrect: u32,
    pub question_count: u32,
    pub score: f64,
}

/// Score over every answered question of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionScore {
    pub score: f64,
    pub correct: u32,
    pub incorrect: u32,
    pub question_count: u32,
}

/// Percentage rounded to one decimal place; zero when nothing was asked.
#[must_use]
pub fn percentage(correct: u32, count: u32) -> f64 {
    if count == 0 {
        return 0.0;
    }
    (f64::from(correct) / f64::from(count) * 1000.0).round() / 10.0
}

/// Groups answered questions by value, in order of first appearance.
#[must_use]
pub fn aggregate(questions: &[Question]) -> Vec<SessionResultGroup> {
    let mut groups: Vec<SessionResultGroup> = Vec::new();
    for question in questions.iter().filter(|q| q.is_answered()) {
        let idx = match groups
            .iter()
            .position(|g| &g.question_type == question.value())
        {
            Some(idx) => idx,
            None => {
                groups.push(SessionResultGroup {
                    question_type: question.value().clone(),
                    correct: 0,
                    incorrect: 0,
                    question_count: 0,
                    score: 0.0,
                });
                groups.len() - 1
            }
        };
        let group = &mut groups[idx];
        group.question_count = group.question_count.saturating_add(1);
        if question.correct() == Some(true) {
            group.correct = group.correct.saturating_add(1);
        }
    }
    for group in &mut groups {
        group.incorrect = group.question_count - group.correct;
        group.score = percentage(group.correct, group.question_count);
    }
    groups
}

#[must_use]
pub fn overall(questions: &[Question]) -> SessionScore {
    let answered = questions.iter().filter(|q| q.is_answered());
    let (mut correct, mut count) = (0_u32, 0_u32);
    for question in answered {
        count = count.saturating_add(1);
        if question.correct() == Some(true) {
            correct = correct.saturating_add(1);
        }
    }
    SessionScore {
        score: percentage(correct, count),
        correct,
        incorrect: count - correct,
        question_count: count,
    }
}

//
// ─── FINISHED SESSION ──────────────────────────────────────────────────────────
//

/// Result payload of an ended session, as saved locally and uploaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinishedSession {
    #[serde(rename = "type")]
    pub exercise: ExerciseType,
    /// Whole seconds between the first question and the last answer.
    pub duration: u64,
    /// Score over every answered question.
    pub result: SessionScore,
    /// Per-value scores, in order of first appearance.
    pub statistics: Vec<SessionResultGroup>,
    #[serde(skip)]
    pub completed_at: DateTime<Utc>,
}

impl FinishedSession {
    /// Builds the payload from the questions of an ended session.
    ///
    /// # Errors
    ///
    /// Returns `SessionResultError::InvalidTimeRange` if `completed_at` is before `started_at`.
    /// Returns `SessionResultError::TooManyQuestions` if the question count cannot fit in `u32`.
    pub fn from_questions(
        exercise: ExerciseType,
        questions: &[Question],
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, SessionResultError> {
        if completed_at < started_at {
            return Err(SessionResultError::InvalidTimeRange);
        }
        u32::try_from(questions.len()).map_err(|_| SessionResultError::TooManyQuestions {
            len: questions.len(),
        })?;
        let duration = u64::try_from((completed_at - started_at).num_seconds()).unwrap_or(0);

        let session = Self {
            exercise,
            duration,
            result: overall(questions),
            statistics: aggregate(questions),
            completed_at,
        };
        session.validate()?;
        Ok(session)
    }

    /// Checks that counts add up overall and for every group.
    ///
    /// # Errors
    ///
    /// Returns `SessionResultError::CountMismatch` naming the first scope that
    /// does not add up.
    pub fn validate(&self) -> Result<(), SessionResultError> {
        let overall = &self.result;
        check_counts("overall", overall.correct, overall.incorrect, overall.question_count)?;
        let mut grouped = 0_u32;
        for group in &self.statistics {
            check_counts(
                group.question_type.as_str(),
                group.correct,
                group.incorrect,
                group.question_count,
            )?;
            grouped = grouped.saturating_add(group.question_count);
        }
        if grouped != overall.question_count {
            return Err(SessionResultError::CountMismatch {
                scope: "groups".to_string(),
                total: overall.question_count,
                sum: grouped,
            });
        }
        Ok(())
    }
}

fn check_counts(
    scope: &str,
    correct: u32,
    incorrect: u32,
    total: u32,
) -> Result<(), SessionResultError> {
    let sum = correct.saturating_add(incorrect);
    if sum != total {
        return Err(SessionResultError::CountMismatch {
            scope: scope.to_string(),
            total,
            sum,
        });
    }
    Ok(())
}

/// A finished session after it has been stored locally.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub id: SessionRecordId,
    pub session: FinishedSession,
}
