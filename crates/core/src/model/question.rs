use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::theory::{NoteSequence, Pitch};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question {value} was already answered")]
    AlreadyAnswered { value: QuestionValue },

    #[error("unknown exercise type: {0}")]
    UnknownExercise(String),
}

//
// ─── EXERCISE TYPE ─────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseType {
    Interval,
    Chord,
    Mode,
}

impl ExerciseType {
    pub const ALL: [ExerciseType; 3] = [
        ExerciseType::Interval,
        ExerciseType::Chord,
        ExerciseType::Mode,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ExerciseType::Interval => "interval",
            ExerciseType::Chord => "chord",
            ExerciseType::Mode => "mode",
        }
    }
}

impl fmt::Display for ExerciseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExerciseType {
    type Err = QuestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "interval" => Ok(ExerciseType::Interval),
            "chord" => Ok(ExerciseType::Chord),
            "mode" => Ok(ExerciseType::Mode),
            other => Err(QuestionError::UnknownExercise(other.to_string())),
        }
    }
}

//
// ─── QUESTION VALUE ────────────────────────────────────────────────────────────
//

/// What a question asks for: an interval symbol, a chord quality or a mode
/// name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionValue(String);

impl QuestionValue {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for QuestionValue {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for QuestionValue {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for QuestionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// One asked question with the notes that were played for it.
///
/// A question starts open and is closed exactly once by [`Question::record_answer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    value: QuestionValue,
    root: Pitch,
    notes: NoteSequence,
    inversion: Option<u8>,
    answered: bool,
    correct: Option<bool>,
}

impl Question {
    #[must_use]
    pub fn new(
        value: QuestionValue,
        root: Pitch,
        notes: NoteSequence,
        inversion: Option<u8>,
    ) -> Self {
        Self {
            value,
            root,
            notes,
            inversion,
            answered: false,
            correct: None,
        }
    }

    #[must_use]
    pub fn value(&self) -> &QuestionValue {
        &self.value
    }

    #[must_use]
    pub fn root(&self) -> &Pitch {
        &self.root
    }

    #[must_use]
    pub fn notes(&self) -> &NoteSequence {
        &self.notes
    }

    #[must_use]
    pub fn inversion(&self) -> Option<u8> {
        self.inversion
    }

    #[must_use]
    pub fn is_answered(&self) -> bool {
        self.answered
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.answered
    }

    /// `None` until the question is answered.
    #[must_use]
    pub fn correct(&self) -> Option<bool> {
        self.correct
    }

    /// Closes the question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::AlreadyAnswered` if the question was closed before.
    pub fn record_answer(&mut self, correct: bool) -> Result<(), QuestionError> {
        if self.answered {
            return Err(QuestionError::AlreadyAnswered {
                value: self.value.clone(),
            });
        }
        self.answered = true;
        self.correct = Some(correct);
        Ok(())
    }
}
