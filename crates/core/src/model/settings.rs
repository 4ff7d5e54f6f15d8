use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{ExerciseType, QuestionValue};
use crate::theory::{Pitch, PlayingMode, question_kind};

pub const MIN_QUESTIONS: u32 = 5;
pub const MAX_QUESTIONS: u32 = 100;
pub const MIN_TEMPO: u32 = 60;
pub const MAX_TEMPO: u32 = 180;

/// Largest chord in the chord taxonomy has four members.
const MAX_INVERSION: u8 = 3;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("question pool cannot be empty")]
    EmptyPool,

    #[error("{value} is not a {exercise} question")]
    UnknownValue {
        exercise: ExerciseType,
        value: QuestionValue,
    },

    #[error("{0} appears more than once in the question pool")]
    DuplicateValue(QuestionValue),

    #[error("number of questions must be between 5 and 100, got {0}")]
    InvalidQuestionCount(u32),

    #[error("tempo must be between 60 and 180 BPM, got {0}")]
    InvalidTempo(u32),

    #[error("{exercise} questions cannot be played {playing_mode}")]
    UnsupportedPlayingMode {
        exercise: ExerciseType,
        playing_mode: PlayingMode,
    },

    #[error("inversions only apply to chord questions")]
    InversionsNotSupported,

    #[error("inversion {0} is out of range")]
    InvalidInversion(u8),
}

//
// ─── NOTE DURATION ─────────────────────────────────────────────────────────────
//

/// Length of one playable unit relative to a quarter-note beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteDuration {
    Whole,
    Half,
    Quarter,
    Eighth,
}

impl NoteDuration {
    /// Units per beat: a whole note lasts four beats, an eighth half a beat.
    #[must_use]
    pub fn factor(self) -> f64 {
        match self {
            NoteDuration::Whole => 0.25,
            NoteDuration::Half => 0.5,
            NoteDuration::Quarter => 1.0,
            NoteDuration::Eighth => 2.0,
        }
    }
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

/// Unvalidated session settings as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSettingsDraft {
    pub exercise: ExerciseType,
    pub question_pool: Vec<QuestionValue>,
    pub number_of_questions: u32,
    pub playing_mode: PlayingMode,
    pub tempo: u32,
    pub note_duration: NoteDuration,
    pub fixed_root: Option<Pitch>,
    pub auto_feedback: bool,
    #[serde(default)]
    pub inversions: Vec<u8>,
}

impl SessionSettingsDraft {
    /// Ten questions at 100 BPM quarter notes with feedback on. Modes default to
    /// ascending, the other exercises to harmonic playback.
    pub fn new(exercise: ExerciseType, question_pool: Vec<QuestionValue>) -> Self {
        let playing_mode = match exercise {
            ExerciseType::Mode => PlayingMode::Ascending,
            ExerciseType::Interval | ExerciseType::Chord => PlayingMode::Harmonic,
        };
        Self {
            exercise,
            question_pool,
            number_of_questions: 10,
            playing_mode,
            tempo: 100,
            note_duration: NoteDuration::Quarter,
            fixed_root: None,
            auto_feedback: true,
            inversions: Vec::new(),
        }
    }

    /// Checks every field against the exercise.
    ///
    /// # Errors
    ///
    /// Returns the first `SettingsError` found.
    pub fn validate(self) -> Result<SessionSettings, SettingsError> {
        let kind = question_kind(self.exercise);

        if self.question_pool.is_empty() {
            return Err(SettingsError::EmptyPool);
        }
        let mut seen = BTreeSet::new();
        for value in &self.question_pool {
            if !kind.contains(value) {
                return Err(SettingsError::UnknownValue {
                    exercise: self.exercise,
                    value: value.clone(),
                });
            }
            if !seen.insert(value) {
                return Err(SettingsError::DuplicateValue(value.clone()));
            }
        }
        if !(MIN_QUESTIONS..=MAX_QUESTIONS).contains(&self.number_of_questions) {
            return Err(SettingsError::InvalidQuestionCount(
                self.number_of_questions,
            ));
        }
        if !(MIN_TEMPO..=MAX_TEMPO).contains(&self.tempo) {
            return Err(SettingsError::InvalidTempo(self.tempo));
        }
        if !kind.supports(self.playing_mode) {
            return Err(SettingsError::UnsupportedPlayingMode {
                exercise: self.exercise,
                playing_mode: self.playing_mode,
            });
        }

        let mut inversions = self.inversions;
        inversions.sort_unstable();
        inversions.dedup();
        if let Some(&bad) = inversions.iter().find(|k| **k > MAX_INVERSION) {
            return Err(SettingsError::InvalidInversion(bad));
        }
        if self.exercise != ExerciseType::Chord && inversions.iter().any(|k| *k != 0) {
            return Err(SettingsError::InversionsNotSupported);
        }
        if inversions.is_empty() {
            inversions.push(0);
        }

        Ok(SessionSettings {
            exercise: self.exercise,
            question_pool: self.question_pool,
            number_of_questions: self.number_of_questions,
            playing_mode: self.playing_mode,
            tempo: self.tempo,
            note_duration: self.note_duration,
            fixed_root: self.fixed_root,
            auto_feedback: self.auto_feedback,
            inversions,
        })
    }
}

/// Validated settings, immutable for the duration of a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSettings {
    exercise: ExerciseType,
    question_pool: Vec<QuestionValue>,
    number_of_questions: u32,
    playing_mode: PlayingMode,
    tempo: u32,
    note_duration: NoteDuration,
    fixed_root: Option<Pitch>,
    auto_feedback: bool,
    inversions: Vec<u8>,
}

impl SessionSettings {
    #[must_use]
    pub fn exercise(&self) -> ExerciseType {
        self.exercise
    }

    #[must_use]
    pub fn question_pool(&self) -> &[QuestionValue] {
        &self.question_pool
    }

    #[must_use]
    pub fn number_of_questions(&self) -> u32 {
        self.number_of_questions
    }

    #[must_use]
    pub fn playing_mode(&self) -> PlayingMode {
        self.playing_mode
    }

    #[must_use]
    pub fn tempo(&self) -> u32 {
        self.tempo
    }

    #[must_use]
    pub fn note_duration(&self) -> NoteDuration {
        self.note_duration
    }

    #[must_use]
    pub fn fixed_root(&self) -> Option<Pitch> {
        self.fixed_root
    }

    #[must_use]
    pub fn auto_feedback(&self) -> bool {
        self.auto_feedback
    }

    /// Allowed inversion indices, sorted; `[0]` unless configured.
    #[must_use]
    pub fn inversions(&self) -> &[u8] {
        &self.inversions
    }

    /// Seconds one playable unit sounds for.
    #[must_use]
    pub fn seconds_per_unit(&self) -> f64 {
        60.0 / (f64::from(self.tempo) * self.note_duration.factor())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(raw: &[&str]) -> Vec<QuestionValue> {
        raw.iter().copied().map(QuestionValue::from).collect()
    }

    #[test]
    fn defaults_validate() {
        let settings = SessionSettingsDraft::new(ExerciseType::Interval, values(&["m2", "M2"]))
            .validate()
            .unwrap();
        assert_eq!(settings.number_of_questions(), 10);
        assert_eq!(settings.inversions(), &[0]);
        assert!(settings.auto_feedback());
    }

    #[test]
    fn pool_must_be_known_and_unique() {
        let empty = SessionSettingsDraft::new(ExerciseType::Chord, Vec::new());
        assert_eq!(empty.validate().unwrap_err(), SettingsError::EmptyPool);

        let unknown = SessionSettingsDraft::new(ExerciseType::Chord, values(&["maj", "P5"]));
        assert!(matches!(
            unknown.validate().unwrap_err(),
            SettingsError::UnknownValue { .. }
        ));

        let dup = SessionSettingsDraft::new(ExerciseType::Mode, values(&["dorian", "dorian"]));
        assert_eq!(
            dup.validate().unwrap_err(),
            SettingsError::DuplicateValue(QuestionValue::from("dorian"))
        );
    }

    #[test]
    fn counts_and_tempo_are_bounded() {
        let mut draft = SessionSettingsDraft::new(ExerciseType::Interval, values(&["P4"]));
        draft.number_of_questions = 4;
        assert_eq!(
            draft.clone().validate().unwrap_err(),
            SettingsError::InvalidQuestionCount(4)
        );
        draft.number_of_questions = 100;
        draft.tempo = 181;
        assert_eq!(
            draft.clone().validate().unwrap_err(),
            SettingsError::InvalidTempo(181)
        );
        draft.tempo = 60;
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn modes_cannot_be_harmonic() {
        let mut draft = SessionSettingsDraft::new(ExerciseType::Mode, values(&["ionian"]));
        draft.playing_mode = PlayingMode::Harmonic;
        assert!(matches!(
            draft.validate().unwrap_err(),
            SettingsError::UnsupportedPlayingMode { .. }
        ));
    }

    #[test]
    fn inversions_are_chord_only() {
        let mut draft = SessionSettingsDraft::new(ExerciseType::Interval, values(&["P4"]));
        draft.inversions = vec![1];
        assert_eq!(
            draft.validate().unwrap_err(),
            SettingsError::InversionsNotSupported
        );

        let mut draft = SessionSettingsDraft::new(ExerciseType::Chord, values(&["maj7"]));
        draft.inversions = vec![3, 0, 2, 2];
        assert_eq!(draft.clone().validate().unwrap().inversions(), &[0, 2, 3]);
        draft.inversions = vec![4];
        assert_eq!(
            draft.validate().unwrap_err(),
            SettingsError::InvalidInversion(4)
        );
    }

    #[test]
    fn seconds_per_unit_follows_tempo_and_duration() {
        let mut draft = SessionSettingsDraft::new(ExerciseType::Interval, values(&["P4"]));
        draft.tempo = 120;
        draft.note_duration = NoteDuration::Quarter;
        assert!((draft.clone().validate().unwrap().seconds_per_unit() - 0.5).abs() < 1e-9);
        draft.note_duration = NoteDuration::Whole;
        assert!((draft.clone().validate().unwrap().seconds_per_unit() - 2.0).abs() < 1e-9);
        draft.note_duration = NoteDuration::Eighth;
        assert!((draft.validate().unwrap().seconds_per_unit() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn draft_reads_camel_case_json() {
        let json = r#"{
            "exercise": "chord",
            "questionPool": ["maj", "min"],
            "numberOfQuestions": 5,
            "playingMode": "ascending-descending",
            "tempo": 90,
            "noteDuration": "half",
            "fixedRoot": "Eb3",
            "autoFeedback": false
        }"#;
        let draft: SessionSettingsDraft = serde_json::from_str(json).unwrap();
        let settings = draft.validate().unwrap();
        assert_eq!(settings.fixed_root(), Some("Eb3".parse().unwrap()));
        assert_eq!(settings.playing_mode(), PlayingMode::AscendingDescending);
        assert_eq!(settings.inversions(), &[0]);
    }
}
