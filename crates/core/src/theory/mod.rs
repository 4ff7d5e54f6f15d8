//! Music theory for the three exercises: which values can be asked, and which
//! notes each question sounds.

mod chord;
mod interval;
mod mode;
mod notes;
mod pitch;
mod roots;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{ExerciseType, Question, QuestionValue};

pub use chord::{ChordQuality, ChordQuestions, lookup_chord};
pub use interval::{INTERVAL_QUESTIONS, Interval, IntervalQuestions, lookup_interval};
pub use mode::{ModeQuestions, ScaleMode, lookup_mode};
pub use notes::{NoteSequence, PlayableUnit};
pub use pitch::{Letter, OCTAVE_RANGE, Pitch};
pub use roots::{random_root, root_choices};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TheoryError {
    #[error("unknown {exercise} question: {value}")]
    UnknownQuestion {
        exercise: ExerciseType,
        value: String,
    },
    #[error("inversion {inversion} out of range for {value} ({note_count} notes)")]
    InversionOutOfRange {
        value: String,
        inversion: u8,
        note_count: usize,
    },
    #[error("{exercise} questions cannot be played {playing_mode}")]
    UnsupportedPlayingMode {
        exercise: ExerciseType,
        playing_mode: PlayingMode,
    },
    #[error("invalid pitch: {0}")]
    InvalidPitch(String),
    #[error("note sequence must not be empty")]
    EmptySequence,
}

//
// ─── PLAYING MODE ──────────────────────────────────────────────────────────────
//

/// Order in which a question's notes are sounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlayingMode {
    Harmonic,
    Ascending,
    Descending,
    AscendingDescending,
}

impl PlayingMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PlayingMode::Harmonic => "harmonic",
            PlayingMode::Ascending => "ascending",
            PlayingMode::Descending => "descending",
            PlayingMode::AscendingDescending => "ascending-descending",
        }
    }
}

impl fmt::Display for PlayingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown playing mode: {0}")]
pub struct ParsePlayingModeError(pub String);

impl FromStr for PlayingMode {
    type Err = ParsePlayingModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "harmonic" => Ok(PlayingMode::Harmonic),
            "ascending" => Ok(PlayingMode::Ascending),
            "descending" => Ok(PlayingMode::Descending),
            "ascending-descending" => Ok(PlayingMode::AscendingDescending),
            other => Err(ParsePlayingModeError(other.to_string())),
        }
    }
}

/// Orders chord or interval members for playback. Melodic orderings play one
/// note per unit; ascending-descending repeats the top note at the turn.
pub(crate) fn arrange_members(pitches: Vec<Pitch>, playing_mode: PlayingMode) -> NoteSequence {
    match playing_mode {
        PlayingMode::Harmonic => NoteSequence::harmonic(pitches),
        PlayingMode::Ascending => NoteSequence::melodic(pitches),
        PlayingMode::Descending => {
            let mut pitches = pitches;
            pitches.reverse();
            NoteSequence::melodic(pitches)
        }
        PlayingMode::AscendingDescending => {
            let mut down = pitches.clone();
            down.reverse();
            let mut notes = pitches;
            notes.extend(down);
            NoteSequence::melodic(notes)
        }
    }
}

//
// ─── QUESTION KIND ─────────────────────────────────────────────────────────────
//

/// Exercise-specific question behavior. One implementation per
/// [`ExerciseType`]; the session machine is generic over it.
pub trait QuestionKind: Send + Sync {
    fn exercise(&self) -> ExerciseType;

    /// Every value this exercise can ask.
    fn taxonomy(&self) -> Vec<&'static str>;

    fn contains(&self, value: &QuestionValue) -> bool {
        self.taxonomy().contains(&value.as_str())
    }

    /// Computes the notes to play for `value` above `root`.
    ///
    /// # Errors
    ///
    /// Returns `TheoryError` if the value is unknown, the inversion does not
    /// exist, or the playing mode is unsupported for this exercise.
    fn arrange(
        &self,
        root: &Pitch,
        value: &QuestionValue,
        playing_mode: PlayingMode,
        inversion: Option<u8>,
    ) -> Result<NoteSequence, TheoryError>;

    fn validate_answer(
        &self,
        question: &Question,
        value: &QuestionValue,
        _inversion: Option<u8>,
    ) -> bool {
        question.value() == value
    }

    /// Number of distinct voicings `value` can be asked in, if it has any.
    fn inversion_count(&self, _value: &QuestionValue) -> Option<usize> {
        None
    }

    fn supports(&self, _playing_mode: PlayingMode) -> bool {
        true
    }
}

#[must_use]
pub fn question_kind(exercise: ExerciseType) -> Arc<dyn QuestionKind> {
    match exercise {
        ExerciseType::Interval => Arc::new(IntervalQuestions),
        ExerciseType::Chord => Arc::new(ChordQuestions),
        ExerciseType::Mode => Arc::new(ModeQuestions),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playing_mode_parses_its_own_display() {
        for mode in [
            PlayingMode::Harmonic,
            PlayingMode::Ascending,
            PlayingMode::Descending,
            PlayingMode::AscendingDescending,
        ] {
            assert_eq!(mode.to_string().parse::<PlayingMode>().unwrap(), mode);
        }
        assert!("arpeggio".parse::<PlayingMode>().is_err());
    }

    #[test]
    fn each_exercise_has_its_own_kind() {
        for exercise in [ExerciseType::Interval, ExerciseType::Chord, ExerciseType::Mode] {
            let kind = question_kind(exercise);
            assert_eq!(kind.exercise(), exercise);
            assert!(!kind.taxonomy().is_empty());
        }
        let modes = question_kind(ExerciseType::Mode);
        assert!(modes.contains(&QuestionValue::from("dorian")));
        assert!(!modes.contains(&QuestionValue::from("maj7")));
    }

    #[test]
    fn arrangement_is_deterministic() {
        let root: Pitch = "G3".parse().unwrap();
        for exercise in [ExerciseType::Interval, ExerciseType::Chord, ExerciseType::Mode] {
            let kind = question_kind(exercise);
            for value in kind.taxonomy() {
                let value = QuestionValue::from(value);
                let a = kind.arrange(&root, &value, PlayingMode::Ascending, None);
                let b = kind.arrange(&root, &value, PlayingMode::Ascending, None);
                assert_eq!(a, b);
            }
        }
    }
}
