use super::interval::{
    AUG5, DIM5, DIM7, Interval, MAJ2, MAJ3, MAJ6, MAJ7, MIN3, MIN7, PERF4, PERF5, UNISON,
};
use super::pitch::Pitch;
use super::{NoteSequence, PlayingMode, QuestionKind, TheoryError, arrange_members};
use crate::model::{ExerciseType, Question, QuestionValue};

/// Letter steps and semitones added to a chord member moved above the others.
const OCTAVE_STEPS: u8 = 7;
const OCTAVE_SEMITONES: i32 = 12;

/// A chord quality and its interval formula above the root.
#[derive(Debug, Clone, Copy)]
pub struct ChordQuality {
    symbol: &'static str,
    formula: &'static [Interval],
    invertible: bool,
}

impl ChordQuality {
    #[must_use]
    pub fn symbol(&self) -> &'static str {
        self.symbol
    }

    #[must_use]
    pub fn note_count(&self) -> usize {
        self.formula.len()
    }

    /// Symmetric qualities sound the same in every inversion and triads or
    /// larger are the only chords with a distinct bass voicing.
    #[must_use]
    pub fn admits_inversions(&self) -> bool {
        self.invertible && self.formula.len() >= 3
    }

    /// Spells the chord above `root`, voiced in the requested inversion.
    ///
    /// Inversion `k` rotates the members `k` steps: every member below the new
    /// bass moves up an octave, so all distances are re-derived from the new
    /// lowest note while the pitch-class content stays that of the root
    /// position chord. Qualities without distinct inversions are voiced in root
    /// position.
    ///
    /// # Errors
    ///
    /// Returns `TheoryError::InversionOutOfRange` if `inversion` is not below
    /// the chord's note count.
    pub fn voice(&self, root: &Pitch, inversion: Option<u8>) -> Result<Vec<Pitch>, TheoryError> {
        let note_count = self.formula.len();
        let requested = inversion.unwrap_or(0);
        if usize::from(requested) >= note_count {
            return Err(TheoryError::InversionOutOfRange {
                value: self.symbol.to_string(),
                inversion: requested,
                note_count,
            });
        }
        let rotation = if self.admits_inversions() {
            usize::from(requested)
        } else {
            0
        };

        Ok((0..note_count)
            .map(|i| {
                let member = (i + rotation) % note_count;
                let interval = &self.formula[member];
                if member < rotation {
                    root.transpose_by(
                        interval.steps() + OCTAVE_STEPS,
                        interval.semitones() + OCTAVE_SEMITONES,
                    )
                } else {
                    root.transpose(interval)
                }
            })
            .collect())
    }
}

const fn quality(
    symbol: &'static str,
    formula: &'static [Interval],
    invertible: bool,
) -> ChordQuality {
    ChordQuality {
        symbol,
        formula,
        invertible,
    }
}

const CHORD_QUALITIES: &[ChordQuality] = &[
    quality("maj", &[UNISON, MAJ3, PERF5], true),
    quality("min", &[UNISON, MIN3, PERF5], true),
    quality("dim", &[UNISON, MIN3, DIM5], true),
    quality("aug", &[UNISON, MAJ3, AUG5], false),
    quality("sus2", &[UNISON, MAJ2, PERF5], true),
    quality("sus4", &[UNISON, PERF4, PERF5], true),
    quality("6", &[UNISON, MAJ3, PERF5, MAJ6], true),
    quality("m6", &[UNISON, MIN3, PERF5, MAJ6], true),
    quality("7", &[UNISON, MAJ3, PERF5, MIN7], true),
    quality("maj7", &[UNISON, MAJ3, PERF5, MAJ7], true),
    quality("m7", &[UNISON, MIN3, PERF5, MIN7], true),
    quality("mMaj7", &[UNISON, MIN3, PERF5, MAJ7], true),
    quality("m7b5", &[UNISON, MIN3, DIM5, MIN7], true),
    quality("dim7", &[UNISON, MIN3, DIM5, DIM7], false),
];

#[must_use]
pub fn lookup_chord(symbol: &str) -> Option<&'static ChordQuality> {
    CHORD_QUALITIES.iter().find(|q| q.symbol == symbol)
}

/// Chord-quality identification, optionally including the inversion.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChordQuestions;

impl ChordQuestions {
    fn resolve(value: &QuestionValue) -> Result<&'static ChordQuality, TheoryError> {
        lookup_chord(value.as_str()).ok_or_else(|| TheoryError::UnknownQuestion {
            exercise: ExerciseType::Chord,
            value: value.to_string(),
        })
    }
}

impl QuestionKind for ChordQuestions {
    fn exercise(&self) -> ExerciseType {
        ExerciseType::Chord
    }

    fn taxonomy(&self) -> Vec<&'static str> {
        CHORD_QUALITIES.iter().map(|q| q.symbol).collect()
    }

    fn arrange(
        &self,
        root: &Pitch,
        value: &QuestionValue,
        playing_mode: PlayingMode,
        inversion: Option<u8>,
    ) -> Result<NoteSequence, TheoryError> {
        let chord = Self::resolve(value)?;
        let members = chord.voice(root, inversion)?;
        Ok(arrange_members(members, playing_mode))
    }

    fn validate_answer(
        &self,
        question: &Question,
        value: &QuestionValue,
        inversion: Option<u8>,
    ) -> bool {
        if question.value() != value {
            return false;
        }
        match question.inversion() {
            Some(expected) => inversion.unwrap_or(0) == expected,
            None => true,
        }
    }

    fn inversion_count(&self, value: &QuestionValue) -> Option<usize> {
        lookup_chord(value.as_str())
            .filter(|q| q.admits_inversions())
            .map(ChordQuality::note_count)
    }
}
