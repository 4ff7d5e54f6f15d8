use super::pitch::Pitch;
use super::{NoteSequence, PlayingMode, QuestionKind, TheoryError, arrange_members};
use crate::model::{ExerciseType, QuestionValue};

/// A named interval measured both in letter steps and in semitones.
///
/// Two intervals may share a sounding distance (`A4`/`d5`) and still spell
/// their upper note differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    symbol: &'static str,
    steps: u8,
    semitones: i32,
}

impl Interval {
    const fn new(symbol: &'static str, steps: u8, semitones: i32) -> Self {
        Self {
            symbol,
            steps,
            semitones,
        }
    }

    #[must_use]
    pub fn symbol(&self) -> &'static str {
        self.symbol
    }

    /// Letter names walked above the lower note (a third walks two).
    #[must_use]
    pub fn steps(&self) -> u8 {
        self.steps
    }

    #[must_use]
    pub fn semitones(&self) -> i32 {
        self.semitones
    }
}

pub(crate) const UNISON: Interval = Interval::new("P1", 0, 0);
pub(crate) const MIN2: Interval = Interval::new("m2", 1, 1);
pub(crate) const MAJ2: Interval = Interval::new("M2", 1, 2);
pub(crate) const MIN3: Interval = Interval::new("m3", 2, 3);
pub(crate) const MAJ3: Interval = Interval::new("M3", 2, 4);
pub(crate) const PERF4: Interval = Interval::new("P4", 3, 5);
pub(crate) const AUG4: Interval = Interval::new("A4", 3, 6);
pub(crate) const DIM5: Interval = Interval::new("d5", 4, 6);
pub(crate) const PERF5: Interval = Interval::new("P5", 4, 7);
pub(crate) const AUG5: Interval = Interval::new("A5", 4, 8);
pub(crate) const MIN6: Interval = Interval::new("m6", 5, 8);
pub(crate) const MAJ6: Interval = Interval::new("M6", 5, 9);
pub(crate) const DIM7: Interval = Interval::new("d7", 6, 9);
pub(crate) const MIN7: Interval = Interval::new("m7", 6, 10);
pub(crate) const MAJ7: Interval = Interval::new("M7", 6, 11);
pub(crate) const OCTAVE: Interval = Interval::new("P8", 7, 12);

const INTERVALS: &[Interval] = &[
    UNISON,
    MIN2,
    MAJ2,
    MIN3,
    MAJ3,
    PERF4,
    AUG4,
    DIM5,
    PERF5,
    AUG5,
    MIN6,
    MAJ6,
    DIM7,
    MIN7,
    MAJ7,
    OCTAVE,
    Interval::new("m9", 8, 13),
    Interval::new("M9", 8, 14),
    Interval::new("m10", 9, 15),
    Interval::new("M10", 9, 16),
    Interval::new("P11", 10, 17),
    Interval::new("A11", 10, 18),
    Interval::new("P12", 11, 19),
    Interval::new("m13", 12, 20),
    Interval::new("M13", 12, 21),
    Interval::new("m14", 13, 22),
    Interval::new("M14", 13, 23),
    Interval::new("P15", 14, 24),
];

/// Interval symbols that can be asked in the interval exercise.
///
/// Enharmonic duplicates (`d5`, `A5`, `d7`) sound identical to an entry here
/// and are kept only for chord and scale spelling.
pub const INTERVAL_QUESTIONS: &[&str] = &[
    "m2", "M2", "m3", "M3", "P4", "A4", "P5", "m6", "M6", "m7", "M7", "P8", "m9", "M9", "m10",
    "M10", "P11", "A11", "P12", "m13", "M13", "m14", "M14", "P15",
];

/// Finds any known interval by symbol, including spelling-only entries.
#[must_use]
pub fn lookup_interval(symbol: &str) -> Option<&'static Interval> {
    INTERVALS.iter().find(|i| i.symbol == symbol)
}

/// Interval identification: root plus one note above it.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntervalQuestions;

impl IntervalQuestions {
    fn resolve(value: &QuestionValue) -> Result<&'static Interval, TheoryError> {
        if !INTERVAL_QUESTIONS.contains(&value.as_str()) {
            return Err(TheoryError::UnknownQuestion {
                exercise: ExerciseType::Interval,
                value: value.to_string(),
            });
        }
        lookup_interval(value.as_str()).ok_or_else(|| TheoryError::UnknownQuestion {
            exercise: ExerciseType::Interval,
            value: value.to_string(),
        })
    }
}

impl QuestionKind for IntervalQuestions {
    fn exercise(&self) -> ExerciseType {
        ExerciseType::Interval
    }

    fn taxonomy(&self) -> Vec<&'static str> {
        INTERVAL_QUESTIONS.to_vec()
    }

    fn arrange(
        &self,
        root: &Pitch,
        value: &QuestionValue,
        playing_mode: PlayingMode,
        _inversion: Option<u8>,
    ) -> Result<NoteSequence, TheoryError> {
        let interval = Self::resolve(value)?;
        let upper = root.transpose(interval);
        Ok(arrange_members(vec![*root, upper], playing_mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theory::PlayableUnit;

    fn pitch(s: &str) -> Pitch {
        s.parse().unwrap()
    }

    #[test]
    fn question_symbols_all_resolve() {
        for symbol in INTERVAL_QUESTIONS {
            assert!(lookup_interval(symbol).is_some(), "{symbol}");
        }
    }

    #[test]
    fn arranges_every_playing_mode() {
        let kind = IntervalQuestions;
        let root = pitch("C4");
        let value = QuestionValue::from("P5");

        let harmonic = kind
            .arrange(&root, &value, PlayingMode::Harmonic, None)
            .unwrap();
        assert_eq!(
            harmonic.units(),
            &[PlayableUnit::Group(vec![pitch("C4"), pitch("G4")])]
        );

        let ascending = kind
            .arrange(&root, &value, PlayingMode::Ascending, None)
            .unwrap();
        assert_eq!(
            ascending.units(),
            &[
                PlayableUnit::Single(pitch("C4")),
                PlayableUnit::Single(pitch("G4"))
            ]
        );

        let descending = kind
            .arrange(&root, &value, PlayingMode::Descending, None)
            .unwrap();
        assert_eq!(
            descending.units(),
            &[
                PlayableUnit::Single(pitch("G4")),
                PlayableUnit::Single(pitch("C4"))
            ]
        );

        let both = kind
            .arrange(&root, &value, PlayingMode::AscendingDescending, None)
            .unwrap();
        let spelled: Vec<String> = both.pitches().map(ToString::to_string).collect();
        assert_eq!(spelled, ["C4", "G4", "G4", "C4"]);
    }

    #[test]
    fn compound_intervals_cross_the_octave() {
        let seq = IntervalQuestions
            .arrange(
                &pitch("E4"),
                &QuestionValue::from("m10"),
                PlayingMode::Ascending,
                None,
            )
            .unwrap();
        let spelled: Vec<String> = seq.pitches().map(ToString::to_string).collect();
        assert_eq!(spelled, ["E4", "G5"]);
    }

    #[test]
    fn unknown_and_spelling_only_symbols_are_rejected() {
        for raw in ["X9", "d5", "P1"] {
            let err = IntervalQuestions
                .arrange(
                    &pitch("C4"),
                    &QuestionValue::from(raw),
                    PlayingMode::Ascending,
                    None,
                )
                .unwrap_err();
            assert!(matches!(err, TheoryError::UnknownQuestion { .. }));
        }
    }
}
