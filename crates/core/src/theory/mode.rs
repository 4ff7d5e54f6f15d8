use super::interval::{
    AUG4, DIM5, Interval, MAJ2, MAJ3, MAJ6, MAJ7, MIN2, MIN3, MIN6, MIN7, OCTAVE, PERF4, PERF5,
    UNISON,
};
use super::pitch::Pitch;
use super::{NoteSequence, PlayingMode, QuestionKind, TheoryError};
use crate::model::{ExerciseType, QuestionValue};

const IONIAN: &[Interval] = &[UNISON, MAJ2, MAJ3, PERF4, PERF5, MAJ6, MAJ7];
const DORIAN: &[Interval] = &[UNISON, MAJ2, MIN3, PERF4, PERF5, MAJ6, MIN7];
const PHRYGIAN: &[Interval] = &[UNISON, MIN2, MIN3, PERF4, PERF5, MIN6, MIN7];
const LYDIAN: &[Interval] = &[UNISON, MAJ2, MAJ3, AUG4, PERF5, MAJ6, MAJ7];
const MIXOLYDIAN: &[Interval] = &[UNISON, MAJ2, MAJ3, PERF4, PERF5, MAJ6, MIN7];
const AEOLIAN: &[Interval] = &[UNISON, MAJ2, MIN3, PERF4, PERF5, MIN6, MIN7];
const LOCRIAN: &[Interval] = &[UNISON, MIN2, MIN3, PERF4, DIM5, MIN6, MIN7];
const HARMONIC_MINOR: &[Interval] = &[UNISON, MAJ2, MIN3, PERF4, PERF5, MIN6, MAJ7];
const MELODIC_MINOR: &[Interval] = &[UNISON, MAJ2, MIN3, PERF4, PERF5, MAJ6, MAJ7];

/// A scale mode. `descending` is set only when the mode comes down through a
/// different scale than it goes up.
#[derive(Debug, Clone, Copy)]
pub struct ScaleMode {
    name: &'static str,
    degrees: &'static [Interval],
    descending: Option<&'static [Interval]>,
}

impl ScaleMode {
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Scale degrees above `root`, closed by the root an octave up.
    #[must_use]
    pub fn ascending(&self, root: &Pitch) -> Vec<Pitch> {
        spell_scale(root, self.degrees)
    }

    /// Top-down form of the scale, from the octave back to `root`.
    #[must_use]
    pub fn descending(&self, root: &Pitch) -> Vec<Pitch> {
        let mut notes = spell_scale(root, self.descending.unwrap_or(self.degrees));
        notes.reverse();
        notes
    }

    #[must_use]
    pub fn is_asymmetric(&self) -> bool {
        self.descending.is_some()
    }
}

fn spell_scale(root: &Pitch, degrees: &[Interval]) -> Vec<Pitch> {
    degrees
        .iter()
        .chain(std::iter::once(&OCTAVE))
        .map(|degree| root.transpose(degree))
        .collect()
}

const fn mode(
    name: &'static str,
    degrees: &'static [Interval],
    descending: Option<&'static [Interval]>,
) -> ScaleMode {
    ScaleMode {
        name,
        degrees,
        descending,
    }
}

const MODES: &[ScaleMode] = &[
    mode("ionian", IONIAN, None),
    mode("dorian", DORIAN, None),
    mode("phrygian", PHRYGIAN, None),
    mode("lydian", LYDIAN, None),
    mode("mixolydian", MIXOLYDIAN, None),
    mode("aeolian", AEOLIAN, None),
    mode("locrian", LOCRIAN, None),
    mode("harmonic-minor", HARMONIC_MINOR, None),
    mode("melodic-minor", MELODIC_MINOR, Some(AEOLIAN)),
];

#[must_use]
pub fn lookup_mode(name: &str) -> Option<&'static ScaleMode> {
    MODES.iter().find(|m| m.name == name)
}

/// Mode identification: the whole scale is played melodically.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModeQuestions;

impl QuestionKind for ModeQuestions {
    fn exercise(&self) -> ExerciseType {
        ExerciseType::Mode
    }

    fn taxonomy(&self) -> Vec<&'static str> {
        MODES.iter().map(|m| m.name).collect()
    }

    fn supports(&self, playing_mode: PlayingMode) -> bool {
        playing_mode != PlayingMode::Harmonic
    }

    fn arrange(
        &self,
        root: &Pitch,
        value: &QuestionValue,
        playing_mode: PlayingMode,
        _inversion: Option<u8>,
    ) -> Result<NoteSequence, TheoryError> {
        let scale = lookup_mode(value.as_str()).ok_or_else(|| TheoryError::UnknownQuestion {
            exercise: ExerciseType::Mode,
            value: value.to_string(),
        })?;

        let notes = match playing_mode {
            PlayingMode::Harmonic => {
                return Err(TheoryError::UnsupportedPlayingMode {
                    exercise: ExerciseType::Mode,
                    playing_mode,
                });
            }
            PlayingMode::Ascending => scale.ascending(root),
            PlayingMode::Descending => scale.descending(root),
            PlayingMode::AscendingDescending => {
                let mut notes = scale.ascending(root);
                notes.extend(scale.descending(root));
                notes
            }
        };
        Ok(NoteSequence::melodic(notes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pitch(s: &str) -> Pitch {
        s.parse().unwrap()
    }

    fn arrange(name: &str, root: &str, playing_mode: PlayingMode) -> Vec<String> {
        ModeQuestions
            .arrange(&pitch(root), &QuestionValue::from(name), playing_mode, None)
            .unwrap()
            .pitches()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn ascending_closes_on_the_octave() {
        assert_eq!(
            arrange("dorian", "D4", PlayingMode::Ascending),
            ["D4", "E4", "F4", "G4", "A4", "B4", "C5", "D5"]
        );
        assert_eq!(
            arrange("lydian", "F4", PlayingMode::Ascending),
            ["F4", "G4", "A4", "B4", "C5", "D5", "E5", "F5"]
        );
    }

    #[test]
    fn symmetric_modes_reverse_directly() {
        let up = arrange("phrygian", "E4", PlayingMode::Ascending);
        let mut down = arrange("phrygian", "E4", PlayingMode::Descending);
        down.reverse();
        assert_eq!(up, down);

        let both = arrange("phrygian", "E4", PlayingMode::AscendingDescending);
        assert_eq!(both.len(), 16);
        assert_eq!(both[..8], up[..]);
    }

    #[test]
    fn melodic_minor_descends_as_natural_minor() {
        let both = arrange("melodic-minor", "C4", PlayingMode::AscendingDescending);
        assert_eq!(
            both,
            [
                "C4", "D4", "Eb4", "F4", "G4", "A4", "B4", "C5", "C5", "Bb4", "Ab4", "G4", "F4",
                "Eb4", "D4", "C4"
            ]
        );
        assert!(lookup_mode("melodic-minor").unwrap().is_asymmetric());
    }

    #[test]
    fn harmonic_playing_is_rejected() {
        let err = ModeQuestions
            .arrange(
                &pitch("C4"),
                &QuestionValue::from("ionian"),
                PlayingMode::Harmonic,
                None,
            )
            .unwrap_err();
        assert!(matches!(err, TheoryError::UnsupportedPlayingMode { .. }));
        assert!(!ModeQuestions.supports(PlayingMode::Harmonic));
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let err = ModeQuestions
            .arrange(
                &pitch("C4"),
                &QuestionValue::from("bebop"),
                PlayingMode::Ascending,
                None,
            )
            .unwrap_err();
        assert!(matches!(err, TheoryError::UnknownQuestion { .. }));
    }
}
