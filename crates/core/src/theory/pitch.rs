use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::TheoryError;
use super::interval::Interval;

const MAX_ACCIDENTAL: i8 = 2;

/// Octaves a constructed pitch may carry (`C-1` is MIDI 0, `G9` is MIDI 127).
pub const OCTAVE_RANGE: RangeInclusive<i8> = -1..=9;

//
// ─── LETTER ────────────────────────────────────────────────────────────────────
//

/// Natural letter class of a pitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Letter {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Letter {
    const ALL: [Letter; 7] = [
        Letter::C,
        Letter::D,
        Letter::E,
        Letter::F,
        Letter::G,
        Letter::A,
        Letter::B,
    ];

    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Letter::C => 0,
            Letter::D => 1,
            Letter::E => 2,
            Letter::F => 3,
            Letter::G => 4,
            Letter::A => 5,
            Letter::B => 6,
        }
    }

    /// Semitones above C of the natural note.
    #[must_use]
    pub fn natural_semitone(self) -> i32 {
        match self {
            Letter::C => 0,
            Letter::D => 2,
            Letter::E => 4,
            Letter::F => 5,
            Letter::G => 7,
            Letter::A => 9,
            Letter::B => 11,
        }
    }

    fn from_index(index: usize) -> Self {
        Self::ALL[index % 7]
    }

    fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'C' => Some(Letter::C),
            'D' => Some(Letter::D),
            'E' => Some(Letter::E),
            'F' => Some(Letter::F),
            'G' => Some(Letter::G),
            'A' => Some(Letter::A),
            'B' => Some(Letter::B),
            _ => None,
        }
    }

    fn as_char(self) -> char {
        match self {
            Letter::C => 'C',
            Letter::D => 'D',
            Letter::E => 'E',
            Letter::F => 'F',
            Letter::G => 'G',
            Letter::A => 'A',
            Letter::B => 'B',
        }
    }
}

//
// ─── PITCH ─────────────────────────────────────────────────────────────────────
//

/// A spelled pitch: letter, accidental and octave (`"C4"`, `"F#4"`, `"Bb3"`).
///
/// Spelling is kept separate from the sounding pitch so that intervals are
/// transposed by their semantic distance: a minor third above `C4` is `Eb4`,
/// never `D#4`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pitch {
    letter: Letter,
    accidental: i8,
    octave: i8,
}

impl Pitch {
    /// Builds a pitch from its parts.
    ///
    /// # Errors
    ///
    /// Returns `TheoryError::InvalidPitch` if the accidental is outside
    /// double-flat..=double-sharp or the octave is outside [`OCTAVE_RANGE`].
    pub fn new(letter: Letter, accidental: i8, octave: i8) -> Result<Self, TheoryError> {
        if accidental.abs() > MAX_ACCIDENTAL || !OCTAVE_RANGE.contains(&octave) {
            return Err(TheoryError::InvalidPitch(format!(
                "{}{}{octave}",
                letter.as_char(),
                accidental_text(accidental.clamp(-MAX_ACCIDENTAL, MAX_ACCIDENTAL))
            )));
        }
        Ok(Self {
            letter,
            accidental,
            octave,
        })
    }

    #[must_use]
    pub fn letter(&self) -> Letter {
        self.letter
    }

    #[must_use]
    pub fn accidental(&self) -> i8 {
        self.accidental
    }

    #[must_use]
    pub fn octave(&self) -> i8 {
        self.octave
    }

    /// MIDI note number (`C4` = 60).
    #[must_use]
    pub fn midi(&self) -> i32 {
        (i32::from(self.octave) + 1) * 12
            + self.letter.natural_semitone()
            + i32::from(self.accidental)
    }

    /// Pitch class in `0..12`, ignoring octave and spelling.
    #[must_use]
    pub fn pitch_class(&self) -> u8 {
        // rem_euclid keeps the value in 0..12
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let pc = self.midi().rem_euclid(12) as u8;
        pc
    }

    /// Sharp-preferring spelling of a MIDI note number.
    ///
    /// Octaves beyond what an `i8` holds saturate.
    #[must_use]
    pub fn from_midi(midi: i32) -> Self {
        const SPELLINGS: [(Letter, i8); 12] = [
            (Letter::C, 0),
            (Letter::C, 1),
            (Letter::D, 0),
            (Letter::D, 1),
            (Letter::E, 0),
            (Letter::F, 0),
            (Letter::F, 1),
            (Letter::G, 0),
            (Letter::G, 1),
            (Letter::A, 0),
            (Letter::A, 1),
            (Letter::B, 0),
        ];
        #[allow(clippy::cast_sign_loss)]
        let (letter, accidental) = SPELLINGS[midi.rem_euclid(12) as usize];
        let octave = midi.div_euclid(12) - 1;
        let octave = i8::try_from(octave).unwrap_or(if octave < 0 { i8::MIN } else { i8::MAX });
        Self {
            letter,
            accidental,
            octave,
        }
    }

    /// Transposes upward by an interval's semantic distance.
    #[must_use]
    pub fn transpose(&self, interval: &Interval) -> Self {
        self.transpose_by(interval.steps(), interval.semitones())
    }

    /// Transposes by `steps` letter names and `semitones` half steps.
    ///
    /// Spellings that would need more than a double accidental fall back to the
    /// enharmonic sharp spelling of the same sounding pitch.
    #[must_use]
    pub fn transpose_by(&self, steps: u8, semitones: i32) -> Self {
        let letter_index = self.letter.index() + usize::from(steps);
        let letter = Letter::from_index(letter_index);
        let octave_shift = i8::try_from(letter_index / 7).unwrap_or(i8::MAX);
        let octave = self.octave.saturating_add(octave_shift);

        let target = self.midi() + semitones;
        let natural = (i32::from(octave) + 1) * 12 + letter.natural_semitone();
        let accidental = target - natural;

        if accidental.abs() > i32::from(MAX_ACCIDENTAL) {
            return Self::from_midi(target);
        }

        #[allow(clippy::cast_possible_truncation)]
        let accidental = accidental as i8;
        Self {
            letter,
            accidental,
            octave,
        }
    }
}

fn accidental_text(accidental: i8) -> String {
    let symbol = if accidental > 0 { "#" } else { "b" };
    symbol.repeat(usize::from(accidental.unsigned_abs()))
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.letter.as_char(),
            accidental_text(self.accidental),
            self.octave
        )
    }
}

impl fmt::Debug for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pitch({self})")
    }
}

impl FromStr for Pitch {
    type Err = TheoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TheoryError::InvalidPitch(s.to_string());
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        let letter = chars.next().and_then(Letter::from_char).ok_or_else(invalid)?;

        let rest = chars.as_str();
        let accidental_len = rest
            .char_indices()
            .find(|(_, c)| *c != '#' && *c != 'b')
            .map_or(rest.len(), |(i, _)| i);
        let (accidentals, octave) = rest.split_at(accidental_len);

        let sharps = accidentals.chars().filter(|c| *c == '#').count();
        let flats = accidentals.chars().filter(|c| *c == 'b').count();
        if sharps > 0 && flats > 0 {
            return Err(invalid());
        }
        let accidental = i8::try_from(sharps)
            .ok()
            .zip(i8::try_from(flats).ok())
            .map(|(s, f)| s - f)
            .ok_or_else(invalid)?;

        let octave: i8 = octave.parse().map_err(|_| invalid())?;
        Pitch::new(letter, accidental, octave).map_err(|_| invalid())
    }
}

impl TryFrom<String> for Pitch {
    type Error = TheoryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Pitch> for String {
    fn from(value: Pitch) -> Self {
        value.to_string()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theory::interval::lookup_interval;

    fn pitch(s: &str) -> Pitch {
        s.parse().unwrap()
    }

    #[test]
    fn parses_and_displays_spellings() {
        for raw in ["C4", "F#4", "Bb3", "C##4", "Dbb4", "A0", "G-1"] {
            assert_eq!(pitch(raw).to_string(), raw);
        }
    }

    #[test]
    fn rejects_bad_spellings() {
        for raw in ["", "H4", "C", "C#b4", "C###4", "Cx"] {
            assert!(
                matches!(raw.parse::<Pitch>(), Err(TheoryError::InvalidPitch(_))),
                "{raw} should not parse"
            );
        }
    }

    #[test]
    fn octaves_outside_the_keyboard_are_rejected() {
        for raw in ["C127", "C10", "B-2", "C-128"] {
            assert!(
                matches!(raw.parse::<Pitch>(), Err(TheoryError::InvalidPitch(_))),
                "{raw} should not parse"
            );
        }
        assert!(Pitch::new(Letter::G, 0, 9).is_ok());
        assert!(Pitch::new(Letter::C, 0, 10).is_err());
        assert!(serde_json::from_str::<Pitch>("\"C127\"").is_err());
    }

    #[test]
    fn transposing_the_highest_roots_never_overflows() {
        let p15 = lookup_interval("P15").unwrap();
        assert_eq!(pitch("G9").transpose(p15), pitch("G9").transpose_by(14, 24));
        assert_eq!(pitch("G9").transpose(p15).octave(), 11);

        let far = pitch("B9").transpose_by(u8::MAX, 0);
        assert_eq!(far.midi(), pitch("B9").midi());
        assert_eq!(Pitch::from_midi(i32::MAX).octave(), i8::MAX);
        assert_eq!(Pitch::from_midi(i32::MIN).octave(), i8::MIN);
    }

    #[test]
    fn midi_numbers_follow_octave_convention() {
        assert_eq!(pitch("C4").midi(), 60);
        assert_eq!(pitch("A4").midi(), 69);
        assert_eq!(pitch("Cb4").midi(), 59);
        assert_eq!(pitch("B#3").midi(), 60);
        assert_eq!(pitch("B#3").pitch_class(), 0);
    }

    #[test]
    fn transposition_keeps_semantic_spelling() {
        let m3 = lookup_interval("m3").unwrap();
        assert_eq!(pitch("C4").transpose(m3), pitch("Eb4"));
        assert_eq!(pitch("A4").transpose(m3), pitch("C5"));

        let a4 = lookup_interval("A4").unwrap();
        assert_eq!(pitch("F4").transpose(a4), pitch("B4"));
        assert_eq!(pitch("C4").transpose(a4), pitch("F#4"));

        let d5 = lookup_interval("d5").unwrap();
        assert_eq!(pitch("C4").transpose(d5), pitch("Gb4"));
    }

    #[test]
    fn transposition_respells_beyond_double_accidentals() {
        // one letter up with no semitones would spell Cbbb5
        let up = pitch("Bbb4").transpose_by(1, 0);
        assert_eq!(up.midi(), pitch("Bbb4").midi());
        assert!(up.accidental().abs() <= 2);
    }

    #[test]
    fn serde_uses_spelled_form() {
        let json = serde_json::to_string(&pitch("F#4")).unwrap();
        assert_eq!(json, "\"F#4\"");
        let back: Pitch = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pitch("F#4"));
    }
}
