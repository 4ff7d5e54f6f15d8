use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::TheoryError;
use super::pitch::Pitch;

/// One thing the tone generator sounds at a time: a note, or a chord struck
/// together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlayableUnit {
    Single(Pitch),
    Group(Vec<Pitch>),
}

impl PlayableUnit {
    #[must_use]
    pub fn pitches(&self) -> &[Pitch] {
        match self {
            PlayableUnit::Single(p) => std::slice::from_ref(p),
            PlayableUnit::Group(ps) => ps,
        }
    }
}

/// Ordered, non-empty list of playable units for one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<PlayableUnit>", into = "Vec<PlayableUnit>")]
pub struct NoteSequence(Vec<PlayableUnit>);

impl NoteSequence {
    /// # Errors
    ///
    /// Returns `TheoryError::EmptySequence` for an empty list or an empty group.
    pub fn new(units: Vec<PlayableUnit>) -> Result<Self, TheoryError> {
        let has_empty_group = units.iter().any(|u| u.pitches().is_empty());
        if units.is_empty() || has_empty_group {
            return Err(TheoryError::EmptySequence);
        }
        Ok(Self(units))
    }

    /// Each pitch sounded on its own, in order.
    pub(crate) fn melodic(pitches: Vec<Pitch>) -> Self {
        Self(pitches.into_iter().map(PlayableUnit::Single).collect())
    }

    /// All pitches struck together as one unit.
    pub(crate) fn harmonic(pitches: Vec<Pitch>) -> Self {
        Self(vec![PlayableUnit::Group(pitches)])
    }

    #[must_use]
    pub fn units(&self) -> &[PlayableUnit] {
        &self.0
    }

    /// Number of sequential units; playback takes one time slot per unit.
    #[must_use]
    pub fn unit_count(&self) -> usize {
        self.0.len()
    }

    pub fn pitches(&self) -> impl Iterator<Item = &Pitch> {
        self.0.iter().flat_map(PlayableUnit::pitches)
    }

    #[must_use]
    pub fn pitch_classes(&self) -> BTreeSet<u8> {
        self.pitches().map(Pitch::pitch_class).collect()
    }
}

impl TryFrom<Vec<PlayableUnit>> for NoteSequence {
    type Error = TheoryError;

    fn try_from(value: Vec<PlayableUnit>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<NoteSequence> for Vec<PlayableUnit> {
    fn from(value: NoteSequence) -> Self {
        value.0
    }
}
