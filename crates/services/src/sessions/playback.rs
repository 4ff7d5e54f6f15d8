use ear_core::theory::NoteSequence;

/// Sound output for a practice session.
///
/// `play` starts the notes, one playable unit every `seconds_per_unit`.
/// `release` stops whatever is sounding, immediately or after the given
/// number of seconds.
pub trait ToneGenerator: Send + Sync {
    fn play(&self, notes: &NoteSequence, seconds_per_unit: f64);
    fn release(&self, after_seconds: Option<f64>);
}

/// Plays nothing. Used headless and in tests that do not inspect sound.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentToneGenerator;

impl ToneGenerator for SilentToneGenerator {
    fn play(&self, notes: &NoteSequence, seconds_per_unit: f64) {
        tracing::trace!(units = notes.unit_count(), seconds_per_unit, "silent playback");
    }

    fn release(&self, _after_seconds: Option<f64>) {}
}
