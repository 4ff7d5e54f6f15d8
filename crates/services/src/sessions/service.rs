use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;

use ear_core::Clock;
use ear_core::model::{
    ErrorMap, FinishedSession, Question, QuestionValue, SessionId, SessionSettings,
};
use ear_core::selection::{QuestionSelector, choose_inversion};
use ear_core::theory::{NoteSequence, random_root};

use super::machine::{Effect, SessionEvent, SessionMachine, SessionPhase, SessionResults};
use super::playback::ToneGenerator;
use super::timers::{TimerKind, TimerQueue};
use crate::config::DEFAULT_FEEDBACK_DELAY_MS;
use crate::error::{SaveSessionError, SessionError};

/// Result of answering the open question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub correct: bool,
    pub session_ended: bool,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// Drives a [`SessionMachine`] for one practice session.
///
/// Owns the question selector, the random source, the timers and the tone
/// generator, and carries out the effects every transition asks for. Nothing
/// here sleeps: callers fire due timers with [`PracticeSession::poll_timers`],
/// or fast-forward a fixed clock with [`PracticeSession::advance_clock`].
pub struct PracticeSession {
    id: SessionId,
    machine: SessionMachine,
    selector: QuestionSelector,
    rng: StdRng,
    clock: Clock,
    timers: TimerQueue,
    tone: Arc<dyn ToneGenerator>,
    advance_delay: Duration,
}

impl PracticeSession {
    /// Create an idle session with an OS-seeded random source.
    ///
    /// `errors` biases selection towards values missed in earlier sessions.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Selection` if the question pool is empty.
    pub fn new(
        settings: SessionSettings,
        errors: Option<&ErrorMap>,
        clock: Clock,
        tone: Arc<dyn ToneGenerator>,
    ) -> Result<Self, SessionError> {
        Self::with_rng(settings, errors, clock, tone, StdRng::from_os_rng())
    }

    /// Like [`PracticeSession::new`] with a caller-provided random source.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Selection` if the question pool is empty.
    pub fn with_rng(
        settings: SessionSettings,
        errors: Option<&ErrorMap>,
        clock: Clock,
        tone: Arc<dyn ToneGenerator>,
        mut rng: StdRng,
    ) -> Result<Self, SessionError> {
        let errors = errors.filter(|e| !e.is_empty());
        let selector =
            QuestionSelector::new(settings.question_pool().to_vec(), errors, &mut rng)?;
        Ok(Self {
            id: SessionId::random(),
            machine: SessionMachine::new(settings),
            selector,
            rng,
            clock,
            timers: TimerQueue::new(),
            tone,
            advance_delay: Duration::milliseconds(DEFAULT_FEEDBACK_DELAY_MS),
        })
    }

    /// Pause between a correct answer (or an explanation) and the next question.
    #[must_use]
    pub fn with_advance_delay(mut self, delay: Duration) -> Self {
        self.advance_delay = delay;
        self
    }

    // ─── OPERATIONS ────────────────────────────────────────────────────────────

    /// Asks and plays the first question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless the session is idle.
    pub fn start(&mut self) -> Result<&Question, SessionError> {
        let first = self.next_question()?;
        let at = self.clock.now();
        self.dispatch(SessionEvent::Start { first, at })?;
        tracing::info!(
            session = %self.id,
            exercise = %self.settings().exercise(),
            questions = self.settings().number_of_questions(),
            "practice session started"
        );
        self.current_question()
            .ok_or(SessionError::InvalidTransition {
                phase: "idle",
                event: "start",
            })
    }

    /// Plays the open question again.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::PlaybackBusy` while notes are sounding.
    pub fn replay(&mut self) -> Result<(), SessionError> {
        self.dispatch(SessionEvent::Replay)
    }

    /// Plays what was asked, during the explanation of a wrong answer.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::PlaybackBusy` while notes are sounding.
    pub fn replay_expected(&mut self) -> Result<(), SessionError> {
        self.dispatch(SessionEvent::ReplayExpected)
    }

    /// Plays what was answered, during the explanation of a wrong answer.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::PlaybackBusy` while notes are sounding.
    pub fn replay_answered(&mut self) -> Result<(), SessionError> {
        self.dispatch(SessionEvent::ReplayAnswered)
    }

    /// Answers the open question. `inversion` only matters for chords; `None`
    /// means root position.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::PlaybackBusy` while notes are sounding,
    /// `SessionError::Ended` after the last question and
    /// `SessionError::Theory` for values outside the exercise.
    pub fn answer(
        &mut self,
        value: impl Into<QuestionValue>,
        inversion: Option<u8>,
    ) -> Result<AnswerOutcome, SessionError> {
        let at = self.clock.now();
        self.dispatch(SessionEvent::Answer {
            value: value.into(),
            inversion,
            at,
        })?;
        let correct = self
            .machine
            .questions()
            .iter()
            .rev()
            .find_map(Question::correct)
            .unwrap_or(false);
        Ok(AnswerOutcome {
            correct,
            session_ended: self.machine.session_ended(),
        })
    }

    /// Leaves the feedback or explanation screen.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` outside feedback and explanation.
    pub fn proceed(&mut self) -> Result<(), SessionError> {
        self.dispatch(SessionEvent::Continue)
    }

    /// Abandons the session. Pending timers become stale. With `start_new` a
    /// fresh session starts right away.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the fresh session cannot start.
    pub fn reset(&mut self, start_new: bool) -> Result<(), SessionError> {
        self.dispatch(SessionEvent::Reset)?;
        tracing::info!(
            session = %self.id,
            generation = self.machine.generation(),
            "practice session reset"
        );
        if start_new {
            self.id = SessionId::random();
            self.start()?;
        }
        Ok(())
    }

    /// Fires every timer due at the clock's current time and returns their kinds.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the next question cannot be prepared. The
    /// advance stays scheduled so a later poll retries it.
    pub fn poll_timers(&mut self) -> Result<Vec<TimerKind>, SessionError> {
        let now = self.clock.now();
        let generation = self.machine.generation();
        let fired = self.timers.drain_due(now, generation);
        let mut failure = None;
        for kind in &fired {
            match kind {
                TimerKind::PlaybackRelease => self.dispatch(SessionEvent::PlaybackFinished)?,
                TimerKind::FeedbackAdvance => {
                    if *self.machine.phase() != SessionPhase::Advancing {
                        continue;
                    }
                    let advanced = self
                        .next_question()
                        .and_then(|next| self.dispatch(SessionEvent::Advance { next }));
                    if let Err(err) = advanced {
                        tracing::warn!(
                            session = %self.id,
                            error = %err,
                            "next question not ready"
                        );
                        self.timers.schedule(TimerKind::FeedbackAdvance, now, generation);
                        failure = Some(err);
                    }
                }
            }
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(fired),
        }
    }

    /// Moves a fixed clock forward and fires what became due.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the next question cannot be prepared.
    pub fn advance_clock(&mut self, delta: Duration) -> Result<Vec<TimerKind>, SessionError> {
        self.clock.advance(delta);
        self.poll_timers()
    }

    #[must_use]
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.timers.next_deadline()
    }

    // ─── STATE ─────────────────────────────────────────────────────────────────

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn settings(&self) -> &SessionSettings {
        self.machine.settings()
    }

    /// Selection weights stay fixed for the whole session.
    #[must_use]
    pub fn selector(&self) -> &QuestionSelector {
        &self.selector
    }

    #[must_use]
    pub fn machine(&self) -> &SessionMachine {
        &self.machine
    }

    #[must_use]
    pub fn phase(&self) -> &SessionPhase {
        self.machine.phase()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.machine.current_question()
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        self.machine.questions()
    }

    #[must_use]
    pub fn errors(&self) -> &ErrorMap {
        self.machine.errors()
    }

    #[must_use]
    pub fn playback_busy(&self) -> bool {
        self.machine.playback_busy()
    }

    #[must_use]
    pub fn total_answered(&self) -> usize {
        self.machine.total_answered()
    }

    #[must_use]
    pub fn total_correct(&self) -> usize {
        self.machine.total_correct()
    }

    #[must_use]
    pub fn session_ended(&self) -> bool {
        self.machine.session_ended()
    }

    #[must_use]
    pub fn results(&self) -> Option<SessionResults> {
        self.machine.results()
    }

    /// # Errors
    ///
    /// Returns `SaveSessionError::NotEnded` before the last answer.
    pub fn finished_session(&self) -> Result<FinishedSession, SaveSessionError> {
        self.machine.finished_session()
    }

    // ─── INTERNALS ─────────────────────────────────────────────────────────────

    fn dispatch(&mut self, event: SessionEvent) -> Result<(), SessionError> {
        let mut pending = VecDeque::from([event]);
        while let Some(event) = pending.pop_front() {
            let step = self.machine.transition(&event)?;
            self.machine = step.machine;
            for effect in step.effects {
                if let Some(follow_up) = self.run_effect(effect)? {
                    pending.push_back(follow_up);
                }
            }
        }
        Ok(())
    }

    fn run_effect(&mut self, effect: Effect) -> Result<Option<SessionEvent>, SessionError> {
        match effect {
            Effect::Play(notes) => self.play(&notes),
            Effect::StopPlayback => {
                self.tone.release(None);
                self.timers.cancel(TimerKind::PlaybackRelease);
            }
            Effect::ScheduleAdvance => {
                let due = self.clock.now() + self.advance_delay;
                self.timers
                    .schedule(TimerKind::FeedbackAdvance, due, self.machine.generation());
            }
            Effect::RequestNextQuestion => {
                let next = self.next_question()?;
                return Ok(Some(SessionEvent::Advance { next }));
            }
            Effect::Ended => {
                self.timers.cancel_all();
                tracing::info!(
                    session = %self.id,
                    answered = self.machine.total_answered(),
                    correct = self.machine.total_correct(),
                    "practice session ended"
                );
            }
        }
        Ok(None)
    }

    fn play(&mut self, notes: &NoteSequence) {
        let seconds_per_unit = self.settings().seconds_per_unit();
        self.tone.play(notes, seconds_per_unit);

        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
        let millis = (notes.unit_count() as f64 * seconds_per_unit * 1000.0).round() as i64;
        let due = self.clock.now() + Duration::milliseconds(millis);
        self.timers
            .schedule(TimerKind::PlaybackRelease, due, self.machine.generation());
        tracing::debug!(units = notes.unit_count(), millis, "playing question notes");
    }

    fn next_question(&mut self) -> Result<Question, SessionError> {
        let history = self.machine.asked_values();
        let value = self.selector.select_next(&history, &mut self.rng);

        let settings = self.machine.settings();
        let root = match settings.fixed_root() {
            Some(root) => root,
            None => random_root(&mut self.rng),
        };
        let kind = self.machine.kind();
        let inversion = choose_inversion(
            settings.inversions(),
            kind.inversion_count(&value),
            &mut self.rng,
        );
        let notes = kind.arrange(&root, &value, settings.playing_mode(), inversion)?;
        Ok(Question::new(value, root, notes, inversion))
    }
}

impl fmt::Debug for PracticeSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PracticeSession")
            .field("id", &self.id)
            .field("machine", &self.machine)
            .field("timers", &self.timers)
            .field("advance_delay", &self.advance_delay)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
