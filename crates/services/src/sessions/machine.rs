//! Pure practice-session state machine.
//!
//! [`SessionMachine::transition`] never mutates the machine it is called on.
//! It returns the next machine together with the effects the driver must
//! carry out (play notes, stop playback, schedule the advance timer, ...).

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use ear_core::model::result::{aggregate, overall};
use ear_core::model::{
    ErrorMap, FinishedSession, Question, QuestionValue, SessionResultGroup, SessionScore,
    SessionSettings, record_mistake,
};
use ear_core::theory::{NoteSequence, QuestionKind, TheoryError, question_kind};

use crate::error::{SaveSessionError, SessionError};

//
// ─── FEEDBACK ──────────────────────────────────────────────────────────────────
//

/// A value with the notes it sounds like over the question's root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerNotes {
    pub value: QuestionValue,
    pub inversion: Option<u8>,
    pub notes: NoteSequence,
}

/// What the learner answered next to what was asked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerFeedback {
    pub correct: bool,
    pub answered: AnswerNotes,
    pub expected: AnswerNotes,
}

//
// ─── PHASES, EVENTS, EFFECTS ───────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    AwaitingAnswer,
    Feedback(AnswerFeedback),
    /// Wrong answer under review; both voicings can be replayed.
    Explanation(AnswerFeedback),
    /// Feedback cleared, next question pending.
    Advancing,
    Ended,
}

impl SessionPhase {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            SessionPhase::Idle => "idle",
            SessionPhase::AwaitingAnswer => "awaiting-answer",
            SessionPhase::Feedback(_) => "feedback",
            SessionPhase::Explanation(_) => "explanation",
            SessionPhase::Advancing => "advancing",
            SessionPhase::Ended => "ended",
        }
    }

    #[must_use]
    pub fn feedback(&self) -> Option<&AnswerFeedback> {
        match self {
            SessionPhase::Feedback(feedback) | SessionPhase::Explanation(feedback) => {
                Some(feedback)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Start {
        first: Question,
        at: DateTime<Utc>,
    },
    Replay,
    ReplayExpected,
    ReplayAnswered,
    Answer {
        value: QuestionValue,
        inversion: Option<u8>,
        at: DateTime<Utc>,
    },
    Continue,
    Advance {
        next: Question,
    },
    PlaybackFinished,
    Reset,
}

impl SessionEvent {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::Start { .. } => "start",
            SessionEvent::Replay => "replay",
            SessionEvent::ReplayExpected => "replay-expected",
            SessionEvent::ReplayAnswered => "replay-answered",
            SessionEvent::Answer { .. } => "answer",
            SessionEvent::Continue => "continue",
            SessionEvent::Advance { .. } => "advance",
            SessionEvent::PlaybackFinished => "playback-finished",
            SessionEvent::Reset => "reset",
        }
    }
}

/// Side effects requested by a transition, in the order they must run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Play(NoteSequence),
    StopPlayback,
    ScheduleAdvance,
    RequestNextQuestion,
    Ended,
}

/// Outcome of one transition.
#[derive(Debug, Clone)]
pub struct Step {
    pub machine: SessionMachine,
    pub effects: Vec<Effect>,
}

/// Per-value and overall scores of an ended session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionResults {
    pub groups: Vec<SessionResultGroup>,
    pub overall: SessionScore,
}

//
// ─── MACHINE ───────────────────────────────────────────────────────────────────
//

#[derive(Clone)]
pub struct SessionMachine {
    settings: Arc<SessionSettings>,
    kind: Arc<dyn QuestionKind>,
    phase: SessionPhase,
    questions: Vec<Question>,
    errors: ErrorMap,
    playback_busy: bool,
    generation: u64,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
}

impl SessionMachine {
    #[must_use]
    pub fn new(settings: SessionSettings) -> Self {
        let kind = question_kind(settings.exercise());
        Self {
            settings: Arc::new(settings),
            kind,
            phase: SessionPhase::Idle,
            questions: Vec::new(),
            errors: ErrorMap::new(),
            playback_busy: false,
            generation: 0,
            started_at: None,
            ended_at: None,
        }
    }

    /// Computes the machine that follows `event`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Ended` for events after the session ended,
    /// `SessionError::PlaybackBusy` for answers and replays while notes are
    /// sounding, `SessionError::InvalidTransition` for events the current
    /// phase does not accept, and theory errors for answers that cannot be
    /// voiced.
    pub fn transition(&self, event: &SessionEvent) -> Result<Step, SessionError> {
        let mut machine = self.clone();
        let effects = machine.apply(event)?;
        Ok(Step { machine, effects })
    }

    fn apply(&mut self, event: &SessionEvent) -> Result<Vec<Effect>, SessionError> {
        match (self.phase.clone(), event) {
            (_, SessionEvent::Reset) => Ok(self.reset()),
            (_, SessionEvent::PlaybackFinished) => {
                self.playback_busy = false;
                Ok(Vec::new())
            }
            (SessionPhase::Ended, _) => Err(SessionError::Ended),

            (SessionPhase::Idle, SessionEvent::Start { first, at }) => {
                self.questions = vec![first.clone()];
                self.started_at = Some(*at);
                self.phase = SessionPhase::AwaitingAnswer;
                Ok(vec![self.play(first.notes().clone())])
            }

            (SessionPhase::AwaitingAnswer, SessionEvent::Replay) => {
                self.ensure_playback_free()?;
                let notes = self
                    .current_question()
                    .map(|q| q.notes().clone())
                    .ok_or_else(|| invalid(&SessionPhase::AwaitingAnswer, event))?;
                Ok(vec![self.play(notes)])
            }
            (SessionPhase::AwaitingAnswer, SessionEvent::Answer { value, inversion, at }) => {
                self.answer(value, *inversion, *at)
            }

            (SessionPhase::Feedback(feedback), SessionEvent::Continue) => {
                if feedback.correct {
                    self.phase = SessionPhase::Advancing;
                    Ok(vec![Effect::ScheduleAdvance])
                } else {
                    self.phase = SessionPhase::Explanation(feedback);
                    Ok(Vec::new())
                }
            }

            (SessionPhase::Explanation(feedback), SessionEvent::ReplayExpected) => {
                self.ensure_playback_free()?;
                Ok(vec![self.play(feedback.expected.notes)])
            }
            (SessionPhase::Explanation(feedback), SessionEvent::ReplayAnswered) => {
                self.ensure_playback_free()?;
                Ok(vec![self.play(feedback.answered.notes)])
            }
            (SessionPhase::Explanation(_), SessionEvent::Continue) => {
                self.phase = SessionPhase::Advancing;
                Ok(vec![Effect::ScheduleAdvance])
            }

            (SessionPhase::Advancing, SessionEvent::Advance { next }) => {
                self.questions.push(next.clone());
                self.phase = SessionPhase::AwaitingAnswer;
                Ok(vec![self.play(next.notes().clone())])
            }

            (phase, event) => Err(invalid(&phase, event)),
        }
    }

    fn answer(
        &mut self,
        value: &QuestionValue,
        inversion: Option<u8>,
        at: DateTime<Utc>,
    ) -> Result<Vec<Effect>, SessionError> {
        self.ensure_playback_free()?;
        if !self.kind.contains(value) {
            return Err(TheoryError::UnknownQuestion {
                exercise: self.settings.exercise(),
                value: value.to_string(),
            }
            .into());
        }

        let Some(question) = self.questions.last().filter(|q| q.is_open()) else {
            return Err(SessionError::InvalidTransition {
                phase: self.phase.name(),
                event: "answer",
            });
        };
        let correct = self.kind.validate_answer(question, value, inversion);
        let answered_inversion = self
            .kind
            .inversion_count(value)
            .map(|_| inversion.unwrap_or(0));
        let answered = AnswerNotes {
            value: value.clone(),
            inversion: answered_inversion,
            notes: self.kind.arrange(
                question.root(),
                value,
                self.settings.playing_mode(),
                answered_inversion,
            )?,
        };
        let expected = AnswerNotes {
            value: question.value().clone(),
            inversion: question.inversion(),
            notes: question.notes().clone(),
        };

        if let Some(question) = self.questions.last_mut() {
            question.record_answer(correct)?;
        }
        if !correct {
            record_mistake(&mut self.errors, &expected.value, value.clone());
        }

        let target = usize::try_from(self.settings.number_of_questions()).unwrap_or(usize::MAX);
        if self.total_answered() >= target {
            self.phase = SessionPhase::Ended;
            self.ended_at = Some(at);
            self.playback_busy = false;
            return Ok(vec![Effect::StopPlayback, Effect::Ended]);
        }
        if !self.settings.auto_feedback() {
            self.phase = SessionPhase::Advancing;
            return Ok(vec![Effect::RequestNextQuestion]);
        }
        self.phase = SessionPhase::Feedback(AnswerFeedback {
            correct,
            answered,
            expected,
        });
        Ok(Vec::new())
    }

    fn reset(&mut self) -> Vec<Effect> {
        self.phase = SessionPhase::Idle;
        self.questions.clear();
        self.errors.clear();
        self.playback_busy = false;
        self.generation += 1;
        self.started_at = None;
        self.ended_at = None;
        vec![Effect::StopPlayback]
    }

    fn play(&mut self, notes: NoteSequence) -> Effect {
        self.playback_busy = true;
        Effect::Play(notes)
    }

    fn ensure_playback_free(&self) -> Result<(), SessionError> {
        if self.playback_busy {
            Err(SessionError::PlaybackBusy)
        } else {
            Ok(())
        }
    }

    // ─── ACCESSORS ─────────────────────────────────────────────────────────────

    #[must_use]
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    #[must_use]
    pub fn kind(&self) -> &Arc<dyn QuestionKind> {
        &self.kind
    }

    #[must_use]
    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// The open question, if one is waiting for an answer.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.last().filter(|q| q.is_open())
    }

    /// Values asked so far, oldest first.
    #[must_use]
    pub fn asked_values(&self) -> Vec<QuestionValue> {
        self.questions.iter().map(|q| q.value().clone()).collect()
    }

    /// Wrong answers given in this session.
    #[must_use]
    pub fn errors(&self) -> &ErrorMap {
        &self.errors
    }

    #[must_use]
    pub fn playback_busy(&self) -> bool {
        self.playback_busy
    }

    /// Incremented on every reset.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    #[must_use]
    pub fn total_answered(&self) -> usize {
        self.questions.iter().filter(|q| q.is_answered()).count()
    }

    #[must_use]
    pub fn total_correct(&self) -> usize {
        self.questions
            .iter()
            .filter(|q| q.correct() == Some(true))
            .count()
    }

    #[must_use]
    pub fn session_ended(&self) -> bool {
        self.phase == SessionPhase::Ended
    }

    /// Scores, available once the session has ended.
    #[must_use]
    pub fn results(&self) -> Option<SessionResults> {
        self.session_ended().then(|| SessionResults {
            groups: aggregate(&self.questions),
            overall: overall(&self.questions),
        })
    }

    /// The payload saved and uploaded for an ended session.
    ///
    /// # Errors
    ///
    /// Returns `SaveSessionError::NotEnded` before the session ends and
    /// `SaveSessionError::Invalid` if the payload fails validation.
    pub fn finished_session(&self) -> Result<FinishedSession, SaveSessionError> {
        let (Some(started_at), Some(ended_at)) = (self.started_at, self.ended_at) else {
            return Err(SaveSessionError::NotEnded);
        };
        if !self.session_ended() {
            return Err(SaveSessionError::NotEnded);
        }
        Ok(FinishedSession::from_questions(
            self.settings.exercise(),
            &self.questions,
            started_at,
            ended_at,
        )?)
    }
}

fn invalid(phase: &SessionPhase, event: &SessionEvent) -> SessionError {
    SessionError::InvalidTransition {
        phase: phase.name(),
        event: event.name(),
    }
}

impl fmt::Debug for SessionMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionMachine")
            .field("exercise", &self.settings.exercise())
            .field("phase", &self.phase.name())
            .field("questions_len", &self.questions.len())
            .field("playback_busy", &self.playback_busy)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
