pub mod machine;
pub mod playback;
mod service;
pub mod timers;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use machine::{
    AnswerFeedback, AnswerNotes, Effect, SessionEvent, SessionMachine, SessionPhase,
    SessionResults, Step,
};
pub use playback::{SilentToneGenerator, ToneGenerator};
pub use service::{AnswerOutcome, PracticeSession};
pub use timers::{TimerKind, TimerQueue};
pub use view::{SessionHistoryItem, SessionHistoryService};
pub use workflow::{PracticeLoopService, SavedSession};
