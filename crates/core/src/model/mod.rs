mod error_record;
mod ids;
mod question;
pub mod result;
mod settings;
mod streak;

pub use error_record::{ErrorMap, ErrorRecord, merge_error_records, record_mistake};
pub use ids::{ErrorRecordId, ParseIdError, SessionId, SessionRecordId};
pub use question::{ExerciseType, Question, QuestionError, QuestionValue};
pub use result::{
    FinishedSession, SessionRecord, SessionResultError, SessionResultGroup, SessionScore,
};
pub use settings::{
    MAX_QUESTIONS, MAX_TEMPO, MIN_QUESTIONS, MIN_TEMPO, NoteDuration, SessionSettings,
    SessionSettingsDraft, SettingsError,
};
pub use streak::PracticeStreak;
