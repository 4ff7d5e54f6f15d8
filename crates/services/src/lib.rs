#![forbid(unsafe_code)]

pub mod app_services;
pub mod config;
pub mod error;
pub mod history;
pub mod remote;
pub mod sessions;

pub use ear_core::Clock;
pub use sessions as session;

pub use app_services::PracticeServices;
pub use config::PracticeConfig;
pub use error::{AppServicesError, RemoteSaveError, SaveSessionError, SessionError};
pub use history::ErrorHistoryStore;
pub use remote::{HttpSessionUploader, RemoteSaveConfig, SessionUploader};

pub use sessions::{
    AnswerOutcome, PracticeLoopService, PracticeSession, SavedSession, SessionHistoryItem,
    SessionHistoryService, SessionPhase, SilentToneGenerator, ToneGenerator,
};
