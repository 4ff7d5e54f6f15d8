//! Shared error types for the services crate.

use std::io;

use thiserror::Error;

use ear_core::model::{QuestionError, SessionResultError, SettingsError};
use ear_core::selection::SelectionError;
use ear_core::theory::TheoryError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by the session machine and its driver.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("playback is still running")]
    PlaybackBusy,
    #[error("session already ended")]
    Ended,
    #[error("cannot handle {event} while {phase}")]
    InvalidTransition {
        phase: &'static str,
        event: &'static str,
    },
    #[error(transparent)]
    Theory(#[from] TheoryError),
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by the remote session uploader.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RemoteSaveError {
    #[error("invalid remote save configuration: {0}")]
    InvalidConfig(String),
    #[error("session payload rejected before upload: {0}")]
    InvalidPayload(#[from] SessionResultError),
    #[error("remote save failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Why a finished session could not be saved.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SaveSessionError {
    #[error("could not save practice session: the session has not ended")]
    NotEnded,
    #[error("could not save practice session: {0}")]
    Invalid(#[from] SessionResultError),
    #[error("could not save practice session: {0}")]
    Remote(#[from] RemoteSaveError),
}

/// Errors emitted while bootstrapping practice services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error("invalid sqlite url: {raw}")]
    InvalidDbUrl { raw: String },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
