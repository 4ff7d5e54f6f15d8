use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::config::{PracticeConfig, prepare_sqlite_file};
use crate::error::AppServicesError;
use crate::history::ErrorHistoryStore;
use crate::remote::{HttpSessionUploader, SessionUploader};
use crate::sessions::{PracticeLoopService, SessionHistoryService, ToneGenerator};

/// Assembles the practice-facing services over one storage backend.
#[derive(Clone)]
pub struct PracticeServices {
    practice_loop: Arc<PracticeLoopService>,
    history: Arc<SessionHistoryService>,
    errors: Arc<ErrorHistoryStore>,
}

impl PracticeServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the database file cannot be prepared or
    /// storage initialization fails.
    pub async fn new_sqlite(
        config: &PracticeConfig,
        clock: Clock,
    ) -> Result<Self, AppServicesError> {
        prepare_sqlite_file(&config.db_url)?;
        let storage = Storage::sqlite(&config.db_url).await?;
        tracing::info!(db_url = %config.db_url, "practice storage ready");
        Ok(Self::from_storage(&storage, config, clock))
    }

    /// Build services over in-memory storage with default settings.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), &PracticeConfig::default(), clock)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, config: &PracticeConfig, clock: Clock) -> Self {
        let mut practice_loop = PracticeLoopService::new(
            clock,
            Arc::clone(&storage.errors),
            Arc::clone(&storage.sessions),
            Arc::clone(&storage.streak),
        )
        .with_advance_delay(config.feedback_delay);
        if let Some(remote) = &config.remote {
            let uploader: Arc<dyn SessionUploader> =
                Arc::new(HttpSessionUploader::new(remote.clone()));
            practice_loop = practice_loop.with_uploader(uploader);
        }

        let history = Arc::new(SessionHistoryService::new(
            clock,
            Arc::clone(&storage.sessions),
            Arc::clone(&storage.streak),
        ));
        let errors = Arc::new(ErrorHistoryStore::new(clock, Arc::clone(&storage.errors)));

        Self {
            practice_loop: Arc::new(practice_loop),
            history,
            errors,
        }
    }

    /// Replace the tone generator used by new sessions.
    #[must_use]
    pub fn with_tone(self, tone: Arc<dyn ToneGenerator>) -> Self {
        let practice_loop = (*self.practice_loop).clone().with_tone(tone);
        Self {
            practice_loop: Arc::new(practice_loop),
            ..self
        }
    }

    #[must_use]
    pub fn practice_loop(&self) -> Arc<PracticeLoopService> {
        Arc::clone(&self.practice_loop)
    }

    #[must_use]
    pub fn history(&self) -> Arc<SessionHistoryService> {
        Arc::clone(&self.history)
    }

    #[must_use]
    pub fn errors(&self) -> Arc<ErrorHistoryStore> {
        Arc::clone(&self.errors)
    }
}
