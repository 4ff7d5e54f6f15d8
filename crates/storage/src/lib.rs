#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    ErrorHistoryRepository, InMemoryRepository, MAX_HISTORY_RECORDS, SessionHistoryRepository,
    Storage, StorageError, StreakRepository,
};
