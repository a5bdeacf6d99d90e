use std::io;

use rusqlite;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),
    #[error("artist {0} not found")]
    ArtistNotFound(String),
    #[error("artwork {0} not found")]
    ArtworkNotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("connection poisoned")]
    ConnectionPoisoned,
    #[error("io error: {0}")]
    IoError(#[from] io::Error),
    #[error("blocking database task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

impl StorageError {
    /// Maps SQLite unique-constraint failures to [`StorageError::Conflict`].
    pub fn from_insert(err: rusqlite::Error, what: &str) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(failure, _)
                if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                StorageError::Conflict(what.to_string())
            }
            _ => StorageError::DatabaseError(err),
        }
    }
}
