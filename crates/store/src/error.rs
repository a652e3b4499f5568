// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("job already exists: {0}")]
    Duplicate(String),

    #[error("no such job: {0}")]
    NotFound(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration error: {0}")]
    Migration(#[from] MigrationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MigrationError {
    #[error("schema version {0} is newer than the current schema version {1}")]
    TooNew(i64, i64),
    #[error("no migration path from version {0} to {1}")]
    NoPath(i64, i64),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl From<StoreError> for sdo_core::Error {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate(id) => sdo_core::Error::InvalidState(format!("job already exists: {id}")),
            StoreError::NotFound(id) => sdo_core::Error::NotFound(id),
            StoreError::Sqlite(e) => sdo_core::Error::IoError(e.to_string()),
            StoreError::Migration(e) => sdo_core::Error::IoError(e.to_string()),
            StoreError::Io(e) => sdo_core::Error::IoError(e.to_string()),
        }
    }
}
