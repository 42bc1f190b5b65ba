//! SQLite failures and their mapping onto the shared taxonomy

use rusqlite::ErrorCode;
use syllabus_core::KgError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("malformed parent_slugs column: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to prepare database directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection lock poisoned")]
    Poisoned,

    #[error(transparent)]
    Kg(#[from] KgError),
}

/// Unique or primary-key constraint violation.
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == ErrorCode::ConstraintViolation
                && (e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
        }
        _ => false,
    }
}

impl From<StoreError> for KgError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Kg(kg) => kg,
            StoreError::Sqlite(e) if is_unique_violation(&e) => KgError::DuplicateEntry(e.to_string()),
            other => KgError::Storage(other.to_string()),
        }
    }
}
