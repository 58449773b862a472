// crates/guardian-store/src/error.rs
// ============================================================================
// Module: Store Errors
// Description: SQLite-specific error type and its conversion to the
// collaborator-facing `StoreError`.
// Purpose: Keep engine-specific error detail local to this crate while
// satisfying the `Datastore` trait's `StoreError` contract.
// Dependencies: guardian-core, rusqlite, thiserror
// ============================================================================

use guardian_core::interfaces::StoreError;
use thiserror::Error;

/// Errors raised by the `SQLite`-backed store.
///
/// # Invariants
/// - Messages never embed raw row payloads, only engine-reported text.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error (path, permissions, directory creation).
    #[error("guardian store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("guardian store db error: {0}")]
    Db(String),
    /// Requested record does not exist.
    #[error("guardian store record not found: {0}")]
    NotFound(String),
    /// Stored row could not be decoded back into its domain type.
    #[error("guardian store decode error: {0}")]
    Decode(String),
    /// Invalid store configuration.
    #[error("guardian store invalid config: {0}")]
    Invalid(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::NotFound(message) => Self::NotFound(message),
            SqliteStoreError::Db(message) | SqliteStoreError::Decode(message) | SqliteStoreError::Invalid(message) => {
                Self::Store(message)
            }
        }
    }
}

impl From<rusqlite::Error> for SqliteStoreError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Db(error.to_string())
    }
}

impl From<serde_json::Error> for SqliteStoreError {
    fn from(error: serde_json::Error) -> Self {
        Self::Decode(error.to_string())
    }
}
