/*!
 * Error types for the cityinfo application.
 *
 * This module contains custom error types for the two storage boundaries
 * (relational store and city cache) plus the application-level wrapper,
 * using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors raised by the relational store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness constraint rejected the statement
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// Any other database failure (I/O, locking, SQL, pool)
    #[error("Database error: {0}")]
    Database(String),
}

impl StoreError {
    /// Check whether this error is a uniqueness violation
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StoreError::UniqueViolation(_))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(error: rusqlite::Error) -> Self {
        if violates_uniqueness(&error) {
            StoreError::UniqueViolation(error.to_string())
        } else {
            StoreError::Database(error.to_string())
        }
    }
}

impl From<anyhow::Error> for StoreError {
    fn from(error: anyhow::Error) -> Self {
        let unique = error
            .downcast_ref::<rusqlite::Error>()
            .is_some_and(violates_uniqueness);

        if unique {
            StoreError::UniqueViolation(format!("{:#}", error))
        } else {
            StoreError::Database(format!("{:#}", error))
        }
    }
}

fn violates_uniqueness(error: &rusqlite::Error) -> bool {
    match error {
        rusqlite::Error::SqliteFailure(failure, _) => {
            failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        }
        _ => false,
    }
}

/// Errors raised by the city cache
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The cache backend could not be reached
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    /// A single cache command failed
    #[error("Cache {operation} failed for province {province_id}: {message}")]
    OperationFailed {
        /// Name of the cache command
        operation: &'static str,
        /// Key the command targeted
        province_id: i64,
        /// Backend message
        message: String,
    },
}

/// Main application error type for controller-level failures
#[derive(Error, Debug)]
pub enum AppError {
    /// Error reading an input file
    #[error("File error: {0}")]
    File(String),

    /// Error from the relational store
    #[error("Store error: {0}")]
    Store(StoreError),

    /// Invalid command line, shell or import input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
