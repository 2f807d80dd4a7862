//! Store-level error types shared across the chirp services

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Errors raised by the persistence layer
#[derive(Error, Debug)]
pub enum StoreError {
    /// Error occurred while establishing a database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred while applying migrations
    #[error("Database migration error: {0}")]
    Migration(String),

    /// Invalid or missing configuration
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

/// Type alias for Result with StoreError
pub type StoreResult<T> = Result<T, StoreError>;
