//! Error types for Evura.

use thiserror::Error;

/// Common error type for Evura.
#[derive(Error, Debug)]
pub enum EvuraError {
    /// Database error.
    ///
    /// Errors from sqlx are converted automatically, except unique-constraint
    /// violations which become [`EvuraError::AlreadyExists`].
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// A row with the same unique key already exists.
    #[error("{0} already exists")]
    AlreadyExists(String),

    /// Template error.
    #[error("template error: {0}")]
    Template(#[from] crate::template::TemplateError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for EvuraError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                EvuraError::AlreadyExists(db_err.message().to_string())
            }
            _ => EvuraError::Database(e.to_string()),
        }
    }
}

/// Result type alias for Evura operations.
pub type Result<T> = std::result::Result<T, EvuraError>;
