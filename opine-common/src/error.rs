//! Common error types for Opine

use thiserror::Error;

/// Common result type for Opine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across Opine services
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Transient timeout from a storage or network operation.
    ///
    /// Operations that want retry-on-timeout semantics match on this variant,
    /// never on error message text.
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error belongs to the transient timeout class.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }

    /// Classify a database error, lifting timeout-class failures into
    /// [`Error::Timeout`] so callers can retry on the typed variant.
    pub fn from_db(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut => Error::Timeout("connection pool timed out".to_string()),
            sqlx::Error::Io(io_err) if io_err.kind() == std::io::ErrorKind::TimedOut => {
                Error::Timeout(format!("database IO timed out: {}", io_err))
            }
            _ => Error::Database(err),
        }
    }
}
