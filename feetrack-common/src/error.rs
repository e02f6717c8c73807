//! Common error types for FEETRACK

use thiserror::Error;

/// Common result type for feetrack operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the feetrack services
///
/// Store errors are fatal for the current invocation and surfaced raw;
/// validation and authorization errors are rejected before any side effect.
/// Gateway failures never appear here: they are caught at the dispatch
/// boundary and downgraded to a failed audit record.
#[derive(Error, Debug)]
pub enum Error {
    /// Document store operation error (wraps sqlx::Error)
    #[error("Store error: {0}")]
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

    /// Caller is not on the administrator allow-list
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}
