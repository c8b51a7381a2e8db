//! Error types shared across the crate

use thiserror::Error;

/// Common result type for ehr-insight operations
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-wide error type
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV read or parse error (wraps csv::Error)
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error (wraps serde_json::Error)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input row, schema, or constraint violation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Completion endpoint failure (network, auth, rate limit, payload)
    #[error("External service error: {0}")]
    ExternalService(String),
}
