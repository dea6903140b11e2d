//! Error types for SmsRust

use thiserror::Error;

/// Main error type for SmsRust
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Daily capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("Empty audience: {0}")]
    EmptyAudience(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for SmsRust
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Config(_) => 500,
            Error::Database(_) => 500,
            Error::Validation(_) => 422,
            Error::NotFound(_) => 404,
            Error::Transport(_) => 502,
            Error::CapacityExceeded(_) => 429,
            Error::EmptyAudience(_) => 422,
            Error::Internal(_) => 500,
            Error::Other(_) => 500,
        }
    }

    /// Returns the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Error::Config(_) => "CONFIG_ERROR",
            Error::Database(_) => "DATABASE_ERROR",
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Transport(_) => "TRANSPORT_ERROR",
            Error::CapacityExceeded(_) => "CAPACITY_EXCEEDED",
            Error::EmptyAudience(_) => "EMPTY_AUDIENCE",
            Error::Internal(_) => "INTERNAL_ERROR",
            Error::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether a dispatch attempt hitting this error should be retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}
