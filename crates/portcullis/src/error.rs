//! Error types for request screening.

use thiserror::Error;

/// Errors that can occur while screening a request.
#[derive(Debug, Error)]
pub enum GuardError {
    /// The request context could not supply a source address.
    #[error("Request carries no source address")]
    AddressUnavailable,

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for screening operations.
pub type GuardResult<T> = Result<T, GuardError>;
