//! Error type for policy engine calls.

use thiserror::Error;
use uuid::Uuid;

/// Errors returned by policy client operations.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// Transport-level failure reaching the engine.
    #[error("policy transport error: {0}")]
    Http(String),
    /// The engine answered with a non-success status.
    #[error("policy api error (status={status}): {message}")]
    Api { status: u16, message: String },
    /// The engine response could not be decoded.
    #[error("policy response decode error: {0}")]
    Decode(String),
    /// A batch response did not echo an outcome for a submitted item.
    #[error("batch outcome missing for correlation id {0}")]
    MissingOutcome(Uuid),
}

impl From<reqwest::Error> for PolicyError {
    fn from(err: reqwest::Error) -> Self {
        PolicyError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for PolicyError {
    fn from(err: serde_json::Error) -> Self {
        PolicyError::Decode(err.to_string())
    }
}
